//! Route definitions for the `/routes` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::delivery;
use crate::state::AppState;

/// Routes mounted at `/routes`.
///
/// ```text
/// GET    /              -> list_routes     (?vehicle=A1&day=LUNES)
/// POST   /apply         -> apply_batch
/// POST   /points        -> register_manual_point
/// POST   /points/auto   -> register_point
/// PUT    /{id}          -> update_point
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(delivery::list_routes))
        .route("/apply", post(delivery::apply_batch))
        .route("/points", post(delivery::register_manual_point))
        .route("/points/auto", post(delivery::register_point))
        .route("/{id}", put(delivery::update_point))
}
