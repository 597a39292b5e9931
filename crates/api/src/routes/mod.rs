pub mod delivery;
pub mod delivery_log;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /routes                  live route table, batch apply, registration
/// /deliveries              delivery log reported by the crews
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/routes", delivery::router())
        .nest("/deliveries", delivery_log::router())
}
