//! Route definitions for the `/deliveries` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::delivery_log;
use crate::state::AppState;

/// Routes mounted at `/deliveries`.
///
/// ```text
/// GET    /              -> list_deliveries   (?from=2025-03-01&to=...&status=...&vehicle=...)
/// POST   /              -> record_delivery
/// GET    /undelivered   -> list_undelivered  (?from=...&to=...&vehicle=...)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(delivery_log::list_deliveries).post(delivery_log::record_delivery),
        )
        .route("/undelivered", get(delivery_log::list_undelivered))
}
