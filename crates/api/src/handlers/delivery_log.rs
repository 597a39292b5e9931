//! Handlers for the `/deliveries` resource (the crews' delivery log).

use aguaruta_core::delivery_log::{DeliveryLogQuery, RawDeliveryLog};
use aguaruta_db::models::delivery_log::DeliveryLog;
use aguaruta_db::repositories::DeliveryLogRepo;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/deliveries
pub async fn record_delivery(
    State(state): State<AppState>,
    Json(input): Json<RawDeliveryLog>,
) -> AppResult<(StatusCode, Json<DataResponse<DeliveryLog>>)> {
    let log = input.validate()?;
    let row = DeliveryLogRepo::create(&state.pool, &log).await?;

    tracing::info!(id = row.id, status = %row.status, vehicle = ?row.vehicle_code, "Delivery recorded");
    Ok((StatusCode::CREATED, Json(DataResponse { data: row })))
}

/// GET /api/v1/deliveries
pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(params): Query<DeliveryLogQuery>,
) -> AppResult<Json<DataResponse<Vec<DeliveryLog>>>> {
    let filter = params.into_filter()?;
    let rows = DeliveryLogRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/v1/deliveries/undelivered
pub async fn list_undelivered(
    State(state): State<AppState>,
    Query(params): Query<DeliveryLogQuery>,
) -> AppResult<Json<DataResponse<Vec<DeliveryLog>>>> {
    let filter = params.into_undelivered_filter()?;
    let rows = DeliveryLogRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: rows }))
}
