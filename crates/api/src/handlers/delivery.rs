//! Handlers for the `/routes` resource.
//!
//! Batch apply and registration go through the core engine against the
//! PostgreSQL store; listing and explicit edits use the repository directly.

use aguaruta_core::edit::RawPointEdit;
use aguaruta_core::engine::ApplyFlags;
use aguaruta_core::error::CoreError;
use aguaruta_core::placement::{self, Placement, RawRegistration};
use aguaruta_core::report::{ApplyOutcome, ApplyReport};
use aguaruta_core::roster::normalize_vehicle_code;
use aguaruta_core::source::{BatchSource, DocumentSource};
use aguaruta_core::types::DbId;
use aguaruta_core::weekday::Weekday;
use aguaruta_db::models::delivery_point::{DeliveryPoint, RouteFilter, UpdateDeliveryPoint};
use aguaruta_db::repositories::DeliveryPointRepo;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Batch apply
// ---------------------------------------------------------------------------

/// Body of `POST /routes/apply`: either inline `records` or a `source`
/// document, plus the apply flags.
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    #[serde(default)]
    pub records: Option<Vec<Value>>,
    #[serde(default)]
    pub source: Option<DocumentSource>,
    #[serde(flatten)]
    pub flags: ApplyFlags,
}

impl ApplyRequest {
    fn into_source(self) -> AppResult<(BatchSource, ApplyFlags)> {
        let source = match (self.records, self.source) {
            (Some(records), None) => BatchSource::Records(records),
            (None, Some(doc)) => BatchSource::Document(doc),
            (Some(_), Some(_)) => {
                return Err(AppError::BadRequest(
                    "Provide either 'records' or 'source', not both".into(),
                ))
            }
            (None, None) => {
                return Err(AppError::BadRequest(
                    "Provide 'records' or a 'source' document".into(),
                ))
            }
        };
        Ok((source, self.flags))
    }
}

/// HTTP status for a finished apply. The body is always the report.
pub fn report_status(report: &ApplyReport) -> StatusCode {
    match report.outcome {
        ApplyOutcome::Replaced | ApplyOutcome::Appended | ApplyOutcome::SkippedEmpty => {
            StatusCode::OK
        }
        ApplyOutcome::InvalidSource => StatusCode::UNPROCESSABLE_ENTITY,
        ApplyOutcome::Failed => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// POST /api/v1/routes/apply
///
/// Validate, merge and write a batch to the live table. The applier holds
/// the process-wide writer lock while it writes.
pub async fn apply_batch(
    State(state): State<AppState>,
    Json(input): Json<ApplyRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ApplyReport>>)> {
    let (source, flags) = input.into_source()?;

    let report = state.applier.apply_source(&state.store, source, flags).await;

    Ok((report_status(&report), Json(DataResponse { data: report })))
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// POST /api/v1/routes/points/auto
///
/// Register one household, copying the assignment of its nearest neighbour
/// unless a vehicle is forced.
pub async fn register_point(
    State(state): State<AppState>,
    Json(input): Json<RawRegistration>,
) -> AppResult<(StatusCode, Json<DataResponse<Placement>>)> {
    let placement = placement::register_point(&state.store, &state.config.roster, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: placement })))
}

/// POST /api/v1/routes/points
///
/// Register one household on the vehicle and day the caller names.
pub async fn register_manual_point(
    State(state): State<AppState>,
    Json(input): Json<RawRegistration>,
) -> AppResult<(StatusCode, Json<DataResponse<Placement>>)> {
    let placement = placement::register_manual(&state.store, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: placement })))
}

// ---------------------------------------------------------------------------
// Listing and explicit edits
// ---------------------------------------------------------------------------

/// Query parameters for listing the live routes.
#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub vehicle: Option<String>,
    pub day: Option<String>,
}

/// GET /api/v1/routes
pub async fn list_routes(
    State(state): State<AppState>,
    Query(params): Query<RouteQuery>,
) -> AppResult<Json<DataResponse<Vec<DeliveryPoint>>>> {
    let day = match params.day.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(token) => Some(
            Weekday::parse(token)
                .ok_or_else(|| AppError::BadRequest(format!("Unrecognized day '{token}'")))?
                .as_str()
                .to_string(),
        ),
        None => None,
    };
    let filter = RouteFilter {
        vehicle: params
            .vehicle
            .as_deref()
            .map(normalize_vehicle_code)
            .filter(|v| !v.is_empty()),
        day,
    };

    let points = DeliveryPointRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: points }))
}

/// PUT /api/v1/routes/{id}
///
/// Patch one stored point. The protected vehicle is accepted here.
pub async fn update_point(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RawPointEdit>,
) -> AppResult<Json<DataResponse<DeliveryPoint>>> {
    let edit = input.validate(&state.config.roster)?;

    let update = UpdateDeliveryPoint {
        vehicle_code: edit.vehicle,
        household_name: edit.name,
        weekday: edit.day.map(|d| d.as_str().to_string()),
        liters: edit.liters,
        phone: edit.phone,
        latitude: edit.coordinates.map(|c| c.0),
        longitude: edit.coordinates.map(|c| c.1),
    };

    let point = DeliveryPointRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "DeliveryPoint",
            id,
        }))?;

    tracing::info!(id, vehicle = %point.vehicle_code, "Delivery point edited");
    Ok(Json(DataResponse { data: point }))
}
