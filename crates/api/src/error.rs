use aguaruta_core::error::CoreError;
use aguaruta_core::placement::RegistrationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `aguaruta_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A single-point registration that could not be placed.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::InvalidSource(msg) => {
                    (StatusCode::BAD_REQUEST, "INVALID_SOURCE", msg.clone())
                }
            },

            AppError::Registration(err) => match err {
                RegistrationError::MissingName => {
                    (StatusCode::BAD_REQUEST, "MISSING_NAME", err.to_string())
                }
                RegistrationError::InvalidLiters => {
                    (StatusCode::BAD_REQUEST, "INVALID_LITERS", err.to_string())
                }
                RegistrationError::InvalidCoordinates => {
                    (StatusCode::BAD_REQUEST, "INVALID_COORDINATES", err.to_string())
                }
                RegistrationError::InvalidDay(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_DAY", err.to_string())
                }
                RegistrationError::MissingVehicle => {
                    (StatusCode::BAD_REQUEST, "MISSING_VEHICLE", err.to_string())
                }
                RegistrationError::MissingDay => {
                    (StatusCode::BAD_REQUEST, "MISSING_DAY", err.to_string())
                }
                RegistrationError::Store(store_err) => {
                    tracing::error!(error = %store_err, "Registration store error");
                    internal()
                }
            },

            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                internal()
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
