use crate::types::DbId;

/// Domain-level errors shared by the core, db and api crates.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The batch source could not be read or is not a list of records.
    #[error("Invalid batch source: {0}")]
    InvalidSource(String),
}
