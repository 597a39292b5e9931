//! Delivery log rows.

use aguaruta_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `delivery_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeliveryLog {
    pub id: DbId,
    pub household_name: String,
    pub vehicle_code: Option<String>,
    pub liters: Option<i32>,
    pub status: String,
    pub delivered_at: Timestamp,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: Timestamp,
}
