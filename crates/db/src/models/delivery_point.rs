//! Delivery point models and DTOs.
//!
//! Maps to the `delivery_points` table, the live route table rebuilt by
//! batch apply and extended by single-point registration.

use aguaruta_core::point::StoredPoint;
use aguaruta_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `delivery_points` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeliveryPoint {
    pub id: DbId,
    pub vehicle_code: String,
    pub household_name: String,
    pub weekday: Option<String>,
    pub liters: i32,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<DeliveryPoint> for StoredPoint {
    fn from(row: DeliveryPoint) -> Self {
        Self {
            id: row.id,
            vehicle: row.vehicle_code,
            name: row.household_name,
            day: row.weekday,
            liters: row.liters,
            phone: row.phone,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// DTO for patching a delivery point (all fields optional).
///
/// Values are expected to be validated already; `None` leaves the column
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateDeliveryPoint {
    pub vehicle_code: Option<String>,
    pub household_name: Option<String>,
    pub weekday: Option<String>,
    pub liters: Option<i32>,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Optional filters for listing the live routes.
#[derive(Debug, Clone, Default)]
pub struct RouteFilter {
    pub vehicle: Option<String>,
    pub day: Option<String>,
}
