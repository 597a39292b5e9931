//! Delivery point types shared by the batch pipeline, the placement
//! routine and the store.

use serde::{Deserialize, Serialize};

use crate::types::DbId;
use crate::weekday::Weekday;

/// The (vehicle, day) pair a household is served by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub vehicle: String,
    pub day: Weekday,
}

/// A validated delivery point, ready for merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPoint {
    pub name: String,
    pub vehicle: String,
    pub day: Weekday,
    pub liters: i32,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl DeliveryPoint {
    pub fn assignment(&self) -> Assignment {
        Assignment {
            vehicle: self.vehicle.clone(),
            day: self.day,
        }
    }
}

/// A row about to be written to the live table.
///
/// `day` is optional because a placement without neighbours may store a
/// point with no day yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeliveryPoint {
    pub vehicle: String,
    pub name: String,
    pub day: Option<String>,
    pub liters: i32,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<DeliveryPoint> for NewDeliveryPoint {
    fn from(point: DeliveryPoint) -> Self {
        Self {
            vehicle: point.vehicle,
            name: point.name,
            day: Some(point.day.as_str().to_string()),
            liters: point.liters,
            phone: point.phone,
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }
}

/// A row of the live table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPoint {
    pub id: DbId,
    pub vehicle: String,
    pub name: String,
    pub day: Option<String>,
    pub liters: i32,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl StoredPoint {
    pub fn from_new(id: DbId, point: NewDeliveryPoint) -> Self {
        Self {
            id,
            vehicle: point.vehicle,
            name: point.name,
            day: point.day,
            liters: point.liters,
            phone: point.phone,
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }

    /// Both coordinates, when the row has them.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}
