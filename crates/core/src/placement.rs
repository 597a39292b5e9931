//! Single-point registration with nearest-neighbour assignment.
//!
//! A new household inherits the vehicle (and, unless the caller chose one,
//! the day) of the closest stored point that has coordinates. The scan and
//! the insert run in one transaction but without the bulk-write lock, so a
//! concurrent batch apply may leave the choice slightly stale.
//!
//! A manual registration skips the search: the caller names both vehicle
//! and day, and coordinates become optional.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::{haversine_km, round_km, valid_lat_lon};
use crate::normalize::{value_as_f64, value_text};
use crate::point::{NewDeliveryPoint, StoredPoint};
use crate::roster::{normalize_vehicle_code, VehicleRoster};
use crate::store::{DeliveryStore, StoreError, StoreTransaction};
use crate::types::DbId;
use crate::validation::parse_liters;
use crate::weekday::Weekday;

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Household name is required")]
    MissingName,

    #[error("Liters must be a positive number")]
    InvalidLiters,

    #[error("Latitude and longitude are required and must be in range")]
    InvalidCoordinates,

    #[error("Unrecognized day '{0}'")]
    InvalidDay(String),

    #[error("Vehicle code is required")]
    MissingVehicle,

    #[error("Delivery day is required")]
    MissingDay,

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A registration request as received, before validation.
///
/// Numeric fields accept numbers or numeric strings with a decimal comma.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRegistration {
    #[serde(default, alias = "nombre")]
    pub name: Option<String>,
    #[serde(default, alias = "litros")]
    pub liters: Value,
    #[serde(default, alias = "telefono")]
    pub phone: Option<String>,
    #[serde(default, alias = "latitud")]
    pub latitude: Value,
    #[serde(default, alias = "longitud")]
    pub longitude: Value,
    #[serde(default, alias = "dia")]
    pub day: Option<String>,
    /// Skip the neighbour search and use this vehicle.
    #[serde(default, alias = "camion")]
    pub vehicle: Option<String>,
}

/// A validated registration.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRegistration {
    pub name: String,
    pub liters: i32,
    pub phone: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub day: Option<Weekday>,
    pub forced_vehicle: Option<String>,
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn parse_day(token: &str) -> Result<Weekday, RegistrationError> {
    Weekday::parse(token).ok_or_else(|| RegistrationError::InvalidDay(token.to_string()))
}

impl RawRegistration {
    /// Check the request, failing on the first problem found.
    pub fn validate(&self) -> Result<PointRegistration, RegistrationError> {
        let name = self.checked_name()?;
        let liters = self.checked_liters()?;

        let (latitude, longitude) = self
            .checked_coordinates()?
            .ok_or(RegistrationError::InvalidCoordinates)?;

        let day = non_blank(self.day.as_deref()).map(parse_day).transpose()?;

        Ok(PointRegistration {
            name,
            liters,
            phone: self.checked_phone(),
            latitude,
            longitude,
            day,
            forced_vehicle: non_blank(self.vehicle.as_deref()).map(normalize_vehicle_code),
        })
    }

    /// Check a manual registration. Vehicle and day are required; the
    /// coordinates may be omitted but not half-given.
    pub fn validate_manual(&self) -> Result<NewDeliveryPoint, RegistrationError> {
        let name = self.checked_name()?;
        let liters = self.checked_liters()?;
        let vehicle = non_blank(self.vehicle.as_deref())
            .map(normalize_vehicle_code)
            .ok_or(RegistrationError::MissingVehicle)?;
        let day = non_blank(self.day.as_deref())
            .ok_or(RegistrationError::MissingDay)
            .and_then(parse_day)?;
        let coordinates = self.checked_coordinates()?;

        Ok(NewDeliveryPoint {
            vehicle,
            name,
            day: Some(day.as_str().to_string()),
            liters,
            phone: self.checked_phone(),
            latitude: coordinates.map(|c| c.0),
            longitude: coordinates.map(|c| c.1),
        })
    }

    fn checked_name(&self) -> Result<String, RegistrationError> {
        non_blank(self.name.as_deref())
            .map(str::to_string)
            .ok_or(RegistrationError::MissingName)
    }

    fn checked_liters(&self) -> Result<i32, RegistrationError> {
        value_text(&self.liters)
            .and_then(|text| parse_liters(&text))
            .ok_or(RegistrationError::InvalidLiters)
    }

    fn checked_phone(&self) -> Option<String> {
        non_blank(self.phone.as_deref()).map(str::to_string)
    }

    /// `Ok(None)` when both coordinates are absent.
    fn checked_coordinates(&self) -> Result<Option<(f64, f64)>, RegistrationError> {
        if value_text(&self.latitude).is_none() && value_text(&self.longitude).is_none() {
            return Ok(None);
        }
        value_as_f64(&self.latitude)
            .zip(value_as_f64(&self.longitude))
            .filter(|(lat, lon)| valid_lat_lon(*lat, *lon))
            .map(Some)
            .ok_or(RegistrationError::InvalidCoordinates)
    }
}

// ---------------------------------------------------------------------------
// Neighbour search
// ---------------------------------------------------------------------------

/// The stored point a registration copied its assignment from.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: DbId,
    pub vehicle: String,
    pub day: Option<String>,
    pub distance_km: f64,
}

/// Closest candidate to (`lat`, `lon`).
///
/// Only points with a vehicle code and both coordinates are considered.
/// Ties keep the earliest candidate in scan order.
pub fn find_nearest(candidates: &[StoredPoint], lat: f64, lon: f64) -> Option<Neighbor> {
    let mut best: Option<Neighbor> = None;
    for point in candidates {
        let vehicle = normalize_vehicle_code(&point.vehicle);
        if vehicle.is_empty() {
            continue;
        }
        let Some((p_lat, p_lon)) = point.coordinates() else {
            continue;
        };

        let distance_km = haversine_km(lat, lon, p_lat, p_lon);
        if best.as_ref().map_or(true, |b| distance_km < b.distance_km) {
            best = Some(Neighbor {
                id: point.id,
                vehicle,
                day: non_blank(point.day.as_deref()).map(str::to_string),
                distance_km,
            });
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAssignment {
    pub vehicle: String,
    pub day: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborReference {
    pub id: DbId,
    /// Rounded to metres.
    pub distance_km: f64,
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub id: DbId,
    pub assignment: ResolvedAssignment,
    pub reference: Option<NeighborReference>,
}

/// Validate `raw`, choose its assignment and insert it.
pub async fn register_point<S: DeliveryStore>(
    store: &S,
    roster: &VehicleRoster,
    raw: &RawRegistration,
) -> Result<Placement, RegistrationError> {
    let registration = raw.validate()?;
    let caller_day = registration.day.map(|d| d.as_str().to_string());

    let mut tx = store.begin().await?;

    let (assignment, reference) = match &registration.forced_vehicle {
        Some(vehicle) => (
            ResolvedAssignment {
                vehicle: vehicle.clone(),
                day: caller_day,
            },
            None,
        ),
        None => {
            let candidates = tx.list_all().await?;
            match find_nearest(&candidates, registration.latitude, registration.longitude) {
                Some(neighbor) => (
                    ResolvedAssignment {
                        vehicle: neighbor.vehicle,
                        day: caller_day.or(neighbor.day),
                    },
                    Some(NeighborReference {
                        id: neighbor.id,
                        distance_km: round_km(neighbor.distance_km),
                    }),
                ),
                None => (
                    ResolvedAssignment {
                        vehicle: roster.fallback().to_string(),
                        day: caller_day,
                    },
                    None,
                ),
            }
        }
    };

    let id = tx
        .insert_one(&NewDeliveryPoint {
            vehicle: assignment.vehicle.clone(),
            name: registration.name,
            day: assignment.day.clone(),
            liters: registration.liters,
            phone: registration.phone,
            latitude: Some(registration.latitude),
            longitude: Some(registration.longitude),
        })
        .await?;
    tx.commit().await?;

    tracing::info!(
        id,
        vehicle = %assignment.vehicle,
        day = ?assignment.day,
        reference_id = ?reference.as_ref().map(|r| r.id),
        distance_km = ?reference.as_ref().map(|r| r.distance_km),
        "Delivery point registered"
    );

    Ok(Placement {
        id,
        assignment,
        reference,
    })
}

/// Insert a manually assigned point as given.
///
/// The vehicle is not checked against the roster, the same as a forced
/// vehicle on [`register_point`].
pub async fn register_manual<S: DeliveryStore>(
    store: &S,
    raw: &RawRegistration,
) -> Result<Placement, RegistrationError> {
    let point = raw.validate_manual()?;

    let mut tx = store.begin().await?;
    let id = tx.insert_one(&point).await?;
    tx.commit().await?;

    tracing::info!(id, vehicle = %point.vehicle, day = ?point.day, "Delivery point registered manually");

    Ok(Placement {
        id,
        assignment: ResolvedAssignment {
            vehicle: point.vehicle,
            day: point.day,
        },
        reference: None,
    })
}
