//! Row validator for raw delivery records.
//!
//! Each record is checked in a fixed order and the first failing check
//! decides the rejection reason. Rejections never stop the batch: they are
//! counted per reason, and the first [`MAX_FAILURE_SAMPLES`] are kept as
//! diagnostic samples.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::valid_lat_lon;
use crate::normalize::{parse_decimal, CanonicalField, NormalizedRecord};
use crate::point::DeliveryPoint;
use crate::roster::{normalize_vehicle_code, VehicleRoster};
use crate::weekday::Weekday;

/// Maximum number of failure samples kept per batch.
pub const MAX_FAILURE_SAMPLES: usize = 10;

// ---------------------------------------------------------------------------
// Reasons
// ---------------------------------------------------------------------------

/// Why a row was rejected. Serialized with the reason codes used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RejectReason {
    #[serde(rename = "registro_invalido")]
    NotAnObject,
    #[serde(rename = "vehiculo_protegido")]
    ProtectedVehicle,
    #[serde(rename = "sin_nombre")]
    MissingName,
    #[serde(rename = "sin_camion")]
    MissingVehicle,
    #[serde(rename = "camion_invalido")]
    UnknownVehicle,
    #[serde(rename = "dia_invalido")]
    InvalidDay,
    #[serde(rename = "litros_invalidos")]
    InvalidLiters,
    #[serde(rename = "coordenadas_invalidas")]
    InvalidCoordinates,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAnObject => "registro_invalido",
            Self::ProtectedVehicle => "vehiculo_protegido",
            Self::MissingName => "sin_nombre",
            Self::MissingVehicle => "sin_camion",
            Self::UnknownVehicle => "camion_invalido",
            Self::InvalidDay => "dia_invalido",
            Self::InvalidLiters => "litros_invalidos",
            Self::InvalidCoordinates => "coordenadas_invalidas",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Diagnostic copy of a rejected row: its position plus whatever
/// identifying fields it carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSample {
    pub index: usize,
    pub reason: RejectReason,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liters: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Accepted(DeliveryPoint),
    Rejected(FailureSample),
}

/// Result of validating a whole batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchValidation {
    pub read: usize,
    pub accepted: Vec<DeliveryPoint>,
    pub rejected: BTreeMap<RejectReason, usize>,
    pub samples: Vec<FailureSample>,
}

impl BatchValidation {
    /// Number of rows that did not pass validation.
    pub fn omitted(&self) -> usize {
        self.rejected.values().sum()
    }

    fn record(&mut self, outcome: ValidationOutcome) {
        match outcome {
            ValidationOutcome::Accepted(point) => self.accepted.push(point),
            ValidationOutcome::Rejected(sample) => {
                *self.rejected.entry(sample.reason).or_insert(0) += 1;
                if self.samples.len() < MAX_FAILURE_SAMPLES {
                    self.samples.push(sample);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate every record of a batch, in order.
pub fn validate_batch(records: &[Value], roster: &VehicleRoster) -> BatchValidation {
    let mut batch = BatchValidation {
        read: records.len(),
        ..Default::default()
    };
    for (index, raw) in records.iter().enumerate() {
        let outcome = validate_row(index, raw, roster);
        if let ValidationOutcome::Rejected(sample) = &outcome {
            tracing::debug!(index, reason = %sample.reason, detail = %sample.detail, "Row rejected");
        }
        batch.record(outcome);
    }
    batch
}

/// Validate a single raw record.
///
/// The protected-vehicle check runs before the field checks, so a row
/// carrying the protected code is always reported as
/// [`RejectReason::ProtectedVehicle`] whatever else is wrong with it.
pub fn validate_row(index: usize, raw: &Value, roster: &VehicleRoster) -> ValidationOutcome {
    let Some(object) = raw.as_object() else {
        return ValidationOutcome::Rejected(FailureSample {
            index,
            reason: RejectReason::NotAnObject,
            detail: format!("expected an object, got {}", json_kind(raw)),
            name: None,
            vehicle: None,
            day: None,
            liters: None,
        });
    };

    let record = NormalizedRecord::from_object(object);
    let reject = |reason: RejectReason, detail: String| {
        ValidationOutcome::Rejected(FailureSample {
            index,
            reason,
            detail,
            name: record.resolve(CanonicalField::Name).map(str::to_string),
            vehicle: record.resolve(CanonicalField::Vehicle).map(str::to_string),
            day: record.resolve(CanonicalField::Day).map(str::to_string),
            liters: record.resolve(CanonicalField::Liters).map(str::to_string),
        })
    };

    let vehicle_raw = record.resolve(CanonicalField::Vehicle);
    if let Some(code) = vehicle_raw {
        if roster.is_protected(code) {
            return reject(
                RejectReason::ProtectedVehicle,
                format!("vehicle '{}' is excluded from bulk import", roster.protected()),
            );
        }
    }

    let Some(name) = record.resolve(CanonicalField::Name) else {
        return reject(RejectReason::MissingName, "household name is missing".to_string());
    };

    let Some(vehicle_raw) = vehicle_raw else {
        return reject(RejectReason::MissingVehicle, "vehicle code is missing".to_string());
    };
    let vehicle = normalize_vehicle_code(vehicle_raw);
    if !roster.contains(&vehicle) {
        return reject(
            RejectReason::UnknownVehicle,
            format!("vehicle '{vehicle}' is not in the roster"),
        );
    }

    let Some(day) = record.resolve(CanonicalField::Day).and_then(Weekday::parse) else {
        return reject(RejectReason::InvalidDay, "day is missing or not a weekday".to_string());
    };

    let Some(liters) = record.resolve(CanonicalField::Liters).and_then(parse_liters) else {
        return reject(
            RejectReason::InvalidLiters,
            "liters must be a positive number".to_string(),
        );
    };

    let (latitude, longitude) = match parse_coordinates(
        record.resolve(CanonicalField::Latitude),
        record.resolve(CanonicalField::Longitude),
    ) {
        Ok(pair) => pair,
        Err(detail) => return reject(RejectReason::InvalidCoordinates, detail),
    };

    ValidationOutcome::Accepted(DeliveryPoint {
        name: name.to_string(),
        vehicle,
        day,
        liters,
        phone: record.resolve(CanonicalField::Phone).map(str::to_string),
        latitude,
        longitude,
    })
}

/// Parse a liters quantity, truncating toward zero.
///
/// `"12,5"` -> `12`. Zero, negative, fractional-below-one and values beyond
/// the 32-bit range yield `None`.
pub fn parse_liters(text: &str) -> Option<i32> {
    let value = parse_decimal(text)?;
    if value <= 0.0 {
        return None;
    }
    let whole = value.trunc();
    if whole < 1.0 || whole > f64::from(i32::MAX) {
        return None;
    }
    Some(whole as i32)
}

/// Parse an optional coordinate pair.
///
/// Both absent is fine. If either is present, both must parse and lie in
/// range.
pub fn parse_coordinates(
    lat: Option<&str>,
    lon: Option<&str>,
) -> Result<(Option<f64>, Option<f64>), String> {
    match (lat, lon) {
        (None, None) => Ok((None, None)),
        (Some(lat), Some(lon)) => {
            let (Some(lat_v), Some(lon_v)) = (parse_decimal(lat), parse_decimal(lon)) else {
                return Err(format!("coordinates '{lat}', '{lon}' are not numbers"));
            };
            if !valid_lat_lon(lat_v, lon_v) {
                return Err(format!("coordinates ({lat_v}, {lon_v}) are out of range"));
            }
            Ok((Some(lat_v), Some(lon_v)))
        }
        _ => Err("latitude and longitude must be given together".to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
