//! Validation for explicit edits of a single stored point.
//!
//! Unlike bulk import, an explicit edit may move a point onto the protected
//! vehicle. Every field is optional, but an edit must change something.

use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::geo::valid_lat_lon;
use crate::normalize::{value_as_f64, value_text};
use crate::roster::{normalize_vehicle_code, VehicleRoster};
use crate::validation::parse_liters;
use crate::weekday::Weekday;

/// An edit request as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPointEdit {
    #[serde(default, alias = "nombre")]
    pub name: Option<String>,
    #[serde(default, alias = "camion")]
    pub vehicle: Option<String>,
    #[serde(default, alias = "dia")]
    pub day: Option<String>,
    #[serde(default, alias = "litros")]
    pub liters: Value,
    #[serde(default, alias = "telefono")]
    pub phone: Option<String>,
    #[serde(default, alias = "latitud")]
    pub latitude: Value,
    #[serde(default, alias = "longitud")]
    pub longitude: Value,
}

/// A validated edit. `None` leaves the field as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointEdit {
    pub name: Option<String>,
    pub vehicle: Option<String>,
    pub day: Option<Weekday>,
    pub liters: Option<i32>,
    pub phone: Option<String>,
    pub coordinates: Option<(f64, f64)>,
}

impl PointEdit {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn invalid(msg: impl Into<String>) -> CoreError {
    CoreError::Validation(msg.into())
}

impl RawPointEdit {
    pub fn validate(&self, roster: &VehicleRoster) -> Result<PointEdit, CoreError> {
        let name = match self.name.as_deref().map(str::trim) {
            Some("") => return Err(invalid("Household name cannot be blank")),
            other => other.map(str::to_string),
        };

        let vehicle = match self.vehicle.as_deref() {
            Some(code) => {
                let code = normalize_vehicle_code(code);
                if !roster.contains(&code) {
                    return Err(invalid(format!(
                        "Vehicle '{code}' is not in the roster ({})",
                        roster.vehicles().join(", ")
                    )));
                }
                Some(code)
            }
            None => None,
        };

        let day = match self.day.as_deref() {
            Some(token) => Some(
                Weekday::parse(token).ok_or_else(|| invalid(format!("Unrecognized day '{token}'")))?,
            ),
            None => None,
        };

        let liters = match value_text(&self.liters) {
            Some(text) => Some(
                parse_liters(&text).ok_or_else(|| invalid("Liters must be a positive number"))?,
            ),
            None => None,
        };

        let coordinates = match (self.latitude.is_null(), self.longitude.is_null()) {
            (true, true) => None,
            (false, false) => {
                let pair = value_as_f64(&self.latitude)
                    .zip(value_as_f64(&self.longitude))
                    .filter(|(lat, lon)| valid_lat_lon(*lat, *lon))
                    .ok_or_else(|| invalid("Coordinates must be numbers within range"))?;
                Some(pair)
            }
            _ => return Err(invalid("Latitude and longitude must be given together")),
        };

        let phone = self
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let edit = PointEdit {
            name,
            vehicle,
            day,
            liters,
            phone,
            coordinates,
        };
        if edit.is_empty() {
            return Err(invalid("No fields to update"));
        }
        Ok(edit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn validate(value: Value) -> Result<PointEdit, CoreError> {
        let raw: RawPointEdit = serde_json::from_value(value).unwrap();
        raw.validate(&VehicleRoster::default())
    }

    #[test]
    fn protected_vehicle_is_allowed_on_explicit_edit() {
        let edit = validate(json!({ "camion": "m3" })).unwrap();
        assert_eq!(edit.vehicle.as_deref(), Some("M3"));
    }

    #[test]
    fn parses_lenient_numbers() {
        let edit = validate(json!({ "litros": "75,5", "latitud": "-33,1", "longitud": "-71,2" })).unwrap();
        assert_eq!(edit.liters, Some(75));
        assert_eq!(edit.coordinates, Some((-33.1, -71.2)));
    }

    #[test]
    fn empty_body_is_rejected() {
        assert_matches!(validate(json!({})), Err(CoreError::Validation(msg)) if msg.contains("No fields"));
    }

    #[test]
    fn rejects_bad_fields() {
        assert_matches!(validate(json!({ "camion": "Z9" })), Err(CoreError::Validation(_)));
        assert_matches!(validate(json!({ "dia": "feriado" })), Err(CoreError::Validation(_)));
        assert_matches!(validate(json!({ "litros": 0 })), Err(CoreError::Validation(_)));
        assert_matches!(validate(json!({ "latitud": -33.0 })), Err(CoreError::Validation(_)));
        assert_matches!(validate(json!({ "latitud": 100, "longitud": 0 })), Err(CoreError::Validation(_)));
        assert_matches!(validate(json!({ "nombre": "  " })), Err(CoreError::Validation(_)));
    }

    #[test]
    fn day_is_canonicalized() {
        let edit = validate(json!({ "day": "Sáb" })).unwrap();
        assert_eq!(edit.day, Some(Weekday::Sabado));
    }
}
