//! Delivery log: what crews report after each stop, and how the log is
//! filtered.
//!
//! Any status beginning with `NO` ("NO ENTREGADO", "NO ENTREGADA", ...)
//! counts as an undelivered stop.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::geo::valid_lat_lon;
use crate::normalize::{value_as_f64, value_text};
use crate::roster::normalize_vehicle_code;
use crate::types::Timestamp;
use crate::validation::parse_liters;

/// Prefix shared by every undelivered status.
pub const UNDELIVERED_PREFIX: &str = "NO";

/// Canonical spelling of a status: trimmed, single-spaced, uppercase.
pub fn normalize_status(status: &str) -> String {
    status
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

pub fn is_undelivered(status: &str) -> bool {
    normalize_status(status).starts_with(UNDELIVERED_PREFIX)
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]` (read as UTC) or a bare date
/// (midnight UTC).
pub fn parse_timestamp(text: &str) -> Option<Timestamp> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    parse_date(text).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|n| Utc.from_utc_datetime(&n))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

/// A delivery report as sent by a crew.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDeliveryLog {
    #[serde(default, alias = "nombre")]
    pub name: Option<String>,
    #[serde(default, alias = "camion")]
    pub vehicle: Option<String>,
    #[serde(default, alias = "litros")]
    pub liters: Value,
    #[serde(default, alias = "estado")]
    pub status: Option<String>,
    #[serde(default, alias = "fecha")]
    pub delivered_at: Option<String>,
    #[serde(default, alias = "latitud")]
    pub latitude: Value,
    #[serde(default, alias = "longitud")]
    pub longitude: Value,
}

/// A validated delivery report. A missing `delivered_at` means "now".
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeliveryLog {
    pub household_name: String,
    pub vehicle_code: Option<String>,
    pub liters: Option<i32>,
    pub status: String,
    pub delivered_at: Option<Timestamp>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl RawDeliveryLog {
    pub fn validate(&self) -> Result<NewDeliveryLog, CoreError> {
        let household_name = non_blank(self.name.as_deref())
            .ok_or_else(|| CoreError::Validation("Household name is required".into()))?;
        let status = non_blank(self.status.as_deref())
            .map(normalize_status)
            .ok_or_else(|| CoreError::Validation("Delivery status is required".into()))?;

        let liters = match value_text(&self.liters) {
            Some(text) => Some(parse_liters(&text).ok_or_else(|| {
                CoreError::Validation(format!("Liters must be a positive number, got '{text}'"))
            })?),
            None => None,
        };

        let delivered_at = match non_blank(self.delivered_at.as_deref()) {
            Some(text) => Some(parse_timestamp(text).ok_or_else(|| {
                CoreError::Validation(format!("Unrecognized delivery date '{text}'"))
            })?),
            None => None,
        };

        let coordinates = if value_text(&self.latitude).is_none() && value_text(&self.longitude).is_none() {
            None
        } else {
            Some(
                value_as_f64(&self.latitude)
                    .zip(value_as_f64(&self.longitude))
                    .filter(|(lat, lon)| valid_lat_lon(*lat, *lon))
                    .ok_or_else(|| {
                        CoreError::Validation("Latitude and longitude must be a valid pair".into())
                    })?,
            )
        };

        Ok(NewDeliveryLog {
            household_name: household_name.to_string(),
            vehicle_code: non_blank(self.vehicle.as_deref()).map(normalize_vehicle_code),
            liters,
            status,
            delivered_at,
            latitude: coordinates.map(|c| c.0),
            longitude: coordinates.map(|c| c.1),
        })
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Query parameters for listing the log. Dates are `YYYY-MM-DD`, inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryLogQuery {
    #[serde(default, alias = "desde")]
    pub from: Option<String>,
    #[serde(default, alias = "hasta")]
    pub to: Option<String>,
    #[serde(default, alias = "estado")]
    pub status: Option<String>,
    #[serde(default, alias = "camion")]
    pub vehicle: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryLogFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Exact status, already normalized.
    pub status: Option<String>,
    pub vehicle: Option<String>,
    /// Keep only statuses starting with [`UNDELIVERED_PREFIX`].
    pub undelivered_only: bool,
}

impl DeliveryLogQuery {
    pub fn into_filter(self) -> Result<DeliveryLogFilter, CoreError> {
        let date = |field: &str, value: Option<&str>| -> Result<Option<NaiveDate>, CoreError> {
            match non_blank(value) {
                Some(text) => parse_date(text).map(Some).ok_or_else(|| {
                    CoreError::Validation(format!("'{field}' must be a YYYY-MM-DD date, got '{text}'"))
                }),
                None => Ok(None),
            }
        };
        let from = date("from", self.from.as_deref())?;
        let to = date("to", self.to.as_deref())?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(CoreError::Validation(format!(
                    "'from' ({from}) is after 'to' ({to})"
                )));
            }
        }

        Ok(DeliveryLogFilter {
            from,
            to,
            status: non_blank(self.status.as_deref()).map(normalize_status),
            vehicle: non_blank(self.vehicle.as_deref()).map(normalize_vehicle_code),
            undelivered_only: false,
        })
    }

    /// Filter for undelivered stops. Any `status` parameter is ignored.
    pub fn into_undelivered_filter(self) -> Result<DeliveryLogFilter, CoreError> {
        Ok(DeliveryLogFilter {
            status: None,
            undelivered_only: true,
            ..self.into_filter()?
        })
    }
}
