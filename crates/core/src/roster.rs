//! The vehicle roster: which codes may carry deliveries, which one is
//! protected from bulk redistribution, and which one receives points that
//! have no neighbour to copy from.
//!
//! The roster is a value handed to each component, so deployments can
//! configure their own fleet.

use serde::Serialize;

use crate::error::CoreError;

/// Fleet used when no roster is configured.
pub const DEFAULT_VEHICLES: &[&str] = &["A1", "A2", "A3", "A4", "A5", "M1", "M2", "M3"];
pub const DEFAULT_PROTECTED_VEHICLE: &str = "M3";
pub const DEFAULT_FALLBACK_VEHICLE: &str = "A1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleRoster {
    vehicles: Vec<String>,
    protected: String,
    fallback: String,
}

/// Canonical spelling of a vehicle code.
pub fn normalize_vehicle_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl VehicleRoster {
    /// Build a roster, normalizing every code.
    ///
    /// Fails when the roster is empty or when the protected or fallback code
    /// is not one of the vehicles.
    pub fn new<I, S>(vehicles: I, protected: &str, fallback: &str) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut codes: Vec<String> = Vec::new();
        for code in vehicles {
            let code = normalize_vehicle_code(code.as_ref());
            if !code.is_empty() && !codes.contains(&code) {
                codes.push(code);
            }
        }
        if codes.is_empty() {
            return Err(CoreError::Validation(
                "Vehicle roster must contain at least one code".to_string(),
            ));
        }

        let protected = normalize_vehicle_code(protected);
        if !codes.contains(&protected) {
            return Err(CoreError::Validation(format!(
                "Protected vehicle '{protected}' is not in the roster ({})",
                codes.join(", ")
            )));
        }

        let fallback = normalize_vehicle_code(fallback);
        if !codes.contains(&fallback) {
            return Err(CoreError::Validation(format!(
                "Default vehicle '{fallback}' is not in the roster ({})",
                codes.join(", ")
            )));
        }

        Ok(Self {
            vehicles: codes,
            protected,
            fallback,
        })
    }

    /// Whether `code` (any case, surrounding whitespace ignored) is a roster member.
    pub fn contains(&self, code: &str) -> bool {
        let code = normalize_vehicle_code(code);
        self.vehicles.iter().any(|v| *v == code)
    }

    /// Whether `code` is the protected vehicle.
    pub fn is_protected(&self, code: &str) -> bool {
        normalize_vehicle_code(code) == self.protected
    }

    pub fn vehicles(&self) -> &[String] {
        &self.vehicles
    }

    pub fn protected(&self) -> &str {
        &self.protected
    }

    /// Vehicle for placements that found no neighbour.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

impl Default for VehicleRoster {
    fn default() -> Self {
        Self {
            vehicles: DEFAULT_VEHICLES.iter().map(|v| v.to_string()).collect(),
            protected: DEFAULT_PROTECTED_VEHICLE.to_string(),
            fallback: DEFAULT_FALLBACK_VEHICLE.to_string(),
        }
    }
}
