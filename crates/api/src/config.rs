use std::path::PathBuf;

use aguaruta_core::merge::ConflictPolicy;
use aguaruta_core::roster::{
    VehicleRoster, DEFAULT_FALLBACK_VEHICLE, DEFAULT_PROTECTED_VEHICLE, DEFAULT_VEHICLES,
};

/// Server configuration loaded from environment variables.
///
/// Every field has a default suitable for local development. Invalid values
/// abort startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
    /// Upper bound on one batch apply, writer-lock wait included, in seconds
    /// (default: `30`). Must be shorter than the request timeout.
    pub apply_timeout_secs: u64,
    /// Directory batch documents are read from (default: `data`).
    pub source_dir: PathBuf,
    pub roster: VehicleRoster,
    pub conflict_policy: ConflictPolicy,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                      |
    /// |------------------------|------------------------------|
    /// | `HOST`                 | `0.0.0.0`                    |
    /// | `PORT`                 | `3000`                       |
    /// | `REQUEST_TIMEOUT_SECS` | `60`                         |
    /// | `APPLY_TIMEOUT_SECS`   | `30`                         |
    /// | `ROSTER_VEHICLES`      | `A1,A2,A3,A4,A5,M1,M2,M3`    |
    /// | `ROSTER_PROTECTED`     | `M3`                         |
    /// | `ROSTER_DEFAULT`       | `A1`                         |
    /// | `CONFLICT_POLICY`      | `first_wins`                 |
    /// | `SOURCE_DIR`           | `data`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let apply_timeout_secs: u64 = std::env::var("APPLY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("APPLY_TIMEOUT_SECS must be a valid u64");
        if let Err(msg) = check_timeouts(request_timeout_secs, apply_timeout_secs) {
            panic!("{msg}");
        }

        let source_dir =
            PathBuf::from(std::env::var("SOURCE_DIR").unwrap_or_else(|_| "data".into()));

        let vehicles = std::env::var("ROSTER_VEHICLES")
            .map(|v| parse_code_list(&v))
            .unwrap_or_else(|_| DEFAULT_VEHICLES.iter().map(|v| v.to_string()).collect());
        let protected =
            std::env::var("ROSTER_PROTECTED").unwrap_or_else(|_| DEFAULT_PROTECTED_VEHICLE.into());
        let fallback =
            std::env::var("ROSTER_DEFAULT").unwrap_or_else(|_| DEFAULT_FALLBACK_VEHICLE.into());
        let roster = VehicleRoster::new(&vehicles, &protected, &fallback)
            .unwrap_or_else(|e| panic!("Invalid vehicle roster: {e}"));

        let conflict_policy = match std::env::var("CONFLICT_POLICY") {
            Ok(value) => ConflictPolicy::from_str(&value)
                .unwrap_or_else(|| panic!("CONFLICT_POLICY must be first_wins or last_wins, got '{value}'")),
            Err(_) => ConflictPolicy::default(),
        };

        Self {
            host,
            port,
            request_timeout_secs,
            apply_timeout_secs,
            source_dir,
            roster,
            conflict_policy,
        }
    }
}

/// A batch apply must finish, or time out with a report, before the HTTP
/// layer gives up on the request.
pub fn check_timeouts(request_timeout_secs: u64, apply_timeout_secs: u64) -> Result<(), String> {
    if apply_timeout_secs == 0 {
        return Err("APPLY_TIMEOUT_SECS must be greater than zero".into());
    }
    if request_timeout_secs <= apply_timeout_secs {
        return Err(format!(
            "REQUEST_TIMEOUT_SECS ({request_timeout_secs}) must exceed APPLY_TIMEOUT_SECS ({apply_timeout_secs})"
        ));
    }
    Ok(())
}

/// Split a comma-separated list of vehicle codes, dropping blanks.
pub fn parse_code_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
