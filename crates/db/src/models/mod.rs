//! Row structs and DTOs.

pub mod delivery_log;
pub mod delivery_point;
