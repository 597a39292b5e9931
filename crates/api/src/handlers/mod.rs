pub mod delivery;
pub mod delivery_log;
