//! Domain logic for the AguaRuta delivery-assignment service.
//!
//! Everything here is independent of the HTTP layer and of PostgreSQL:
//!
//! - [`normalize`], [`validation`], [`merge`] and [`report`] are pure
//!   functions over in-memory records.
//! - [`engine`] and [`placement`] drive those functions against any
//!   [`store::DeliveryStore`] implementation.
//! - [`delivery_log`] validates crew delivery reports and log filters.

pub mod delivery_log;
pub mod edit;
pub mod engine;
pub mod error;
pub mod geo;
pub mod merge;
pub mod normalize;
pub mod placement;
pub mod point;
pub mod report;
pub mod roster;
pub mod source;
pub mod store;
pub mod types;
pub mod validation;
pub mod weekday;
