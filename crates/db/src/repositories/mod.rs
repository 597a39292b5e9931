//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod delivery_log_repo;
pub mod delivery_point_repo;

pub use delivery_log_repo::DeliveryLogRepo;
pub use delivery_point_repo::DeliveryPointRepo;
