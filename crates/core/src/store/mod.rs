//! The persistent-store seam used by the batch engine and the placement
//! routine.
//!
//! A [`DeliveryStore`] opens [`StoreTransaction`]s. Every write made through
//! a transaction becomes visible only on [`StoreTransaction::commit`];
//! dropping a transaction without committing discards its writes.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::point::{NewDeliveryPoint, StoredPoint};
use crate::types::DbId;

pub use memory::MemoryDeliveryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Store transaction timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// One atomic unit of work against the live delivery table.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Take the exclusive bulk-write lock. Held until commit or rollback.
    async fn lock_bulk_writes(&mut self) -> Result<(), StoreError>;

    /// Every row of the live table, in id order.
    async fn list_all(&mut self) -> Result<Vec<StoredPoint>, StoreError>;

    /// Rows whose vehicle code matches `vehicle` (case-insensitive).
    async fn list_by_vehicle(&mut self, vehicle: &str) -> Result<Vec<StoredPoint>, StoreError>;

    /// Delete every row. Returns the number of rows removed.
    async fn clear(&mut self) -> Result<u64, StoreError>;

    /// Re-insert rows exactly as they were, ids included.
    async fn restore(&mut self, rows: &[StoredPoint]) -> Result<u64, StoreError>;

    /// Insert new rows. Returns the number of rows written.
    async fn insert_many(&mut self, points: &[NewDeliveryPoint]) -> Result<u64, StoreError>;

    /// Insert a single row and return its id.
    async fn insert_one(&mut self, point: &NewDeliveryPoint) -> Result<DbId, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// A transactional store holding the live delivery table.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    type Tx: StoreTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}
