//! In-memory [`DeliveryStore`] used by tests and local tooling.
//!
//! A transaction holds the store lock for its whole lifetime and works on a
//! staged copy of the rows; commit swaps the copy in, drop discards it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{DeliveryStore, StoreError, StoreTransaction};
use crate::point::{NewDeliveryPoint, StoredPoint};
use crate::types::DbId;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    rows: Vec<StoredPoint>,
    next_id: DbId,
}

impl MemoryState {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDeliveryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_inserts: Arc<AtomicBool>,
}

impl MemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `points`, ids assigned from 1.
    pub fn with_points(points: impl IntoIterator<Item = NewDeliveryPoint>) -> Self {
        let mut state = MemoryState::default();
        for point in points {
            let id = state.allocate_id();
            state.rows.push(StoredPoint::from_new(id, point));
        }
        Self {
            state: Arc::new(Mutex::new(state)),
            fail_inserts: Arc::default(),
        }
    }

    /// Make every subsequent insert fail with a backend error.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Committed rows, in id order.
    pub async fn rows(&self) -> Vec<StoredPoint> {
        let mut rows = self.state.lock().await.rows.clone();
        rows.sort_by_key(|r| r.id);
        rows
    }
}

#[async_trait]
impl DeliveryStore for MemoryDeliveryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = (*guard).clone();
        Ok(MemoryTransaction {
            guard,
            staged,
            fail_inserts: Arc::clone(&self.fail_inserts),
        })
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_inserts: Arc<AtomicBool>,
}

impl MemoryTransaction {
    fn check_insert(&self) -> Result<(), StoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("insert rejected by memory store".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock_bulk_writes(&mut self) -> Result<(), StoreError> {
        // The store mutex is already held for the life of the transaction.
        Ok(())
    }

    async fn list_all(&mut self) -> Result<Vec<StoredPoint>, StoreError> {
        let mut rows = self.staged.rows.clone();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn list_by_vehicle(&mut self, vehicle: &str) -> Result<Vec<StoredPoint>, StoreError> {
        let wanted = vehicle.trim().to_uppercase();
        let mut rows: Vec<StoredPoint> = self
            .staged
            .rows
            .iter()
            .filter(|r| r.vehicle.trim().to_uppercase() == wanted)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn clear(&mut self) -> Result<u64, StoreError> {
        let removed = self.staged.rows.len() as u64;
        self.staged.rows.clear();
        Ok(removed)
    }

    async fn restore(&mut self, rows: &[StoredPoint]) -> Result<u64, StoreError> {
        self.check_insert()?;
        for row in rows {
            if self.staged.rows.iter().any(|r| r.id == row.id) {
                return Err(StoreError::Backend(
                    format!("duplicate id {} on restore", row.id).into(),
                ));
            }
            self.staged.next_id = self.staged.next_id.max(row.id);
            self.staged.rows.push(row.clone());
        }
        Ok(rows.len() as u64)
    }

    async fn insert_many(&mut self, points: &[NewDeliveryPoint]) -> Result<u64, StoreError> {
        self.check_insert()?;
        for point in points {
            let id = self.staged.allocate_id();
            self.staged.rows.push(StoredPoint::from_new(id, point.clone()));
        }
        Ok(points.len() as u64)
    }

    async fn insert_one(&mut self, point: &NewDeliveryPoint) -> Result<DbId, StoreError> {
        self.check_insert()?;
        let id = self.staged.allocate_id();
        self.staged.rows.push(StoredPoint::from_new(id, point.clone()));
        Ok(id)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        *self.guard = self.staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
