use std::sync::Arc;
use std::time::Duration;

use aguaruta_core::engine::BatchApplier;
use aguaruta_db::PgDeliveryStore;
use tokio::sync::Mutex;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: inner data is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: aguaruta_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Transactional store used by batch apply and registration.
    pub store: PgDeliveryStore,
    pub applier: Arc<BatchApplier>,
    /// Single-writer lock shared with `applier`; held while a batch is
    /// written so only one apply runs per process.
    pub bulk_writer: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(pool: aguaruta_db::DbPool, config: ServerConfig) -> Self {
        let bulk_writer = Arc::new(Mutex::new(()));
        let applier = BatchApplier::new(config.roster.clone())
            .with_policy(config.conflict_policy)
            .with_timeout(Duration::from_secs(config.apply_timeout_secs))
            .with_writer(bulk_writer.clone())
            .with_source_dir(config.source_dir.clone());

        Self {
            store: PgDeliveryStore::new(pool.clone()),
            pool,
            config: Arc::new(config),
            applier: Arc::new(applier),
            bulk_writer,
        }
    }
}
