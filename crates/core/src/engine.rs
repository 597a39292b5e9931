//! Batch apply: validate, merge, then write the result to the live table
//! in one transaction.
//!
//! All validation and merging happens in memory before the store is
//! touched. The write step clears and repopulates the table (or appends to
//! it) inside a single transaction; any failure drops the transaction,
//! which rolls it back. Waiting for the single-writer lock and the write
//! itself share one timeout, so a queued apply still ends with a report.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::merge::{merge_households, ConflictPolicy};
use crate::point::NewDeliveryPoint;
use crate::report::ApplyReport;
use crate::roster::VehicleRoster;
use crate::source::BatchSource;
use crate::store::{DeliveryStore, StoreError, StoreTransaction};
use crate::validation::validate_batch;

/// Default bound on the apply transaction.
pub const DEFAULT_APPLY_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Flags and planning
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

/// Caller-controlled switches for one apply. Every flag defaults to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyFlags {
    /// Keep the protected vehicle's rows across a replace.
    #[serde(default = "default_true")]
    pub preserve_protected: bool,
    /// Clear the table before inserting. When false, rows are appended.
    #[serde(default = "default_true")]
    pub replace: bool,
    /// Refuse to replace when nothing validated.
    #[serde(default = "default_true")]
    pub replace_only_if_nonempty: bool,
}

impl Default for ApplyFlags {
    fn default() -> Self {
        Self {
            preserve_protected: true,
            replace: true,
            replace_only_if_nonempty: true,
        }
    }
}

/// What the write step will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPlan {
    Replace { preserve_protected: bool },
    Append,
    /// Leave the table untouched.
    SkipEmpty,
}

impl ApplyPlan {
    pub fn decide(flags: ApplyFlags, merged_rows: usize) -> Self {
        if !flags.replace {
            return Self::Append;
        }
        if merged_rows == 0 && flags.replace_only_if_nonempty {
            return Self::SkipEmpty;
        }
        Self::Replace {
            preserve_protected: flags.preserve_protected,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Written {
    inserted: u64,
    preserved: u64,
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BatchApplier {
    roster: VehicleRoster,
    policy: ConflictPolicy,
    timeout: Duration,
    /// Held across the write step so one apply runs at a time.
    writer: Arc<Mutex<()>>,
    /// Directory document sources are read from. `None` disables them.
    source_dir: Option<PathBuf>,
}

impl BatchApplier {
    pub fn new(roster: VehicleRoster) -> Self {
        Self {
            roster,
            policy: ConflictPolicy::default(),
            timeout: DEFAULT_APPLY_TIMEOUT,
            writer: Arc::new(Mutex::new(())),
            source_dir: None,
        }
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Share the single-writer lock with other holders.
    pub fn with_writer(mut self, writer: Arc<Mutex<()>>) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    pub fn roster(&self) -> &VehicleRoster {
        &self.roster
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }

    /// Load `source` and apply its records. A structurally invalid source
    /// yields an `invalid_source` report without touching the store.
    pub async fn apply_source<S: DeliveryStore>(
        &self,
        store: &S,
        source: BatchSource,
        flags: ApplyFlags,
    ) -> ApplyReport {
        match source.load(self.source_dir()).await {
            Ok(records) => self.apply(store, &records, flags).await,
            Err(err) => {
                tracing::warn!(error = %err, "Batch source rejected");
                ApplyReport::invalid_source(err.to_string())
            }
        }
    }

    /// Validate, merge and write `records`.
    pub async fn apply<S: DeliveryStore>(
        &self,
        store: &S,
        records: &[Value],
        flags: ApplyFlags,
    ) -> ApplyReport {
        let validation = validate_batch(records, &self.roster);
        let merge = merge_households(validation.accepted.clone(), self.policy);
        let report = ApplyReport::from_diagnostics(&validation, &merge);

        let plan = ApplyPlan::decide(flags, merge.merged.len());
        tracing::info!(
            read = report.read,
            validated = report.validated,
            merged = report.merged,
            omitted = report.omitted,
            conflicts = report.conflicts.len(),
            ?plan,
            "Applying delivery batch"
        );

        if plan == ApplyPlan::SkipEmpty {
            tracing::info!("No valid rows; live routes left unchanged");
            return report.skipped_empty();
        }

        let rows: Vec<NewDeliveryPoint> = merge.merged.into_iter().map(Into::into).collect();

        let serialized = async {
            let _writer = self.writer.lock().await;
            self.write(store, plan, &rows).await
        };
        let result = match tokio::time::timeout(self.timeout, serialized).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        };

        match result {
            Ok(written) => {
                let inserted = written.inserted as usize;
                let report = match plan {
                    ApplyPlan::Append => report.appended(inserted),
                    _ => report.replaced(inserted, written.preserved as usize),
                };
                tracing::info!(
                    inserted = report.inserted,
                    preserved_protected = report.preserved_protected,
                    outcome = report.outcome.as_str(),
                    "Delivery batch applied"
                );
                report
            }
            Err(err) => {
                tracing::error!(error = %err, "Delivery batch rolled back");
                report.failed(err)
            }
        }
    }

    async fn write<S: DeliveryStore>(
        &self,
        store: &S,
        plan: ApplyPlan,
        rows: &[NewDeliveryPoint],
    ) -> Result<Written, StoreError> {
        let mut tx = store.begin().await?;
        match self.stage(&mut tx, plan, rows).await {
            Ok(written) => {
                tx.commit().await?;
                Ok(written)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback after failed apply also failed");
                }
                Err(err)
            }
        }
    }

    async fn stage<T: StoreTransaction>(
        &self,
        tx: &mut T,
        plan: ApplyPlan,
        rows: &[NewDeliveryPoint],
    ) -> Result<Written, StoreError> {
        tx.lock_bulk_writes().await?;

        let mut written = Written::default();
        if let ApplyPlan::Replace { preserve_protected } = plan {
            let kept = if preserve_protected {
                tx.list_by_vehicle(self.roster.protected()).await?
            } else {
                Vec::new()
            };
            let removed = tx.clear().await?;
            if !kept.is_empty() {
                written.preserved = tx.restore(&kept).await?;
            }
            tracing::debug!(removed, preserved = written.preserved, "Live routes cleared");
        }

        if !rows.is_empty() {
            written.inserted = tx.insert_many(rows).await?;
        }
        Ok(written)
    }
}
