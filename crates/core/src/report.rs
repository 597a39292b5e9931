//! Diagnostics returned by every batch apply.
//!
//! A report is always produced, even when the source is unreadable or the
//! transaction fails; `ok` and `outcome` tell the caller which case it is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::merge::{AssignmentConflict, MergeOutcome};
use crate::validation::{BatchValidation, FailureSample, RejectReason};

/// What the apply did to the live table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The table was cleared and repopulated.
    Replaced,
    /// Rows were added next to the existing ones.
    Appended,
    /// Nothing validated and the nonempty guard kept the table as it was.
    SkippedEmpty,
    /// The transaction failed and was rolled back.
    Failed,
    /// The source could not be read as a list of records.
    InvalidSource,
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replaced => "replaced",
            Self::Appended => "appended",
            Self::SkippedEmpty => "skipped_empty",
            Self::Failed => "failed",
            Self::InvalidSource => "invalid_source",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub ok: bool,
    pub outcome: ApplyOutcome,
    pub message: String,
    pub read: usize,
    pub validated: usize,
    pub merged: usize,
    pub inserted: usize,
    pub preserved_protected: usize,
    pub omitted: usize,
    /// Rejected rows per reason code.
    pub motivos: BTreeMap<RejectReason, usize>,
    pub samples: Vec<FailureSample>,
    pub conflicts: Vec<AssignmentConflict>,
}

impl ApplyReport {
    /// Report for a source that never yielded records.
    pub fn invalid_source(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            outcome: ApplyOutcome::InvalidSource,
            message: detail.into(),
            read: 0,
            validated: 0,
            merged: 0,
            inserted: 0,
            preserved_protected: 0,
            omitted: 0,
            motivos: BTreeMap::new(),
            samples: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Pre-transaction diagnostics. The outcome is filled in by one of the
    /// finishing methods below.
    pub fn from_diagnostics(validation: &BatchValidation, merge: &MergeOutcome) -> Self {
        Self {
            ok: false,
            outcome: ApplyOutcome::Failed,
            message: String::new(),
            read: validation.read,
            validated: validation.accepted.len(),
            merged: merge.merged.len(),
            inserted: 0,
            preserved_protected: 0,
            omitted: validation.omitted(),
            motivos: validation.rejected.clone(),
            samples: validation.samples.clone(),
            conflicts: merge.conflicts.clone(),
        }
    }

    pub fn replaced(mut self, inserted: usize, preserved: usize) -> Self {
        self.ok = true;
        self.outcome = ApplyOutcome::Replaced;
        self.inserted = inserted;
        self.preserved_protected = preserved;
        self.message = format!(
            "Replaced live routes with {inserted} points ({preserved} protected rows kept, {} rows omitted)",
            self.omitted
        );
        self
    }

    pub fn appended(mut self, inserted: usize) -> Self {
        self.ok = true;
        self.outcome = ApplyOutcome::Appended;
        self.inserted = inserted;
        self.message = format!(
            "Appended {inserted} points to live routes ({} rows omitted)",
            self.omitted
        );
        self
    }

    pub fn skipped_empty(mut self) -> Self {
        self.ok = false;
        self.outcome = ApplyOutcome::SkippedEmpty;
        self.message = format!(
            "No valid rows to apply; live routes left unchanged ({} rows omitted)",
            self.omitted
        );
        self
    }

    pub fn failed(mut self, detail: impl std::fmt::Display) -> Self {
        self.ok = false;
        self.outcome = ApplyOutcome::Failed;
        self.inserted = 0;
        self.preserved_protected = 0;
        self.message = format!("Apply rolled back: {detail}");
        self
    }
}
