//! Bookkeeping for one batch invocation.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::{BatchRecord, OperationKind};
use super::validate::ValidationResult;

/// Terminal state of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Rejected by validation; never sent.
    Invalid,
    /// Valid, and would have been sent (dry-run).
    WouldApply,
    Succeeded,
    Failed,
    /// Not attempted because the run stopped first.
    Skipped,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Invalid => "invalid",
            RecordStatus::WouldApply => "would_apply",
            RecordStatus::Succeeded => "succeeded",
            RecordStatus::Failed => "failed",
            RecordStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub line: usize,
    pub operation: OperationKind,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// A created resource that was deleted again by rollback.
    pub rolled_back: bool,
}

impl OperationOutcome {
    fn new(record: &BatchRecord, status: RecordStatus) -> Self {
        Self {
            line: record.line,
            operation: record.operation,
            status,
            resource_id: None,
            error: None,
            rolled_back: false,
        }
    }

    pub fn invalid(record: &BatchRecord, validation: &ValidationResult) -> Self {
        Self {
            error: Some(validation.message()),
            ..Self::new(record, RecordStatus::Invalid)
        }
    }

    pub fn would_apply(record: &BatchRecord) -> Self {
        Self::new(record, RecordStatus::WouldApply)
    }

    pub fn succeeded(record: &BatchRecord, resource_id: Option<String>) -> Self {
        Self {
            resource_id,
            ..Self::new(record, RecordStatus::Succeeded)
        }
    }

    pub fn failed(record: &BatchRecord, error: impl fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(record, RecordStatus::Failed)
        }
    }

    pub fn skipped(record: &BatchRecord, stopped_at: usize) -> Self {
        Self {
            error: Some(format!("skipped: batch stopped at line {stopped_at}")),
            ..Self::new(record, RecordStatus::Skipped)
        }
    }

    /// Whether the record ended up applied on the server.
    pub fn is_applied(&self) -> bool {
        self.status == RecordStatus::Succeeded && !self.rolled_back
    }

    /// Whether the record belongs in a failed-record file.
    pub fn needs_attention(&self) -> bool {
        self.rolled_back
            || matches!(
                self.status,
                RecordStatus::Invalid | RecordStatus::Failed | RecordStatus::Skipped
            )
    }
}

/// A resource created by this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub line: usize,
    pub id: String,
}

/// Append-only list of resources created by one run, in creation order.
///
/// Rollback deletes exactly these ids and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CreatedLedger {
    entries: Vec<LedgerEntry>,
}

impl CreatedLedger {
    pub fn record(&mut self, line: usize, id: impl Into<String>) {
        self.entries.push(LedgerEntry {
            line,
            id: id.into(),
        });
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A created resource rollback could not remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackFailure {
    pub line: usize,
    /// `None` when the server never returned an id for the created resource.
    pub id: Option<String>,
    pub error: String,
}

/// Result of a best-effort rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollbackReport {
    /// Deleted resources, in deletion (reverse creation) order.
    pub deleted: Vec<LedgerEntry>,
    pub failures: Vec<RollbackFailure>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Aggregate counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    /// Applied and still in place (rolled-back records are not counted).
    pub succeeded: usize,
    pub failed: usize,
    pub invalid: usize,
    pub skipped: usize,
    pub would_apply: usize,
    pub rolled_back: usize,
    pub rollback_failures: usize,
}

impl BatchSummary {
    /// Whether every record was applied (or would be, in a dry-run).
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.invalid == 0 && self.skipped == 0 && self.rollback_failures == 0
    }
}

/// Everything one batch invocation did.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRun {
    pub operation: OperationKind,
    pub dry_run: bool,
    /// One outcome per input record, in input order.
    pub outcomes: Vec<OperationOutcome>,
    pub ledger: CreatedLedger,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Where failed records were written, if anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_output: Option<PathBuf>,
    /// Why the failed-record file could not be written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_output_error: Option<String>,
}

impl BatchRun {
    pub fn new(operation: OperationKind, dry_run: bool) -> Self {
        Self {
            operation,
            dry_run,
            outcomes: Vec::new(),
            ledger: CreatedLedger::default(),
            rollback: None,
            started_at: Utc::now(),
            finished_at: None,
            failed_output: None,
            failed_output_error: None,
        }
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn outcome(&self, line: usize) -> Option<&OperationOutcome> {
        self.outcomes.iter().find(|o| o.line == line)
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.outcomes.len(),
            ..BatchSummary::default()
        };

        for outcome in &self.outcomes {
            match outcome.status {
                RecordStatus::Invalid => summary.invalid += 1,
                RecordStatus::WouldApply => summary.would_apply += 1,
                RecordStatus::Succeeded if outcome.rolled_back => summary.rolled_back += 1,
                RecordStatus::Succeeded => summary.succeeded += 1,
                RecordStatus::Failed => summary.failed += 1,
                RecordStatus::Skipped => summary.skipped += 1,
            }
        }
        summary.rollback_failures = self.rollback.as_ref().map_or(0, |r| r.failures.len());
        summary
    }

    /// Wall-clock time of the run, once finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}
