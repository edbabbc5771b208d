//! Bulk create/update from structured files.
//!
//! A batch is loaded into [`BatchInput`], validated record by record against
//! [`BatchSchema`], executed by [`BatchEngine`] through the transport, and
//! reported as a [`BatchRun`]. Records that did not end up applied can be
//! written to a failed-record file and fed back in later.

mod engine;
mod failed;
mod mutation;
mod record;
mod run;
mod validate;

pub use engine::{BatchAborted, BatchEngine, BatchOptions};
pub use failed::{failed_rows, write_failed_records, FailedRow};
pub use mutation::{extract_id, MutationTarget};
pub use record::{
    BatchInput, BatchRecord, InputFormat, OperationKind, ERROR_COLUMN, LINE_COLUMN,
    RESERVED_COLUMNS,
};
pub use run::{
    BatchRun, BatchSummary, CreatedLedger, LedgerEntry, OperationOutcome, RecordStatus,
    RollbackFailure, RollbackReport,
};
pub use validate::{BatchSchema, FieldError, ValidationResult};
