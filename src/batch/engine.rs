//! Executes a loaded batch against the tracker.

use std::path::PathBuf;

use futures::future::join_all;
use thiserror::Error;

use crate::error::{Result, TrackerError};
use crate::transport::{Method, Transport};

use super::failed::write_failed_records;
use super::mutation::{extract_id, MutationTarget};
use super::record::{BatchInput, BatchRecord, OperationKind};
use super::run::{BatchRun, OperationOutcome, RecordStatus, RollbackFailure, RollbackReport};
use super::validate::{BatchSchema, ValidationResult};

/// How a batch is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Validate only; send nothing.
    pub dry_run: bool,
    /// Keep going after a failed record.
    pub continue_on_error: bool,
    /// Delete this run's creations when a create batch stops on an error.
    pub rollback_on_error: bool,
    /// Records in flight at once. Forced to 1 when rollback is requested.
    pub concurrency: usize,
    /// Where to write records that were not applied.
    pub failed_output: Option<PathBuf>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            continue_on_error: true,
            rollback_on_error: false,
            concurrency: 1,
            failed_output: None,
        }
    }
}

impl BatchOptions {
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    #[must_use]
    pub fn rollback_on_error(mut self, rollback_on_error: bool) -> Self {
        self.rollback_on_error = rollback_on_error;
        self
    }

    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn failed_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.failed_output = Some(path.into());
        self
    }

    /// Records in flight at once, after applying the rollback restriction.
    pub fn effective_concurrency(&self) -> usize {
        if self.rollback_on_error {
            1
        } else {
            self.concurrency.max(1)
        }
    }
}

/// A batch stopped on its first failure (`continue_on_error = false`).
///
/// Raised after rollback finished; `run` holds every outcome, the ledger and
/// the rollback report.
#[derive(Debug, Error)]
#[error("batch stopped at line {line}: {source}")]
pub struct BatchAborted {
    pub line: usize,
    #[source]
    pub source: TrackerError,
    pub run: Box<BatchRun>,
}

/// Validates, executes and, on request, rolls back batch records.
pub struct BatchEngine<'a, T: Transport + ?Sized> {
    transport: &'a T,
    target: MutationTarget,
    schema: BatchSchema,
    options: BatchOptions,
}

impl<'a, T: Transport + ?Sized> BatchEngine<'a, T> {
    pub fn new(transport: &'a T, target: MutationTarget, options: BatchOptions) -> Self {
        Self {
            transport,
            target,
            schema: BatchSchema::default(),
            options,
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: BatchSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Validate every record without sending anything.
    pub fn validate(&self, input: &BatchInput) -> Vec<ValidationResult> {
        input
            .records
            .iter()
            .map(|record| self.schema.validate(record))
            .collect()
    }

    /// Run the batch.
    ///
    /// Every record gets exactly one terminal outcome, in input order. With
    /// `continue_on_error` (the default) failures are recorded and the run
    /// always returns `Ok`.
    ///
    /// # Errors
    ///
    /// [`BatchAborted`] when `continue_on_error` is false and a record fails.
    /// Records after it are skipped and, for creates with `rollback_on_error`,
    /// everything created so far is deleted before returning.
    #[tracing::instrument(
        skip(self, input),
        fields(operation = %input.operation, records = input.len(), dry_run = self.options.dry_run)
    )]
    pub async fn run(&self, input: &BatchInput) -> std::result::Result<BatchRun, BatchAborted> {
        let mut run = BatchRun::new(input.operation, self.options.dry_run);
        let mut slots: Vec<Option<OperationOutcome>> = vec![None; input.len()];
        let mut valid: Vec<usize> = Vec::new();

        for (index, record) in input.records.iter().enumerate() {
            let validation = self.schema.validate(record);
            if validation.is_valid() {
                valid.push(index);
            } else {
                tracing::debug!(line = record.line, "Invalid record: {}", validation.message());
                slots[index] = Some(OperationOutcome::invalid(record, &validation));
            }
        }

        tracing::info!(
            valid = valid.len(),
            invalid = input.len() - valid.len(),
            "Starting batch"
        );

        let mut stopped: Option<(usize, TrackerError)> = None;

        if self.options.dry_run {
            for &index in &valid {
                slots[index] = Some(OperationOutcome::would_apply(&input.records[index]));
            }
        } else {
            let concurrency = self.options.effective_concurrency();
            if concurrency < self.options.concurrency {
                tracing::warn!(
                    requested = self.options.concurrency,
                    "Rollback requested, running records one at a time"
                );
            }

            for window in valid.chunks(concurrency) {
                if let Some((stopped_at, _)) = &stopped {
                    for &index in window {
                        slots[index] =
                            Some(OperationOutcome::skipped(&input.records[index], *stopped_at));
                    }
                    continue;
                }

                let results =
                    join_all(window.iter().map(|&index| self.apply(&input.records[index]))).await;

                for (&index, result) in window.iter().zip(results) {
                    let record = &input.records[index];
                    let outcome = match result {
                        Ok(resource_id) => {
                            if record.operation == OperationKind::Create {
                                match &resource_id {
                                    Some(id) => run.ledger.record(record.line, id.clone()),
                                    None => tracing::warn!(
                                        line = record.line,
                                        "Create succeeded without an id; it cannot be rolled back"
                                    ),
                                }
                            }
                            OperationOutcome::succeeded(record, resource_id)
                        }
                        Err(e) => {
                            tracing::warn!(line = record.line, "Record failed: {}", e);
                            let outcome = OperationOutcome::failed(record, &e);
                            if !self.options.continue_on_error && stopped.is_none() {
                                stopped = Some((record.line, e));
                            }
                            outcome
                        }
                    };
                    slots[index] = Some(outcome);
                }
            }
        }

        run.outcomes = slots.into_iter().flatten().collect();

        if let Some((stopped_at, _)) = &stopped {
            if input.operation == OperationKind::Create && self.options.rollback_on_error {
                let report = self.rollback(&run).await;
                mark_rolled_back(&mut run, &report, *stopped_at);
                run.rollback = Some(report);
            }
        }

        run.finish();
        self.write_failed_output(input, &mut run);

        let summary = run.summary();
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            invalid = summary.invalid,
            skipped = summary.skipped,
            would_apply = summary.would_apply,
            rolled_back = summary.rolled_back,
            "Batch finished"
        );

        match stopped {
            Some((line, source)) => Err(BatchAborted {
                line,
                source,
                run: Box::new(run),
            }),
            None => Ok(run),
        }
    }

    /// Send one record; returns the resource id when known.
    async fn apply(&self, record: &BatchRecord) -> Result<Option<String>> {
        match record.operation {
            OperationKind::Create => {
                let container = self.schema.container(record).ok_or_else(|| {
                    TrackerError::InvalidArgument(format!(
                        "line {}: missing {}",
                        record.line, self.schema.container_keys[0]
                    ))
                })?;
                let path = self.target.create_path(container);
                let body = self.target.create_body(record, &self.schema);

                let response = self
                    .transport
                    .call(Method::POST, &path, &[], Some(&body))
                    .await?;
                let created = response.error_for_status(&path)?;
                Ok(extract_id(&created))
            }
            OperationKind::Update => {
                let id = record.get(self.schema.id_key).ok_or_else(|| {
                    TrackerError::InvalidArgument(format!(
                        "line {}: missing {}",
                        record.line, self.schema.id_key
                    ))
                })?;
                let path = self.target.item_path(id);
                let body = self.target.update_body(record, &self.schema);

                let response = self
                    .transport
                    .call(Method::PATCH, &path, &[], Some(&body))
                    .await?;
                response.error_for_status(&path)?;
                Ok(Some(id.to_string()))
            }
        }
    }

    /// Delete this run's creations, newest first. Never fails; problems go in the report.
    async fn rollback(&self, run: &BatchRun) -> RollbackReport {
        let mut report = RollbackReport::default();
        tracing::info!(created = run.ledger.len(), "Rolling back created resources");

        for entry in run.ledger.entries().iter().rev() {
            let path = self.target.item_path(&entry.id);
            let result = match self.transport.call(Method::DELETE, &path, &[], None).await {
                Ok(response) => response.error_for_status(&path).map(|_| ()),
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    tracing::debug!(line = entry.line, id = %entry.id, "Rolled back");
                    report.deleted.push(entry.clone());
                }
                Err(e) => {
                    tracing::warn!(line = entry.line, id = %entry.id, "Rollback failed: {}", e);
                    report.failures.push(RollbackFailure {
                        line: entry.line,
                        id: Some(entry.id.clone()),
                        error: e.to_string(),
                    });
                }
            }
        }

        // Creations the server never identified cannot be deleted.
        for outcome in &run.outcomes {
            if outcome.status == RecordStatus::Succeeded && outcome.resource_id.is_none() {
                report.failures.push(RollbackFailure {
                    line: outcome.line,
                    id: None,
                    error: "server returned no id for the created resource".to_string(),
                });
            }
        }

        report
    }

    fn write_failed_output(&self, input: &BatchInput, run: &mut BatchRun) {
        let Some(path) = &self.options.failed_output else {
            return;
        };

        run.failed_output = Some(path.clone());
        if let Err(e) = write_failed_records(path, input, run) {
            tracing::warn!(path = %path.display(), "Could not write failed records: {}", e);
            run.failed_output_error = Some(e.to_string());
        }
    }
}

fn mark_rolled_back(run: &mut BatchRun, report: &RollbackReport, stopped_at: usize) {
    for entry in &report.deleted {
        if let Some(outcome) = run
            .outcomes
            .iter_mut()
            .find(|o| o.line == entry.line && o.resource_id.as_deref() == Some(entry.id.as_str()))
        {
            outcome.rolled_back = true;
            outcome.error = Some(format!("rolled back: batch stopped at line {stopped_at}"));
        }
    }
}
