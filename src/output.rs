//! Output formatting for CLI display.
//!
//! Listings are schemaless JSON records, so their tables are built column by
//! column; batch results implement [`PrettyPrint`] for human-readable output
//! as an alternative to JSON serialization.

use serde_json::Value;
use tabled::builder::Builder;
use tabled::{Table, Tabled};

use crate::batch::{BatchRun, BatchSummary, OperationOutcome};

/// Trait for human-readable key-value output.
///
/// Implemented by result types to provide formatted output suitable for
/// terminal display when `--json` is not specified.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

/// Columns for a listing table.
///
/// The requested fields when given, otherwise every key seen across the
/// records in first-seen order, with `id` first.
pub fn record_columns(items: &[Value], requested: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !columns.iter().any(|c| c == name) {
            columns.push(name.to_string());
        }
    };

    if !requested.is_empty() {
        requested.iter().for_each(|c| push(c.as_str()));
        return columns;
    }

    if items.iter().any(|item| item.get("id").is_some()) {
        push("id");
    }
    for item in items {
        if let Value::Object(map) = item {
            map.keys().for_each(|k| push(k.as_str()));
        }
    }
    columns
}

/// Render records as a table with the given columns.
pub fn records_table(items: &[Value], columns: &[String]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for item in items {
        builder.push_record(columns.iter().map(|col| cell(item.get(col))));
    }
    builder.build().to_string()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => map
            .get("name")
            .or_else(|| map.get("id"))
            .map_or_else(|| Value::Object(map.clone()).to_string(), |v| cell(Some(v))),
        Some(other) => other.to_string(),
    }
}

impl PrettyPrint for BatchSummary {
    fn pretty_print(&self) -> String {
        let mut lines = vec![format!("Total:          {}", self.total)];

        if self.would_apply > 0 {
            lines.push(format!("Would apply:    {}", self.would_apply));
        }
        lines.push(format!("Succeeded:      {}", self.succeeded));
        lines.push(format!("Failed:         {}", self.failed));
        lines.push(format!("Invalid:        {}", self.invalid));
        if self.skipped > 0 {
            lines.push(format!("Skipped:        {}", self.skipped));
        }
        if self.rolled_back > 0 || self.rollback_failures > 0 {
            lines.push(format!(
                "Rolled back:    {} ({} could not be removed)",
                self.rolled_back, self.rollback_failures
            ));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for BatchRun {
    fn pretty_print(&self) -> String {
        let header = if self.dry_run {
            format!("Batch {} (dry run)", self.operation)
        } else {
            format!("Batch {}", self.operation)
        };
        let divider = "─".repeat(header.len().max(30));

        let mut lines = vec![header, divider, self.summary().pretty_print()];

        if let Some(duration) = self.duration() {
            lines.push(format!(
                "Duration:       {:.1}s",
                duration.num_milliseconds() as f64 / 1000.0
            ));
        }

        let attention: Vec<OutcomeRow> = self
            .outcomes
            .iter()
            .filter(|o| o.needs_attention())
            .map(OutcomeRow::from)
            .collect();
        if !attention.is_empty() {
            lines.push(String::new());
            lines.push(Table::new(attention).to_string());
        }

        if let Some(report) = &self.rollback {
            for failure in &report.failures {
                lines.push(format!(
                    "Rollback failed for line {} ({}): {}",
                    failure.line,
                    failure.id.as_deref().unwrap_or("no id"),
                    failure.error
                ));
            }
        }

        if let Some(path) = &self.failed_output {
            match &self.failed_output_error {
                Some(e) => lines.push(format!(
                    "Failed records NOT written to {}: {e}",
                    path.display()
                )),
                None => lines.push(format!("Failed records: {}", path.display())),
            }
        }

        lines.join("\n")
    }
}

#[derive(Tabled)]
struct OutcomeRow {
    line: usize,
    status: String,
    id: String,
    error: String,
}

impl From<&OperationOutcome> for OutcomeRow {
    fn from(o: &OperationOutcome) -> Self {
        Self {
            line: o.line,
            status: if o.rolled_back {
                "rolled_back".to_string()
            } else {
                o.status.to_string()
            },
            id: o.resource_id.clone().unwrap_or_default(),
            error: o.error.clone().unwrap_or_default(),
        }
    }
}
