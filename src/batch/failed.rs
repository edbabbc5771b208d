//! Failed-record files: the input shape plus `line` and `error` columns.
//!
//! A failed-record file can be fed straight back into `batch`; the reserved
//! columns are dropped on load and `line` restores each record's identity.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::Result;

use super::record::{BatchInput, BatchRecord, InputFormat, ERROR_COLUMN, LINE_COLUMN};
use super::run::BatchRun;

/// A record that did not end up applied, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRow<'a> {
    pub record: &'a BatchRecord,
    pub error: String,
}

/// Records that need attention (invalid, failed, skipped or rolled back), in input order.
pub fn failed_rows<'a>(input: &'a BatchInput, run: &BatchRun) -> Vec<FailedRow<'a>> {
    input
        .records
        .iter()
        .zip(&run.outcomes)
        .filter(|(_, outcome)| outcome.needs_attention())
        .map(|(record, outcome)| FailedRow {
            record,
            error: outcome
                .error
                .clone()
                .unwrap_or_else(|| outcome.status.to_string()),
        })
        .collect()
}

/// Write the failed records of `run` to `path`, returning how many were written.
///
/// The format follows the extension of `path`; anything `BatchInput::load`
/// would refuse is rejected before the file is created.
pub fn write_failed_records(path: &Path, input: &BatchInput, run: &BatchRun) -> Result<usize> {
    let format = InputFormat::from_path(path)?;
    let rows = failed_rows(input, run);

    match format {
        InputFormat::Csv => write_csv(path, &input.columns, &rows)?,
        InputFormat::Json => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, &to_objects(&rows))?;
            writer.flush()?;
        }
        InputFormat::Yaml => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_yaml::to_writer(&mut writer, &to_objects(&rows))?;
            writer.flush()?;
        }
    }

    tracing::info!(
        path = %path.display(),
        ?format,
        rows = rows.len(),
        "Wrote failed records"
    );
    Ok(rows.len())
}

fn write_csv(path: &Path, columns: &[String], rows: &[FailedRow<'_>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<&str> = columns.iter().map(String::as_str).collect();
    header.extend([LINE_COLUMN, ERROR_COLUMN]);
    writer.write_record(&header)?;

    for row in rows {
        let mut values: Vec<String> = columns
            .iter()
            .map(|col| row.record.fields.get(col).cloned().unwrap_or_default())
            .collect();
        values.push(row.record.line.to_string());
        values.push(row.error.clone());
        writer.write_record(&values)?;
    }

    writer.flush()?;
    Ok(())
}

fn to_objects(rows: &[FailedRow<'_>]) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            let mut object: Map<String, Value> = row
                .record
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            object.insert(LINE_COLUMN.to_string(), Value::from(row.record.line));
            object.insert(ERROR_COLUMN.to_string(), Value::String(row.error.clone()));
            Value::Object(object)
        })
        .collect()
}
