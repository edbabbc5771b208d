//! Batch input records and the file formats they are loaded from.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, TrackerError};

/// Column holding a record's original line identity in failed-record files.
pub const LINE_COLUMN: &str = "line";

/// Column holding the failure reason in failed-record files.
pub const ERROR_COLUMN: &str = "error";

/// Columns written by the failed-record writer; never sent to the server.
pub const RESERVED_COLUMNS: &[&str] = &[LINE_COLUMN, ERROR_COLUMN];

/// The mutation a batch applies to each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured file formats accepted for batch input and failed-record output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Csv,
    Json,
    Yaml,
}

impl InputFormat {
    /// Pick the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UnsupportedFormat`] for anything but
    /// `.csv`, `.json`, `.yaml` and `.yml`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            "yaml" | "yml" => Ok(InputFormat::Yaml),
            _ => Err(TrackerError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// One row of batch input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    /// Stable identity: the physical CSV line, or the 1-based position in a
    /// JSON/YAML list, or the `line` column of a reloaded failed-record file.
    pub line: usize,
    pub operation: OperationKind,
    /// Raw field values keyed by column name.
    pub fields: BTreeMap<String, String>,
}

impl BatchRecord {
    pub fn new<K, V>(
        line: usize,
        operation: OperationKind,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            line,
            operation,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The value of `key`, trimmed; `None` when absent or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The first non-blank value among `keys`.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    /// Non-blank fields, in column-name order.
    pub fn non_empty_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.trim()))
            .filter(|(_, v)| !v.is_empty())
    }
}

/// A loaded batch file.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub format: InputFormat,
    pub operation: OperationKind,
    /// Data columns in first-seen order, reserved columns excluded.
    pub columns: Vec<String>,
    pub records: Vec<BatchRecord>,
}

impl BatchInput {
    /// Load a batch file, choosing the parser by extension.
    pub fn load(path: &Path, operation: OperationKind) -> Result<Self> {
        let format = InputFormat::from_path(path)?;
        tracing::debug!(path = %path.display(), ?format, "Loading batch file");

        match format {
            InputFormat::Csv => {
                let file = std::fs::File::open(path)?;
                Self::from_csv_reader(file, operation)
            }
            InputFormat::Json => Self::from_json_str(&std::fs::read_to_string(path)?, operation),
            InputFormat::Yaml => Self::from_yaml_str(&std::fs::read_to_string(path)?, operation),
        }
    }

    /// Parse CSV with a header row. Each record's line is its physical line in the file.
    pub fn from_csv_reader<R: Read>(mut reader: R, operation: OperationKind) -> Result<Self> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(raw.as_slice());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let columns = data_columns(headers.iter().cloned());

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            let physical_line = row
                .position()
                .map_or(index + 2, |pos| line_at(&raw, pos.byte() as usize));
            let fields = headers
                .iter()
                .zip(row.iter())
                .map(|(k, v)| (k.clone(), v.to_string()));
            records.push(build_record(physical_line, operation, fields));
        }

        Ok(Self {
            format: InputFormat::Csv,
            operation,
            columns,
            records,
        })
    }

    /// Parse a JSON array of objects.
    pub fn from_json_str(text: &str, operation: OperationKind) -> Result<Self> {
        let objects: Vec<Map<String, Value>> = serde_json::from_str(text)?;
        Ok(Self::from_objects(InputFormat::Json, objects, operation))
    }

    /// Parse a YAML list of mappings.
    pub fn from_yaml_str(text: &str, operation: OperationKind) -> Result<Self> {
        let objects: Vec<Map<String, Value>> = serde_yaml::from_str(text)?;
        Ok(Self::from_objects(InputFormat::Yaml, objects, operation))
    }

    fn from_objects(
        format: InputFormat,
        objects: Vec<Map<String, Value>>,
        operation: OperationKind,
    ) -> Self {
        let columns = data_columns(objects.iter().flat_map(|o| o.keys().cloned()));
        let records = objects
            .into_iter()
            .enumerate()
            .map(|(index, object)| {
                let fields = object.into_iter().map(|(k, v)| (k, stringify(v)));
                build_record(index + 1, operation, fields)
            })
            .collect();

        Self {
            format,
            operation,
            columns,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Drop reserved columns; a numeric `line` column overrides the positional line.
fn build_record(
    position: usize,
    operation: OperationKind,
    fields: impl Iterator<Item = (String, String)>,
) -> BatchRecord {
    let mut line = position;
    let mut kept = BTreeMap::new();
    for (key, value) in fields {
        if key == LINE_COLUMN {
            if let Ok(original) = value.trim().parse::<usize>() {
                line = original;
            }
        } else if key != ERROR_COLUMN {
            kept.insert(key, value);
        }
    }

    BatchRecord {
        line,
        operation,
        fields: kept,
    }
}

fn data_columns(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for name in names {
        if !RESERVED_COLUMNS.contains(&name.as_str()) && !columns.contains(&name) {
            columns.push(name);
        }
    }
    columns
}

fn stringify(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// 1-based line of the record starting at `offset`.
///
/// The csv reader skips blank lines without counting them, and a record's
/// byte position may point at those skipped line breaks.
fn line_at(raw: &[u8], offset: usize) -> usize {
    let mut start = offset.min(raw.len());
    while matches!(raw.get(start), Some(b'\r' | b'\n')) {
        start += 1;
    }
    1 + raw[..start].iter().filter(|&&b| b == b'\n').count()
}
