use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::{EtlError, Result};

/// One row of tabular PHI data. Values are scalars: strings, numbers, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: Vec<serde_json::Value>,
}

impl Record {
    pub fn new(values: Vec<serde_json::Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[serde_json::Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&serde_json::Value> {
        self.values.get(index)
    }
}

/// An ordered sequence of records sharing one column set. Stages never mutate
/// a dataset in place; each stage produces its successor.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Result<Self> {
        for (i, record) in records.iter().enumerate() {
            if record.values().len() != columns.len() {
                return Err(EtlError::Processing {
                    message: format!(
                        "row {} has {} values but the dataset has {} columns",
                        i,
                        record.values().len(),
                        columns.len()
                    ),
                });
            }
        }
        Ok(Self { columns, records })
    }

    /// Parses a delimited file. Empty fields become null.
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().from_reader(bytes);
        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let values = row.iter().map(csv_value).collect();
            records.push(Record::new(values));
        }

        Ok(Self { columns, records })
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for record in &self.records {
            writer.write_record(record.values().iter().map(value_to_string))?;
        }
        writer.into_inner().map_err(|e| EtlError::Processing {
            message: format!("failed to flush CSV output: {}", e),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&serde_json::Value> {
        let idx = self.column_index(column)?;
        self.records.get(row)?.get(idx)
    }
}

fn csv_value(field: &str) -> serde_json::Value {
    if field.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::Value::String(field.to_string())
    }
}

/// String form of a scalar, used for CSV output and per-value transforms.
/// Null maps to the empty string.
pub fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A single schema violation. A dataset is accepted only when the full
/// sequence of these is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row: usize,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }
}

/// Immutable audit trail entry. Exactly one is written per run, whatever the
/// outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub run_id: String,
    pub run_date: NaiveDate,
    pub status: RunStatus,
    pub records_processed: u64,
    pub error_message: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn success(run_id: &str, run_date: NaiveDate, records_processed: u64) -> Self {
        Self {
            run_id: run_id.to_string(),
            run_date,
            status: RunStatus::Success,
            records_processed,
            error_message: None,
            completed_at: Utc::now(),
        }
    }

    pub fn failure(run_id: &str, run_date: NaiveDate, message: String) -> Self {
        Self {
            run_id: run_id.to_string(),
            run_date,
            status: RunStatus::Failed,
            records_processed: 0,
            error_message: Some(message),
            completed_at: Utc::now(),
        }
    }
}

/// Head-style description of a stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub size: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Structural shape inferred from an object's byte prefix. Parse failures
/// land in `Error` so callers can still record what they saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum FileShape {
    Csv {
        column_count: usize,
        columns: Vec<String>,
        sample_rows: Vec<String>,
    },
    JsonArray {
        record_count_estimate: usize,
        sample_keys: Vec<String>,
    },
    JsonObject {
        keys: Vec<String>,
    },
    Unsupported,
    Error {
        message: String,
    },
}

/// Derived, read-only description of an uploaded file. Produced once per
/// file, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub key: String,
    pub file_size: u64,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub file_extension: String,
    pub processing_timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub shape: FileShape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub name: String,
    pub data_type: String,
}

/// What gets registered with the external metadata catalog for one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTableSpec {
    pub name: String,
    pub description: String,
    pub columns: Vec<CatalogColumn>,
    pub location: String,
    pub classification: String,
    pub field_delimiter: String,
}
