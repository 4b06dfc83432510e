use chrono::Utc;

use crate::domain::model::{CatalogColumn, CatalogTableSpec, FileMetadata, FileShape};
use crate::domain::ports::{Catalog, Storage};
use crate::utils::error::Result;

/// Bounded read used for shape inference; never the whole object.
pub const METADATA_SAMPLE_BYTES: usize = 8192;

const SAMPLE_ROW_LIMIT: usize = 2;

enum FileKind {
    Csv,
    Json,
    Unknown,
}

fn file_kind(content_type: &str, extension: &str) -> FileKind {
    if content_type.contains("csv") || extension == "csv" {
        FileKind::Csv
    } else if content_type.contains("json") || extension == "json" {
        FileKind::Json
    } else {
        FileKind::Unknown
    }
}

pub fn file_extension(key: &str) -> String {
    match key.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && !ext.contains('/') => ext.to_string(),
        _ => "unknown".to_string(),
    }
}

/// Infers structural metadata from an object's byte prefix. Parse failures
/// degrade to `FileShape::Error`; this function never fails the caller.
pub fn infer_shape(prefix: &[u8], content_type: &str, extension: &str) -> FileShape {
    match file_kind(content_type, extension) {
        FileKind::Csv => csv_shape(prefix),
        FileKind::Json => json_shape(prefix),
        FileKind::Unknown => FileShape::Unsupported,
    }
}

fn csv_shape(prefix: &[u8]) -> FileShape {
    let text = String::from_utf8_lossy(prefix);
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    match lines.next() {
        None => FileShape::Csv {
            column_count: 0,
            columns: Vec::new(),
            sample_rows: Vec::new(),
        },
        Some(header) => {
            let columns: Vec<String> = header.split(',').map(|c| c.trim().to_string()).collect();
            let sample_rows: Vec<String> =
                lines.take(SAMPLE_ROW_LIMIT).map(|l| l.to_string()).collect();
            FileShape::Csv {
                column_count: columns.len(),
                columns,
                sample_rows,
            }
        }
    }
}

fn json_shape(prefix: &[u8]) -> FileShape {
    let text = String::from_utf8_lossy(prefix);
    match serde_json::from_str::<serde_json::Value>(&text) {
        Err(e) => FileShape::Error {
            message: format!("failed to parse JSON prefix: {}", e),
        },
        Ok(serde_json::Value::Array(items)) => {
            let sample_keys: Vec<String> = items
                .first()
                .and_then(|v| v.as_object())
                .map(|o| o.keys().cloned().collect())
                .unwrap_or_default();
            FileShape::JsonArray {
                record_count_estimate: items.len(),
                sample_keys,
            }
        }
        Ok(serde_json::Value::Object(map)) => FileShape::JsonObject {
            keys: map.keys().cloned().collect(),
        },
        Ok(_) => FileShape::Unsupported,
    }
}

/// Event-driven catalog updater: on a new object, infer its shape, register
/// it with the metadata catalog, and leave a lineage record beside the data.
/// Runs on its own trigger path, independent of the pipeline run.
pub struct CatalogUpdater<S: Storage, C: Catalog> {
    storage: S,
    catalog: C,
    database_name: String,
    table_prefix: String,
    location_prefix: String,
}

impl<S: Storage, C: Catalog> CatalogUpdater<S, C> {
    pub fn new(
        storage: S,
        catalog: C,
        database_name: String,
        table_prefix: String,
        location_prefix: String,
    ) -> Self {
        Self {
            storage,
            catalog,
            database_name,
            table_prefix,
            location_prefix,
        }
    }

    pub async fn process_object(&self, key: &str) -> Result<FileMetadata> {
        let metadata = self.extract_metadata(key).await;
        tracing::info!(key, shape = ?metadata.shape, "extracted file metadata");

        let spec = self.table_spec(key, &metadata);
        self.catalog
            .create_or_update(&self.database_name, &spec)
            .await?;
        tracing::info!(table = %spec.name, "catalog entry registered");

        self.write_lineage(key, &metadata).await?;
        Ok(metadata)
    }

    /// Never fails: storage or parse trouble degrades to a minimal metadata
    /// record carrying the error string.
    pub async fn extract_metadata(&self, key: &str) -> FileMetadata {
        match self.try_extract(key).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(key, error = %e, "metadata extraction degraded");
                FileMetadata {
                    key: key.to_string(),
                    file_size: 0,
                    content_type: "application/octet-stream".to_string(),
                    last_modified: None,
                    file_extension: file_extension(key),
                    processing_timestamp: Utc::now(),
                    shape: FileShape::Error {
                        message: e.to_string(),
                    },
                }
            }
        }
    }

    async fn try_extract(&self, key: &str) -> Result<FileMetadata> {
        let info = self.storage.head_file(key).await?;
        let content_type = info
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let prefix = self.storage.read_prefix(key, METADATA_SAMPLE_BYTES).await?;
        let extension = file_extension(key);
        let shape = infer_shape(&prefix, &content_type, &extension);

        Ok(FileMetadata {
            key: key.to_string(),
            file_size: info.size,
            content_type,
            last_modified: info.last_modified,
            file_extension: extension,
            processing_timestamp: Utc::now(),
            shape,
        })
    }

    fn table_spec(&self, key: &str, metadata: &FileMetadata) -> CatalogTableSpec {
        let (columns, classification, field_delimiter) = match &metadata.shape {
            FileShape::Csv { columns, .. } if !columns.is_empty() => (
                columns
                    .iter()
                    .map(|name| CatalogColumn {
                        name: name.clone(),
                        data_type: "string".to_string(),
                    })
                    .collect(),
                "csv".to_string(),
                ",".to_string(),
            ),
            _ => (
                vec![CatalogColumn {
                    name: "data".to_string(),
                    data_type: "string".to_string(),
                }],
                "json".to_string(),
                "\t".to_string(),
            ),
        };

        CatalogTableSpec {
            name: format!("{}_{}", self.table_prefix, Utc::now().format("%Y%m%d")),
            description: format!("Processed data from {}", key),
            columns,
            location: format!("{}/{}", self.location_prefix, key),
            classification,
            field_delimiter,
        }
    }

    async fn write_lineage(&self, key: &str, metadata: &FileMetadata) -> Result<()> {
        let lineage = serde_json::json!({
            "source_key": key,
            "processing_stage": "object_created_event",
            "processing_timestamp": Utc::now(),
            "file_metadata": metadata,
        });
        let lineage_key = format!(
            "lineage/{}/{}_lineage.json",
            Utc::now().format("%Y/%m/%d"),
            key.replace('/', "_")
        );
        self.storage
            .write_file(&lineage_key, &serde_json::to_vec_pretty(&lineage)?)
            .await?;
        tracing::info!(key = %lineage_key, "lineage record written");
        Ok(())
    }
}
