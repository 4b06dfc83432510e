use async_trait::async_trait;
use chrono::NaiveDate;

use crate::core::masking::MaskingRuleSet;
use crate::core::quality::{self, QualityPolicy};
use crate::core::schema::Schema;
use crate::domain::model::{value_to_string, AuditRecord, Dataset};
use crate::domain::ports::{Database, Pipeline, Source, Storage};
use crate::utils::error::{EtlError, Result};

/// Per-run configuration for the PHI pipeline. Constructed once at run start
/// and never hot-reloaded mid-run.
pub struct PipelineSettings {
    pub schema: Schema,
    pub rules: MaskingRuleSet,
    pub quality: QualityPolicy,
    pub table: String,
    pub audit_table: String,
    pub run_date: NaiveDate,
}

/// The six-stage PHI pipeline over explicit collaborator handles. Handles
/// are scoped to the run; there are no process-wide clients.
pub struct PhiPipeline<S: Storage, D: Database, Src: Source> {
    storage: S,
    db: D,
    source: Src,
    settings: PipelineSettings,
}

impl<S: Storage, D: Database, Src: Source> PhiPipeline<S, D, Src> {
    pub fn new(storage: S, db: D, source: Src, settings: PipelineSettings) -> Self {
        Self {
            storage,
            db,
            source,
            settings,
        }
    }

    fn raw_key(&self) -> String {
        format!("raw/{}/phi_data.csv", self.settings.run_date)
    }

    fn processed_key(&self) -> String {
        format!("processed/{}/phi_data_cleaned.csv", self.settings.run_date)
    }
}

#[async_trait]
impl<S: Storage, D: Database, Src: Source> Pipeline for PhiPipeline<S, D, Src> {
    async fn extract(&self) -> Result<Dataset> {
        let bytes = self.source.fetch().await?;
        tracing::info!(bytes = bytes.len(), key = %self.raw_key(), "extracted raw input");
        self.storage.write_file(&self.raw_key(), &bytes).await?;
        Dataset::from_csv(&bytes)
    }

    async fn validate(&self, dataset: &Dataset) -> Result<()> {
        let errors = self.settings.schema.validate(dataset);
        if errors.is_empty() {
            tracing::info!(records = dataset.len(), "schema validation passed");
            Ok(())
        } else {
            Err(EtlError::SchemaValidation { errors })
        }
    }

    async fn mask(&self, dataset: Dataset) -> Result<Dataset> {
        if self.settings.rules.is_empty() {
            tracing::warn!("no masking rules configured; dataset passes through unmasked");
        }
        let masked = self.settings.rules.apply(&dataset);
        self.storage
            .write_file(&self.processed_key(), &masked.to_csv()?)
            .await?;
        tracing::info!(key = %self.processed_key(), "wrote masked dataset");
        Ok(masked)
    }

    async fn load(&self, dataset: &Dataset) -> Result<usize> {
        let table = &self.settings.table;
        let mut columns: Vec<String> = dataset.columns().to_vec();
        columns.push("load_date".to_string());

        let column_ddl: Vec<String> = columns.iter().map(|c| format!("{} TEXT", c)).collect();
        self.db
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} ({})",
                    table,
                    column_ddl.join(", ")
                ),
                &[],
            )
            .await?;

        let load_date = self.settings.run_date.to_string();
        let rows: Vec<Vec<Option<String>>> = dataset
            .records()
            .iter()
            .map(|record| {
                let mut row: Vec<Option<String>> =
                    record.values().iter().map(sql_value).collect();
                row.push(Some(load_date.clone()));
                row
            })
            .collect();

        if !rows.is_empty() {
            self.db.batch_insert(table, &columns, &rows).await?;
        }
        tracing::info!(records = rows.len(), table = %table, "loaded masked records");
        Ok(rows.len())
    }

    async fn quality_check(&self, dataset: &Dataset) -> Result<()> {
        let report = quality::check(dataset, &self.settings.quality);
        tracing::info!(
            null_identity = report.null_identity_count,
            duplicates = report.duplicate_count,
            "quality check evaluated"
        );
        report.into_result()
    }

    async fn audit(&self, record: &AuditRecord) -> Result<()> {
        let audit_table = &self.settings.audit_table;
        self.db
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (run_id TEXT, run_date TEXT, status TEXT, \
                     completed_at TEXT, records_processed TEXT, error_message TEXT)",
                    audit_table
                ),
                &[],
            )
            .await?;

        // Count of records present for the logical date. Failed runs may not
        // have a table yet; that reads as zero, not as an audit failure.
        let count_sql = format!(
            "SELECT COUNT(*) FROM {} WHERE load_date = '{}'",
            self.settings.table, self.settings.run_date
        );
        let count = match self.db.query_scalar(&count_sql).await {
            Ok(n) => n.unwrap_or(0),
            Err(e) => {
                tracing::warn!(error = %e, "could not count loaded records for audit");
                0
            }
        };

        let params = vec![
            Some(record.run_id.clone()),
            Some(record.run_date.to_string()),
            Some(record.status.as_str().to_string()),
            Some(record.completed_at.to_rfc3339()),
            Some(count.to_string()),
            record.error_message.clone(),
        ];
        self.db
            .execute(
                &format!(
                    "INSERT INTO {} (run_id, run_date, status, completed_at, \
                     records_processed, error_message) VALUES ($1, $2, $3, $4, $5, $6)",
                    audit_table
                ),
                &params,
            )
            .await?;

        tracing::info!(
            run_id = %record.run_id,
            status = record.status.as_str(),
            records = count,
            "audit record written"
        );
        Ok(())
    }
}

fn sql_value(value: &serde_json::Value) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(value_to_string(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ObjectInfo;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| EtlError::Storage {
                message: format!("file not found: {}", path),
            })
        }

        async fn read_prefix(&self, path: &str, limit: usize) -> Result<Vec<u8>> {
            let mut data = self.read_file(path).await?;
            data.truncate(limit);
            Ok(data)
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn head_file(&self, path: &str) -> Result<ObjectInfo> {
            let files = self.files.lock().await;
            let data = files.get(path).ok_or_else(|| EtlError::Storage {
                message: format!("file not found: {}", path),
            })?;
            Ok(ObjectInfo {
                size: data.len() as u64,
                content_type: None,
                last_modified: None,
            })
        }
    }

    #[derive(Default)]
    struct DbState {
        statements: Vec<(String, Vec<Option<String>>)>,
        inserts: Vec<(String, Vec<String>, Vec<Vec<Option<String>>>)>,
    }

    #[derive(Clone)]
    struct FakeDatabase {
        state: Arc<Mutex<DbState>>,
    }

    impl FakeDatabase {
        fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(DbState::default())),
            }
        }
    }

    #[async_trait]
    impl Database for FakeDatabase {
        async fn execute(&self, sql: &str, params: &[Option<String>]) -> Result<()> {
            let mut state = self.state.lock().await;
            state.statements.push((sql.to_string(), params.to_vec()));
            Ok(())
        }

        async fn query_scalar(&self, _sql: &str) -> Result<Option<i64>> {
            let state = self.state.lock().await;
            let loaded: usize = state.inserts.iter().map(|(_, _, rows)| rows.len()).sum();
            Ok(Some(loaded as i64))
        }

        async fn batch_insert(
            &self,
            table: &str,
            columns: &[String],
            rows: &[Vec<Option<String>>],
        ) -> Result<()> {
            let mut state = self.state.lock().await;
            state
                .inserts
                .push((table.to_string(), columns.to_vec(), rows.to_vec()));
            Ok(())
        }
    }

    struct FixedSource {
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl Source for FixedSource {
        async fn fetch(&self) -> Result<Vec<u8>> {
            Ok(self.bytes.clone())
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            schema: Schema::from_json_str(
                r#"{
                    "required": ["encounter_date"],
                    "properties": { "ssn": { "pattern": "^\\d{3}-\\d{2}-\\d{4}$" } }
                }"#,
            )
            .unwrap(),
            rules: MaskingRuleSet::new(vec![
                ("ssn".to_string(), "hash".to_string()),
                ("email".to_string(), "mask".to_string()),
            ])
            .unwrap(),
            quality: QualityPolicy {
                identity_fields: vec!["patient_id".to_string()],
                uniqueness_key: vec!["patient_id".to_string(), "encounter_date".to_string()],
            },
            table: "phi_data".to_string(),
            audit_table: "etl_audit_log".to_string(),
            run_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    fn pipeline(
        storage: MockStorage,
        db: FakeDatabase,
        csv: &str,
    ) -> PhiPipeline<MockStorage, FakeDatabase, FixedSource> {
        PhiPipeline::new(
            storage,
            db,
            FixedSource {
                bytes: csv.as_bytes().to_vec(),
            },
            settings(),
        )
    }

    const INPUT_CSV: &str = "patient_id,encounter_date,ssn,email\n\
        p-1,2024-01-15,123-45-6789,ab@example.com\n\
        p-2,2024-01-15,987-65-4321,cd@example.com\n";

    #[tokio::test]
    async fn extract_writes_raw_object_and_parses_dataset() {
        let storage = MockStorage::new();
        let pipeline = pipeline(storage.clone(), FakeDatabase::new(), INPUT_CSV);

        let dataset = pipeline.extract().await.unwrap();

        assert_eq!(dataset.len(), 2);
        let raw = storage.get_file("raw/2024-01-15/phi_data.csv").await;
        assert_eq!(raw.unwrap(), INPUT_CSV.as_bytes());
    }

    #[tokio::test]
    async fn validate_reports_every_invalid_row() {
        let pipeline = pipeline(MockStorage::new(), FakeDatabase::new(), INPUT_CSV);
        let bad_csv = "patient_id,encounter_date,ssn,email\n\
            p-1,,123-45-6789,ab@example.com\n\
            p-2,2024-01-15,not-an-ssn,cd@example.com\n";
        let dataset = Dataset::from_csv(bad_csv.as_bytes()).unwrap();

        let err = pipeline.validate(&dataset).await.unwrap_err();
        match err {
            EtlError::SchemaValidation { errors } => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].row, 0);
                assert_eq!(errors[1].row, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn mask_writes_processed_object_with_masked_values() {
        let storage = MockStorage::new();
        let pipeline = pipeline(storage.clone(), FakeDatabase::new(), INPUT_CSV);
        let dataset = Dataset::from_csv(INPUT_CSV.as_bytes()).unwrap();

        let masked = pipeline.mask(dataset).await.unwrap();

        assert_eq!(
            masked.value(0, "email").unwrap(),
            &serde_json::Value::String("ab***@example.com".to_string())
        );
        let processed = storage
            .get_file("processed/2024-01-15/phi_data_cleaned.csv")
            .await
            .unwrap();
        let text = String::from_utf8(processed).unwrap();
        assert!(text.contains("ab***@example.com"));
        assert!(!text.contains("123-45-6789"));
    }

    #[tokio::test]
    async fn load_creates_table_and_batch_inserts_with_load_date() {
        let db = FakeDatabase::new();
        let pipeline = pipeline(MockStorage::new(), db.clone(), INPUT_CSV);
        let dataset = Dataset::from_csv(INPUT_CSV.as_bytes()).unwrap();

        let loaded = pipeline.load(&dataset).await.unwrap();
        assert_eq!(loaded, 2);

        let state = db.state.lock().await;
        assert!(state.statements[0]
            .0
            .starts_with("CREATE TABLE IF NOT EXISTS phi_data"));
        assert_eq!(state.inserts.len(), 1);

        let (table, columns, rows) = &state.inserts[0];
        assert_eq!(table, "phi_data");
        assert_eq!(columns.last().unwrap(), "load_date");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].last().unwrap(), &Some("2024-01-15".to_string()));
    }

    #[tokio::test]
    async fn load_skips_insert_for_empty_dataset() {
        let db = FakeDatabase::new();
        let pipeline = pipeline(MockStorage::new(), db.clone(), INPUT_CSV);
        let dataset = Dataset::from_csv(b"patient_id,encounter_date\n").unwrap();

        let loaded = pipeline.load(&dataset).await.unwrap();
        assert_eq!(loaded, 0);
        assert!(db.state.lock().await.inserts.is_empty());
    }

    #[tokio::test]
    async fn quality_check_fails_on_null_identity() {
        let pipeline = pipeline(MockStorage::new(), FakeDatabase::new(), INPUT_CSV);
        let csv = "patient_id,encounter_date\n,2024-01-15\np-2,2024-01-15\n";
        let dataset = Dataset::from_csv(csv.as_bytes()).unwrap();

        let err = pipeline.quality_check(&dataset).await.unwrap_err();
        assert!(err.to_string().contains("1 records with null values"));
    }

    #[tokio::test]
    async fn audit_writes_exactly_one_row() {
        let db = FakeDatabase::new();
        let pipeline = pipeline(MockStorage::new(), db.clone(), INPUT_CSV);
        let record = AuditRecord::success(
            "manual__2024-01-15",
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            2,
        );

        pipeline.audit(&record).await.unwrap();

        let state = db.state.lock().await;
        let inserts: Vec<_> = state
            .statements
            .iter()
            .filter(|(sql, _)| sql.starts_with("INSERT INTO etl_audit_log"))
            .collect();
        assert_eq!(inserts.len(), 1);
        let params = &inserts[0].1;
        assert_eq!(params[0], Some("manual__2024-01-15".to_string()));
        assert_eq!(params[2], Some("success".to_string()));
        assert_eq!(params[5], None);
    }
}
