use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;
use tokio::sync::Mutex;

use phi_etl::domain::model::{CatalogTableSpec, FileShape};
use phi_etl::domain::ports::Catalog;
use phi_etl::utils::error::Result;
use phi_etl::{CatalogUpdater, LocalStorage};

#[derive(Clone, Default)]
struct RecordingCatalog {
    registered: Arc<Mutex<Vec<(String, CatalogTableSpec)>>>,
}

#[async_trait]
impl Catalog for RecordingCatalog {
    async fn create_or_update(&self, database: &str, spec: &CatalogTableSpec) -> Result<()> {
        self.registered
            .lock()
            .await
            .push((database.to_string(), spec.clone()));
        Ok(())
    }
}

fn build_updater(base_path: &str) -> (CatalogUpdater<LocalStorage, RecordingCatalog>, RecordingCatalog) {
    let catalog = RecordingCatalog::default();
    let updater = CatalogUpdater::new(
        LocalStorage::new(base_path.to_string()),
        catalog.clone(),
        "phi_catalog".to_string(),
        "processed_data".to_string(),
        "s3://phi-data-bucket".to_string(),
    );
    (updater, catalog)
}

#[tokio::test]
async fn csv_object_registers_string_columns_and_lineage() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().to_str().unwrap();
    std::fs::create_dir_all(dir.path().join("processed/2024-01-15")).unwrap();
    std::fs::write(
        dir.path().join("processed/2024-01-15/phi.csv"),
        "a,b,c\n1,2,3\n4,5,6\n7,8,9\n",
    )
    .unwrap();

    let (updater, catalog) = build_updater(base);
    let metadata = updater
        .process_object("processed/2024-01-15/phi.csv")
        .await
        .unwrap();

    match &metadata.shape {
        FileShape::Csv {
            column_count,
            columns,
            sample_rows,
        } => {
            assert_eq!(*column_count, 3);
            assert_eq!(columns, &["a", "b", "c"]);
            assert_eq!(sample_rows.len(), 2);
        }
        other => panic!("expected CSV shape, got {:?}", other),
    }

    let registered = catalog.registered.lock().await.clone();
    assert_eq!(registered.len(), 1);
    let (database, spec) = &registered[0];
    assert_eq!(database, "phi_catalog");
    assert!(spec.name.starts_with("processed_data_"));
    assert_eq!(spec.classification, "csv");
    assert_eq!(spec.field_delimiter, ",");
    assert_eq!(
        spec.location,
        "s3://phi-data-bucket/processed/2024-01-15/phi.csv"
    );
    let column_names: Vec<&str> = spec.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(column_names, vec!["a", "b", "c"]);
    assert!(spec.columns.iter().all(|c| c.data_type == "string"));

    // Lineage lands under a date-partitioned prefix with the key flattened.
    let lineage_path = dir.path().join(format!(
        "lineage/{}/processed_2024-01-15_phi.csv_lineage.json",
        Utc::now().format("%Y/%m/%d")
    ));
    let lineage: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&lineage_path).unwrap()).unwrap();
    assert_eq!(lineage["source_key"], "processed/2024-01-15/phi.csv");
    assert_eq!(lineage["processing_stage"], "object_created_event");
    assert_eq!(lineage["file_metadata"]["file_size"], metadata.file_size);
}

#[tokio::test]
async fn json_object_registers_a_single_data_column() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().to_str().unwrap();
    std::fs::write(
        dir.path().join("report.json"),
        r#"[{"patient_id": "p-1"}, {"patient_id": "p-2"}]"#,
    )
    .unwrap();

    let (updater, catalog) = build_updater(base);
    let metadata = updater.process_object("report.json").await.unwrap();

    assert!(matches!(metadata.shape, FileShape::JsonArray { .. }));

    let registered = catalog.registered.lock().await.clone();
    let (_, spec) = &registered[0];
    assert_eq!(spec.classification, "json");
    assert_eq!(spec.columns.len(), 1);
    assert_eq!(spec.columns[0].name, "data");
}

#[tokio::test]
async fn missing_object_still_registers_with_degraded_metadata() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().to_str().unwrap();

    let (updater, catalog) = build_updater(base);
    let metadata = updater.process_object("absent/file.csv").await.unwrap();

    assert!(matches!(metadata.shape, FileShape::Error { .. }));
    assert_eq!(metadata.file_size, 0);
    assert_eq!(catalog.registered.lock().await.len(), 1);
}
