use async_trait::async_trait;
use aws_sdk_glue::types::{Column, SerDeInfo, StorageDescriptor, TableInput};
use aws_sdk_glue::Client as GlueClient;

use crate::domain::model::CatalogTableSpec;
use crate::domain::ports::Catalog;
use crate::utils::error::{EtlError, Result};

const INPUT_FORMAT: &str = "org.apache.hadoop.mapred.TextInputFormat";
const OUTPUT_FORMAT: &str = "org.apache.hadoop.hive.ql.io.HiveIgnoreKeyTextOutputFormat";
const SERDE_LIBRARY: &str = "org.apache.hadoop.hive.serde2.lazy.LazySimpleSerDe";

/// Glue Data Catalog adapter. Create-or-update is implemented as create
/// first, falling back to update when the table already exists.
#[derive(Debug, Clone)]
pub struct GlueCatalog {
    client: GlueClient,
}

impl GlueCatalog {
    pub fn new(client: GlueClient) -> Self {
        Self { client }
    }

    fn table_input(spec: &CatalogTableSpec) -> Result<TableInput> {
        let columns = spec
            .columns
            .iter()
            .map(|c| {
                Column::builder()
                    .name(&c.name)
                    .r#type(&c.data_type)
                    .build()
                    .map_err(|e| catalog_err("invalid catalog column", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let serde_info = SerDeInfo::builder()
            .serialization_library(SERDE_LIBRARY)
            .parameters("field.delim", spec.field_delimiter.clone())
            .build();

        let descriptor = StorageDescriptor::builder()
            .set_columns(Some(columns))
            .location(&spec.location)
            .input_format(INPUT_FORMAT)
            .output_format(OUTPUT_FORMAT)
            .serde_info(serde_info)
            .build();

        TableInput::builder()
            .name(&spec.name)
            .description(&spec.description)
            .table_type("EXTERNAL_TABLE")
            .parameters("EXTERNAL", "TRUE")
            .parameters("classification", spec.classification.clone())
            .storage_descriptor(descriptor)
            .build()
            .map_err(|e| catalog_err("invalid catalog table input", e))
    }
}

fn catalog_err(context: &str, e: impl std::fmt::Display) -> EtlError {
    EtlError::Catalog {
        message: format!("{}: {}", context, e),
    }
}

#[async_trait]
impl Catalog for GlueCatalog {
    async fn create_or_update(&self, database: &str, spec: &CatalogTableSpec) -> Result<()> {
        let input = Self::table_input(spec)?;

        let created = self
            .client
            .create_table()
            .database_name(database)
            .table_input(input.clone())
            .send()
            .await;

        match created {
            Ok(_) => {
                tracing::info!(database, table = %spec.name, "catalog table created");
                Ok(())
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_already_exists_exception() {
                    self.client
                        .update_table()
                        .database_name(database)
                        .table_input(input)
                        .send()
                        .await
                        .map_err(|e| catalog_err("failed to update catalog table", e))?;
                    tracing::info!(database, table = %spec.name, "catalog table updated");
                    Ok(())
                } else {
                    Err(catalog_err("failed to create catalog table", service_err))
                }
            }
        }
    }
}
