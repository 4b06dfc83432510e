#[cfg(feature = "lambda")]
use aws_config::BehaviorVersion;
#[cfg(feature = "lambda")]
use aws_sdk_glue::Client as GlueClient;
#[cfg(feature = "lambda")]
use aws_sdk_s3::config::Region;
#[cfg(feature = "lambda")]
use aws_sdk_s3::Client as S3Client;
#[cfg(feature = "lambda")]
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
#[cfg(feature = "lambda")]
use phi_etl::domain::model::FileMetadata;
#[cfg(feature = "lambda")]
use phi_etl::utils::logger;
#[cfg(feature = "lambda")]
use phi_etl::{CatalogUpdater, GlueCatalog, LambdaConfig, S3Storage};
#[cfg(feature = "lambda")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "lambda")]
#[derive(Debug, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records")]
    pub records: Vec<S3EventRecord>,
}

#[cfg(feature = "lambda")]
#[derive(Debug, Deserialize)]
pub struct S3EventRecord {
    pub s3: S3Entity,
}

#[cfg(feature = "lambda")]
#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[cfg(feature = "lambda")]
#[derive(Debug, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[cfg(feature = "lambda")]
#[derive(Debug, Deserialize)]
pub struct S3Object {
    pub key: String,
}

#[cfg(feature = "lambda")]
#[derive(Debug, Serialize)]
pub struct ProcessedObject {
    pub bucket: String,
    pub key: String,
    pub metadata: FileMetadata,
}

#[cfg(feature = "lambda")]
#[derive(Debug, Serialize)]
pub struct Response {
    pub message: String,
    pub processed: Vec<ProcessedObject>,
}

#[cfg(feature = "lambda")]
async fn function_handler(event: LambdaEvent<S3Event>) -> Result<Response, Error> {
    tracing::info!(
        records = event.payload.records.len(),
        "received object notification"
    );

    let lambda_config = LambdaConfig::from_env();

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let region = Region::new(lambda_config.s3_region.clone());
    let s3_config = aws_sdk_s3::config::Builder::from(&config)
        .region(region)
        .build();
    let s3_client = S3Client::from_conf(s3_config);
    let catalog = GlueCatalog::new(GlueClient::new(&config));

    // Storage binds to the bucket each record was delivered from, so one
    // function serves any number of buckets.
    let mut processed = Vec::with_capacity(event.payload.records.len());
    for record in &event.payload.records {
        let bucket = &record.s3.bucket.name;
        let key = &record.s3.object.key;

        let storage = S3Storage::new(
            s3_client.clone(),
            bucket.clone(),
            lambda_config.kms_key_arn.clone(),
        );
        let updater = CatalogUpdater::new(
            storage,
            catalog.clone(),
            lambda_config.glue_database_name.clone(),
            lambda_config.glue_table_prefix.clone(),
            format!("s3://{}", bucket),
        );

        let metadata = updater
            .process_object(key)
            .await
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

        processed.push(ProcessedObject {
            bucket: bucket.clone(),
            key: key.clone(),
            metadata,
        });
    }

    tracing::info!(processed = processed.len(), "catalog update complete");
    Ok(Response {
        message: "Metadata extraction completed successfully".to_string(),
        processed,
    })
}

#[cfg(feature = "lambda")]
#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();
    run(service_fn(function_handler)).await
}
