use std::env;

/// Environment-driven configuration for the catalog metadata function. The
/// bucket is not configured here; it comes from each event record.
#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub glue_database_name: String,
    pub glue_table_prefix: String,
    pub kms_key_arn: Option<String>,
    pub s3_region: String,
}

impl LambdaConfig {
    pub fn from_env() -> Self {
        Self {
            glue_database_name: env::var("GLUE_DATABASE_NAME")
                .unwrap_or_else(|_| "phi_catalog".to_string()),
            glue_table_prefix: env::var("GLUE_TABLE_NAME")
                .unwrap_or_else(|_| "processed_data".to_string()),
            kms_key_arn: env::var("KMS_KEY_ARN").ok(),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        }
    }
}
