use aws_sdk_s3::types::ServerSideEncryption;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};

use crate::domain::model::ObjectInfo;
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};

/// S3-backed storage. Writes are SSE-KMS encrypted when a key ARN is
/// configured.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    kms_key_arn: Option<String>,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String, kms_key_arn: Option<String>) -> Self {
        Self {
            client,
            bucket,
            kms_key_arn,
        }
    }
}

fn storage_err(context: &str, e: impl std::fmt::Display) -> EtlError {
    EtlError::Storage {
        message: format!("{}: {}", context, e),
    }
}

impl Storage for S3Storage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| storage_err("failed to read object", e))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| storage_err("failed to collect object body", e))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn read_prefix(&self, path: &str, limit: usize) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .range(format!("bytes=0-{}", limit.saturating_sub(1)))
            .send()
            .await
            .map_err(|e| storage_err("failed to read object range", e))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| storage_err("failed to collect object body", e))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(data.to_vec().into());

        if let Some(key_arn) = &self.kms_key_arn {
            request = request
                .server_side_encryption(ServerSideEncryption::AwsKms)
                .ssekms_key_id(key_arn);
        }

        request
            .send()
            .await
            .map_err(|e| storage_err("failed to write object", e))?;

        tracing::debug!(bucket = %self.bucket, key = path, "object written");
        Ok(())
    }

    async fn head_file(&self, path: &str) -> Result<ObjectInfo> {
        let response = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| storage_err("failed to head object", e))?;

        let last_modified = response
            .last_modified()
            .and_then(|d| DateTime::<Utc>::from_timestamp(d.secs(), d.subsec_nanos()));

        Ok(ObjectInfo {
            size: response.content_length().unwrap_or(0).max(0) as u64,
            content_type: response.content_type().map(|s| s.to_string()),
            last_modified,
        })
    }
}
