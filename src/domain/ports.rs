use crate::domain::model::{AuditRecord, CatalogTableSpec, Dataset, ObjectInfo};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Blob storage boundary. Implementations bind a bucket or base path at
/// construction time so pipeline code only deals in keys.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;

    /// Bounded read of at most `limit` bytes from the start of the object.
    fn read_prefix(
        &self,
        path: &str,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;

    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn head_file(&self, path: &str)
        -> impl std::future::Future<Output = Result<ObjectInfo>> + Send;
}

/// Upstream data source for the extract stage (HTTP endpoint, remote file
/// transfer, ...). Fetch fails loudly; there is no fallback data.
#[async_trait]
pub trait Source: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>>;
}

/// Relational database boundary. Tables are created if absent with
/// text-typed columns; there is no migration or versioning layer.
#[async_trait]
pub trait Database: Send + Sync {
    async fn execute(&self, sql: &str, params: &[Option<String>]) -> Result<()>;

    /// First column of the first row, as an integer. The only first-row
    /// queries in this pipeline are COUNT(*) reads.
    async fn query_scalar(&self, sql: &str) -> Result<Option<i64>>;

    /// One atomic multi-row insert. Row-by-row insertion is deliberately not
    /// part of this port.
    async fn batch_insert(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Option<String>>],
    ) -> Result<()>;
}

/// Metadata catalog boundary: create-or-update passthrough, no DDL logic.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn create_or_update(&self, database: &str, spec: &CatalogTableSpec) -> Result<()>;
}

/// The six pipeline stages. The sequencer runs them strictly in order and
/// stops at the first failure; audit alone runs unconditionally.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Dataset>;
    async fn validate(&self, dataset: &Dataset) -> Result<()>;
    async fn mask(&self, dataset: Dataset) -> Result<Dataset>;
    async fn load(&self, dataset: &Dataset) -> Result<usize>;
    async fn quality_check(&self, dataset: &Dataset) -> Result<()>;
    async fn audit(&self, record: &AuditRecord) -> Result<()>;
}
