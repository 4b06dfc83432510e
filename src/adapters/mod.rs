//! Concrete implementations of the domain ports. CLI runs use the local
//! filesystem, HTTP source, and PostgreSQL adapters; the lambda build adds
//! S3 and Glue.

pub mod http;
pub mod postgres;
pub mod storage;

#[cfg(feature = "lambda")]
pub mod glue;
#[cfg(feature = "lambda")]
pub mod s3;

pub use http::HttpSource;
pub use postgres::PostgresDatabase;
pub use storage::LocalStorage;

#[cfg(feature = "lambda")]
pub use glue::GlueCatalog;
#[cfg(feature = "lambda")]
pub use s3::S3Storage;
