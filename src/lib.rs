pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

#[cfg(feature = "lambda")]
pub use adapters::{GlueCatalog, S3Storage};
#[cfg(feature = "lambda")]
pub use config::LambdaConfig;

pub use adapters::{HttpSource, LocalStorage, PostgresDatabase};
pub use core::catalog::CatalogUpdater;
pub use core::etl::EtlEngine;
pub use core::masking::MaskingRuleSet;
pub use core::pipeline::{PhiPipeline, PipelineSettings};
pub use core::quality::QualityPolicy;
pub use core::schema::Schema;
pub use domain::model::{AuditRecord, Dataset, FileMetadata, RunStatus};
pub use utils::error::{ErrorCategory, EtlError, Result};
