pub mod catalog;
pub mod etl;
pub mod masking;
pub mod pipeline;
pub mod quality;
pub mod schema;

pub use crate::domain::model::{
    AuditRecord, CatalogTableSpec, Dataset, FileMetadata, FileShape, ObjectInfo, Record,
    RunStatus, ValidationError,
};
pub use crate::domain::ports::{Catalog, Database, Pipeline, Source, Storage};
pub use crate::utils::error::Result;
