use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::domain::model::ObjectInfo;
use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// Filesystem-backed storage for local runs and tests. Keys are paths
/// relative to the base directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

fn content_type_for(path: &str) -> Option<String> {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("csv") => Some("text/csv".to_string()),
        Some("json") => Some("application/json".to_string()),
        _ => None,
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.full_path(path))?;
        Ok(data)
    }

    async fn read_prefix(&self, path: &str, limit: usize) -> Result<Vec<u8>> {
        let file = fs::File::open(self.full_path(path))?;
        let mut buffer = Vec::with_capacity(limit);
        file.take(limit as u64).read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn head_file(&self, path: &str) -> Result<ObjectInfo> {
        let metadata = fs::metadata(self.full_path(path))?;
        let last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        Ok(ObjectInfo {
            size: metadata.len(),
            content_type: content_type_for(path),
            last_modified,
        })
    }
}
