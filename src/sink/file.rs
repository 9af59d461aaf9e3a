//! Filesystem sink.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::types::ExportRecord;
use super::{Sink, SinkError};

/// Writes records as pretty-printed JSON below a root directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    /// Create a sink rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn target(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn write(&self, record: &ExportRecord) -> Result<u64, SinkError> {
        let io_error = |source| SinkError::Io {
            path: record.path.clone(),
            source,
        };

        let bytes = record.to_json_pretty().map_err(|source| SinkError::Serialize {
            path: record.path.clone(),
            source,
        })?;

        let target = self.target(&record.path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&target, &bytes).await.map_err(io_error)?;

        Ok(bytes.len() as u64)
    }
}
