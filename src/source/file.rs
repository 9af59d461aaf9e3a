//! JSON snapshot file source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::types::{Entity, FlowGraph, Intent};
use super::{FlowSource, ProjectSnapshot, SourceError};

/// Flow source backed by a JSON snapshot file.
///
/// The file is read and parsed once by [`JsonFileSource::open`]; the trait
/// methods serve clones of the parsed snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    snapshot: ProjectSnapshot,
}

impl JsonFileSource {
    /// Read and parse the snapshot at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let shown = path.display().to_string();

        let bytes = tokio::fs::read(&path).await.map_err(|source| SourceError::Io {
            path: shown.clone(),
            source,
        })?;
        let snapshot: ProjectSnapshot =
            serde_json::from_slice(&bytes).map_err(|source| SourceError::Parse {
                path: shown.clone(),
                source,
            })?;

        tracing::info!(
            path = %shown,
            bytes = bytes.len(),
            messages = snapshot.graph.messages.len(),
            intents = snapshot.intents.len(),
            entities = snapshot.entities.len(),
            "Loaded flow snapshot"
        );

        Ok(Self { path, snapshot })
    }

    /// Path the snapshot was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the source, returning the parsed snapshot.
    pub fn into_snapshot(self) -> ProjectSnapshot {
        self.snapshot
    }
}

#[async_trait]
impl FlowSource for JsonFileSource {
    type Error = SourceError;

    async fn graph(&self) -> Result<FlowGraph, Self::Error> {
        Ok(self.snapshot.graph.clone())
    }

    async fn intents(&self) -> Result<Vec<Intent>, Self::Error> {
        Ok(self.snapshot.intents.clone())
    }

    async fn entities(&self) -> Result<Vec<Entity>, Self::Error> {
        Ok(self.snapshot.entities.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("flow-source-{}-{}", uuid::Uuid::new_v4(), name))
    }

    #[tokio::test]
    async fn test_open_reads_snapshot() {
        let path = temp_path("ok.json");
        let json = r#"{
            "board": {
                "root_messages": ["a"],
                "messages": [
                    {"message_id": "a", "payload": {"text": "hi"}, "next_message_ids": [], "previous_message_ids": []}
                ]
            },
            "entities": [{"name": "color", "data": [{"value": "red", "synonyms": ["red"]}]}]
        }"#;
        tokio::fs::write(&path, json).await.unwrap();

        let source = JsonFileSource::open(&path).await.unwrap();
        let graph = source.graph().await.unwrap();
        assert_eq!(graph.messages[0].message_type, "text");
        assert!(source.intents().await.unwrap().is_empty());
        assert_eq!(source.entities().await.unwrap()[0].data.len(), 1);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = JsonFileSource::open(temp_path("missing.json")).await.unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let path = temp_path("bad.json");
        tokio::fs::write(&path, b"{\"board\": 3}").await.unwrap();

        let err = JsonFileSource::open(&path).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
