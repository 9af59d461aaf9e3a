//! Flow snapshot sources.

pub mod memory;

#[cfg(feature = "runtime")]
pub mod file;

use async_trait::async_trait;
use crate::types::{Entity, FlowGraph, Intent};

/// Trait for flow snapshot sources.
///
/// Each method returns a fully materialized snapshot; there is no paging or
/// streaming contract. Ordering of intents and entities is preserved.
#[async_trait]
pub trait FlowSource: Send + Sync {
    /// Error type for source operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the flow graph.
    async fn graph(&self) -> Result<FlowGraph, Self::Error>;

    /// Fetch the project's intents.
    async fn intents(&self) -> Result<Vec<Intent>, Self::Error>;

    /// Fetch the project's entities.
    async fn entities(&self) -> Result<Vec<Entity>, Self::Error>;
}

/// Error type for snapshot sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The snapshot could not be read.
    #[error("Failed to read snapshot {path}: {source}")]
    Io {
        /// Snapshot path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot is not valid JSON or has the wrong shape.
    #[error("Invalid snapshot {path}: {source}")]
    Parse {
        /// Snapshot path.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

pub use memory::{InMemoryFlowSource, ProjectSnapshot};

#[cfg(feature = "runtime")]
pub use file::JsonFileSource;
