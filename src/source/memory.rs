//! In-memory flow source for testing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{Entity, FlowGraph, Intent};
use super::FlowSource;

/// A complete project snapshot: graph, intents and entities.
///
/// This is also the on-disk layout read by the JSON file source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Flow graph.
    #[serde(alias = "board")]
    pub graph: FlowGraph,
    /// Intents in source order.
    #[serde(default)]
    pub intents: Vec<Intent>,
    /// Entities in source order.
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// In-memory flow source.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFlowSource {
    snapshot: ProjectSnapshot,
}

impl InMemoryFlowSource {
    /// Create a source serving `snapshot`.
    pub fn new(snapshot: ProjectSnapshot) -> Self {
        Self { snapshot }
    }

    /// Create a source from its parts.
    pub fn from_parts(graph: FlowGraph, intents: Vec<Intent>, entities: Vec<Entity>) -> Self {
        Self::new(ProjectSnapshot {
            graph,
            intents,
            entities,
        })
    }

    /// Get the snapshot.
    pub fn snapshot(&self) -> &ProjectSnapshot {
        &self.snapshot
    }
}

#[async_trait]
impl FlowSource for InMemoryFlowSource {
    type Error = std::convert::Infallible;

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
