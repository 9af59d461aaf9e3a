//! Project entities.

use serde::{Deserialize, Serialize};

/// A project entity with its data rows.
///
/// Rows are opaque to the converter and pass through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity name, unique within a project.
    pub name: String,
    /// Data rows in source order.
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

impl Entity {
    /// Create a new entity.
    pub fn new(name: impl Into<String>, data: Vec<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}
