//! Export record shapes.
//!
//! Records mirror the JSON layout of a Dialogflow agent archive. Every record
//! is write-once: the converter builds it, the sink serializes it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event name attached to the entry intent of a flow.
pub const WELCOME_EVENT: &str = "WELCOME";

/// One span of an annotated utterance.
///
/// Plain spans carry only `text`; annotated spans also carry the stripped
/// variable name as `alias` and the entity reference as `meta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Span text.
    pub text: String,
    /// Parameter alias for annotated spans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Entity reference (`@entity`) for annotated spans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
    /// Whether the span was annotated by a user.
    pub user_defined: bool,
}

impl Chunk {
    /// Unannotated span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alias: None,
            meta: None,
            user_defined: false,
        }
    }

    /// Span annotated with an entity.
    pub fn annotated(text: impl Into<String>, entity_name: &str) -> Self {
        let text = text.into();
        Self {
            alias: Some(text.clone()),
            text,
            meta: Some(format!("@{entity_name}")),
            user_defined: true,
        }
    }

    /// The entity annotation (`@entity`), if any.
    pub fn annotation(&self) -> Option<&str> {
        self.meta.as_deref()
    }

    /// Whether this span is annotated.
    pub fn is_annotated(&self) -> bool {
        self.meta.is_some()
    }
}

/// Context set when an intent matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputContext {
    /// Context name (the name of a reachable intent).
    pub name: String,
    /// Context parameters; always empty on export.
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Number of turns the context stays active.
    pub lifespan: u32,
}

/// Event that triggers an intent without user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentEvent {
    /// Event name.
    pub name: String,
}

/// Parameter extracted from an intent's annotated utterances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentParameter {
    /// Parameter id.
    pub id: String,
    /// Parameter name (the entity name).
    pub name: String,
    /// Whether slot filling requires it.
    pub required: bool,
    /// Entity reference (`@entity`).
    pub data_type: String,
    /// Value expression (`$name`).
    pub value: String,
    /// Whether the parameter collects a list.
    pub is_list: bool,
}

/// The response block of an intent record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    /// Whether matching clears active contexts.
    pub reset_contexts: bool,
    /// Contexts activated on match.
    pub affected_contexts: Vec<OutputContext>,
    /// Parameters extracted from utterances.
    pub parameters: Vec<IntentParameter>,
    /// Rendered response messages, home message first.
    pub messages: Vec<serde_json::Value>,
    /// Platforms whose responses are used by default.
    pub default_response_platforms: BTreeMap<String, bool>,
    /// Legacy speech field; always empty.
    pub speech: Vec<String>,
}

/// Intent definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRecord {
    /// Fresh record id.
    pub id: String,
    /// Record name, which is also the file stem.
    pub name: String,
    /// Whether machine learning is enabled.
    pub auto: bool,
    /// Required input contexts.
    pub contexts: Vec<String>,
    /// Response block.
    pub responses: Vec<IntentResponse>,
    /// Matching priority.
    pub priority: u32,
    /// Whether fulfillment is called.
    pub webhook_used: bool,
    /// Whether this is a fallback intent.
    pub fallback_intent: bool,
    /// Trigger events.
    pub events: Vec<IntentEvent>,
    /// Unix seconds of the last source update.
    pub last_update: i64,
}

/// One annotated training phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtteranceRecord {
    /// Fresh record id.
    pub id: String,
    /// Annotated spans.
    pub data: Vec<Chunk>,
    /// Whether the phrase is a template.
    pub is_template: bool,
    /// Usage count.
    pub count: u32,
    /// Unix seconds of the owning intent's last update.
    pub updated: i64,
}

/// Entity definition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    /// Fresh record id.
    pub id: String,
    /// Entity name.
    pub name: String,
    /// Whether the entity can be overridden.
    pub is_overridable: bool,
    /// Whether values map to themselves.
    pub is_enum: bool,
    /// Whether values are regular expressions.
    pub is_regexp: bool,
    /// Whether the agent may learn new values.
    pub automated_expansion: bool,
    /// Whether fuzzy matching is allowed.
    pub allow_fuzzy_extraction: bool,
}

/// Agent settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    /// Agent description.
    pub description: String,
    /// Default language.
    pub language: String,
    /// Extra languages.
    pub supported_languages: Vec<String>,
    /// Whether the agent is private.
    pub is_private: bool,
    /// Platform targeted by the export, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// Archive version file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Archive format version.
    pub version: String,
}

impl Default for PackageRecord {
    fn default() -> Self {
        Self {
            version: crate::EXPORT_SCHEMA_VERSION.to_string(),
        }
    }
}

/// Body of an export record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordBody {
    /// Intent definition.
    Intent(IntentRecord),
    /// Training phrases of one intent.
    Utterances(Vec<UtteranceRecord>),
    /// Entity definition.
    Entity(EntityRecord),
    /// Entity data rows.
    EntityEntries(Vec<serde_json::Value>),
    /// Agent settings.
    Agent(AgentRecord),
    /// Archive version.
    Package(PackageRecord),
}

/// Record kind, for logging and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Intent definition.
    Intent,
    /// Training phrases.
    Utterances,
    /// Entity definition.
    Entity,
    /// Entity data rows.
    EntityEntries,
    /// Agent settings.
    Agent,
    /// Archive version.
    Package,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intent => write!(f, "intent"),
            Self::Utterances => write!(f, "utterances"),
            Self::Entity => write!(f, "entity"),
            Self::EntityEntries => write!(f, "entity_entries"),
            Self::Agent => write!(f, "agent"),
            Self::Package => write!(f, "package"),
        }
    }
}

/// A record and the relative path it is written to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    /// Path relative to the output root, `/`-separated.
    pub path: String,
    /// Record content.
    pub body: RecordBody,
}

impl ExportRecord {
    /// Create a new record.
    pub fn new(path: impl Into<String>, body: RecordBody) -> Self {
        Self {
            path: path.into(),
            body,
        }
    }

    /// Kind of this record.
    pub fn kind(&self) -> RecordKind {
        match &self.body {
            RecordBody::Intent(_) => RecordKind::Intent,
            RecordBody::Utterances(_) => RecordKind::Utterances,
            RecordBody::Entity(_) => RecordKind::Entity,
            RecordBody::EntityEntries(_) => RecordKind::EntityEntries,
            RecordBody::Agent(_) => RecordKind::Agent,
            RecordBody::Package(_) => RecordKind::Package,
        }
    }

    /// The intent record, if this is one.
    pub fn as_intent(&self) -> Option<&IntentRecord> {
        match &self.body {
            RecordBody::Intent(record) => Some(record),
            _ => None,
        }
    }

    /// The utterance records, if this is an utterance file.
    pub fn as_utterances(&self) -> Option<&[UtteranceRecord]> {
        match &self.body {
            RecordBody::Utterances(records) => Some(records),
            _ => None,
        }
    }

    /// Serialize the body to pretty JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.body)
    }
}
