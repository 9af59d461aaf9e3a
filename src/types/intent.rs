//! Intent, utterance and variable-occurrence types.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an intent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(String);

impl IntentId {
    /// Create a new IntentId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id with no backing intent.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IntentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for IntentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A located mention of an entity inside an utterance.
///
/// `name` is the literal matched text including any markers (`%city%`,
/// `<city>`), and `start_index` is its offset into the utterance text in
/// chars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableOccurrence {
    /// Variable identifier.
    #[serde(default)]
    pub id: String,
    /// Matched substring, markers included.
    pub name: String,
    /// Name of the entity this variable refers to.
    #[serde(alias = "entity")]
    pub entity_name: String,
    /// Offset of `name` in the utterance text, in chars.
    pub start_index: usize,
}

impl VariableOccurrence {
    /// Create a new occurrence.
    pub fn new(name: impl Into<String>, entity_name: impl Into<String>, start_index: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            entity_name: entity_name.into(),
            start_index,
        }
    }

    /// Length of the matched text in chars.
    pub fn len(&self) -> usize {
        self.name.chars().count()
    }

    /// Whether the matched text is empty.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Exclusive end offset in chars, saturating at `usize::MAX`.
    pub fn end_index(&self) -> usize {
        self.start_index.saturating_add(self.len())
    }
}

/// Example phrase a user might say to express an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    /// Full utterance text.
    pub text: String,
    /// Variable occurrences located in `text`.
    #[serde(default)]
    pub variables: Vec<VariableOccurrence>,
}

impl Utterance {
    /// Utterance with no variables.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            variables: Vec::new(),
        }
    }
}

/// A named trigger with its training phrases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    /// Unique intent identifier.
    pub id: IntentId,
    /// Display name.
    pub name: String,
    /// Last modification time.
    #[serde(default = "Utc::now", deserialize_with = "deserialize_timestamp")]
    pub updated_at: DateTime<Utc>,
    /// Training phrases in source order.
    #[serde(default)]
    pub utterances: Vec<Utterance>,
}

impl Intent {
    /// Create an intent with no utterances.
    pub fn new(id: impl Into<IntentId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            updated_at: Utc::now(),
            utterances: Vec::new(),
        }
    }

    /// Attach utterances.
    pub fn with_utterances(mut self, utterances: Vec<Utterance>) -> Self {
        self.utterances = utterances;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Plain(String),
    Wrapped { date: String },
}

/// Accept RFC 3339 strings or `{"date": "YYYY-MM-DD HH:MM:SS[.f]"}`.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Plain(s) => s,
        RawTimestamp::Wrapped { date } => date,
    };
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
