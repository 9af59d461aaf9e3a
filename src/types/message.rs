//! Message and transition types for the flow graph.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::intent::IntentId;

/// Unique identifier for a message in the flow graph.
///
/// Implements `Ord` so ordered collections iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Create a new MessageId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Outgoing transition from a message.
///
/// A transition carries an intent when the user must express that intent to
/// move along it. Absent, `null`, `""` and `{"value": ""}` all decode to no
/// intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextMessage {
    /// Target message.
    pub message_id: MessageId,
    /// Intent required to take this transition.
    #[serde(default, deserialize_with = "deserialize_intent_ref")]
    pub intent: Option<IntentId>,
}

impl NextMessage {
    /// Transition with no intent.
    pub fn plain(message_id: impl Into<MessageId>) -> Self {
        Self {
            message_id: message_id.into(),
            intent: None,
        }
    }

    /// Transition guarded by an intent.
    pub fn with_intent(message_id: impl Into<MessageId>, intent: impl Into<IntentId>) -> Self {
        Self {
            message_id: message_id.into(),
            intent: Some(intent.into()),
        }
    }

    /// The intent on this transition, if it is non-empty.
    pub fn intent_id(&self) -> Option<&IntentId> {
        self.intent.as_ref().filter(|id| !id.as_str().is_empty())
    }

    /// Whether this transition is labeled with an intent.
    pub fn has_intent(&self) -> bool {
        self.intent_id().is_some()
    }
}

/// Incoming transition into a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousMessage {
    /// Source message.
    pub message_id: MessageId,
}

impl PreviousMessage {
    /// Create a new incoming transition.
    pub fn new(message_id: impl Into<MessageId>) -> Self {
        Self {
            message_id: message_id.into(),
        }
    }
}

/// One node of the flow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub message_id: MessageId,
    /// Payload kind (text, image, card, ...).
    #[serde(default = "default_message_type")]
    pub message_type: String,
    /// Type-specific content.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Outgoing transitions in edge order.
    #[serde(default, rename = "next_message_ids")]
    pub next: Vec<NextMessage>,
    /// Incoming transitions.
    #[serde(default, rename = "previous_message_ids")]
    pub previous: Vec<PreviousMessage>,
}

impl Message {
    /// Create a text message with no transitions.
    pub fn text(id: impl Into<MessageId>, text: &str) -> Self {
        Self {
            message_id: id.into(),
            message_type: default_message_type(),
            payload: serde_json::json!({ "text": text }),
            next: Vec::new(),
            previous: Vec::new(),
        }
    }

    /// Identifier of this message.
    pub fn id(&self) -> &MessageId {
        &self.message_id
    }

    /// Human-readable node name used for file naming, if the payload has one.
    pub fn node_name(&self) -> Option<&str> {
        self.payload
            .get("nodeName")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Intent-labeled outgoing transitions, in edge order.
    pub fn intent_edges(&self) -> impl Iterator<Item = &IntentId> {
        self.next.iter().filter_map(NextMessage::intent_id)
    }
}

fn default_message_type() -> String {
    "text".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntentRef {
    Plain(String),
    Wrapped { value: Option<String> },
}

fn deserialize_intent_ref<'de, D>(deserializer: D) -> Result<Option<IntentId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IntentRef> = Option::deserialize(deserializer)?;
    let value = match raw {
        Some(IntentRef::Plain(s)) => Some(s),
        Some(IntentRef::Wrapped { value }) => value,
        None => None,
    };
    Ok(value.filter(|s| !s.is_empty()).map(IntentId::new))
}
