//! Core types for the flow exporter.

pub mod message;
pub mod intent;
pub mod entity;
pub mod record;

pub use message::{Message, MessageId, NextMessage, PreviousMessage};
pub use intent::{Intent, IntentId, Utterance, VariableOccurrence};
pub use entity::Entity;
pub use record::{
    Chunk, OutputContext, IntentEvent, IntentParameter, IntentResponse, IntentRecord,
    UtteranceRecord, EntityRecord, AgentRecord, PackageRecord,
    RecordBody, RecordKind, ExportRecord, WELCOME_EVENT,
};

use serde::{Deserialize, Serialize};

/// Materialized snapshot of a flow graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowGraph {
    /// Entry-point messages, in source order.
    #[serde(default)]
    pub root_messages: Vec<MessageId>,
    /// All messages, in enumeration order.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl FlowGraph {
    /// Create a graph from roots and messages.
    pub fn new(root_messages: Vec<MessageId>, messages: Vec<Message>) -> Self {
        Self {
            root_messages,
            messages,
        }
    }
}

/// Incremental builder for flow graphs.
///
/// Keeps `next` and `previous` lists consistent: every edge added is recorded
/// on both endpoints. Messages are enumerated in first-mention order.
#[derive(Debug, Default)]
pub struct FlowGraphBuilder {
    roots: Vec<MessageId>,
    messages: Vec<Message>,
}

impl FlowGraphBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text message (no-op if it already exists).
    pub fn message(mut self, id: &str) -> Self {
        self.ensure(id);
        self
    }

    /// Add or replace a message with an explicit type and payload.
    pub fn message_with(mut self, id: &str, message_type: &str, payload: serde_json::Value) -> Self {
        let idx = self.ensure(id);
        self.messages[idx].message_type = message_type.to_string();
        self.messages[idx].payload = payload;
        self
    }

    /// Mark a message as a root.
    pub fn root(mut self, id: &str) -> Self {
        self.ensure(id);
        self.roots.push(MessageId::from(id));
        self
    }

    /// Add a transition with no intent.
    pub fn edge(self, from: &str, to: &str) -> Self {
        self.link(from, to, None)
    }

    /// Add a transition guarded by an intent.
    pub fn intent_edge(self, from: &str, to: &str, intent: &str) -> Self {
        self.link(from, to, Some(intent))
    }

    /// Finish the graph.
    pub fn build(self) -> FlowGraph {
        FlowGraph::new(self.roots, self.messages)
    }

    fn link(mut self, from: &str, to: &str, intent: Option<&str>) -> Self {
        let from_idx = self.ensure(from);
        let to_idx = self.ensure(to);
        let edge = match intent {
            Some(intent) => NextMessage::with_intent(to, intent),
            None => NextMessage::plain(to),
        };
        self.messages[from_idx].next.push(edge);
        self.messages[to_idx].previous.push(PreviousMessage::new(from));
        self
    }

    fn ensure(&mut self, id: &str) -> usize {
        match self.messages.iter().position(|m| m.message_id.as_str() == id) {
            Some(idx) => idx,
            None => {
                self.messages.push(Message::text(id, id));
                self.messages.len() - 1
            }
        }
    }
}

impl FlowGraph {
    /// Start building a graph.
    pub fn builder() -> FlowGraphBuilder {
        FlowGraphBuilder::new()
    }
}
