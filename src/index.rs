//! Lookup structures over a flow graph.
//!
//! The index is built once per run from a materialized [`FlowGraph`] and is
//! read-only afterwards. Message lookups go through a `BTreeMap` so that any
//! iteration over ids is deterministic; enumeration order of messages is kept
//! separately because it drives intent-map order.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::canonical::fingerprint_hex;
use crate::types::{FlowGraph, IntentId, Message, MessageId};

/// Error type for index construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Two messages share an id.
    #[error("Duplicate message id: {0}")]
    DuplicateMessage(MessageId),
    /// An edge points at a message that is not in the graph.
    #[error("Edge {from} -> {to} references an unknown message")]
    DanglingEdge {
        /// Source of the edge.
        from: MessageId,
        /// Target of the edge.
        to: MessageId,
    },
    /// A root id does not name a message in the graph.
    #[error("Root message not found: {0}")]
    UnknownRoot(MessageId),
}

/// One intent-map entry: a message and the intents leaving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentMapEntry {
    /// Message the intent transitions originate at.
    pub message_id: MessageId,
    /// Distinct intent ids in edge order.
    pub intent_ids: Vec<IntentId>,
}

/// Welcome entry injected when the flow has no entry intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedWelcome {
    /// Message the entry is keyed by.
    pub message_id: MessageId,
    /// Freshly generated id with no backing intent.
    pub intent_id: IntentId,
}

/// Ordered mapping from message id to the intents leaving that message.
///
/// Stored as an ordered list of pairs: insertion order determines the order in
/// which intent records are generated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentMap {
    entries: Vec<IntentMapEntry>,
    synthesized: Option<SynthesizedWelcome>,
}

impl IntentMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, or extend the existing one for `message_id`.
    ///
    /// Intent ids already present for the message are skipped.
    pub fn insert(&mut self, message_id: MessageId, intent_ids: impl IntoIterator<Item = IntentId>) {
        let idx = match self.position(&message_id) {
            Some(idx) => idx,
            None => {
                self.entries.push(IntentMapEntry {
                    message_id,
                    intent_ids: Vec::new(),
                });
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[idx];
        for id in intent_ids {
            if !entry.intent_ids.contains(&id) {
                entry.intent_ids.push(id);
            }
        }
    }

    /// Record a synthesized welcome entry.
    ///
    /// The id is prepended when the message already has an entry, otherwise a
    /// new entry is appended. A map holding a synthesized entry ignores
    /// further calls.
    pub fn insert_synthesized(&mut self, message_id: MessageId) -> &SynthesizedWelcome {
        let entries = &mut self.entries;
        self.synthesized.get_or_insert_with(|| {
            let intent_id = IntentId::generate();
            match entries.iter_mut().find(|e| e.message_id == message_id) {
                Some(entry) => entry.intent_ids.insert(0, intent_id.clone()),
                None => entries.push(IntentMapEntry {
                    message_id: message_id.clone(),
                    intent_ids: vec![intent_id.clone()],
                }),
            }
            SynthesizedWelcome {
                message_id,
                intent_id,
            }
        })
    }

    /// The synthesized welcome entry, if any.
    pub fn synthesized(&self) -> Option<&SynthesizedWelcome> {
        self.synthesized.as_ref()
    }

    /// Intents leaving `message_id`.
    pub fn get(&self, message_id: &MessageId) -> Option<&[IntentId]> {
        self.position(message_id).map(|idx| self.entries[idx].intent_ids.as_slice())
    }

    /// Whether the map has an entry for `message_id`.
    pub fn contains_key(&self, message_id: &MessageId) -> bool {
        self.position(message_id).is_some()
    }

    /// Message ids in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &MessageId> {
        self.entries.iter().map(|e| &e.message_id)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &IntentMapEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of (message, intent) pairs.
    pub fn pair_count(&self) -> usize {
        self.entries.iter().map(|e| e.intent_ids.len()).sum()
    }

    fn position(&self, message_id: &MessageId) -> Option<usize> {
        self.entries.iter().position(|e| &e.message_id == message_id)
    }
}

/// Read-only index over a flow graph.
#[derive(Debug, Clone)]
pub struct GraphIndex {
    /// Messages in enumeration order.
    messages: Vec<Message>,
    /// Message id -> position in `messages`.
    by_id: BTreeMap<MessageId, usize>,
    /// Root ids in source order.
    root_ids: Vec<MessageId>,
    /// Intents leaving each message.
    intent_map: IntentMap,
}

impl GraphIndex {
    /// Build an index, rejecting duplicate ids and dangling references.
    pub fn build(graph: FlowGraph) -> Result<Self, GraphError> {
        let FlowGraph {
            root_messages,
            messages,
        } = graph;

        let mut by_id = BTreeMap::new();
        for (idx, message) in messages.iter().enumerate() {
            if by_id.insert(message.message_id.clone(), idx).is_some() {
                return Err(GraphError::DuplicateMessage(message.message_id.clone()));
            }
        }

        for message in &messages {
            for next in &message.next {
                if !by_id.contains_key(&next.message_id) {
                    return Err(GraphError::DanglingEdge {
                        from: message.message_id.clone(),
                        to: next.message_id.clone(),
                    });
                }
            }
            for previous in &message.previous {
                if !by_id.contains_key(&previous.message_id) {
                    return Err(GraphError::DanglingEdge {
                        from: previous.message_id.clone(),
                        to: message.message_id.clone(),
                    });
                }
            }
        }

        let mut root_ids: Vec<MessageId> = Vec::with_capacity(root_messages.len());
        for root in root_messages {
            if !by_id.contains_key(&root) {
                return Err(GraphError::UnknownRoot(root));
            }
            if !root_ids.contains(&root) {
                root_ids.push(root);
            }
        }

        let mut intent_map = IntentMap::new();
        for message in &messages {
            let intents: Vec<IntentId> = message.intent_edges().cloned().collect();
            if !intents.is_empty() {
                intent_map.insert(message.message_id.clone(), intents);
            }
        }

        tracing::debug!(
            messages = messages.len(),
            roots = root_ids.len(),
            intent_entries = intent_map.len(),
            "Graph index built"
        );

        Ok(Self {
            messages,
            by_id,
            root_ids,
            intent_map,
        })
    }

    /// Fetch a message by id.
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.by_id.get(id).map(|&idx| &self.messages[idx])
    }

    /// Whether the graph contains `id`.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.by_id.contains_key(id)
    }

    /// All messages in enumeration order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Root ids in source order.
    pub fn root_ids(&self) -> &[MessageId] {
        &self.root_ids
    }

    /// Whether `id` is a root message.
    pub fn is_root(&self, id: &MessageId) -> bool {
        self.root_ids.contains(id)
    }

    /// Intents leaving each message.
    pub fn intent_map(&self) -> &IntentMap {
        &self.intent_map
    }

    /// Number of messages.
    pub fn num_messages(&self) -> usize {
        self.messages.len()
    }

    /// Deterministic fingerprint of the graph structure.
    ///
    /// Independent of message enumeration order: ids, roots and edge triples
    /// are sorted before hashing.
    pub fn fingerprint(&self) -> String {
        #[derive(Serialize)]
        struct GraphShape<'a> {
            messages: Vec<&'a str>,
            roots: BTreeSet<&'a str>,
            edges: BTreeSet<(&'a str, &'a str, &'a str)>,
        }

        let shape = GraphShape {
            messages: self.by_id.keys().map(MessageId::as_str).collect(),
            roots: self.root_ids.iter().map(MessageId::as_str).collect(),
            edges: self
                .messages
                .iter()
                .flat_map(|m| {
                    m.next.iter().map(move |n| {
                        (
                            m.message_id.as_str(),
                            n.message_id.as_str(),
                            n.intent_id().map(IntentId::as_str).unwrap_or(""),
                        )
                    })
                })
                .collect(),
        };
        fingerprint_hex(&shape)
    }
}
