//! Conversational context resolution.
//!
//! Derives, from graph adjacency alone:
//!
//! - the output contexts an intent activates (names of the intents reachable
//!   from its segment and its home message)
//! - which message is the welcome/entry case
//! - whether the flow lacks an entry intent, and the synthesized entry that
//!   stands in for it

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::index::{GraphIndex, IntentMap, SynthesizedWelcome};
use crate::types::{Intent, IntentId, Message, MessageId, OutputContext, Utterance};

/// Number of turns an output context stays active.
pub const DEFAULT_CONTEXT_LIFESPAN: u32 = 1;

/// Intents of a project, looked up by id.
#[derive(Debug, Clone, Default)]
pub struct IntentRegistry<'a> {
    by_id: BTreeMap<&'a IntentId, &'a Intent>,
}

impl<'a> IntentRegistry<'a> {
    /// Index intents by id. The first intent wins on duplicate ids.
    pub fn new(intents: &'a [Intent]) -> Self {
        let mut by_id = BTreeMap::new();
        for intent in intents {
            by_id.entry(&intent.id).or_insert(intent);
        }
        Self { by_id }
    }

    /// Look up an intent.
    pub fn get(&self, id: &IntentId) -> Option<&'a Intent> {
        self.by_id.get(id).copied()
    }

    /// Resolve an id to its intent, or to a placeholder when none exists.
    pub fn resolve(&self, id: &IntentId) -> ResolvedIntent<'a> {
        match self.get(id) {
            Some(intent) => ResolvedIntent::Declared(intent),
            None => ResolvedIntent::Placeholder(PlaceholderIntent {
                id: id.clone(),
                updated_at: Utc::now(),
            }),
        }
    }

    /// Number of intents.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Stand-in for an intent id with no backing intent.
///
/// Nameless, without utterances, stamped with the time of resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderIntent {
    /// The unresolved id.
    pub id: IntentId,
    /// Resolution time.
    pub updated_at: DateTime<Utc>,
}

/// An intent id resolved once against the registry.
#[derive(Debug, Clone)]
pub enum ResolvedIntent<'a> {
    /// A project intent.
    Declared(&'a Intent),
    /// No intent exists for the id.
    Placeholder(PlaceholderIntent),
}

impl<'a> ResolvedIntent<'a> {
    /// Intent id.
    pub fn id(&self) -> &IntentId {
        match self {
            Self::Declared(intent) => &intent.id,
            Self::Placeholder(p) => &p.id,
        }
    }

    /// Intent name; empty for placeholders.
    pub fn name(&self) -> &str {
        match self {
            Self::Declared(intent) => &intent.name,
            Self::Placeholder(_) => "",
        }
    }

    /// Training phrases; empty for placeholders.
    pub fn utterances(&self) -> &[Utterance] {
        match self {
            Self::Declared(intent) => &intent.utterances,
            Self::Placeholder(_) => &[],
        }
    }

    /// Last update time.
    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Self::Declared(intent) => intent.updated_at,
            Self::Placeholder(p) => p.updated_at,
        }
    }

    /// The backing intent, if any.
    pub fn intent(&self) -> Option<&'a Intent> {
        match self {
            Self::Declared(intent) => Some(intent),
            Self::Placeholder(_) => None,
        }
    }

    /// Whether this is a placeholder.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

/// Whether no root message has an intent-labeled outgoing edge.
pub fn is_missing_welcome_intent(index: &GraphIndex) -> bool {
    index
        .root_ids()
        .iter()
        .filter_map(|id| index.message(id))
        .all(|root| root.intent_edges().next().is_none())
}

/// Inject a welcome entry when the flow has no entry intent.
///
/// Applies when `intent_map` is empty or no root has an intent-labeled
/// edge; the entry is keyed by the first outgoing neighbor of the first root.
/// Returns the synthesized entry, or `None` when nothing applies or no
/// root edge exists. Calling this again returns the existing entry.
pub fn synthesize_welcome<'m>(index: &GraphIndex, intent_map: &'m mut IntentMap) -> Option<&'m SynthesizedWelcome> {
    if intent_map.synthesized().is_some() {
        return intent_map.synthesized();
    }
    if !intent_map.is_empty() && !is_missing_welcome_intent(index) {
        return None;
    }

    let key = index
        .root_ids()
        .first()
        .and_then(|root| index.message(root))
        .and_then(|root| root.next.first())
        .map(|edge| edge.message_id.clone());

    match key {
        Some(message_id) => {
            let welcome = intent_map.insert_synthesized(message_id);
            tracing::info!(
                message_id = %welcome.message_id,
                intent_id = %welcome.intent_id,
                "Synthesized welcome intent"
            );
            Some(welcome)
        }
        None => {
            tracing::warn!("Flow has no entry intent and no root transition to attach one to");
            None
        }
    }
}

/// Resolves contexts for intent records.
#[derive(Debug, Clone)]
pub struct ContextResolver<'a> {
    registry: &'a IntentRegistry<'a>,
    welcome: Option<MessageId>,
    lifespan: u32,
}

impl<'a> ContextResolver<'a> {
    /// Create a resolver over the final (post-synthesis) intent map.
    pub fn new(index: &GraphIndex, intent_map: &IntentMap, registry: &'a IntentRegistry<'a>) -> Self {
        Self {
            registry,
            welcome: find_welcome_message(index, intent_map),
            lifespan: DEFAULT_CONTEXT_LIFESPAN,
        }
    }

    /// Override the lifespan of output contexts.
    pub fn with_lifespan(mut self, lifespan: u32) -> Self {
        self.lifespan = lifespan;
        self
    }

    /// The message that qualifies as the welcome case, if any.
    pub fn welcome_message(&self) -> Option<&MessageId> {
        self.welcome.as_ref()
    }

    /// Whether `message_id` is the welcome case.
    pub fn is_welcome_case(&self, message_id: &MessageId) -> bool {
        self.welcome.as_ref() == Some(message_id)
    }

    /// Contexts activated by an intent whose home message is `home`.
    ///
    /// Names of intents on labeled edges leaving the segment messages, then
    /// leaving `home`, deduplicated in first-seen order. Unknown intent ids
    /// are dropped.
    pub fn output_contexts(&self, segment: &[&Message], home: &Message) -> Vec<OutputContext> {
        let mut names: Vec<&str> = Vec::new();
        for message in segment.iter().copied().chain(std::iter::once(home)) {
            for intent_id in message.intent_edges() {
                let Some(intent) = self.registry.get(intent_id) else {
                    continue;
                };
                let name = intent.name.as_str();
                if !name.is_empty() && !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        names
            .into_iter()
            .map(|name| OutputContext {
                name: name.to_string(),
                parameters: BTreeMap::new(),
                lifespan: self.lifespan,
            })
            .collect()
    }
}

/// Find the welcome message.
///
/// Among intent-map keys (all messages when the map is empty), the message
/// with the greatest number of incoming edges from root messages. Ties go to
/// the first candidate in enumeration order.
pub fn find_welcome_message(index: &GraphIndex, intent_map: &IntentMap) -> Option<MessageId> {
    let candidates: Vec<&Message> = if intent_map.is_empty() {
        index.messages().iter().collect()
    } else {
        intent_map.keys().filter_map(|id| index.message(id)).collect()
    };

    let mut best: Option<(&MessageId, usize)> = None;
    for message in candidates {
        let count = message
            .previous
            .iter()
            .filter(|p| index.is_root(&p.message_id))
            .count();
        if best.map_or(true, |(_, max)| count > max) {
            best = Some((&message.message_id, count));
        }
    }
    best.map(|(id, _)| id.clone())
}
