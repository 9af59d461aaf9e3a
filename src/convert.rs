//! Flow-to-intent conversion driver.
//!
//! The driver walks the intent map and, for every (message, intent) pair,
//! produces an [`ExportUnit`]: the intent record followed by its utterance
//! file. Entities and static agent files are produced independently.
//!
//! ## Algorithm
//!
//! 1. Copy the intent map and synthesize a welcome entry if the flow has none
//! 2. Build the intent registry and context resolver over the final map
//! 3. For each entry, in insertion order, and each intent id of the entry:
//!    - resolve the intent (declared or placeholder)
//!    - collect the segment following the home message
//!    - build the intent record (contexts, events, rendered messages)
//!    - annotate every utterance into an utterance record
//! 4. Emit an entity record and an entity-data record per entity
//!
//! A failing unit is recorded in [`Conversion::failures`] and the remaining
//! units are still produced.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotate::{annotate, strip_markers, AnnotateError};
use crate::context::{synthesize_welcome, ContextResolver, IntentRegistry, ResolvedIntent, DEFAULT_CONTEXT_LIFESPAN};
use crate::index::{GraphIndex, SynthesizedWelcome};
use crate::layout;
use crate::render::{PayloadRenderer, RenderError};
use crate::segment::{collect_segment, SegmentError};
use crate::types::{
    AgentRecord, Entity, EntityRecord, ExportRecord, Intent, IntentEvent, IntentId, IntentParameter,
    IntentRecord, IntentResponse, Message, MessageId, PackageRecord, RecordBody, Utterance,
    UtteranceRecord, WELCOME_EVENT,
};

/// Matching priority given to every exported intent.
pub const DEFAULT_INTENT_PRIORITY: u32 = 500_000;

/// Error that aborts a single export unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    /// Segment collection hit an unknown message.
    #[error("Segment collection failed: {0}")]
    Segment(#[from] SegmentError),
    /// A message could not be rendered.
    #[error("Rendering message {message_id} failed: {source}")]
    Render {
        /// Message that failed.
        message_id: MessageId,
        /// Renderer error.
        source: RenderError,
    },
    /// An utterance could not be annotated.
    #[error("Annotating utterance {utterance} failed: {source}")]
    Annotate {
        /// Position of the utterance in the intent.
        utterance: usize,
        /// Annotator error.
        source: AnnotateError,
    },
}

/// A unit that could not be exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionFailure {
    /// Home message of the unit.
    pub message_id: MessageId,
    /// Intent of the unit.
    pub intent_id: IntentId,
    /// What went wrong.
    pub error: UnitError,
}

/// Records of one (message, intent) pair, intent record first.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportUnit {
    /// Home message.
    pub message_id: MessageId,
    /// Intent id (possibly synthesized).
    pub intent_id: IntentId,
    /// Intent record, then its utterance file if the intent has utterances.
    pub records: Vec<ExportRecord>,
}

impl ExportUnit {
    /// The unit's intent record.
    pub fn intent_record(&self) -> Option<&IntentRecord> {
        self.records.iter().find_map(ExportRecord::as_intent)
    }

    /// The unit's utterance records (empty if none).
    pub fn utterance_records(&self) -> &[UtteranceRecord] {
        self.records
            .iter()
            .find_map(ExportRecord::as_utterances)
            .unwrap_or_default()
    }
}

/// Conversion options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Language code of utterances and agent.
    pub language: String,
    /// Lifespan of output contexts.
    pub context_lifespan: u32,
    /// Description written to the agent file.
    pub agent_description: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            language: crate::DEFAULT_LANGUAGE.to_string(),
            context_lifespan: DEFAULT_CONTEXT_LIFESPAN,
            agent_description: String::new(),
        }
    }
}

/// Output of a conversion run.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Fingerprint of the source graph.
    pub graph_fingerprint: String,
    /// Welcome entry synthesized for this run, if any.
    pub synthesized: Option<SynthesizedWelcome>,
    /// Number of intent-map entries after synthesis.
    pub num_entries: usize,
    /// One unit per (message, intent) pair, in intent-map order.
    pub units: Vec<ExportUnit>,
    /// Entity definitions and data rows.
    pub entity_records: Vec<ExportRecord>,
    /// Agent and package files.
    pub static_records: Vec<ExportRecord>,
    /// Units that could not be exported.
    pub failures: Vec<ConversionFailure>,
}

impl Conversion {
    /// Every record: units first, then entities, then static files.
    pub fn records(&self) -> impl Iterator<Item = &ExportRecord> {
        self.units
            .iter()
            .flat_map(|u| u.records.iter())
            .chain(self.entity_records.iter())
            .chain(self.static_records.iter())
    }

    /// Intent records in generation order.
    pub fn intent_records(&self) -> impl Iterator<Item = &IntentRecord> {
        self.units.iter().filter_map(ExportUnit::intent_record)
    }

    /// Number of records.
    pub fn num_records(&self) -> usize {
        self.records().count()
    }

    /// Whether every unit was exported.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Converts a flow graph into export records.
pub struct Converter<R: PayloadRenderer> {
    renderer: R,
    options: ConvertOptions,
}

impl<R: PayloadRenderer> Converter<R> {
    /// Create a converter.
    pub fn new(renderer: R, options: ConvertOptions) -> Self {
        Self { renderer, options }
    }

    /// Get the options.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Get the renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Convert a graph, its intents and its entities.
    pub fn convert(&self, index: &GraphIndex, intents: &[Intent], entities: &[Entity]) -> Conversion {
        let mut intent_map = index.intent_map().clone();
        let synthesized = synthesize_welcome(index, &mut intent_map).cloned();

        let registry = IntentRegistry::new(intents);
        let resolver = ContextResolver::new(index, &intent_map, &registry)
            .with_lifespan(self.options.context_lifespan);

        let mut units = Vec::with_capacity(intent_map.pair_count());
        let mut failures = Vec::new();

        for entry in intent_map.iter() {
            for intent_id in &entry.intent_ids {
                let resolved = registry.resolve(intent_id);
                match self.convert_unit(index, &resolver, &entry.message_id, &resolved) {
                    Ok(unit) => units.push(unit),
                    Err(error) => {
                        tracing::error!(
                            message_id = %entry.message_id,
                            intent_id = %intent_id,
                            error = %error,
                            "Skipping intent"
                        );
                        failures.push(ConversionFailure {
                            message_id: entry.message_id.clone(),
                            intent_id: intent_id.clone(),
                            error,
                        });
                    }
                }
            }
        }

        let entity_records = entities.iter().flat_map(|e| self.entity_records(e)).collect();
        let static_records = self.static_records();

        let conversion = Conversion {
            graph_fingerprint: index.fingerprint(),
            synthesized,
            num_entries: intent_map.len(),
            units,
            entity_records,
            static_records,
            failures,
        };

        tracing::info!(
            graph_fingerprint = %conversion.graph_fingerprint,
            units = conversion.units.len(),
            failures = conversion.failures.len(),
            entities = entities.len(),
            welcome = ?resolver.welcome_message().map(MessageId::as_str),
            "Conversion finished"
        );
        conversion
    }

    fn convert_unit(
        &self,
        index: &GraphIndex,
        resolver: &ContextResolver<'_>,
        message_id: &MessageId,
        intent: &ResolvedIntent<'_>,
    ) -> Result<ExportUnit, UnitError> {
        let home = index
            .message(message_id)
            .ok_or_else(|| SegmentError::MessageNotFound(message_id.clone()))?;
        let segment = collect_segment(index, message_id)?;

        let messages = std::iter::once(home)
            .chain(segment.iter().copied())
            .map(|m| self.render(m))
            .collect::<Result<Vec<_>, _>>()?;

        let welcome = resolver.is_welcome_case(message_id);
        let contexts = if welcome || intent.name().is_empty() {
            Vec::new()
        } else {
            vec![intent.name().to_string()]
        };
        let events = if welcome {
            vec![IntentEvent {
                name: WELCOME_EVENT.to_string(),
            }]
        } else {
            Vec::new()
        };

        let platform = self.renderer.platform();
        let mut default_response_platforms = BTreeMap::new();
        if platform.is_supported() {
            default_response_platforms.insert(platform.to_string(), true);
        }

        let stem = layout::intent_stem(intent.name(), home.node_name().unwrap_or(home.message_id.as_str()));
        let updated_at = intent.updated_at();

        let record = IntentRecord {
            id: Uuid::new_v4().to_string(),
            name: stem.clone(),
            auto: true,
            contexts,
            responses: vec![IntentResponse {
                reset_contexts: false,
                affected_contexts: resolver.output_contexts(&segment, home),
                parameters: intent_parameters(intent.utterances()),
                messages,
                default_response_platforms,
                speech: Vec::new(),
            }],
            priority: DEFAULT_INTENT_PRIORITY,
            webhook_used: false,
            fallback_intent: false,
            events,
            last_update: updated_at.timestamp(),
        };

        let mut records = vec![ExportRecord::new(layout::intent_path(&stem), RecordBody::Intent(record))];

        if !intent.utterances().is_empty() {
            let utterances = intent
                .utterances()
                .iter()
                .enumerate()
                .map(|(i, u)| utterance_record(u, updated_at).map_err(|source| UnitError::Annotate { utterance: i, source }))
                .collect::<Result<Vec<_>, _>>()?;
            records.push(ExportRecord::new(
                layout::utterances_path(&stem, &self.options.language),
                RecordBody::Utterances(utterances),
            ));
        }

        tracing::debug!(
            message_id = %message_id,
            intent_id = %intent.id(),
            segment_len = segment.len(),
            welcome,
            placeholder = intent.is_placeholder(),
            "Built intent unit"
        );

        Ok(ExportUnit {
            message_id: message_id.clone(),
            intent_id: intent.id().clone(),
            records,
        })
    }

    fn render(&self, message: &Message) -> Result<serde_json::Value, UnitError> {
        self.renderer
            .render(&message.message_type, &message.payload)
            .map_err(|source| UnitError::Render {
                message_id: message.message_id.clone(),
                source,
            })
    }

    fn entity_records(&self, entity: &Entity) -> [ExportRecord; 2] {
        let definition = EntityRecord {
            id: Uuid::new_v4().to_string(),
            name: entity.name.clone(),
            is_overridable: true,
            is_enum: false,
            is_regexp: false,
            automated_expansion: false,
            allow_fuzzy_extraction: false,
        };
        [
            ExportRecord::new(layout::entity_path(&entity.name), RecordBody::Entity(definition)),
            ExportRecord::new(
                layout::entity_entries_path(&entity.name, &self.options.language),
                RecordBody::EntityEntries(entity.data.clone()),
            ),
        ]
    }

    fn static_records(&self) -> Vec<ExportRecord> {
        let platform = self.renderer.platform();
        let agent = AgentRecord {
            description: self.options.agent_description.clone(),
            language: self.options.language.clone(),
            supported_languages: Vec::new(),
            is_private: true,
            platform: platform.is_supported().then(|| platform.to_string()),
        };
        vec![
            ExportRecord::new(layout::AGENT_FILE, RecordBody::Agent(agent)),
            ExportRecord::new(layout::PACKAGE_FILE, RecordBody::Package(PackageRecord::default())),
        ]
    }
}

/// One annotated utterance record.
fn utterance_record(utterance: &Utterance, updated_at: DateTime<Utc>) -> Result<UtteranceRecord, AnnotateError> {
    let mut data = annotate(&utterance.text, &utterance.variables)?;
    if data.len() > 1 {
        data.retain(|chunk| chunk.is_annotated() || !chunk.text.is_empty());
    }
    Ok(UtteranceRecord {
        id: Uuid::new_v4().to_string(),
        data,
        is_template: false,
        count: 0,
        updated: updated_at.timestamp(),
    })
}

/// One parameter per distinct variable alias, in first-seen order.
fn intent_parameters(utterances: &[Utterance]) -> Vec<IntentParameter> {
    let mut parameters: Vec<IntentParameter> = Vec::new();
    for variable in utterances.iter().flat_map(|u| &u.variables) {
        let name = strip_markers(&variable.name);
        if name.is_empty() || parameters.iter().any(|p| p.name == name) {
            continue;
        }
        parameters.push(IntentParameter {
            id: Uuid::new_v4().to_string(),
            data_type: format!("@{}", variable.entity_name),
            value: format!("${name}"),
            name,
            required: false,
            is_list: false,
        });
    }
    parameters
}

/// Convert with the platform of `renderer` and default options.
pub fn convert<R: PayloadRenderer>(
    renderer: R,
    index: &GraphIndex,
    intents: &[Intent],
    entities: &[Entity],
) -> Conversion {
    Converter::new(renderer, ConvertOptions::default()).convert(index, intents, entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DialogflowRenderer, Platform};
    use crate::types::{FlowGraph, VariableOccurrence};
    use serde_json::json;

    fn converter() -> Converter<DialogflowRenderer> {
        Converter::new(DialogflowRenderer::default(), ConvertOptions::default())
    }

    #[test]
    fn test_segment_messages_follow_home() {
        // a -> b --i1--> c -> d
        let graph = FlowGraph::builder()
            .root("a")
            .intent_edge("a", "b", "i0")
            .intent_edge("b", "c", "i1")
            .edge("c", "d")
            .intent_edge("c", "e", "i1")
            .build();
        let index = GraphIndex::build(graph).unwrap();
        let intents = vec![Intent::new("i0", "hello"), Intent::new("i1", "order")];

        let conversion = converter().convert(&index, &intents, &[]);
        assert!(conversion.is_complete());
        assert!(conversion.synthesized.is_none());

        let unit = &conversion.units[1];
        assert_eq!(unit.message_id, MessageId::from("b"));
        let record = unit.intent_record().unwrap();
        assert_eq!(record.responses[0].messages.len(), 1);
        assert_eq!(record.responses[0].messages[0]["speech"], "b");
    }

    #[test]
    fn test_input_context_is_own_name_when_not_welcome() {
        // r -> w (welcome, root-adjacent) --i1--> x --i2--> y
        let graph = FlowGraph::builder()
            .root("r")
            .intent_edge("r", "w", "i0")
            .intent_edge("w", "x", "i1")
            .intent_edge("x", "y", "i2")
            .build();
        let index = GraphIndex::build(graph).unwrap();
        let intents = vec![
            Intent::new("i0", "start"),
            Intent::new("i1", "one"),
            Intent::new("i2", "two"),
        ];

        let conversion = converter().convert(&index, &intents, &[]);
        let records: Vec<&IntentRecord> = conversion.intent_records().collect();
        assert_eq!(records.len(), 3);

        // w is the only key with a root parent.
        assert!(records[1].contexts.is_empty());
        assert_eq!(records[1].events[0].name, WELCOME_EVENT);

        assert_eq!(records[2].contexts, vec!["two".to_string()]);
        assert!(records[2].events.is_empty());
    }

    #[test]
    fn test_utterances_and_parameters() {
        let graph = FlowGraph::builder().root("a").intent_edge("a", "b", "i1").build();
        let index = GraphIndex::build(graph).unwrap();
        let intents = vec![Intent::new("i1", "book").with_utterances(vec![
            Utterance {
                text: "Book a <flight> to Paris".into(),
                variables: vec![VariableOccurrence::new("<flight>", "travelMode", 7)],
            },
            Utterance::plain("hi"),
        ])];

        let conversion = converter().convert(&index, &intents, &[]);
        let unit = &conversion.units[0];
        assert_eq!(unit.records.len(), 2);
        assert_eq!(unit.records[1].path, "intents/book_a_usersays_en.json");

        let utterances = unit.utterance_records();
        assert_eq!(utterances.len(), 2);
        assert_eq!(utterances[0].data.len(), 3);
        assert_eq!(utterances[1].data.len(), 1);
        assert_eq!(utterances[0].updated, intents[0].updated_at.timestamp());

        let parameters = &unit.intent_record().unwrap().responses[0].parameters;
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].name, "flight");
        assert_eq!(parameters[0].data_type, "@travelMode");
        assert_eq!(parameters[0].value, "$flight");
    }

    #[test]
    fn test_bad_annotation_fails_only_that_unit() {
        let graph = FlowGraph::builder()
            .root("a")
            .intent_edge("a", "b", "i1")
            .intent_edge("a", "c", "i2")
            .build();
        let index = GraphIndex::build(graph).unwrap();
        let intents = vec![
            Intent::new("i1", "broken").with_utterances(vec![Utterance {
                text: "x".into(),
                variables: vec![VariableOccurrence::new("%far%", "e", 10)],
            }]),
            Intent::new("i2", "fine"),
        ];

        let conversion = converter().convert(&index, &intents, &[]);
        assert_eq!(conversion.units.len(), 1);
        assert_eq!(conversion.failures.len(), 1);
        assert_eq!(conversion.failures[0].intent_id, IntentId::from("i1"));
        assert!(matches!(conversion.failures[0].error, UnitError::Annotate { utterance: 0, .. }));
    }

    #[test]
    fn test_huge_occurrence_offset_fails_only_that_unit() {
        let graph = FlowGraph::builder()
            .root("a")
            .intent_edge("a", "b", "i1")
            .intent_edge("a", "c", "i2")
            .build();
        let index = GraphIndex::build(graph).unwrap();
        let broken: Intent = serde_json::from_value(json!({
            "id": "i1",
            "name": "broken",
            "utterances": [{
                "text": "hi",
                "variables": [{"name": "%x%", "entity": "e", "start_index": usize::MAX}]
            }]
        }))
        .unwrap();
        let intents = vec![broken, Intent::new("i2", "fine")];

        let conversion = converter().convert(&index, &intents, &[]);
        assert_eq!(conversion.failures.len(), 1);
        assert_eq!(conversion.failures[0].intent_id, IntentId::from("i1"));
        assert!(matches!(
            conversion.failures[0].error,
            UnitError::Annotate {
                source: AnnotateError::OutOfBounds { .. },
                ..
            }
        ));
        assert_eq!(conversion.units.len(), 1);
        assert_eq!(conversion.units[0].intent_id, IntentId::from("i2"));
    }

    #[test]
    fn test_render_failure_fails_only_that_unit() {
        // a -> b (unrenderable) --i1--> c, a --i2--> d: both units render b.
        let intents = vec![Intent::new("i1", "one"), Intent::new("i2", "two")];
        let graph = FlowGraph::builder()
            .root("a")
            .message_with("b", "text", json!({ "no_text": true }))
            .edge("a", "b")
            .intent_edge("b", "c", "i1")
            .intent_edge("a", "d", "i2")
            .build();
        let index = GraphIndex::build(graph).unwrap();
        let conversion = converter().convert(&index, &intents, &[]);

        assert_eq!(conversion.failures.len(), 2);
        assert!(conversion
            .failures
            .iter()
            .all(|f| matches!(&f.error, UnitError::Render { message_id, .. } if message_id.as_str() == "b")));
    }

    #[test]
    fn test_entities_and_static_records() {
        let graph = FlowGraph::builder().root("a").intent_edge("a", "b", "i1").build();
        let index = GraphIndex::build(graph).unwrap();
        let entities = vec![Entity::new("color", vec![json!({ "value": "red" }), json!({ "value": "blue" })])];

        let conversion = converter().convert(&index, &[], &entities);
        assert_eq!(conversion.entity_records.len(), 2);
        assert_eq!(conversion.entity_records[0].path, "entities/color.json");
        assert_eq!(
            conversion.entity_records[1].body,
            RecordBody::EntityEntries(vec![json!({ "value": "red" }), json!({ "value": "blue" })])
        );

        let paths: Vec<&str> = conversion.static_records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["agent.json", "package.json"]);
    }

    #[test]
    fn test_supported_platform_is_default() {
        let graph = FlowGraph::builder().root("a").intent_edge("a", "b", "i1").build();
        let index = GraphIndex::build(graph).unwrap();
        let intents = vec![Intent::new("i1", "one")];

        let slack = Converter::new(DialogflowRenderer::new(Platform::Slack, "en"), ConvertOptions::default());
        let conversion = slack.convert(&index, &intents, &[]);
        let platforms = &conversion.units[0].intent_record().unwrap().responses[0].default_response_platforms;
        assert_eq!(platforms.get("slack"), Some(&true));

        let conversion = converter().convert(&index, &intents, &[]);
        let platforms = &conversion.units[0].intent_record().unwrap().responses[0].default_response_platforms;
        assert!(platforms.is_empty());
    }
}
