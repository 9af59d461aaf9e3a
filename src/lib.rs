//! # flow-intent-export
//!
//! Deterministic conversion of conversational-flow graphs into intent-centric
//! Dialogflow export records.
//!
//! A flow is a directed graph of bot messages. Edges may carry an intent: the
//! user input that moves the conversation along that edge. The exporter
//! answers one question per `(message, intent)` pair:
//!
//! > Which bot messages does this intent trigger, and which contexts does it
//! > need and produce?
//!
//! ## Architecture
//!
//! ```text
//! FlowSource → GraphIndex → Converter ──────────→ Conversion → write_all → Sink
//!                  ↓            ↓                                  ↓
//!              IntentMap   collect_segment / ContextResolver   WritePool
//!                               ↓
//!                          annotate / PayloadRenderer
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Intent records are generated in intent-map order (message enumeration
//!   order, then edge order)
//! - Segments are collected in preorder over edge order
//! - Same graph → same graph fingerprint
//!
//! Fresh UUIDs and the placeholder timestamp are the only non-deterministic
//! parts of a record.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod annotate;
pub mod index;
pub mod segment;
pub mod context;
pub mod render;
pub mod layout;
pub mod convert;
pub mod canonical;
pub mod config;
pub mod source;

#[cfg(feature = "runtime")]
pub mod sink;

// Re-exports
pub use types::{
    FlowGraph, FlowGraphBuilder, Message, MessageId, NextMessage, PreviousMessage,
    Intent, IntentId, Utterance, VariableOccurrence, Entity,
    Chunk, OutputContext, IntentRecord, UtteranceRecord, EntityRecord,
    RecordBody, RecordKind, ExportRecord, WELCOME_EVENT,
};
pub use annotate::{annotate, strip_markers, AnnotateError};
pub use index::{GraphIndex, GraphError, IntentMap, IntentMapEntry, SynthesizedWelcome};
pub use segment::{collect_segment, SegmentError};
pub use context::{
    ContextResolver, IntentRegistry, ResolvedIntent, PlaceholderIntent,
    synthesize_welcome, find_welcome_message, DEFAULT_CONTEXT_LIFESPAN,
};
pub use render::{PayloadRenderer, DialogflowRenderer, Platform, RenderError};
pub use convert::{
    Converter, ConvertOptions, Conversion, ConversionFailure, ExportUnit, UnitError,
    DEFAULT_INTENT_PRIORITY,
};
pub use config::{ExportConfig, ConfigError, LogFormat};
pub use source::{FlowSource, InMemoryFlowSource, ProjectSnapshot, SourceError};
#[cfg(feature = "runtime")]
pub use source::JsonFileSource;
#[cfg(feature = "runtime")]
pub use sink::{Sink, SinkError, WritePool, FileSink, MemorySink, WriteReport, WriteFailure, write_all};

/// Schema version of the export archive layout.
/// Increment on breaking changes to any record type.
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Default language code of utterances and agent.
pub const DEFAULT_LANGUAGE: &str = "en";
