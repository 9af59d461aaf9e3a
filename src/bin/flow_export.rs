//! Flow Export Binary
//!
//! Converts a flow snapshot into a Dialogflow agent directory.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `FLOW_SNAPSHOT`: snapshot file (or pass it as the first argument)
//! - `OUTPUT_DIR`: output root (default: ./output)
//! - `EXPORT_PLATFORM`: target platform (default: generic)
//! - `EXPORT_LANGUAGE`: language code (default: en)
//! - `EXPORT_MAX_CONCURRENCY`: write slots (default: available parallelism)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! Exits non-zero when any intent or file could not be exported.
//!
//! ## Usage
//!
//! ```bash
//! OUTPUT_DIR=./agent cargo run --bin flow_export --features cli -- flow.json
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use flow_intent_export::{
    write_all, Converter, DialogflowRenderer, ExportConfig, FileSink, FlowSource, GraphIndex,
    JsonFileSource, LogFormat, Sink, WritePool,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing(log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "flow_export=info,flow_intent_export=info".into());

    match log_format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .flatten_event(true),
                )
                .init();
        }
    }
}

async fn run(config: ExportConfig) -> Result<bool, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let source = JsonFileSource::open(&config.snapshot).await?;
    let graph = source.graph().await?;
    let intents = source.intents().await?;
    let entities = source.entities().await?;

    let index = GraphIndex::build(graph)?;
    info!(
        messages = index.num_messages(),
        roots = index.root_ids().len(),
        graph_fingerprint = %index.fingerprint(),
        "Flow graph indexed"
    );

    let renderer = DialogflowRenderer::new(config.platform, config.language.clone());
    let conversion = Converter::new(renderer, config.convert_options()).convert(&index, &intents, &entities);

    let pool = match config.max_concurrency {
        Some(slots) => WritePool::new(slots),
        None => WritePool::for_entries(conversion.num_entries),
    };
    let sink: Arc<dyn Sink> = Arc::new(FileSink::new(&config.output_dir));
    let report = write_all(sink, &pool, &conversion).await?;

    info!(
        output_dir = %config.output_dir.display(),
        intents = conversion.units.len(),
        files = report.files_written,
        bytes = report.bytes_written,
        unit_failures = conversion.failures.len(),
        file_failures = report.failures.len(),
        slots = pool.slots(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Export complete"
    );

    Ok(conversion.is_complete() && report.is_complete())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ExportConfig::from_env(std::env::args().nth(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("flow_export: {e}");
            return ExitCode::from(2);
        }
    };
    init_tracing(config.log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        snapshot = %config.snapshot.display(),
        platform = %config.platform,
        language = %config.language,
        "Starting flow export"
    );

    match run(config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            error!("Export finished with failures");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "Export aborted");
            ExitCode::FAILURE
        }
    }
}
