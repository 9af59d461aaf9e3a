//! Record sinks and the concurrent writer.
//!
//! A [`Sink`] persists one [`ExportRecord`] at a time. [`write_all`] fans the
//! units of a [`Conversion`] out over a [`WritePool`]: each unit holds one
//! slot and writes its intent record before its utterance record. Entity and
//! static records are written outside the pool. Individual write failures are
//! collected in the [`WriteReport`]; only an aborted writer task fails the
//! whole call.

pub mod file;
pub mod memory;
pub mod pool;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::convert::Conversion;
use crate::types::ExportRecord;

pub use file::FileSink;
pub use memory::MemorySink;
pub use pool::WritePool;

/// Error type for sinks.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Filesystem error.
    #[error("I/O error writing {path}: {source}")]
    Io {
        /// Record path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The record could not be serialized.
    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        /// Record path.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The sink refused the record.
    #[error("Sink rejected {0}")]
    Rejected(String),

    /// The write pool was closed.
    #[error("Write pool closed")]
    PoolClosed,

    /// A writer task panicked or was cancelled.
    #[error("Writer task aborted: {0}")]
    Aborted(String),
}

/// Destination for export records.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Persist `record`, returning the number of bytes written.
    async fn write(&self, record: &ExportRecord) -> Result<u64, SinkError>;
}

/// A record that could not be written.
#[derive(Debug)]
pub struct WriteFailure {
    /// Record path.
    pub path: String,
    /// Cause.
    pub error: SinkError,
}

/// Outcome of [`write_all`].
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Number of records written.
    pub files_written: usize,
    /// Total bytes written.
    pub bytes_written: u64,
    /// Records that failed.
    pub failures: Vec<WriteFailure>,
}

impl WriteReport {
    /// Whether every record was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, path: String, result: Result<u64, SinkError>) {
        match result {
            Ok(bytes) => {
                self.files_written += 1;
                self.bytes_written += bytes;
            }
            Err(error) => {
                tracing::error!(path = %path, error = %error, "Failed to write record");
                self.failures.push(WriteFailure { path, error });
            }
        }
    }
}

type WriteResults = Vec<(String, Result<u64, SinkError>)>;

async fn write_sequential(sink: &dyn Sink, records: &[ExportRecord]) -> WriteResults {
    let mut results = Vec::with_capacity(records.len());
    for record in records {
        let result = sink.write(record).await;
        if let Ok(bytes) = &result {
            tracing::debug!(path = %record.path, bytes, "Wrote record");
        }
        results.push((record.path.clone(), result));
    }
    results
}

/// Write every record of `conversion` to `sink`.
///
/// Returns `Err` only when a writer task aborts; in that case the remaining
/// tasks are cancelled and the pool is drained before returning.
pub async fn write_all(
    sink: Arc<dyn Sink>,
    pool: &WritePool,
    conversion: &Conversion,
) -> Result<WriteReport, SinkError> {
    let mut tasks: JoinSet<Result<WriteResults, SinkError>> = JoinSet::new();

    for unit in &conversion.units {
        let sink = Arc::clone(&sink);
        let pool = pool.clone();
        let records = unit.records.clone();
        tasks.spawn(async move {
            let _slot = pool.acquire().await?;
            Ok(write_sequential(sink.as_ref(), &records).await)
        });
    }

    let mut report = WriteReport::default();
    let unpooled: Vec<ExportRecord> = conversion
        .entity_records
        .iter()
        .chain(conversion.static_records.iter())
        .cloned()
        .collect();
    for (path, result) in write_sequential(sink.as_ref(), &unpooled).await {
        report.record(path, result);
    }

    let mut abort: Option<SinkError> = None;
    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() && abort.is_some() => continue,
            Err(err) => Err(SinkError::Aborted(err.to_string())),
        };
        match outcome {
            Ok(results) => {
                for (path, result) in results {
                    report.record(path, result);
                }
            }
            Err(error) => {
                if abort.is_none() {
                    tracing::error!(error = %error, "Aborting export");
                    tasks.abort_all();
                    abort = Some(error);
                }
            }
        }
    }

    if let Some(error) = abort {
        pool.drain().await?;
        return Err(error);
    }

    tracing::info!(
        files = report.files_written,
        bytes = report.bytes_written,
        failures = report.failures.len(),
        "Export written"
    );
    Ok(report)
}
