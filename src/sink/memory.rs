//! In-memory sink for testing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::ExportRecord;
use super::{Sink, SinkError};

/// Collects records in memory.
///
/// Can be told to reject chosen paths, and tracks the peak number of
/// concurrent writes.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<String, serde_json::Value>>,
    order: Mutex<Vec<String>>,
    failing: BTreeSet<String>,
    delay: Option<Duration>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes to `paths`.
    pub fn failing_on(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.failing.extend(paths);
        self
    }

    /// Hold each write for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get a written record by path.
    pub fn get(&self, path: &str) -> Option<serde_json::Value> {
        self.files.lock().get(path).cloned()
    }

    /// Paths of all written records, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }

    /// Paths in the order they were written.
    pub fn write_order(&self) -> Vec<String> {
        self.order.lock().clone()
    }

    /// Number of records written.
    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }

    /// Highest number of writes observed in progress at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn store(&self, record: &ExportRecord) -> Result<u64, SinkError> {
        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        if self.failing.contains(&record.path) {
            return Err(SinkError::Rejected(record.path.clone()));
        }

        let bytes = record.to_json_pretty().map_err(|source| SinkError::Serialize {
            path: record.path.clone(),
            source,
        })?;
        let value = serde_json::to_value(&record.body).map_err(|source| SinkError::Serialize {
            path: record.path.clone(),
            source,
        })?;

        self.files.lock().insert(record.path.clone(), value);
        self.order.lock().push(record.path.clone());
        Ok(bytes.len() as u64)
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write(&self, record: &ExportRecord) -> Result<u64, SinkError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let result = self.store(record).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PackageRecord, RecordBody};

    fn package(path: &str) -> ExportRecord {
        ExportRecord::new(path, RecordBody::Package(PackageRecord::default()))
    }

    #[tokio::test]
    async fn test_stores_records() {
        let sink = MemorySink::new();
        sink.write(&package("b.json")).await.unwrap();
        sink.write(&package("a.json")).await.unwrap();

        assert_eq!(sink.paths(), vec!["a.json", "b.json"]);
        assert_eq!(sink.write_order(), vec!["b.json", "a.json"]);
        assert_eq!(sink.get("a.json").unwrap()["version"], "1.0.0");
        assert_eq!(sink.peak_concurrency(), 1);
    }

    #[tokio::test]
    async fn test_failing_path() {
        let sink = MemorySink::new().failing_on(["bad.json".to_string()]);

        let err = sink.write(&package("bad.json")).await.unwrap_err();
        assert!(matches!(err, SinkError::Rejected(p) if p == "bad.json"));
        assert!(sink.is_empty());
    }
}
