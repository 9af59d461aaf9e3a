//! Bounded write pool.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::SinkError;

/// Fixed number of write slots shared by the tasks of one export.
///
/// Each export unit holds one slot while it writes. After an abort the pool
/// is drained so that no slot is still held when the error reaches the caller.
#[derive(Debug, Clone)]
pub struct WritePool {
    semaphore: Arc<Semaphore>,
    slots: usize,
}

impl WritePool {
    /// Create a pool with `slots` slots (at least one).
    pub fn new(slots: usize) -> Self {
        let slots = slots.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(slots)),
            slots,
        }
    }

    /// Pool for a conversion with `entries` intent-map entries:
    /// `min(available_parallelism, entries)` slots.
    pub fn for_entries(entries: usize) -> Self {
        let cpus = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::new(cpus.min(entries))
    }

    /// Total number of slots.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.slots - self.semaphore.available_permits()
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, SinkError> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| SinkError::PoolClosed)
    }

    /// Wait until every slot has been released.
    pub async fn drain(&self) -> Result<(), SinkError> {
        let slots = u32::try_from(self.slots).unwrap_or(u32::MAX);
        let all = self
            .semaphore
            .acquire_many(slots)
            .await
            .map_err(|_| SinkError::PoolClosed)?;
        drop(all);
        tracing::debug!(slots = self.slots, "Write pool drained");
        Ok(())
    }
}
