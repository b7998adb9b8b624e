//! Fixed-size pool of render worker slots.
//!
//! A slot is a scheduling token, not a health guarantee: it bounds how many
//! renders run at once and carries an identity for logging, nothing more.
//! Waiters queue on a semaphore, which tokio serves in FIFO order, so
//! sustained load cannot starve an early arrival.

use crate::{Error, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// One of the N fixed worker identities owned by the pool.
#[derive(Debug)]
pub struct WorkerSlot {
    id: usize,
}

impl WorkerSlot {
    pub fn id(&self) -> usize {
        self.id
    }
}

/// Guard over an acquired slot; returns it to the pool on drop.
///
/// Dropping the guard is the only release path, so a slot goes back to the
/// pool no matter how the render ended (success, error, panic unwind).
#[derive(Debug)]
pub struct PooledWorker {
    slot: Option<WorkerSlot>,
    roster: Arc<Mutex<Vec<WorkerSlot>>>,
    _permit: OwnedSemaphorePermit,
}

impl PooledWorker {
    pub fn id(&self) -> usize {
        // Slot is only taken out in drop
        self.slot.as_ref().map(|s| s.id).unwrap_or(usize::MAX)
    }
}

impl Drop for PooledWorker {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            if let Ok(mut roster) = self.roster.lock() {
                roster.push(slot);
            }
        }
        // The semaphore permit is released when _permit drops, after the
        // slot is back on the roster.
    }
}

/// Bounds concurrent rendering work to a fixed number of worker slots.
///
/// All slots are created up front and the pool never resizes. `acquire`
/// suspends the caller until a slot is idle; no polling is involved.
#[derive(Clone)]
pub struct WorkerPool {
    roster: Arc<Mutex<Vec<WorkerSlot>>>,
    semaphore: Arc<Semaphore>,
    size: usize,
    acquire_timeout: Option<Duration>,
}

impl WorkerPool {
    /// Create a pool with `size` slots and an optional bound on how long
    /// `acquire` may wait before reporting exhaustion.
    pub fn new(size: usize, acquire_timeout: Option<Duration>) -> Self {
        let roster = (0..size).map(|id| WorkerSlot { id }).collect();
        Self {
            roster: Arc::new(Mutex::new(roster)),
            semaphore: Arc::new(Semaphore::new(size)),
            size,
            acquire_timeout,
        }
    }

    /// Number of slots the pool was built with.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots currently idle. Snapshot only, for diagnostics.
    pub fn idle(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Acquire a slot, waiting (FIFO) until one is idle.
    ///
    /// With an acquire timeout configured, waiting longer than the bound
    /// yields `Error::PoolExhausted` instead.
    pub async fn acquire(&self) -> Result<PooledWorker> {
        let acquire = self.semaphore.clone().acquire_owned();
        let permit = match self.acquire_timeout {
            Some(bound) => tokio::time::timeout(bound, acquire)
                .await
                .map_err(|_| Error::PoolExhausted(bound.as_millis() as u64))?,
            None => acquire.await,
        }
        .map_err(|_| Error::Other("worker pool is closed".to_string()))?;

        let slot = {
            let mut roster = self
                .roster
                .lock()
                .map_err(|_| Error::Other("worker roster poisoned".to_string()))?;
            roster
                .pop()
                .ok_or_else(|| Error::Other("worker roster empty despite permit".to_string()))?
        };

        Ok(PooledWorker {
            slot: Some(slot),
            roster: self.roster.clone(),
            _permit: permit,
        })
    }
}
