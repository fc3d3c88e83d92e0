//! Concurrency gate: a counting semaphore scoped to one executor invocation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

/// Reject a parallelism bound the gate cannot honor.
pub fn check_capacity(capacity: usize) -> Result<usize> {
    if capacity == 0 {
        return Err(Error::Config(
            "max parallel must be at least 1, got 0".to_string(),
        ));
    }
    if capacity > Semaphore::MAX_PERMITS {
        return Err(Error::Config(format!(
            "max parallel {capacity} exceeds the limit of {}",
            Semaphore::MAX_PERMITS
        )));
    }
    Ok(capacity)
}

/// Holds the remaining permit count for one invocation.
///
/// Cloning shares the same permits. Besides gating, it tracks how many
/// permits are held right now and the most ever held at once.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    held: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = check_capacity(capacity)?;
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            held: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Most permits held simultaneously since creation.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Wait for a permit. The permit returns to the gate when dropped.
    pub async fn acquire(&self) -> Result<Permit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| Error::Other(format!("concurrency gate closed: {e}")))?;

        let now = self.held.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);

        Ok(Permit {
            _permit: permit,
            held: Arc::clone(&self.held),
        })
    }
}

/// One unit of allowed concurrency.
///
/// Released on drop, which also covers unwinding out of a panicking worker.
#[derive(Debug)]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
    held: Arc<AtomicUsize>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        // Runs before the semaphore permit field is dropped, so `held`
        // never reads above capacity.
        self.held.fetch_sub(1, Ordering::AcqRel);
    }
}
