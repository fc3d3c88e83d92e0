//! Failure aggregation and the per-invocation execution report.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{self, Result};
use crate::model::ItemId;

/// One work item's failure reason, tagged with the item that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item: ItemId,
    pub reason: String,
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.item, self.reason)
    }
}

/// Collects failures from concurrently running items.
///
/// Every append goes through one mutex. The lock is held only for the push,
/// never across an await point.
#[derive(Debug, Clone, Default)]
pub struct FailureSink {
    failures: Arc<Mutex<Vec<ItemFailure>>>,
}

impl FailureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, item: ItemId, reason: impl Into<String>) {
        let failure = ItemFailure {
            item,
            reason: reason.into(),
        };
        // Poisoning must not drop recorded failures.
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    pub fn len(&self) -> usize {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every recorded failure, in the order they were recorded.
    pub fn into_failures(self) -> Vec<ItemFailure> {
        match Arc::try_unwrap(self.failures) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => {
                std::mem::take(&mut *shared.lock().unwrap_or_else(PoisonError::into_inner))
            }
        }
    }
}

/// Counters describing one executor invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Items handed to the executor (each dispatched exactly once).
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Most items observed running at the same time.
    pub peak_running: usize,
    /// Permits still held after the barrier. Always zero unless the gate is broken.
    pub leaked_permits: usize,
    pub elapsed: Duration,
}

/// Aggregate outcome of one executor invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    /// Failures in completion order. Not deterministic across runs.
    pub failures: Vec<ItemFailure>,
    pub stats: ExecutionStats,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Collapse into success, or one error listing every failure.
    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        Err(error::Error::Aggregated(AggregatedError {
            failures: self.failures,
            total: self.stats.dispatched,
        }))
    }
}

/// Every failure from one invocation, returned as a single error.
#[derive(Debug, Clone, Error)]
#[error("{} of {} work items failed: [{}]", .failures.len(), .total, join(.failures))]
pub struct AggregatedError {
    pub failures: Vec<ItemFailure>,
    /// Number of items the invocation dispatched.
    pub total: usize,
}

impl AggregatedError {
    /// Ids of the failed items, for selective retry.
    pub fn failed_items(&self) -> impl Iterator<Item = &ItemId> {
        self.failures.iter().map(|f| &f.item)
    }
}

fn join(failures: &[ItemFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
