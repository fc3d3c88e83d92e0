//! Structured events emitted by the executor on every item state transition.
//!
//! Consumers attach a channel to build progress displays or audit trails.
//! Events are the executor's voice; what a worker logs is its own business.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::model::{ItemId, ItemState};

/// A state transition of one work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic within one executor invocation. Consumers can detect gaps.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub item: ItemId,
    pub from: ItemState,
    pub to: ItemState,
}

/// Shared emitter handed to every execution context of one invocation.
#[derive(Clone)]
pub(crate) struct EventEmitter {
    sender: Option<UnboundedSender<Event>>,
    seq: Arc<AtomicU64>,
}

impl EventEmitter {
    pub(crate) fn new(sender: Option<UnboundedSender<Event>>) -> Self {
        Self {
            sender,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit a transition. A dropped receiver is ignored.
    pub(crate) fn transition(&self, item: &ItemId, from: ItemState, to: ItemState) {
        debug_assert!(
            from.can_transition_to(to),
            "illegal item transition {from} -> {to}"
        );

        let Some(ref sender) = self.sender else {
            return;
        };

        let event = Event {
            seq: self.seq.fetch_add(1, Ordering::Relaxed) + 1,
            timestamp: Utc::now(),
            item: item.clone(),
            from,
            to,
        };
        let _ = sender.send(event);
    }
}
