//! Execution span helpers.
//!
//! One span per executor invocation, one child span per work item.

use tracing::Span;
use uuid::Uuid;

use crate::model::{ItemId, ItemState};

/// Start the span wrapping one executor invocation.
///
/// `fanout.items` is declared empty and filled once dispatch finishes.
pub fn start_execution_span(execution_id: &Uuid, max_parallel: usize) -> Span {
    tracing::info_span!(
        "fanout.execute",
        "execution.id" = %execution_id,
        "fanout.max_parallel" = max_parallel,
        "fanout.items" = tracing::field::Empty,
    )
}

/// Start the span for a single work item.
pub fn start_item_span(item: &ItemId) -> Span {
    tracing::debug_span!("fanout.item", "item.id" = %item)
}

/// Record an item state transition on the given span.
pub fn record_state_transition(span: &Span, from: ItemState, to: ItemState) {
    span.in_scope(|| {
        tracing::debug!(from = %from, to = %to, "state_transition");
    });
}
