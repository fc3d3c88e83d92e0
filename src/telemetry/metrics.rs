//! Metric instrument factories for fanout.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"fanout"` meter; with no
//! provider installed they are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for fanout instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("fanout")
}

/// Counter: work items dispatched.
pub fn items_dispatched() -> Counter<u64> {
    meter()
        .u64_counter("fanout.items.dispatched")
        .with_description("Number of work items dispatched")
        .build()
}

/// Counter: work items that completed.
/// Labels: `result` ("ok" | "error" | "panic").
pub fn items_completed() -> Counter<u64> {
    meter()
        .u64_counter("fanout.items.completed")
        .with_description("Number of work items that reached a terminal state")
        .build()
}

/// Histogram: time an item spent running its worker, in milliseconds.
pub fn item_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("fanout.item.duration_ms")
        .with_description("Work item run duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Histogram: time an item waited on the concurrency gate, in milliseconds.
pub fn permit_wait_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("fanout.permit.wait_ms")
        .with_description("Time spent waiting for a concurrency permit")
        .with_unit("ms")
        .build()
}
