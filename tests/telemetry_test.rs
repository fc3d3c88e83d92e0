//! Integration tests for telemetry initialization and span helpers.

use fanout::model::{ItemId, ItemState};
use uuid::Uuid;

#[test]
fn telemetry_initializes_without_endpoint() {
    // A global subscriber can only be set once per process; a second
    // init returning Err is acceptable.
    let config = fanout::telemetry::TelemetryConfig {
        endpoint: None,
        log_level: "debug".to_string(),
        service_name: "fanout-test".to_string(),
    };
    if let Ok(guard) = fanout::telemetry::init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn execution_and_item_spans_record_transitions() {
    let span = fanout::telemetry::work::start_execution_span(&Uuid::new_v4(), 4);
    let _enter = span.enter();

    let item = fanout::telemetry::work::start_item_span(&ItemId::Index(0));
    fanout::telemetry::work::record_state_transition(
        &item,
        ItemState::Pending,
        ItemState::WaitingForPermit,
    );
}

#[test]
fn metric_instruments_are_noops_without_a_provider() {
    fanout::telemetry::metrics::items_dispatched().add(1, &[]);
    fanout::telemetry::metrics::item_duration_ms().record(1.5, &[]);
}
