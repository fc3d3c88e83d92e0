//! Tests for item states and task records.

use fanout::model::{ItemId, ItemState, Task, TaskStatus};
use serde_json::json;

#[test]
fn item_state_transitions_follow_the_lifecycle() {
    use ItemState::*;

    assert!(Pending.can_transition_to(WaitingForPermit));
    assert!(WaitingForPermit.can_transition_to(Running));
    assert!(Running.can_transition_to(Succeeded));
    assert!(Running.can_transition_to(Failed));

    // No skipping the gate, no re-entering Pending, nothing after terminal.
    assert!(!Pending.can_transition_to(Running));
    assert!(!WaitingForPermit.can_transition_to(Pending));
    assert!(!Failed.can_transition_to(Pending));
    assert!(!Succeeded.can_transition_to(Running));

    assert!(Succeeded.is_terminal());
    assert!(Failed.is_terminal());
    assert!(!Running.is_terminal());
}

#[test]
fn item_id_display() {
    assert_eq!(ItemId::key("job-a").to_string(), "job-a");
    assert_eq!(ItemId::key(42).to_string(), "42");
    assert_eq!(ItemId::Index(3).to_string(), "#3");
}

#[test]
fn task_uses_camel_case_json() {
    let task = Task::new("t-1", "keyword", "u-1")
        .label("spring batch")
        .item("i-1", "rust async");

    let value = serde_json::to_value(&task).unwrap();
    assert_eq!(value["userId"], "u-1");
    assert_eq!(value["type"], "keyword");
    assert_eq!(value["status"], "pending");
    assert_eq!(value["label"], "spring batch");
    assert_eq!(value["taskItems"][0]["taskId"], "t-1");
    assert_eq!(value["taskItems"][0]["value"], "rust async");
    assert!(value.get("createdAt").is_some());
}

#[test]
fn task_parses_with_defaults() {
    let task: Task = serde_json::from_value(json!({
        "userId": "u-9",
        "type": "fetch",
        "id": "t-9",
        "createdAt": "2024-05-01T10:00:00Z",
        "updatedAt": "2024-05-01T10:00:00Z"
    }))
    .unwrap();

    assert_eq!(task.kind, "fetch");
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.task_items.is_empty());
    assert!(task.label.is_empty());
}

#[test]
fn index_by_id_keeps_last_duplicate() {
    let tasks = Task::index_by_id(vec![
        Task::new("a", "first", "u"),
        Task::new("b", "other", "u"),
        Task::new("a", "second", "u"),
    ]);

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks["a"].kind, "second");
}
