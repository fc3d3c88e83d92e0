//! Core data model.
//!
//! Work items are opaque to the executor. It only knows how to name them
//! (for diagnostics) and where each one is in its lifecycle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Item identity
// ---------------------------------------------------------------------------

/// Identifies one work item within a single executor invocation.
///
/// Used for logging and failure attribution only. Never implies ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemId {
    /// Key from a keyed input mapping.
    Key(String),
    /// Position in an unkeyed input sequence (0-based).
    Index(usize),
}

impl ItemId {
    pub fn key(key: impl std::fmt::Display) -> Self {
        Self::Key(key.to_string())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemId::Key(key) => write!(f, "{key}"),
            ItemId::Index(index) => write!(f, "#{index}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Item state
// ---------------------------------------------------------------------------

/// Lifecycle state of a work item inside one executor invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Accepted at call entry, not yet scheduled.
    Pending,
    /// Scheduled, blocked on the concurrency gate.
    WaitingForPermit,
    /// Holding a permit, worker running.
    Running,
    /// Worker returned success. Terminal.
    Succeeded,
    /// Worker returned a failure or panicked. Terminal.
    Failed,
}

impl ItemState {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: ItemState) -> bool {
        use ItemState::*;
        matches!(
            (self, to),
            (Pending, WaitingForPermit)
                | (WaitingForPermit, Running)
                | (Running, Succeeded)
                | (Running, Failed)
        )
    }

    /// Is this a terminal state?
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::Succeeded | ItemState::Failed)
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemState::Pending => "pending",
            ItemState::WaitingForPermit => "waiting_for_permit",
            ItemState::Running => "running",
            ItemState::Succeeded => "succeeded",
            ItemState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Task records
// ---------------------------------------------------------------------------

/// Status of a task record as tracked by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A user-submitted task: a labelled batch of values to process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub user_id: String,

    /// What kind of task this is. Serialized as `type`.
    #[serde(rename = "type")]
    pub kind: String,

    pub id: String,

    #[serde(default)]
    pub status: TaskStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub task_items: Vec<TaskItem>,
}

/// One value belonging to a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: String,
    pub value: String,
    pub task_id: String,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            kind: kind.into(),
            id: id.into(),
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            label: String::new(),
            task_items: Vec::new(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Append an item carrying `value`, linked back to this task.
    pub fn item(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.task_items.push(TaskItem {
            id: id.into(),
            value: value.into(),
            task_id: self.id.clone(),
            status: TaskStatus::Pending,
        });
        self
    }

    /// Index tasks by id. Later duplicates replace earlier ones.
    pub fn index_by_id(tasks: impl IntoIterator<Item = Task>) -> HashMap<String, Task> {
        tasks.into_iter().map(|t| (t.id.clone(), t)).collect()
    }
}
