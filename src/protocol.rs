//! IPC protocol types for daemon communication.

use crate::batch::{BatchResult, DateEdit};
use crate::schedule::Schedule;
use crate::store::{DateChange, ErrorKind};
use crate::types::{DependencyType, LinkedDependency, Project, Task, TaskSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request sent from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Create a new project.
    CreateProject { name: String },

    /// Create a new task.
    CreateTask {
        project_id: String,
        title: String,
        start: Option<DateTime<Utc>>,
        due: Option<DateTime<Utc>>,
        estimated_effort_hours: Option<f64>,
    },

    /// Get a task by ID.
    GetTask { id: String },

    /// List a project's tasks.
    ListTasks { project_id: String },

    /// Update one task's dates and progress.
    UpdateTaskDates { task_id: String, change: DateChange },

    /// Update several tasks' dates and progress.
    BatchUpdateTaskDates { edits: Vec<DateEdit> },

    /// Add a dependency edge.
    AddDependency {
        predecessor_id: String,
        successor_id: String,
        #[serde(default)]
        kind: DependencyType,
        #[serde(default)]
        lag_days: i64,
    },

    /// Change a dependency's type or lag.
    UpdateDependency {
        id: String,
        kind: Option<DependencyType>,
        lag_days: Option<i64>,
    },

    /// Remove a dependency edge.
    RemoveDependency { id: String },

    /// List a project's dependency edges.
    ListDependencies { project_id: String },

    /// Compute the critical path schedule.
    CriticalPath { project_id: String },

    /// Shutdown the daemon.
    Shutdown,

    /// Ping to check if daemon is alive.
    Ping,
}

/// Response sent from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Single project response.
    Project { project: Project },

    /// Single task response.
    Task { task: Task },

    /// Multiple tasks response.
    Tasks { tasks: Vec<Task> },

    /// Task date update response.
    TaskSummary { summary: TaskSummary },

    /// Batch update response.
    Batch { result: BatchResult },

    /// Single dependency response.
    Dependency { dependency: LinkedDependency },

    /// Multiple dependencies response.
    Dependencies { dependencies: Vec<LinkedDependency> },

    /// Schedule response.
    Schedule { schedule: Schedule },

    /// Entity not found (plain lookups only).
    NotFound { id: String },

    /// Operation succeeded.
    Ok,

    /// Pong response to ping.
    Pong,

    /// Error response.
    Error { kind: ErrorKind, message: String },
}

impl Response {
    /// Create an error response.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    /// Create an error response from a store error.
    pub fn from_report(err: &eyre::Report) -> Self {
        Self::error(crate::store::error_kind(err), err.to_string())
    }
}
