//! Core data types for the Cadence task graph.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A project groups tasks; dependencies never cross project boundaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    /// Unique identifier: "pj-" + 10 hex chars
    pub id: String,

    /// Display name
    pub name: String,

    /// When created
    pub created_at: DateTime<Utc>,
}

/// A unit of work with the fields scheduling cares about.
///
/// Owned by the surrounding application; the scheduler treats a list of
/// these as an immutable snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier: "tk-" + 10 hex chars
    pub id: String,

    /// Owning project
    pub project_id: String,

    /// Short description of the work
    pub title: String,

    /// Current state (display only, never used by scheduling)
    pub status: TaskStatus,

    /// Planned start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,

    /// Planned finish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,

    /// Estimated effort in hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_effort_hours: Option<f64>,

    /// Percent complete, 0-100
    #[serde(default)]
    pub progress: u8,

    /// When created
    pub created_at: DateTime<Utc>,

    /// Last modification
    pub updated_at: DateTime<Utc>,
}

/// Task status states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "blocked" => Ok(TaskStatus::Blocked),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

/// Precedence relationship between two tasks of the same project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyEdge {
    /// Unique identifier: "dp-" + 10 hex chars
    pub id: String,

    /// Project both endpoints belong to
    pub project_id: String,

    /// The task that must happen first
    pub predecessor_id: String,

    /// The task that depends on the predecessor
    pub successor_id: String,

    /// Link type
    #[serde(rename = "type")]
    pub kind: DependencyType,

    /// Offset in days between the two reference points (may be negative)
    #[serde(default)]
    pub lag_days: i64,

    /// When created
    pub created_at: DateTime<Utc>,

    /// Last modification of type or lag
    pub updated_at: DateTime<Utc>,
}

/// The four classic precedence link types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// Successor starts after predecessor finishes
    #[default]
    Fs,

    /// Successor starts after predecessor starts
    Ss,

    /// Successor finishes after predecessor finishes
    Ff,

    /// Successor finishes after predecessor starts
    Sf,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::Fs => "fs",
            DependencyType::Ss => "ss",
            DependencyType::Ff => "ff",
            DependencyType::Sf => "sf",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

impl FromStr for DependencyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fs" | "finish-to-start" | "finish_to_start" => Ok(DependencyType::Fs),
            "ss" | "start-to-start" | "start_to_start" => Ok(DependencyType::Ss),
            "ff" | "finish-to-finish" | "finish_to_finish" => Ok(DependencyType::Ff),
            "sf" | "start-to-finish" | "start_to_finish" => Ok(DependencyType::Sf),
            other => Err(format!("unknown dependency type '{}'", other)),
        }
    }
}

/// Minimal identifying data for a task, attached to edges for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRef {
    pub id: String,
    pub title: String,
}

impl From<&Task> for TaskRef {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
        }
    }
}

/// An edge together with both endpoints' display data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkedDependency {
    #[serde(flatten)]
    pub edge: DependencyEdge,
    pub predecessor: TaskRef,
    pub successor: TaskRef,
}

/// What a date/progress update reports back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    pub progress: u8,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            start: task.start,
            due: task.due,
            progress: task.progress,
            updated_at: task.updated_at,
        }
    }
}

/// Validation errors for task and project fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyTitle,
    TitleTooLong,
    InvalidCharacters,
    InvalidProgress(u8),
    InvalidEffort,
    InvalidTimestamp,
    DateOutOfRange,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyTitle => write!(f, "title cannot be empty"),
            ValidationError::TitleTooLong => write!(f, "title exceeds 500 characters"),
            ValidationError::InvalidCharacters => write!(f, "title contains control characters"),
            ValidationError::InvalidProgress(p) => write!(f, "progress must be 0-100, got {}", p),
            ValidationError::InvalidEffort => {
                write!(f, "estimated effort must be a finite, non-negative number of hours")
            }
            ValidationError::InvalidTimestamp => write!(f, "updated_at cannot be before created_at"),
            ValidationError::DateOutOfRange => write!(f, "dates must fall within years 0000-9999"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Title rules shared by projects and tasks.
pub(crate) fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.len() > 500 {
        return Err(ValidationError::TitleTooLong);
    }
    if title.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidCharacters);
    }
    Ok(())
}

impl Task {
    /// Validate the task's fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;

        if self.progress > 100 {
            return Err(ValidationError::InvalidProgress(self.progress));
        }

        if let Some(hours) = self.estimated_effort_hours
            && (!hours.is_finite() || hours < 0.0)
        {
            return Err(ValidationError::InvalidEffort);
        }

        if self.updated_at < self.created_at {
            return Err(ValidationError::InvalidTimestamp);
        }

        let dates = [self.start, self.due, Some(self.created_at), Some(self.updated_at)];
        if dates.iter().flatten().any(|d| !(0..=9999).contains(&d.year())) {
            return Err(ValidationError::DateOutOfRange);
        }

        Ok(())
    }
}
