//! Batch date/progress updates with per-item failure isolation.

use crate::store::{DateChange, ErrorKind, Store, error_kind};
use crate::types::TaskSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One edit in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateEdit {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl DateEdit {
    /// Create an edit that changes nothing yet.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            start: None,
            due: None,
            progress: None,
        }
    }

    /// Set the start date.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the due date.
    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }

    /// Set the progress percentage.
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    fn change(&self) -> DateChange {
        DateChange {
            start: self.start,
            due: self.due,
            progress: self.progress,
        }
    }
}

/// A failed item in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchError {
    /// Position of the edit in the request
    pub index: usize,
    pub task_id: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Result of a batch update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Successfully updated tasks.
    pub applied: Vec<TaskSummary>,
    /// Items that failed.
    pub errors: Vec<BatchError>,
}

/// Extension trait for batch operations on Store.
pub trait StoreBatchExt {
    /// Apply date/progress edits to several tasks.
    ///
    /// Each edit commits on its own; a failing edit is reported and skipped
    /// without undoing the others.
    fn apply_batch(&mut self, edits: Vec<DateEdit>) -> BatchResult;
}

impl StoreBatchExt for Store {
    fn apply_batch(&mut self, edits: Vec<DateEdit>) -> BatchResult {
        let mut result = BatchResult::default();

        for (index, edit) in edits.into_iter().enumerate() {
            match self.update_task_dates(&edit.task_id, &edit.change()) {
                Ok(summary) => result.applied.push(summary),
                Err(e) => {
                    log::warn!("Batch item {} ({}) failed: {}", index, edit.task_id, e);
                    result.errors.push(BatchError {
                        index,
                        task_id: edit.task_id,
                        kind: error_kind(&e),
                        message: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Batch applied {} edit(s), {} failed",
            result.applied.len(),
            result.errors.len()
        );
        result
    }
}
