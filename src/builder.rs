//! Builder pattern API for creating tasks.

use crate::store::Store;
use crate::types::Task;
use chrono::{DateTime, Utc};
use eyre::{Context, Result};

/// Builder for creating tasks with a fluent API.
///
/// # Example
///
/// ```ignore
/// let task = store.build_task(&project.id, "Write migration")
///     .effort_hours(12.0)
///     .create()?;
/// ```
pub struct TaskBuilder<'a> {
    store: &'a mut Store,
    project_id: String,
    title: String,
    start: Option<DateTime<Utc>>,
    due: Option<DateTime<Utc>>,
    effort_hours: Option<f64>,
}

impl<'a> TaskBuilder<'a> {
    /// Create a new builder with the given title.
    pub fn new(store: &'a mut Store, project_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            store,
            project_id: project_id.into(),
            title: title.into(),
            start: None,
            due: None,
            effort_hours: None,
        }
    }

    /// Set the planned start.
    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the planned finish.
    pub fn due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }

    /// Set the effort estimate in hours.
    pub fn effort_hours(mut self, hours: f64) -> Self {
        self.effort_hours = Some(hours);
        self
    }

    /// Set the effort estimate in whole working days.
    pub fn effort_days(self, days: u32) -> Self {
        let hours = f64::from(days) * self.store.config().schedule.hours_per_day;
        self.effort_hours(hours)
    }

    /// Create the task.
    pub fn create(self) -> Result<Task> {
        self.store
            .create_task(&self.project_id, &self.title, self.start, self.due, self.effort_hours)
            .context("Failed to create task")
    }
}

/// Extension trait to add builder method to Store.
pub trait StoreBuilderExt {
    /// Start building a new task in the given project.
    fn build_task(&mut self, project_id: &str, title: impl Into<String>) -> TaskBuilder<'_>;
}

impl StoreBuilderExt for Store {
    fn build_task(&mut self, project_id: &str, title: impl Into<String>) -> TaskBuilder<'_> {
        TaskBuilder::new(self, project_id, title)
    }
}
