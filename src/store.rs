//! High-level store API for Cadence.

use crate::config::{CONFIG_FILE, Config};
use crate::graph::{CycleDetected, would_create_cycle};
use crate::id::{DEPENDENCY_PREFIX, PROJECT_PREFIX, TASK_PREFIX, generate_id};
use crate::schedule::{Schedule, ScheduleCalculator, ScheduleOptions};
use crate::storage::{CADENCE_DIR, Storage};
use crate::types::{
    DependencyEdge, DependencyType, LinkedDependency, Project, Task, TaskRef, TaskStatus, TaskSummary,
    ValidationError, validate_title,
};
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Broad error categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Duplicate,
    CrossProject,
    Cycle,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::CrossProject => "cross_project",
            ErrorKind::Cycle => "cycle",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Project not found.
    ProjectNotFound(String),
    /// Task not found.
    TaskNotFound(String),
    /// Dependency edge not found.
    DependencyNotFound(String),
    /// Project has no tasks to schedule.
    NothingToSchedule(String),
    /// Self-referential edge.
    SelfReferentialEdge(String),
    /// Endpoints belong to different projects.
    CrossProject { predecessor_id: String, successor_id: String },
    /// An edge for this ordered pair already exists.
    DuplicateDependency { predecessor_id: String, successor_id: String },
    /// Adding this edge would create a cycle.
    CycleDetected { predecessor_id: String, successor_id: String },
    /// The stored edge set unexpectedly contains a cycle.
    CyclicGraph(Vec<String>),
    /// Field validation error.
    Validation(ValidationError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::ProjectNotFound(_)
            | StoreError::TaskNotFound(_)
            | StoreError::DependencyNotFound(_)
            | StoreError::NothingToSchedule(_) => ErrorKind::NotFound,
            StoreError::SelfReferentialEdge(_) | StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::CrossProject { .. } => ErrorKind::CrossProject,
            StoreError::DuplicateDependency { .. } => ErrorKind::Duplicate,
            StoreError::CycleDetected { .. } | StoreError::CyclicGraph(_) => ErrorKind::Cycle,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ProjectNotFound(id) => write!(f, "project not found: {}", id),
            StoreError::TaskNotFound(id) => write!(f, "task not found: {}", id),
            StoreError::DependencyNotFound(id) => write!(f, "dependency not found: {}", id),
            StoreError::NothingToSchedule(id) => write!(f, "project {} has no tasks to schedule", id),
            StoreError::SelfReferentialEdge(id) => write!(f, "task {} cannot depend on itself", id),
            StoreError::CrossProject {
                predecessor_id,
                successor_id,
            } => write!(
                f,
                "tasks {} and {} belong to different projects",
                predecessor_id, successor_id
            ),
            StoreError::DuplicateDependency {
                predecessor_id,
                successor_id,
            } => write!(
                f,
                "dependency {} -> {} already exists",
                predecessor_id, successor_id
            ),
            StoreError::CycleDetected {
                predecessor_id,
                successor_id,
            } => write!(
                f,
                "adding dependency {} -> {} would create a cycle",
                predecessor_id, successor_id
            ),
            StoreError::CyclicGraph(ids) => {
                write!(f, "dependency graph contains a cycle among: {}", ids.join(", "))
            }
            StoreError::Validation(e) => write!(f, "validation error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<CycleDetected> for StoreError {
    fn from(err: CycleDetected) -> Self {
        StoreError::CyclicGraph(err.task_ids)
    }
}

/// Classify any error returned by the store.
///
/// Errors that did not originate as a [`StoreError`] (SQLite, I/O) are
/// `Internal`.
pub fn error_kind(err: &eyre::Report) -> ErrorKind {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<StoreError>())
        .map(StoreError::kind)
        .unwrap_or(ErrorKind::Internal)
}

/// Fields to change on a task. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

/// The main Cadence store.
pub struct Store {
    storage: Storage,
    config: Config,
}

impl Store {
    /// Initialize a new store in the given directory.
    pub fn init(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root.join(CADENCE_DIR)).context("Failed to create .cadence directory")?;
        let config = Config::load(&config_path(root))?;
        let storage = Storage::init(root, config.storage.busy_timeout())?;
        Ok(Self { storage, config })
    }

    /// Open an existing store.
    pub fn open(root: &Path) -> Result<Self> {
        let cadence_dir = root.join(CADENCE_DIR);
        if !cadence_dir.exists() {
            eyre::bail!("No .cadence directory found. Run 'cad init' first.");
        }
        let config = Config::load(&config_path(root))?;
        let storage = Storage::open(root, config.storage.busy_timeout())?;
        Ok(Self { storage, config })
    }

    /// Replace the loaded configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &Path {
        self.storage.root()
    }

    // -------------------------------------------------------------------------
    // Projects
    // -------------------------------------------------------------------------

    /// Create a new project.
    pub fn create_project(&mut self, name: &str) -> Result<Project> {
        validate_title(name).map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        let now = Utc::now();
        let project = Project {
            id: generate_id(PROJECT_PREFIX, name, now),
            name: name.to_string(),
            created_at: now,
        };

        self.storage
            .insert_project(&project)
            .context("Failed to persist project")?;
        log::info!("Created project {} ({})", project.id, project.name);

        Ok(project)
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.storage.get_project(id)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.storage.list_projects()
    }

    // -------------------------------------------------------------------------
    // Tasks
    // -------------------------------------------------------------------------

    /// Create a new task in a project.
    pub fn create_task(
        &mut self,
        project_id: &str,
        title: &str,
        start: Option<DateTime<Utc>>,
        due: Option<DateTime<Utc>>,
        estimated_effort_hours: Option<f64>,
    ) -> Result<Task> {
        let now = Utc::now();
        let task = Task {
            id: generate_id(TASK_PREFIX, title, now),
            project_id: project_id.to_string(),
            title: title.to_string(),
            status: TaskStatus::Todo,
            start,
            due,
            estimated_effort_hours,
            progress: 0,
            created_at: now,
            updated_at: now,
        };

        // Validate before persisting
        task.validate().map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        self.storage.atomically(|s| {
            if s.get_project(project_id)?.is_none() {
                return Err(eyre::eyre!(StoreError::ProjectNotFound(project_id.to_string())));
            }
            s.insert_task(&task).context("Failed to persist task")
        })?;
        log::info!("Created task {} in {}", task.id, project_id);

        Ok(task)
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.storage.get_task(id)
    }

    /// List a project's tasks in creation order.
    pub fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        self.storage.list_tasks(project_id)
    }

    /// Change a task's status. Status is informational only.
    pub fn set_task_status(&mut self, id: &str, status: TaskStatus) -> Result<Task> {
        self.storage.atomically(|s| {
            let existing = s
                .get_task(id)?
                .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(id.to_string())))?;

            let updated = Task {
                status,
                updated_at: Utc::now(),
                ..existing
            };
            s.update_task(&updated).context("Failed to persist status change")?;
            Ok(updated)
        })
    }

    /// Update a task's dates and progress.
    pub fn update_task_dates(&mut self, id: &str, change: &DateChange) -> Result<TaskSummary> {
        let updated = self.storage.atomically(|s| {
            let existing = s
                .get_task(id)?
                .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(id.to_string())))?;

            let now = Utc::now();
            let updated = Task {
                start: change.start.or(existing.start),
                due: change.due.or(existing.due),
                progress: change.progress.unwrap_or(existing.progress),
                updated_at: now.max(existing.created_at),
                ..existing
            };

            updated.validate().map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;
            s.update_task(&updated).context("Failed to persist task dates")?;
            Ok(updated)
        })?;

        log::info!(
            "Updated task {}: start={:?} due={:?} progress={}",
            updated.id,
            updated.start,
            updated.due,
            updated.progress
        );
        Ok(TaskSummary::from(&updated))
    }

    // -------------------------------------------------------------------------
    // Dependencies
    // -------------------------------------------------------------------------

    /// Add a dependency edge `predecessor -> successor`.
    ///
    /// Every check and the insert run in one write transaction, so no edge
    /// that would close a cycle is ever stored.
    pub fn add_edge(
        &mut self,
        predecessor_id: &str,
        successor_id: &str,
        kind: DependencyType,
        lag_days: i64,
    ) -> Result<LinkedDependency> {
        if predecessor_id == successor_id {
            return Err(eyre::eyre!(StoreError::SelfReferentialEdge(predecessor_id.to_string())));
        }

        let linked = self.storage.atomically(|s| {
            let predecessor = s
                .get_task(predecessor_id)?
                .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(predecessor_id.to_string())))?;
            let successor = s
                .get_task(successor_id)?
                .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(successor_id.to_string())))?;

            if predecessor.project_id != successor.project_id {
                return Err(eyre::eyre!(StoreError::CrossProject {
                    predecessor_id: predecessor_id.to_string(),
                    successor_id: successor_id.to_string(),
                }));
            }

            if s.dependency_exists(predecessor_id, successor_id)? {
                return Err(eyre::eyre!(StoreError::DuplicateDependency {
                    predecessor_id: predecessor_id.to_string(),
                    successor_id: successor_id.to_string(),
                }));
            }

            if would_create_cycle(predecessor_id, successor_id, |id| s.successor_ids(id))? {
                return Err(eyre::eyre!(StoreError::CycleDetected {
                    predecessor_id: predecessor_id.to_string(),
                    successor_id: successor_id.to_string(),
                }));
            }

            let now = Utc::now();
            let edge = DependencyEdge {
                id: generate_id(DEPENDENCY_PREFIX, &format!("{}>{}", predecessor_id, successor_id), now),
                project_id: predecessor.project_id.clone(),
                predecessor_id: predecessor_id.to_string(),
                successor_id: successor_id.to_string(),
                kind,
                lag_days,
                created_at: now,
                updated_at: now,
            };
            s.insert_dependency(&edge).context("Failed to persist dependency")?;

            Ok(LinkedDependency {
                edge,
                predecessor: TaskRef::from(&predecessor),
                successor: TaskRef::from(&successor),
            })
        })?;

        log::info!(
            "Added dependency {}: {} -> {} ({}, lag {})",
            linked.edge.id,
            predecessor_id,
            successor_id,
            kind,
            lag_days
        );
        Ok(linked)
    }

    /// Change an edge's type and/or lag. Endpoints are immutable.
    pub fn update_edge(
        &mut self,
        edge_id: &str,
        kind: Option<DependencyType>,
        lag_days: Option<i64>,
    ) -> Result<LinkedDependency> {
        let linked = self.storage.atomically(|s| {
            let existing = s
                .get_dependency(edge_id)?
                .ok_or_else(|| eyre::eyre!(StoreError::DependencyNotFound(edge_id.to_string())))?;

            let updated = DependencyEdge {
                kind: kind.unwrap_or(existing.kind),
                lag_days: lag_days.unwrap_or(existing.lag_days),
                updated_at: Utc::now(),
                ..existing
            };
            s.update_dependency(&updated)
                .context("Failed to persist dependency update")?;

            Self::link(s, updated)
        })?;

        log::info!(
            "Updated dependency {}: {}, lag {}",
            linked.edge.id,
            linked.edge.kind,
            linked.edge.lag_days
        );
        Ok(linked)
    }

    /// Delete an edge. Always permitted; tasks are untouched.
    pub fn remove_edge(&mut self, edge_id: &str) -> Result<()> {
        let removed = self
            .storage
            .atomically(|s| s.delete_dependency(edge_id))
            .context("Failed to remove dependency")?;

        if !removed {
            return Err(eyre::eyre!(StoreError::DependencyNotFound(edge_id.to_string())));
        }

        log::info!("Removed dependency {}", edge_id);
        Ok(())
    }

    /// Get an edge with endpoint display data.
    pub fn get_edge(&self, edge_id: &str) -> Result<Option<LinkedDependency>> {
        self.storage.snapshot(|s| match s.get_dependency(edge_id)? {
            Some(edge) => Self::link(s, edge).map(Some),
            None => Ok(None),
        })
    }

    /// All edges of a project with endpoint display data.
    pub fn list_edges(&self, project_id: &str) -> Result<Vec<LinkedDependency>> {
        self.storage.snapshot(|s| {
            let tasks = s.list_tasks(project_id)?;
            let refs: std::collections::HashMap<&str, TaskRef> =
                tasks.iter().map(|t| (t.id.as_str(), TaskRef::from(t))).collect();

            s.list_dependencies(project_id)?
                .into_iter()
                .map(|edge| -> Result<LinkedDependency> {
                    let predecessor = refs
                        .get(edge.predecessor_id.as_str())
                        .cloned()
                        .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(edge.predecessor_id.clone())))?;
                    let successor = refs
                        .get(edge.successor_id.as_str())
                        .cloned()
                        .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(edge.successor_id.clone())))?;
                    Ok(LinkedDependency {
                        edge,
                        predecessor,
                        successor,
                    })
                })
                .collect()
        })
    }

    /// Edges whose successor is `task_id`.
    pub fn predecessors_of(&self, task_id: &str) -> Result<Vec<DependencyEdge>> {
        self.storage.dependencies_into(task_id)
    }

    /// Edges whose predecessor is `task_id`.
    pub fn successors_of(&self, task_id: &str) -> Result<Vec<DependencyEdge>> {
        self.storage.dependencies_from(task_id)
    }

    fn link(s: &Storage, edge: DependencyEdge) -> Result<LinkedDependency> {
        let predecessor = s
            .get_task(&edge.predecessor_id)?
            .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(edge.predecessor_id.clone())))?;
        let successor = s
            .get_task(&edge.successor_id)?
            .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(edge.successor_id.clone())))?;
        Ok(LinkedDependency {
            edge,
            predecessor: TaskRef::from(&predecessor),
            successor: TaskRef::from(&successor),
        })
    }

    // -------------------------------------------------------------------------
    // Schedule
    // -------------------------------------------------------------------------

    /// Compute the critical path schedule for a project from a fresh snapshot.
    pub fn critical_path(&self, project_id: &str) -> Result<Schedule> {
        let (tasks, edges) = self.storage.snapshot(|s| {
            if s.get_project(project_id)?.is_none() {
                return Err(eyre::eyre!(StoreError::ProjectNotFound(project_id.to_string())));
            }
            Ok((s.list_tasks(project_id)?, s.list_dependencies(project_id)?))
        })?;

        if tasks.is_empty() {
            return Err(eyre::eyre!(StoreError::NothingToSchedule(project_id.to_string())));
        }

        let calculator = ScheduleCalculator::new(ScheduleOptions::from(&self.config.schedule));
        let mut schedule = calculator
            .compute(&tasks, &edges)
            .map_err(|e| eyre::eyre!(StoreError::from(e)))?;
        schedule.project_id = project_id.to_string();

        Ok(schedule)
    }
}

fn config_path(root: &Path) -> std::path::PathBuf {
    root.join(CADENCE_DIR).join(CONFIG_FILE)
}
