//! Cadence: task dependency graphs with critical path scheduling.
//!
//! Cadence keeps projects, tasks and finish-to-start dependency edges in a
//! SQLite store, refuses any edge that would close a cycle, and computes
//! CPM schedules (earliest/latest start and finish, slack, critical path)
//! from a consistent snapshot of a project.
//!
//! # Example
//!
//! ```no_run
//! use cadence::{DependencyType, Store, StoreBuilderExt};
//! use std::path::Path;
//!
//! let mut store = Store::init(Path::new(".")).unwrap();
//! let project = store.create_project("Launch").unwrap();
//!
//! let design = store.build_task(&project.id, "Design").effort_hours(8.0).create().unwrap();
//! let build = store.build_task(&project.id, "Build").effort_days(3).create().unwrap();
//!
//! // Build cannot start before Design finishes
//! store.add_edge(&design.id, &build.id, DependencyType::Fs, 0).unwrap();
//!
//! let schedule = store.critical_path(&project.id).unwrap();
//! assert_eq!(schedule.project_duration, 4);
//! assert_eq!(schedule.critical_ids(), vec![design.id.as_str(), build.id.as_str()]);
//! ```

mod id;
mod storage;

pub mod batch;
pub mod builder;
pub mod client;
pub mod config;
pub mod daemon;
pub mod duration;
pub mod graph;
pub mod protocol;
pub mod schedule;
pub mod store;
pub mod types;

// Re-export public API
pub use batch::{BatchError, BatchResult, DateEdit, StoreBatchExt};
pub use builder::{StoreBuilderExt, TaskBuilder};
pub use client::Client;
pub use config::Config;
pub use daemon::{Daemon, DaemonConfig, is_daemon_running, start_daemon};
pub use duration::{duration_days, duration_days_with};
pub use graph::{CycleDetected, DependencyGraph, would_create_cycle};
pub use protocol::{Request, Response};
pub use schedule::{Schedule, ScheduleCalculator, ScheduleNode, ScheduleOptions, compute_schedule};
pub use store::{DateChange, ErrorKind, Store, StoreError, error_kind};
pub use types::{
    DependencyEdge, DependencyType, LinkedDependency, Project, Task, TaskRef, TaskStatus, TaskSummary, ValidationError,
};
