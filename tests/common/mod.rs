//! Shared test infrastructure for Cadence integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown.

#![allow(dead_code)]

use cadence::{DependencyType, ErrorKind, LinkedDependency, Project, Store, Task, error_kind};
use tempfile::TempDir;

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: Store,
    pub project: Project,
}

impl TestEnv {
    /// Create a new test environment with an initialized store and one project.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = Store::init(temp_dir.path()).expect("Failed to init store");
        let project = store.create_project("Test project").expect("Failed to create project");
        Self {
            temp_dir,
            store,
            project,
        }
    }

    /// Create a task with no dates or effort (duration 1 day).
    pub fn create_task(&mut self, title: &str) -> Task {
        self.store
            .create_task(&self.project.id, title, None, None, None)
            .expect("Failed to create task")
    }

    /// Create a task lasting `days` working days (8h each).
    pub fn task_with_days(&mut self, title: &str, days: u32) -> Task {
        self.store
            .create_task(&self.project.id, title, None, None, Some(f64::from(days) * 8.0))
            .expect("Failed to create task")
    }

    /// Create another project with one task in it.
    pub fn foreign_task(&mut self, title: &str) -> Task {
        let other = self.store.create_project("Other").expect("Failed to create project");
        self.store
            .create_task(&other.id, title, None, None, None)
            .expect("Failed to create task")
    }

    /// Add a plain finish-to-start dependency.
    pub fn add_dep(&mut self, predecessor: &Task, successor: &Task) -> LinkedDependency {
        self.store
            .add_edge(&predecessor.id, &successor.id, DependencyType::Fs, 0)
            .expect("Failed to add dependency")
    }

    /// Try to add a dependency and return the error kind it fails with.
    pub fn add_dep_err(&mut self, predecessor: &Task, successor: &Task) -> ErrorKind {
        let err = self
            .store
            .add_edge(&predecessor.id, &successor.id, DependencyType::Fs, 0)
            .expect_err("Expected dependency to be rejected");
        error_kind(&err)
    }

    /// Number of edges stored for the test project.
    pub fn edge_count(&self) -> usize {
        self.store
            .list_edges(&self.project.id)
            .expect("Failed to list dependencies")
            .len()
    }

    /// Assert the stored edge set has a topological order.
    pub fn assert_acyclic(&self) {
        let tasks = self.store.list_tasks(&self.project.id).expect("Failed to list tasks");
        let edges: Vec<_> = self
            .store
            .list_edges(&self.project.id)
            .expect("Failed to list dependencies")
            .into_iter()
            .map(|linked| linked.edge)
            .collect();
        let graph = cadence::DependencyGraph::from_snapshot(&tasks, &edges);
        assert!(
            graph.topological_order().is_ok(),
            "Expected stored dependencies to be acyclic: {:?}",
            edges
                .iter()
                .map(|e| (&e.predecessor_id, &e.successor_id))
                .collect::<Vec<_>>()
        );
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
