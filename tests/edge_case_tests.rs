//! Integration tests for edge cases and boundary conditions.

mod common;

use cadence::{DependencyType, Store, TaskStatus};
use common::TestEnv;

// =============================================================================
// Empty Store
// =============================================================================

#[test]
fn test_empty_project_lists() {
    let env = TestEnv::new();
    assert!(env.store.list_tasks(&env.project.id).unwrap().is_empty());
    assert!(env.store.list_edges(&env.project.id).unwrap().is_empty());
}

#[test]
fn test_unknown_project_lists_are_empty() {
    let env = TestEnv::new();
    assert!(env.store.list_tasks("pj-nonexistent").unwrap().is_empty());
    assert!(env.store.list_edges("pj-nonexistent").unwrap().is_empty());
}

#[test]
fn test_single_task_schedule() {
    let mut env = TestEnv::new();
    let only = env.create_task("Only");

    let schedule = env.store.critical_path(&env.project.id).unwrap();
    assert_eq!(schedule.project_duration, 1);
    assert_eq!(schedule.critical_ids(), vec![only.id.as_str()]);
}

// =============================================================================
// Titles and Identifiers
// =============================================================================

#[test]
fn test_unicode_titles() {
    let mut env = TestEnv::new();
    for title in ["🚀 Launch", "设计评审", "مراجعة"] {
        let task = env.create_task(title);
        assert_eq!(env.store.get_task(&task.id).unwrap().unwrap().title, title);
    }
}

#[test]
fn test_title_length_max_valid() {
    let mut env = TestEnv::new();
    let title = "a".repeat(500);
    let task = env.create_task(&title);
    assert_eq!(task.title.len(), 500);
}

#[test]
fn test_id_format() {
    let mut env = TestEnv::new();
    let task = env.create_task("Format");

    assert!(task.id.starts_with("tk-"));
    assert_eq!(task.id.len(), 13);
    assert!(task.id[3..].chars().all(|c| c.is_ascii_hexdigit()));
    assert!(env.project.id.starts_with("pj-"));
}

#[test]
fn test_unique_ids_for_same_title() {
    let mut env = TestEnv::new();
    let ids: std::collections::HashSet<_> = (0..20).map(|_| env.create_task("Same").id).collect();
    assert_eq!(ids.len(), 20);
}

// =============================================================================
// Durations
// =============================================================================

#[test]
fn test_zero_effort_counts_as_one_day() {
    let mut env = TestEnv::new();
    let task = env
        .store
        .create_task(&env.project.id, "Trivial", None, None, Some(0.0))
        .unwrap();

    let schedule = env.store.critical_path(&env.project.id).unwrap();
    assert_eq!(schedule.node(&task.id).unwrap().duration, 1);
}

#[test]
fn test_fractional_effort_rounds_up() {
    let mut env = TestEnv::new();
    let task = env
        .store
        .create_task(&env.project.id, "Nine hours", None, None, Some(9.0))
        .unwrap();

    let schedule = env.store.critical_path(&env.project.id).unwrap();
    assert_eq!(schedule.node(&task.id).unwrap().duration, 2);
}

// =============================================================================
// Scale and Persistence
// =============================================================================

#[test]
fn test_long_chain() {
    let mut env = TestEnv::new();
    let tasks: Vec<_> = (0..150).map(|i| env.create_task(&format!("Step {}", i))).collect();
    for pair in tasks.windows(2) {
        env.add_dep(&pair[0], &pair[1]);
    }

    // Closing the loop has to walk the whole chain
    assert_eq!(
        env.add_dep_err(&tasks[149], &tasks[0]),
        cadence::ErrorKind::Cycle
    );

    let schedule = env.store.critical_path(&env.project.id).unwrap();
    assert_eq!(schedule.project_duration, 150);
    assert_eq!(schedule.critical_path.len(), 150);
}

#[test]
fn test_data_survives_reopen() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");
    let linked = env
        .store
        .add_edge(&a.id, &b.id, DependencyType::Ff, 4)
        .unwrap();
    env.store.set_task_status(&a.id, TaskStatus::Done).unwrap();

    let reopened = Store::open(env.temp_dir.path()).unwrap();
    let edge = reopened.get_edge(&linked.edge.id).unwrap().unwrap();
    assert_eq!(edge.edge.kind, DependencyType::Ff);
    assert_eq!(edge.edge.lag_days, 4);
    assert_eq!(edge.edge.created_at, linked.edge.created_at);
    assert_eq!(reopened.get_task(&a.id).unwrap().unwrap().status, TaskStatus::Done);
    assert_eq!(reopened.list_projects().unwrap().len(), 1);
}

#[test]
fn test_status_does_not_affect_schedule() {
    let mut env = TestEnv::new();
    let a = env.task_with_days("A", 2);
    let b = env.task_with_days("B", 2);
    env.add_dep(&a, &b);

    let before = env.store.critical_path(&env.project.id).unwrap();
    env.store.set_task_status(&a.id, TaskStatus::Done).unwrap();
    env.store.set_task_status(&b.id, TaskStatus::Blocked).unwrap();
    let after = env.store.critical_path(&env.project.id).unwrap();

    assert_eq!(before, after);
}
