//! Integration tests for batch date/progress updates.

mod common;

use cadence::{DateEdit, ErrorKind, Store, StoreBatchExt};
use chrono::{TimeZone, Utc};
use common::TestEnv;

#[test]
fn test_missing_task_does_not_block_others() {
    let mut env = TestEnv::new();
    let x = env.create_task("X");
    let z = env.create_task("Z");
    let due = Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap();

    let result = env.store.apply_batch(vec![
        DateEdit::new(&x.id).with_progress(25),
        DateEdit::new("tk-missing").with_progress(50),
        DateEdit::new(&z.id).with_due(due),
    ]);

    assert_eq!(result.applied.len(), 2);
    assert_eq!(result.applied[0].id, x.id);
    assert_eq!(result.applied[1].id, z.id);

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].index, 1);
    assert_eq!(result.errors[0].task_id, "tk-missing");
    assert_eq!(result.errors[0].kind, ErrorKind::NotFound);

    // Committed values are visible to later reads
    assert_eq!(env.store.get_task(&x.id).unwrap().unwrap().progress, 25);
    assert_eq!(env.store.get_task(&z.id).unwrap().unwrap().due, Some(due));
}

#[test]
fn test_invalid_item_is_reported() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");

    let result = env.store.apply_batch(vec![
        DateEdit::new(&a.id).with_progress(200),
        DateEdit::new(&b.id).with_progress(100),
    ]);

    assert_eq!(result.applied.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ErrorKind::Validation);
    assert_eq!(env.store.get_task(&a.id).unwrap().unwrap().progress, 0);
    assert_eq!(env.store.get_task(&b.id).unwrap().unwrap().progress, 100);
}

#[test]
fn test_same_task_edited_twice() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let start = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();

    let result = env.store.apply_batch(vec![
        DateEdit::new(&a.id).with_start(start),
        DateEdit::new(&a.id).with_progress(60),
    ]);

    assert!(result.errors.is_empty());
    let stored = env.store.get_task(&a.id).unwrap().unwrap();
    assert_eq!(stored.start, Some(start));
    assert_eq!(stored.progress, 60);
}

#[test]
fn test_batch_survives_reopen() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    env.store.apply_batch(vec![DateEdit::new(&a.id).with_progress(75)]);

    let reopened = Store::open(env.temp_dir.path()).unwrap();
    assert_eq!(reopened.get_task(&a.id).unwrap().unwrap().progress, 75);
}

#[test]
fn test_batch_from_json() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let json = format!(
        r#"[{{"task_id":"{}","start":"2025-05-01T00:00:00Z","due":"2025-05-03T00:00:00Z"}}]"#,
        a.id
    );
    let edits: Vec<DateEdit> = serde_json::from_str(&json).unwrap();

    let result = env.store.apply_batch(edits);
    assert_eq!(result.applied.len(), 1);

    let schedule = env.store.critical_path(&env.project.id).unwrap();
    assert_eq!(schedule.node(&a.id).unwrap().duration, 2);
}
