//! Integration tests for dependency graph operations.
//!
//! Tests edge validation, cycle rejection, and predecessor/successor queries.

mod common;

use cadence::{DependencyType, ErrorKind, Store, StoreError, error_kind};
use common::TestEnv;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Barrier};
use std::thread;

// =============================================================================
// Adding Edges
// =============================================================================

#[test]
fn test_add_simple_chain() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");
    let c = env.create_task("C");

    env.add_dep(&a, &b);
    env.add_dep(&b, &c);

    assert_eq!(env.edge_count(), 2);
    env.assert_acyclic();
}

#[test]
fn test_edge_defaults() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");

    let linked = env.add_dep(&a, &b);
    assert_eq!(linked.edge.kind, DependencyType::Fs);
    assert_eq!(linked.edge.lag_days, 0);
    assert_eq!(linked.edge.created_at, linked.edge.updated_at);
}

#[test]
fn test_edge_keeps_type_and_lag() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");

    let linked = env.store.add_edge(&a.id, &b.id, DependencyType::Sf, -3).unwrap();
    let stored = env.store.get_edge(&linked.edge.id).unwrap().unwrap();
    assert_eq!(stored.edge.kind, DependencyType::Sf);
    assert_eq!(stored.edge.lag_days, -3);
    assert_eq!(stored.predecessor.id, a.id);
    assert_eq!(stored.successor.id, b.id);
}

#[test]
fn test_diamond_is_allowed() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");
    let c = env.create_task("C");
    let d = env.create_task("D");

    env.add_dep(&a, &b);
    env.add_dep(&a, &c);
    env.add_dep(&b, &d);
    env.add_dep(&c, &d);

    assert_eq!(env.edge_count(), 4);
    env.assert_acyclic();
}

// =============================================================================
// Rejected Edges
// =============================================================================

#[test]
fn test_duplicate_edge_rejected() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");

    env.add_dep(&a, &b);
    assert_eq!(env.add_dep_err(&a, &b), ErrorKind::Duplicate);
    assert_eq!(env.edge_count(), 1);
}

#[test]
fn test_duplicate_with_different_type_rejected() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");

    env.add_dep(&a, &b);
    let result = env.store.add_edge(&a.id, &b.id, DependencyType::Ss, 2);
    assert_eq!(cadence::error_kind(&result.unwrap_err()), ErrorKind::Duplicate);
}

#[test]
fn test_reverse_pair_is_cycle_not_duplicate() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");

    env.add_dep(&a, &b);
    assert_eq!(env.add_dep_err(&b, &a), ErrorKind::Cycle);
    assert_eq!(env.edge_count(), 1);
}

#[test]
fn test_long_cycle_rejected_without_mutation() {
    let mut env = TestEnv::new();
    let tasks: Vec<_> = (0..6).map(|i| env.create_task(&format!("T{}", i))).collect();
    for pair in tasks.windows(2) {
        env.add_dep(&pair[0], &pair[1]);
    }

    let err = env
        .store
        .add_edge(&tasks[5].id, &tasks[0].id, DependencyType::Fs, 0)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::CycleDetected { .. })
    ));
    assert_eq!(env.edge_count(), 5);
    env.assert_acyclic();
}

#[test]
fn test_self_loop_rejected() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    assert_eq!(env.add_dep_err(&a, &a), ErrorKind::Validation);
    assert_eq!(env.edge_count(), 0);
}

#[test]
fn test_cross_project_rejected() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let other = env.foreign_task("Elsewhere");

    assert_eq!(env.add_dep_err(&a, &other), ErrorKind::CrossProject);
    assert_eq!(env.add_dep_err(&other, &a), ErrorKind::CrossProject);
    assert_eq!(env.edge_count(), 0);
}

// =============================================================================
// Removal and Queries
// =============================================================================

#[test]
fn test_remove_then_reverse_allowed() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");

    let linked = env.add_dep(&a, &b);
    env.store.remove_edge(&linked.edge.id).unwrap();
    assert_eq!(env.edge_count(), 0);

    // With the original edge gone, the reverse direction is fine
    env.add_dep(&b, &a);
    env.assert_acyclic();
}

#[test]
fn test_remove_leaves_tasks() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");

    let linked = env.add_dep(&a, &b);
    env.store.remove_edge(&linked.edge.id).unwrap();

    assert!(env.store.get_task(&a.id).unwrap().is_some());
    assert!(env.store.get_task(&b.id).unwrap().is_some());
    assert!(env.store.get_edge(&linked.edge.id).unwrap().is_none());
}

#[test]
fn test_predecessors_and_successors() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");
    let c = env.create_task("C");
    let d = env.create_task("D");

    env.add_dep(&a, &d);
    env.add_dep(&b, &d);
    env.add_dep(&d, &c);

    let preds: Vec<_> = env
        .store
        .predecessors_of(&d.id)
        .unwrap()
        .into_iter()
        .map(|e| e.predecessor_id)
        .collect();
    assert_eq!(preds, vec![a.id.clone(), b.id.clone()]);

    let succs: Vec<_> = env
        .store
        .successors_of(&d.id)
        .unwrap()
        .into_iter()
        .map(|e| e.successor_id)
        .collect();
    assert_eq!(succs, vec![c.id.clone()]);

    assert!(env.store.predecessors_of(&a.id).unwrap().is_empty());
    assert!(env.store.successors_of(&c.id).unwrap().is_empty());
}

#[test]
fn test_list_edges_in_creation_order_with_titles() {
    let mut env = TestEnv::new();
    let a = env.create_task("Alpha");
    let b = env.create_task("Beta");
    let c = env.create_task("Gamma");

    let first = env.add_dep(&b, &c);
    let second = env.add_dep(&a, &b);

    let edges = env.store.list_edges(&env.project.id).unwrap();
    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].edge.id, first.edge.id);
    assert_eq!(edges[0].predecessor.title, "Beta");
    assert_eq!(edges[0].successor.title, "Gamma");
    assert_eq!(edges[1].edge.id, second.edge.id);
}

// =============================================================================
// Randomized Add/Remove Sequences
// =============================================================================

#[test]
fn test_random_mutations_stay_acyclic() {
    let mut env = TestEnv::new();
    let tasks: Vec<_> = (0..10).map(|i| env.create_task(&format!("T{}", i))).collect();
    let mut rng = StdRng::seed_from_u64(7);

    let mut live = Vec::new();
    for _ in 0..120 {
        if !live.is_empty() && rng.random_bool(0.2) {
            let idx = rng.random_range(0..live.len());
            let edge_id: String = live.swap_remove(idx);
            env.store.remove_edge(&edge_id).unwrap();
            continue;
        }

        let from = rng.random_range(0..tasks.len());
        let to = rng.random_range(0..tasks.len());
        match env
            .store
            .add_edge(&tasks[from].id, &tasks[to].id, DependencyType::Fs, 0)
        {
            Ok(linked) => live.push(linked.edge.id),
            Err(err) => {
                let kind = cadence::error_kind(&err);
                assert!(
                    matches!(kind, ErrorKind::Cycle | ErrorKind::Duplicate | ErrorKind::Validation),
                    "unexpected rejection: {}",
                    err
                );
            }
        }
        env.assert_acyclic();
    }

    assert_eq!(env.edge_count(), live.len());
}

// =============================================================================
// Concurrent Writers
// =============================================================================

#[test]
fn test_opposing_edges_from_two_handles() {
    let mut env = TestEnv::new();
    let a = env.create_task("A");
    let b = env.create_task("B");

    for _ in 0..5 {
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = [(a.id.clone(), b.id.clone()), (b.id.clone(), a.id.clone())]
            .into_iter()
            .map(|(from, to)| {
                let mut store = Store::open(env.temp_dir.path()).unwrap();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .add_edge(&from, &to, DependencyType::Fs, 0)
                        .map(|linked| linked.edge.id)
                        .map_err(|e| error_kind(&e))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let added: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(added.len(), 1, "exactly one direction wins: {:?}", results);
        assert!(results.contains(&Err(ErrorKind::Cycle)), "{:?}", results);

        assert_eq!(env.edge_count(), 1);
        env.assert_acyclic();

        env.store.remove_edge(added[0]).unwrap();
    }
}
