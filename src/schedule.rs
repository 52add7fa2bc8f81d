//! Critical path calculation using forward and backward passes.
//!
//! Times are whole days relative to project start (day 0). The calculation
//! is recomputed from a snapshot on every call and holds no state between
//! calls.

use crate::config::ScheduleConfig;
use crate::duration::{DEFAULT_HOURS_PER_DAY, MAX_DURATION_DAYS, duration_days_with};
use crate::graph::{CycleDetected, DependencyGraph};
use crate::types::{DependencyEdge, Task};
use serde::{Deserialize, Serialize};

/// Options for the critical path calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleOptions {
    /// Working hours per day for effort-based durations
    pub hours_per_day: f64,

    /// Add edge lag to the finish-to-start bound. Off by default: links are
    /// scheduled as plain finish-to-start regardless of type or lag.
    pub apply_lag: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            apply_lag: false,
        }
    }
}

impl From<&ScheduleConfig> for ScheduleOptions {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            hours_per_day: config.hours_per_day,
            apply_lag: config.apply_lag,
        }
    }
}

/// Timing for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleNode {
    pub task_id: String,
    pub title: String,
    pub duration: i64,
    pub earliest_start: i64,
    pub earliest_finish: i64,
    pub latest_start: i64,
    pub latest_finish: i64,
    pub slack: i64,
    pub is_critical: bool,
}

/// A project's computed schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub project_id: String,

    /// Minimum number of days to finish every task
    pub project_duration: i64,

    /// Zero-slack tasks, in topological order
    pub critical_path: Vec<ScheduleNode>,

    /// Every task, in topological order
    pub all_tasks: Vec<ScheduleNode>,
}

impl Schedule {
    /// Look up a task's timing.
    pub fn node(&self, task_id: &str) -> Option<&ScheduleNode> {
        self.all_tasks.iter().find(|n| n.task_id == task_id)
    }

    /// Critical task ids in order.
    pub fn critical_ids(&self) -> Vec<&str> {
        self.critical_path.iter().map(|n| n.task_id.as_str()).collect()
    }
}

/// Computes CPM schedules.
#[derive(Debug, Clone, Default)]
pub struct ScheduleCalculator {
    options: ScheduleOptions,
}

impl ScheduleCalculator {
    pub fn new(options: ScheduleOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ScheduleOptions {
        &self.options
    }

    /// Compute the schedule for one project's tasks and edges.
    ///
    /// Fails without returning any timings if the edges contain a cycle.
    pub fn compute(&self, tasks: &[Task], edges: &[DependencyEdge]) -> Result<Schedule, CycleDetected> {
        let project_id = tasks.first().map(|t| t.project_id.clone()).unwrap_or_default();
        let graph = DependencyGraph::from_snapshot(tasks, edges);
        let order = graph.topological_order()?;

        let n = graph.len();

        // Graph index -> task; the first occurrence of a repeated id wins.
        let mut slots: Vec<Option<&Task>> = vec![None; n];
        for task in tasks {
            if let Some(idx) = graph.index_of(&task.id)
                && slots[idx].is_none()
            {
                slots[idx] = Some(task);
            }
        }
        let nodes: Vec<&Task> = slots.into_iter().flatten().collect();

        let durations: Vec<i64> = nodes
            .iter()
            .map(|t| duration_days_with(t, self.options.hours_per_day))
            .collect();

        // Forward pass
        let mut earliest_start = vec![0i64; n];
        let mut earliest_finish = vec![0i64; n];
        for &idx in &order {
            let es = graph
                .predecessors(idx)
                .iter()
                .map(|&(pred, lag)| earliest_finish[pred].saturating_add(self.lag(lag)))
                .max()
                .unwrap_or(0)
                .max(0);
            earliest_start[idx] = es;
            earliest_finish[idx] = es.saturating_add(durations[idx]);
        }

        let project_duration = earliest_finish.iter().copied().max().unwrap_or(0);

        // Backward pass; latest finish never exceeds the project end
        let mut latest_start = vec![0i64; n];
        let mut latest_finish = vec![0i64; n];
        for &idx in order.iter().rev() {
            let lf = graph
                .successors(idx)
                .iter()
                .map(|&(succ, lag)| latest_start[succ].saturating_sub(self.lag(lag)))
                .min()
                .unwrap_or(project_duration)
                .min(project_duration);
            latest_finish[idx] = lf;
            latest_start[idx] = lf.saturating_sub(durations[idx]);
        }

        let all_tasks: Vec<ScheduleNode> = order
            .iter()
            .map(|&idx| {
                let slack = latest_start[idx].saturating_sub(earliest_start[idx]);
                debug_assert!(slack >= 0, "negative slack for {}", graph.id(idx));
                ScheduleNode {
                    task_id: nodes[idx].id.clone(),
                    title: nodes[idx].title.clone(),
                    duration: durations[idx],
                    earliest_start: earliest_start[idx],
                    earliest_finish: earliest_finish[idx],
                    latest_start: latest_start[idx],
                    latest_finish: latest_finish[idx],
                    slack,
                    is_critical: slack == 0,
                }
            })
            .collect();

        let critical_path: Vec<ScheduleNode> = all_tasks.iter().filter(|n| n.is_critical).cloned().collect();

        log::debug!(
            "Schedule for {}: {} task(s), {} edge(s), duration {} day(s), {} critical",
            project_id,
            n,
            edges.len(),
            project_duration,
            critical_path.len()
        );

        Ok(Schedule {
            project_id,
            project_duration,
            critical_path,
            all_tasks,
        })
    }

    /// Effective lag; bounded like a duration so the passes stay in range.
    fn lag(&self, lag_days: i64) -> i64 {
        if self.options.apply_lag {
            lag_days.clamp(-MAX_DURATION_DAYS, MAX_DURATION_DAYS)
        } else {
            0
        }
    }
}

/// Compute a schedule with default options.
pub fn compute_schedule(tasks: &[Task], edges: &[DependencyEdge]) -> Result<Schedule, CycleDetected> {
    ScheduleCalculator::default().compute(tasks, edges)
}
