//! Client for connecting to the cadence daemon.

use crate::batch::{BatchResult, DateEdit};
use crate::daemon::{DaemonConfig, is_daemon_running, start_daemon};
use crate::protocol::{Request, Response};
use crate::schedule::Schedule;
use crate::store::DateChange;
use crate::types::{DependencyType, LinkedDependency, Project, Task, TaskSummary};
use chrono::{DateTime, Utc};
use eyre::{Context, Result, bail};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client for communicating with the cadence daemon.
pub struct Client {
    root: PathBuf,
    stream: UnixStream,
}

impl Client {
    /// Connect to the daemon, optionally auto-starting it if not running.
    pub fn connect(root: &Path, auto_start: bool) -> Result<Self> {
        let config = DaemonConfig::new(root);
        let socket_path = config.socket_path();

        let stream = match UnixStream::connect(&socket_path) {
            Ok(stream) => stream,
            Err(_) if auto_start => {
                if !is_daemon_running(root) {
                    start_daemon(root).context("Failed to auto-start daemon")?;

                    let mut attempts = 0;
                    loop {
                        if attempts > 20 {
                            bail!("Daemon failed to start in time");
                        }
                        std::thread::sleep(Duration::from_millis(50));
                        if let Ok(stream) = UnixStream::connect(&socket_path) {
                            break stream;
                        }
                        attempts += 1;
                    }
                } else {
                    UnixStream::connect(&socket_path).context("Failed to connect to daemon")?
                }
            }
            Err(e) => {
                bail!("Failed to connect to daemon: {}. Is it running?", e);
            }
        };

        stream
            .set_read_timeout(Some(Duration::from_secs(30)))
            .context("Failed to set read timeout")?;

        Ok(Self {
            root: root.to_path_buf(),
            stream,
        })
    }

    /// Get the store root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Send a request and receive a response.
    fn request(&mut self, request: Request) -> Result<Response> {
        let request_json = serde_json::to_string(&request)?;
        writeln!(self.stream, "{}", request_json)?;
        self.stream.flush()?;

        let mut reader = BufReader::new(&self.stream);
        let mut response_line = String::new();
        reader.read_line(&mut response_line)?;

        let response: Response = serde_json::from_str(&response_line)?;
        Ok(response)
    }

    /// Create a new project.
    pub fn create_project(&mut self, name: &str) -> Result<Project> {
        let response = self.request(Request::CreateProject { name: name.to_string() })?;

        match response {
            Response::Project { project } => Ok(project),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }

    /// Create a new task.
    pub fn create_task(
        &mut self,
        project_id: &str,
        title: &str,
        start: Option<DateTime<Utc>>,
        due: Option<DateTime<Utc>>,
        estimated_effort_hours: Option<f64>,
    ) -> Result<Task> {
        let response = self.request(Request::CreateTask {
            project_id: project_id.to_string(),
            title: title.to_string(),
            start,
            due,
            estimated_effort_hours,
        })?;

        match response {
            Response::Task { task } => Ok(task),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }

    /// Get a task by ID.
    pub fn get_task(&mut self, id: &str) -> Result<Option<Task>> {
        let response = self.request(Request::GetTask { id: id.to_string() })?;

        match response {
            Response::Task { task } => Ok(Some(task)),
            Response::NotFound { .. } => Ok(None),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }

    /// List a project's tasks.
    pub fn list_tasks(&mut self, project_id: &str) -> Result<Vec<Task>> {
        let response = self.request(Request::ListTasks {
            project_id: project_id.to_string(),
        })?;

        match response {
            Response::Tasks { tasks } => Ok(tasks),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }

    /// Update one task's dates and progress.
    pub fn update_task_dates(&mut self, task_id: &str, change: DateChange) -> Result<TaskSummary> {
        let response = self.request(Request::UpdateTaskDates {
            task_id: task_id.to_string(),
            change,
        })?;

        match response {
            Response::TaskSummary { summary } => Ok(summary),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }

    /// Apply a batch of date/progress edits.
    pub fn apply_batch(&mut self, edits: Vec<DateEdit>) -> Result<BatchResult> {
        let response = self.request(Request::BatchUpdateTaskDates { edits })?;

        match response {
            Response::Batch { result } => Ok(result),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }

    /// Add a dependency edge.
    pub fn add_dependency(
        &mut self,
        predecessor_id: &str,
        successor_id: &str,
        kind: DependencyType,
        lag_days: i64,
    ) -> Result<LinkedDependency> {
        let response = self.request(Request::AddDependency {
            predecessor_id: predecessor_id.to_string(),
            successor_id: successor_id.to_string(),
            kind,
            lag_days,
        })?;

        match response {
            Response::Dependency { dependency } => Ok(dependency),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }

    /// Change a dependency's type or lag.
    pub fn update_dependency(
        &mut self,
        id: &str,
        kind: Option<DependencyType>,
        lag_days: Option<i64>,
    ) -> Result<LinkedDependency> {
        let response = self.request(Request::UpdateDependency {
            id: id.to_string(),
            kind,
            lag_days,
        })?;

        match response {
            Response::Dependency { dependency } => Ok(dependency),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }

    /// Remove a dependency edge.
    pub fn remove_dependency(&mut self, id: &str) -> Result<()> {
        let response = self.request(Request::RemoveDependency { id: id.to_string() })?;

        match response {
            Response::Ok => Ok(()),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }

    /// List a project's dependency edges.
    pub fn list_dependencies(&mut self, project_id: &str) -> Result<Vec<LinkedDependency>> {
        let response = self.request(Request::ListDependencies {
            project_id: project_id.to_string(),
        })?;

        match response {
            Response::Dependencies { dependencies } => Ok(dependencies),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }

    /// Compute the critical path schedule for a project.
    pub fn critical_path(&mut self, project_id: &str) -> Result<Schedule> {
        let response = self.request(Request::CriticalPath {
            project_id: project_id.to_string(),
        })?;

        match response {
            Response::Schedule { schedule } => Ok(schedule),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }

    /// Shutdown the daemon.
    pub fn shutdown(&mut self) -> Result<()> {
        let response = self.request(Request::Shutdown)?;

        match response {
            Response::Ok => Ok(()),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }

    /// Ping the daemon.
    pub fn ping(&mut self) -> Result<()> {
        let response = self.request(Request::Ping)?;

        match response {
            Response::Pong => Ok(()),
            Response::Error { kind, message } => bail!("{} ({})", message, kind),
            _ => bail!("Unexpected response"),
        }
    }
}
