//! Background daemon for concurrent access to the cadence store.
//!
//! The daemon owns the only open `Store` and handles requests one at a time,
//! so every mutation observes the state left by the previous one.

use crate::batch::StoreBatchExt;
use crate::protocol::{Request, Response};
use crate::storage::CADENCE_DIR;
use crate::store::Store;
use eyre::{Context, Result};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Socket file name within the .cadence directory.
const SOCKET_FILE: &str = "daemon.sock";

/// PID file name within the .cadence directory.
const PID_FILE: &str = "daemon.pid";

/// Default housekeeping interval in milliseconds.
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Configuration for the daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Root directory containing .cadence
    pub root: PathBuf,

    /// How often the event loop wakes up to check for shutdown
    pub poll_interval: Duration,
}

impl DaemonConfig {
    /// Create config with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Set the wake-up interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> PathBuf {
        self.root.join(CADENCE_DIR).join(SOCKET_FILE)
    }

    /// Get the PID file path.
    pub fn pid_path(&self) -> PathBuf {
        self.root.join(CADENCE_DIR).join(PID_FILE)
    }
}

/// The cadence daemon.
pub struct Daemon {
    config: DaemonConfig,
    store: Store,
    shutdown: Arc<AtomicBool>,
}

impl Daemon {
    /// Create a new daemon instance.
    pub fn new(config: DaemonConfig) -> Result<Self> {
        let store = Store::open(&config.root).context("Failed to open store")?;
        let config = config.with_poll_interval(Duration::from_millis(store.config().daemon.poll_interval_ms));

        Ok(Self {
            config,
            store,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get a shutdown handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run the daemon (blocking).
    pub async fn run(&mut self) -> Result<()> {
        // Clean up any stale socket
        let socket_path = self.config.socket_path();
        if socket_path.exists() {
            fs::remove_file(&socket_path).ok();
        }

        let pid_path = self.config.pid_path();
        fs::write(&pid_path, std::process::id().to_string()).context("Failed to write PID file")?;

        let listener = UnixListener::bind(&socket_path).context("Failed to bind to Unix socket")?;
        listener
            .set_nonblocking(true)
            .context("Failed to set socket to non-blocking")?;

        log::info!("Daemon listening on {:?}", socket_path);

        let (tx, mut rx) = mpsc::channel::<(Request, mpsc::Sender<Response>)>(100);

        let shutdown_flag = Arc::clone(&self.shutdown);
        let tx_clone = tx.clone();
        tokio::spawn(async move {
            Self::accept_connections(listener, tx_clone, shutdown_flag).await;
        });

        let mut tick = interval(self.config.poll_interval);

        loop {
            tokio::select! {
                Some((request, response_tx)) = rx.recv() => {
                    let response = self.handle_request(request);
                    let _ = response_tx.send(response).await;
                }

                _ = tick.tick() => {}
            }

            if self.shutdown.load(Ordering::Relaxed) {
                log::info!("Daemon shutting down");
                break;
            }
        }

        fs::remove_file(&socket_path).ok();
        fs::remove_file(&pid_path).ok();

        Ok(())
    }

    /// Accept connections in a background task.
    async fn accept_connections(
        listener: UnixListener,
        tx: mpsc::Sender<(Request, mpsc::Sender<Response>)>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    let tx_clone = tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_connection(stream, tx_clone).await {
                            log::warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                Err(e) => {
                    log::error!("Accept error: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Handle a single client connection.
    async fn handle_connection(stream: UnixStream, tx: mpsc::Sender<(Request, mpsc::Sender<Response>)>) -> Result<()> {
        stream.set_nonblocking(false)?;

        let reader = BufReader::new(stream.try_clone()?);
        let mut writer = stream;

        for line in reader.lines() {
            let line = line.context("Failed to read line")?;
            if line.is_empty() {
                continue;
            }

            let request: Request = serde_json::from_str(&line).context("Failed to parse request")?;
            let is_shutdown = matches!(request, Request::Shutdown);

            let (resp_tx, mut resp_rx) = mpsc::channel(1);
            tx.send((request, resp_tx))
                .await
                .context("Failed to send request to daemon")?;

            if let Some(response) = resp_rx.recv().await {
                let response_json = serde_json::to_string(&response)?;
                writeln!(writer, "{}", response_json)?;
                writer.flush()?;
            }

            if is_shutdown {
                break;
            }
        }

        Ok(())
    }

    /// Handle a single request.
    fn handle_request(&mut self, request: Request) -> Response {
        log::debug!("Handling request: {:?}", request);

        match request {
            Request::CreateProject { name } => match self.store.create_project(&name) {
                Ok(project) => Response::Project { project },
                Err(e) => Response::from_report(&e),
            },

            Request::CreateTask {
                project_id,
                title,
                start,
                due,
                estimated_effort_hours,
            } => match self
                .store
                .create_task(&project_id, &title, start, due, estimated_effort_hours)
            {
                Ok(task) => Response::Task { task },
                Err(e) => Response::from_report(&e),
            },

            Request::GetTask { id } => match self.store.get_task(&id) {
                Ok(Some(task)) => Response::Task { task },
                Ok(None) => Response::NotFound { id },
                Err(e) => Response::from_report(&e),
            },

            Request::ListTasks { project_id } => match self.store.list_tasks(&project_id) {
                Ok(tasks) => Response::Tasks { tasks },
                Err(e) => Response::from_report(&e),
            },

            Request::UpdateTaskDates { task_id, change } => match self.store.update_task_dates(&task_id, &change) {
                Ok(summary) => Response::TaskSummary { summary },
                Err(e) => Response::from_report(&e),
            },

            Request::BatchUpdateTaskDates { edits } => Response::Batch {
                result: self.store.apply_batch(edits),
            },

            Request::AddDependency {
                predecessor_id,
                successor_id,
                kind,
                lag_days,
            } => match self.store.add_edge(&predecessor_id, &successor_id, kind, lag_days) {
                Ok(dependency) => Response::Dependency { dependency },
                Err(e) => Response::from_report(&e),
            },

            Request::UpdateDependency { id, kind, lag_days } => match self.store.update_edge(&id, kind, lag_days) {
                Ok(dependency) => Response::Dependency { dependency },
                Err(e) => Response::from_report(&e),
            },

            Request::RemoveDependency { id } => match self.store.remove_edge(&id) {
                Ok(()) => Response::Ok,
                Err(e) => Response::from_report(&e),
            },

            Request::ListDependencies { project_id } => match self.store.list_edges(&project_id) {
                Ok(dependencies) => Response::Dependencies { dependencies },
                Err(e) => Response::from_report(&e),
            },

            Request::CriticalPath { project_id } => match self.store.critical_path(&project_id) {
                Ok(schedule) => Response::Schedule { schedule },
                Err(e) => Response::from_report(&e),
            },

            Request::Shutdown => {
                self.shutdown.store(true, Ordering::Relaxed);
                Response::Ok
            }

            Request::Ping => Response::Pong,
        }
    }
}

/// Check if a daemon is running for the given store path.
pub fn is_daemon_running(root: &Path) -> bool {
    let config = DaemonConfig::new(root);
    let socket_path = config.socket_path();
    let pid_path = config.pid_path();

    if !socket_path.exists() {
        return false;
    }

    if let Ok(pid_str) = fs::read_to_string(&pid_path)
        && let Ok(pid) = pid_str.trim().parse::<i32>()
    {
        // Signal 0 only checks that the process exists
        unsafe {
            if libc::kill(pid, 0) == 0 {
                return true;
            }
        }
    }

    // Stale socket, clean up
    fs::remove_file(&socket_path).ok();
    fs::remove_file(&pid_path).ok();
    false
}

/// Start the daemon as a background process.
pub fn start_daemon(root: &Path) -> Result<()> {
    use std::process::Command;

    let exe = std::env::current_exe().context("Failed to get current executable")?;

    Command::new(exe)
        .args(["--dir", root.to_str().unwrap_or("."), "daemon"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("Failed to spawn daemon process")?;

    std::thread::sleep(Duration::from_millis(100));

    Ok(())
}
