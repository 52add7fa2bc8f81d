//! CLI argument parsing for Cadence.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cad",
    about = "Task dependency graphs with critical path scheduling",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/cadence/logs/cadence.log"
)]
pub struct Cli {
    /// Path to the cadence store directory (default: current directory)
    #[arg(short = 'd', long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new cadence store in the current directory
    Init,

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Apply date/progress edits from a JSON array file
    Batch {
        /// File containing [{"task_id": ..., "start": ..., "due": ..., "progress": ...}]
        file: PathBuf,
    },

    /// Manage dependency edges
    #[command(subcommand)]
    Dep(DepCommand),

    /// Compute the critical path of a project
    CriticalPath {
        /// Project ID
        project_id: String,

        /// Print the schedule as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the daemon in foreground
    Daemon,

    /// Stop the running daemon
    DaemonStop,

    /// Check daemon status
    DaemonStatus,
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Create a project
    Create {
        /// Project name
        name: String,
    },

    /// List projects
    List,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Create a task
    Create {
        /// Project ID
        project_id: String,

        /// Task title
        title: String,

        /// Planned start (RFC 3339 or YYYY-MM-DD)
        #[arg(short, long)]
        start: Option<String>,

        /// Planned finish (RFC 3339 or YYYY-MM-DD)
        #[arg(short = 'u', long)]
        due: Option<String>,

        /// Estimated effort in hours
        #[arg(short, long)]
        effort: Option<f64>,
    },

    /// List a project's tasks
    List {
        /// Project ID
        project_id: String,
    },

    /// Show a task
    Get {
        /// Task ID
        id: String,
    },

    /// Set a task's status (todo, in_progress, done, blocked)
    Status {
        /// Task ID
        id: String,

        /// New status
        status: String,
    },

    /// Change a task's dates or progress
    Dates {
        /// Task ID
        id: String,

        /// Planned start (RFC 3339 or YYYY-MM-DD)
        #[arg(short, long)]
        start: Option<String>,

        /// Planned finish (RFC 3339 or YYYY-MM-DD)
        #[arg(short = 'u', long)]
        due: Option<String>,

        /// Percent complete (0-100)
        #[arg(short, long)]
        progress: Option<u8>,
    },
}

#[derive(Subcommand)]
pub enum DepCommand {
    /// Add a dependency: successor waits for predecessor
    Add {
        /// Task that must come first
        predecessor_id: String,

        /// Task that depends on it
        successor_id: String,

        /// Dependency type (fs, ss, ff, sf)
        #[arg(short = 't', long = "type", default_value = "fs")]
        kind: String,

        /// Lag in days
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        lag: i64,
    },

    /// Change a dependency's type or lag
    Update {
        /// Dependency ID
        id: String,

        /// Dependency type (fs, ss, ff, sf)
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        /// Lag in days
        #[arg(short, long, allow_hyphen_values = true)]
        lag: Option<i64>,
    },

    /// Remove a dependency
    Rm {
        /// Dependency ID
        id: String,
    },

    /// List a project's dependencies
    List {
        /// Project ID
        project_id: String,
    },

    /// Show edges into a task
    Preds {
        /// Task ID
        task_id: String,
    },

    /// Show edges out of a task
    Succs {
        /// Task ID
        task_id: String,
    },
}
