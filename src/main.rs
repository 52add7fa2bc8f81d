//! Cadence CLI - task dependency graphs with critical path scheduling.

use cadence::{
    Client, Daemon, DaemonConfig, DateChange, DateEdit, DependencyEdge, DependencyType, LinkedDependency, Schedule,
    Store, StoreBatchExt, Task, TaskStatus, duration_days_with, is_daemon_running,
};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::{Cli, Command, DepCommand, ProjectCommand, TaskCommand};

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cadence")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("cadence.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn get_store_dir(cli: &Cli) -> PathBuf {
    cli.dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Accept RFC 3339 timestamps or plain dates (midnight UTC).
fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected RFC 3339 or YYYY-MM-DD", value))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| eyre!("Invalid date '{}'", value))
}

fn parse_optional_date(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value.map(parse_date).transpose()
}

fn parse_dependency_type(value: &str) -> Result<DependencyType> {
    value.parse::<DependencyType>().map_err(|e| eyre!(e))
}

fn format_status(status: &TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Todo => "todo".green(),
        TaskStatus::InProgress => "in_progress".yellow(),
        TaskStatus::Blocked => "blocked".red(),
        TaskStatus::Done => "done".blue(),
    }
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_task_line(task: &Task) {
    let effort = task
        .estimated_effort_hours
        .map(|h| format!(" {}h", h))
        .unwrap_or_default();
    println!(
        "{} {} {} {} -> {} {}%{}",
        format_status(&task.status),
        task.id.cyan(),
        task.title,
        format_date(task.start).dimmed(),
        format_date(task.due).dimmed(),
        task.progress,
        effort.dimmed()
    );
}

fn print_dependency(dep: &LinkedDependency) {
    let lag = if dep.edge.lag_days == 0 {
        String::new()
    } else {
        format!(" lag {:+}d", dep.edge.lag_days)
    };
    println!(
        "{} {} ({}) {} {} ({}) [{}{}]",
        dep.edge.id.cyan(),
        dep.predecessor.id,
        dep.predecessor.title,
        "→".blue(),
        dep.successor.id,
        dep.successor.title,
        dep.edge.kind,
        lag.dimmed()
    );
}

fn print_edges(edges: &[DependencyEdge], empty: &str) {
    if edges.is_empty() {
        println!("{}", empty.dimmed());
        return;
    }
    for edge in edges {
        println!(
            "{} {} {} {} [{} lag {}]",
            edge.id.cyan(),
            edge.predecessor_id,
            "→".blue(),
            edge.successor_id,
            edge.kind,
            edge.lag_days
        );
    }
}

fn print_schedule(schedule: &Schedule) {
    println!(
        "{} Project {} takes {} day(s); {} critical task(s)",
        "→".blue(),
        schedule.project_id.cyan(),
        schedule.project_duration.to_string().bold(),
        schedule.critical_path.len()
    );
    println!(
        "  {:<14} {:>4} {:>4} {:>4} {:>4} {:>4} {:>5}  {}",
        "task", "dur", "ES", "EF", "LS", "LF", "slack", "title"
    );
    for node in &schedule.all_tasks {
        let line = format!(
            "  {:<14} {:>4} {:>4} {:>4} {:>4} {:>4} {:>5}  {}",
            node.task_id,
            node.duration,
            node.earliest_start,
            node.earliest_finish,
            node.latest_start,
            node.latest_finish,
            node.slack,
            node.title
        );
        if node.is_critical {
            println!("{}", line.red().bold());
        } else {
            println!("{}", line);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let store_dir = get_store_dir(&cli);

    match cli.command {
        Command::Init => {
            Store::init(&store_dir).context("Failed to initialize cadence store")?;
            println!("{} Initialized cadence store in {}", "✓".green(), store_dir.display());
        }

        Command::Project(ProjectCommand::Create { name }) => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let project = store.create_project(&name).context("Failed to create project")?;
            println!("{} Created project: {} {}", "✓".green(), project.id.cyan(), project.name);
        }

        Command::Project(ProjectCommand::List) => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let projects = store.list_projects().context("Failed to list projects")?;

            if projects.is_empty() {
                println!("{}", "No projects found".dimmed());
            } else {
                for project in projects {
                    println!("{} {}", project.id.cyan(), project.name);
                }
            }
        }

        Command::Task(TaskCommand::Create {
            project_id,
            title,
            start,
            due,
            effort,
        }) => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let start = parse_optional_date(start.as_deref())?;
            let due = parse_optional_date(due.as_deref())?;

            let task = store
                .create_task(&project_id, &title, start, due, effort)
                .context("Failed to create task")?;

            println!("{} Created: {} {}", "✓".green(), task.id.cyan(), task.title);
        }

        Command::Task(TaskCommand::List { project_id }) => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let tasks = store.list_tasks(&project_id).context("Failed to list tasks")?;

            if tasks.is_empty() {
                println!("{}", "No tasks found".dimmed());
            } else {
                for task in &tasks {
                    print_task_line(task);
                }
            }
        }

        Command::Task(TaskCommand::Get { id }) => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let task = store.get_task(&id).context("Failed to get task")?;

            match task {
                Some(task) => {
                    println!("{}: {}", "ID".bold(), task.id.cyan());
                    println!("{}: {}", "Project".bold(), task.project_id);
                    println!("{}: {}", "Title".bold(), task.title);
                    println!("{}: {}", "Status".bold(), format_status(&task.status));
                    println!("{}: {}", "Start".bold(), format_date(task.start));
                    println!("{}: {}", "Due".bold(), format_date(task.due));
                    if let Some(hours) = task.estimated_effort_hours {
                        println!("{}: {}h", "Effort".bold(), hours);
                    }
                    println!("{}: {}%", "Progress".bold(), task.progress);
                    println!(
                        "{}: {} day(s)",
                        "Duration".bold(),
                        duration_days_with(&task, store.config().schedule.hours_per_day)
                    );
                    println!("{}: {}", "Created".bold(), task.created_at);
                    println!("{}: {}", "Updated".bold(), task.updated_at);
                }
                None => {
                    eprintln!("{} Task not found: {}", "✗".red(), id);
                    std::process::exit(1);
                }
            }
        }

        Command::Task(TaskCommand::Status { id, status }) => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let status = status.parse::<TaskStatus>().map_err(|e| eyre!(e))?;
            let task = store
                .set_task_status(&id, status)
                .context("Failed to set task status")?;

            println!(
                "{} {} {} is now {}",
                "✓".green(),
                task.id.cyan(),
                task.title,
                format_status(&task.status)
            );
        }

        Command::Task(TaskCommand::Dates {
            id,
            start,
            due,
            progress,
        }) => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let change = DateChange {
                start: parse_optional_date(start.as_deref())?,
                due: parse_optional_date(due.as_deref())?,
                progress,
            };

            let summary = store
                .update_task_dates(&id, &change)
                .context("Failed to update task dates")?;

            println!(
                "{} Updated: {} {} {} -> {} {}%",
                "✓".green(),
                summary.id.cyan(),
                summary.title,
                format_date(summary.start),
                format_date(summary.due),
                summary.progress
            );
        }

        Command::Batch { file } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let content =
                fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let edits: Vec<DateEdit> = serde_json::from_str(&content).context("Failed to parse batch file")?;

            let result = store.apply_batch(edits);

            for summary in &result.applied {
                println!("{} {} {}", "✓".green(), summary.id.cyan(), summary.title);
            }
            for error in &result.errors {
                println!(
                    "{} #{} {}: {} ({})",
                    "✗".red(),
                    error.index,
                    error.task_id.cyan(),
                    error.message,
                    error.kind
                );
            }
            println!(
                "{} applied, {} failed",
                result.applied.len().to_string().green(),
                result.errors.len().to_string().red()
            );
        }

        Command::Dep(DepCommand::Add {
            predecessor_id,
            successor_id,
            kind,
            lag,
        }) => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let kind = parse_dependency_type(&kind)?;
            let dep = store
                .add_edge(&predecessor_id, &successor_id, kind, lag)
                .context("Failed to add dependency")?;

            print!("{} ", "✓".green());
            print_dependency(&dep);
        }

        Command::Dep(DepCommand::Update { id, kind, lag }) => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let kind = kind.as_deref().map(parse_dependency_type).transpose()?;
            let dep = store
                .update_edge(&id, kind, lag)
                .context("Failed to update dependency")?;

            print!("{} ", "✓".green());
            print_dependency(&dep);
        }

        Command::Dep(DepCommand::Rm { id }) => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            store.remove_edge(&id).context("Failed to remove dependency")?;
            println!("{} Removed dependency {}", "✓".green(), id.cyan());
        }

        Command::Dep(DepCommand::List { project_id }) => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let deps = store.list_edges(&project_id).context("Failed to list dependencies")?;

            if deps.is_empty() {
                println!("{}", "No dependencies found".dimmed());
            } else {
                for dep in &deps {
                    print_dependency(dep);
                }
            }
        }

        Command::Dep(DepCommand::Preds { task_id }) => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let edges = store.predecessors_of(&task_id).context("Failed to list predecessors")?;
            print_edges(&edges, "No predecessors");
        }

        Command::Dep(DepCommand::Succs { task_id }) => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let edges = store.successors_of(&task_id).context("Failed to list successors")?;
            print_edges(&edges, "No successors");
        }

        Command::CriticalPath { project_id, json } => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let schedule = store
                .critical_path(&project_id)
                .context("Failed to compute critical path")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&schedule)?);
            } else {
                print_schedule(&schedule);
            }
        }

        Command::Daemon => {
            println!("{} Starting daemon for {}", "→".blue(), store_dir.display());

            let config = DaemonConfig::new(&store_dir);
            let mut daemon = Daemon::new(config).context("Failed to create daemon")?;

            let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;
            rt.block_on(async { daemon.run().await }).context("Daemon error")?;
        }

        Command::DaemonStop => {
            if !is_daemon_running(&store_dir) {
                println!("{} Daemon is not running", "✗".red());
                std::process::exit(1);
            }

            let mut client = Client::connect(&store_dir, false).context("Failed to connect to daemon")?;
            client.shutdown().context("Failed to shutdown daemon")?;
            println!("{} Daemon stopped", "✓".green());
        }

        Command::DaemonStatus => {
            if is_daemon_running(&store_dir) {
                println!("{} Daemon is running", "✓".green());

                if let Ok(mut client) = Client::connect(&store_dir, false)
                    && client.ping().is_ok()
                {
                    println!("  {} Responding to requests", "✓".green());
                }
            } else {
                println!("{} Daemon is not running", "✗".red());
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
