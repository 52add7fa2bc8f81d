//! Storage layer for Cadence: a single SQLite database.
//!
//! All reads and writes go through [`Storage`]. Callers group a
//! read-check-write sequence with [`Storage::atomically`], which holds an
//! IMMEDIATE transaction so concurrent writers are serialized.

use crate::types::{DependencyEdge, Project, Task};
use chrono::{DateTime, SecondsFormat, Utc};
use eyre::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Storage directory name.
pub const CADENCE_DIR: &str = ".cadence";

/// SQLite database file.
pub const DB_FILE: &str = "cadence.db";

/// Bump when the schema changes.
const SCHEMA_VERSION: i64 = 1;

const TASK_COLUMNS: &str =
    "id, project_id, title, status, start, due, estimated_effort_hours, progress, created_at, updated_at";

const DEPENDENCY_COLUMNS: &str =
    "id, project_id, predecessor_id, successor_id, kind, lag_days, created_at, updated_at";

/// Storage handle for reading/writing cadence data.
pub struct Storage {
    root: PathBuf,
    db: Connection,
}

impl Storage {
    /// Initialize storage in the given directory.
    pub fn init(root: &Path, busy_timeout: Duration) -> Result<Self> {
        let cadence_dir = root.join(CADENCE_DIR);
        fs::create_dir_all(&cadence_dir).context("Failed to create .cadence directory")?;

        let storage = Self::connect(root, busy_timeout)?;
        log::info!("Initialized storage at {}", cadence_dir.display());
        Ok(storage)
    }

    /// Open existing storage.
    pub fn open(root: &Path, busy_timeout: Duration) -> Result<Self> {
        let cadence_dir = root.join(CADENCE_DIR);
        if !cadence_dir.exists() {
            eyre::bail!("No .cadence directory found. Run 'cad init' first.");
        }
        Self::connect(root, busy_timeout)
    }

    fn connect(root: &Path, busy_timeout: Duration) -> Result<Self> {
        let db_path = root.join(CADENCE_DIR).join(DB_FILE);
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;
        db.busy_timeout(busy_timeout)
            .context("Failed to set SQLite busy timeout")?;
        db.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;

        let storage = Self {
            root: root.to_path_buf(),
            db,
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Root directory containing .cadence.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Initialize SQLite schema.
    fn init_schema(&self) -> Result<()> {
        self.db
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS projects (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id TEXT PRIMARY KEY,
                    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    status TEXT NOT NULL CHECK (status IN ('todo', 'in_progress', 'done', 'blocked')),
                    start TEXT,
                    due TEXT,
                    estimated_effort_hours REAL,
                    progress INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);

                CREATE TABLE IF NOT EXISTS dependencies (
                    id TEXT PRIMARY KEY,
                    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    predecessor_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                    successor_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                    kind TEXT NOT NULL CHECK (kind IN ('fs', 'ss', 'ff', 'sf')),
                    lag_days INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE (predecessor_id, successor_id),
                    CHECK (predecessor_id <> successor_id)
                );
                CREATE INDEX IF NOT EXISTS idx_dependencies_project ON dependencies(project_id);
                CREATE INDEX IF NOT EXISTS idx_dependencies_successor ON dependencies(successor_id);

                CREATE TABLE IF NOT EXISTS meta (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
            "#,
            )
            .context("Failed to initialize schema")?;

        self.db
            .execute(
                "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?)",
                params![SCHEMA_VERSION.to_string()],
            )
            .context("Failed to record schema version")?;

        Ok(())
    }

    /// Run `f` inside an IMMEDIATE transaction; commit on Ok, roll back on Err.
    ///
    /// Must not be nested.
    pub fn atomically<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = Transaction::new_unchecked(&self.db, TransactionBehavior::Immediate)
            .context("Failed to begin write transaction")?;
        let value = f(self)?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(value)
    }

    /// Run `f` inside a read transaction so every query sees one snapshot.
    pub fn snapshot<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = Transaction::new_unchecked(&self.db, TransactionBehavior::Deferred)
            .context("Failed to begin read transaction")?;
        let value = f(self)?;
        tx.finish().context("Failed to end read transaction")?;
        Ok(value)
    }

    // -------------------------------------------------------------------------
    // Projects
    // -------------------------------------------------------------------------

    pub fn insert_project(&self, project: &Project) -> Result<()> {
        self.db.execute(
            "INSERT INTO projects (id, name, created_at) VALUES (?, ?, ?)",
            params![project.id, project.name, format_timestamp(&project.created_at)],
        )?;
        Ok(())
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let project = self
            .db
            .query_row(
                "SELECT id, name, created_at FROM projects WHERE id = ?",
                params![id],
                Self::row_to_project,
            )
            .optional()?;
        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .db
            .prepare("SELECT id, name, created_at FROM projects ORDER BY rowid")?;
        let projects = stmt
            .query_map([], Self::row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    // -------------------------------------------------------------------------
    // Tasks
    // -------------------------------------------------------------------------

    pub fn insert_task(&self, task: &Task) -> Result<()> {
        self.db.execute(
            &format!("INSERT INTO tasks ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)", TASK_COLUMNS),
            params![
                task.id,
                task.project_id,
                task.title,
                task.status.as_str(),
                task.start.as_ref().map(format_timestamp),
                task.due.as_ref().map(format_timestamp),
                task.estimated_effort_hours,
                task.progress,
                format_timestamp(&task.created_at),
                format_timestamp(&task.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Overwrite a task's mutable fields.
    pub fn update_task(&self, task: &Task) -> Result<()> {
        self.db.execute(
            r#"
            UPDATE tasks
            SET title = ?, status = ?, start = ?, due = ?, estimated_effort_hours = ?, progress = ?, updated_at = ?
            WHERE id = ?
            "#,
            params![
                task.title,
                task.status.as_str(),
                task.start.as_ref().map(format_timestamp),
                task.due.as_ref().map(format_timestamp),
                task.estimated_effort_hours,
                task.progress,
                format_timestamp(&task.updated_at),
                task.id,
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let task = self
            .db
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS),
                params![id],
                Self::row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    /// All tasks of a project, in creation order.
    pub fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        let mut stmt = self.db.prepare(&format!(
            "SELECT {} FROM tasks WHERE project_id = ? ORDER BY rowid",
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map(params![project_id], Self::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    // -------------------------------------------------------------------------
    // Dependencies
    // -------------------------------------------------------------------------

    pub fn insert_dependency(&self, edge: &DependencyEdge) -> Result<()> {
        self.db.execute(
            &format!("INSERT INTO dependencies ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)", DEPENDENCY_COLUMNS),
            params![
                edge.id,
                edge.project_id,
                edge.predecessor_id,
                edge.successor_id,
                edge.kind.as_str(),
                edge.lag_days,
                format_timestamp(&edge.created_at),
                format_timestamp(&edge.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Overwrite type and lag. Endpoints never change.
    pub fn update_dependency(&self, edge: &DependencyEdge) -> Result<()> {
        self.db.execute(
            "UPDATE dependencies SET kind = ?, lag_days = ?, updated_at = ? WHERE id = ?",
            params![
                edge.kind.as_str(),
                edge.lag_days,
                format_timestamp(&edge.updated_at),
                edge.id
            ],
        )?;
        Ok(())
    }

    /// Delete an edge; returns whether a row was removed.
    pub fn delete_dependency(&self, id: &str) -> Result<bool> {
        let removed = self
            .db
            .execute("DELETE FROM dependencies WHERE id = ?", params![id])?;
        Ok(removed > 0)
    }

    pub fn get_dependency(&self, id: &str) -> Result<Option<DependencyEdge>> {
        let edge = self
            .db
            .query_row(
                &format!("SELECT {} FROM dependencies WHERE id = ?", DEPENDENCY_COLUMNS),
                params![id],
                Self::row_to_dependency,
            )
            .optional()?;
        Ok(edge)
    }

    /// Check if an edge exists for the ordered pair.
    pub fn dependency_exists(&self, predecessor_id: &str, successor_id: &str) -> Result<bool> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM dependencies WHERE predecessor_id = ? AND successor_id = ?",
            params![predecessor_id, successor_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All edges of a project, in creation order.
    pub fn list_dependencies(&self, project_id: &str) -> Result<Vec<DependencyEdge>> {
        self.query_dependencies("project_id", project_id)
    }

    /// Edges pointing into a task.
    pub fn dependencies_into(&self, task_id: &str) -> Result<Vec<DependencyEdge>> {
        self.query_dependencies("successor_id", task_id)
    }

    /// Edges leaving a task.
    pub fn dependencies_from(&self, task_id: &str) -> Result<Vec<DependencyEdge>> {
        self.query_dependencies("predecessor_id", task_id)
    }

    /// Successor ids of a task.
    pub fn successor_ids(&self, task_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .db
            .prepare("SELECT successor_id FROM dependencies WHERE predecessor_id = ? ORDER BY rowid")?;
        let ids = stmt
            .query_map(params![task_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    fn query_dependencies(&self, column: &str, value: &str) -> Result<Vec<DependencyEdge>> {
        let mut stmt = self.db.prepare(&format!(
            "SELECT {} FROM dependencies WHERE {} = ? ORDER BY rowid",
            DEPENDENCY_COLUMNS, column
        ))?;
        let edges = stmt
            .query_map(params![value], Self::row_to_dependency)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    // -------------------------------------------------------------------------
    // Row mapping
    // -------------------------------------------------------------------------

    fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
        let created_at: String = row.get(2)?;
        Ok(Project {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: parse_timestamp(2, &created_at)?,
        })
    }

    fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
        let status_str: String = row.get(3)?;
        let start: Option<String> = row.get(4)?;
        let due: Option<String> = row.get(5)?;
        let created_at: String = row.get(8)?;
        let updated_at: String = row.get(9)?;

        Ok(Task {
            id: row.get(0)?,
            project_id: row.get(1)?,
            title: row.get(2)?,
            status: status_str.parse().map_err(|e: String| conversion_error(3, e.into()))?,
            start: start.as_deref().map(|s| parse_timestamp(4, s)).transpose()?,
            due: due.as_deref().map(|s| parse_timestamp(5, s)).transpose()?,
            estimated_effort_hours: row.get(6)?,
            progress: row.get(7)?,
            created_at: parse_timestamp(8, &created_at)?,
            updated_at: parse_timestamp(9, &updated_at)?,
        })
    }

    fn row_to_dependency(row: &Row) -> rusqlite::Result<DependencyEdge> {
        let kind_str: String = row.get(4)?;
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;

        Ok(DependencyEdge {
            id: row.get(0)?,
            project_id: row.get(1)?,
            predecessor_id: row.get(2)?,
            successor_id: row.get(3)?,
            kind: kind_str.parse().map_err(|e: String| conversion_error(4, e.into()))?,
            lag_days: row.get(5)?,
            created_at: parse_timestamp(6, &created_at)?,
            updated_at: parse_timestamp(7, &updated_at)?,
        })
    }
}

/// Fixed-width RFC 3339 so stored values sort chronologically.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a stored timestamp; a bad value fails the row rather than being guessed.
fn parse_timestamp(column: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, Box::new(e)))
}

fn conversion_error(column: usize, err: Box<dyn std::error::Error + Send + Sync>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, err)
}
