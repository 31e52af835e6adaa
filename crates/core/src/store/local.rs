use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{named_params, Connection, OptionalExtension, TransactionBehavior};
use ulid::Ulid;

use super::{StoreResult, TaskStore};
use crate::model::{NewTask, Task, TaskPatch};

/// Key the task blob lives under.
pub const STORAGE_KEY: &str = "punchlist-data";

/// Device-local store: one JSON array of tasks under [`STORAGE_KEY`] in a
/// SQLite key-value table. Every mutation reads and rewrites the whole blob.
///
/// All calls share one connection and run one at a time, so concurrent
/// updates from a flushed batch never race on the blob.
#[derive(Debug, Clone)]
pub struct LocalStore {
    db_path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let conn = open_connection(db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
        apply_migrations(&conn).context("Failed to prepare key-value table")?;
        Ok(Self {
            db_path: db_path.to_path_buf(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn with_connection<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            f(&mut conn)
        })
        .await?
    }

    /// Read-modify-write of the blob inside one transaction. `mutate` returns
    /// the value to hand back and whether the blob needs rewriting.
    async fn mutate<T, F>(&self, mutate: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Vec<Task>) -> (T, bool) + Send + 'static,
    {
        self.with_connection(move |conn| {
            // Immediate: take the write lock before reading so another
            // process cannot slip a write in between.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut tasks = read_blob(&tx)?;
            let (result, dirty) = mutate(&mut tasks);
            if dirty {
                write_blob(&tx, &tasks)?;
            }
            tx.commit()?;
            Ok(result)
        })
        .await
    }
}

#[async_trait]
impl TaskStore for LocalStore {
    async fn list_all(&self) -> StoreResult<Vec<Task>> {
        self.with_connection(|conn| read_blob(conn)).await
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Task>> {
        let id = id.to_string();
        self.with_connection(move |conn| {
            Ok(read_blob(conn)?.into_iter().find(|task| task.id == id))
        })
        .await
    }

    async fn create(&self, task: NewTask) -> StoreResult<Task> {
        let created = task.into_task(Ulid::new().to_string(), Utc::now());
        tracing::debug!(id = created.id.as_str(), "local store create");
        let stored = created.clone();
        self.mutate(move |tasks| {
            tasks.push(stored);
            ((), true)
        })
        .await?;
        Ok(created)
    }

    async fn update(&self, id: &str, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let id = id.to_string();
        self.mutate(move |tasks| match tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.apply(&patch);
                task.updated_at = Utc::now();
                (Some(task.clone()), true)
            }
            None => (None, false),
        })
        .await
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let id = id.to_string();
        self.mutate(move |tasks| {
            let before = tasks.len();
            tasks.retain(|task| task.id != id);
            let deleted = tasks.len() != before;
            (deleted, deleted)
        })
        .await
    }

    async fn delete_all(&self) -> StoreResult<bool> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM kv WHERE key = :key",
                named_params![":key": STORAGE_KEY],
            )?;
            Ok(true)
        })
        .await
    }
}

fn open_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

fn apply_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL);")
}

fn read_blob(conn: &Connection) -> StoreResult<Vec<Task>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM kv WHERE key = :key",
            named_params![":key": STORAGE_KEY],
            |row| row.get(0),
        )
        .optional()?;

    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    match serde_json::from_str(&raw) {
        Ok(tasks) => Ok(tasks),
        Err(err) => {
            tracing::warn!(error = %err, "stored task blob is unreadable; starting empty");
            Ok(Vec::new())
        }
    }
}

fn write_blob(conn: &Connection, tasks: &[Task]) -> StoreResult<()> {
    let raw = serde_json::to_string(tasks)?;
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (:key, :value)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        named_params![":key": STORAGE_KEY, ":value": raw],
    )?;
    Ok(())
}
