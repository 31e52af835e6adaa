//! Task persistence behind one async interface.
//!
//! Two backends implement [`TaskStore`]: [`LocalStore`] keeps every task in a
//! single JSON blob on this device, [`RemoteStore`] talks to a hosted REST
//! table. Which one runs is decided once from [`Backend`] in the app config.

mod local;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Backend;
use crate::model::{NewTask, Task, TaskPatch};

pub use local::{LocalStore, STORAGE_KEY};
pub use remote::RemoteStore;

/// Errors raised by a store backend. Unknown ids are not errors: they surface
/// as `None` or `false` from the operation itself.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote store returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_all(&self) -> StoreResult<Vec<Task>>;

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Task>>;

    /// Persist a new task; the store assigns the id and both timestamps.
    async fn create(&self, task: NewTask) -> StoreResult<Task>;

    /// Apply `patch` and refresh `updated_at`. `None` when `id` is unknown.
    async fn update(&self, id: &str, patch: TaskPatch) -> StoreResult<Option<Task>>;

    /// `false` when `id` is unknown.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    async fn delete_all(&self) -> StoreResult<bool>;
}

/// Build the store selected by configuration.
pub fn open_store(backend: &Backend) -> anyhow::Result<Arc<dyn TaskStore>> {
    match backend {
        Backend::Local { db_path } => {
            tracing::info!(path = %db_path.display(), "using local task store");
            Ok(Arc::new(LocalStore::open(db_path)?))
        }
        Backend::Remote { url, api_key } => {
            tracing::info!(url = url.as_str(), "using remote task store");
            Ok(Arc::new(RemoteStore::new(url, api_key)?))
        }
    }
}
