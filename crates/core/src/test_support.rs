use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::time::Instant;
use ulid::Ulid;

use crate::model::{Category, NewTask, Priority, Task, TaskPatch};
use crate::store::{StoreError, StoreResult, TaskStore};

/// In-memory store that counts calls and can be told to fail updates.
#[derive(Default)]
pub(crate) struct RecordingStore {
    tasks: Mutex<Vec<Task>>,
    failing: Mutex<HashSet<String>>,
    fail_all_updates: AtomicBool,
    updates: AtomicUsize,
    update_times: Mutex<Vec<Instant>>,
    lists: AtomicUsize,
}

impl RecordingStore {
    pub(crate) fn seed(&self, id: &str) -> Task {
        let task = NewTask {
            text: id.to_uppercase(),
            completed: false,
            category: Category::General,
            date: None,
            priority: Priority::Low,
            order: 0,
        }
        .into_task(id.to_string(), Utc::now());
        self.tasks.lock().push(task.clone());
        task
    }

    pub(crate) fn insert(&self, task: Task) {
        self.tasks.lock().push(task);
    }

    pub(crate) fn fail_updates_for(&self, id: &str) {
        self.failing.lock().insert(id.to_string());
    }

    pub(crate) fn fail_all_updates(&self, fail: bool) {
        self.fail_all_updates.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Distinct clock instants at which updates arrived. Under a paused clock
    /// every update of one concurrently flushed batch shares an instant.
    pub(crate) fn update_batches(&self) -> usize {
        let mut times = self.update_times.lock().clone();
        times.dedup();
        times.len()
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub(crate) fn stored(&self, id: &str) -> Option<Task> {
        self.tasks.lock().iter().find(|task| task.id == id).cloned()
    }

    pub(crate) fn order_of(&self, id: &str) -> Option<i64> {
        self.stored(id).and_then(|task| task.order)
    }
}

#[async_trait]
impl TaskStore for RecordingStore {
    async fn list_all(&self) -> StoreResult<Vec<Task>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.tasks.lock().clone())
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Task>> {
        Ok(self.stored(id))
    }

    async fn create(&self, task: NewTask) -> StoreResult<Task> {
        let created = task.into_task(Ulid::new().to_string(), Utc::now());
        self.tasks.lock().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: TaskPatch) -> StoreResult<Option<Task>> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.update_times.lock().push(Instant::now());
        if self.fail_all_updates.load(Ordering::SeqCst) || self.failing.lock().contains(id) {
            return Err(StoreError::Remote {
                status: 503,
                message: format!("update of {id} rejected"),
            });
        }
        let mut tasks = self.tasks.lock();
        Ok(tasks.iter_mut().find(|task| task.id == id).map(|task| {
            task.apply(&patch);
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|task| task.id != id);
        Ok(tasks.len() != before)
    }

    async fn delete_all(&self) -> StoreResult<bool> {
        self.tasks.lock().clear();
        Ok(true)
    }
}
