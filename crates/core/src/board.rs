use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;

use crate::capture::TaskInput;
use crate::debounce::{flush_batch, FlushReport, ReorderDebouncer, REORDER_QUIET_PERIOD};
use crate::model::{Bucket, Category, DeleteResult, OrderWrite, Priority, Task, TaskPatch};
use crate::ordering;
use crate::parser;
use crate::store::TaskStore;

/// Session state for one front end: the in-memory task list, the store it
/// mirrors, and the pending reorder batch.
///
/// Mutations update the list first and persist afterwards. Only same-bucket
/// drag reorders are debounced; every other write goes out immediately.
pub struct TaskBoard {
    store: Arc<dyn TaskStore>,
    tasks: Vec<Task>,
    reorder_writes: ReorderDebouncer,
}

impl TaskBoard {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self::with_quiet_period(store, REORDER_QUIET_PERIOD)
    }

    pub fn with_quiet_period(store: Arc<dyn TaskStore>, quiet: Duration) -> Self {
        Self {
            reorder_writes: ReorderDebouncer::new(store.clone(), quiet),
            store,
            tasks: Vec::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn pending_reorder_writes(&self) -> usize {
        self.reorder_writes.pending_len()
    }

    /// Replace the list with the store's contents, migrating legacy records.
    pub async fn load(&mut self) -> Result<usize> {
        let mut tasks = self
            .store
            .list_all()
            .await
            .context("failed to load tasks")?;

        let patches = ordering::migrate_defaults(&mut tasks);
        if !patches.is_empty() {
            tracing::info!(count = patches.len(), "migrating tasks without a priority");
        }
        for (id, patch) in patches {
            self.store
                .update(&id, patch)
                .await
                .with_context(|| format!("failed to migrate task {id}"))?;
        }

        self.tasks = tasks;
        Ok(self.tasks.len())
    }

    /// Recovery path after a failed optimistic write.
    async fn reload(&mut self) {
        if let Err(err) = self.load().await {
            tracing::warn!(error = %err, "reload after failed write also failed");
        }
    }

    pub async fn add(&mut self, input: &TaskInput, default_category: Category) -> Result<Task> {
        input.require_text()?;
        let new_task = parser::prepare_new_task(input, default_category)?;
        let mut created = self
            .store
            .create(new_task)
            .await
            .context("failed to create task")?;

        let order = ordering::append_order(&self.tasks, created.bucket());
        created.order = Some(order);
        self.tasks.push(created.clone());
        self.persist_now(vec![OrderWrite::new(created.id.clone(), order)])
            .await;
        Ok(created)
    }

    /// Flip completion. Returns the new state, or `None` for an unknown id.
    pub async fn toggle_complete(&mut self, id: &str) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|task| task.id == id)?;
        task.completed = !task.completed;
        let completed = task.completed;

        if let Err(err) = self.store.update(id, TaskPatch::completed(completed)).await {
            tracing::warn!(id, error = %err, "failed to update completion; reloading");
            self.reload().await;
        }
        Some(completed)
    }

    pub async fn edit_text(&mut self, id: &str, text: &str) -> Result<Option<Task>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(crate::capture::CaptureError::EmptyText.into());
        }
        let updated = self
            .store
            .update(id, TaskPatch::text(text))
            .await
            .context("failed to edit task")?;
        if let Some(updated) = &updated {
            self.replace(updated.clone());
        }
        Ok(updated)
    }

    /// Move to the end of the same category's `priority` bucket.
    pub async fn update_priority(&mut self, id: &str, priority: Priority) -> Option<Task> {
        let category = self.task(id)?.category;
        self.append_into(id, Bucket::new(category, priority)).await
    }

    /// Move to the end of `category`'s bucket for the task's current priority.
    pub async fn move_to_category(&mut self, id: &str, category: Category) -> Option<Task> {
        let priority = self.task(id)?.priority();
        self.append_into(id, Bucket::new(category, priority)).await
    }

    async fn append_into(&mut self, id: &str, bucket: Bucket) -> Option<Task> {
        let order = ordering::append_order(&self.tasks, bucket);
        let task = self.tasks.iter_mut().find(|task| task.id == id)?;
        task.category = bucket.category;
        task.priority = Some(bucket.priority);
        task.order = Some(order);
        let moved = task.clone();

        self.persist_now(vec![OrderWrite {
            id: moved.id.clone(),
            order,
            bucket: Some(bucket),
        }])
        .await;
        Some(moved)
    }

    /// Drag-reorder inside one bucket. Applied to the list now; the writes are
    /// batched until the drag goes quiet.
    pub fn reorder(
        &mut self,
        category: Category,
        priority: Priority,
        from: usize,
        to: usize,
    ) -> Vec<OrderWrite> {
        let writes = ordering::reorder_within_bucket(
            &mut self.tasks,
            Bucket::new(category, priority),
            from,
            to,
        );
        self.reorder_writes.schedule(writes.clone());
        writes
    }

    /// Reorder addressed by flat indices in the category's display list. Both
    /// indices must land in the same bucket; otherwise nothing happens.
    pub fn reorder_flat(&mut self, category: Category, from: usize, to: usize) -> Vec<OrderWrite> {
        let Some((bucket, from)) = ordering::locate_flat_index(&self.tasks, category, from) else {
            return Vec::new();
        };
        let Some((target, to)) = ordering::locate_flat_index(&self.tasks, category, to) else {
            return Vec::new();
        };
        if bucket != target {
            return Vec::new();
        }
        self.reorder(category, bucket.priority, from, to)
    }

    /// Drag a task into another bucket at display position `to`. Written immediately.
    pub async fn drag_across(&mut self, id: &str, destination: Bucket, to: usize) -> Vec<OrderWrite> {
        let writes = ordering::move_across_buckets(&mut self.tasks, id, destination, to);
        self.persist_now(writes.clone()).await;
        writes
    }

    pub async fn delete(&mut self, id: &str) -> Result<bool> {
        let deleted = self
            .store
            .delete(id)
            .await
            .with_context(|| format!("failed to delete task {id}"))?;
        if deleted {
            self.tasks.retain(|task| task.id != id);
        }
        Ok(deleted)
    }

    pub async fn delete_many(&mut self, ids: &[String]) -> Result<Vec<DeleteResult>> {
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            results.push(DeleteResult {
                id: id.clone(),
                deleted: self.delete(id).await?,
            });
        }
        Ok(results)
    }

    /// Delete every completed task outside the checklist. Returns how many were removed.
    pub async fn clear_completed(&mut self) -> usize {
        let (done, open): (Vec<Task>, Vec<Task>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(is_archived);
        self.tasks = open;

        let results = join_all(done.iter().map(|task| self.store.delete(&task.id))).await;
        for (task, result) in done.iter().zip(results) {
            if let Err(err) = result {
                tracing::warn!(id = task.id.as_str(), error = %err, "failed to delete completed task");
            }
        }
        done.len()
    }

    /// Untick every completed checklist item. Reloads if any write fails.
    pub async fn reset_checklist(&mut self) -> usize {
        let mut ids = Vec::new();
        for task in self
            .tasks
            .iter_mut()
            .filter(|task| task.category.is_checklist() && task.completed)
        {
            task.completed = false;
            ids.push(task.id.clone());
        }

        let results = join_all(
            ids.iter()
                .map(|id| self.store.update(id, TaskPatch::completed(false))),
        )
        .await;
        if let Some(err) = results.into_iter().find_map(Result::err) {
            tracing::warn!(error = %err, "failed to reset checklist; reloading");
            self.reload().await;
        }
        ids.len()
    }

    pub async fn delete_all(&mut self) -> Result<bool> {
        self.reorder_writes.cancel();
        let cleared = self
            .store
            .delete_all()
            .await
            .context("failed to delete all tasks")?;
        if cleared {
            self.tasks.clear();
        }
        Ok(cleared)
    }

    /// Open tasks of `category` in display order; checklist categories keep completed items.
    pub fn category_view(&self, category: Category) -> Vec<Task> {
        ordering::category_display(&self.tasks, category)
    }

    pub fn checklist_view(&self) -> Vec<Task> {
        self.category_view(Category::Daily)
    }

    /// Completed tasks from every non-checklist category, in display order.
    pub fn archive_view(&self) -> Vec<Task> {
        let mut done: Vec<Task> = self.tasks.iter().filter(|task| is_archived(task)).cloned().collect();
        ordering::sort_for_display(&mut done);
        done
    }

    /// Write any pending reorder batch immediately.
    pub async fn flush_pending(&mut self) -> FlushReport {
        self.reorder_writes.flush_now().await
    }

    /// Tear down the session. A pending reorder batch is discarded.
    pub fn close(&mut self) {
        self.reorder_writes.cancel();
    }

    async fn persist_now(&self, writes: Vec<OrderWrite>) {
        flush_batch(self.store.as_ref(), writes).await;
    }

    fn replace(&mut self, updated: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|task| task.id == updated.id) {
            *slot = updated;
        }
    }
}

fn is_archived(task: &Task) -> bool {
    task.completed && !task.category.is_checklist()
}
