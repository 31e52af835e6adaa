//! Coalesces `order` writes produced by continuous drag reordering.
//!
//! Each [`ReorderDebouncer::schedule`] call merges its writes into the pending
//! set (latest order per task wins) and restarts the quiet-period timer. When
//! the timer fires the whole set goes to the store as one concurrent batch.
//! Failed writes are logged and dropped; the in-memory list is not rolled
//! back and stays ahead of the store until the next full reload.
//!
//! The timer belongs to the debouncer: dropping it cancels a pending batch.
//! A batch that has already started writing is left to finish.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::model::OrderWrite;
use crate::store::TaskStore;

pub const REORDER_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Outcome of one flushed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub written: usize,
    pub missing: usize,
    pub failed: usize,
}

impl FlushReport {
    pub fn attempted(&self) -> usize {
        self.written + self.missing + self.failed
    }
}

pub struct ReorderDebouncer {
    store: Arc<dyn TaskStore>,
    quiet: Duration,
    pending: Arc<Mutex<Vec<OrderWrite>>>,
    timer: Option<JoinHandle<()>>,
    runtime: Option<Handle>,
}

impl ReorderDebouncer {
    /// Captures the current tokio runtime, if any, to run the quiet-period timer on.
    pub fn new(store: Arc<dyn TaskStore>, quiet: Duration) -> Self {
        Self {
            store,
            quiet,
            pending: Arc::new(Mutex::new(Vec::new())),
            timer: None,
            runtime: Handle::try_current().ok(),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Merge `writes` into the pending batch and restart the quiet period.
    ///
    /// With no runtime to run a timer on, the writes stay pending until
    /// [`ReorderDebouncer::flush_now`].
    pub fn schedule(&mut self, writes: Vec<OrderWrite>) {
        if writes.is_empty() {
            return;
        }
        merge(&mut self.pending.lock(), writes);

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        let Some(runtime) = self
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
        else {
            tracing::warn!(
                pending = self.pending_len(),
                "no async runtime; reorder writes wait for an explicit flush"
            );
            return;
        };

        let store = self.store.clone();
        let pending = self.pending.clone();
        let quiet = self.quiet;
        self.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(quiet).await;
            let batch = std::mem::take(&mut *pending.lock());
            // Detached so a later abort of this timer cannot cut the batch short.
            tokio::spawn(async move {
                flush_batch(store.as_ref(), batch).await;
            });
        }));
    }

    /// Write the pending batch now instead of waiting out the quiet period.
    pub async fn flush_now(&mut self) -> FlushReport {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let batch = std::mem::take(&mut *self.pending.lock());
        flush_batch(self.store.as_ref(), batch).await
    }

    /// Drop the pending batch without writing it.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let dropped = std::mem::take(&mut *self.pending.lock()).len();
        if dropped > 0 {
            tracing::debug!(dropped, "cancelled pending reorder writes");
        }
    }
}

impl Drop for ReorderDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn merge(pending: &mut Vec<OrderWrite>, writes: Vec<OrderWrite>) {
    for write in writes {
        match pending.iter_mut().find(|existing| existing.id == write.id) {
            Some(existing) => {
                existing.order = write.order;
                if write.bucket.is_some() {
                    existing.bucket = write.bucket;
                }
            }
            None => pending.push(write),
        }
    }
}

/// Issue every write concurrently and log the ones that did not land.
pub async fn flush_batch(store: &dyn TaskStore, batch: Vec<OrderWrite>) -> FlushReport {
    let mut report = FlushReport::default();
    if batch.is_empty() {
        return report;
    }

    let results = join_all(
        batch
            .iter()
            .map(|write| store.update(&write.id, write.patch())),
    )
    .await;

    for (write, result) in batch.iter().zip(results) {
        match result {
            Ok(Some(_)) => report.written += 1,
            Ok(None) => {
                tracing::debug!(id = write.id.as_str(), "order write for deleted task skipped");
                report.missing += 1;
            }
            Err(err) => {
                tracing::warn!(id = write.id.as_str(), error = %err, "failed to update task order");
                report.failed += 1;
            }
        }
    }
    tracing::debug!(
        written = report.written,
        failed = report.failed,
        "flushed order writes"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingStore;

    fn seeded(ids: &[&str]) -> Arc<RecordingStore> {
        let store = Arc::new(RecordingStore::default());
        for id in ids {
            store.seed(id);
        }
        store
    }

    #[test]
    fn merge_keeps_latest_order_per_task() {
        let mut pending = vec![OrderWrite::new("a", 0), OrderWrite::new("b", 1)];
        merge(
            &mut pending,
            vec![OrderWrite::new("b", 0), OrderWrite::new("c", 2)],
        );
        assert_eq!(
            pending,
            vec![
                OrderWrite::new("a", 0),
                OrderWrite::new("b", 0),
                OrderWrite::new("c", 2)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn writes_wait_for_the_quiet_period() {
        let store = seeded(&["a", "b"]);
        let mut debouncer = ReorderDebouncer::new(store.clone(), REORDER_QUIET_PERIOD);

        debouncer.schedule(vec![OrderWrite::new("a", 1), OrderWrite::new("b", 0)]);
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(store.update_calls(), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(store.update_calls(), 2);
        assert_eq!(debouncer.pending_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn new_writes_restart_the_timer() {
        let store = seeded(&["a", "b"]);
        let mut debouncer = ReorderDebouncer::new(store.clone(), REORDER_QUIET_PERIOD);

        debouncer.schedule(vec![OrderWrite::new("a", 1)]);
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.schedule(vec![OrderWrite::new("a", 3), OrderWrite::new("b", 2)]);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.update_calls(), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.update_calls(), 2);
        assert_eq!(store.order_of("a"), Some(3));
        assert_eq!(store.order_of("b"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_debouncer_cancels_pending_writes() {
        let store = seeded(&["a"]);
        let mut debouncer = ReorderDebouncer::new(store.clone(), REORDER_QUIET_PERIOD);
        debouncer.schedule(vec![OrderWrite::new("a", 4)]);
        drop(debouncer);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.update_calls(), 0);
    }

    #[test]
    fn scheduling_without_a_runtime_keeps_writes_for_flush() {
        let store = seeded(&["a", "b"]);
        let mut debouncer = ReorderDebouncer::new(store.clone(), REORDER_QUIET_PERIOD);

        debouncer.schedule(vec![OrderWrite::new("a", 1), OrderWrite::new("b", 0)]);
        assert_eq!(debouncer.pending_len(), 2);
        assert_eq!(store.update_calls(), 0);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let report = runtime.block_on(debouncer.flush_now());
        assert_eq!(report.written, 2);
        assert_eq!(store.order_of("a"), Some(1));
    }

    #[test]
    fn timer_runs_on_the_runtime_captured_at_construction() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("runtime");
        let store = seeded(&["a"]);
        let mut debouncer = {
            let _guard = runtime.enter();
            ReorderDebouncer::new(store.clone(), Duration::from_millis(10))
        };

        debouncer.schedule(vec![OrderWrite::new("a", 7)]);
        runtime.block_on(async {
            for _ in 0..200 {
                if store.order_of("a") == Some(7) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        assert_eq!(store.order_of("a"), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_now_skips_the_wait_and_reports_failures() {
        let store = seeded(&["a", "b"]);
        store.fail_updates_for("b");
        let mut debouncer = ReorderDebouncer::new(store.clone(), REORDER_QUIET_PERIOD);
        debouncer.schedule(vec![
            OrderWrite::new("a", 1),
            OrderWrite::new("b", 0),
            OrderWrite::new("gone", 2),
        ]);

        let report = debouncer.flush_now().await;
        assert_eq!(
            report,
            FlushReport {
                written: 1,
                missing: 1,
                failed: 1
            }
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.update_calls(), 3);
    }
}
