//! Debounced viewport bounds.
//!
//! The map reports a new rectangle on every move event. Only the last one
//! after a quiet period is committed, and the committed value is what keys
//! the viewport station fetch.

use crate::models::ViewportBounds;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

pub struct ViewportBoundsController {
    debounce: Duration,
    pending: Option<JoinHandle<()>>,
    latest_raw: Option<ViewportBounds>,
    committed_tx: Arc<watch::Sender<Option<ViewportBounds>>>,
    commit_count: Arc<AtomicU64>,
}

impl ViewportBoundsController {
    pub fn new(debounce: Duration) -> Self {
        let (committed_tx, _) = watch::channel(None);

        Self {
            debounce,
            pending: None,
            latest_raw: None,
            committed_tx: Arc::new(committed_tx),
            commit_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Receiver that changes once per pause in map movement.
    pub fn subscribe(&self) -> watch::Receiver<Option<ViewportBounds>> {
        self.committed_tx.subscribe()
    }

    pub fn committed(&self) -> Option<ViewportBounds> {
        *self.committed_tx.borrow()
    }

    pub fn commit_count(&self) -> u64 {
        self.commit_count.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Records a raw bounds update and restarts the quiet-period timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn push(&mut self, bounds: ViewportBounds) {
        self.cancel_pending();
        self.latest_raw = Some(bounds);

        // deadline is fixed here, not when the task is first polled
        let deadline = tokio::time::Instant::now() + self.debounce;
        let committed_tx = self.committed_tx.clone();
        let commit_count = self.commit_count.clone();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            commit(&committed_tx, &commit_count, bounds);
        }));
    }

    /// Commits the pending value now instead of waiting out the window.
    pub fn flush(&mut self) {
        if !self.is_pending() {
            return;
        }

        self.cancel_pending();
        if let Some(bounds) = self.latest_raw {
            commit(&self.committed_tx, &self.commit_count, bounds);
        }
    }

    /// Teardown. No commit fires after this returns.
    pub fn shutdown(&mut self) {
        self.cancel_pending();
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Default for ViewportBoundsController {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Drop for ViewportBoundsController {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

fn commit(
    committed_tx: &watch::Sender<Option<ViewportBounds>>,
    commit_count: &AtomicU64,
    bounds: ViewportBounds,
) {
    commit_count.fetch_add(1, Ordering::SeqCst);
    committed_tx.send_replace(Some(bounds));
    tracing::debug!(
        north = bounds.north,
        south = bounds.south,
        east = bounds.east,
        west = bounds.west,
        "committed viewport bounds"
    );
}
