//! TaskMonitor - UI 側からタスク状態を見る
//!
//! オーケストレーターとは別プロセスにいる前提です。書き込めるのは
//! - running → cancelled（キャンセル要求）
//! - 終了状態 → idle（表示を閉じる）
//!
//! だけで、どちらも check-and-set なのでオーケストレーターの書き込みと競合しません。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::TaskState;
use crate::ports::{Clock, StoreError, SystemClock, TaskStore};

#[derive(Clone)]
pub struct TaskMonitor {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
}

impl TaskMonitor {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn snapshot(&self) -> Result<TaskState, StoreError> {
        self.store.load().await
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.store.subscribe()
    }

    /// Ask the running task to stop. Returns `false` when nothing was running.
    pub async fn request_cancel(&self) -> Result<bool, StoreError> {
        let cancelled_at = self.clock.now();
        let written = self
            .store
            .update(Box::new(move |state: &TaskState| {
                state
                    .is_running()
                    .then_some(TaskState::Cancelled { cancelled_at })
            }))
            .await?;
        if written.is_some() {
            tracing::info!("cancellation written to the task store");
        }
        Ok(written.is_some())
    }

    /// Reset a terminal state to idle right away.
    pub async fn dismiss(&self) -> Result<bool, StoreError> {
        let written = self
            .store
            .update(Box::new(|state: &TaskState| {
                state.is_terminal().then_some(TaskState::Idle)
            }))
            .await?;
        Ok(written.is_some())
    }

    /// Keep the current terminal state on screen for `delay`, then reset it.
    ///
    /// Nothing happens if the state changed in the meantime (a new run was
    /// started or the user already dismissed it).
    pub async fn reset_after(&self, delay: Duration) -> Result<bool, StoreError> {
        let shown = self.store.load().await?;
        if !shown.is_terminal() {
            return Ok(false);
        }
        tokio::time::sleep(delay).await;
        let written = self
            .store
            .update(Box::new(move |state: &TaskState| {
                (*state == shown).then_some(TaskState::Idle)
            }))
            .await?;
        Ok(written.is_some())
    }

    /// Wait until the state is terminal (or idle) and return it.
    ///
    /// Follows the watch channel and also re-reads the store every
    /// `poll_interval`, which is the only way to see writes made by another
    /// process.
    pub async fn wait_for_terminal(&self, poll_interval: Duration) -> Result<TaskState, StoreError> {
        let mut rx = self.store.subscribe();
        loop {
            let state = self.store.load().await?;
            if !state.is_running() {
                return Ok(state);
            }
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        tokio::time::sleep(poll_interval).await;
                    }
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskPhase;
    use crate::impls::InMemoryTaskStore;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};

    fn running() -> TaskState {
        TaskState::running(
            TaskPhase::CallingAi,
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        )
    }

    fn completed() -> TaskState {
        TaskState::Completed {
            group_count: 3,
            debug_log: None,
            completed_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 1, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn request_cancel_only_touches_running_tasks() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 30).unwrap();
        let store = Arc::new(InMemoryTaskStore::with_state(running()));
        let monitor = TaskMonitor::new(store.clone()).with_clock(Arc::new(FixedClock::new(now)));

        assert!(monitor.request_cancel().await.unwrap());
        assert_eq!(store.current(), TaskState::Cancelled { cancelled_at: now });

        // Already cancelled: nothing to do.
        assert!(!monitor.request_cancel().await.unwrap());
    }

    #[tokio::test]
    async fn request_cancel_does_not_touch_completed() {
        let store = Arc::new(InMemoryTaskStore::with_state(completed()));
        let monitor = TaskMonitor::new(store.clone());

        assert!(!monitor.request_cancel().await.unwrap());
        assert_eq!(store.current(), completed());
    }

    #[tokio::test]
    async fn dismiss_resets_terminal_states_only() {
        let store = Arc::new(InMemoryTaskStore::with_state(running()));
        let monitor = TaskMonitor::new(store.clone());
        assert!(!monitor.dismiss().await.unwrap());
        assert!(store.current().is_running());

        let store = Arc::new(InMemoryTaskStore::with_state(completed()));
        let monitor = TaskMonitor::new(store.clone());
        assert!(monitor.dismiss().await.unwrap());
        assert_eq!(store.current(), TaskState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_after_waits_then_resets() {
        let store = Arc::new(InMemoryTaskStore::with_state(completed()));
        let monitor = TaskMonitor::new(store.clone());
        let started = tokio::time::Instant::now();

        assert!(monitor.reset_after(Duration::from_secs(3)).await.unwrap());

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(store.current(), TaskState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_after_leaves_a_newer_state_alone() {
        let store = Arc::new(InMemoryTaskStore::with_state(completed()));
        let monitor = TaskMonitor::new(store.clone());

        let reset = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.reset_after(Duration::from_secs(3)).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        store
            .update(Box::new(|_: &TaskState| Some(running())))
            .await
            .unwrap();

        assert!(!reset.await.unwrap().unwrap());
        assert_eq!(store.current(), running());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_terminal_follows_changes() {
        let store = Arc::new(InMemoryTaskStore::with_state(running()));
        let monitor = TaskMonitor::new(store.clone());

        let waiter = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.wait_for_terminal(Duration::from_secs(5)).await }
        });
        tokio::time::sleep(Duration::from_secs(12)).await;
        store
            .update(Box::new(|_: &TaskState| Some(completed())))
            .await
            .unwrap();

        assert_eq!(waiter.await.unwrap().unwrap(), completed());
    }
}
