//! InMemoryTaskStore - watch チャネルだけで持つ TaskStore（開発・テスト用）
//!
//! `watch::Sender::send_if_modified` の中で判定と書き込みを行うので、
//! check-and-set がそのまま原子的になります。

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::TaskState;
use crate::ports::{StateTransition, StoreError, TaskStore};

pub struct InMemoryTaskStore {
    tx: watch::Sender<TaskState>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::with_state(TaskState::Idle)
    }

    pub fn with_state(state: TaskState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx }
    }

    /// Current state without going through the async port.
    pub fn current(&self) -> TaskState {
        self.tx.borrow().clone()
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load(&self) -> Result<TaskState, StoreError> {
        Ok(self.current())
    }

    async fn update(&self, transition: StateTransition) -> Result<Option<TaskState>, StoreError> {
        let mut applied = None;
        self.tx.send_if_modified(|state| match transition(&*state) {
            Some(next) => {
                *state = next.clone();
                applied = Some(next);
                true
            }
            None => false,
        });
        Ok(applied)
    }

    fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskPhase;
    use chrono::Utc;

    #[tokio::test]
    async fn update_applies_only_when_transition_returns_some() {
        let store = InMemoryTaskStore::new();
        let running = TaskState::running(TaskPhase::FetchingTabs, Utc::now());

        let applied = store
            .update(Box::new({
                let running = running.clone();
                move |s: &TaskState| (!s.is_running()).then(|| running.clone())
            }))
            .await
            .unwrap();
        assert_eq!(applied, Some(running.clone()));

        let applied = store
            .update(Box::new(|s: &TaskState| (!s.is_running()).then_some(TaskState::Idle)))
            .await
            .unwrap();
        assert_eq!(applied, None);
        assert_eq!(store.load().await.unwrap(), running);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let store = InMemoryTaskStore::new();
        let mut rx = store.subscribe();

        store
            .update(Box::new(|_: &TaskState| {
                Some(TaskState::Cancelled {
                    cancelled_at: Utc::now(),
                })
            }))
            .await
            .unwrap();

        rx.changed().await.unwrap();
        assert!(rx.borrow().is_cancelled());
    }
}
