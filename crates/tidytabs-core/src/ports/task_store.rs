//! TaskStore port - 永続化されたタスク状態（正本）
//!
//! # 設計原則
//! - 状態はひとつだけ（キー固定のレコード）
//! - `update` は読み取り→判定→書き込みを原子的に行う（check-and-set）
//! - 書き手はオーケストレーター。UI は running → cancelled だけ書ける
//! - 観測者は `load` でポーリングするか `subscribe` で変更を受け取る

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::domain::TaskState;

/// Decides the next state from the current one. `None` leaves the state untouched.
///
/// A store may call it more than once when the state changes under it, so it
/// must not have side effects.
pub type StateTransition = Box<dyn Fn(&TaskState) -> Option<TaskState> + Send>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task state storage failed: {0}")]
    Io(String),

    #[error("stored task state is unreadable: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn load(&self) -> Result<TaskState, StoreError>;

    /// Atomically apply `transition`. Returns the new state when it was written.
    async fn update(&self, transition: StateTransition) -> Result<Option<TaskState>, StoreError>;

    /// Change feed for observers in this process.
    fn subscribe(&self) -> watch::Receiver<TaskState>;
}
