//! App - アプリケーション層
//!
//! ports を組み合わせて整理タスクを実装します。
//!
//! # 主要コンポーネント
//! - **TaskOrchestrator**: タスクの状態機械（開始・フェーズ遷移・終了）
//! - **TabMutationApplier**: グループ分けの結果をブラウザに反映
//! - **TaskMonitor**: UI 側の観測とキャンセル要求

pub mod applier;
pub mod monitor;
pub mod orchestrator;

pub use self::applier::{ApplyOptions, ApplyReport, GroupFailure, TabMutationApplier};
pub use self::monitor::TaskMonitor;
pub use self::orchestrator::{INTERRUPTED_MESSAGE, OrganizeRequest, TaskHandle, TaskOrchestrator};
