//! State - 永続化されるタスク状態
//!
//! # 状態遷移
//! - idle → running(fetching-tabs)
//! - running: fetching-tabs → ungrouping → calling-ai → creating-groups
//! - running → completed / error / cancelled
//! - completed / error / cancelled → idle（UI 側のリセット）
//!
//! 書き込むのはオーケストレーターのみ。例外は UI からのキャンセル要求で、
//! running → cancelled の遷移だけが許されます。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of a running task. Always advances in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskPhase {
    FetchingTabs,
    Ungrouping,
    CallingAi,
    CreatingGroups,
}

impl TaskPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPhase::FetchingTabs => "fetching-tabs",
            TaskPhase::Ungrouping => "ungrouping",
            TaskPhase::CallingAi => "calling-ai",
            TaskPhase::CreatingGroups => "creating-groups",
        }
    }
}

/// The single persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TaskState {
    #[default]
    Idle,

    Running {
        phase: TaskPhase,
        started_at: DateTime<Utc>,
    },

    Completed {
        group_count: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        debug_log: Option<Vec<String>>,
        completed_at: DateTime<Utc>,
    },

    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        debug_log: Option<Vec<String>>,
        failed_at: DateTime<Utc>,
    },

    Cancelled {
        cancelled_at: DateTime<Utc>,
    },
}

impl TaskState {
    pub fn running(phase: TaskPhase, started_at: DateTime<Utc>) -> Self {
        TaskState::Running { phase, started_at }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TaskState::Running { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskState::Cancelled { .. })
    }

    /// Completed, error or cancelled.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed { .. } | TaskState::Error { .. } | TaskState::Cancelled { .. }
        )
    }

    pub fn phase(&self) -> Option<TaskPhase> {
        match self {
            TaskState::Running { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            TaskState::Running { started_at, .. } => Some(*started_at),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn running_state_serializes_with_status_tag_and_kebab_phase() {
        let state = TaskState::running(TaskPhase::CallingAi, at());
        let v = serde_json::to_value(&state).unwrap();

        assert_eq!(v["status"], "running");
        assert_eq!(v["phase"], "calling-ai");
        assert!(v["startedAt"].is_string());
    }

    #[test]
    fn completed_without_debug_omits_the_field() {
        let state = TaskState::Completed {
            group_count: 3,
            debug_log: None,
            completed_at: at(),
        };
        let v = serde_json::to_value(&state).unwrap();

        assert_eq!(v["status"], "completed");
        assert_eq!(v["groupCount"], 3);
        assert!(v.get("debugLog").is_none());
    }

    #[test]
    fn persisted_shape_reads_back() {
        let raw = r#"{"status":"error","message":"boom","failedAt":"2024-01-01T12:00:00Z"}"#;
        let state: TaskState = serde_json::from_str(raw).unwrap();

        assert_eq!(
            state,
            TaskState::Error {
                message: "boom".to_string(),
                debug_log: None,
                failed_at: at(),
            }
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn phases_are_ordered() {
        assert!(TaskPhase::FetchingTabs < TaskPhase::Ungrouping);
        assert!(TaskPhase::Ungrouping < TaskPhase::CallingAi);
        assert!(TaskPhase::CallingAi < TaskPhase::CreatingGroups);
    }
}
