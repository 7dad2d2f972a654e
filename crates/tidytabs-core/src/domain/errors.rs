//! Errors - エラー型と分類
//!
//! `Display` の文字列はそのまま UI に出る前提で書いています。
//! プロバイダのレスポンス本文や transport の詳細はここに入れず、
//! デバッグログ（DebugSink）にだけ流します。

use thiserror::Error;

use crate::config::ConfigError;
use crate::ports::{PlatformError, StoreError};

/// ErrorKind は運用上の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 時間を置けば直る可能性がある（リトライ済み）
    Transient,
    /// 設定や入力を直さない限り直らない
    Permanent,
    /// ユーザー操作による中断（エラー扱いしない）
    Cancelled,
}

/// Failure of an organize run once it has started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrganizeError {
    #[error("no tabs to organize")]
    NoTabs,

    #[error("{0}")]
    Auth(String),

    #[error("the AI service is unavailable ({reason}) after {attempts} attempts, try again later")]
    TransientApi { attempts: u32, reason: String },

    #[error("the AI service rejected the request (HTTP {status})")]
    RequestRejected { status: u16 },

    #[error("the AI returned a response that could not be understood: {0}")]
    MalformedResponse(String),

    #[error("the AI did not propose any groups")]
    EmptyResult,

    #[error("cancelled")]
    Cancelled,

    #[error("browser tab operation failed: {0}")]
    Platform(String),

    #[error("could not save task progress: {0}")]
    Storage(String),
}

impl OrganizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrganizeError::TransientApi { .. } => ErrorKind::Transient,
            OrganizeError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Permanent,
        }
    }

    /// Human readable text for 401 / 403.
    pub fn auth_for_status(status: u16) -> Self {
        match status {
            401 => OrganizeError::Auth(
                "the API key was rejected (HTTP 401), check it in the settings".to_string(),
            ),
            _ => OrganizeError::Auth(format!(
                "the API key is not allowed to use this model or endpoint (HTTP {status})"
            )),
        }
    }
}

impl From<PlatformError> for OrganizeError {
    fn from(err: PlatformError) -> Self {
        OrganizeError::Platform(err.to_string())
    }
}

impl From<StoreError> for OrganizeError {
    fn from(err: StoreError) -> Self {
        OrganizeError::Storage(err.to_string())
    }
}

/// Rejection of a start request. Returned synchronously; never persisted.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("an organize task is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_messages_do_not_leak_bodies() {
        let err = OrganizeError::auth_for_status(401);
        assert!(err.to_string().contains("401"));
        assert_eq!(err.kind(), ErrorKind::Permanent);

        let err = OrganizeError::auth_for_status(403);
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn transient_error_is_classified() {
        let err = OrganizeError::TransientApi {
            attempts: 3,
            reason: "HTTP 503".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn empty_result_and_no_tabs_are_distinct() {
        assert_ne!(OrganizeError::NoTabs.to_string(), OrganizeError::EmptyResult.to_string());
    }
}
