//! DebugSink port - 診断ログの受け口
//!
//! 追記のみ。UI に出してよいかどうかはオーケストレーターが
//! ユーザー設定（debug フラグ）で判断します。

use std::sync::{Arc, Mutex};

/// Append-only sink for diagnostic lines.
pub trait DebugSink: Send + Sync {
    fn push(&self, line: String);
}

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDebugSink;

impl DebugSink for NoopDebugSink {
    fn push(&self, _line: String) {}
}

/// Collects lines in order. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct DebugLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl DebugLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DebugSink for DebugLog {
    fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line);
    }
}
