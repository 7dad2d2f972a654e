//! Tab - タブのスナップショットと序数マッピング
//!
//! AI にはタブ ID ではなく 0 始まりの序数を渡します。
//! `TabIndexMapping` はその序数を実際の `TabId` に戻すための対応表で、
//! 1 回のタスク実行の間だけ存在します。

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier assigned by the browser to a tab.
///
/// Only valid while the tab is open. Treat it as possibly stale after any
/// `await` that may take a while (the AI call in particular).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(i64);

impl TabId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for TabId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// One tab as seen at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabRecord {
    pub id: TabId,
    pub title: String,
    pub url: String,
}

impl TabRecord {
    pub fn new(id: impl Into<TabId>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Bidirectional ordinal <-> `TabId` mapping for one snapshot.
///
/// Ordinals are dense and follow snapshot order.
#[derive(Debug, Clone, Default)]
pub struct TabIndexMapping {
    by_ordinal: Vec<TabId>,
    by_id: HashMap<TabId, usize>,
}

impl TabIndexMapping {
    pub fn from_tabs(tabs: &[TabRecord]) -> Self {
        let mut by_ordinal = Vec::with_capacity(tabs.len());
        let mut by_id = HashMap::with_capacity(tabs.len());
        for (ordinal, tab) in tabs.iter().enumerate() {
            by_ordinal.push(tab.id);
            by_id.entry(tab.id).or_insert(ordinal);
        }
        Self { by_ordinal, by_id }
    }

    /// Resolve an ordinal from the AI. Out-of-range ordinals resolve to `None`.
    pub fn tab_id(&self, ordinal: u64) -> Option<TabId> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| self.by_ordinal.get(i))
            .copied()
    }

    pub fn ordinal(&self, tab_id: TabId) -> Option<usize> {
        self.by_id.get(&tab_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_ordinal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ordinal.is_empty()
    }
}
