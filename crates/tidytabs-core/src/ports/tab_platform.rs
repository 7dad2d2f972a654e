//! TabPlatform port - ブラウザのタブ API
//!
//! 拡張機能側（chrome.tabs / chrome.tabGroups 相当）が実装します。
//! ユーザーはいつでもタブを閉じられるので、どのメソッドも
//! 「その ID はもう存在しない」を `PlatformError::TabNotFound` で返せる必要があります。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{GroupColor, TabId, TabRecord};

/// Identifier of a tab group, assigned by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

/// Display properties set on a freshly created group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupUpdate {
    pub title: String,
    pub color: GroupColor,
    pub collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("tab {0} no longer exists")]
    TabNotFound(TabId),

    #[error("tab group {0:?} no longer exists")]
    GroupNotFound(GroupId),

    #[error("{0}")]
    Other(String),
}

/// The browser surface the pipeline needs, scoped to one window.
#[async_trait]
pub trait TabPlatform: Send + Sync {
    /// Tabs of the window in strip order.
    async fn list_tabs(&self) -> Result<Vec<TabRecord>, PlatformError>;

    /// The focused tab, if any.
    async fn active_tab(&self) -> Result<Option<TabId>, PlatformError>;

    /// Tabs that currently belong to some group.
    async fn grouped_tabs(&self) -> Result<Vec<TabId>, PlatformError>;

    async fn tab_exists(&self, tab: TabId) -> Result<bool, PlatformError>;

    /// Remove several tabs from their groups in one call. Fails as a whole
    /// when any id is stale.
    async fn ungroup(&self, tabs: &[TabId]) -> Result<(), PlatformError>;

    async fn ungroup_one(&self, tab: TabId) -> Result<(), PlatformError>;

    /// Move `tabs` into a new group and return its id.
    async fn create_group(&self, tabs: &[TabId]) -> Result<GroupId, PlatformError>;

    async fn update_group(&self, group: GroupId, update: &GroupUpdate) -> Result<(), PlatformError>;
}
