//! InMemoryTabPlatform - ブラウザウィンドウのシミュレーション（開発・テスト用）
//!
//! chrome.tabs / chrome.tabGroups の振る舞いのうち、パイプラインが依存する部分を再現します。
//! - 一括 ungroup は ID がひとつでも古いと全体が失敗する
//! - タブがいなくなったグループは消える
//! - グループ化されたタブは元のグループから抜ける
//!
//! テストから状態を崩すためのつまみ（タブを閉じる、失敗を注入する）も持ちます。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{GroupColor, TabId, TabRecord};
use crate::ports::{GroupId, GroupUpdate, PlatformError, TabPlatform};

/// Snapshot of one group for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: GroupId,
    pub title: String,
    pub color: GroupColor,
    pub collapsed: bool,
    /// Member tabs in strip order.
    pub tabs: Vec<TabId>,
}

#[derive(Debug, Default)]
struct WindowState {
    tabs: Vec<TabRecord>,
    active: Option<TabId>,
    membership: HashMap<TabId, GroupId>,
    groups: BTreeMap<GroupId, GroupInfo>,
    next_group: i64,
    fail_bulk_ungroup: bool,
    reject_groups_with: HashSet<TabId>,
}

impl WindowState {
    fn exists(&self, tab: TabId) -> bool {
        self.tabs.iter().any(|t| t.id == tab)
    }

    fn detach(&mut self, tab: TabId) {
        if let Some(group) = self.membership.remove(&tab) {
            let still_used = self.membership.values().any(|g| *g == group);
            if !still_used {
                self.groups.remove(&group);
            }
        }
    }

    fn members(&self, group: GroupId) -> Vec<TabId> {
        self.tabs
            .iter()
            .map(|t| t.id)
            .filter(|id| self.membership.get(id) == Some(&group))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTabPlatform {
    state: Mutex<WindowState>,
}

impl InMemoryTabPlatform {
    pub fn new(tabs: Vec<TabRecord>) -> Self {
        let active = tabs.first().map(|t| t.id);
        Self {
            state: Mutex::new(WindowState {
                tabs,
                active,
                next_group: 1,
                ..WindowState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_active(&self, tab: Option<TabId>) {
        self.lock().active = tab;
    }

    /// Close a tab the way a user would: it vanishes from its group too.
    pub fn close_tab(&self, tab: TabId) {
        let mut state = self.lock();
        state.detach(tab);
        state.tabs.retain(|t| t.id != tab);
        if state.active == Some(tab) {
            state.active = state.tabs.first().map(|t| t.id);
        }
    }

    /// Put `tabs` in a pre-existing group (setup for ungroup scenarios).
    pub fn seed_group(&self, title: &str, color: GroupColor, tabs: &[TabId]) -> GroupId {
        let mut state = self.lock();
        let id = GroupId(state.next_group);
        state.next_group += 1;
        for tab in tabs {
            state.detach(*tab);
            state.membership.insert(*tab, id);
        }
        state.groups.insert(
            id,
            GroupInfo {
                id,
                title: title.to_string(),
                color,
                collapsed: false,
                tabs: Vec::new(),
            },
        );
        id
    }

    /// Make bulk ungroup fail, forcing the per-tab fallback.
    pub fn fail_bulk_ungroup(&self, fail: bool) {
        self.lock().fail_bulk_ungroup = fail;
    }

    /// Make `create_group` fail for any group that would contain `tab`.
    pub fn reject_groups_with(&self, tab: TabId) {
        self.lock().reject_groups_with.insert(tab);
    }

    pub fn groups(&self) -> Vec<GroupInfo> {
        let state = self.lock();
        state
            .groups
            .values()
            .map(|g| GroupInfo {
                tabs: state.members(g.id),
                ..g.clone()
            })
            .collect()
    }

    pub fn tabs(&self) -> Vec<TabRecord> {
        self.lock().tabs.clone()
    }
}

#[async_trait]
impl TabPlatform for InMemoryTabPlatform {
    async fn list_tabs(&self) -> Result<Vec<TabRecord>, PlatformError> {
        Ok(self.tabs())
    }

    async fn active_tab(&self) -> Result<Option<TabId>, PlatformError> {
        Ok(self.lock().active)
    }

    async fn grouped_tabs(&self) -> Result<Vec<TabId>, PlatformError> {
        let state = self.lock();
        Ok(state
            .tabs
            .iter()
            .map(|t| t.id)
            .filter(|id| state.membership.contains_key(id))
            .collect())
    }

    async fn tab_exists(&self, tab: TabId) -> Result<bool, PlatformError> {
        Ok(self.lock().exists(tab))
    }

    async fn ungroup(&self, tabs: &[TabId]) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if state.fail_bulk_ungroup {
            return Err(PlatformError::Other("bulk ungroup failed".to_string()));
        }
        if let Some(stale) = tabs.iter().find(|t| !state.exists(**t)) {
            return Err(PlatformError::TabNotFound(*stale));
        }
        for tab in tabs {
            state.detach(*tab);
        }
        Ok(())
    }

    async fn ungroup_one(&self, tab: TabId) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if !state.exists(tab) {
            return Err(PlatformError::TabNotFound(tab));
        }
        state.detach(tab);
        Ok(())
    }

    async fn create_group(&self, tabs: &[TabId]) -> Result<GroupId, PlatformError> {
        let mut state = self.lock();
        if tabs.is_empty() {
            return Err(PlatformError::Other("cannot create an empty group".to_string()));
        }
        if let Some(stale) = tabs.iter().find(|t| !state.exists(**t)) {
            return Err(PlatformError::TabNotFound(*stale));
        }
        if tabs.iter().any(|t| state.reject_groups_with.contains(t)) {
            return Err(PlatformError::Other("group creation rejected".to_string()));
        }

        let id = GroupId(state.next_group);
        state.next_group += 1;
        for tab in tabs {
            state.detach(*tab);
            state.membership.insert(*tab, id);
        }
        state.groups.insert(
            id,
            GroupInfo {
                id,
                title: String::new(),
                color: GroupColor::Grey,
                collapsed: false,
                tabs: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn update_group(&self, group: GroupId, update: &GroupUpdate) -> Result<(), PlatformError> {
        let mut state = self.lock();
        let info = state
            .groups
            .get_mut(&group)
            .ok_or(PlatformError::GroupNotFound(group))?;
        info.title = update.title.clone();
        info.color = update.color;
        info.collapsed = update.collapsed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> InMemoryTabPlatform {
        InMemoryTabPlatform::new(vec![
            TabRecord::new(1, "a", "https://a.example/"),
            TabRecord::new(2, "b", "https://b.example/"),
            TabRecord::new(3, "c", "https://c.example/"),
        ])
    }

    #[tokio::test]
    async fn bulk_ungroup_fails_as_a_whole_on_stale_ids() {
        let platform = window();
        platform.seed_group("old", GroupColor::Red, &[TabId::new(1), TabId::new(2)]);

        let err = platform
            .ungroup(&[TabId::new(1), TabId::new(99)])
            .await
            .unwrap_err();

        assert_eq!(err, PlatformError::TabNotFound(TabId::new(99)));
        assert_eq!(platform.grouped_tabs().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn emptied_groups_disappear() {
        let platform = window();
        platform.seed_group("old", GroupColor::Red, &[TabId::new(1)]);

        platform.close_tab(TabId::new(1));

        assert!(platform.groups().is_empty());
        assert_eq!(platform.active_tab().await.unwrap(), Some(TabId::new(2)));
    }

    #[tokio::test]
    async fn create_and_update_group() {
        let platform = window();

        let id = platform
            .create_group(&[TabId::new(3), TabId::new(1)])
            .await
            .unwrap();
        platform
            .update_group(
                id,
                &GroupUpdate {
                    title: "Mix".to_string(),
                    color: GroupColor::Cyan,
                    collapsed: true,
                },
            )
            .await
            .unwrap();

        let groups = platform.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "Mix");
        assert!(groups[0].collapsed);
        // Strip order, not call order.
        assert_eq!(groups[0].tabs, vec![TabId::new(1), TabId::new(3)]);
    }
}
