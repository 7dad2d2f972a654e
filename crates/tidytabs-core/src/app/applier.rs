//! TabMutationApplier - グループ分けの結果をブラウザに反映する
//!
//! タブはいつでも閉じられる前提で動きます。
//! - ungroup_all: 一括で外せなければ 1 枚ずつ外し、消えたタブは黙って飛ばす
//! - apply_groups: 作成直前に存在確認し、生き残りゼロのグループは作らない
//! - 1 グループの失敗で残りを止めない

use std::sync::Arc;

use crate::domain::{GroupSpec, TabId, TabRecord};
use crate::ports::{GroupUpdate, PlatformError, TabPlatform};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    pub collapse_others: bool,
    /// Active tab resolved right before applying.
    pub active_tab: Option<TabId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFailure {
    pub name: String,
    pub reason: String,
}

/// What `apply_groups` actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    /// Groups with no surviving tab.
    pub skipped_empty: usize,
    pub failed: Vec<GroupFailure>,
}

impl ApplyReport {
    /// Some groups could not be created. Not fatal for the task.
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct TabMutationApplier {
    platform: Arc<dyn TabPlatform>,
}

impl TabMutationApplier {
    pub fn new(platform: Arc<dyn TabPlatform>) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &Arc<dyn TabPlatform> {
        &self.platform
    }

    pub async fn list_tabs(&self) -> Result<Vec<TabRecord>, PlatformError> {
        self.platform.list_tabs().await
    }

    /// Remove every tab of the window from its group. Returns how many tabs
    /// were ungrouped. Only failing to enumerate grouped tabs is an error.
    pub async fn ungroup_all(&self) -> Result<usize, PlatformError> {
        let grouped = self.platform.grouped_tabs().await?;
        if grouped.is_empty() {
            return Ok(0);
        }

        match self.platform.ungroup(&grouped).await {
            Ok(()) => Ok(grouped.len()),
            Err(err) => {
                tracing::warn!(%err, tabs = grouped.len(), "bulk ungroup failed, ungrouping one by one");
                let mut ungrouped = 0;
                for tab in grouped {
                    match self.platform.ungroup_one(tab).await {
                        Ok(()) => ungrouped += 1,
                        Err(PlatformError::TabNotFound(_)) => {}
                        Err(err) => tracing::warn!(%tab, %err, "failed to ungroup tab"),
                    }
                }
                Ok(ungrouped)
            }
        }
    }

    pub async fn apply_groups(&self, groups: &[GroupSpec], options: ApplyOptions) -> ApplyReport {
        let mut report = ApplyReport::default();

        for group in groups {
            let live = self.live_tabs(&group.tab_ids).await;
            if live.is_empty() {
                tracing::debug!(group = %group.name, "no live tabs left, skipping group");
                report.skipped_empty += 1;
                continue;
            }

            let holds_active = options.active_tab.is_some_and(|active| live.contains(&active));
            let update = GroupUpdate {
                title: group.name.clone(),
                color: group.color,
                collapsed: options.collapse_others && !holds_active,
            };

            match self.create_group(&live, &update).await {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    tracing::warn!(group = %group.name, %err, "failed to create tab group");
                    report.failed.push(GroupFailure {
                        name: group.name.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Existence is re-checked here because the snapshot may be minutes old.
    async fn live_tabs(&self, tabs: &[TabId]) -> Vec<TabId> {
        let mut live = Vec::with_capacity(tabs.len());
        for tab in tabs {
            match self.platform.tab_exists(*tab).await {
                Ok(true) => live.push(*tab),
                Ok(false) => {}
                Err(err) => tracing::warn!(%tab, %err, "could not check tab, leaving it out"),
            }
        }
        live
    }

    async fn create_group(&self, tabs: &[TabId], update: &GroupUpdate) -> Result<(), PlatformError> {
        let group = self.platform.create_group(tabs).await?;
        self.platform.update_group(group, update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GroupColor;
    use crate::impls::InMemoryTabPlatform;

    fn window() -> Arc<InMemoryTabPlatform> {
        Arc::new(InMemoryTabPlatform::new(vec![
            TabRecord::new(1, "Gmail", "https://mail.google.com/"),
            TabRecord::new(2, "Repo", "https://github.com/org/repo"),
            TabRecord::new(3, "Docs", "https://docs.rs/tokio"),
            TabRecord::new(4, "News", "https://news.example.com/"),
        ]))
    }

    fn ids(raw: &[i64]) -> Vec<TabId> {
        raw.iter().copied().map(TabId::new).collect()
    }

    #[tokio::test]
    async fn ungroup_all_uses_bulk_call() {
        let platform = window();
        platform.seed_group("old", GroupColor::Red, &ids(&[1, 2]));
        platform.seed_group("older", GroupColor::Blue, &ids(&[4]));
        let applier = TabMutationApplier::new(platform.clone());

        let ungrouped = applier.ungroup_all().await.unwrap();

        assert_eq!(ungrouped, 3);
        assert!(platform.groups().is_empty());
    }

    #[tokio::test]
    async fn ungroup_all_falls_back_to_single_tabs() {
        let platform = window();
        platform.seed_group("old", GroupColor::Red, &ids(&[1, 2, 3]));
        platform.fail_bulk_ungroup(true);
        let applier = TabMutationApplier::new(platform.clone());

        let ungrouped = applier.ungroup_all().await.unwrap();

        assert_eq!(ungrouped, 3);
        assert!(platform.groups().is_empty());
    }

    #[tokio::test]
    async fn ungroup_all_with_nothing_grouped_is_a_no_op() {
        let applier = TabMutationApplier::new(window());
        assert_eq!(applier.ungroup_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn collapses_every_group_but_the_active_one() {
        let platform = window();
        let applier = TabMutationApplier::new(platform.clone());
        let groups = vec![
            GroupSpec::new("Mail", GroupColor::Blue, ids(&[1])),
            GroupSpec::new("Code", GroupColor::Green, ids(&[2, 3])),
        ];

        let report = applier
            .apply_groups(
                &groups,
                ApplyOptions {
                    collapse_others: true,
                    active_tab: Some(TabId::new(3)),
                },
            )
            .await;

        assert_eq!(report.applied, 2);
        let created = platform.groups();
        let mail = created.iter().find(|g| g.title == "Mail").unwrap();
        let code = created.iter().find(|g| g.title == "Code").unwrap();
        assert!(mail.collapsed);
        assert!(!code.collapsed);
        assert_eq!(code.color, GroupColor::Green);
        assert_eq!(code.tabs, ids(&[2, 3]));
    }

    #[tokio::test]
    async fn nothing_collapses_when_option_is_off() {
        let platform = window();
        let applier = TabMutationApplier::new(platform.clone());
        let groups = vec![GroupSpec::new("Mail", GroupColor::Blue, ids(&[1]))];

        applier
            .apply_groups(
                &groups,
                ApplyOptions {
                    collapse_others: false,
                    active_tab: None,
                },
            )
            .await;

        assert!(!platform.groups()[0].collapsed);
    }

    #[tokio::test]
    async fn closed_tabs_are_left_out_and_empty_groups_skipped() {
        let platform = window();
        let applier = TabMutationApplier::new(platform.clone());
        platform.close_tab(TabId::new(1));
        platform.close_tab(TabId::new(3));
        let groups = vec![
            GroupSpec::new("Mail", GroupColor::Blue, ids(&[1])),
            GroupSpec::new("Code", GroupColor::Green, ids(&[2, 3])),
        ];

        let report = applier.apply_groups(&groups, ApplyOptions::default()).await;

        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped_empty, 1);
        let created = platform.groups();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].tabs, ids(&[2]));
    }

    #[tokio::test]
    async fn one_failing_group_does_not_stop_the_rest() {
        let platform = window();
        platform.reject_groups_with(TabId::new(2));
        let applier = TabMutationApplier::new(platform.clone());
        let groups = vec![
            GroupSpec::new("Code", GroupColor::Green, ids(&[2])),
            GroupSpec::new("Mail", GroupColor::Blue, ids(&[1])),
            GroupSpec::new("Reading", GroupColor::Yellow, ids(&[3, 4])),
        ];

        let report = applier.apply_groups(&groups, ApplyOptions::default()).await;

        assert_eq!(report.applied, 2);
        assert!(report.is_partial());
        assert_eq!(report.failed[0].name, "Code");
        assert_eq!(platform.groups().len(), 2);
    }
}
