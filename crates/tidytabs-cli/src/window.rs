//! A browser window described as JSON, loaded into the in-memory platform.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tidytabs_core::impls::InMemoryTabPlatform;
use tidytabs_core::{GroupColor, TabId, TabRecord};

#[derive(Debug, Deserialize)]
pub struct WindowFile {
    pub tabs: Vec<TabRecord>,
    #[serde(default)]
    pub active: Option<TabId>,
    /// Groups that exist before organizing.
    #[serde(default)]
    pub groups: Vec<ExistingGroup>,
}

#[derive(Debug, Deserialize)]
pub struct ExistingGroup {
    pub title: String,
    #[serde(default)]
    pub color: GroupColor,
    pub tabs: Vec<TabId>,
}

impl WindowFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read window file {}", path.display()))?;
        let window: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse window file {}", path.display()))?;

        let known = |id: &TabId| window.tabs.iter().any(|t| t.id == *id);
        if let Some(active) = window.active.filter(|a| !known(a)) {
            bail!("active tab {active} is not in the window");
        }
        for group in &window.groups {
            if let Some(stray) = group.tabs.iter().find(|t| !known(t)) {
                bail!("group {:?} refers to unknown {stray}", group.title);
            }
        }
        Ok(window)
    }

    pub fn into_platform(self) -> InMemoryTabPlatform {
        let platform = InMemoryTabPlatform::new(self.tabs);
        if self.active.is_some() {
            platform.set_active(self.active);
        }
        for group in &self.groups {
            platform.seed_group(&group.title, group.color, &group.tabs);
        }
        platform
    }
}
