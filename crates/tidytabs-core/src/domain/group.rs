//! Group model: what the AI proposes and the applier creates.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::tab::TabId;

/// Fixed color palette supported by browser tab groups.
///
/// Anything outside the palette is coerced to `Grey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    #[default]
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

impl GroupColor {
    pub const ALL: [GroupColor; 9] = [
        GroupColor::Grey,
        GroupColor::Blue,
        GroupColor::Red,
        GroupColor::Yellow,
        GroupColor::Green,
        GroupColor::Pink,
        GroupColor::Purple,
        GroupColor::Cyan,
        GroupColor::Orange,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GroupColor::Grey => "grey",
            GroupColor::Blue => "blue",
            GroupColor::Red => "red",
            GroupColor::Yellow => "yellow",
            GroupColor::Green => "green",
            GroupColor::Pink => "pink",
            GroupColor::Purple => "purple",
            GroupColor::Cyan => "cyan",
            GroupColor::Orange => "orange",
        }
    }

    /// Lenient parse used on AI output. Case and surrounding whitespace are ignored.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
    }

    /// Same as [`GroupColor::parse_lenient`], falling back to the default color.
    pub fn coerce(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse_lenient).unwrap_or_default()
    }
}

impl fmt::Display for GroupColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated group proposal with concrete tab ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub color: GroupColor,
    /// Ordered, duplicate free.
    pub tab_ids: Vec<TabId>,
}

impl GroupSpec {
    pub fn new(name: impl Into<String>, color: GroupColor, tab_ids: Vec<TabId>) -> Self {
        Self {
            name: name.into(),
            color,
            tab_ids,
        }
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tab_ids.contains(&tab_id)
    }
}
