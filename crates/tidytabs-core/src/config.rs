//! Config - AI エンドポイント設定と整理オプション
//!
//! 設定の保存は UI 側の責務。ここでは形と検証だけを持ちます。
//! 検証はタスク開始前に行い、失敗したら running には入りません。

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Reasoning effort hint forwarded to the model. `Off` omits the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    #[default]
    Off,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    /// Wire value, or `None` when the field must be left out.
    pub fn wire_value(self) -> Option<&'static str> {
        match self {
            ReasoningEffort::Off => None,
            ReasoningEffort::Low => Some("low"),
            ReasoningEffort::Medium => Some("medium"),
            ReasoningEffort::High => Some("high"),
        }
    }
}

/// Connection settings for an OpenAI-compatible chat completion endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`. `/chat/completions` is appended.
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub reasoning_effort: ReasoningEffort,
}

// api_key stays out of logs.
impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("reasoning_effort", &self.reasoning_effort)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("API endpoint is not a valid http(s) URL: {0}")]
    InvalidEndpoint(String),

    #[error("API key is missing")]
    MissingApiKey,

    #[error("model name is missing")]
    MissingModel,
}

impl AiConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            reasoning_effort: ReasoningEffort::Off,
        }
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = effort;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => return Err(ConfigError::InvalidEndpoint(endpoint.to_string())),
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        Ok(())
    }

    /// `{endpoint}/chat/completions`, tolerating a trailing slash on the endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim().trim_end_matches('/'))
    }
}

/// Per-run options chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizeSettings {
    /// Collapse every created group except the one holding the active tab.
    #[serde(default = "default_true")]
    pub collapse_others: bool,

    /// Keep the diagnostic log and attach it to the terminal state.
    #[serde(default)]
    pub debug: bool,
}

impl Default for OrganizeSettings {
    fn default() -> Self {
        Self {
            collapse_others: default_true(),
            debug: false,
        }
    }
}

fn default_true() -> bool {
    true
}
