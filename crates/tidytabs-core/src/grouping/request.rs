//! Chat completion request body.

use serde::{Deserialize, Serialize};

use super::prompt;
use crate::config::AiConfig;
use crate::domain::TabRecord;

pub const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// `POST {endpoint}/chat/completions` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

impl ChatRequest {
    pub fn for_tabs(config: &AiConfig, tabs: &[TabRecord]) -> Self {
        Self {
            model: config.model.trim().to_string(),
            messages: vec![
                ChatMessage::system(prompt::system_prompt()),
                ChatMessage::user(prompt::tab_listing(tabs)),
            ],
            temperature: TEMPERATURE,
            reasoning_effort: config.reasoning_effort.wire_value().map(str::to_string),
        }
    }
}
