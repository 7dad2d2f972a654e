//! Response parsing - AI の回答を検証済みの GroupSpec に変換
//!
//! 回答の形は信用しません。各フィールドを確認してから使います。
//! - 外側: `{choices: [{message: {content: "..."}}]}`
//! - content: ```json フェンス付きでもよい
//! - 中身: `{groups: [{name, color, tabIds}]}`

use std::collections::HashSet;

use serde_json::Value;

use crate::domain::{GroupColor, GroupSpec, OrganizeError, TabIndexMapping};

/// Name used when the model leaves one out.
pub const PLACEHOLDER_NAME: &str = "Untitled";

/// Pull `choices[0].message.content` out of a completion body.
pub fn extract_content(body: &str) -> Result<String, OrganizeError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|_| malformed("the completion body is not JSON"))?;

    let content = value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("the completion has no message content"))?;

    if content.trim().is_empty() {
        return Err(malformed("the completion message is empty"));
    }
    Ok(content.to_string())
}

/// Remove a surrounding ``` fence (with or without a language tag).
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Language tag ("json", "JSON"), whether or not a newline follows it.
    let tag_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let rest = rest[tag_len..].trim_start();
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// Parse and validate the grouping payload, mapping ordinals to tab ids.
///
/// Ordinals outside the snapshot are dropped. A tab is only placed in the
/// first group that mentions it.
pub fn parse_groups(
    content: &str,
    mapping: &TabIndexMapping,
) -> Result<Vec<GroupSpec>, OrganizeError> {
    let payload: Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|_| malformed("the answer is not valid JSON"))?;

    let Value::Object(payload) = payload else {
        return Err(malformed("the answer is not a JSON object"));
    };
    let groups = payload
        .get("groups")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("the answer has no \"groups\" array"))?;

    if groups.is_empty() {
        return Err(OrganizeError::EmptyResult);
    }

    let mut assigned = HashSet::new();
    let mut specs = Vec::with_capacity(groups.len());
    for (index, group) in groups.iter().enumerate() {
        let Value::Object(group) = group else {
            return Err(malformed(&format!("group #{index} is not an object")));
        };

        let name = group
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(PLACEHOLDER_NAME);

        let color = GroupColor::coerce(group.get("color").and_then(Value::as_str));

        let tab_ids = group
            .get("tabIds")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(ordinal_of)
                    .filter_map(|ordinal| mapping.tab_id(ordinal))
                    .filter(|tab_id| assigned.insert(*tab_id))
                    .collect()
            })
            .unwrap_or_default();

        specs.push(GroupSpec::new(name, color, tab_ids));
    }
    Ok(specs)
}

/// Integers, and integer strings ("3"), are accepted.
fn ordinal_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn malformed(reason: &str) -> OrganizeError {
    OrganizeError::MalformedResponse(reason.to_string())
}
