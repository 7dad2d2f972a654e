//! GroupingClient - AI にタブのグループ分けを依頼する
//!
//! # フロー
//! 1. タブ → 序数マッピング
//! 2. リクエスト構築（system: 方針, user: 序数付きタブ一覧）
//! 3. 送信（試行ごとに 60 秒の上限、指数バックオフでリトライ）
//! 4. content 抽出 → JSON 検証 → 序数を TabId に戻す
//!
//! キャンセルはどの時点でも即座に `OrganizeError::Cancelled` を返し、
//! リトライ回数を消費しません。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::request::ChatRequest;
use super::response;
use super::retry::{RetryPolicy, StatusClass, classify_status, status_reason};
use crate::config::AiConfig;
use crate::domain::{GroupSpec, OrganizeError, TabIndexMapping, TabRecord};
use crate::ports::{ChatTransport, DebugSink};

/// Provider bodies are cut to this length before they reach the debug log.
const MAX_LOGGED_BODY: usize = 2000;

pub struct GroupingClient {
    transport: Arc<dyn ChatTransport>,
    policy: RetryPolicy,
}

impl GroupingClient {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self::with_policy(transport, RetryPolicy::default())
    }

    pub fn with_policy(transport: Arc<dyn ChatTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Ask the model to group `tabs`.
    ///
    /// Every returned tab id comes from `tabs`.
    pub async fn organize(
        &self,
        tabs: &[TabRecord],
        config: &AiConfig,
        cancel: &CancellationToken,
        debug: &dyn DebugSink,
    ) -> Result<Vec<GroupSpec>, OrganizeError> {
        if tabs.is_empty() {
            return Err(OrganizeError::NoTabs);
        }

        let mapping = TabIndexMapping::from_tabs(tabs);
        let request = ChatRequest::for_tabs(config, tabs);
        debug.push(format!(
            "sending {} tabs to model {} (reasoning effort: {:?})",
            mapping.len(),
            request.model,
            config.reasoning_effort
        ));

        let body = self
            .send_with_retry(&config.completions_url(), &config.api_key, &request, cancel, debug)
            .await?;

        let content = response::extract_content(&body).inspect_err(|_| {
            debug.push(format!("unusable completion body: {}", truncate_for_log(&body)));
        })?;
        debug.push(format!("model answer: {}", truncate_for_log(&content)));

        let groups = response::parse_groups(&content, &mapping).inspect_err(|err| {
            debug.push(format!("answer rejected: {err}"));
        })?;

        let left_out: Vec<usize> = tabs
            .iter()
            .filter(|tab| !groups.iter().any(|g| g.tab_ids.contains(&tab.id)))
            .filter_map(|tab| mapping.ordinal(tab.id))
            .collect();
        if !left_out.is_empty() {
            debug.push(format!("ordinals the model left out: {left_out:?}"));
        }

        tracing::info!(
            groups = groups.len(),
            tabs = mapping.len(),
            left_out = left_out.len(),
            "AI proposed groups"
        );
        Ok(groups)
    }

    /// Returns the body of the first successful response.
    async fn send_with_retry(
        &self,
        url: &str,
        api_key: &str,
        request: &ChatRequest,
        cancel: &CancellationToken,
        debug: &dyn DebugSink,
    ) -> Result<String, OrganizeError> {
        let max_attempts = self.policy.max_attempts();
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.policy.next_delay(attempt - 1);
                debug.push(format!(
                    "waiting {}ms before attempt {attempt}/{max_attempts}",
                    delay.as_millis()
                ));
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(OrganizeError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if cancel.is_cancelled() {
                return Err(OrganizeError::Cancelled);
            }

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(OrganizeError::Cancelled),
                sent = tokio::time::timeout(
                    self.policy.attempt_timeout,
                    self.transport.send(url, api_key, request),
                ) => sent,
            };

            match sent {
                Err(_elapsed) => {
                    last_reason = "request timed out".to_string();
                    debug.push(format!(
                        "attempt {attempt}/{max_attempts}: no answer within {}s",
                        self.policy.attempt_timeout.as_secs()
                    ));
                }
                Ok(Err(err)) => {
                    last_reason = "network error".to_string();
                    debug.push(format!("attempt {attempt}/{max_attempts}: network error: {err}"));
                }
                Ok(Ok(response)) => {
                    let status = response.status;
                    match classify_status(status) {
                        StatusClass::Success => {
                            debug.push(format!("attempt {attempt}/{max_attempts}: HTTP {status}"));
                            return Ok(response.body);
                        }
                        class => {
                            debug.push(format!(
                                "attempt {attempt}/{max_attempts}: HTTP {status}: {}",
                                truncate_for_log(&response.body)
                            ));
                            match class {
                                StatusClass::Auth => {
                                    return Err(OrganizeError::auth_for_status(status));
                                }
                                StatusClass::Rejected => {
                                    return Err(OrganizeError::RequestRejected { status });
                                }
                                _ => last_reason = status_reason(status),
                            }
                        }
                    }
                }
            }
            tracing::debug!(attempt, max_attempts, reason = %last_reason, "AI request failed");
        }

        tracing::warn!(attempts = max_attempts, reason = %last_reason, "AI request retries exhausted");
        Err(OrganizeError::TransientApi {
            attempts: max_attempts,
            reason: last_reason,
        })
    }
}

fn truncate_for_log(value: &str) -> String {
    if value.chars().count() > MAX_LOGGED_BODY {
        let truncated: String = value.chars().take(MAX_LOGGED_BODY).collect();
        format!("{truncated}...[truncated]")
    } else {
        value.to_string()
    }
}
