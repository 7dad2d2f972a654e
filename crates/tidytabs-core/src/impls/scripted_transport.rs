//! ScriptedTransport - 台本どおりに応答する ChatTransport（開発・テスト用）
//!
//! 応答を順番に返し、台本が尽きたら `repeating` で指定した応答を返し続けます。
//! 呼び出し時刻（tokio の Instant）を記録するので、バックオフ間隔を
//! 一時停止した時計で検証できます。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::grouping::ChatRequest;
use crate::ports::{ChatTransport, TransportError, TransportResponse};

type Reply = Result<TransportResponse, TransportError>;
type SendHook = Box<dyn Fn(usize) + Send + Sync>;

/// One recorded `send` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub api_key: String,
    pub request: ChatRequest,
    pub at: Instant,
}

pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Option<Reply>,
    latency: Duration,
    on_send: Option<SendHook>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Reply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            latency: Duration::ZERO,
            on_send: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with `response`.
    pub fn repeating(response: TransportResponse) -> Self {
        Self {
            fallback: Some(Ok(response)),
            ..Self::new(Vec::new())
        }
    }

    /// A 200 completion whose message content is `content`.
    pub fn answer(content: &str) -> TransportResponse {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        });
        TransportResponse::new(200, body.to_string())
    }

    /// Wait this long (on the tokio clock) before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Run `hook(call_index)` at the start of every call, e.g. to close a tab
    /// while the AI is "thinking".
    pub fn on_send(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_send = Some(Box::new(hook));
        self
    }

    pub fn calls(&self) -> usize {
        self.lock_calls().len()
    }

    pub fn requests(&self) -> Vec<RecordedCall> {
        self.lock_calls().clone()
    }

    /// Time between consecutive calls.
    pub fn gaps(&self) -> Vec<Duration> {
        let calls = self.lock_calls();
        calls
            .windows(2)
            .map(|pair| pair[1].at.duration_since(pair[0].at))
            .collect()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_reply(&self) -> Reply {
        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        scripted
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Err(TransportError("no scripted reply left".to_string())))
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(
        &self,
        url: &str,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<TransportResponse, TransportError> {
        let index = {
            let mut calls = self.lock_calls();
            calls.push(RecordedCall {
                url: url.to_string(),
                api_key: api_key.to_string(),
                request: request.clone(),
                at: Instant::now(),
            });
            calls.len() - 1
        };
        if let Some(hook) = &self.on_send {
            hook(index);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.next_reply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiConfig;

    fn request() -> ChatRequest {
        ChatRequest::for_tabs(&AiConfig::new("https://a.example/v1", "k", "m"), &[])
    }

    #[tokio::test]
    async fn script_then_fallback() {
        let transport = ScriptedTransport {
            fallback: Some(Ok(TransportResponse::new(503, ""))),
            ..ScriptedTransport::new(vec![Ok(TransportResponse::new(200, "first"))])
        };

        let first = transport.send("u", "k", &request()).await.unwrap();
        let second = transport.send("u", "k", &request()).await.unwrap();
        let third = transport.send("u", "k", &request()).await.unwrap();

        assert_eq!(first.body, "first");
        assert_eq!(second.status, 503);
        assert_eq!(third.status, 503);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn exhausted_script_is_a_transport_error() {
        let transport = ScriptedTransport::new(vec![]);
        assert!(transport.send("u", "k", &request()).await.is_err());
    }

    #[test]
    fn answer_wraps_content_in_a_completion() {
        let response = ScriptedTransport::answer("{\"groups\":[]}");
        let v: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(v["choices"][0]["message"]["content"], "{\"groups\":[]}");
        assert!(response.is_success());
    }
}
