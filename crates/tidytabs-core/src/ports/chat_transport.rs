//! ChatTransport port - AI エンドポイントへの HTTP 送信
//!
//! リトライ・タイムアウト・ステータス分類は GroupingClient 側の責務。
//! transport は 1 回送って status と本文を返すだけです。

use async_trait::async_trait;
use thiserror::Error;

use crate::grouping::ChatRequest;

/// Raw HTTP answer. The body is never shown to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure before any HTTP status was received (DNS, TLS, reset, ...).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(
        &self,
        url: &str,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<TransportResponse, TransportError>;
}
