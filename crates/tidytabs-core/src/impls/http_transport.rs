//! HttpTransport - reqwest による ChatTransport 実装（本番用）
//!
//! ステータスの解釈はしません。非 2xx でも本文ごと返し、
//! 分類は GroupingClient に任せます。

use std::time::Duration;

use async_trait::async_trait;

use crate::grouping::ChatRequest;
use crate::ports::{ChatTransport, TransportError, TransportResponse};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Network-level ceiling. The per-attempt wall-clock bound lives in the retry policy.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(
        &self,
        url: &str,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            // without_url: the endpoint may embed tokens in its query string
            .map_err(|e| TransportError(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("failed to read response body: {}", e.without_url())))?;

        tracing::debug!(status, bytes = body.len(), "AI endpoint answered");
        Ok(TransportResponse { status, body })
    }
}
