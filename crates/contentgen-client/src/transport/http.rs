use futures::StreamExt as _;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::{ClientError, TransportError};
use crate::request::Request;
use crate::response::{ErrorBody, ResponseMeta, UsageHistoryItem, UsageRecentBody};

use super::{ByteStream, InferenceTransport};

const REQUEST_FAILED: &str = "Request failed";
const HISTORY_FAILED: &str = "Failed to fetch usage";

/// `InferenceTransport` over the service's HTTP API.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a transport from explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        // The total timeout is applied per buffered call; a stream may
        // legitimately stay open longer than that.
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a transport from `CONTENTGEN_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Reads a failure body and picks the best message available.
async fn failure(response: reqwest::Response, fallback: &str) -> TransportError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .ok()
        .and_then(|body| serde_json::from_str::<serde_json::Value>(&body).ok())
        .and_then(|value| ErrorBody::message_from(&value))
        .unwrap_or_else(|| fallback.to_string());
    TransportError::http(status, message)
}

fn network(err: reqwest::Error) -> TransportError {
    TransportError::network(format!("request failed: {err}"))
}

#[async_trait::async_trait]
impl InferenceTransport for HttpTransport {
    async fn complete(&self, request: &Request) -> Result<ResponseMeta, TransportError> {
        let url = self.config.endpoint("ai");
        debug!(event = "http.complete_request", domain = "http", task = %request.task, url = %url);
        let response = self
            .client
            .post(&url)
            .timeout(self.config.timeout)
            .json(&request.to_body())
            .send()
            .await
            .map_err(network)?;
        if !response.status().is_success() {
            return Err(failure(response, REQUEST_FAILED).await);
        }
        let body = response.text().await.map_err(network)?;
        debug!(
            event = "http.complete_response",
            domain = "http",
            response_bytes = body.len() as u64
        );
        serde_json::from_str(&body)
            .map_err(|e| TransportError::decode(format!("invalid response body: {e}")))
    }

    async fn open_stream(&self, request: &Request) -> Result<ByteStream, TransportError> {
        let url = self.config.endpoint("ai/stream");
        debug!(event = "http.stream_request", domain = "http", task = %request.task, url = %url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request.to_body())
            .send()
            .await
            .map_err(network)?;
        if !response.status().is_success() {
            return Err(failure(response, REQUEST_FAILED).await);
        }
        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(|e| TransportError::network(format!("stream read failed: {e}"))));
        Ok(Box::pin(stream))
    }

    async fn recent_usage(&self) -> Result<Vec<UsageHistoryItem>, TransportError> {
        let url = self.config.endpoint("usage/recent");
        let response = self
            .client
            .get(&url)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(network)?;
        if !response.status().is_success() {
            return Err(failure(response, HISTORY_FAILED).await);
        }
        let body: UsageRecentBody = response
            .json()
            .await
            .map_err(|e| TransportError::decode(format!("invalid usage body: {e}")))?;
        Ok(body.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_base_url() {
        let result = HttpTransport::new(ClientConfig::default().base_url("  "));
        assert!(matches!(result, Err(ClientError::Config(msg)) if msg.contains("base_url")));
    }

    #[test]
    fn keeps_config_for_endpoints() {
        let transport =
            HttpTransport::new(ClientConfig::default().base_url("http://127.0.0.1:1")).expect("transport");
        assert_eq!(
            transport.config().endpoint("usage/recent"),
            "http://127.0.0.1:1/api/v1/usage/recent"
        );
        assert!(transport.supports_streaming());
    }
}
