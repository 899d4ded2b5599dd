//! HTTP client for the prediction backend.

use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to parse response from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/api/v1/predictions/{id}/result`
    pub fn prediction_result_url(&self, prediction_id: &str) -> String {
        format!(
            "{}/api/v1/predictions/{}/result",
            self.base_url,
            urlencoding::encode(prediction_id)
        )
    }

    /// `{base}/api/v1/predictions/{id}/agents`
    pub fn prediction_agents_url(&self, prediction_id: &str) -> String {
        format!(
            "{}/api/v1/predictions/{}/agents",
            self.base_url,
            urlencoding::encode(prediction_id)
        )
    }

    /// Fetch the prediction result (carries the causal graph)
    pub fn fetch_prediction_result(&self, prediction_id: &str) -> Result<Value, ApiError> {
        self.get_json(self.prediction_result_url(prediction_id))
    }

    /// Fetch the agent simulation payload
    pub fn fetch_prediction_agents(&self, prediction_id: &str) -> Result<Value, ApiError> {
        self.get_json(self.prediction_agents_url(prediction_id))
    }

    fn get_json(&self, url: String) -> Result<Value, ApiError> {
        debug!(%url, "GET");
        let resp = match self.client.get(&url).send() {
            Ok(resp) => resp,
            Err(source) => return Err(ApiError::Request { url, source }),
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }

        resp.json().map_err(|source| ApiError::Parse { url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_from_base() {
        let client = ApiClient::new("http://localhost:9000/").expect("client");
        assert_eq!(client.base_url(), "http://localhost:9000");
        assert_eq!(
            client.prediction_result_url("abc-123"),
            "http://localhost:9000/api/v1/predictions/abc-123/result"
        );
        assert_eq!(
            client.prediction_agents_url("a b/c"),
            "http://localhost:9000/api/v1/predictions/a%20b%2Fc/agents"
        );
    }

    #[test]
    fn unreachable_backend_is_a_request_error() {
        // Port 9 (discard) is not served on loopback in test environments
        let client = ApiClient::new("http://127.0.0.1:9").expect("client");
        match client.fetch_prediction_result("x") {
            Err(ApiError::Request { url, .. }) => assert!(url.ends_with("/x/result")),
            other => panic!("expected request error, got {other:?}"),
        }
    }
}
