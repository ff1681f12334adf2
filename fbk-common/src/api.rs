//! HTTP client for the review backend
//!
//! Endpoints:
//! - `GET  /`               health probe
//! - `GET  /reviews/`       full listing (optional `skip`/`limit`)
//! - `GET  /reviews/events` server-sent event stream of new reviews
//! - `POST /reviews/`       create a review

use serde::Deserialize;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::review::{ReviewDraft, ReviewRecord};
use crate::{Error, Result};

const USER_AGENT: &str = concat!("fbk/", env!("CARGO_PKG_VERSION"));

pub const REVIEWS_PATH: &str = "/reviews/";
pub const EVENTS_PATH: &str = "/reviews/events";

/// Backend request errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    message: String,
}

/// Review backend client
///
/// Holds two connection pools: one with the request timeout for
/// request/response calls and one without a total timeout for the
/// long-lived event stream.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(Error::Http)?;

        let stream_http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            http,
            stream_http,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET / - returns the backend's status message
    pub async fn health(&self) -> std::result::Result<String, ApiError> {
        let url = self.config.endpoint("/");
        let response = self.send(self.http.get(&url)).await?;
        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(health.message)
    }

    /// GET /reviews/ - one request for the full listing
    pub async fn list_reviews(&self) -> std::result::Result<Vec<ReviewRecord>, ApiError> {
        let url = self.config.endpoint(REVIEWS_PATH);
        let mut request = self.http.get(&url);
        if let Some(limit) = self.config.list_limit {
            request = request.query(&[("skip", 0u32), ("limit", limit)]);
        }

        tracing::debug!(url = %url, "Fetching review listing");

        let response = self.send(request).await?;
        let records: Vec<ReviewRecord> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        tracing::debug!(count = records.len(), "Review listing received");
        Ok(records)
    }

    /// POST /reviews/ - returns the created review, possibly already annotated
    pub async fn create_review(
        &self,
        draft: &ReviewDraft,
    ) -> std::result::Result<ReviewRecord, ApiError> {
        let url = self.config.endpoint(REVIEWS_PATH);

        tracing::debug!(url = %url, business = %draft.business_name, "Submitting review");

        let response = self.send(self.http.post(&url).json(draft)).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// GET /reviews/events - opens the event stream and checks the status
    ///
    /// The body is left unread; callers consume it with `bytes_stream()`.
    pub async fn open_event_stream(
        &self,
        last_event_id: Option<&str>,
    ) -> std::result::Result<reqwest::Response, ApiError> {
        let url = self.config.endpoint(EVENTS_PATH);
        let mut request = self
            .stream_http
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache");
        // An empty id resets the stream position; the header is omitted then
        if let Some(id) = last_event_id.filter(|id| !id.is_empty()) {
            request = request.header("Last-Event-ID", id);
        }

        self.send(request).await
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<reqwest::Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = ClientConfig::new("http://127.0.0.1:8000/").unwrap();
        let client = ApiClient::new(config).unwrap();
        assert_eq!(client.config().base_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "API error 500: boom");
    }
}
