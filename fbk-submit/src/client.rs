//! Review submission client

use fbk_common::api::ApiError;
use fbk_common::{ApiClient, ClientConfig, ReviewDraft, ReviewRecord};
use thiserror::Error;
use tracing::{debug, error, info};

/// Submission failure; the caller keeps its form state
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    /// Form failed local validation, nothing was sent
    #[error("{0}")]
    Invalid(String),

    #[error("Failed to submit review: {0}")]
    Network(String),

    #[error("Failed to submit review (HTTP {status})")]
    Status { status: u16, body: String },

    #[error("Failed to submit review: unexpected response ({0})")]
    Decode(String),
}

impl From<ApiError> for SubmissionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(msg) => SubmissionError::Network(msg),
            ApiError::Status { status, body } => SubmissionError::Status { status, body },
            ApiError::Decode(msg) => SubmissionError::Decode(msg),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionClient {
    api: ApiClient,
}

impl SubmissionClient {
    pub fn new(config: ClientConfig) -> fbk_common::Result<Self> {
        Ok(Self::with_api(ApiClient::new(config)?))
    }

    pub fn with_api(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// POST the draft; returns the stored review (possibly already annotated)
    pub async fn submit(&self, draft: &ReviewDraft) -> Result<ReviewRecord, SubmissionError> {
        debug!(business = %draft.business_name, stars = %draft.stars, "Submitting review");

        match self.api.create_review(draft).await {
            Ok(record) => {
                info!(
                    review_id = %record.id,
                    annotated = record.is_annotated(),
                    "Review submitted"
                );
                Ok(record)
            }
            Err(e) => {
                error!("Review submission failed: {}", e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_is_generic_for_users() {
        let err = SubmissionError::from(ApiError::Status {
            status: 422,
            body: "{\"detail\":\"stars\"}".to_string(),
        });
        assert_eq!(err.to_string(), "Failed to submit review (HTTP 422)");
    }
}
