//! Review form state
//!
//! Mirrors the web submission form: stars default to 5, both text fields
//! are required, a successful submit clears the form and a failed one
//! leaves it as typed.

use fbk_common::{ReviewDraft, ReviewRecord, StarRating};
use serde::Serialize;

use crate::client::{SubmissionClient, SubmissionError};

pub const SUCCESS_MESSAGE: &str = "Review submitted successfully!";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewForm {
    pub business_name: String,
    pub stars: StarRating,
    pub text: String,
}

/// AI feedback returned with the created review
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiResponse {
    pub summary: String,
    pub action: Option<String>,
}

impl AiResponse {
    /// Present only when the backend already produced a summary
    pub fn from_record(record: &ReviewRecord) -> Option<Self> {
        record.sentiment_analysis.as_ref().map(|summary| Self {
            summary: summary.clone(),
            action: record.recommended_action.clone(),
        })
    }
}

/// Result of a successful submit; serializes as the `--json` output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionOutcome {
    pub record: ReviewRecord,
    pub ai_response: Option<AiResponse>,
}

impl SubmissionOutcome {
    pub fn message(&self) -> &'static str {
        SUCCESS_MESSAGE
    }
}

impl ReviewForm {
    pub fn new(business_name: &str, stars: StarRating, text: &str) -> Self {
        Self {
            business_name: business_name.to_string(),
            stars,
            text: text.to_string(),
        }
    }

    /// Set the rating from raw input (1-5)
    pub fn set_stars(&mut self, stars: i64) -> Result<(), SubmissionError> {
        self.stars =
            StarRating::try_from(stars).map_err(|e| SubmissionError::Invalid(e.to_string()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<ReviewDraft, SubmissionError> {
        ReviewDraft::new(&self.business_name, self.stars, &self.text)
            .map_err(|e| SubmissionError::Invalid(e.to_string()))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Validate and send; clears the form only on success
    pub async fn submit(
        &mut self,
        client: &SubmissionClient,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let draft = self.validate()?;
        let record = client.submit(&draft).await?;

        self.reset();
        Ok(SubmissionOutcome {
            ai_response: AiResponse::from_record(&record),
            record,
        })
    }
}
