//! Review model shared by the admin dashboard and the submission client
//!
//! Wire format matches the backend's JSON representation of a review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Placeholder shown while the backend has not produced an AI annotation yet
pub const ANNOTATION_PENDING: &str = "Processing...";

/// Backend-assigned review identifier
///
/// Opaque to the client: only equality and hashing are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub i64);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A submitted review plus its optional AI-derived annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Unique id, immutable once assigned
    pub id: ReviewId,
    /// Reviewed business
    pub business_name: String,
    /// Star rating as sent by the backend (1-5 expected, not guaranteed)
    pub stars: i32,
    /// Review body
    pub text: String,
    /// Creation time; the live channel may omit it
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// AI summary, populated asynchronously
    #[serde(default)]
    pub sentiment_analysis: Option<String>,
    /// AI recommended action, same lifecycle as `sentiment_analysis`
    #[serde(default)]
    pub recommended_action: Option<String>,
}

impl ReviewRecord {
    /// True when `stars` is inside 1..=5
    pub fn has_valid_stars(&self) -> bool {
        StarRating::try_from(i64::from(self.stars)).is_ok()
    }

    /// True once both AI fields are present
    pub fn is_annotated(&self) -> bool {
        self.sentiment_analysis.is_some() && self.recommended_action.is_some()
    }

    pub fn summary_or_pending(&self) -> &str {
        self.sentiment_analysis.as_deref().unwrap_or(ANNOTATION_PENDING)
    }

    pub fn action_or_pending(&self) -> &str {
        self.recommended_action.as_deref().unwrap_or(ANNOTATION_PENDING)
    }

    /// Fill absent AI fields from a later copy of the same review
    ///
    /// Only `None` fields are written; everything else keeps the first value
    /// seen. Returns true if anything changed.
    pub fn merge_annotation(&mut self, newer: &ReviewRecord) -> bool {
        let mut changed = false;

        if self.sentiment_analysis.is_none() && newer.sentiment_analysis.is_some() {
            self.sentiment_analysis = newer.sentiment_analysis.clone();
            changed = true;
        }
        if self.recommended_action.is_none() && newer.recommended_action.is_some() {
            self.recommended_action = newer.recommended_action.clone();
            changed = true;
        }

        changed
    }
}

/// Validated star rating (1..=5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct StarRating(u8);

impl StarRating {
    pub const MIN: StarRating = StarRating(1);
    pub const MAX: StarRating = StarRating(5);

    /// All ratings in ascending order
    pub fn all() -> impl Iterator<Item = StarRating> {
        (Self::MIN.0..=Self::MAX.0).map(StarRating)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for StarRating {
    fn default() -> Self {
        Self::MAX
    }
}

impl TryFrom<i64> for StarRating {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        if (i64::from(Self::MIN.0)..=i64::from(Self::MAX.0)).contains(&value) {
            Ok(StarRating(value as u8))
        } else {
            Err(Error::InvalidInput(format!(
                "star rating must be between 1 and 5, got {}",
                value
            )))
        }
    }
}

impl From<StarRating> for i64 {
    fn from(rating: StarRating) -> i64 {
        i64::from(rating.0)
    }
}

impl FromStr for StarRating {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("not a star rating: {:?}", s)))?;
        StarRating::try_from(value)
    }
}

impl fmt::Display for StarRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Body of `POST /reviews/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub business_name: String,
    pub stars: StarRating,
    pub text: String,
}

impl ReviewDraft {
    /// Build a draft, rejecting blank business name or review text
    pub fn new(business_name: &str, stars: StarRating, text: &str) -> Result<Self> {
        if business_name.trim().is_empty() {
            return Err(Error::InvalidInput("business name is required".to_string()));
        }
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("review text is required".to_string()));
        }

        Ok(Self {
            business_name: business_name.to_string(),
            stars,
            text: text.to_string(),
        })
    }
}

/// Timestamp codec accepting RFC 3339 and naive ISO-8601 (read as UTC)
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_deserialize_backend_listing_row() {
        let json = r#"{
            "id": 7,
            "business_name": "Joe's Pizza",
            "stars": 4,
            "text": "Great crust",
            "sentiment_analysis": "Positive about crust",
            "recommended_action": "Keep it up",
            "created_at": "2024-03-01T12:30:00.123456+00:00"
        }"#;

        let record: ReviewRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, ReviewId(7));
        assert_eq!(record.stars, 4);
        assert!(record.is_annotated());
        assert_eq!(
            record.created_at.unwrap().timestamp(),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap().timestamp()
        );
    }

    #[test]
    fn test_deserialize_naive_timestamp_as_utc() {
        let json = r#"{"id":1,"business_name":"A","stars":3,"text":"ok","created_at":"2024-03-01T08:00:00"}"#;
        let record: ReviewRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            record.created_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_deserialize_live_event_without_annotation_or_time() {
        let json = r#"{"id":2,"business_name":"Bad Cafe","stars":2,"text":"cold","sentiment_analysis":null,"recommended_action":null,"created_at":null}"#;
        let record: ReviewRecord = serde_json::from_str(json).unwrap();
        assert!(record.created_at.is_none());
        assert!(!record.is_annotated());
        assert_eq!(record.summary_or_pending(), ANNOTATION_PENDING);
        assert_eq!(record.action_or_pending(), ANNOTATION_PENDING);
    }

    #[test]
    fn test_deserialize_rejects_garbage_timestamp() {
        let json = r#"{"id":2,"business_name":"X","stars":2,"text":"t","created_at":"yesterday"}"#;
        assert!(serde_json::from_str::<ReviewRecord>(json).is_err());
    }

    #[test]
    fn test_out_of_range_stars_still_parse() {
        let json = r#"{"id":3,"business_name":"X","stars":9,"text":"t"}"#;
        let record: ReviewRecord = serde_json::from_str(json).unwrap();
        assert!(!record.has_valid_stars());
    }

    #[test]
    fn test_merge_annotation_fills_only_missing_fields() {
        let mut stored: ReviewRecord = serde_json::from_str(
            r#"{"id":1,"business_name":"A","stars":5,"text":"t","recommended_action":"Thank them"}"#,
        )
        .unwrap();
        let mut newer = stored.clone();
        newer.business_name = "Renamed".to_string();
        newer.sentiment_analysis = Some("Happy".to_string());
        newer.recommended_action = Some("Other".to_string());

        assert!(stored.merge_annotation(&newer));
        assert_eq!(stored.sentiment_analysis.as_deref(), Some("Happy"));
        assert_eq!(stored.recommended_action.as_deref(), Some("Thank them"));
        assert_eq!(stored.business_name, "A");

        // Second merge has nothing left to fill
        assert!(!stored.merge_annotation(&newer));
    }

    #[test]
    fn test_star_rating_bounds() {
        assert!(StarRating::try_from(0i64).is_err());
        assert!(StarRating::try_from(6i64).is_err());
        assert_eq!(StarRating::try_from(3i64).unwrap().get(), 3);
        assert_eq!("5".parse::<StarRating>().unwrap(), StarRating::MAX);
        assert!("five".parse::<StarRating>().is_err());
        assert_eq!(StarRating::all().count(), 5);
        assert_eq!(StarRating::default(), StarRating::MAX);
    }

    #[test]
    fn test_draft_requires_name_and_text() {
        assert!(ReviewDraft::new("  ", StarRating::MAX, "text").is_err());
        assert!(ReviewDraft::new("Cafe", StarRating::MAX, "").is_err());

        let draft = ReviewDraft::new("Cafe", StarRating::try_from(4i64).unwrap(), "Nice").unwrap();
        let body = serde_json::to_value(&draft).unwrap();
        assert_eq!(body["business_name"], "Cafe");
        assert_eq!(body["stars"], 4);
        assert_eq!(body["text"], "Nice");
    }
}
