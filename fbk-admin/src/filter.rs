//! Query/filter engine for the review list
//!
//! Pure and linear in the number of records; output keeps store order.

use fbk_common::{Error, Result, ReviewRecord, StarRating};
use std::fmt;
use std::str::FromStr;

/// Star predicate selected in the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StarFilter {
    #[default]
    All,
    Exactly(StarRating),
}

impl StarFilter {
    pub fn matches(&self, stars: i32) -> bool {
        match self {
            StarFilter::All => true,
            StarFilter::Exactly(rating) => i64::from(stars) == i64::from(*rating),
        }
    }
}

impl FromStr for StarFilter {
    type Err = Error;

    /// Accepts "all" (any case) or "1".."5"
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(StarFilter::All);
        }
        s.parse::<StarRating>().map(StarFilter::Exactly)
    }
}

impl fmt::Display for StarFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StarFilter::All => write!(f, "all"),
            StarFilter::Exactly(rating) => write!(f, "{}", rating),
        }
    }
}

/// Filter `records` by exact star value AND case-insensitive business-name substring
///
/// An empty `search` matches every record.
pub fn filter<'a>(
    records: &'a [ReviewRecord],
    stars: &StarFilter,
    search: &str,
) -> Vec<&'a ReviewRecord> {
    let matcher = Matcher::new(stars, search);
    records.iter().filter(|r| matcher.matches(r)).collect()
}

/// Predicates with the search needle lowercased once per pass
struct Matcher<'q> {
    stars: &'q StarFilter,
    needle: String,
}

impl<'q> Matcher<'q> {
    fn new(stars: &'q StarFilter, search: &str) -> Self {
        Self {
            stars,
            needle: search.to_lowercase(),
        }
    }

    fn matches(&self, record: &ReviewRecord) -> bool {
        self.stars.matches(record.stars)
            && (self.needle.is_empty() || record.business_name.to_lowercase().contains(&self.needle))
    }
}

/// Both dashboard predicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewQuery {
    pub stars: StarFilter,
    pub search: String,
}

impl ReviewQuery {
    pub fn new(stars: StarFilter, search: impl Into<String>) -> Self {
        Self {
            stars,
            search: search.into(),
        }
    }

    pub fn apply<'a>(&self, records: &'a [ReviewRecord]) -> Vec<&'a ReviewRecord> {
        filter(records, &self.stars, &self.search)
    }

    /// Indices into `records` of the matching rows, in order
    pub fn matching_indices(&self, records: &[ReviewRecord]) -> Vec<usize> {
        let matcher = Matcher::new(&self.stars, &self.search);
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| matcher.matches(r))
            .map(|(i, _)| i)
            .collect()
    }
}
