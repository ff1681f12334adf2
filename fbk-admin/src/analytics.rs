//! Analytics projections over the full (unfiltered) review set
//!
//! Four projections: total count, mean rating, star histogram and the
//! low/high sentiment split. Each has a from-scratch function over a record
//! slice; `StarTally` maintains the same numbers incrementally so the store
//! does not rescan on every push. Both paths must agree.
//!
//! Records with `stars` outside 1..=5 never land in a histogram or sentiment
//! bucket. They are counted as `out_of_range` instead.

use fbk_common::{ReviewRecord, StarRating};

/// Highest star value counted as "needs attention"
pub const SENTIMENT_THRESHOLD: i32 = 3;

pub const LOW_SENTIMENT_LABEL: &str = "Needs Attention (≤3★)";
pub const HIGH_SENTIMENT_LABEL: &str = "Satisfied (>3★)";

pub fn total_count(records: &[ReviewRecord]) -> usize {
    records.len()
}

/// sum(stars) / count, or 0.0 for an empty set
pub fn average_rating(records: &[ReviewRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let sum: i64 = records.iter().map(|r| i64::from(r.stars)).sum();
    sum as f64 / records.len() as f64
}

pub fn star_histogram(records: &[ReviewRecord]) -> StarHistogram {
    let mut histogram = StarHistogram::default();
    for record in records {
        if let Some(index) = bucket_index(record.stars) {
            histogram.counts[index] += 1;
        }
    }
    histogram
}

pub fn sentiment_split(records: &[ReviewRecord]) -> SentimentSplit {
    records
        .iter()
        .filter(|r| bucket_index(r.stars).is_some())
        .fold(SentimentSplit::default(), |mut split, r| {
            if r.stars <= SENTIMENT_THRESHOLD {
                split.low += 1;
            } else {
                split.high += 1;
            }
            split
        })
}

fn bucket_index(stars: i32) -> Option<usize> {
    StarRating::try_from(i64::from(stars))
        .ok()
        .map(|rating| usize::from(rating.get() - 1))
}

/// Visual tone of a histogram bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketTone {
    /// 1-2 stars
    Negative,
    /// 3 stars
    Neutral,
    /// 4-5 stars
    Positive,
}

impl BucketTone {
    pub fn for_rating(rating: StarRating) -> Self {
        match rating.get() {
            1 | 2 => BucketTone::Negative,
            3 => BucketTone::Neutral,
            _ => BucketTone::Positive,
        }
    }
}

/// One bar of the star distribution chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarBucket {
    pub rating: StarRating,
    pub count: usize,
    pub tone: BucketTone,
    /// e.g. "4 ★"
    pub label: String,
}

/// Count of records per exact star value 1..=5
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StarHistogram {
    counts: [usize; 5],
}

impl StarHistogram {
    pub fn count(&self, rating: StarRating) -> usize {
        self.counts[usize::from(rating.get() - 1)]
    }

    /// Sum over all buckets (excludes out-of-range records)
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Buckets in ascending star order
    pub fn buckets(&self) -> Vec<StarBucket> {
        StarRating::all()
            .map(|rating| StarBucket {
                rating,
                count: self.count(rating),
                tone: BucketTone::for_rating(rating),
                label: format!("{} ★", rating),
            })
            .collect()
    }
}

/// Binary partition: low = 1..=3 stars, high = 4..=5 stars
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentSplit {
    pub low: usize,
    pub high: usize,
}

impl SentimentSplit {
    pub fn total(&self) -> usize {
        self.low + self.high
    }
}

/// Incrementally maintained counters behind every projection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StarTally {
    count: usize,
    star_sum: i64,
    histogram: StarHistogram,
    out_of_range: usize,
}

impl StarTally {
    pub fn from_records(records: &[ReviewRecord]) -> Self {
        let mut tally = Self::default();
        for record in records {
            tally.record(record);
        }
        tally
    }

    /// Account for one newly added record
    pub fn record(&mut self, record: &ReviewRecord) {
        self.count += 1;
        self.star_sum += i64::from(record.stars);
        match bucket_index(record.stars) {
            Some(index) => self.histogram.counts[index] += 1,
            None => self.out_of_range += 1,
        }
    }

    pub fn total_count(&self) -> usize {
        self.count
    }

    pub fn average_rating(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.star_sum as f64 / self.count as f64
        }
    }

    pub fn histogram(&self) -> StarHistogram {
        self.histogram
    }

    pub fn sentiment_split(&self) -> SentimentSplit {
        let low = self.histogram.counts[..SENTIMENT_THRESHOLD as usize].iter().sum();
        let high = self.histogram.counts[SENTIMENT_THRESHOLD as usize..].iter().sum();
        SentimentSplit { low, high }
    }

    pub fn out_of_range(&self) -> usize {
        self.out_of_range
    }
}

/// All projections for one store revision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Analytics {
    pub total_count: usize,
    pub average_rating: f64,
    pub histogram: StarHistogram,
    pub sentiment: SentimentSplit,
    /// Records skipped by histogram and sentiment bucketing
    pub out_of_range: usize,
}

impl Analytics {
    /// Full rescan
    pub fn from_records(records: &[ReviewRecord]) -> Self {
        Self {
            total_count: total_count(records),
            average_rating: average_rating(records),
            histogram: star_histogram(records),
            sentiment: sentiment_split(records),
            out_of_range: records.iter().filter(|r| !r.has_valid_stars()).count(),
        }
    }

    pub fn from_tally(tally: &StarTally) -> Self {
        Self {
            total_count: tally.total_count(),
            average_rating: tally.average_rating(),
            histogram: tally.histogram(),
            sentiment: tally.sentiment_split(),
            out_of_range: tally.out_of_range(),
        }
    }

    /// Average formatted for display, e.g. "4.2 / 5.0"
    pub fn average_display(&self) -> String {
        format!("{:.1} / 5.0", self.average_rating)
    }
}
