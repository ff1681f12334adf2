//! Plain-text dashboard rendering
//!
//! Layout follows the web admin panel: analytics sidebar first, then the
//! filtered review list with AI insights under each review.

use fbk_common::ReviewRecord;
use std::fmt::Write;

use crate::analytics::{BucketTone, HIGH_SENTIMENT_LABEL, LOW_SENTIMENT_LABEL};
use crate::subscriber::ConnectionState;
use crate::view::{RenderModel, ViewStatus, EMPTY_RESULTS_HINT, EMPTY_RESULTS_MESSAGE, LOADING_MESSAGE};

const BAR_WIDTH: usize = 30;
const STAR_SLOTS: usize = 5;

/// Render one frame
pub fn render_text(model: &RenderModel) -> String {
    let mut out = String::new();

    match &model.status {
        ViewStatus::Loading => {
            out.push_str(LOADING_MESSAGE);
            out.push('\n');
            return out;
        }
        ViewStatus::Failed(reason) => {
            let _ = writeln!(out, "Error");
            let _ = writeln!(out, "{}", reason);
            let _ = writeln!(out, "[r] Retry");
            return out;
        }
        ViewStatus::Ready => {}
    }

    render_analytics(&mut out, model);
    out.push('\n');
    render_results(&mut out, model);
    out
}

fn render_analytics(out: &mut String, model: &RenderModel) {
    let analytics = &model.analytics;

    let _ = writeln!(out, "Admin Panel [{}]", connection_label(model.connection));
    let _ = writeln!(out, "Total Reviews: {}", analytics.total_count);
    let _ = writeln!(out, "Avg Rating:    {}", analytics.average_display());

    let _ = writeln!(out, "Sentiment");
    let _ = writeln!(out, "  {:<24} {}", LOW_SENTIMENT_LABEL, analytics.sentiment.low);
    let _ = writeln!(out, "  {:<24} {}", HIGH_SENTIMENT_LABEL, analytics.sentiment.high);

    let _ = writeln!(out, "Rating Spread");
    let buckets = analytics.histogram.buckets();
    let peak = buckets.iter().map(|b| b.count).max().unwrap_or(0);
    for bucket in &buckets {
        let _ = writeln!(
            out,
            "  {} {} {} {}",
            bucket.label,
            tone_marker(bucket.tone),
            bar(bucket.count, peak),
            bucket.count
        );
    }
}

fn render_results(out: &mut String, model: &RenderModel) {
    let _ = writeln!(out, "{}", model.results_header());

    if model.result_count() == 0 {
        let _ = writeln!(out, "  {}", EMPTY_RESULTS_MESSAGE);
        let _ = writeln!(out, "  {}", EMPTY_RESULTS_HINT);
        return;
    }

    for record in model.rows() {
        render_review(out, record);
    }
}

fn render_review(out: &mut String, record: &ReviewRecord) {
    let when = record
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    let _ = writeln!(out);
    let _ = writeln!(out, "#{} {}", record.id, record.business_name);
    let _ = writeln!(out, "  {} {}", star_line(record.stars), when);
    let _ = writeln!(out, "  \"{}\"", record.text);
    let _ = writeln!(out, "  AI Summary:         {}", record.summary_or_pending());
    let _ = writeln!(out, "  Recommended Action: {}", record.action_or_pending());
}

/// Filled then hollow stars; values outside 0..=5 are clamped
fn star_line(stars: i32) -> String {
    let filled = usize::try_from(stars).unwrap_or(0).min(STAR_SLOTS);
    format!("{}{}", "★".repeat(filled), "☆".repeat(STAR_SLOTS - filled))
}

fn bar(count: usize, peak: usize) -> String {
    if peak == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH).div_ceil(peak);
    "█".repeat(width)
}

fn tone_marker(tone: BucketTone) -> &'static str {
    match tone {
        BucketTone::Negative => "[-]",
        BucketTone::Neutral => "[~]",
        BucketTone::Positive => "[+]",
    }
}

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connecting => "connecting",
        ConnectionState::Live => "live",
        ConnectionState::Reconnecting => "reconnecting",
        ConnectionState::Closed => "closed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::Analytics;
    use crate::filter::{ReviewQuery, StarFilter};
    use crate::store::ReviewStore;
    use fbk_common::ReviewId;

    fn review(id: i64, name: &str, stars: i32) -> ReviewRecord {
        ReviewRecord {
            id: ReviewId(id),
            business_name: name.to_string(),
            stars,
            text: "Great slice".to_string(),
            created_at: None,
            sentiment_analysis: None,
            recommended_action: None,
        }
    }

    fn model(records: Vec<ReviewRecord>, query: &ReviewQuery, status: ViewStatus) -> RenderModel {
        let store = ReviewStore::new();
        let snapshot = store.replace_all(records).unwrap();
        RenderModel {
            visible: query.matching_indices(snapshot.records()),
            analytics: Analytics::from_records(snapshot.records()),
            snapshot,
            connection: ConnectionState::Live,
            status,
        }
    }

    #[test]
    fn test_ready_frame_shows_analytics_and_pending_annotations() {
        let mut annotated = review(2, "Bad Cafe", 2);
        annotated.sentiment_analysis = Some("Customer unhappy".to_string());
        annotated.recommended_action = Some("Call back".to_string());

        let frame = render_text(&model(
            vec![review(1, "Joe's Pizza", 5), annotated],
            &ReviewQuery::default(),
            ViewStatus::Ready,
        ));

        assert!(frame.contains("Admin Panel [live]"));
        assert!(frame.contains("Total Reviews: 2"));
        assert!(frame.contains("3.5 / 5.0"));
        assert!(frame.contains("Results (2)"));
        assert!(frame.contains("AI Summary:         Processing..."));
        assert!(frame.contains("Recommended Action: Call back"));
        assert!(frame.contains("★★☆☆☆"));
    }

    #[test]
    fn test_filtered_frame_keeps_full_analytics() {
        let query = ReviewQuery::new(StarFilter::All, "pizza");
        let frame = render_text(&model(
            vec![review(1, "Joe's Pizza", 5), review(2, "Bad Cafe", 1)],
            &query,
            ViewStatus::Ready,
        ));

        assert!(frame.contains("Results (1)"));
        assert!(frame.contains("Total Reviews: 2"));
        assert!(!frame.contains("Bad Cafe"));
    }

    #[test]
    fn test_empty_result_message() {
        let query = ReviewQuery::new(StarFilter::All, "nothing matches");
        let frame = render_text(&model(vec![review(1, "Joe's Pizza", 5)], &query, ViewStatus::Ready));

        assert!(frame.contains("Results (0)"));
        assert!(frame.contains(EMPTY_RESULTS_MESSAGE));
    }

    #[test]
    fn test_blocking_states() {
        let loading = render_text(&model(vec![], &ReviewQuery::default(), ViewStatus::Loading));
        assert_eq!(loading.trim(), LOADING_MESSAGE);

        let failed = render_text(&model(
            vec![],
            &ReviewQuery::default(),
            ViewStatus::Failed("Backend returned HTTP 500".to_string()),
        ));
        assert!(failed.contains("Backend returned HTTP 500"));
        assert!(failed.contains("Retry"));
    }

    #[test]
    fn test_star_line_clamps() {
        assert_eq!(star_line(0), "☆☆☆☆☆");
        assert_eq!(star_line(-3), "☆☆☆☆☆");
        assert_eq!(star_line(9), "★★★★★");
    }

    #[test]
    fn test_bar_scales_to_peak() {
        assert_eq!(bar(0, 0), "");
        assert_eq!(bar(4, 4).chars().count(), BAR_WIDTH);
        assert_eq!(bar(0, 4), "");
        assert!(bar(1, 4).chars().count() > 0);
    }
}
