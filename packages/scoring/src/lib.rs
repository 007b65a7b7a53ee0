#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Pure scoring math for the safety map engine.
//!
//! Everything in this crate is a deterministic function of its inputs:
//! recency decay, keyword sentiment boosts, the weighted review aggregate
//! (sentiment, confidence, trend), and the 0-100 display safety score.
//! No I/O, no clocks — callers pass `now` explicitly.

use chrono::{DateTime, Utc};
use safety_map_models::{Review, Trend};

/// Reviews older than this stop losing weight.
pub const RECENCY_FLOOR: f64 = 0.3;
/// Linear decay horizon in days.
pub const DECAY_DAYS: f64 = 180.0;
/// Reviews younger than this count as "recent" for trend detection.
pub const TREND_WINDOW_DAYS: f64 = 30.0;
/// Minimum recent-vs-older average gap to classify a trend.
pub const TREND_THRESHOLD: f64 = 0.5;

/// Keywords that push a review's effective rating down.
const NEGATIVE_KEYWORDS: &[&str] = &["bad", "unsafe", "danger"];
/// Keywords that push a review's effective rating up.
const POSITIVE_KEYWORDS: &[&str] = &["good", "safe", "secure"];

/// Derived statistics for an area's full review set.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewAggregate {
    /// Number of reviews.
    pub rating_count: u32,
    /// Sum of raw (unboosted) ratings.
    pub rating_sum: u32,
    /// Recency-weighted average of boosted ratings. Roughly 0.5-5.5;
    /// intentionally not re-clamped before the sentiment mapping.
    pub weighted_average: f64,
    /// Sentiment in `[-1, 1]`, centered at the neutral rating 3.
    pub sentiment: f64,
    /// Volume-based confidence in `[0, 1]`.
    pub confidence: f64,
    /// Recent-vs-older rating movement.
    pub trend: Trend,
}

impl ReviewAggregate {
    /// The aggregate for an area with no reviews.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            rating_count: 0,
            rating_sum: 0,
            weighted_average: 0.0,
            sentiment: 0.0,
            confidence: 0.0,
            trend: Trend::Stable,
        }
    }
}

/// Linear recency decay over [`DECAY_DAYS`], floored at [`RECENCY_FLOOR`]
/// so old reviews never vanish entirely.
#[must_use]
pub fn recency_weight(age_days: f64) -> f64 {
    RECENCY_FLOOR.max(1.0 - age_days / DECAY_DAYS)
}

/// Additive rating boost derived from review text keywords.
///
/// Matches whole words (lowercased, split on non-alphanumeric characters)
/// so that "unsafe" trips only the negative set rather than also matching
/// the positive keyword "safe". A text hitting both sets, or neither,
/// contributes nothing.
#[must_use]
pub fn sentiment_boost(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut negative = false;
    let mut positive = false;

    for word in lower.split(|c: char| !c.is_alphanumeric()) {
        negative = negative || NEGATIVE_KEYWORDS.contains(&word);
        positive = positive || POSITIVE_KEYWORDS.contains(&word);
    }

    match (negative, positive) {
        (true, false) => -0.5,
        (false, true) => 0.2,
        _ => 0.0,
    }
}

/// Volume-based confidence: grows with review count, saturating at 1 once
/// the count reaches 99.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn confidence(review_count: usize) -> f64 {
    1.0_f64.min(((review_count + 1) as f64).log10() / 2.0)
}

/// Recomputes an area's derived statistics from its full review set.
///
/// Reviews may be passed in any order; ages are measured against the
/// caller-supplied `now`. The trend compares unweighted rating averages of
/// the `< 30 day` and `>= 30 day` partitions and stays [`Trend::Stable`]
/// whenever either partition is empty.
#[must_use]
pub fn aggregate(reviews: &[Review], now: DateTime<Utc>) -> ReviewAggregate {
    if reviews.is_empty() {
        return ReviewAggregate::empty();
    }

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut rating_sum: u32 = 0;

    let mut recent_sum = 0.0;
    let mut recent_count: u32 = 0;
    let mut older_sum = 0.0;
    let mut older_count: u32 = 0;

    for review in reviews {
        let age_days = age_in_days(review.created_at, now);
        let weight = recency_weight(age_days);
        let boost = review
            .text
            .as_deref()
            .map_or(0.0, sentiment_boost);

        weighted_sum += (f64::from(review.rating) + boost) * weight;
        weight_total += weight;
        rating_sum += u32::from(review.rating);

        if age_days < TREND_WINDOW_DAYS {
            recent_sum += f64::from(review.rating);
            recent_count += 1;
        } else {
            older_sum += f64::from(review.rating);
            older_count += 1;
        }
    }

    let weighted_average = weighted_sum / weight_total;
    let sentiment = ((weighted_average - 3.0) / 2.0).clamp(-1.0, 1.0);

    let trend = if recent_count == 0 || older_count == 0 {
        Trend::Stable
    } else {
        let recent_avg = recent_sum / f64::from(recent_count);
        let older_avg = older_sum / f64::from(older_count);
        if recent_avg > older_avg + TREND_THRESHOLD {
            Trend::Improving
        } else if recent_avg < older_avg - TREND_THRESHOLD {
            Trend::Declining
        } else {
            Trend::Stable
        }
    };

    #[allow(clippy::cast_possible_truncation)]
    let rating_count = reviews.len() as u32;

    ReviewAggregate {
        rating_count,
        rating_sum,
        weighted_average,
        sentiment,
        confidence: confidence(reviews.len()),
        trend,
    }
}

/// The single display score: blends the crime and infrastructure baselines
/// with review-derived sentiment into a bounded 0-100 value.
///
/// `score(50, 50, 0) == 50`; a higher score is safer. Deliberately ignores
/// review volume — `rating_count` and `confidence` are exposed separately
/// for clients that want to weight by it.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn safety_score(crime_rate: f64, infra_score: f64, sentiment: f64) -> u8 {
    let sentiment_0_100 = (sentiment + 1.0) / 2.0 * 100.0;
    let raw = 0.3 * (100.0 - crime_rate) + 0.2 * infra_score + 0.5 * sentiment_0_100;
    raw.clamp(0.0, 100.0).round() as u8
}

/// Fractional age of a review in days at `now`.
fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = now.signed_duration_since(created_at).num_milliseconds();
    #[allow(clippy::cast_precision_loss)]
    let millis_f = millis as f64;
    millis_f / (24.0 * 60.0 * 60.0 * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn review(rating: u8, age_days: i64, text: Option<&str>, now: DateTime<Utc>) -> Review {
        Review {
            id: format!("r-{rating}-{age_days}"),
            area_id: Some("a1".to_string()),
            area_name: "Gangtok, Sikkim".to_string(),
            rating,
            text: text.map(ToString::to_string),
            created_at: now - Duration::days(age_days),
        }
    }

    #[test]
    fn recency_weight_decays_linearly_to_floor() {
        assert!((recency_weight(0.0) - 1.0).abs() < 1e-12);
        assert!((recency_weight(90.0) - 0.5).abs() < 1e-12);
        assert!((recency_weight(126.0) - 0.3).abs() < 1e-12);
        // Past the decay horizon the floor holds.
        assert!((recency_weight(200.0) - 0.3).abs() < 1e-12);
        assert!((recency_weight(10_000.0) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn sentiment_boost_keyword_sets() {
        assert!((sentiment_boost("felt unsafe after dark") - (-0.5)).abs() < 1e-12);
        assert!((sentiment_boost("bad lighting, danger everywhere") - (-0.5)).abs() < 1e-12);
        assert!((sentiment_boost("very safe and secure") - 0.2).abs() < 1e-12);
        assert!((sentiment_boost("Good market area") - 0.2).abs() < 1e-12);
        // Both sets hit: boosts cancel to zero.
        assert!(sentiment_boost("good food but bad roads").abs() < 1e-12);
        // No keywords.
        assert!(sentiment_boost("crowded in the evenings").abs() < 1e-12);
    }

    #[test]
    fn unsafe_is_not_mistaken_for_safe() {
        // Substring matching would see "safe" inside "unsafe".
        assert!((sentiment_boost("unsafe") - (-0.5)).abs() < 1e-12);
    }

    #[test]
    fn confidence_grows_and_saturates() {
        assert!(confidence(0).abs() < 1e-12);
        assert!(confidence(1) < confidence(10));
        assert!(confidence(10) < confidence(100));
        assert!((confidence(99) - 1.0).abs() < 1e-12);
        assert!((confidence(100) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn aggregate_empty_is_neutral() {
        let agg = aggregate(&[], Utc::now());
        assert_eq!(agg, ReviewAggregate::empty());
    }

    #[test]
    fn aggregate_weights_recent_reviews_more() {
        let now = Utc::now();
        let reviews = vec![
            review(5, 0, None, now),
            review(1, 200, None, now),
        ];
        let agg = aggregate(&reviews, now);

        // Old review is floored at weight 0.3: (5*1 + 1*0.3) / 1.3.
        let expected = (5.0 + 0.3) / 1.3;
        assert!((agg.weighted_average - expected).abs() < 1e-9);
        // Closer to the recent rating than the naive mean of 3.
        assert!(agg.weighted_average > 3.0);
        assert_eq!(agg.rating_count, 2);
        assert_eq!(agg.rating_sum, 6);
    }

    #[test]
    fn aggregate_gangtok_scenario() {
        // Three same-day reviews rated 5, 4, 2 with no trigger keywords.
        let now = Utc::now();
        let reviews = vec![
            review(5, 0, Some("lovely views"), now),
            review(4, 0, None, now),
            review(2, 0, Some("crowded"), now),
        ];
        let agg = aggregate(&reviews, now);

        assert_eq!(agg.rating_count, 3);
        assert_eq!(agg.rating_sum, 11);
        assert!((agg.weighted_average - 11.0 / 3.0).abs() < 1e-9);
        assert!((agg.sentiment - (11.0 / 3.0 - 3.0) / 2.0).abs() < 1e-9);
        // All reviews are recent; the older partition is empty.
        assert_eq!(agg.trend, Trend::Stable);

        let score = safety_score(28.0, 80.0, agg.sentiment);
        let sent_0_100 = (agg.sentiment + 1.0) / 2.0 * 100.0;
        let raw = 0.3 * (100.0 - 28.0) + 0.2 * 80.0 + 0.5 * sent_0_100;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let expected = raw.round() as u8;
        assert_eq!(score, expected);
    }

    #[test]
    fn trend_improving_and_declining() {
        let now = Utc::now();

        let improving = vec![
            review(5, 1, None, now),
            review(5, 2, None, now),
            review(2, 60, None, now),
        ];
        assert_eq!(aggregate(&improving, now).trend, Trend::Improving);

        let declining = vec![
            review(1, 1, None, now),
            review(2, 3, None, now),
            review(5, 90, None, now),
        ];
        assert_eq!(aggregate(&declining, now).trend, Trend::Declining);

        let flat = vec![
            review(4, 1, None, now),
            review(4, 60, None, now),
        ];
        assert_eq!(aggregate(&flat, now).trend, Trend::Stable);
    }

    #[test]
    fn trend_suppressed_when_partition_empty() {
        let now = Utc::now();
        // All recent: a high average must not read as "improving" against
        // an empty older partition.
        let young_area = vec![review(5, 1, None, now), review(5, 2, None, now)];
        assert_eq!(aggregate(&young_area, now).trend, Trend::Stable);

        let dormant_area = vec![review(1, 100, None, now), review(1, 200, None, now)];
        assert_eq!(aggregate(&dormant_area, now).trend, Trend::Stable);
    }

    #[test]
    fn sentiment_clamped_to_unit_range() {
        let now = Utc::now();
        // Five-star reviews with positive keywords push the boosted
        // average above 5; sentiment still caps at 1.
        let glowing: Vec<Review> = (0..4)
            .map(|i| review(5, i, Some("safe and good"), now))
            .collect();
        let agg = aggregate(&glowing, now);
        assert!(agg.weighted_average > 5.0);
        assert!((agg.sentiment - 1.0).abs() < 1e-12);
    }

    #[test]
    fn safety_score_neutral_default() {
        assert_eq!(safety_score(50.0, 50.0, 0.0), 50);
    }

    #[test]
    fn safety_score_bounded_for_all_inputs() {
        for crime in [0.0, 25.0, 50.0, 75.0, 100.0] {
            for infra in [0.0, 25.0, 50.0, 75.0, 100.0] {
                for sentiment in [-1.0, -0.5, 0.0, 0.5, 1.0] {
                    let score = safety_score(crime, infra, sentiment);
                    assert!(score <= 100, "score {score} for ({crime}, {infra}, {sentiment})");
                }
            }
        }
        // Extremes.
        assert_eq!(safety_score(100.0, 0.0, -1.0), 0);
        assert_eq!(safety_score(0.0, 100.0, 1.0), 100);
    }

    #[test]
    fn safety_score_deterministic() {
        assert_eq!(
            safety_score(28.0, 80.0, 0.33),
            safety_score(28.0, 80.0, 0.33)
        );
    }
}
