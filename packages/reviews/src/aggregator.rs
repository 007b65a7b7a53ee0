//! Recomputes an area's derived statistics from its full review history.
//!
//! Aggregates are never updated incrementally: every recompute reloads the
//! area's complete review set (matched by id or by case-insensitive exact
//! name) and rederives the weighted average, sentiment, confidence, and
//! trend via `safety_map_scoring`.

use std::sync::Arc;

use chrono::Utc;
use safety_map_models::{Area, SafetyError};
use safety_map_scoring::aggregate;
use safety_map_storage::Storage;

/// Recomputes and persists area aggregates.
pub struct ReviewAggregator {
    storage: Arc<dyn Storage>,
}

impl ReviewAggregator {
    /// Creates an aggregator over the given storage.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Recomputes the aggregates for an area and persists them.
    ///
    /// Returns the refreshed area, or `None` when the area no longer
    /// exists — recompute is only ever triggered after a successful
    /// resolve, so a miss here is logged as a consistency warning rather
    /// than raised.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::Internal`] if the store fails.
    pub async fn recompute(&self, area_id: &str) -> Result<Option<Area>, SafetyError> {
        let Some(mut area) = self.storage.get_area(area_id).await? else {
            log::warn!("Recompute requested for missing area {area_id}; skipping");
            return Ok(None);
        };

        let reviews = self.storage.reviews_for_area(&area.id, &area.name).await?;
        let agg = aggregate(&reviews, Utc::now());

        area.rating_count = agg.rating_count;
        area.rating_sum = agg.rating_sum;
        area.sentiment = agg.sentiment;
        area.confidence = agg.confidence;
        area.trend = agg.trend;
        area.review_updated_at = Some(Utc::now());

        let area = self.storage.update_area(area).await?;
        log::debug!(
            "Recomputed area {} ({}): {} reviews, sentiment {:.3}, trend {}",
            area.name,
            area.id,
            area.rating_count,
            area.sentiment,
            area.trend
        );
        Ok(Some(area))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use safety_map_models::{Review, Trend};
    use safety_map_storage::MemoryStorage;

    fn review(id: &str, area_id: Option<&str>, area_name: &str, rating: u8, age_days: i64) -> Review {
        Review {
            id: id.to_string(),
            area_id: area_id.map(ToString::to_string),
            area_name: area_name.to_string(),
            rating,
            text: None,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn recompute_unions_id_and_name_bound_reviews() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .insert_area(Area::neutral("a1".into(), "Shillong, Meghalaya".into()))
            .await
            .unwrap();
        storage
            .insert_review(review("r1", Some("a1"), "Shillong, Meghalaya", 5, 0))
            .await
            .unwrap();
        storage
            .insert_review(review("r2", None, "shillong, meghalaya", 3, 0))
            .await
            .unwrap();

        let aggregator = ReviewAggregator::new(Arc::clone(&storage) as Arc<dyn Storage>);
        let area = aggregator.recompute("a1").await.unwrap().unwrap();

        assert_eq!(area.rating_count, 2);
        assert_eq!(area.rating_sum, 8);
        assert!((area.sentiment - 0.5).abs() < 1e-9);
        assert!(area.review_updated_at.is_some());
    }

    #[tokio::test]
    async fn recompute_with_no_reviews_resets_to_neutral() {
        let storage = Arc::new(MemoryStorage::new());
        let mut stale = Area::neutral("a1".into(), "Aizawl, Mizoram".into());
        stale.rating_count = 9;
        stale.rating_sum = 40;
        stale.sentiment = 0.8;
        stale.trend = Trend::Improving;
        storage.insert_area(stale).await.unwrap();

        let aggregator = ReviewAggregator::new(Arc::clone(&storage) as Arc<dyn Storage>);
        let area = aggregator.recompute("a1").await.unwrap().unwrap();

        assert_eq!(area.rating_count, 0);
        assert_eq!(area.rating_sum, 0);
        assert_eq!(area.sentiment, 0.0);
        assert_eq!(area.confidence, 0.0);
        assert_eq!(area.trend, Trend::Stable);
    }

    #[tokio::test]
    async fn recompute_missing_area_is_a_logged_no_op() {
        let storage = Arc::new(MemoryStorage::new());
        let aggregator = ReviewAggregator::new(storage as Arc<dyn Storage>);
        assert!(aggregator.recompute("ghost").await.unwrap().is_none());
    }
}
