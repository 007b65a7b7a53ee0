//! Validates and stores review submissions.
//!
//! The full submit sequence — resolve, persist, recompute — either
//! succeeds as a whole or leaves no trace: a review whose recompute fails
//! is deleted before the error propagates. Writes to the same area are
//! serialized through [`AreaLocks`]; different areas proceed in parallel.

use std::sync::Arc;

use chrono::Utc;
use safety_map_models::{Area, Review, SafetyError};
use safety_map_storage::Storage;

use crate::aggregator::ReviewAggregator;
use crate::locks::AreaLocks;
use crate::resolver::{AreaRef, AreaResolver, normalize_name};

/// Default number of reviews returned by a listing.
pub const DEFAULT_LIST_LIMIT: usize = 50;
/// Upper bound on a review listing.
pub const MAX_LIST_LIMIT: usize = 200;

/// Orchestrates review submission.
pub struct ReviewIngestor {
    storage: Arc<dyn Storage>,
    resolver: AreaResolver,
    aggregator: ReviewAggregator,
    locks: AreaLocks,
}

impl ReviewIngestor {
    /// Creates an ingestor over the given storage.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            resolver: AreaResolver::new(Arc::clone(&storage)),
            aggregator: ReviewAggregator::new(Arc::clone(&storage)),
            locks: AreaLocks::default(),
            storage,
        }
    }

    /// The resolver backing this ingestor, shared with read paths.
    #[must_use]
    pub const fn resolver(&self) -> &AreaResolver {
        &self.resolver
    }

    /// Validates and stores a review, then recomputes the target area's
    /// aggregates before returning.
    ///
    /// The returned area already reflects the new review.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::InvalidArgument`] for a non-finite,
    /// non-integral, or out-of-range rating (no review or area mutation
    /// occurs), [`SafetyError::NotFound`] for an unknown explicit area id,
    /// or [`SafetyError::Internal`] if the store fails — in which case the
    /// just-written review is rolled back.
    pub async fn submit(
        &self,
        area_ref: &AreaRef,
        rating: f64,
        text: Option<&str>,
    ) -> Result<(Review, Area), SafetyError> {
        let rating = validate_rating(rating)?;
        let text = text
            .map(normalize_name)
            .filter(|t| !t.is_empty());

        let area = self.resolver.resolve(area_ref, true).await?;

        // Serialize the read-modify-write on this area's aggregates.
        let lock = self.locks.handle(&area.id);
        let _guard = lock.lock().await;

        let review = Review {
            id: uuid::Uuid::new_v4().to_string(),
            area_id: Some(area.id.clone()),
            area_name: area.name.clone(),
            rating,
            text,
            created_at: Utc::now(),
        };
        let review = self.storage.insert_review(review).await?;

        let refreshed = match self.aggregator.recompute(&area.id).await {
            Ok(refreshed) => refreshed.unwrap_or(area),
            Err(err) => {
                // Keep the review set and the aggregate consistent: a
                // rating that failed to aggregate is not stored.
                if let Err(rollback) = self.storage.delete_review(&review.id).await {
                    log::error!(
                        "Failed to roll back review {} after recompute failure: {rollback}",
                        review.id
                    );
                }
                return Err(err);
            }
        };

        log::info!(
            "Stored review {} for area {} (rating {})",
            review.id,
            refreshed.name,
            review.rating
        );
        Ok((review, refreshed))
    }

    /// Lists reviews newest first, filtered by explicit area id and/or
    /// case-insensitive exact area name. The limit is clamped to
    /// `[1, 200]`.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::Internal`] if the store fails.
    pub async fn list_reviews(
        &self,
        area_ref: &AreaRef,
        limit: Option<usize>,
    ) -> Result<Vec<Review>, SafetyError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let name = area_ref
            .name
            .as_deref()
            .map(normalize_name)
            .filter(|s| !s.is_empty());
        let id = area_ref.id.as_deref().map(str::trim).filter(|s| !s.is_empty());

        Ok(self.storage.list_reviews(id, name.as_deref(), limit).await?)
    }
}

/// Validates a submitted rating: finite, integral, within `[1, 5]`.
fn validate_rating(rating: f64) -> Result<u8, SafetyError> {
    if !rating.is_finite() || !(1.0..=5.0).contains(&rating) || rating.fract() != 0.0 {
        return Err(SafetyError::invalid(
            "rating must be an integer between 1 and 5",
        ));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(rating as u8)
}
