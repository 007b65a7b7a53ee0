//! Baseline area seeding.
//!
//! On boot the server loads a JSON array of named points with baseline
//! `crimeRate` / `infraScore` values and inserts any that are not already
//! stored, registering their locations in the spatial index so nearby
//! queries work before any review arrives.

use std::path::Path;

use safety_map_models::Area;
use safety_map_spatial::SpatialIndex;
use safety_map_storage::{Storage, StorageError};
use serde::Deserialize;
use thiserror::Error;

/// A single seed entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedArea {
    /// Canonical area name.
    pub name: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Baseline crime rate in `[0, 100]`.
    pub crime_rate: f64,
    /// Baseline infrastructure score in `[0, 100]`.
    pub infra_score: f64,
    /// Baseline sentiment in `[-1, 1]`.
    #[serde(default)]
    pub sentiment: f64,
}

/// Seeding failure.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The seed file could not be read.
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    /// The seed file is not valid JSON.
    #[error("failed to parse seed file: {0}")]
    Json(#[from] serde_json::Error),
    /// The store rejected a seed write.
    #[error("failed to store seed area: {0}")]
    Storage(#[from] StorageError),
}

/// Loads the seed file and inserts every entry whose name is not already
/// stored, returning the number of areas inserted.
///
/// Existing areas are left untouched so seeding stays idempotent across
/// restarts when a persistent store is injected.
///
/// # Errors
///
/// Returns [`SeedError`] if the file cannot be read or parsed, or if the
/// store fails.
pub async fn apply(
    path: &Path,
    storage: &dyn Storage,
    spatial: &SpatialIndex,
) -> Result<usize, SeedError> {
    let raw = std::fs::read_to_string(path)?;
    let entries: Vec<SeedArea> = serde_json::from_str(&raw)?;

    let mut inserted = 0;
    for entry in entries {
        let mut area = Area::neutral(uuid::Uuid::new_v4().to_string(), entry.name.clone());
        area.location = Some((entry.lng, entry.lat));
        area.crime_rate = entry.crime_rate;
        area.infra_score = entry.infra_score;
        area.sentiment = entry.sentiment.clamp(-1.0, 1.0);

        match storage.insert_area(area).await {
            Ok(area) => {
                spatial.insert_area(&area.id, entry.lng, entry.lat);
                inserted += 1;
            }
            Err(StorageError::Conflict { .. }) => {
                log::debug!("Seed area {} already exists; skipping", entry.name);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(inserted)
}
