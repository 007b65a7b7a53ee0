#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Zone containment matching and zone management.
//!
//! [`ZoneMatcher`] answers "which risk zones contain this point" against
//! the shared spatial index and applies the tie-break policy: the highest
//! `risk_score` among matches drives the headline result, with insertion
//! order breaking exact ties deterministically.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use safety_map_models::{RiskLevel, SafetyError, Zone, ZoneCheck, ZoneMatch};
use safety_map_spatial::SpatialIndex;
use safety_map_storage::Storage;

/// Input for creating a zone, before validation.
#[derive(Debug, Clone)]
pub struct NewZone {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Risk classification (must not be `Safe`).
    pub risk_level: RiskLevel,
    /// Risk score in `[0, 100]`.
    pub risk_score: f64,
    /// `(lng, lat)` ring; closed automatically if the first vertex is not
    /// repeated at the end.
    pub polygon: Vec<(f64, f64)>,
}

/// Matches points against risk zones and manages zone records.
pub struct ZoneMatcher {
    storage: Arc<dyn Storage>,
    index: Arc<SpatialIndex>,
}

impl ZoneMatcher {
    /// Creates a matcher over the given storage and spatial index.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, index: Arc<SpatialIndex>) -> Self {
        Self { storage, index }
    }

    /// Loads all persisted zones into the spatial index.
    ///
    /// Called once at startup; insertion order (oldest first) is preserved
    /// so tie-breaks stay stable across restarts.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::Internal`] if the store fails.
    pub async fn load_index(&self) -> Result<(), SafetyError> {
        let mut zones = self.storage.list_zones().await?;
        zones.reverse();
        for zone in &zones {
            self.index.insert_zone(&zone.id, &zone.polygon);
        }
        log::info!("Loaded {} zones into spatial index", zones.len());
        Ok(())
    }

    /// Checks which zones contain the point and reports the
    /// highest-severity match.
    ///
    /// Pure read; no side effects.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::InvalidArgument`] for out-of-range or
    /// non-finite coordinates, or [`SafetyError::Internal`] if the store
    /// fails.
    pub async fn check_point(&self, lat: f64, lng: f64) -> Result<ZoneCheck, SafetyError> {
        validate_coordinates(lat, lng)?;

        let ids = self.index.zones_containing(lng, lat);
        if ids.is_empty() {
            return Ok(ZoneCheck::outside());
        }

        let mut matched = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.storage.get_zone(id).await? {
                Some(zone) => matched.push(ZoneMatch {
                    id: zone.id,
                    name: zone.name,
                    risk_level: zone.risk_level,
                    risk_score: zone.risk_score,
                }),
                // Indexed but not stored: a consistency bug, not a user
                // error. Skip the match and keep serving.
                None => log::warn!("Zone {id} is in the spatial index but not in storage"),
            }
        }

        if matched.is_empty() {
            return Ok(ZoneCheck::outside());
        }

        // Maximum risk score wins; the first match (insertion order) wins
        // exact ties.
        let mut top = &matched[0];
        for candidate in &matched[1..] {
            if candidate.risk_score > top.risk_score {
                top = candidate;
            }
        }

        Ok(ZoneCheck {
            inside: true,
            risk_level: top.risk_level,
            risk_score: top.risk_score,
            matched_zones: matched.clone(),
        })
    }

    /// Validates and persists a new zone, adding it to the spatial index.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::InvalidArgument`] for a degenerate polygon,
    /// an out-of-range `risk_score`, or the `safe` sentinel level, and
    /// [`SafetyError::Internal`] if the store fails.
    pub async fn create_zone(&self, new: NewZone) -> Result<Zone, SafetyError> {
        if new.name.trim().is_empty() {
            return Err(SafetyError::invalid("zone name must not be empty"));
        }
        if !new.risk_level.is_zone_level() {
            return Err(SafetyError::invalid(
                "riskLevel must be one of low, medium, high",
            ));
        }
        if !new.risk_score.is_finite() || !(0.0..=100.0).contains(&new.risk_score) {
            return Err(SafetyError::invalid("riskScore must be within [0, 100]"));
        }

        let polygon = validate_ring(&new.polygon)?;

        let zone = Zone {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            description: new.description,
            risk_level: new.risk_level,
            risk_score: new.risk_score,
            polygon,
            created_at: Utc::now(),
        };

        let zone = self.storage.insert_zone(zone).await?;
        self.index.insert_zone(&zone.id, &zone.polygon);
        log::info!("Created zone {} ({})", zone.name, zone.id);
        Ok(zone)
    }

    /// Lists all zones, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::Internal`] if the store fails.
    pub async fn list_zones(&self) -> Result<Vec<Zone>, SafetyError> {
        Ok(self.storage.list_zones().await?)
    }
}

/// Validates WGS84 coordinates.
fn validate_coordinates(lat: f64, lng: f64) -> Result<(), SafetyError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(SafetyError::invalid("lat must be within [-90, 90]"));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(SafetyError::invalid("lng must be within [-180, 180]"));
    }
    Ok(())
}

/// Validates a polygon ring: finite in-range vertices, at least 3 distinct
/// ones. Returns the ring closed (first vertex repeated at the end).
fn validate_ring(ring: &[(f64, f64)]) -> Result<Vec<(f64, f64)>, SafetyError> {
    for &(lng, lat) in ring {
        validate_coordinates(lat, lng)?;
    }

    let mut distinct: HashSet<(u64, u64)> = HashSet::new();
    for &(lng, lat) in ring {
        distinct.insert((lng.to_bits(), lat.to_bits()));
    }
    if distinct.len() < 3 {
        return Err(SafetyError::invalid(
            "polygon must have at least 3 distinct vertices",
        ));
    }

    let mut closed = ring.to_vec();
    if closed.first() != closed.last() {
        let first = closed[0];
        closed.push(first);
    }
    Ok(closed)
}
