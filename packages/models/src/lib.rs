#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Core domain types for the safety map engine.
//!
//! Defines the canonical `Zone`, `Area`, and `Review` records shared by the
//! geofencing, resolution, and aggregation crates, along with the error
//! taxonomy every operation reports through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Risk classification for a zone, plus the `Safe` sentinel reported for
/// points that fall outside every zone.
///
/// Zones themselves are only ever `Low`, `Medium`, or `High`; `Safe` appears
/// exclusively in [`ZoneCheck`] responses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RiskLevel {
    /// No zone contains the point.
    Safe,
    /// Low-risk zone.
    Low,
    /// Medium-risk zone.
    Medium,
    /// High-risk zone.
    High,
}

impl RiskLevel {
    /// Whether this level is valid for an administratively defined zone.
    ///
    /// `Safe` is a response-only sentinel and is rejected on zone creation.
    #[must_use]
    pub const fn is_zone_level(self) -> bool {
        !matches!(self, Self::Safe)
    }
}

/// Direction of an area's recent review ratings relative to its older ones.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Trend {
    /// Recent reviews average at least 0.5 above older ones.
    Improving,
    /// Recent reviews average at least 0.5 below older ones.
    Declining,
    /// No significant movement, or not enough history to compare.
    #[default]
    Stable,
}

/// An administratively defined risk region.
///
/// The polygon is a closed ring of `(lng, lat)` pairs: at least 3 distinct
/// vertices with the first repeated as the last. Read-only to this engine
/// once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Unique zone id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Risk classification (never `Safe`).
    pub risk_level: RiskLevel,
    /// Risk score in `[0, 100]`.
    pub risk_score: f64,
    /// Closed `(lng, lat)` ring.
    pub polygon: Vec<(f64, f64)>,
    /// When the zone was created.
    pub created_at: DateTime<Utc>,
}

/// A named place with an aggregate safety profile.
///
/// Invariant: `rating_count == 0` implies `rating_sum == 0`. The derived
/// fields (`sentiment`, `confidence`, `trend`, counts) are only ever written
/// by the review aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// Unique area id.
    pub id: String,
    /// Canonical name, unique case-insensitively.
    pub name: String,
    /// `(lng, lat)` centroid; absent for areas created from free-text
    /// reviews alone.
    pub location: Option<(f64, f64)>,
    /// External crime baseline in `[0, 100]` (higher is worse).
    pub crime_rate: f64,
    /// External infrastructure baseline in `[0, 100]` (higher is better).
    pub infra_score: f64,
    /// Review-derived sentiment in `[-1, 1]`.
    pub sentiment: f64,
    /// Number of reviews backing the aggregate.
    pub rating_count: u32,
    /// Sum of raw (unboosted) ratings.
    pub rating_sum: u32,
    /// Volume-based confidence in `[0, 1]`.
    pub confidence: f64,
    /// Recent-vs-older rating movement.
    pub trend: Trend,
    /// When the aggregate was last recomputed.
    pub review_updated_at: Option<DateTime<Utc>>,
}

impl Area {
    /// Creates a neutral area with baseline defaults and no reviews.
    #[must_use]
    pub fn neutral(id: String, name: String) -> Self {
        Self {
            id,
            name,
            location: None,
            crime_rate: 50.0,
            infra_score: 50.0,
            sentiment: 0.0,
            rating_count: 0,
            rating_sum: 0,
            confidence: 0.0,
            trend: Trend::Stable,
            review_updated_at: None,
        }
    }
}

/// A single user rating of an area. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Unique review id.
    pub id: String,
    /// Resolved area id, when resolution succeeded.
    pub area_id: Option<String>,
    /// Denormalized area name, always set.
    pub area_name: String,
    /// Rating in `[1, 5]`.
    pub rating: u8,
    /// Optional free-text comment.
    pub text: Option<String>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// A zone that contained the checked point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneMatch {
    /// Zone id.
    pub id: String,
    /// Zone name.
    pub name: String,
    /// Zone risk classification.
    pub risk_level: RiskLevel,
    /// Zone risk score.
    pub risk_score: f64,
}

/// Result of checking a point against all zones.
///
/// The headline `risk_level`/`risk_score` come from the highest-scoring
/// matched zone; every matched zone is listed for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneCheck {
    /// Whether any zone contains the point.
    pub inside: bool,
    /// Risk level of the top match, or `Safe`.
    pub risk_level: RiskLevel,
    /// Risk score of the top match, or 0.
    pub risk_score: f64,
    /// All zones containing the point.
    pub matched_zones: Vec<ZoneMatch>,
}

impl ZoneCheck {
    /// The response for a point outside every zone.
    #[must_use]
    pub const fn outside() -> Self {
        Self {
            inside: false,
            risk_level: RiskLevel::Safe,
            risk_score: 0.0,
            matched_zones: Vec::new(),
        }
    }
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Whether the box contains a `(lng, lat)` point.
    #[must_use]
    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        lng >= self.west && lng <= self.east && lat >= self.south && lat <= self.north
    }
}

/// Errors reported by safety map operations.
///
/// `Conflict` is recovered internally wherever it can arise (duplicate area
/// creation) and should not normally reach API callers.
#[derive(Debug, Error)]
pub enum SafetyError {
    /// Malformed input: bad coordinates, out-of-range rating, degenerate
    /// polygon, or a missing identifier. Never retried.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected input.
        message: String,
    },

    /// An explicitly referenced record does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Description of the missing record.
        message: String,
    },

    /// Concurrent creation collided on a unique key.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the colliding key.
        message: String,
    },

    /// Storage or index failure; the whole operation may be retried.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl SafetyError {
    /// Builds an [`SafetyError::InvalidArgument`] from any message.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Builds a [`SafetyError::NotFound`] from any message.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RiskLevel::High).unwrap(),
            "\"high\""
        );
        assert_eq!(RiskLevel::Safe.to_string(), "safe");
    }

    #[test]
    fn safe_is_not_a_zone_level() {
        assert!(!RiskLevel::Safe.is_zone_level());
        assert!(RiskLevel::Low.is_zone_level());
    }

    #[test]
    fn neutral_area_defaults() {
        let area = Area::neutral("a1".into(), "Shillong".into());
        assert_eq!(area.crime_rate, 50.0);
        assert_eq!(area.infra_score, 50.0);
        assert_eq!(area.sentiment, 0.0);
        assert_eq!(area.rating_count, 0);
        assert_eq!(area.rating_sum, 0);
        assert_eq!(area.trend, Trend::Stable);
    }

    #[test]
    fn bounding_box_contains() {
        let bbox = BoundingBox::new(90.0, 25.0, 95.0, 28.0);
        assert!(bbox.contains(91.88, 25.57));
        assert!(!bbox.contains(88.6, 27.3));
    }
}
