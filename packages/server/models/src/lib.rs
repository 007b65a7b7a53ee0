#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the safety map server.
//!
//! These types are serialized to JSON for the REST API and are separate
//! from the domain types to allow independent evolution of the API
//! contract. Request types tolerate the field spellings historical
//! clients actually send (`rating`/`stars`/`score`/`value`,
//! `areaName`/`place`/`name`/`location`) via serde aliases, so the rest of
//! the system only ever sees one validated shape.

use chrono::{DateTime, Utc};
use safety_map_models::{Area, Review, RiskLevel, Trend, Zone, ZoneCheck, ZoneMatch};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// A polygon in GeoJSON-style geometry form: one exterior ring of
/// `[lng, lat]` positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPolygon {
    /// Geometry type; always `"Polygon"`.
    #[serde(rename = "type", default = "polygon_type")]
    pub kind: String,
    /// Rings; only the first (exterior) ring is used.
    pub coordinates: Vec<Vec<(f64, f64)>>,
}

fn polygon_type() -> String {
    "Polygon".to_string()
}

impl GeoPolygon {
    /// Wraps a single exterior ring.
    #[must_use]
    pub fn from_ring(ring: Vec<(f64, f64)>) -> Self {
        Self {
            kind: polygon_type(),
            coordinates: vec![ring],
        }
    }

    /// The exterior ring, if present.
    #[must_use]
    pub fn exterior(&self) -> Option<&[(f64, f64)]> {
        self.coordinates.first().map(Vec::as_slice)
    }
}

/// Body of `POST /api/geo/check`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckPointRequest {
    /// Latitude in `[-90, 90]`.
    pub lat: f64,
    /// Longitude in `[-180, 180]`.
    pub lng: f64,
}

/// Body of `POST /api/geo/zones`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateZoneRequest {
    /// Zone display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Risk score in `[0, 100]`.
    pub risk_score: f64,
    /// Zone polygon.
    pub polygon: GeoPolygon,
}

/// A zone as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiZone {
    /// Unique zone ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Risk score in `[0, 100]`.
    pub risk_score: f64,
    /// Zone polygon.
    pub polygon: GeoPolygon,
    /// Creation time (ISO 8601).
    pub created_at: DateTime<Utc>,
}

impl From<Zone> for ApiZone {
    fn from(zone: Zone) -> Self {
        Self {
            id: zone.id,
            name: zone.name,
            description: zone.description,
            risk_level: zone.risk_level,
            risk_score: zone.risk_score,
            polygon: GeoPolygon::from_ring(zone.polygon),
            created_at: zone.created_at,
        }
    }
}

/// A matched zone in a point check response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiZoneMatch {
    /// Zone ID.
    pub id: String,
    /// Zone name.
    pub name: String,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Risk score.
    pub risk_score: f64,
}

impl From<ZoneMatch> for ApiZoneMatch {
    fn from(m: ZoneMatch) -> Self {
        Self {
            id: m.id,
            name: m.name,
            risk_level: m.risk_level,
            risk_score: m.risk_score,
        }
    }
}

/// Response of `POST /api/geo/check`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiZoneCheck {
    /// Whether any zone contains the point.
    pub inside: bool,
    /// Risk level of the top match, or `safe`.
    pub risk_level: RiskLevel,
    /// Risk score of the top match, or 0.
    pub risk_score: f64,
    /// All zones containing the point.
    pub matched_zones: Vec<ApiZoneMatch>,
}

impl From<ZoneCheck> for ApiZoneCheck {
    fn from(check: ZoneCheck) -> Self {
        Self {
            inside: check.inside,
            risk_level: check.risk_level,
            risk_score: check.risk_score,
            matched_zones: check
                .matched_zones
                .into_iter()
                .map(ApiZoneMatch::from)
                .collect(),
        }
    }
}

/// An area summary for listing, nearby, and search responses.
///
/// `safety_score` keeps its historical snake_case spelling on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct AreaSummary {
    /// Area name.
    pub name: String,
    /// Latitude, or 0 when the area has no location.
    pub lat: f64,
    /// Longitude, or 0 when the area has no location.
    pub lng: f64,
    /// Computed display score in `[0, 100]`.
    pub safety_score: u8,
}

impl AreaSummary {
    /// Builds a summary from an area and its computed score.
    #[must_use]
    pub fn new(area: &Area, safety_score: u8) -> Self {
        let (lng, lat) = area.location.unwrap_or((0.0, 0.0));
        Self {
            name: area.name.clone(),
            lat,
            lng,
            safety_score,
        }
    }
}

/// Body of `POST /api/reviews`.
///
/// Aliases absorb every field spelling observed from deployed clients;
/// validation happens once, in the handler, against this single shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitReviewRequest {
    /// Explicit area id.
    #[serde(default, rename = "areaId", alias = "areaID")]
    pub area_id: Option<String>,
    /// Free-text area name.
    #[serde(
        default,
        rename = "areaName",
        alias = "place",
        alias = "name",
        alias = "location"
    )]
    pub area_name: Option<String>,
    /// Rating; must be an integer in `[1, 5]`.
    #[serde(default, alias = "stars", alias = "score", alias = "value")]
    pub rating: Option<f64>,
    /// Optional review text.
    #[serde(default, alias = "comment", alias = "review")]
    pub text: Option<String>,
}

/// Query parameters of `GET /api/reviews`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListReviewsParams {
    /// Explicit area id filter.
    #[serde(default, rename = "areaId", alias = "areaID")]
    pub area_id: Option<String>,
    /// Area name filter (case-insensitive exact match).
    #[serde(default, rename = "areaName", alias = "place", alias = "location")]
    pub area_name: Option<String>,
    /// Maximum number of reviews (clamped to `[1, 200]`, default 50).
    #[serde(default)]
    pub limit: Option<usize>,
}

/// A review as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReview {
    /// Unique review ID.
    pub id: String,
    /// Resolved area id, when available.
    pub area_id: Option<String>,
    /// Denormalized area name.
    pub area_name: String,
    /// Rating in `[1, 5]`.
    pub rating: u8,
    /// Review text.
    pub text: Option<String>,
    /// Submission time (ISO 8601).
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ApiReview {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            area_id: review.area_id,
            area_name: review.area_name,
            rating: review.rating,
            text: review.text,
            created_at: review.created_at,
        }
    }
}

/// The refreshed area payload returned alongside a stored review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReviewArea {
    /// Area ID.
    pub id: String,
    /// Canonical area name.
    pub name: String,
    /// Latitude, or 0 when the area has no location.
    pub lat: f64,
    /// Longitude, or 0 when the area has no location.
    pub lng: f64,
    /// Number of reviews backing the aggregate.
    pub rating_count: u32,
    /// Review-derived sentiment in `[-1, 1]`.
    pub sentiment: f64,
    /// Volume-based confidence in `[0, 1]`.
    pub confidence: f64,
    /// Recent-vs-older rating movement.
    pub trend: Trend,
    /// Computed display score (snake_case on the wire, historically).
    #[serde(rename = "safety_score")]
    pub safety_score: u8,
}

impl ApiReviewArea {
    /// Builds the payload from an area and its computed score.
    #[must_use]
    pub fn new(area: &Area, safety_score: u8) -> Self {
        let (lng, lat) = area.location.unwrap_or((0.0, 0.0));
        Self {
            id: area.id.clone(),
            name: area.name.clone(),
            lat,
            lng,
            rating_count: area.rating_count,
            sentiment: area.sentiment,
            confidence: area.confidence,
            trend: area.trend,
            safety_score,
        }
    }
}

/// Response of `POST /api/reviews`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitReviewResponse {
    /// The stored review.
    pub review: ApiReview,
    /// The refreshed area, already reflecting the review.
    pub area: ApiReviewArea,
}

/// Query parameters of `GET /api/safety-scores`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAreasParams {
    /// Bounding box as `west,south,east,north`.
    pub bbox: Option<String>,
}

/// Query parameters of `GET /api/safety-scores/nearby`.
#[derive(Debug, Clone, Deserialize)]
pub struct NearbyParams {
    /// Center latitude.
    pub lat: f64,
    /// Center longitude.
    pub lng: f64,
    /// Radius in kilometers (default 25).
    pub radius: Option<f64>,
}

/// Query parameters of `GET /api/safety-scores/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    /// Search query.
    pub q: String,
}
