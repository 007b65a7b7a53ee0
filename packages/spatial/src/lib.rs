#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial index for zone containment and area proximity.
//!
//! Holds zone polygons and area centroids in R-trees and answers
//! point-in-polygon containment ("which zones contain this point") and
//! radius queries ("areas within N km, nearest first"). Constructed once
//! and shared across all consumers; zones and located areas are inserted
//! as they are created.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use geo::{BoundingRect, Contains, LineString, Polygon};
use rstar::{AABB, RTree, RTreeObject};

/// Mean kilometers per degree of latitude.
const KM_PER_DEG_LAT: f64 = 110.574;
/// Kilometers per degree of longitude at the equator.
const KM_PER_DEG_LNG_EQUATOR: f64 = 111.320;

/// A zone polygon stored in the R-tree with its metadata.
struct ZoneEntry {
    id: String,
    /// Insertion sequence, used for deterministic ordering of matches.
    seq: u64,
    envelope: AABB<[f64; 2]>,
    polygon: Polygon<f64>,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// An area centroid stored in the R-tree.
struct AreaPoint {
    id: String,
    lng: f64,
    lat: f64,
}

impl RTreeObject for AreaPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

/// Spatial indexes over zone polygons and area centroids.
///
/// Interior mutability allows runtime inserts (zone creation, area
/// seeding) while reads stay lock-cheap.
pub struct SpatialIndex {
    zones: RwLock<RTree<ZoneEntry>>,
    areas: RwLock<RTree<AreaPoint>>,
    next_seq: AtomicU64,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zones: RwLock::new(RTree::new()),
            areas: RwLock::new(RTree::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Inserts a zone polygon given as a closed `(lng, lat)` ring.
    ///
    /// The caller is responsible for validating the ring; degenerate rings
    /// simply never match any point.
    ///
    /// # Panics
    ///
    /// Panics if the zone index lock is poisoned.
    pub fn insert_zone(&self, id: &str, ring: &[(f64, f64)]) {
        let exterior: LineString<f64> = ring.iter().copied().collect();
        let polygon = Polygon::new(exterior, vec![]);
        let envelope = polygon.bounding_rect().map_or_else(
            || AABB::from_point([0.0, 0.0]),
            |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
        );

        let entry = ZoneEntry {
            id: id.to_string(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            envelope,
            polygon,
        };

        self.zones
            .write()
            .expect("zone index lock poisoned")
            .insert(entry);
        log::debug!("Inserted zone {id} into spatial index");
    }

    /// Returns the ids of all zones whose polygon contains the point, in
    /// insertion order.
    ///
    /// Uses the R-tree envelope as a pre-filter and an exact
    /// point-in-polygon test on the candidates.
    ///
    /// # Panics
    ///
    /// Panics if the zone index lock is poisoned.
    #[must_use]
    pub fn zones_containing(&self, lng: f64, lat: f64) -> Vec<String> {
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        let zones = self.zones.read().expect("zone index lock poisoned");
        let mut matches: Vec<(u64, String)> = zones
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .map(|entry| (entry.seq, entry.id.clone()))
            .collect();

        matches.sort_unstable_by_key(|(seq, _)| *seq);
        matches.into_iter().map(|(_, id)| id).collect()
    }

    /// Inserts an area centroid.
    ///
    /// # Panics
    ///
    /// Panics if the area index lock is poisoned.
    pub fn insert_area(&self, id: &str, lng: f64, lat: f64) {
        self.areas
            .write()
            .expect("area index lock poisoned")
            .insert(AreaPoint {
                id: id.to_string(),
                lng,
                lat,
            });
    }

    /// Returns `(area_id, distance_km)` for all areas within `radius_km`
    /// of the point, nearest first, capped at `limit`.
    ///
    /// The R-tree is queried with a degree-space envelope around the point
    /// and candidates are post-filtered by exact haversine distance.
    ///
    /// # Panics
    ///
    /// Panics if the area index lock is poisoned.
    #[must_use]
    pub fn areas_within(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        limit: usize,
    ) -> Vec<(String, f64)> {
        let deg_lat = radius_km / KM_PER_DEG_LAT;
        // Longitude degrees shrink toward the poles; clamp the cosine so a
        // polar query degrades to a wide scan instead of dividing by zero.
        let cos_lat = lat.to_radians().cos().max(0.01);
        let deg_lng = radius_km / (KM_PER_DEG_LNG_EQUATOR * cos_lat);

        let query_env = AABB::from_corners(
            [lng - deg_lng, lat - deg_lat],
            [lng + deg_lng, lat + deg_lat],
        );

        let areas = self.areas.read().expect("area index lock poisoned");
        let mut hits: Vec<(String, f64)> = areas
            .locate_in_envelope_intersecting(&query_env)
            .filter_map(|point| {
                let dist_km = haversine_km(lat, lng, point.lat, point.lng);
                (dist_km <= radius_km).then(|| (point.id.clone(), dist_km))
            })
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(limit);
        hits
    }

    /// Number of indexed zones.
    ///
    /// # Panics
    ///
    /// Panics if the zone index lock is poisoned.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.zones.read().expect("zone index lock poisoned").size()
    }

    /// Number of indexed area centroids.
    ///
    /// # Panics
    ///
    /// Panics if the area index lock is poisoned.
    #[must_use]
    pub fn area_count(&self) -> usize {
        self.areas.read().expect("area index lock poisoned").size()
    }
}

/// Haversine distance between two `(lat, lng)` points in kilometers.
#[must_use]
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6_371.0;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
