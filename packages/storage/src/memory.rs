//! In-memory [`Storage`] implementation.
//!
//! Backs the server in development and every test in the workspace. Keeps
//! zones and reviews in insertion order and maintains the case-insensitive
//! unique name index over areas as a `BTreeMap` keyed by the lowercased
//! name, which also gives deterministic name-ordered scans.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use safety_map_models::{Area, Review, Zone};

use crate::{NameMatch, Storage, StorageError};

#[derive(Default)]
struct Inner {
    zones: Vec<Zone>,
    /// Area id -> record.
    areas: BTreeMap<String, Area>,
    /// Lowercased area name -> area id. The unique index.
    area_names: BTreeMap<String, String>,
    reviews: Vec<Review>,
}

/// In-memory document store.
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StorageError> {
        self.inner.read().map_err(|_| StorageError::Internal {
            message: "storage lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StorageError> {
        self.inner.write().map_err(|_| StorageError::Internal {
            message: "storage lock poisoned".to_string(),
        })
    }
}

/// Whether a stored (lowercased) name matches a lowercased query under the
/// given mode.
fn name_matches(stored_lower: &str, query_lower: &str, mode: NameMatch) -> bool {
    match mode {
        NameMatch::Exact => stored_lower == query_lower,
        NameMatch::Prefix => stored_lower.starts_with(query_lower),
        NameMatch::Contains => stored_lower.contains(query_lower),
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn insert_zone(&self, zone: Zone) -> Result<Zone, StorageError> {
        let mut inner = self.write()?;
        inner.zones.push(zone.clone());
        Ok(zone)
    }

    async fn get_zone(&self, id: &str) -> Result<Option<Zone>, StorageError> {
        let inner = self.read()?;
        Ok(inner.zones.iter().find(|z| z.id == id).cloned())
    }

    async fn list_zones(&self) -> Result<Vec<Zone>, StorageError> {
        let inner = self.read()?;
        let mut zones: Vec<Zone> = inner.zones.clone();
        zones.reverse();
        Ok(zones)
    }

    async fn insert_area(&self, area: Area) -> Result<Area, StorageError> {
        let mut inner = self.write()?;
        let key = area.name.to_lowercase();
        if inner.area_names.contains_key(&key) {
            return Err(StorageError::Conflict {
                message: format!("area name already exists: {}", area.name),
            });
        }
        inner.area_names.insert(key, area.id.clone());
        inner.areas.insert(area.id.clone(), area.clone());
        Ok(area)
    }

    async fn get_area(&self, id: &str) -> Result<Option<Area>, StorageError> {
        let inner = self.read()?;
        Ok(inner.areas.get(id).cloned())
    }

    async fn find_areas_by_name(
        &self,
        name: &str,
        mode: NameMatch,
        limit: usize,
    ) -> Result<Vec<Area>, StorageError> {
        let query = name.to_lowercase();
        let inner = self.read()?;
        Ok(inner
            .area_names
            .iter()
            .filter(|(stored, _)| name_matches(stored, &query, mode))
            .filter_map(|(_, id)| inner.areas.get(id).cloned())
            .take(limit)
            .collect())
    }

    async fn update_area(&self, area: Area) -> Result<Area, StorageError> {
        let mut inner = self.write()?;
        let Some(existing) = inner.areas.get(&area.id).cloned() else {
            return Err(StorageError::NotFound {
                message: format!("no area with id {}", area.id),
            });
        };

        // Renames keep the unique index consistent; the aggregator never
        // renames, but the contract allows it.
        if !existing.name.eq_ignore_ascii_case(&area.name) {
            let new_key = area.name.to_lowercase();
            if let Some(other) = inner.area_names.get(&new_key)
                && other != &area.id
            {
                return Err(StorageError::Conflict {
                    message: format!("area name already exists: {}", area.name),
                });
            }
            inner.area_names.remove(&existing.name.to_lowercase());
            inner.area_names.insert(new_key, area.id.clone());
        }

        inner.areas.insert(area.id.clone(), area.clone());
        Ok(area)
    }

    async fn list_areas(&self, limit: usize) -> Result<Vec<Area>, StorageError> {
        let inner = self.read()?;
        Ok(inner
            .area_names
            .values()
            .filter_map(|id| inner.areas.get(id).cloned())
            .take(limit)
            .collect())
    }

    async fn insert_review(&self, review: Review) -> Result<Review, StorageError> {
        let mut inner = self.write()?;
        inner.reviews.push(review.clone());
        Ok(review)
    }

    async fn delete_review(&self, id: &str) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        let before = inner.reviews.len();
        inner.reviews.retain(|r| r.id != id);
        if inner.reviews.len() == before {
            return Err(StorageError::NotFound {
                message: format!("no review with id {id}"),
            });
        }
        Ok(())
    }

    async fn reviews_for_area(
        &self,
        area_id: &str,
        area_name: &str,
    ) -> Result<Vec<Review>, StorageError> {
        let inner = self.read()?;
        let mut reviews: Vec<Review> = inner
            .reviews
            .iter()
            .filter(|r| {
                r.area_id.as_deref() == Some(area_id)
                    || r.area_name.eq_ignore_ascii_case(area_name)
            })
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn list_reviews(
        &self,
        area_id: Option<&str>,
        area_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Review>, StorageError> {
        let inner = self.read()?;
        let mut reviews: Vec<Review> = inner
            .reviews
            .iter()
            .filter(|r| {
                area_id.is_none_or(|id| r.area_id.as_deref() == Some(id))
                    && area_name.is_none_or(|name| r.area_name.eq_ignore_ascii_case(name))
            })
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reviews.truncate(limit);
        Ok(reviews)
    }
}
