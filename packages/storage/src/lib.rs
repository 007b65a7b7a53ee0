#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Storage abstraction for zones, areas, and reviews.
//!
//! The engine never talks to a concrete database; every component receives
//! an injected [`Storage`] handle. The contract assumes an ordered-by-time
//! document store with a case-insensitive unique index on area names.
//! [`MemoryStorage`] is the in-memory reference implementation used by the
//! server and tests.

pub mod memory;

pub use memory::MemoryStorage;

use async_trait::async_trait;
use safety_map_models::{Area, Review, SafetyError, Zone};
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The referenced record does not exist.
    #[error("Record not found: {message}")]
    NotFound {
        /// Description of the missing record.
        message: String,
    },

    /// A unique constraint was violated (duplicate area name).
    #[error("Unique constraint violation: {message}")]
    Conflict {
        /// Description of the colliding key.
        message: String,
    },

    /// The store itself failed.
    #[error("Storage failure: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl From<StorageError> for SafetyError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { message } => Self::NotFound { message },
            StorageError::Conflict { message } => Self::Conflict { message },
            StorageError::Internal { message } => Self::Internal { message },
        }
    }
}

/// How an area name lookup matches against stored names.
///
/// All modes compare case-insensitively against whitespace-normalized
/// input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    /// The whole name matches.
    Exact,
    /// The stored name starts with the query ("Shillong" matches
    /// "Shillong, Meghalaya").
    Prefix,
    /// The query appears anywhere in the stored name.
    Contains,
}

/// Document store contract for the safety map engine.
///
/// Implementations must provide a case-insensitive unique index on area
/// names ([`Storage::insert_area`] reports [`StorageError::Conflict`] on a
/// duplicate) and return reviews newest first.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persists a new zone.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store fails.
    async fn insert_zone(&self, zone: Zone) -> Result<Zone, StorageError>;

    /// Fetches a zone by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store fails.
    async fn get_zone(&self, id: &str) -> Result<Option<Zone>, StorageError>;

    /// Lists all zones, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store fails.
    async fn list_zones(&self) -> Result<Vec<Zone>, StorageError>;

    /// Persists a new area.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if an area with the same name
    /// (case-insensitive) already exists, or [`StorageError`] if the store
    /// fails.
    async fn insert_area(&self, area: Area) -> Result<Area, StorageError>;

    /// Fetches an area by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store fails.
    async fn get_area(&self, id: &str) -> Result<Option<Area>, StorageError>;

    /// Finds areas whose name matches `name` under `mode`, in name order,
    /// capped at `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store fails.
    async fn find_areas_by_name(
        &self,
        name: &str,
        mode: NameMatch,
        limit: usize,
    ) -> Result<Vec<Area>, StorageError>;

    /// Replaces an existing area record (keyed by id).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no area has this id, or
    /// [`StorageError`] if the store fails.
    async fn update_area(&self, area: Area) -> Result<Area, StorageError>;

    /// Lists areas in name order, capped at `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store fails.
    async fn list_areas(&self, limit: usize) -> Result<Vec<Area>, StorageError>;

    /// Persists a new review.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store fails.
    async fn insert_review(&self, review: Review) -> Result<Review, StorageError>;

    /// Deletes a review by id. Used only to roll back a just-written
    /// review when the aggregate recompute fails.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no review has this id, or
    /// [`StorageError`] if the store fails.
    async fn delete_review(&self, id: &str) -> Result<(), StorageError>;

    /// Returns every review bound to an area, newest first: the union of
    /// reviews matched by `area_id` and by case-insensitive exact
    /// `area_name`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store fails.
    async fn reviews_for_area(
        &self,
        area_id: &str,
        area_name: &str,
    ) -> Result<Vec<Review>, StorageError>;

    /// Lists reviews newest first, optionally filtered by area id and/or
    /// case-insensitive exact area name, capped at `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store fails.
    async fn list_reviews(
        &self,
        area_id: Option<&str>,
        area_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Review>, StorageError>;
}
