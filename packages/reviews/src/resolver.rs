//! Resolves free-text area references to canonical [`Area`] records.
//!
//! The ladder is applied in order, case-insensitively, first hit wins:
//! explicit id, exact name, prefix ("Shillong" matches
//! "Shillong, Meghalaya"), substring, then implicit creation of a neutral
//! area when requested. This is the only implicit-creation path in the
//! system.

use std::sync::Arc;

use safety_map_models::{Area, SafetyError};
use safety_map_storage::{NameMatch, Storage, StorageError};

/// How many candidates each ladder rung contributes to a search.
const SEARCH_RUNG_LIMIT: usize = 20;
/// Maximum merged search results.
pub const SEARCH_LIMIT: usize = 20;

/// A caller-supplied reference to an area: an explicit id, a free-text
/// name, or both (the id wins).
#[derive(Debug, Clone, Default)]
pub struct AreaRef {
    /// Explicit area id, if known.
    pub id: Option<String>,
    /// Free-text area name.
    pub name: Option<String>,
}

impl AreaRef {
    /// Reference by name only.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Reference by id only.
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }
}

/// Collapses internal whitespace and trims. Applied to every name before
/// matching or storing.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Maps free-text area references to canonical records.
pub struct AreaResolver {
    storage: Arc<dyn Storage>,
}

impl AreaResolver {
    /// Creates a resolver over the given storage.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Resolves a reference to an area, optionally creating a neutral one
    /// when nothing matches a free-text name.
    ///
    /// An explicit id never creates: an unknown id is [`SafetyError::NotFound`]
    /// even with `create_if_missing`.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::InvalidArgument`] when both id and name are
    /// empty, [`SafetyError::NotFound`] when nothing matches and creation
    /// was not requested (or an explicit id is unknown), or
    /// [`SafetyError::Internal`] if the store fails.
    pub async fn resolve(
        &self,
        area_ref: &AreaRef,
        create_if_missing: bool,
    ) -> Result<Area, SafetyError> {
        let id = area_ref.id.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let name = area_ref
            .name
            .as_deref()
            .map(normalize_name)
            .filter(|s| !s.is_empty());

        if let Some(id) = id {
            return match self.storage.get_area(id).await? {
                Some(area) => Ok(area),
                None => Err(SafetyError::not_found(format!("no area with id {id}"))),
            };
        }

        let Some(name) = name else {
            return Err(SafetyError::invalid(
                "an area id or a non-empty area name is required",
            ));
        };

        for mode in [NameMatch::Exact, NameMatch::Prefix, NameMatch::Contains] {
            let mut hits = self.storage.find_areas_by_name(&name, mode, 1).await?;
            if let Some(area) = hits.pop() {
                return Ok(area);
            }
        }

        if !create_if_missing {
            return Err(SafetyError::not_found(format!("no area matching {name}")));
        }

        self.create_neutral(&name).await
    }

    /// Creates a neutral area, falling back to re-resolution when a
    /// concurrent request won the creation race.
    async fn create_neutral(&self, name: &str) -> Result<Area, SafetyError> {
        let area = Area::neutral(uuid::Uuid::new_v4().to_string(), name.to_string());
        match self.storage.insert_area(area).await {
            Ok(area) => {
                log::info!("Created area {} ({}) from review submission", area.name, area.id);
                Ok(area)
            }
            Err(StorageError::Conflict { .. }) => {
                // Lost the race; the winner holds the name now.
                let mut hits = self
                    .storage
                    .find_areas_by_name(name, NameMatch::Exact, 1)
                    .await?;
                hits.pop().ok_or_else(|| SafetyError::Internal {
                    message: format!("area {name} conflicted on create but cannot be resolved"),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Searches areas with the same exact / prefix / contains ladder,
    /// merged in rung order and de-duplicated by id, capped at
    /// [`SEARCH_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::InvalidArgument`] for an empty query or
    /// [`SafetyError::Internal`] if the store fails.
    pub async fn search(&self, query: &str) -> Result<Vec<Area>, SafetyError> {
        let query = normalize_name(query);
        if query.is_empty() {
            return Err(SafetyError::invalid("search query must not be empty"));
        }

        let mut merged: Vec<Area> = Vec::new();
        for mode in [NameMatch::Exact, NameMatch::Prefix, NameMatch::Contains] {
            let hits = self
                .storage
                .find_areas_by_name(&query, mode, SEARCH_RUNG_LIMIT)
                .await?;
            for area in hits {
                if !merged.iter().any(|a| a.id == area.id) {
                    merged.push(area);
                }
            }
        }

        merged.truncate(SEARCH_LIMIT);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safety_map_storage::MemoryStorage;

    async fn seeded_resolver() -> AreaResolver {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .insert_area(Area::neutral("a1".into(), "Shillong, Meghalaya".into()))
            .await
            .unwrap();
        storage
            .insert_area(Area::neutral("a2".into(), "Gangtok, Sikkim".into()))
            .await
            .unwrap();
        AreaResolver::new(storage)
    }

    #[tokio::test]
    async fn normalizes_whitespace() {
        assert_eq!(normalize_name("  Shillong,   Meghalaya  "), "Shillong, Meghalaya");
        assert_eq!(normalize_name("\tGangtok\n"), "Gangtok");
    }

    #[tokio::test]
    async fn prefix_match_finds_existing_without_creating() {
        let resolver = seeded_resolver().await;

        let area = resolver
            .resolve(&AreaRef::by_name("shillong"), true)
            .await
            .unwrap();
        assert_eq!(area.id, "a1");
        assert_eq!(area.name, "Shillong, Meghalaya");

        // No duplicate was created.
        let again = resolver
            .resolve(&AreaRef::by_name("Shillong"), true)
            .await
            .unwrap();
        assert_eq!(again.id, "a1");
    }

    #[tokio::test]
    async fn contains_match_is_the_last_rung_before_creation() {
        let resolver = seeded_resolver().await;
        let area = resolver
            .resolve(&AreaRef::by_name("sikkim"), false)
            .await
            .unwrap();
        assert_eq!(area.id, "a2");
    }

    #[tokio::test]
    async fn creates_neutral_area_when_nothing_matches() {
        let resolver = seeded_resolver().await;
        let area = resolver
            .resolve(&AreaRef::by_name("  Tawang,   Arunachal Pradesh "), true)
            .await
            .unwrap();
        assert_eq!(area.name, "Tawang, Arunachal Pradesh");
        assert_eq!(area.rating_count, 0);
        assert_eq!(area.crime_rate, 50.0);
        assert!(area.location.is_none());
    }

    #[tokio::test]
    async fn no_creation_without_flag_or_for_explicit_id() {
        let resolver = seeded_resolver().await;

        assert!(matches!(
            resolver.resolve(&AreaRef::by_name("Aizawl"), false).await,
            Err(SafetyError::NotFound { .. })
        ));
        assert!(matches!(
            resolver.resolve(&AreaRef::by_id("ghost"), true).await,
            Err(SafetyError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn empty_reference_is_invalid() {
        let resolver = seeded_resolver().await;
        assert!(matches!(
            resolver.resolve(&AreaRef::default(), true).await,
            Err(SafetyError::InvalidArgument { .. })
        ));
        assert!(matches!(
            resolver.resolve(&AreaRef::by_name("   "), true).await,
            Err(SafetyError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn explicit_id_wins_over_name() {
        let resolver = seeded_resolver().await;
        let area = resolver
            .resolve(
                &AreaRef {
                    id: Some("a2".into()),
                    name: Some("Shillong".into()),
                },
                false,
            )
            .await
            .unwrap();
        assert_eq!(area.id, "a2");
    }

    #[tokio::test]
    async fn search_merges_rungs_and_dedupes() {
        let resolver = seeded_resolver().await;

        let results = resolver.search("shillong").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a1");

        let results = resolver.search("i").await.unwrap();
        // Both names contain "i"; each appears once.
        assert_eq!(results.len(), 2);

        assert!(matches!(
            resolver.search("  ").await,
            Err(SafetyError::InvalidArgument { .. })
        ));
    }
}
