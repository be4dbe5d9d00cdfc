//! Favorites store
//!
//! In-memory ordered set of favorited movies, unique by id, synchronized to
//! the key-value store. Every mutation re-serializes the full set before
//! returning, so the persisted value always matches what callers observe.
//! Favorites lists are bounded by user behavior, so the O(n) write per
//! mutation is acceptable.

use anyhow::Result;
use std::sync::Arc;

use crate::catalog::Movie;
use crate::storage::KeyValueStore;

/// Storage key holding the serialized favorites array
const FAVORITES_KEY: &str = "favorites";

/// Ordered, id-unique set of favorite movies backed by a key-value store.
///
/// Constructed once at application start; hydration failures (missing key,
/// corrupt JSON) fall back to an empty set rather than propagating.
pub struct FavoritesStore {
    store: Arc<dyn KeyValueStore>,
    movies: Vec<Movie>,
}

impl FavoritesStore {
    /// Hydrate from whatever was last persisted under `"favorites"`.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let movies = match store.get(FAVORITES_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Movie>>(&raw) {
                Ok(movies) => movies,
                Err(e) => {
                    tracing::warn!("Corrupt favorites entry, resetting to empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read favorites, starting empty: {}", e);
                Vec::new()
            }
        };
        Self { store, movies }
    }

    /// Append `movie` unless one with the same id is already present.
    /// Returns whether it was inserted. Persists either way.
    pub fn add(&mut self, movie: Movie) -> Result<bool> {
        let inserted = if self.is_favorite(movie.id) {
            false
        } else {
            self.movies.push(movie);
            true
        };
        self.persist()?;
        Ok(inserted)
    }

    /// Remove the movie with `id`, if present. Returns whether anything was
    /// removed. Persists either way (idempotent).
    pub fn remove(&mut self, id: u64) -> Result<bool> {
        let before = self.movies.len();
        self.movies.retain(|m| m.id != id);
        let removed = self.movies.len() != before;
        self.persist()?;
        Ok(removed)
    }

    /// Remove if present, else add. Returns the new membership state.
    pub fn toggle(&mut self, movie: Movie) -> Result<bool> {
        if self.is_favorite(movie.id) {
            self.remove(movie.id)?;
            Ok(false)
        } else {
            self.add(movie)?;
            Ok(true)
        }
    }

    /// Empty the set and persist the empty array.
    pub fn clear_all(&mut self) -> Result<()> {
        self.movies.clear();
        self.persist()
    }

    /// Membership test by id.
    pub fn is_favorite(&self, id: u64) -> bool {
        self.movies.iter().any(|m| m.id == id)
    }

    /// Current number of favorites (e.g. for a navigation badge).
    pub fn count(&self) -> usize {
        self.movies.len()
    }

    /// Favorites in insertion order.
    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.movies)?;
        self.store.set(FAVORITES_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use proptest::prelude::*;

    fn movie(id: u64, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            poster_path: None,
            release_date: None,
            extra: serde_json::Map::new(),
        }
    }

    fn empty_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_add_then_query() {
        let mut favs = FavoritesStore::load(empty_store());
        assert!(favs.add(movie(1, "Dune")).unwrap());
        assert!(favs.is_favorite(1));
        assert!(!favs.is_favorite(2));
        assert_eq!(favs.count(), 1);
    }

    #[test]
    fn test_re_add_is_noop_and_keeps_order() {
        let mut favs = FavoritesStore::load(empty_store());
        favs.add(movie(1, "Dune")).unwrap();
        favs.add(movie(2, "Heat")).unwrap();
        assert!(!favs.add(movie(1, "Dune again")).unwrap());

        assert_eq!(favs.count(), 2);
        let ids: Vec<u64> = favs.movies().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
        // Original payload kept, not the re-added one
        assert_eq!(favs.movies()[0].title, "Dune");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut favs = FavoritesStore::load(empty_store());
        favs.add(movie(1, "Dune")).unwrap();
        assert!(favs.remove(1).unwrap());
        assert!(!favs.is_favorite(1));
        // Absent id: no-op both times, never an error
        assert!(!favs.remove(1).unwrap());
        assert!(!favs.remove(99).unwrap());
    }

    #[test]
    fn test_toggle() {
        let mut favs = FavoritesStore::load(empty_store());
        assert!(favs.toggle(movie(5, "Ran")).unwrap());
        assert!(favs.is_favorite(5));
        assert!(!favs.toggle(movie(5, "Ran")).unwrap());
        assert!(!favs.is_favorite(5));
    }

    #[test]
    fn test_rehydration_round_trip() {
        let store = empty_store();
        {
            let mut favs = FavoritesStore::load(store.clone());
            favs.add(movie(1, "Dune")).unwrap();
            favs.add(movie(2, "Heat")).unwrap();
            favs.remove(1).unwrap();
        }
        let favs = FavoritesStore::load(store);
        assert_eq!(favs.count(), 1);
        assert!(favs.is_favorite(2));
        assert_eq!(favs.movies()[0].title, "Heat");
    }

    #[test]
    fn test_clear_all_persists_empty() {
        let store = empty_store();
        {
            let mut favs = FavoritesStore::load(store.clone());
            favs.add(movie(1, "Dune")).unwrap();
            favs.clear_all().unwrap();
        }
        assert_eq!(store.get("favorites").unwrap().as_deref(), Some("[]"));
        let favs = FavoritesStore::load(store);
        assert_eq!(favs.count(), 0);
    }

    #[test]
    fn test_corrupt_persisted_value_resets_to_empty() {
        let store = empty_store();
        store.set("favorites", "{not json").unwrap();
        let favs = FavoritesStore::load(store);
        assert_eq!(favs.count(), 0);
    }

    proptest! {
        /// No operation sequence can produce two entries with the same id.
        #[test]
        fn prop_ids_stay_unique(ops in proptest::collection::vec((0u8..3, 0u64..8), 0..40)) {
            let mut favs = FavoritesStore::load(empty_store());
            for (op, id) in ops {
                match op {
                    0 => { favs.add(movie(id, "m")).unwrap(); }
                    1 => { favs.remove(id).unwrap(); }
                    _ => { favs.toggle(movie(id, "m")).unwrap(); }
                }
                let mut ids: Vec<u64> = favs.movies().iter().map(|m| m.id).collect();
                ids.sort_unstable();
                ids.dedup();
                prop_assert_eq!(ids.len(), favs.count());
            }
        }
    }
}
