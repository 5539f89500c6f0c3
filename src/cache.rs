//! In-process memo of replacement repos
//!
//! Maps an original repo id to the repo generated in its place during this
//! run. The map is shared by every worker, lives only as long as the run and
//! is never evicted. An id never maps to itself; lookups follow chains left
//! behind by re-caching, bounded so a corrupted map cannot loop forever.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::RepoId;

/// Longest chain a lookup will follow before declaring the map corrupted.
const MAX_CHAIN: usize = 16;

/// Thread-safe original → replacement repo map
#[derive(Debug, Clone, Default)]
pub struct RepoCache {
    cache: Arc<Mutex<HashMap<RepoId, RepoId>>>,
}

impl RepoCache {
    /// Create a new empty repo cache
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<RepoId, RepoId>>> {
        self.cache.lock().map_err(|_| Error::LockPoisoned {
            context: "repo cache".to_string(),
        })
    }

    /// Resolves `original` to its current replacement, following chains.
    ///
    /// Returns `None` when `original` has never been replaced.
    pub fn lookup(&self, original: RepoId) -> Result<Option<RepoId>> {
        let cache = self.guard()?;
        let mut current = match cache.get(&original) {
            Some(next) => *next,
            None => return Ok(None),
        };
        for _ in 0..MAX_CHAIN {
            if current == original {
                return Err(Error::CacheCorrupted {
                    repo_id: original,
                    message: "replacement chain loops back to the original".to_string(),
                });
            }
            match cache.get(&current) {
                Some(next) => current = *next,
                None => return Ok(Some(current)),
            }
        }
        Err(Error::CacheCorrupted {
            repo_id: original,
            message: format!("replacement chain longer than {}", MAX_CHAIN),
        })
    }

    /// Records `replacement` for `original` unless one is already present.
    ///
    /// Returns the replacement that ends up cached, which is the earlier one
    /// when another worker won the race.
    pub fn insert_if_absent(&self, original: RepoId, replacement: RepoId) -> Result<RepoId> {
        Self::check_distinct(original, replacement)?;
        let mut cache = self.guard()?;
        Ok(*cache.entry(original).or_insert(replacement))
    }

    /// Records `replacement` for `original`, overwriting a stale entry.
    pub fn replace(&self, original: RepoId, replacement: RepoId) -> Result<()> {
        Self::check_distinct(original, replacement)?;
        self.guard()?.insert(original, replacement);
        Ok(())
    }

    fn check_distinct(original: RepoId, replacement: RepoId) -> Result<()> {
        if original == replacement {
            return Err(Error::CacheCorrupted {
                repo_id: original,
                message: "a repo cannot replace itself".to_string(),
            });
        }
        Ok(())
    }

    /// Get the number of cached entries
    pub fn len(&self) -> Result<usize> {
        Ok(self.guard()?.len())
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.guard()?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cache_operations() {
        let cache = RepoCache::new();

        // Initially empty
        assert!(cache.is_empty().unwrap());
        assert_eq!(cache.lookup(10).unwrap(), None);

        assert_eq!(cache.insert_if_absent(10, 20).unwrap(), 20);
        assert_eq!(cache.lookup(10).unwrap(), Some(20));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_insert_if_absent_keeps_first_writer() {
        let cache = RepoCache::new();
        cache.insert_if_absent(10, 20).unwrap();
        assert_eq!(cache.insert_if_absent(10, 30).unwrap(), 20);
        assert_eq!(cache.lookup(10).unwrap(), Some(20));
    }

    #[test]
    fn test_replace_overwrites_stale_entry() {
        let cache = RepoCache::new();
        cache.insert_if_absent(10, 20).unwrap();
        cache.replace(10, 30).unwrap();
        assert_eq!(cache.lookup(10).unwrap(), Some(30));
    }

    #[test]
    fn test_self_mapping_rejected() {
        let cache = RepoCache::new();
        assert!(matches!(
            cache.insert_if_absent(5, 5),
            Err(Error::CacheCorrupted { repo_id: 5, .. })
        ));
        assert!(cache.replace(5, 5).is_err());
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_lookup_follows_chain() {
        let cache = RepoCache::new();
        cache.insert_if_absent(1, 2).unwrap();
        cache.insert_if_absent(2, 3).unwrap();
        assert_eq!(cache.lookup(1).unwrap(), Some(3));
    }

    #[test]
    fn test_lookup_detects_cycle() {
        let cache = RepoCache::new();
        cache.insert_if_absent(1, 2).unwrap();
        cache.insert_if_absent(2, 1).unwrap();
        assert!(matches!(
            cache.lookup(1),
            Err(Error::CacheCorrupted { repo_id: 1, .. })
        ));
    }

    #[test]
    fn test_concurrent_inserts_agree() {
        let cache = RepoCache::new();
        let winners: Vec<RepoId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let cache = cache.clone();
                    s.spawn(move || cache.insert_if_absent(100, 200 + i).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        let cached = cache.lookup(100).unwrap().unwrap();
        assert!(winners.iter().all(|w| *w == cached));
    }

    proptest! {
        /// Property: lookups terminate and never return the key itself
        #[test]
        fn lookup_terminates_and_never_self_maps(
            pairs in proptest::collection::vec((0i64..20, 0i64..20), 0..40),
            key in 0i64..20,
        ) {
            let cache = RepoCache::new();
            for (original, replacement) in pairs {
                let _ = cache.insert_if_absent(original, replacement);
            }
            match cache.lookup(key) {
                Ok(Some(found)) => prop_assert_ne!(found, key),
                Ok(None) | Err(Error::CacheCorrupted { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }
    }
}
