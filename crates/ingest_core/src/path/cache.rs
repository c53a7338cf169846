//! Per-submission memo of live repository lookups.
//!
//! # Invariants
//! - Cached answers never outlive one pipeline run: `Pipeline::run` clears
//!   the cache before its first filter.
//! - Collaborator errors are never cached.

use crate::external::{CollaboratorError, ContainerHandle, ExternalPathIndex};
use crate::model::object::ContentModel;
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// Caching wrapper around an `ExternalPathIndex`.
pub struct CachedPathIndex<'a> {
    inner: &'a dyn ExternalPathIndex,
    lookups: HashMap<String, Option<ContainerHandle>>,
    models: HashMap<ContainerHandle, BTreeSet<ContentModel>>,
    hits: u64,
    misses: u64,
}

impl<'a> CachedPathIndex<'a> {
    pub fn new(inner: &'a dyn ExternalPathIndex) -> Self {
        Self {
            inner,
            lookups: HashMap::new(),
            models: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn lookup(&mut self, path: &str) -> Result<Option<ContainerHandle>, CollaboratorError> {
        if let Some(cached) = self.lookups.get(path) {
            self.hits += 1;
            return Ok(cached.clone());
        }
        self.misses += 1;
        let resolved = self.inner.lookup(path)?;
        debug!(
            "event=path_lookup module=path status=ok found={}",
            resolved.is_some()
        );
        self.lookups.insert(path.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// Whether anything lives at `path` in the live repository.
    pub fn exists(&mut self, path: &str) -> Result<bool, CollaboratorError> {
        Ok(self.lookup(path)?.is_some())
    }

    pub fn content_models(
        &mut self,
        handle: &ContainerHandle,
    ) -> Result<BTreeSet<ContentModel>, CollaboratorError> {
        if let Some(cached) = self.models.get(handle) {
            self.hits += 1;
            return Ok(cached.clone());
        }
        self.misses += 1;
        let models = self.inner.list_content_models(handle)?;
        self.models.insert(handle.clone(), models.clone());
        Ok(models)
    }

    /// Forgets every cached answer and resets the counters.
    pub fn clear(&mut self) {
        self.lookups.clear();
        self.models.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// `(hits, misses)` since creation or the last `clear`.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::CachedPathIndex;
    use crate::external::{CollaboratorError, ContainerHandle, ExternalPathIndex};
    use crate::model::object::ContentModel;
    use std::cell::Cell;
    use std::collections::BTreeSet;

    struct CountingIndex {
        calls: Cell<usize>,
        fail: bool,
    }

    impl ExternalPathIndex for CountingIndex {
        fn lookup(&self, path: &str) -> Result<Option<ContainerHandle>, CollaboratorError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(CollaboratorError::new("counting_index", "offline"));
            }
            Ok((path == "/unit").then(|| ContainerHandle {
                node_id: "n1".to_string(),
                path: path.to_string(),
            }))
        }

        fn list_content_models(
            &self,
            _handle: &ContainerHandle,
        ) -> Result<BTreeSet<ContentModel>, CollaboratorError> {
            self.calls.set(self.calls.get() + 1);
            Ok(BTreeSet::from([ContentModel::AdminUnit]))
        }
    }

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let inner = CountingIndex {
            calls: Cell::new(0),
            fail: false,
        };
        let mut cache = CachedPathIndex::new(&inner);

        assert!(cache.exists("/unit").unwrap());
        assert!(cache.exists("/unit").unwrap());
        assert!(!cache.exists("/missing").unwrap());
        assert!(!cache.exists("/missing").unwrap());
        let handle = cache.lookup("/unit").unwrap().unwrap();
        cache.content_models(&handle).unwrap();
        cache.content_models(&handle).unwrap();

        assert_eq!(inner.calls.get(), 3);
        assert_eq!(cache.stats(), (4, 3));
    }

    #[test]
    fn errors_are_not_cached() {
        let inner = CountingIndex {
            calls: Cell::new(0),
            fail: true,
        };
        let mut cache = CachedPathIndex::new(&inner);

        assert!(cache.lookup("/unit").is_err());
        assert!(cache.lookup("/unit").is_err());
        assert_eq!(inner.calls.get(), 2);
    }

    #[test]
    fn clear_forces_fresh_lookups() {
        let inner = CountingIndex {
            calls: Cell::new(0),
            fail: false,
        };
        let mut cache = CachedPathIndex::new(&inner);

        assert!(cache.exists("/unit").unwrap());
        cache.clear();
        assert_eq!(cache.stats(), (0, 0));
        assert!(cache.exists("/unit").unwrap());
        assert_eq!(inner.calls.get(), 2);
    }
}
