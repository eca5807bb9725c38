use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::record::EntityRecord;

/// Thread-safe LRU cache for fetched entity documents
///
/// Keyed by the entity name as requested (before percent-encoding).
/// Uses LRU eviction policy to maintain bounded memory usage.
pub struct RecordCache {
    cache: Mutex<LruCache<String, EntityRecord>>,
}

impl RecordCache {
    /// Create a new record cache holding at most `capacity` documents
    /// (a capacity of 0 is treated as 1).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, EntityRecord>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a cached document, marking it most recently used
    pub fn get(&self, entity: &str) -> Option<EntityRecord> {
        self.lock().get(entity).cloned()
    }

    /// Store a document in the cache
    pub fn put(&self, entity: String, record: EntityRecord) {
        self.lock().put(entity, record);
    }

    /// Get the current number of cached entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clear all entries from the cache
    pub fn clear(&self) {
        self.lock().clear();
    }
}
