//! Bounded, two-level LRU cache for embedding vectors.
//!
//! The cache groups entries into collections (one per API / plugin
//! instance) and bounds memory at both levels: when the collection limit is
//! reached the least-recently-accessed collection is evicted, and a full
//! collection skips new entries instead of evicting existing ones
//! mid-insert. One instance is shared by all request threads of a process;
//! construct it once and inject it wherever embeddings are cached.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::Embedding;

/// Namespace prefix mixed into every cache-key hash so identical text used
/// for a different purpose cannot collide with embedding keys.
const HASH_PREFIX: &str = "semantic-embedding:";

/// Default bound on the number of collections.
pub const DEFAULT_MAX_COLLECTIONS: usize = 32;

/// Default bound on the number of entries per collection.
pub const DEFAULT_MAX_ENTRIES_PER_COLLECTION: usize = 512;

/// Compute the cache key for a piece of content.
///
/// SHA-256 hex digest of the namespaced text. Pure function: callers can
/// compute keys up front and consult the cache before deciding whether to
/// call the embedding provider at all.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(HASH_PREFIX.as_bytes());
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// A cached embedding, cloned out of the cache on every hit.
///
/// Callers receive an owned copy; mutating it never affects the cached
/// state.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEmbedding {
    /// Logical name of the embedded item (e.g. a tool name).
    pub name: String,

    /// The embedding vector.
    pub vector: Embedding,

    /// Logical tick of the last access.
    last_accessed: u64,
}

/// An item handed to [`EmbeddingCache::bulk_put`].
#[derive(Debug, Clone)]
pub struct PendingEmbedding {
    /// Cache key, computed with [`content_hash`].
    pub hash: String,

    /// Logical name of the embedded item.
    pub name: String,

    /// The embedding vector.
    pub vector: Embedding,
}

impl PendingEmbedding {
    /// Create a new pending item.
    pub fn new(hash: impl Into<String>, name: impl Into<String>, vector: Embedding) -> Self {
        Self {
            hash: hash.into(),
            name: name.into(),
            vector,
        }
    }
}

/// Outcome of a bulk insertion, partitioned per the slot policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkPutOutcome {
    /// Names whose hash was already present (timestamp refreshed).
    pub cached: Vec<String>,

    /// Names inserted into free slots.
    pub added: Vec<String>,

    /// Names that did not fit; they will be re-embedded on future requests
    /// until space frees up.
    pub skipped: Vec<String>,
}

/// One collection of cached embeddings.
#[derive(Debug)]
struct CollectionCache {
    entries: HashMap<String, CachedEmbedding>,
    last_accessed: u64,
}

#[derive(Debug)]
struct CacheInner {
    collections: HashMap<String, CollectionCache>,
    max_collections: usize,
    max_entries_per_collection: usize,
    /// Logical clock, bumped once per operation. Gives a total LRU order
    /// without wall-clock ties.
    clock: u64,
}

impl CacheInner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Create the collection if absent, evicting the globally
    /// least-recently-accessed collection when at capacity.
    ///
    /// The eviction scan is O(collections); the collection limit is tens,
    /// not millions, so a scan beats maintaining an ordered structure.
    fn ensure_collection(&mut self, collection_id: &str, tick: u64) {
        if let Some(collection) = self.collections.get_mut(collection_id) {
            collection.last_accessed = tick;
            return;
        }

        if self.collections.len() >= self.max_collections {
            let oldest = self
                .collections
                .iter()
                .min_by_key(|(_, c)| c.last_accessed)
                .map(|(id, _)| id.clone());
            if let Some(id) = oldest {
                self.collections.remove(&id);
                debug!(collection = %id, "evicted least-recently-used collection");
            }
        }

        self.collections.insert(
            collection_id.to_string(),
            CollectionCache {
                entries: HashMap::new(),
                last_accessed: tick,
            },
        );
        debug!(collection = %collection_id, "created embedding collection");
    }
}

/// Process-wide cache mapping (collection, content hash) to an embedding.
///
/// All operations funnel through a single reader/writer lock: pure reads
/// take the shared lock, anything that touches timestamps or inserts takes
/// the exclusive lock. Both levels are small and bounded, so the coarse
/// lock is cheap and avoids two-level lock-ordering hazards. No operation
/// performs I/O while holding the lock.
pub struct EmbeddingCache {
    inner: RwLock<CacheInner>,
}

impl EmbeddingCache {
    /// Create a cache with the default limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_COLLECTIONS, DEFAULT_MAX_ENTRIES_PER_COLLECTION)
    }

    /// Create a cache with explicit limits. Zero values fall back to the
    /// defaults.
    pub fn with_limits(max_collections: usize, max_entries_per_collection: usize) -> Self {
        let max_collections = if max_collections == 0 {
            DEFAULT_MAX_COLLECTIONS
        } else {
            max_collections
        };
        let max_entries_per_collection = if max_entries_per_collection == 0 {
            DEFAULT_MAX_ENTRIES_PER_COLLECTION
        } else {
            max_entries_per_collection
        };

        Self {
            inner: RwLock::new(CacheInner {
                collections: HashMap::new(),
                max_collections,
                max_entries_per_collection,
                clock: 0,
            }),
        }
    }

    /// Adjust the cache limits at runtime.
    ///
    /// Zero values are ignored so a partial configuration update can never
    /// disable a bound. Shrinking a limit does not evict immediately;
    /// existing overflow drains through the normal eviction/skip policies.
    pub async fn set_limits(&self, max_collections: usize, max_entries_per_collection: usize) {
        let mut inner = self.inner.write().await;
        if max_collections > 0 {
            inner.max_collections = max_collections;
        } else {
            warn!("ignoring non-positive max_collections");
        }
        if max_entries_per_collection > 0 {
            inner.max_entries_per_collection = max_entries_per_collection;
        } else {
            warn!("ignoring non-positive max_entries_per_collection");
        }
    }

    /// Create an empty collection if absent. Idempotent.
    pub async fn ensure_collection(&self, collection_id: &str) {
        let mut inner = self.inner.write().await;
        let tick = inner.tick();
        inner.ensure_collection(collection_id, tick);
    }

    /// Look up a cached embedding.
    ///
    /// A hit refreshes both the entry's and the collection's last-accessed
    /// tick and returns an owned copy of the entry.
    pub async fn get(&self, collection_id: &str, hash: &str) -> Option<CachedEmbedding> {
        let mut inner = self.inner.write().await;
        let tick = inner.tick();
        let collection = inner.collections.get_mut(collection_id)?;
        collection.last_accessed = tick;
        let entry = collection.entries.get_mut(hash)?;
        entry.last_accessed = tick;
        Some(entry.clone())
    }

    /// Insert a batch of embeddings into a collection.
    ///
    /// The insertion contract is two-phase:
    /// 1. Items whose hash is already present are only touched and reported
    ///    as `cached`.
    /// 2. An incoming item whose name matches an existing entry under a
    ///    different hash replaces it (the content of a named item changed),
    ///    so a collection never holds two entries for one logical name.
    /// 3. New items fill the remaining free slots in input order; the rest
    ///    are reported as `skipped`. Existing entries are never evicted to
    ///    make room, so a bulk insert cannot evict its own siblings.
    ///
    /// Creates the collection first, with the same eviction policy as
    /// [`ensure_collection`](Self::ensure_collection).
    pub async fn bulk_put(
        &self,
        collection_id: &str,
        items: Vec<PendingEmbedding>,
    ) -> BulkPutOutcome {
        let mut outcome = BulkPutOutcome::default();
        let mut inner = self.inner.write().await;
        let tick = inner.tick();
        let max_entries = inner.max_entries_per_collection;
        inner.ensure_collection(collection_id, tick);
        let Some(collection) = inner.collections.get_mut(collection_id) else {
            return outcome;
        };

        let mut new_items = Vec::new();
        for item in items {
            if let Some(entry) = collection.entries.get_mut(&item.hash) {
                entry.last_accessed = tick;
                outcome.cached.push(item.name);
            } else {
                new_items.push(item);
            }
        }

        for item in &new_items {
            let stale = collection
                .entries
                .iter()
                .find(|(_, entry)| entry.name == item.name)
                .map(|(hash, _)| hash.clone());
            if let Some(hash) = stale {
                collection.entries.remove(&hash);
                debug!(
                    collection = %collection_id,
                    name = %item.name,
                    "replaced stale entry with changed content"
                );
            }
        }

        let available = max_entries.saturating_sub(collection.entries.len());
        for (index, item) in new_items.into_iter().enumerate() {
            if index < available {
                outcome.added.push(item.name.clone());
                collection.entries.insert(
                    item.hash,
                    CachedEmbedding {
                        name: item.name,
                        vector: item.vector,
                        last_accessed: tick,
                    },
                );
            } else {
                outcome.skipped.push(item.name);
            }
        }

        if !outcome.skipped.is_empty() {
            debug!(
                collection = %collection_id,
                skipped = outcome.skipped.len(),
                "collection full, skipped new entries"
            );
        }

        outcome
    }

    /// Number of entries in a collection, 0 if the collection is absent.
    pub async fn size(&self, collection_id: &str) -> usize {
        let inner = self.inner.read().await;
        inner
            .collections
            .get(collection_id)
            .map_or(0, |c| c.entries.len())
    }

    /// Snapshot of the cache state.
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        CacheStats {
            collections: inner.collections.len(),
            total_entries: inner.collections.values().map(|c| c.entries.len()).sum(),
            max_collections: inner.max_collections,
            max_entries_per_collection: inner.max_entries_per_collection,
        }
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of collections.
    pub collections: usize,

    /// Entries across all collections.
    pub total_entries: usize,

    /// Collection bound.
    pub max_collections: usize,

    /// Per-collection entry bound.
    pub max_entries_per_collection: usize,
}
