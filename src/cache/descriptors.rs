//! Resolution cache with LRU eviction.
//!
//! Keeps recently resolved descriptors in memory so repeated lookups of the
//! same source skip the expensive backend call.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::types::ResolutionDescriptor;

/// Default number of descriptors to keep.
pub const DEFAULT_CAPACITY: usize = 128;

/// Lookup-and-insert interface the resolver depends on.
///
/// Implementations must be safe to call from many requests at once.
pub trait DescriptorCache: Send + Sync {
    /// Returns the descriptor for `identifier`, refreshing its recency.
    fn get(&self, identifier: &str) -> Option<ResolutionDescriptor>;

    /// Inserts or replaces the descriptor under its identifier.
    fn put(&self, descriptor: ResolutionDescriptor);

    /// Number of cached descriptors.
    fn len(&self) -> usize;

    /// Returns true if nothing is cached.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Descriptor cache with LRU eviction policy.
pub struct ResolutionCache {
    /// Descriptors indexed by identifier.
    entries: HashMap<String, CacheEntry>,
    /// Maximum number of entries to keep.
    capacity: usize,
    /// Monotonic access counter.
    clock: u64,
}

/// A cached descriptor with its last access tick.
struct CacheEntry {
    descriptor: ResolutionDescriptor,
    last_accessed: u64,
}

impl ResolutionCache {
    /// Creates a new cache with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a new cache with specified capacity (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
            clock: 0,
        }
    }

    /// Returns a descriptor by identifier, updating its access time.
    pub fn get(&mut self, identifier: &str) -> Option<&ResolutionDescriptor> {
        let tick = self.tick();
        let entry = self.entries.get_mut(identifier)?;
        entry.last_accessed = tick;
        Some(&entry.descriptor)
    }

    /// Inserts a descriptor into the cache.
    ///
    /// If the cache is full and the key is new, the least recently used
    /// entry is evicted first. Returns the evicted descriptor, if any.
    pub fn put(&mut self, descriptor: ResolutionDescriptor) -> Option<ResolutionDescriptor> {
        let evicted = if self.entries.len() >= self.capacity
            && !self.entries.contains_key(&descriptor.identifier)
        {
            self.evict_lru()
        } else {
            None
        };

        let tick = self.tick();
        self.entries.insert(
            descriptor.identifier.clone(),
            CacheEntry {
                descriptor,
                last_accessed: tick,
            },
        );

        evicted
    }

    /// Checks if an identifier exists in the cache without touching recency.
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Returns the number of descriptors in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Evicts the least recently used entry.
    fn evict_lru(&mut self) -> Option<ResolutionDescriptor> {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(k, _)| k.clone())?;

        self.entries.remove(&oldest_key).map(|entry| entry.descriptor)
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide cache: one mutex around the LRU covers lookup and insert.
pub struct SharedResolutionCache {
    inner: Mutex<ResolutionCache>,
}

impl SharedResolutionCache {
    /// Creates a shared cache holding at most `capacity` descriptors.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ResolutionCache::with_capacity(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResolutionCache> {
        // A panic while holding the lock cannot leave the map half-updated,
        // so a poisoned guard is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DescriptorCache for SharedResolutionCache {
    fn get(&self, identifier: &str) -> Option<ResolutionDescriptor> {
        self.lock().get(identifier).cloned()
    }

    fn put(&self, descriptor: ResolutionDescriptor) {
        if let Some(evicted) = self.lock().put(descriptor) {
            tracing::debug!(identifier = %evicted.identifier, "evicted resolution descriptor");
        }
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
