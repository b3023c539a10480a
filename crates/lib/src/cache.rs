//! Path-keyed identity cache.
//!
//! The cache guarantees at most one materialized [`Child`] per path within
//! the scope that owns it. It is optional: [`NullCache`] is the default and
//! remembers nothing, which is a normal configuration rather than a fault.
//! [`MemoryCache`] is an in-process implementation with an optional bound.
//!
//! Writes of `None` leave a tombstone: an explicit "known absent" entry,
//! distinct from a path that was never looked up.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::RwLock;

use lru::LruCache;

use crate::locks;
use crate::path::ResourcePath;
use crate::record::Child;

/// Content of a cache entry.
#[derive(Debug, Clone)]
pub enum CacheSlot {
    /// The live instance at the path.
    Live(Child),
    /// The path was explicitly invalidated.
    Tombstone,
}

impl CacheSlot {
    pub fn into_live(self) -> Option<Child> {
        match self {
            CacheSlot::Live(child) => Some(child),
            CacheSlot::Tombstone => None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, CacheSlot::Tombstone)
    }
}

/// Storage for the path to instance mapping.
///
/// Implementations shared across threads must synchronize internally; the
/// engine assumes at most one mutator per cache at a time.
pub trait IdentityCache: Send + Sync {
    /// Entry at `path`, `None` if the path was never cached.
    fn get(&self, path: &ResourcePath) -> Option<CacheSlot>;

    /// Store `child` at `path`; `None` writes a tombstone.
    fn set(&self, path: &ResourcePath, child: Option<Child>);

    /// Forget every entry.
    fn clear(&self) {}

    /// Live instance at `path`, treating tombstones as misses.
    fn live(&self, path: &ResourcePath) -> Option<Child> {
        self.get(path).and_then(CacheSlot::into_live)
    }
}

/// Cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl IdentityCache for NullCache {
    fn get(&self, _path: &ResourcePath) -> Option<CacheSlot> {
        None
    }

    fn set(&self, _path: &ResourcePath, _child: Option<Child>) {}
}

/// In-memory cache with optional least-recently-used eviction.
#[derive(Debug, Default)]
pub struct MemoryCache {
    capacity: Option<usize>,
    state: RwLock<Slots>,
}

enum Slots {
    Unbounded(HashMap<ResourcePath, CacheSlot>),
    Bounded(LruCache<ResourcePath, CacheSlot>),
    /// Capacity zero.
    Disabled,
}

impl Default for Slots {
    fn default() -> Self {
        Slots::Unbounded(HashMap::new())
    }
}

impl fmt::Debug for Slots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slots::Unbounded(slots) => f.debug_struct("Unbounded").field("len", &slots.len()).finish(),
            Slots::Bounded(slots) => f
                .debug_struct("Bounded")
                .field("len", &slots.len())
                .field("cap", &slots.cap())
                .finish(),
            Slots::Disabled => f.write_str("Disabled"),
        }
    }
}

impl Slots {
    fn len(&self) -> usize {
        match self {
            Slots::Unbounded(slots) => slots.len(),
            Slots::Bounded(slots) => slots.len(),
            Slots::Disabled => 0,
        }
    }

    /// Entry at `path` without changing its recency.
    fn peek(&self, path: &ResourcePath) -> Option<&CacheSlot> {
        match self {
            Slots::Unbounded(slots) => slots.get(path),
            Slots::Bounded(slots) => slots.peek(path),
            Slots::Disabled => None,
        }
    }
}

impl MemoryCache {
    /// Unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `capacity` entries, tombstones included.
    ///
    /// A capacity of zero stores nothing, like [`NullCache`].
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = match NonZeroUsize::new(capacity) {
            Some(cap) => Slots::Bounded(LruCache::new(cap)),
            None => Slots::Disabled,
        };
        Self {
            capacity: Some(capacity),
            state: RwLock::new(slots),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        locks::read(&self.state).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `path` holds a tombstone.
    pub fn is_tombstoned(&self, path: &ResourcePath) -> bool {
        locks::read(&self.state)
            .peek(path)
            .is_some_and(CacheSlot::is_tombstone)
    }
}

impl IdentityCache for MemoryCache {
    fn get(&self, path: &ResourcePath) -> Option<CacheSlot> {
        match &mut *locks::write(&self.state) {
            Slots::Unbounded(slots) => slots.get(path).cloned(),
            Slots::Bounded(slots) => slots.get(path).cloned(),
            Slots::Disabled => None,
        }
    }

    fn set(&self, path: &ResourcePath, child: Option<Child>) {
        let slot = child.map_or(CacheSlot::Tombstone, CacheSlot::Live);
        match &mut *locks::write(&self.state) {
            Slots::Unbounded(slots) => {
                slots.insert(path.clone(), slot);
            }
            Slots::Bounded(slots) => {
                // `push` also hands back the old entry when `path` was present.
                match slots.push(path.clone(), slot) {
                    Some((evicted, _)) if evicted != *path => {
                        tracing::trace!(path = %evicted, "Evicted identity cache entry");
                    }
                    _ => {}
                }
            }
            Slots::Disabled => {}
        }
    }

    fn clear(&self) {
        match &mut *locks::write(&self.state) {
            Slots::Unbounded(slots) => slots.clear(),
            Slots::Bounded(slots) => slots.clear(),
            Slots::Disabled => {}
        }
    }
}
