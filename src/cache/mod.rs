//! The shared mapping from surface/region identifiers and resource
//! categories to wire resources (§4.2).
//!
//! A single mutex protects every map and list here. [`Cache::lock`]
//! hands out the guard that is the "bracket" described in §4.2/§5: the
//! facade and gateway take it, do a short in-memory operation (map
//! lookup, list append/remove, slot write), and drop it before doing
//! any I/O or calling into the coordinator. [`CacheInner`]'s methods
//! are the primitives that assume the lock is already held.
//!
//! Austin Shafer - 2020

mod inner;

pub use inner::{
    CacheInner, GeneralResource, RegionRecord, RoleSlot, SurfaceRecord, SurfaceResource, SurfaceRole,
};

use std::sync::{Mutex, MutexGuard};

/// The thread-safe registry of surfaces, regions, and categorized wire
/// resources. The single source of truth for "which client owns what".
#[derive(Default)]
pub struct Cache {
    inner: Mutex<CacheInner>,
}

impl Cache {
    pub fn new() -> Self {
        Cache {
            inner: Mutex::new(CacheInner::new()),
        }
    }

    /// Take the cache lock. Held-lock sections must stay short: in-memory
    /// work only (map lookup, list append/remove, slot write), plus
    /// direct event emission to resources already resolved from the
    /// cache (§5 permits this non-blocking wire write during
    /// enumeration). No blocking I/O and no coordinator calls while the
    /// guard is alive (§4.2/§5).
    pub fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // A non-reentrant mutex is fine here: nothing in this crate
        // re-enters the cache from a thread that already holds it.
        // Wire-library unbind callbacks run on the protocol thread with
        // no other lock held (see DESIGN.md), so they may freely lock
        // here too.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
