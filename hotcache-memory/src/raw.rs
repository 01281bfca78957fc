// Copyright 2026 hotcache Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::{
    indexer::HashIndex,
    object::{ObjHandle, ObjectArena},
    request::Request,
};

/// Shared state every policy builds on: the index with its arena, the byte budget, and the resident counters.
///
/// Policies route all structural bookkeeping through [`CacheCore::insert_base`], [`CacheCore::evict_base`] and
/// [`CacheCore::remove_base`] so that the counters agree with the index.
#[derive(Debug)]
pub struct CacheCore {
    index: HashIndex,
    capacity: u64,

    n_obj: AtomicU64,
    occupied: AtomicU64,
    n_insert: AtomicU64,
    n_evict: AtomicU64,

    warmup_complete: AtomicBool,
}

impl CacheCore {
    /// Create the core of a cache holding at most `capacity` bytes.
    pub fn new(capacity: u64, hash_power: u8, object_slots: usize) -> Self {
        Self {
            index: HashIndex::new(hash_power, object_slots),
            capacity,
            n_obj: AtomicU64::new(0),
            occupied: AtomicU64::new(0),
            n_insert: AtomicU64::new(0),
            n_evict: AtomicU64::new(0),
            warmup_complete: AtomicBool::new(false),
        }
    }

    /// The hash index.
    pub fn index(&self) -> &HashIndex {
        &self.index
    }

    /// The object arena behind the index.
    pub fn arena(&self) -> &ObjectArena {
        self.index.arena()
    }

    /// Byte budget.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Resident objects.
    pub fn n_obj(&self) -> u64 {
        self.n_obj.load(Ordering::Relaxed)
    }

    /// Resident bytes.
    pub fn occupied(&self) -> u64 {
        self.occupied.load(Ordering::Relaxed)
    }

    /// Successful insertions so far.
    pub fn n_insert(&self) -> u64 {
        self.n_insert.load(Ordering::Relaxed)
    }

    /// Evictions so far.
    pub fn n_evict(&self) -> u64 {
        self.n_evict.load(Ordering::Relaxed)
    }

    /// Whether the single-threaded warm-up phase is over.
    #[inline]
    pub fn is_warmup_complete(&self) -> bool {
        self.warmup_complete.load(Ordering::Acquire)
    }

    /// Switch to the concurrent phase.
    pub fn complete_warmup(&self) {
        if !self.warmup_complete.swap(true, Ordering::AcqRel) {
            tracing::info!(
                n_obj = self.n_obj(),
                occupied = self.occupied(),
                capacity = self.capacity,
                "[cache]: warm-up complete"
            );
        }
    }

    /// Whether the object fits in the cache at all.
    #[inline]
    pub fn can_insert(&self, req: &Request) -> bool {
        req.obj_size as u64 <= self.capacity
    }

    /// Whether inserting `req` would exceed the byte budget.
    #[inline]
    pub fn needs_eviction(&self, req: &Request) -> bool {
        self.occupied() + req.obj_size as u64 > self.capacity
    }

    /// Index `req` and account for it. Returns `None` if the id is already resident.
    pub fn insert_base(&self, req: &Request) -> Option<ObjHandle> {
        let handle = self.index.insert(req.obj_id, req.obj_size)?;
        self.n_obj.fetch_add(1, Ordering::Relaxed);
        self.occupied.fetch_add(req.obj_size as u64, Ordering::Relaxed);
        self.n_insert.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(obj_id = req.obj_id, obj_size = req.obj_size, "[cache]: insert");
        Some(handle)
    }

    /// Drop the object of `handle` from the index and the counters. Returns `false` for stale handles.
    pub fn remove_base(&self, handle: ObjHandle) -> bool {
        let obj = self.arena().get(handle.index());
        let (obj_id, obj_size) = (obj.obj_id(), obj.obj_size());
        if !self.index.remove(handle) {
            return false;
        }
        self.n_obj.fetch_sub(1, Ordering::Relaxed);
        self.occupied.fetch_sub(obj_size as u64, Ordering::Relaxed);
        tracing::trace!(obj_id, obj_size, "[cache]: remove");
        true
    }

    /// [`CacheCore::remove_base`] counted as an eviction.
    pub fn evict_base(&self, handle: ObjHandle) -> bool {
        let removed = self.remove_base(handle);
        if removed {
            self.n_evict.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bookkeeping() {
        let core = CacheCore::new(100, 4, 16);
        let a = core.insert_base(&Request::new(1, 60)).unwrap();
        assert!(core.insert_base(&Request::new(1, 60)).is_none());
        assert_eq!(core.occupied(), 60);
        assert!(core.needs_eviction(&Request::new(2, 41)));
        assert!(!core.needs_eviction(&Request::new(2, 40)));
        assert!(!core.can_insert(&Request::new(3, 101)));

        assert!(core.evict_base(a));
        assert!(!core.evict_base(a));
        assert_eq!(core.n_obj(), 0);
        assert_eq!(core.occupied(), 0);
        assert_eq!(core.n_evict(), 1);
        assert_eq!(core.n_insert(), 1);
    }
}
