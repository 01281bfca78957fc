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

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use hotcache_common::{hasher::bucket_of, spin::RawSpinLock, strict_assert};
use itertools::Itertools;
use rand::Rng;

use crate::object::{ObjHandle, ObjectArena, NIL};

/// Chain length that has to be exceeded before growth is reported.
const INITIAL_MAX_CHAIN_LEN: usize = 16;

#[derive(Debug)]
struct Bucket {
    lock: RawSpinLock,
    head: AtomicU32,
}

impl Bucket {
    fn new() -> Self {
        Self {
            lock: RawSpinLock::new(),
            head: AtomicU32::new(NIL),
        }
    }
}

struct BucketGuard<'a> {
    bucket: &'a Bucket,
}

impl BucketGuard<'_> {
    fn head(&self) -> u32 {
        self.bucket.head.load(Ordering::Relaxed)
    }

    fn set_head(&self, index: u32) {
        self.bucket.head.store(index, Ordering::Relaxed)
    }
}

impl Drop for BucketGuard<'_> {
    fn drop(&mut self) {
        self.bucket.lock.unlock();
    }
}

/// Chained hash table from object id to [`ObjHandle`].
///
/// The table owns the [`ObjectArena`]: slots are allocated on insertion and released on removal, both inside the
/// bucket's critical section. Each bucket carries its own test-and-test-and-set lock, so operations on different
/// buckets never contend. The bucket count is fixed at `1 << hash_power`.
#[derive(Debug)]
pub struct HashIndex {
    arena: ObjectArena,
    hash_power: u8,
    buckets: Box<[Bucket]>,
    len: AtomicUsize,
    max_chain_len: AtomicUsize,
}

impl HashIndex {
    /// Create an index of `1 << hash_power` buckets over an arena of `object_slots` slots.
    pub fn new(hash_power: u8, object_slots: usize) -> Self {
        assert!((1..=31).contains(&hash_power), "hash power out of range: {hash_power}");
        let buckets = (0..1usize << hash_power).map(|_| Bucket::new()).collect_vec().into_boxed_slice();
        Self {
            arena: ObjectArena::new(object_slots),
            hash_power,
            buckets,
            len: AtomicUsize::new(0),
            max_chain_len: AtomicUsize::new(INITIAL_MAX_CHAIN_LEN),
        }
    }

    /// The backing arena.
    pub fn arena(&self) -> &ObjectArena {
        &self.arena
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets.
    pub fn buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Bit width of the bucket array.
    pub fn hash_power(&self) -> u8 {
        self.hash_power
    }

    /// Objects per bucket.
    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.buckets() as f64
    }

    fn lock(&self, bucket: usize) -> BucketGuard<'_> {
        let bucket = &self.buckets[bucket];
        bucket.lock.lock();
        BucketGuard { bucket }
    }

    /// Returns the slot of `obj_id` if chained, and the number of visited objects.
    fn scan(&self, guard: &BucketGuard<'_>, obj_id: u64) -> (Option<u32>, usize) {
        let mut cursor = guard.head();
        let mut visited = 0;
        while cursor != NIL {
            visited += 1;
            let obj = self.arena.get(cursor);
            if obj.obj_id() == obj_id {
                return (Some(cursor), visited);
            }
            cursor = obj.hash_next.load(Ordering::Relaxed);
        }
        (None, visited)
    }

    /// Insert a new object.
    ///
    /// Returns `None` without modifying anything if `obj_id` is already present.
    pub fn insert(&self, obj_id: u64, obj_size: u32) -> Option<ObjHandle> {
        let guard = self.lock(bucket_of(obj_id, self.hash_power));
        let (found, chain_len) = self.scan(&guard, obj_id);
        if found.is_some() {
            return None;
        }

        let handle = self.arena.alloc(obj_id, obj_size);
        self.arena
            .get(handle.index())
            .hash_next
            .store(guard.head(), Ordering::Relaxed);
        guard.set_head(handle.index());
        self.len.fetch_add(1, Ordering::Relaxed);
        drop(guard);

        self.observe_chain_len(chain_len + 1);
        Some(handle)
    }

    /// Look up `obj_id`.
    pub fn find(&self, obj_id: u64) -> Option<ObjHandle> {
        let guard = self.lock(bucket_of(obj_id, self.hash_power));
        self.scan(&guard, obj_id).0.map(|index| self.arena.handle_at(index))
    }

    /// Unlink the object of `handle` and free its slot.
    ///
    /// Returns `false` if the handle is stale, e.g. the object has been removed concurrently.
    pub fn remove(&self, handle: ObjHandle) -> bool {
        if !self.arena.is_live(handle) {
            return false;
        }
        let obj_id = self.arena.get(handle.index()).obj_id();
        self.remove_where(obj_id, |index| index == handle.index() && self.arena.is_live(handle))
            .is_some()
    }

    /// Unlink and free the object with `obj_id`, returning its now stale handle.
    pub fn remove_id(&self, obj_id: u64) -> Option<ObjHandle> {
        self.remove_where(obj_id, |index| self.arena.get(index).obj_id() == obj_id)
    }

    fn remove_where(&self, obj_id: u64, hit: impl Fn(u32) -> bool) -> Option<ObjHandle> {
        let guard = self.lock(bucket_of(obj_id, self.hash_power));

        let mut prev = NIL;
        let mut cursor = guard.head();
        let mut chain_len = 0;
        let removed = loop {
            if cursor == NIL {
                break None;
            }
            chain_len += 1;
            let obj = self.arena.get(cursor);
            let next = obj.hash_next.load(Ordering::Relaxed);
            if hit(cursor) {
                if prev == NIL {
                    guard.set_head(next);
                } else {
                    self.arena.get(prev).hash_next.store(next, Ordering::Relaxed);
                }
                let handle = self.arena.handle_at(cursor);
                let freed = self.arena.free(handle);
                strict_assert!(freed);
                self.len.fetch_sub(1, Ordering::Relaxed);
                break Some(handle);
            }
            prev = cursor;
            cursor = next;
        };
        drop(guard);

        self.observe_chain_len(chain_len);
        removed
    }

    fn observe_chain_len(&self, chain_len: usize) {
        let max = self.max_chain_len.fetch_max(chain_len, Ordering::Relaxed);
        if chain_len > max {
            tracing::warn!(
                chain_len,
                load_factor = self.load_factor(),
                hash_power = self.hash_power,
                "[hash index]: hash chain grows longer than ever, consider a larger hash power"
            );
            tracing::debug!(distribution = ?self.chain_len_distribution(), "[hash index]: chain length distribution");
        }
    }

    /// Pick a uniformly random bucket among the non-empty ones, then a uniformly random object in its chain.
    ///
    /// Returns `None` only if the index is empty.
    pub fn random(&self) -> Option<ObjHandle> {
        let mut rng = rand::rng();
        loop {
            if self.is_empty() {
                return None;
            }
            let bucket = rng.random_range(0..self.buckets.len());
            if self.buckets[bucket].head.load(Ordering::Relaxed) == NIL {
                continue;
            }

            let guard = self.lock(bucket);
            let chain = self.chain(&guard).collect_vec();
            if chain.is_empty() {
                continue;
            }
            let index = chain[rng.random_range(0..chain.len())];
            return Some(self.arena.handle_at(index));
        }
    }

    fn chain<'a>(&'a self, guard: &BucketGuard<'_>) -> impl Iterator<Item = u32> + 'a {
        let mut cursor = guard.head();
        std::iter::from_fn(move || {
            if cursor == NIL {
                return None;
            }
            let current = cursor;
            cursor = self.arena.get(current).hash_next.load(Ordering::Relaxed);
            Some(current)
        })
    }

    /// Handles of every indexed object, bucket by bucket.
    pub fn handles(&self) -> Vec<ObjHandle> {
        (0..self.buckets.len())
            .flat_map(|bucket| {
                let guard = self.lock(bucket);
                self.chain(&guard).map(|index| self.arena.handle_at(index)).collect_vec()
            })
            .collect()
    }

    /// `result[n]` is the number of buckets whose chain holds `n` objects.
    pub fn chain_len_distribution(&self) -> Vec<usize> {
        let mut distribution = vec![];
        for bucket in 0..self.buckets.len() {
            let len = {
                let guard = self.lock(bucket);
                self.chain(&guard).count()
            };
            if distribution.len() <= len {
                distribution.resize(len + 1, 0);
            }
            distribution[len] += 1;
        }
        distribution
    }

    /// Verify every object hashes to the bucket it is chained in and that ids are unique.
    pub fn check_integrity(&self) -> bool {
        let mut seen = hashbrown::HashSet::new();
        for bucket in 0..self.buckets.len() {
            let guard = self.lock(bucket);
            for index in self.chain(&guard) {
                let obj = self.arena.get(index);
                if !obj.is_allocated() || bucket_of(obj.obj_id(), self.hash_power) != bucket || !seen.insert(obj.obj_id())
                {
                    return false;
                }
            }
        }
        seen.len() == self.len()
    }
}
