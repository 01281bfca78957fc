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

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use hotcache_common::strict_assert;

/// The null slot index used by every link field.
pub const NIL: u32 = u32::MAX;

/// A reference to an object in the [`ObjectArena`].
///
/// The handle stays valid while the slot's generation equals the handle's generation. Freeing the slot bumps the
/// generation, so stale handles are detected instead of aliasing the slot's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjHandle {
    index: u32,
    generation: u32,
}

impl ObjHandle {
    /// Slot index of the object.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot index as `usize`, for side tables.
    pub fn slot(&self) -> usize {
        self.index as usize
    }

    /// Generation the handle was issued with.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Per-entry metadata of a resident object.
///
/// Every field is atomic so that racing readers never observe torn values. The link fields are owned by whichever
/// structure the object currently belongs to and are only written under that structure's synchronization.
#[derive(Debug)]
pub struct CacheObject {
    obj_id: AtomicU64,
    obj_size: AtomicU32,
    /// Odd while allocated, even while free.
    generation: AtomicU32,

    pub(crate) prev: AtomicU32,
    pub(crate) next: AtomicU32,
    pub(crate) hash_next: AtomicU32,
    pub(crate) frozen_next: AtomicU32,
    free_next: AtomicU32,
}

impl CacheObject {
    fn new(free_next: u32) -> Self {
        Self {
            obj_id: AtomicU64::new(0),
            obj_size: AtomicU32::new(0),
            generation: AtomicU32::new(0),
            prev: AtomicU32::new(NIL),
            next: AtomicU32::new(NIL),
            hash_next: AtomicU32::new(NIL),
            frozen_next: AtomicU32::new(NIL),
            free_next: AtomicU32::new(free_next),
        }
    }

    /// Object id.
    #[inline]
    pub fn obj_id(&self) -> u64 {
        self.obj_id.load(Ordering::Relaxed)
    }

    /// Object size in bytes.
    #[inline]
    pub fn obj_size(&self) -> u32 {
        self.obj_size.load(Ordering::Relaxed)
    }

    /// Whether the slot currently holds an object.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.generation.load(Ordering::Acquire) & 1 == 1
    }

    #[inline]
    pub(crate) fn prev(&self) -> u32 {
        self.prev.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn next(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_prev(&self, v: u32) {
        self.prev.store(v, Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_next(&self, v: u32) {
        self.next.store(v, Ordering::Relaxed)
    }
}

#[inline]
pub(crate) const fn pack(version: u32, index: u32) -> u64 {
    ((version as u64) << 32) | index as u64
}

#[inline]
pub(crate) fn unpack(packed: u64) -> (u32, u32) {
    ((packed >> 32) as u32, packed as u32)
}

/// Fixed pool of [`CacheObject`] slots with a lock-free free list.
///
/// The free list is a Treiber stack whose head packs a version counter next to the slot index so that a concurrent
/// pop/push pair cannot ABA the head. Running out of slots is fatal.
pub struct ObjectArena {
    slots: Box<[CacheObject]>,
    free_head: AtomicU64,
    allocated: AtomicUsize,
}

impl std::fmt::Debug for ObjectArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectArena")
            .field("capacity", &self.capacity())
            .field("allocated", &self.allocated())
            .finish()
    }
}

impl ObjectArena {
    /// Create an arena of `capacity` free slots.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity > 0 && capacity < NIL as usize,
            "object arena capacity out of range: {capacity}"
        );
        let slots = (0..capacity)
            .map(|i| CacheObject::new(if i + 1 < capacity { i as u32 + 1 } else { NIL }))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            free_head: AtomicU64::new(pack(0, 0)),
            allocated: AtomicUsize::new(0),
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots in use.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Slot at `index`.
    #[inline]
    pub fn get(&self, index: u32) -> &CacheObject {
        &self.slots[index as usize]
    }

    /// Whether `handle` still refers to the object it was issued for.
    #[inline]
    pub fn is_live(&self, handle: ObjHandle) -> bool {
        self.slots[handle.slot()].generation.load(Ordering::Acquire) == handle.generation
    }

    /// Handle of the object currently occupying `index`.
    ///
    /// The caller must know the slot is allocated, which holds for any index reached through a list or a hash chain
    /// under that structure's lock.
    #[inline]
    pub fn handle_at(&self, index: u32) -> ObjHandle {
        let generation = self.slots[index as usize].generation.load(Ordering::Acquire);
        strict_assert!(generation & 1 == 1, "slot {index} is free");
        ObjHandle { index, generation }
    }

    /// Handle of the object at `index`, or `None` if the slot is free.
    #[inline]
    pub fn try_handle_at(&self, index: u32) -> Option<ObjHandle> {
        let generation = self.slots[index as usize].generation.load(Ordering::Acquire);
        (generation & 1 == 1).then_some(ObjHandle { index, generation })
    }

    /// Take a free slot and initialize it.
    ///
    /// # Panics
    ///
    /// Panics when every slot is in use.
    pub fn alloc(&self, obj_id: u64, obj_size: u32) -> ObjHandle {
        let index = loop {
            let packed = self.free_head.load(Ordering::Acquire);
            let (version, head) = unpack(packed);
            if head == NIL {
                panic!(
                    "object arena exhausted: all {} slots are in use, configure more object slots",
                    self.capacity()
                );
            }
            let next = self.slots[head as usize].free_next.load(Ordering::Relaxed);
            if self
                .free_head
                .compare_exchange_weak(
                    packed,
                    pack(version.wrapping_add(1), next),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                break head;
            }
        };

        let slot = &self.slots[index as usize];
        slot.obj_id.store(obj_id, Ordering::Relaxed);
        slot.obj_size.store(obj_size, Ordering::Relaxed);
        slot.prev.store(NIL, Ordering::Relaxed);
        slot.next.store(NIL, Ordering::Relaxed);
        slot.hash_next.store(NIL, Ordering::Relaxed);
        slot.frozen_next.store(NIL, Ordering::Relaxed);
        let generation = slot.generation.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        strict_assert!(generation & 1 == 1);
        self.allocated.fetch_add(1, Ordering::Relaxed);

        ObjHandle { index, generation }
    }

    /// Return the slot of `handle` to the free list.
    ///
    /// Returns `false` and leaves the slot untouched if the handle is stale.
    pub fn free(&self, handle: ObjHandle) -> bool {
        let slot = &self.slots[handle.slot()];
        if slot
            .generation
            .compare_exchange(
                handle.generation,
                handle.generation.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_err()
        {
            return false;
        }

        loop {
            let packed = self.free_head.load(Ordering::Acquire);
            let (version, head) = unpack(packed);
            slot.free_next.store(head, Ordering::Relaxed);
            if self
                .free_head
                .compare_exchange_weak(
                    packed,
                    pack(version.wrapping_add(1), handle.index),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                break;
            }
        }
        self.allocated.fetch_sub(1, Ordering::Relaxed);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use itertools::Itertools;

    use super::*;

    #[test]
    fn test_alloc_free_generation() {
        let arena = ObjectArena::new(2);
        let a = arena.alloc(1, 10);
        let b = arena.alloc(2, 20);
        assert_ne!(a.index(), b.index());
        assert_eq!(arena.get(a.index()).obj_id(), 1);
        assert_eq!(arena.get(b.index()).obj_size(), 20);
        assert_eq!(arena.allocated(), 2);

        assert!(arena.free(a));
        assert!(!arena.is_live(a));
        assert!(!arena.free(a));

        let c = arena.alloc(3, 30);
        assert_eq!(c.index(), a.index());
        assert_ne!(c.generation(), a.generation());
        assert!(arena.is_live(c));
        assert!(!arena.is_live(a));
    }

    #[test]
    #[should_panic(expected = "object arena exhausted")]
    fn test_exhaustion_is_fatal() {
        let arena = ObjectArena::new(1);
        arena.alloc(1, 1);
        arena.alloc(2, 1);
    }

    #[test]
    fn test_concurrent_alloc_free() {
        const THREADS: usize = 8;
        const LOOPS: usize = 2_000;

        let arena = Arc::new(ObjectArena::new(THREADS * 4));
        let handles = (0..THREADS)
            .map(|t| {
                let arena = arena.clone();
                thread::spawn(move || {
                    for i in 0..LOOPS {
                        let hs = (0..4).map(|j| arena.alloc((t * LOOPS + i) as u64, j)).collect_vec();
                        for h in hs {
                            assert!(arena.free(h));
                        }
                    }
                })
            })
            .collect_vec();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(arena.allocated(), 0);
    }
}
