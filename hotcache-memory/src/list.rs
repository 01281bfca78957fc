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

use std::{
    hint::spin_loop,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

use hotcache_common::strict_assert;

use crate::object::{pack, unpack, ObjectArena, NIL};

/// A doubly linked queue threaded through the `prev`/`next` fields of arena slots.
///
/// The plain operations require the caller to serialize every access to the list, usually with a policy lock. The
/// `*_lock_free` operations may run concurrently with each other and only support pushing at the head and popping at
/// the tail.
///
/// Both ends pack a version counter next to the slot index. Every update bumps the version, so a lock-free CAS made
/// from a stale read fails even when the slot was freed, reused and linked at the same end again.
///
/// An object must belong to at most one list at a time.
#[derive(Debug)]
pub struct IntrusiveList {
    head: AtomicU64,
    tail: AtomicU64,
    len: AtomicUsize,
}

impl Default for IntrusiveList {
    fn default() -> Self {
        Self::new()
    }
}

impl IntrusiveList {
    /// An empty list.
    pub const fn new() -> Self {
        Self::with_ends(NIL, NIL, 0)
    }

    const fn with_ends(head: u32, tail: u32, len: usize) -> Self {
        Self {
            head: AtomicU64::new(pack(0, head)),
            tail: AtomicU64::new(pack(0, tail)),
            len: AtomicUsize::new(len),
        }
    }

    #[inline]
    fn load_end(word: &AtomicU64) -> u32 {
        unpack(word.load(Ordering::Acquire)).1
    }

    /// Replace an end the caller has exclusive access to.
    #[inline]
    fn store_end(word: &AtomicU64, index: u32) {
        let (version, _) = unpack(word.load(Ordering::Relaxed));
        word.store(pack(version.wrapping_add(1), index), Ordering::Release);
    }

    /// Most recently pushed end.
    pub fn head(&self) -> Option<u32> {
        Some(Self::load_end(&self.head)).filter(|&i| i != NIL)
    }

    /// Eviction end.
    pub fn tail(&self) -> Option<u32> {
        Some(Self::load_end(&self.tail)).filter(|&i| i != NIL)
    }

    /// Number of linked objects.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.head().is_none()
    }

    /// Link `index` in front of the head.
    pub fn prepend(&self, arena: &ObjectArena, index: u32) {
        let obj = arena.get(index);
        let head = Self::load_end(&self.head);
        obj.set_prev(NIL);
        obj.set_next(head);
        if head == NIL {
            Self::store_end(&self.tail, index);
        } else {
            arena.get(head).set_prev(index);
        }
        Self::store_end(&self.head, index);
        self.len.fetch_add(1, Ordering::Relaxed);
    }

    /// Link `index` behind the tail.
    pub fn append(&self, arena: &ObjectArena, index: u32) {
        let obj = arena.get(index);
        let tail = Self::load_end(&self.tail);
        obj.set_next(NIL);
        obj.set_prev(tail);
        if tail == NIL {
            Self::store_end(&self.head, index);
        } else {
            arena.get(tail).set_next(index);
        }
        Self::store_end(&self.tail, index);
        self.len.fetch_add(1, Ordering::Relaxed);
    }

    /// Unlink `index` from anywhere in the list.
    pub fn remove(&self, arena: &ObjectArena, index: u32) {
        let obj = arena.get(index);
        let (prev, next) = (obj.prev(), obj.next());
        strict_assert!(
            prev != NIL || Self::load_end(&self.head) == index,
            "slot {index} is not linked in this list"
        );

        if prev == NIL {
            Self::store_end(&self.head, next);
        } else {
            arena.get(prev).set_next(next);
        }
        if next == NIL {
            Self::store_end(&self.tail, prev);
        } else {
            arena.get(next).set_prev(prev);
        }

        obj.set_prev(NIL);
        obj.set_next(NIL);
        self.len.fetch_sub(1, Ordering::Relaxed);
    }

    /// Move a linked `index` to the head.
    pub fn move_to_head(&self, arena: &ObjectArena, index: u32) {
        if Self::load_end(&self.head) == index {
            return;
        }
        self.remove(arena, index);
        self.prepend(arena, index);
    }

    /// Move a linked `index` to the tail.
    pub fn move_to_tail(&self, arena: &ObjectArena, index: u32) {
        if Self::load_end(&self.tail) == index {
            return;
        }
        self.remove(arena, index);
        self.append(arena, index);
    }

    /// Unlink and return the tail.
    pub fn evict_last(&self, arena: &ObjectArena) -> Option<u32> {
        let tail = self.tail()?;
        self.remove(arena, tail);
        Some(tail)
    }

    /// Push `index` at the head, racing with other lock-free pushers and poppers.
    ///
    /// The head word is the linearization point. The old head's back link is published after the CAS, so a popper
    /// that reaches the old head through the tail may briefly observe a missing predecessor.
    pub fn prepend_lock_free(&self, arena: &ObjectArena, index: u32) {
        let obj = arena.get(index);
        obj.set_prev(NIL);
        loop {
            let current = self.head.load(Ordering::Acquire);
            let (version, head) = unpack(current);
            obj.next.store(head, Ordering::Release);
            if self
                .head
                .compare_exchange_weak(
                    current,
                    pack(version.wrapping_add(1), index),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                if head == NIL {
                    // Poppers back off while the tail is empty, so it is ours until published.
                    Self::store_end(&self.tail, index);
                } else {
                    arena.get(head).prev.store(index, Ordering::Release);
                }
                break;
            }
        }
        self.len.fetch_add(1, Ordering::Relaxed);
    }

    /// Pop the tail, racing with other lock-free pushers and poppers.
    ///
    /// Returns `None` when no tail is published, either because the list is empty or because a concurrent push into
    /// an empty list or a concurrent pop of the last object has not finished yet.
    pub fn evict_last_lock_free(&self, arena: &ObjectArena) -> Option<u32> {
        loop {
            let current = self.tail.load(Ordering::Acquire);
            let (version, tail) = unpack(current);
            if tail == NIL {
                return None;
            }

            let prev = arena.get(tail).prev.load(Ordering::Acquire);
            if self
                .tail
                .compare_exchange(
                    current,
                    pack(version.wrapping_add(1), prev),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_err()
            {
                spin_loop();
                continue;
            }

            // The CAS succeeded on an unchanged version, so `tail` is still linked and `prev` was its predecessor.
            if prev == NIL {
                self.unlink_last(arena, tail);
            } else {
                // `prev` may already be popped and reused by another thread, only clear the link if it still points
                // at the popped node.
                let _ = arena
                    .get(prev)
                    .next
                    .compare_exchange(tail, NIL, Ordering::AcqRel, Ordering::Relaxed);
            }

            let obj = arena.get(tail);
            obj.set_prev(NIL);
            obj.set_next(NIL);
            self.len.fetch_sub(1, Ordering::Relaxed);
            return Some(tail);
        }
    }

    /// Finish popping `tail` after the tail word was cleared. Until this returns the tail stays empty and belongs to
    /// this thread.
    fn unlink_last(&self, arena: &ObjectArena, tail: u32) {
        loop {
            let current = self.head.load(Ordering::Acquire);
            let (version, head) = unpack(current);
            if head != tail {
                break;
            }
            if self
                .head
                .compare_exchange(
                    current,
                    pack(version.wrapping_add(1), NIL),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return;
            }
        }

        // A pusher linked a new head in front of `tail`. Wait for its back link and hand it the tail.
        let obj = arena.get(tail);
        let prev = loop {
            let prev = obj.prev.load(Ordering::Acquire);
            if prev != NIL {
                break prev;
            }
            spin_loop();
        };
        arena.get(prev).next.store(NIL, Ordering::Release);
        Self::store_end(&self.tail, prev);
    }

    /// Detach the prefix ending at `last` (inclusive) into a new list. `count` is the number of detached objects.
    pub fn split_front(&self, arena: &ObjectArena, last: u32, count: usize) -> IntrusiveList {
        let Some(head) = self.head() else {
            return IntrusiveList::new();
        };

        let rest = arena.get(last).next();
        arena.get(last).set_next(NIL);
        Self::store_end(&self.head, rest);
        if rest == NIL {
            Self::store_end(&self.tail, NIL);
        } else {
            arena.get(rest).set_prev(NIL);
        }
        self.len.fetch_sub(count, Ordering::Relaxed);

        IntrusiveList::with_ends(head, last, count)
    }

    /// Move every object of `other` in front of the head, keeping their order.
    pub fn splice_front(&self, arena: &ObjectArena, other: IntrusiveList) {
        let (Some(other_head), Some(other_tail)) = (other.head(), other.tail()) else {
            return;
        };

        match self.head() {
            None => Self::store_end(&self.tail, other_tail),
            Some(head) => {
                arena.get(other_tail).set_next(head);
                arena.get(head).set_prev(other_tail);
            }
        }
        Self::store_end(&self.head, other_head);
        self.len.fetch_add(other.len(), Ordering::Relaxed);
    }

    /// Iterate slot indices from head to tail.
    ///
    /// Requires the same synchronization as the plain operations.
    pub fn iter<'a>(&self, arena: &'a ObjectArena) -> impl Iterator<Item = u32> + 'a {
        let mut cursor = Self::load_end(&self.head);
        std::iter::from_fn(move || {
            if cursor == NIL {
                return None;
            }
            let current = cursor;
            cursor = arena.get(current).next();
            Some(current)
        })
    }

    /// Verify the list is acyclic, back links mirror forward links, and the cached length is right.
    pub fn check_integrity(&self, arena: &ObjectArena) -> bool {
        let mut prev = NIL;
        let mut cursor = Self::load_end(&self.head);
        let mut steps = 0;
        while cursor != NIL {
            if steps > arena.capacity() {
                return false;
            }
            let obj = arena.get(cursor);
            if obj.prev() != prev || !obj.is_allocated() {
                return false;
            }
            prev = cursor;
            cursor = obj.next();
            steps += 1;
        }
        Self::load_end(&self.tail) == prev && steps == self.len()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Arc, thread};

    use itertools::Itertools;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    use super::*;

    fn ids(list: &IntrusiveList, arena: &ObjectArena) -> Vec<u64> {
        list.iter(arena).map(|i| arena.get(i).obj_id()).collect_vec()
    }

    #[test]
    fn test_list_ops() {
        let arena = ObjectArena::new(8);
        let hs = (0..4).map(|i| arena.alloc(i, 1)).collect_vec();
        let list = IntrusiveList::new();

        for h in &hs {
            list.prepend(&arena, h.index());
        }
        assert_eq!(ids(&list, &arena), vec![3, 2, 1, 0]);

        list.move_to_head(&arena, hs[0].index());
        assert_eq!(ids(&list, &arena), vec![0, 3, 2, 1]);

        list.move_to_tail(&arena, hs[3].index());
        assert_eq!(ids(&list, &arena), vec![0, 2, 1, 3]);

        list.remove(&arena, hs[2].index());
        assert_eq!(ids(&list, &arena), vec![0, 1, 3]);

        assert_eq!(list.evict_last(&arena), Some(hs[3].index()));
        list.append(&arena, hs[2].index());
        assert_eq!(ids(&list, &arena), vec![0, 1, 2]);
        assert!(list.check_integrity(&arena));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_split_and_splice() {
        let arena = ObjectArena::new(8);
        let hs = (0..6).map(|i| arena.alloc(i, 1)).collect_vec();
        let list = IntrusiveList::new();
        for h in &hs {
            list.append(&arena, h.index());
        }

        let front = list.split_front(&arena, hs[2].index(), 3);
        assert_eq!(ids(&front, &arena), vec![0, 1, 2]);
        assert_eq!(ids(&list, &arena), vec![3, 4, 5]);
        assert!(front.check_integrity(&arena));
        assert!(list.check_integrity(&arena));

        list.splice_front(&arena, front);
        assert_eq!(ids(&list, &arena), vec![0, 1, 2, 3, 4, 5]);
        assert!(list.check_integrity(&arena));

        let all = list.split_front(&arena, hs[5].index(), 6);
        assert!(list.is_empty());
        assert!(list.check_integrity(&arena));
        list.splice_front(&arena, all);
        assert_eq!(list.len(), 6);
        assert!(list.check_integrity(&arena));
    }

    #[test]
    fn test_random_ops_keep_integrity() {
        const N: u64 = 64;

        let mut rng = SmallRng::seed_from_u64(42);
        let arena = ObjectArena::new(N as usize);
        let list = IntrusiveList::new();
        let mut model = VecDeque::new();

        for step in 0..10_000 {
            match rng.random_range(0..5) {
                0 | 1 if model.len() < N as usize => {
                    let h = arena.alloc(step, 1);
                    if rng.random_bool(0.5) {
                        list.prepend(&arena, h.index());
                        model.push_front(h);
                    } else {
                        list.append(&arena, h.index());
                        model.push_back(h);
                    }
                }
                2 if !model.is_empty() => {
                    let pos = rng.random_range(0..model.len());
                    let h = model.remove(pos).unwrap();
                    list.move_to_head(&arena, h.index());
                    model.push_front(h);
                }
                3 if !model.is_empty() => {
                    let pos = rng.random_range(0..model.len());
                    let h = model.remove(pos).unwrap();
                    list.remove(&arena, h.index());
                    arena.free(h);
                }
                _ => {
                    if let Some(index) = list.evict_last(&arena) {
                        let h = model.pop_back().unwrap();
                        assert_eq!(h.index(), index);
                        arena.free(h);
                    }
                }
            }
            assert!(list.check_integrity(&arena));
        }

        let expected = model.iter().map(|h| arena.get(h.index()).obj_id()).collect_vec();
        assert_eq!(ids(&list, &arena), expected);
    }

    #[test]
    fn test_lock_free_fifo_order() {
        let arena = ObjectArena::new(16);
        let list = IntrusiveList::new();
        for i in 0..8 {
            let h = arena.alloc(i, 1);
            list.prepend_lock_free(&arena, h.index());
        }
        assert!(list.check_integrity(&arena));
        let evicted = std::iter::from_fn(|| list.evict_last_lock_free(&arena))
            .map(|i| arena.get(i).obj_id())
            .collect_vec();
        assert_eq!(evicted, (0..8).collect_vec());
        assert!(list.is_empty());
        assert!(list.check_integrity(&arena));
        assert_eq!(list.evict_last_lock_free(&arena), None);
    }

    fn pop_blocking(list: &IntrusiveList, arena: &ObjectArena) -> u32 {
        loop {
            if let Some(index) = list.evict_last_lock_free(arena) {
                return index;
            }
            spin_loop();
        }
    }

    fn push_pop(threads: u64, loops: u64, preload: u64) {
        let arena = Arc::new(ObjectArena::new((preload + threads * 4) as usize));
        let list = Arc::new(IntrusiveList::new());
        for i in 0..preload {
            let h = arena.alloc(i, 1);
            list.prepend_lock_free(&arena, h.index());
        }

        let handles = (0..threads)
            .map(|t| {
                let arena = arena.clone();
                let list = list.clone();
                thread::spawn(move || {
                    for i in 0..loops {
                        let h = arena.alloc(preload + t * loops + i, 1);
                        list.prepend_lock_free(&arena, h.index());
                        let victim = pop_blocking(&list, &arena);
                        assert!(arena.free(arena.handle_at(victim)));
                    }
                })
            })
            .collect_vec();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(list.len(), preload as usize);
        assert!(list.check_integrity(&arena));
        assert_eq!(arena.allocated(), preload as usize);
    }

    #[test]
    fn test_lock_free_concurrent_push_pop() {
        push_pop(4, 5_000, 256);
    }

    #[test]
    fn test_lock_free_push_pop_reuses_slots_at_both_ends() {
        // With one or two linked objects every pop races a push on the same slots, and freed slots come straight back
        // from the arena.
        push_pop(8, 20_000, 1);
        push_pop(8, 20_000, 2);
    }

    #[test]
    fn test_lock_free_pop_drains_to_empty() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 2_000;

        let arena = Arc::new(ObjectArena::new((THREADS * PER_THREAD) as usize));
        let list = Arc::new(IntrusiveList::new());
        let handles = (0..THREADS)
            .map(|t| {
                let arena = arena.clone();
                let list = list.clone();
                thread::spawn(move || {
                    let mut popped = 0;
                    for i in 0..PER_THREAD {
                        let h = arena.alloc(t * PER_THREAD + i, 1);
                        list.prepend_lock_free(&arena, h.index());
                        // Another thread may have emptied the list already.
                        if let Some(victim) = list.evict_last_lock_free(&arena) {
                            assert!(arena.free(arena.handle_at(victim)));
                            popped += 1;
                        }
                    }
                    popped
                })
            })
            .collect_vec();
        let popped: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(list.len() as u64, THREADS * PER_THREAD - popped);
        assert!(list.check_integrity(&arena));
        assert_eq!(arena.allocated(), list.len());
        while let Some(victim) = list.evict_last_lock_free(&arena) {
            assert!(arena.free(arena.handle_at(victim)));
        }
        assert!(list.is_empty());
        assert_eq!(arena.allocated(), 0);
    }
}
