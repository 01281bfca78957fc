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

use std::sync::atomic::Ordering;

use hotcache_common::hasher::bucket_of;

use crate::object::{ObjHandle, ObjectArena, NIL};

/// A read-only chained index over a fixed set of resident objects.
///
/// Chains are threaded through the `frozen_next` field of the indexed slots, so building the index allocates only the
/// bucket heads. After construction nothing is mutated and lookups take no lock. A lookup walks at most `len` links and
/// re-validates the slot it lands on, so it stays well defined even if the index is consulted after its objects have
/// been handed back to the dynamic region.
#[derive(Debug)]
pub struct FrozenIndex {
    hash_power: u8,
    heads: Box<[u32]>,
    len: usize,
}

impl FrozenIndex {
    /// Index the objects in `indices`. The caller must hold whatever lock keeps those objects resident.
    pub fn build(arena: &ObjectArena, indices: impl IntoIterator<Item = u32>) -> Self {
        let indices = indices.into_iter().collect::<Vec<_>>();
        let hash_power = (indices.len().max(16).next_power_of_two().trailing_zeros() as u8).min(31);
        let mut heads = vec![NIL; 1 << hash_power].into_boxed_slice();

        for &index in indices.iter() {
            let obj = arena.get(index);
            let bucket = bucket_of(obj.obj_id(), hash_power);
            obj.frozen_next.store(heads[bucket], Ordering::Relaxed);
            heads[bucket] = index;
        }

        tracing::debug!(objects = indices.len(), hash_power, "[frozen index]: built");

        Self {
            hash_power,
            heads,
            len: indices.len(),
        }
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Lock-free lookup.
    pub fn get(&self, arena: &ObjectArena, obj_id: u64) -> Option<ObjHandle> {
        let mut cursor = self.heads[bucket_of(obj_id, self.hash_power)];
        for _ in 0..self.len {
            if cursor == NIL {
                return None;
            }
            let obj = arena.get(cursor);
            if obj.obj_id() == obj_id {
                if let Some(handle) = arena.try_handle_at(cursor) {
                    return Some(handle);
                }
            }
            cursor = obj.frozen_next.load(Ordering::Relaxed);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn test_frozen_lookup() {
        let arena = ObjectArena::new(128);
        let hs = (0..100).map(|id| arena.alloc(id, 1)).collect_vec();

        let frozen = FrozenIndex::build(&arena, hs.iter().take(50).map(|h| h.index()));
        assert_eq!(frozen.len(), 50);
        for (id, h) in hs.iter().enumerate() {
            assert_eq!(frozen.get(&arena, id as u64), (id < 50).then_some(*h));
        }

        // A slot released after freezing is never reported.
        arena.free(hs[3]);
        assert!(frozen.get(&arena, 3).is_none());
    }
}
