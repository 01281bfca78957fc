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
    fmt::Display,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use hotcache_common::{
    error::{Error, ErrorKind, Result},
    params::{parse_params, PRINT_KEY},
    spin::{SpinLock, SpinLockGuard},
};
use serde::{Deserialize, Serialize};

use super::EvictionPolicy;
use crate::{list::IntrusiveList, local::LocalState, object::ObjHandle, raw::CacheCore, request::Request};

/// BatchPromotion parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPromotionConfig {
    /// Buffered hits that trigger a non-blocking flush attempt.
    pub batch_size: usize,
    /// Buffered hits that force a blocking flush.
    pub queue_size: usize,
}

impl Default for BatchPromotionConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            queue_size: 64,
        }
    }
}

impl Display for BatchPromotionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "batch-size={},queue-size={}", self.batch_size, self.queue_size)
    }
}

impl BatchPromotionConfig {
    /// Parse `key=value` text, e.g. `batch-size=16,queue-size=32`.
    pub fn parse(params: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut print = false;
        for param in parse_params(params)? {
            match param.key.as_str() {
                "batch-size" => config.batch_size = param.parse()?,
                "queue-size" => config.queue_size = param.parse()?,
                PRINT_KEY => print = true,
                key => return Err(Error::unknown_param("BatchPromotion", key)),
            }
        }
        if config.batch_size == 0 || config.queue_size < config.batch_size {
            return Err(Error::new(ErrorKind::Config, "require 0 < batch-size <= queue-size")
                .with_context("batch-size", config.batch_size)
                .with_context("queue-size", config.queue_size));
        }
        if print {
            return Err(Error::print_requested("BatchPromotion", config.to_string()));
        }
        Ok(config)
    }
}

/// LRU with batched promotions.
///
/// Hits are buffered in the worker's [`LocalState`] and applied to the shared list in one critical section once
/// `batch_size` of them are pending. If the lock is busy the worker keeps buffering up to `queue_size` hits before it
/// waits. Misses always take the lock, and apply the worker's buffer before evicting and inserting.
pub struct BatchPromotion {
    core: Arc<CacheCore>,
    config: BatchPromotionConfig,
    list: SpinLock<IntrusiveList>,

    hit_activation: AtomicU64,
    miss_activation: AtomicU64,
    promotions: AtomicU64,
}

impl BatchPromotion {
    /// Create a BatchPromotion policy over `core`.
    pub fn new(core: Arc<CacheCore>, config: BatchPromotionConfig) -> Self {
        Self {
            core,
            config,
            list: SpinLock::new(IntrusiveList::new()),
            hit_activation: AtomicU64::new(0),
            miss_activation: AtomicU64::new(0),
            promotions: AtomicU64::new(0),
        }
    }

    /// Move every still resident buffered object to the head, in buffer order.
    fn promote(&self, list: &SpinLockGuard<'_, IntrusiveList>, buffer: &mut Vec<ObjHandle>) {
        let arena = self.core.arena();
        let mut promoted = 0;
        for handle in buffer.drain(..) {
            // Evicted since the hit.
            if !arena.is_live(handle) {
                continue;
            }
            list.move_to_head(arena, handle.index());
            promoted += 1;
        }
        self.promotions.fetch_add(promoted, Ordering::Relaxed);
    }

    fn evict_locked(&self, list: &SpinLockGuard<'_, IntrusiveList>) -> bool {
        let arena = self.core.arena();
        match list.evict_last(arena) {
            Some(index) => self.core.evict_base(arena.handle_at(index)),
            None => false,
        }
    }
}

impl EvictionPolicy for BatchPromotion {
    fn name(&self) -> String {
        format!("BatchPromotion-{}-{}", self.config.batch_size, self.config.queue_size)
    }

    fn core(&self) -> &Arc<CacheCore> {
        &self.core
    }

    fn get(&self, req: &Request, local: &mut LocalState) -> bool {
        if let Some(handle) = self.core.index().find(req.obj_id) {
            local.promotions.push(handle);
            if local.promotions.len() >= self.config.batch_size {
                let guard = match self.list.try_lock() {
                    Some(guard) => Some(guard),
                    None if local.promotions.len() < self.config.queue_size => None,
                    None => Some(self.list.lock()),
                };
                if let Some(guard) = guard {
                    self.promote(&guard, &mut local.promotions);
                    self.hit_activation.fetch_add(1, Ordering::Relaxed);
                }
            }
            return true;
        }

        if !self.core.can_insert(req) {
            return false;
        }

        let list = self.list.lock();
        self.promote(&list, &mut local.promotions);
        while self.core.needs_eviction(req) {
            if !self.evict_locked(&list) {
                break;
            }
        }
        if let Some(handle) = self.core.insert_base(req) {
            list.prepend(self.core.arena(), handle.index());
        }
        self.miss_activation.fetch_add(1, Ordering::Relaxed);
        false
    }

    fn find(&self, req: &Request, _: bool) -> Option<ObjHandle> {
        self.core.index().find(req.obj_id)
    }

    fn insert(&self, req: &Request) -> Option<ObjHandle> {
        let list = self.list.lock();
        let handle = self.core.insert_base(req)?;
        list.prepend(self.core.arena(), handle.index());
        Some(handle)
    }

    fn to_evict(&self, _: &Request) -> Result<Option<ObjHandle>> {
        Err(Error::unsupported(self.name(), "to_evict"))
    }

    fn evict(&self, _: &Request) -> bool {
        let list = self.list.lock();
        self.evict_locked(&list)
    }

    fn remove(&self, obj_id: u64) -> Result<bool> {
        let list = self.list.lock();
        let Some(handle) = self.core.index().find(obj_id) else {
            return Ok(false);
        };
        list.remove(self.core.arena(), handle.index());
        Ok(self.core.remove_base(handle))
    }

    fn flush(&self, local: &mut LocalState) {
        if local.promotions.is_empty() {
            return;
        }
        let list = self.list.lock();
        self.promote(&list, &mut local.promotions);
        self.hit_activation.fetch_add(1, Ordering::Relaxed);
    }

    fn stats(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("hit_activation", self.hit_activation.load(Ordering::Relaxed)),
            ("miss_activation", self.miss_activation.load(Ordering::Relaxed)),
            ("promotions", self.promotions.load(Ordering::Relaxed)),
        ]
    }

    fn dump(&self) -> Vec<u64> {
        let list = self.list.lock();
        let arena = self.core.arena();
        list.iter(arena).map(|index| arena.get(index).obj_id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::eviction::test_utils::*;

    fn stat(policy: &BatchPromotion, name: &str) -> u64 {
        policy.stats().into_iter().find(|(k, _)| *k == name).unwrap().1
    }

    #[test]
    fn test_hits_are_batched() {
        let bp = BatchPromotion::new(
            core(8),
            BatchPromotionConfig {
                batch_size: 3,
                queue_size: 6,
            },
        );
        let mut local = LocalState::default();

        replay(&bp, &mut local, &requests(1..=5));
        assert_eq!(bp.dump(), vec![5, 4, 3, 2, 1]);

        replay(&bp, &mut local, &requests([1, 2]));
        assert_eq!(local.pending_promotions(), 2);
        assert_eq!(bp.dump(), vec![5, 4, 3, 2, 1]);

        replay(&bp, &mut local, &requests([3]));
        assert_eq!(local.pending_promotions(), 0);
        assert_eq!(bp.dump(), vec![3, 2, 1, 5, 4]);
        assert_eq!(stat(&bp, "promotions"), 3);
        assert_eq!(stat(&bp, "hit_activation"), 1);
    }

    #[test]
    fn test_miss_applies_buffer_first() {
        let bp = BatchPromotion::new(core(3), BatchPromotionConfig::default());
        let mut local = LocalState::default();

        let hits = replay(&bp, &mut local, &requests([1, 2, 3, 1, 4]));
        assert_eq!(hits, vec![false, false, false, true, false]);
        // The buffered hit on 1 is applied before the eviction, so 2 is the victim.
        assert_eq!(bp.dump(), vec![4, 1, 3]);
        assert_eq!(stat(&bp, "miss_activation"), 4);
        assert_consistent(&bp);
    }

    #[test]
    fn test_stale_buffer_entries_are_skipped() {
        let bp = BatchPromotion::new(core(4), BatchPromotionConfig::default());
        let mut local = LocalState::default();
        replay(&bp, &mut local, &requests(1..=4));
        replay(&bp, &mut local, &requests([2]));

        assert!(bp.remove(2).unwrap());
        bp.flush(&mut local);
        assert_eq!(stat(&bp, "promotions"), 0);
        assert_eq!(bp.dump(), vec![4, 3, 1]);
    }

    #[test]
    fn test_hits_plus_misses_equals_requests() {
        let bp = BatchPromotion::new(core(50), BatchPromotionConfig::default());
        let mut local = LocalState::default();
        let reqs = requests((0..2_000u64).map(|i| (i * 7919) % 97));
        let hits = replay(&bp, &mut local, &reqs);
        let (hit, miss) = hits.iter().partition::<Vec<&bool>, _>(|&&h| h);
        assert_eq!(hit.len() + miss.len(), reqs.len());
        assert_eq!(miss.len() as u64, stat(&bp, "miss_activation"));
        bp.flush(&mut local);
        assert_consistent(&bp);
        assert_eq!(bp.dump().len(), 50);
        assert!(bp.to_evict(&reqs[0]).is_err());
        assert_eq!(
            residents(&bp),
            bp.core().index().handles().iter().map(|h| bp.core().arena().get(h.index()).obj_id()).sorted().collect_vec()
        );
    }

    #[test]
    fn test_params() {
        let config = BatchPromotionConfig::parse("Batch-Size=4, queue-size=4").unwrap();
        assert_eq!(config.batch_size, 4);
        assert_eq!(
            BatchPromotionConfig::parse("batch-size=8,queue-size=4").unwrap_err().kind(),
            ErrorKind::Config
        );
        let err = BatchPromotionConfig::parse("print").unwrap_err();
        assert_eq!(err.message(), "batch-size=32,queue-size=64");
    }
}
