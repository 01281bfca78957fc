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

//! Two-tier LRU whose hottest prefix is periodically frozen.
//!
//! While [`Phase::Frozen`] the front of the LRU list is detached into an immutable frozen region served by a lock-free
//! [`FrozenIndex`]. Only the remaining dynamic region pays for locking and list maintenance. The policy freezes once it
//! has seen enough traffic in regular mode and thaws again when the frozen region's miss ratio drifts too far above the
//! one measured before freezing.
//!
//! Transitions run on a background thread. Exactly one request thread wins the phase CAS and starts it, every other
//! thread keeps serving requests through the regular path until the phase settles.

use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use arc_swap::ArcSwapOption;
use hotcache_common::{
    error::{Error, ErrorKind, Result},
    params::{parse_params, PRINT_KEY},
    spin::SpinLock,
};
use itertools::Itertools;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::EvictionPolicy;
use crate::{
    indexer::FrozenIndex,
    list::IntrusiveList,
    local::{FrozenHotLocal, LocalState},
    object::{ObjHandle, NIL},
    raw::CacheCore,
    request::Request,
};

/// FrozenHot parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenHotConfig {
    /// Share of the capacity that is frozen.
    pub split_point: f64,
    /// Tolerated increase of the miss ratio while frozen before thawing.
    pub miss_diff: f64,
}

impl Default for FrozenHotConfig {
    fn default() -> Self {
        Self {
            split_point: 0.77,
            miss_diff: 0.01,
        }
    }
}

impl Display for FrozenHotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "split-point={},miss-diff={}", self.split_point, self.miss_diff)
    }
}

impl FrozenHotConfig {
    /// Parse `key=value` text, e.g. `split-point=0.5,miss-diff=0.02`.
    pub fn parse(params: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut print = false;
        for param in parse_params(params)? {
            match param.key.as_str() {
                "split-point" => config.split_point = param.parse()?,
                "miss-diff" => config.miss_diff = param.parse()?,
                PRINT_KEY => print = true,
                key => return Err(Error::unknown_param("FrozenHot", key)),
            }
        }
        if !(config.split_point > 0.0 && config.split_point <= 1.0) || config.miss_diff.is_nan() {
            return Err(Error::new(ErrorKind::Config, "split-point must be in (0, 1]")
                .with_context("split-point", config.split_point)
                .with_context("miss-diff", config.miss_diff));
        }
        if print {
            return Err(Error::print_requested("FrozenHot", config.to_string()));
        }
        Ok(config)
    }
}

/// State of the frozen-hot phase machine.
///
/// `Regular -> Freezing -> Frozen -> Thawing -> Regular`. Only `Frozen` serves lookups from the frozen region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Everything is served by the dynamic LRU.
    Regular = 0,
    /// Building the frozen region.
    Freezing = 1,
    /// The frozen region is published.
    Frozen = 2,
    /// Merging the frozen region back.
    Thawing = 3,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Regular,
            1 => Self::Freezing,
            2 => Self::Frozen,
            _ => Self::Thawing,
        }
    }
}

#[derive(Debug, Default)]
struct Regions {
    dynamic: IntrusiveList,
    frozen: IntrusiveList,
}

#[derive(Debug, Default)]
struct Counters {
    regular_access: AtomicU64,
    regular_miss: AtomicU64,
    frozen_access: AtomicU64,
    frozen_miss: AtomicU64,
    /// `f64` bits of the regular-period miss ratio recorded when freezing.
    regular_miss_ratio: AtomicU64,
}

impl Counters {
    fn reset(&self) {
        self.regular_access.store(0, Ordering::Relaxed);
        self.regular_miss.store(0, Ordering::Relaxed);
        self.frozen_access.store(0, Ordering::Relaxed);
        self.frozen_miss.store(0, Ordering::Relaxed);
    }
}

struct Inner {
    core: Arc<CacheCore>,
    config: FrozenHotConfig,

    phase: AtomicU8,
    /// Bumped whenever the counters are reset, see [`FrozenHotLocal`].
    epoch: AtomicU64,
    regions: SpinLock<Regions>,
    frozen: Box<[AtomicBool]>,
    index: ArcSwapOption<FrozenIndex>,
    counters: Counters,

    frozen_hits: AtomicU64,
    dynamic_hits: AtomicU64,
    constructions: AtomicU64,
    deconstructions: AtomicU64,
}

/// See the [module level documentation](self).
pub struct FrozenHot {
    inner: Arc<Inner>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    fn is_frozen(&self, handle: ObjHandle) -> bool {
        self.frozen[handle.slot()].load(Ordering::Relaxed)
    }

    fn split_bytes(&self) -> u64 {
        (self.core.capacity() as f64 * self.config.split_point) as u64
    }

    fn evict_dynamic(&self, regions: &Regions) -> bool {
        let arena = self.core.arena();
        match regions.dynamic.evict_last(arena) {
            Some(index) => self.core.evict_base(arena.handle_at(index)),
            None => false,
        }
    }

    /// LRU `get` on the dynamic region. Frozen objects are never reordered.
    fn dynamic_get(&self, req: &Request) -> bool {
        let regions = self.regions.lock();
        if let Some(handle) = self.core.index().find(req.obj_id) {
            if !self.is_frozen(handle) {
                regions.dynamic.move_to_head(self.core.arena(), handle.index());
            }
            self.dynamic_hits.fetch_add(1, Ordering::Relaxed);
            return true;
        }

        if !self.core.can_insert(req) {
            return false;
        }
        while self.core.needs_eviction(req) {
            if !self.evict_dynamic(&regions) {
                // The frozen region holds everything that is left.
                return false;
            }
        }
        if let Some(handle) = self.core.insert_base(req) {
            regions.dynamic.prepend(self.core.arena(), handle.index());
        }
        false
    }

    fn frozen_probe(&self, obj_id: u64) -> Option<ObjHandle> {
        let index = self.index.load();
        index.as_ref()?.get(self.core.arena(), obj_id)
    }

    fn sync_epoch(&self, local: &mut FrozenHotLocal) {
        let epoch = self.epoch.load(Ordering::Acquire);
        if local.epoch != epoch {
            local.discard(epoch);
        }
    }

    fn should_freeze(&self) -> bool {
        let capacity = self.core.capacity();
        self.counters.regular_access.load(Ordering::Relaxed) >= 2 * capacity
            && self.core.occupied() >= self.split_bytes()
    }

    fn should_thaw(&self) -> bool {
        let access = self.counters.frozen_access.load(Ordering::Relaxed);
        if access <= self.core.capacity() {
            return false;
        }
        let miss = self.counters.frozen_miss.load(Ordering::Relaxed);
        let frozen_ratio = miss as f64 / access as f64;
        let regular_ratio = f64::from_bits(self.counters.regular_miss_ratio.load(Ordering::Relaxed));
        frozen_ratio - regular_ratio > self.config.miss_diff
    }

    /// Freeze the hottest prefix of the dynamic LRU.
    fn construct(&self) {
        let capacity = self.core.capacity();
        let access = self.counters.regular_access.load(Ordering::Relaxed);
        let miss_start = self.counters.regular_miss.load(Ordering::Relaxed);
        let regular_ratio = match access.checked_sub(capacity) {
            Some(counted) if counted > 0 => miss_start as f64 / counted as f64,
            _ => 0.0,
        };
        self.counters
            .regular_miss_ratio
            .store(regular_ratio.to_bits(), Ordering::Relaxed);

        let arena = self.core.arena();
        let split_bytes = self.split_bytes();
        let mut regions = self.regions.lock();

        let mut walked = 0u64;
        let mut count = 0;
        let mut last = None;
        for index in regions.dynamic.iter(arena) {
            // The dynamic region keeps at least one object so new ids can still be admitted while frozen.
            if arena.get(index).next() == NIL {
                break;
            }
            walked += arena.get(index).obj_size() as u64;
            count += 1;
            last = Some(index);
            let missed = self.counters.regular_miss.load(Ordering::Relaxed) - miss_start;
            if walked + missed >= split_bytes {
                break;
            }
        }

        if let Some(last) = last {
            let frozen = regions.dynamic.split_front(arena, last, count);
            for index in frozen.iter(arena) {
                self.frozen[index as usize].store(true, Ordering::Relaxed);
            }
            self.index.store(Some(Arc::new(FrozenIndex::build(arena, frozen.iter(arena)))));
            regions.frozen = frozen;
        }
        drop(regions);

        self.counters.reset();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.constructions.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            frozen_objects = count,
            frozen_bytes = walked,
            regular_miss_ratio = regular_ratio,
            "[frozen hot]: frozen region constructed"
        );
        self.set_phase(Phase::Frozen);
    }

    /// Merge the frozen region back in front of the dynamic LRU.
    fn deconstruct(&self) {
        let arena = self.core.arena();
        let mut regions = self.regions.lock();
        let frozen = std::mem::take(&mut regions.frozen);
        let count = frozen.len();
        for index in frozen.iter(arena) {
            self.frozen[index as usize].store(false, Ordering::Relaxed);
        }
        regions.dynamic.splice_front(arena, frozen);
        drop(regions);

        self.index.store(None);
        self.counters.reset();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.deconstructions.fetch_add(1, Ordering::Relaxed);
        tracing::info!(frozen_objects = count, "[frozen hot]: frozen region deconstructed");
        self.set_phase(Phase::Regular);
    }
}

impl FrozenHot {
    /// Create a FrozenHot policy over `core`.
    pub fn new(core: Arc<CacheCore>, config: FrozenHotConfig) -> Self {
        let frozen = (0..core.arena().capacity()).map(|_| AtomicBool::new(false)).collect_vec();
        let inner = Inner {
            core,
            config,
            phase: AtomicU8::new(Phase::Regular as u8),
            epoch: AtomicU64::new(0),
            regions: SpinLock::default(),
            frozen: frozen.into_boxed_slice(),
            index: ArcSwapOption::empty(),
            counters: Counters::default(),
            frozen_hits: AtomicU64::new(0),
            dynamic_hits: AtomicU64::new(0),
            constructions: AtomicU64::new(0),
            deconstructions: AtomicU64::new(0),
        };
        Self {
            inner: Arc::new(inner),
            supervisor: Mutex::new(None),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.inner.phase()
    }

    /// Number of objects in the frozen region.
    pub fn frozen_len(&self) -> usize {
        self.inner.regions.lock().frozen.len()
    }

    /// Try to move `from -> to` and run `transition` in the background on success.
    fn transit(&self, from: Phase, to: Phase, transition: fn(&Inner)) {
        if self
            .inner
            .phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let mut supervisor = self.supervisor.lock();
        if let Some(previous) = supervisor.take() {
            // The previous transition has already published its phase.
            if previous.join().is_err() {
                tracing::error!("[frozen hot]: previous transition panicked");
            }
        }

        let inner = self.inner.clone();
        match std::thread::Builder::new()
            .name("hotcache-frozen-hot".to_string())
            .spawn(move || transition(&inner))
        {
            Ok(handle) => *supervisor = Some(handle),
            Err(e) => {
                tracing::warn!(?e, "[frozen hot]: failed to spawn transition thread, run it inline");
                drop(supervisor);
                transition(&self.inner);
            }
        }
    }

    fn regular_get(&self, req: &Request, local: &mut FrozenHotLocal) -> bool {
        let counters = &self.inner.counters;
        local.regular_access.incr(&counters.regular_access);
        let hit = self.inner.dynamic_get(req);
        if !hit && counters.regular_access.load(Ordering::Relaxed) > self.inner.core.capacity() {
            local.regular_miss.incr(&counters.regular_miss);
        }
        if self.inner.phase() == Phase::Regular && self.inner.should_freeze() {
            self.transit(Phase::Regular, Phase::Freezing, Inner::construct);
        }
        hit
    }

    fn frozen_get(&self, req: &Request, local: &mut FrozenHotLocal) -> bool {
        let counters = &self.inner.counters;
        local.frozen_access.incr(&counters.frozen_access);
        let hit = if self.inner.frozen_probe(req.obj_id).is_some() {
            self.inner.frozen_hits.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            let hit = self.inner.dynamic_get(req);
            if !hit {
                local.frozen_miss.incr(&counters.frozen_miss);
            }
            hit
        };
        if self.inner.should_thaw() {
            self.transit(Phase::Frozen, Phase::Thawing, Inner::deconstruct);
        }
        hit
    }
}

impl Drop for FrozenHot {
    fn drop(&mut self) {
        self.quiesce();
    }
}

impl EvictionPolicy for FrozenHot {
    fn name(&self) -> String {
        format!("FrozenHot-{}-{}", self.inner.config.split_point, self.inner.config.miss_diff)
    }

    fn core(&self) -> &Arc<CacheCore> {
        &self.inner.core
    }

    fn get(&self, req: &Request, local: &mut LocalState) -> bool {
        let local = &mut local.frozen_hot;
        self.inner.sync_epoch(local);
        match self.inner.phase() {
            Phase::Frozen => self.frozen_get(req, local),
            _ => self.regular_get(req, local),
        }
    }

    fn find(&self, req: &Request, update: bool) -> Option<ObjHandle> {
        if self.inner.phase() == Phase::Frozen {
            if let Some(handle) = self.inner.frozen_probe(req.obj_id) {
                return Some(handle);
            }
        }
        if !update {
            return self.inner.core.index().find(req.obj_id);
        }
        let regions = self.inner.regions.lock();
        let handle = self.inner.core.index().find(req.obj_id)?;
        if !self.inner.is_frozen(handle) {
            regions.dynamic.move_to_head(self.inner.core.arena(), handle.index());
        }
        Some(handle)
    }

    fn insert(&self, req: &Request) -> Option<ObjHandle> {
        let regions = self.inner.regions.lock();
        let handle = self.inner.core.insert_base(req)?;
        regions.dynamic.prepend(self.inner.core.arena(), handle.index());
        Some(handle)
    }

    fn to_evict(&self, _: &Request) -> Result<Option<ObjHandle>> {
        let regions = self.inner.regions.lock();
        Ok(regions
            .dynamic
            .tail()
            .map(|index| self.inner.core.arena().handle_at(index)))
    }

    fn evict(&self, _: &Request) -> bool {
        let regions = self.inner.regions.lock();
        self.inner.evict_dynamic(&regions)
    }

    fn remove(&self, obj_id: u64) -> Result<bool> {
        let regions = self.inner.regions.lock();
        let Some(handle) = self.inner.core.index().find(obj_id) else {
            return Ok(false);
        };
        if self.inner.is_frozen(handle) {
            return Err(Error::unsupported(self.name(), "remove").with_context("region", "frozen"));
        }
        regions.dynamic.remove(self.inner.core.arena(), handle.index());
        Ok(self.inner.core.remove_base(handle))
    }

    fn flush(&self, local: &mut LocalState) {
        let local = &mut local.frozen_hot;
        self.inner.sync_epoch(local);
        let counters = &self.inner.counters;
        local.regular_access.flush(&counters.regular_access);
        local.regular_miss.flush(&counters.regular_miss);
        local.frozen_access.flush(&counters.frozen_access);
        local.frozen_miss.flush(&counters.frozen_miss);
    }

    fn quiesce(&self) {
        let handle = self.supervisor.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("[frozen hot]: transition panicked");
            }
        }
    }

    fn stats(&self) -> Vec<(&'static str, u64)> {
        let inner = &self.inner;
        vec![
            ("frozen_hits", inner.frozen_hits.load(Ordering::Relaxed)),
            ("dynamic_hits", inner.dynamic_hits.load(Ordering::Relaxed)),
            ("constructions", inner.constructions.load(Ordering::Relaxed)),
            ("deconstructions", inner.deconstructions.load(Ordering::Relaxed)),
            ("frozen_objects", self.frozen_len() as u64),
        ]
    }

    fn dump(&self) -> Vec<u64> {
        let regions = self.inner.regions.lock();
        let arena = self.inner.core.arena();
        regions
            .frozen
            .iter(arena)
            .chain(regions.dynamic.iter(arena))
            .map(|index| arena.get(index).obj_id())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::test_utils::*;

    fn freeze(fh: &FrozenHot, local: &mut LocalState, capacity: u64) {
        // Enough regular traffic over the resident set to trigger construction.
        let reqs = requests((0..capacity * 3).map(|i| i % capacity + 1));
        for req in reqs {
            fh.get(&req, local);
            fh.flush(local);
            if fh.phase() != Phase::Regular {
                break;
            }
        }
        fh.quiesce();
        assert_eq!(fh.phase(), Phase::Frozen);
    }

    #[test_log::test]
    fn test_construction_conserves_residents() {
        const CAPACITY: u64 = 100;

        let fh = FrozenHot::new(core(CAPACITY), FrozenHotConfig::default());
        let mut local = LocalState::default();
        replay(&fh, &mut local, &requests(1..=CAPACITY));
        let before = residents(&fh);

        freeze(&fh, &mut local, CAPACITY);

        assert_eq!(residents(&fh), before);
        assert_eq!(fh.frozen_len(), 77);
        assert_consistent(&fh);
        let regions = fh.inner.regions.lock();
        assert!(regions.frozen.check_integrity(fh.core().arena()));
        assert!(regions.dynamic.check_integrity(fh.core().arena()));
        assert_eq!(regions.frozen.len() + regions.dynamic.len(), CAPACITY as usize);
    }

    #[test_log::test]
    fn test_frozen_hits_are_lock_free_and_not_evicted() {
        const CAPACITY: u64 = 100;

        let fh = FrozenHot::new(core(CAPACITY), FrozenHotConfig::default());
        let mut local = LocalState::default();
        replay(&fh, &mut local, &requests(1..=CAPACITY));
        freeze(&fh, &mut local, CAPACITY);

        let frozen_ids = fh.dump().into_iter().take(fh.frozen_len()).collect_vec();
        let hits = replay(&fh, &mut local, &requests(frozen_ids.iter().copied()));
        assert!(hits.iter().all(|&h| h));

        // New objects only displace the dynamic region.
        replay(&fh, &mut local, &requests(1_000..1_010));
        for id in &frozen_ids {
            assert!(fh.core().index().find(*id).is_some());
        }
        assert!(fh.stats().contains(&("frozen_hits", frozen_ids.len() as u64)));

        let err = fh.remove(frozen_ids[0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_consistent(&fh);
    }

    #[test_log::test]
    fn test_deconstruction_conserves_residents() {
        const CAPACITY: u64 = 100;

        let fh = FrozenHot::new(core(CAPACITY), FrozenHotConfig::default());
        let mut local = LocalState::default();
        replay(&fh, &mut local, &requests(1..=CAPACITY));
        freeze(&fh, &mut local, CAPACITY);

        // A scan of new ids drives the frozen miss ratio far above the regular one.
        for id in 10_000..10_000 + 4 * CAPACITY {
            fh.get(&Request::new(id, 1), &mut local);
            fh.flush(&mut local);
            if fh.phase() != Phase::Frozen {
                break;
            }
        }
        fh.quiesce();
        assert_eq!(fh.phase(), Phase::Regular);
        assert_eq!(fh.frozen_len(), 0);
        assert!(fh.inner.index.load().is_none());

        assert_eq!(fh.core().n_obj(), CAPACITY);
        assert_consistent(&fh);
        let regions = fh.inner.regions.lock();
        assert!(regions.dynamic.check_integrity(fh.core().arena()));
        assert_eq!(regions.dynamic.len(), CAPACITY as usize);
    }

    #[test_log::test]
    fn test_full_split_keeps_one_dynamic_object() {
        const CAPACITY: u64 = 100;

        let config = FrozenHotConfig {
            split_point: 1.0,
            ..Default::default()
        };
        let fh = FrozenHot::new(core(CAPACITY), config);
        let mut local = LocalState::default();
        replay(&fh, &mut local, &requests(1..=CAPACITY));
        freeze(&fh, &mut local, CAPACITY);
        assert_eq!(fh.frozen_len(), CAPACITY as usize - 1);

        // Every new id displaces the single dynamic object and is admitted.
        for id in 1_000..1_020 {
            assert!(!fh.get(&Request::new(id, 1), &mut local));
            assert!(fh.core().index().find(id).is_some(), "{id} was not admitted");
            assert!(fh.get(&Request::new(id, 1), &mut local));
        }
        assert_eq!(fh.phase(), Phase::Frozen);
        assert_eq!(fh.core().n_obj(), CAPACITY);
        assert_consistent(&fh);
    }

    fn stat(fh: &FrozenHot, name: &str) -> u64 {
        fh.stats()
            .into_iter()
            .find_map(|(key, value)| (key == name).then_some(value))
            .unwrap()
    }

    /// Run `ids` on `threads` threads released together, each stopping once the phase leaves `phase`.
    fn race(fh: &FrozenHot, threads: usize, phase: Phase, ids: impl Fn(usize, u64) -> u64 + Sync) {
        let barrier = std::sync::Barrier::new(threads);
        std::thread::scope(|s| {
            for t in 0..threads {
                let (barrier, ids) = (&barrier, &ids);
                s.spawn(move || {
                    let mut local = LocalState::default();
                    barrier.wait();
                    for i in 0..fh.core().capacity() * 20 {
                        fh.get(&Request::new(ids(t, i), 1), &mut local);
                        fh.flush(&mut local);
                        if fh.phase() != phase {
                            break;
                        }
                    }
                });
            }
        });
        fh.quiesce();
    }

    #[test_log::test]
    fn test_racing_threads_transit_once() {
        const CAPACITY: u64 = 100;
        const THREADS: usize = 8;

        let fh = FrozenHot::new(core(CAPACITY), FrozenHotConfig::default());
        let mut local = LocalState::default();
        replay(&fh, &mut local, &requests(1..=CAPACITY));
        fh.flush(&mut local);

        // All threads cross the freeze threshold together.
        race(&fh, THREADS, Phase::Regular, |t, i| (t as u64 * 7 + i) % CAPACITY + 1);
        assert_eq!(fh.phase(), Phase::Frozen);
        assert_eq!(stat(&fh, "constructions"), 1);
        assert_eq!(stat(&fh, "deconstructions"), 0);

        // Then all threads miss together until the frozen region is dropped.
        race(&fh, THREADS, Phase::Frozen, |t, i| 1_000_000 * (t as u64 + 1) + i);
        assert_eq!(fh.phase(), Phase::Regular);
        assert_eq!(stat(&fh, "constructions"), 1);
        assert_eq!(stat(&fh, "deconstructions"), 1);
        assert_eq!(fh.frozen_len(), 0);
        assert_consistent(&fh);
    }

    #[test]
    fn test_params() {
        let config = FrozenHotConfig::parse("split-point=0.5, MISS-DIFF=0.2").unwrap();
        assert_eq!(config.split_point, 0.5);
        assert_eq!(config.miss_diff, 0.2);
        assert_eq!(FrozenHotConfig::parse("split-point=2").unwrap_err().kind(), ErrorKind::Config);
        assert_eq!(FrozenHotConfig::parse("split-point=half").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(
            FrozenHotConfig::parse("print").unwrap_err().message(),
            "split-point=0.77,miss-diff=0.01"
        );
    }
}
