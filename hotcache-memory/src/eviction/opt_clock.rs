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

use std::{fmt::Display, sync::Arc};

use hashbrown::{HashMap, HashSet};
use hotcache_common::{
    error::{Error, ErrorKind, Result},
    params::{parse_params, PRINT_KEY},
    spin::{SpinLock, SpinLockGuard},
};
use serde::{Deserialize, Serialize};

use super::EvictionPolicy;
use crate::{list::IntrusiveList, local::LocalState, object::ObjHandle, raw::CacheCore, request::Request};

/// OptClock parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptClockConfig {
    /// Width of the per-object frequency counter, in bits.
    pub n_bit_counter: u8,
    /// Replay passes.
    pub iter: usize,
    /// Counter decrement applied on each promotion.
    pub decrease_rate: u8,
}

impl Default for OptClockConfig {
    fn default() -> Self {
        Self {
            n_bit_counter: 1,
            iter: 2,
            decrease_rate: 1,
        }
    }
}

impl Display for OptClockConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "n-bit-counter={},iter={},decrease-rate={}",
            self.n_bit_counter, self.iter, self.decrease_rate
        )
    }
}

impl OptClockConfig {
    /// Parse `key=value` text, e.g. `n-bit-counter=2,iter=3`.
    pub fn parse(params: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut print = false;
        for param in parse_params(params)? {
            match param.key.as_str() {
                "n-bit-counter" => config.n_bit_counter = param.parse()?,
                "iter" => config.iter = param.parse()?,
                "decrease-rate" => config.decrease_rate = param.parse()?,
                PRINT_KEY => print = true,
                key => return Err(Error::unknown_param("OptClock", key)),
            }
        }
        if !(1..=8).contains(&config.n_bit_counter) || config.iter == 0 || config.decrease_rate == 0 {
            return Err(
                Error::new(ErrorKind::Config, "require n-bit-counter in 1..=8 and positive iter and decrease-rate")
                    .with_context("params", config.to_string()),
            );
        }
        if print {
            return Err(Error::print_requested("OptClock", config.to_string()));
        }
        Ok(config)
    }

    fn max_freq(&self) -> u8 {
        ((1u16 << self.n_bit_counter) - 1) as u8
    }
}

#[derive(Debug, Default)]
struct Counters {
    n_req: u64,
    n_promotion: u64,
    n_insert: u64,
    n_rewrite_objs: u64,
    n_rewrite_bytes: u64,
}

struct State {
    list: IntrusiveList,
    /// Per slot.
    freq: Box<[u8]>,
    /// Per slot, lifetime access count at the last promotion.
    promotion_time: Box<[u64]>,
    /// Accesses per id over the current pass.
    lifetime: HashMap<u64, u64>,
    /// `(id, promotion time)` pairs that ended in eviction. Kept across passes.
    rejected: HashMap<u64, HashSet<u64>>,
    counters: Counters,
    version: u64,
}

/// CLOCK with an n-bit counter that learns which promotions were wasted.
///
/// The hand sits at the tail of the list. An object with a non-zero counter gets a second chance: its counter is
/// decremented and it moves to the head. Before promoting, the object is stamped with its lifetime access count. If the
/// same object was already evicted after a promotion at the same stamp, the promotion is skipped and the object is
/// evicted right away. Rejected stamps survive [`EvictionPolicy::reset`], so later passes over the same trace avoid
/// the rewrites earlier passes proved useless.
pub struct OptClock {
    core: Arc<CacheCore>,
    config: OptClockConfig,
    state: SpinLock<State>,
}

impl OptClock {
    /// Create an OptClock policy over `core`.
    pub fn new(core: Arc<CacheCore>, config: OptClockConfig) -> Self {
        let slots = core.arena().capacity();
        let state = State {
            list: IntrusiveList::new(),
            freq: vec![0; slots].into_boxed_slice(),
            promotion_time: vec![0; slots].into_boxed_slice(),
            lifetime: HashMap::new(),
            rejected: HashMap::new(),
            counters: Counters::default(),
            version: 0,
        };
        Self {
            core,
            config,
            state: SpinLock::new(state),
        }
    }

    fn find_locked(&self, state: &mut SpinLockGuard<'_, State>, req: &Request, update: bool) -> Option<ObjHandle> {
        state.counters.n_req += 1;
        *state.lifetime.entry(req.obj_id).or_default() += 1;

        let handle = self.core.index().find(req.obj_id)?;
        if update {
            let freq = &mut state.freq[handle.slot()];
            *freq = freq.saturating_add(1).min(self.config.max_freq());
        }
        Some(handle)
    }

    fn insert_locked(&self, state: &mut SpinLockGuard<'_, State>, req: &Request) -> Option<ObjHandle> {
        let handle = self.core.insert_base(req)?;
        state.list.prepend(self.core.arena(), handle.index());
        state.freq[handle.slot()] = 0;
        state.promotion_time[handle.slot()] = 0;
        state.counters.n_insert += 1;
        Some(handle)
    }

    fn evict_locked(&self, state: &mut SpinLockGuard<'_, State>) -> bool {
        let arena = self.core.arena();
        let state = &mut **state;

        let victim = loop {
            let Some(index) = state.list.tail() else {
                return false;
            };
            let slot = index as usize;
            if state.freq[slot] == 0 {
                break index;
            }

            let obj = arena.get(index);
            let obj_id = obj.obj_id();
            let stamp = state.lifetime.get(&obj_id).copied().unwrap_or(0);
            state.promotion_time[slot] = stamp;
            if state.rejected.get(&obj_id).is_some_and(|stamps| stamps.contains(&stamp)) {
                break index;
            }

            state.freq[slot] = state.freq[slot].saturating_sub(self.config.decrease_rate);
            state.counters.n_promotion += 1;
            state.counters.n_rewrite_objs += 1;
            state.counters.n_rewrite_bytes += obj.obj_size() as u64;
            state.list.move_to_head(arena, index);
        };

        let obj_id = arena.get(victim).obj_id();
        state
            .rejected
            .entry(obj_id)
            .or_default()
            .insert(state.promotion_time[victim as usize]);
        state.list.remove(arena, victim);
        self.core.evict_base(arena.handle_at(victim))
    }
}

impl EvictionPolicy for OptClock {
    fn name(&self) -> String {
        let version = self.state.lock().version;
        format!("OptClock-{}-{}", self.config.n_bit_counter, version + 1)
    }

    fn core(&self) -> &Arc<CacheCore> {
        &self.core
    }

    fn get(&self, req: &Request, _: &mut LocalState) -> bool {
        let mut state = self.state.lock();
        if self.find_locked(&mut state, req, true).is_some() {
            return true;
        }
        if !self.core.can_insert(req) {
            return false;
        }
        while self.core.needs_eviction(req) {
            if !self.evict_locked(&mut state) {
                break;
            }
        }
        self.insert_locked(&mut state, req);
        false
    }

    fn find(&self, req: &Request, update: bool) -> Option<ObjHandle> {
        let mut state = self.state.lock();
        self.find_locked(&mut state, req, update)
    }

    fn insert(&self, req: &Request) -> Option<ObjHandle> {
        let mut state = self.state.lock();
        self.insert_locked(&mut state, req)
    }

    fn to_evict(&self, _: &Request) -> Result<Option<ObjHandle>> {
        Err(Error::unsupported(self.name(), "to_evict"))
    }

    fn evict(&self, _: &Request) -> bool {
        let mut state = self.state.lock();
        self.evict_locked(&mut state)
    }

    fn remove(&self, obj_id: u64) -> Result<bool> {
        let state = self.state.lock();
        let Some(handle) = self.core.index().find(obj_id) else {
            return Ok(false);
        };
        state.list.remove(self.core.arena(), handle.index());
        Ok(self.core.remove_base(handle))
    }

    /// Empty the cache for the next pass, keeping what was learned about rejected promotions.
    fn reset(&self) -> Result<()> {
        let mut state = self.state.lock();
        let arena = self.core.arena();
        let mut dropped = 0;
        while let Some(index) = state.list.evict_last(arena) {
            self.core.remove_base(arena.handle_at(index));
            dropped += 1;
        }
        state.counters.n_req = 0;
        state.counters.n_promotion = 0;
        state.counters.n_insert = 0;
        state.lifetime.clear();
        state.version += 1;
        tracing::debug!(
            dropped,
            version = state.version,
            rejected = state.rejected.len(),
            "[opt clock]: reset for next pass"
        );
        Ok(())
    }

    fn iterations(&self) -> usize {
        self.config.iter
    }

    fn stats(&self) -> Vec<(&'static str, u64)> {
        let state = self.state.lock();
        vec![
            ("n_req", state.counters.n_req),
            ("n_promotion", state.counters.n_promotion),
            ("n_insert", state.counters.n_insert),
            ("n_rewrite_objs", state.counters.n_rewrite_objs),
            ("n_rewrite_bytes", state.counters.n_rewrite_bytes),
            ("rejected", state.rejected.values().map(|s| s.len() as u64).sum()),
        ]
    }

    fn dump(&self) -> Vec<u64> {
        let state = self.state.lock();
        let arena = self.core.arena();
        state.list.iter(arena).map(|index| arena.get(index).obj_id()).collect()
    }
}
