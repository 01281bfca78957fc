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
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::EvictionPolicy;
use crate::{object::ObjHandle, raw::CacheCore, request::Request};

/// RandomK parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomKConfig {
    /// Candidates sampled per eviction.
    pub k: usize,
}

impl Default for RandomKConfig {
    fn default() -> Self {
        Self { k: 2 }
    }
}

impl Display for RandomKConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "k={}", self.k)
    }
}

impl RandomKConfig {
    /// Parse `key=value` text, e.g. `k=4`.
    pub fn parse(params: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut print = false;
        for param in parse_params(params)? {
            match param.key.as_str() {
                "k" => config.k = param.parse()?,
                PRINT_KEY => print = true,
                key => return Err(Error::unknown_param("RandomK", key)),
            }
        }
        if config.k == 0 {
            return Err(Error::new(ErrorKind::Config, "k must be positive"));
        }
        if print {
            return Err(Error::print_requested("RandomK", config.to_string()));
        }
        Ok(config)
    }
}

/// Sampled LRU: evict the least recently accessed of `k` random residents.
///
/// There is no list at all. A shared virtual clock ticks on every lookup and each object remembers the tick of its
/// last access in a side table indexed by slot. When `k` covers every resident object the whole index is scanned
/// instead, which makes the choice exact.
pub struct RandomK {
    core: Arc<CacheCore>,
    k: usize,
    vtime: AtomicU64,
    last_access: Box<[AtomicU64]>,
    n_resample: AtomicU64,
}

impl RandomK {
    /// Create a RandomK policy over `core`.
    pub fn new(core: Arc<CacheCore>, config: RandomKConfig) -> Self {
        let last_access = (0..core.arena().capacity()).map(|_| AtomicU64::new(0)).collect_vec();
        Self {
            core,
            k: config.k,
            vtime: AtomicU64::new(0),
            last_access: last_access.into_boxed_slice(),
            n_resample: AtomicU64::new(0),
        }
    }

    fn last_access(&self, handle: ObjHandle) -> u64 {
        self.last_access[handle.slot()].load(Ordering::Relaxed)
    }

    fn touch(&self, handle: ObjHandle, vtime: u64) {
        self.last_access[handle.slot()].store(vtime, Ordering::Relaxed);
    }

    /// The oldest of `k` distinct candidates, the first sampled one on ties.
    fn select(&self) -> Option<ObjHandle> {
        let index = self.core.index();
        if self.k >= index.len() {
            return index.handles().into_iter().min_by_key(|&h| self.last_access(h));
        }

        let mut candidates: Vec<ObjHandle> = Vec::with_capacity(self.k);
        let mut attempts = 0;
        while candidates.len() < self.k && attempts < self.k * 4 {
            attempts += 1;
            let candidate = index.random()?;
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }

        let mut victim: Option<(ObjHandle, u64)> = None;
        for candidate in candidates {
            let t = self.last_access(candidate);
            if victim.is_none_or(|(_, incumbent)| t < incumbent) {
                victim = Some((candidate, t));
            }
        }
        victim.map(|(h, _)| h)
    }
}

impl EvictionPolicy for RandomK {
    fn name(&self) -> String {
        format!("Random-{}", self.k)
    }

    fn core(&self) -> &Arc<CacheCore> {
        &self.core
    }

    fn find(&self, req: &Request, update: bool) -> Option<ObjHandle> {
        let vtime = self.vtime.fetch_add(1, Ordering::Relaxed) + 1;
        let handle = self.core.index().find(req.obj_id)?;
        if update {
            self.touch(handle, vtime);
        }
        Some(handle)
    }

    fn insert(&self, req: &Request) -> Option<ObjHandle> {
        let handle = self.core.insert_base(req)?;
        self.touch(handle, self.vtime.load(Ordering::Relaxed));
        Some(handle)
    }

    fn to_evict(&self, _: &Request) -> Result<Option<ObjHandle>> {
        Ok(self.select())
    }

    fn evict(&self, _: &Request) -> bool {
        loop {
            let Some(victim) = self.select() else {
                return false;
            };
            if self.core.evict_base(victim) {
                return true;
            }
            // Lost the victim to a concurrent eviction.
            self.n_resample.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn remove(&self, obj_id: u64) -> Result<bool> {
        Ok(self
            .core
            .index()
            .find(obj_id)
            .is_some_and(|handle| self.core.remove_base(handle)))
    }

    fn stats(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("vtime", self.vtime.load(Ordering::Relaxed)),
            ("resample", self.n_resample.load(Ordering::Relaxed)),
        ]
    }

    fn dump(&self) -> Vec<u64> {
        let arena = self.core.arena();
        self.core
            .index()
            .handles()
            .into_iter()
            .sorted_by_key(|&h| std::cmp::Reverse(self.last_access(h)))
            .map(|h| arena.get(h.index()).obj_id())
            .collect()
    }
}
