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

use std::sync::Arc;

use hotcache_common::{
    error::{Error, Result},
    params::{parse_params, PRINT_KEY},
    spin::SpinLock,
};
use serde::{Deserialize, Serialize};

use super::EvictionPolicy;
use crate::{list::IntrusiveList, object::ObjHandle, raw::CacheCore, request::Request};

/// FIFO takes no parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FifoConfig {}

impl FifoConfig {
    /// Parse `key=value` text. Only `print` is accepted.
    pub fn parse(params: &str) -> Result<Self> {
        let mut print = false;
        for param in parse_params(params)? {
            match param.key.as_str() {
                PRINT_KEY => print = true,
                key => return Err(Error::unknown_param("FIFO", key)),
            }
        }
        if print {
            return Err(Error::print_requested("FIFO", ""));
        }
        Ok(Self {})
    }
}

/// First-in-first-out eviction.
///
/// New objects are pushed at the head and the tail is evicted. Hits do not reorder anything. Once warm-up completes the
/// list is driven purely by the lock-free push and pop, otherwise a spin lock serializes list access.
pub struct Fifo {
    core: Arc<CacheCore>,
    list: IntrusiveList,
    /// Guards `list` until warm-up completes.
    lock: SpinLock<()>,
}

impl Fifo {
    /// Create a FIFO policy over `core`.
    pub fn new(core: Arc<CacheCore>, _: FifoConfig) -> Self {
        Self {
            core,
            list: IntrusiveList::new(),
            lock: SpinLock::new(()),
        }
    }
}

impl EvictionPolicy for Fifo {
    fn name(&self) -> String {
        "FIFO".to_string()
    }

    fn core(&self) -> &Arc<CacheCore> {
        &self.core
    }

    fn find(&self, req: &Request, _: bool) -> Option<ObjHandle> {
        self.core.index().find(req.obj_id)
    }

    fn insert(&self, req: &Request) -> Option<ObjHandle> {
        let handle = self.core.insert_base(req)?;
        if self.core.is_warmup_complete() {
            self.list.prepend_lock_free(self.core.arena(), handle.index());
        } else {
            let _guard = self.lock.lock();
            self.list.prepend(self.core.arena(), handle.index());
        }
        Some(handle)
    }

    fn to_evict(&self, _: &Request) -> Result<Option<ObjHandle>> {
        Ok(self.list.tail().map(|index| self.core.arena().handle_at(index)))
    }

    /// Returns `false` when the lock-free list has no published tail, which happens while another thread pops the last
    /// object or pushes into an empty list.
    fn evict(&self, _: &Request) -> bool {
        let arena = self.core.arena();
        let victim = if self.core.is_warmup_complete() {
            self.list.evict_last_lock_free(arena)
        } else {
            let _guard = self.lock.lock();
            self.list.evict_last(arena)
        };
        match victim {
            Some(index) => self.core.evict_base(arena.handle_at(index)),
            None => false,
        }
    }

    fn remove(&self, obj_id: u64) -> Result<bool> {
        if self.core.is_warmup_complete() {
            return Err(Error::unsupported(self.name(), "remove"));
        }
        let _guard = self.lock.lock();
        let Some(handle) = self.core.index().find(obj_id) else {
            return Ok(false);
        };
        self.list.remove(self.core.arena(), handle.index());
        Ok(self.core.remove_base(handle))
    }

    fn dump(&self) -> Vec<u64> {
        let arena = self.core.arena();
        self.list.iter(arena).map(|index| arena.get(index).obj_id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use hotcache_common::error::ErrorKind;
    use itertools::Itertools;

    use super::*;
    use crate::{eviction::test_utils::*, local::LocalState};

    #[test]
    fn test_fifo_order() {
        let fifo = Fifo::new(core(4), FifoConfig::default());
        let mut local = LocalState::default();

        let hits = replay(&fifo, &mut local, &requests([1, 2, 3, 4, 1, 2, 5, 6]));
        assert_eq!(hits, vec![false, false, false, false, true, true, false, false]);
        // Hits never promote, so 1 and 2 go first.
        assert_eq!(fifo.dump(), vec![6, 5, 4, 3]);
        let next = fifo.to_evict(&Request::new(0, 1)).unwrap().unwrap();
        assert_eq!(fifo.core().arena().get(next.index()).obj_id(), 3);
        assert_consistent(&fifo);
    }

    #[test]
    fn test_fifo_remove_before_warmup_only() {
        let fifo = Fifo::new(core(8), FifoConfig::default());
        let mut local = LocalState::default();
        replay(&fifo, &mut local, &requests(1..=4));

        assert!(fifo.remove(2).unwrap());
        assert!(!fifo.remove(2).unwrap());
        assert_eq!(fifo.dump(), vec![4, 3, 1]);

        fifo.core().complete_warmup();
        let err = fifo.remove(3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_consistent(&fifo);
    }

    #[test]
    fn test_fifo_lock_free_after_warmup() {
        let fifo = Fifo::new(core(16), FifoConfig::default());
        let mut local = LocalState::default();
        replay(&fifo, &mut local, &requests(1..=16));
        fifo.core().complete_warmup();

        replay(&fifo, &mut local, &requests(17..=40));
        assert_eq!(residents(&fifo), (25..=40).collect_vec());
        assert_eq!(fifo.core().n_evict(), 24);
        assert_consistent(&fifo);
    }

    #[test]
    fn test_fifo_capacity_one_concurrent() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 2_000;

        let fifo = Fifo::new(core(1), FifoConfig::default());
        replay(&fifo, &mut LocalState::default(), &requests([0]));
        fifo.core().complete_warmup();

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let fifo = &fifo;
                s.spawn(move || {
                    let mut local = LocalState::default();
                    replay(fifo, &mut local, &requests((1..=PER_THREAD).map(|i| t * PER_THREAD + i)));
                    fifo.flush(&mut local);
                });
            }
        });

        // Pops that found the list momentarily empty leave a few extra objects behind.
        assert!(fifo.core().n_obj() <= 1 + 2 * THREADS);
        assert_eq!(fifo.core().arena().allocated() as u64, fifo.core().n_obj());
        assert_consistent(&fifo);
    }

    #[test]
    fn test_fifo_params() {
        assert_eq!(FifoConfig::parse(" ").unwrap(), FifoConfig::default());
        assert_eq!(FifoConfig::parse("k=1").unwrap_err().kind(), ErrorKind::Config);
        assert!(FifoConfig::parse("print").unwrap_err().is_print_requested());
    }
}
