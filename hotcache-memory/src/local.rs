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

use hotcache_common::counter::LocalCounter;

use crate::object::ObjHandle;

/// Per-worker state, owned by a [`Session`](crate::cache::Session).
///
/// Policies keep their thread-local buffers here so the request path never touches shared state for them.
#[derive(Debug, Default)]
pub struct LocalState {
    pub(crate) promotions: Vec<ObjHandle>,
    pub(crate) frozen_hot: FrozenHotLocal,

    hits: u64,
    misses: u64,
}

impl LocalState {
    /// Hits observed through this state.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Misses observed through this state.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Hit promotions buffered but not yet applied.
    pub fn pending_promotions(&self) -> usize {
        self.promotions.len()
    }

    pub(crate) fn record(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

/// Batched access and miss counters of the frozen-hot policy.
///
/// `epoch` is the policy's period number the pending counts belong to. Counts from an older period are discarded.
#[derive(Debug, Default)]
pub(crate) struct FrozenHotLocal {
    pub(crate) epoch: u64,
    pub(crate) regular_access: LocalCounter,
    pub(crate) regular_miss: LocalCounter,
    pub(crate) frozen_access: LocalCounter,
    pub(crate) frozen_miss: LocalCounter,
}

impl FrozenHotLocal {
    pub(crate) fn discard(&mut self, epoch: u64) {
        self.epoch = epoch;
        self.regular_access.discard();
        self.regular_miss.discard();
        self.frozen_access.discard();
        self.frozen_miss.discard();
    }
}
