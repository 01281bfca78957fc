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

pub use crate::{
    cache::{CacheBuilder, CacheEngine, Session},
    eviction::{
        batch::{BatchPromotion, BatchPromotionConfig},
        fifo::{Fifo, FifoConfig},
        frozen_hot::{FrozenHot, FrozenHotConfig, Phase},
        opt_clock::{OptClock, OptClockConfig},
        random_k::{RandomK, RandomKConfig},
        EvictionConfig, EvictionPolicy,
    },
    indexer::{FrozenIndex, HashIndex},
    list::IntrusiveList,
    local::LocalState,
    object::{CacheObject, ObjHandle, ObjectArena, NIL},
    raw::CacheCore,
    request::Request,
};
pub use hotcache_common::error::{Error, ErrorKind, Result};
