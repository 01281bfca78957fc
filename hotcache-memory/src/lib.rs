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

//! The concurrent cache core of hotcache.
//!
//! Objects live in a fixed [`ObjectArena`](prelude::ObjectArena) and are addressed by generation-checked
//! [`ObjHandle`](prelude::ObjHandle)s. A [`HashIndex`](prelude::HashIndex) with per-bucket spin locks maps ids to handles, and one of the
//! [`EvictionPolicy`](prelude::EvictionPolicy) implementations decides which object leaves when the byte budget is exceeded.
//!
//! ```rust
//! use hotcache_memory::prelude::*;
//!
//! let cache = CacheBuilder::new(2)
//!     .with_hash_power(4)
//!     .with_eviction_config(FifoConfig::default())
//!     .build()
//!     .unwrap();
//!
//! let mut session = cache.session();
//! assert!(!session.get(&Request::new(1, 1)));
//! assert!(session.get(&Request::new(1, 1)));
//! ```

mod cache;
mod eviction;
mod indexer;
mod list;
mod local;
mod object;
mod raw;
mod request;

/// Commonly used types, re-exported.
pub mod prelude;
