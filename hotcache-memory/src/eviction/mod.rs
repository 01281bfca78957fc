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

use hotcache_common::error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};

use crate::{local::LocalState, object::ObjHandle, raw::CacheCore, request::Request};

pub mod batch;
pub mod fifo;
pub mod frozen_hot;
pub mod opt_clock;
pub mod random_k;

#[cfg(test)]
pub mod test_utils;

/// The operations every eviction policy provides on top of a shared [`CacheCore`].
///
/// Implementations are shared by all worker threads and synchronize internally. Operations a policy cannot offer in
/// its current state return [`ErrorKind::Unsupported`].
pub trait EvictionPolicy: Send + Sync + 'static {
    /// Display name including the effective parameters.
    fn name(&self) -> String;

    /// The shared core.
    fn core(&self) -> &Arc<CacheCore>;

    /// Serve one request, inserting on a miss. Returns `true` on a hit.
    fn get(&self, req: &Request, local: &mut LocalState) -> bool {
        let _ = local;
        get_base(self, req)
    }

    /// Look up `req`, updating recency or frequency metadata if `update` is set.
    fn find(&self, req: &Request, update: bool) -> Option<ObjHandle>;

    /// Insert `req`. The caller guarantees there is room. Returns `None` if the id is already resident.
    fn insert(&self, req: &Request) -> Option<ObjHandle>;

    /// Peek at the next victim without evicting it.
    fn to_evict(&self, req: &Request) -> Result<Option<ObjHandle>>;

    /// Evict one object. Returns `false` if there was nothing to evict.
    fn evict(&self, req: &Request) -> bool;

    /// Remove `obj_id` explicitly. Returns `false` if it is not resident.
    fn remove(&self, obj_id: u64) -> Result<bool>;

    /// Apply whatever `local` has buffered.
    fn flush(&self, local: &mut LocalState) {
        let _ = local;
    }

    /// Start a new replay pass.
    fn reset(&self) -> Result<()> {
        Err(Error::unsupported(self.name(), "reset"))
    }

    /// Wait until background work has finished.
    fn quiesce(&self) {}

    /// Number of replay passes the policy wants.
    fn iterations(&self) -> usize {
        1
    }

    /// Policy specific counters.
    fn stats(&self) -> Vec<(&'static str, u64)> {
        vec![]
    }

    /// Resident object ids in policy order, most protected first and next victim last.
    fn dump(&self) -> Vec<u64>;
}

/// Lookup, then evict until the object fits and insert it on a miss.
pub fn get_base<P>(policy: &P, req: &Request) -> bool
where
    P: EvictionPolicy + ?Sized,
{
    if policy.find(req, true).is_some() {
        return true;
    }

    let core = policy.core();
    if !core.can_insert(req) {
        return false;
    }
    while core.needs_eviction(req) {
        if !policy.evict(req) {
            break;
        }
    }
    policy.insert(req);
    false
}

/// Policy selection together with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EvictionConfig {
    /// [`fifo::Fifo`].
    Fifo(fifo::FifoConfig),
    /// [`random_k::RandomK`].
    RandomK(random_k::RandomKConfig),
    /// [`batch::BatchPromotion`].
    BatchPromotion(batch::BatchPromotionConfig),
    /// [`frozen_hot::FrozenHot`].
    FrozenHot(frozen_hot::FrozenHotConfig),
    /// [`opt_clock::OptClock`].
    OptClock(opt_clock::OptClockConfig),
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self::Fifo(fifo::FifoConfig::default())
    }
}

impl EvictionConfig {
    /// Parse an algorithm name and its `key=value` parameter text.
    ///
    /// ```rust
    /// # use hotcache_memory::prelude::*;
    /// let config = EvictionConfig::parse("randomK", "k=4").unwrap();
    /// assert_eq!(config, EvictionConfig::RandomK(RandomKConfig { k: 4 }));
    /// ```
    pub fn parse(algorithm: &str, params: &str) -> Result<Self> {
        let config = match algorithm.to_ascii_lowercase().as_str() {
            "fifo" => Self::Fifo(fifo::FifoConfig::parse(params)?),
            "randomk" | "random" => Self::RandomK(random_k::RandomKConfig::parse(params)?),
            "bp-wrapper" | "batch-promotion" | "batchpromotion" => {
                Self::BatchPromotion(batch::BatchPromotionConfig::parse(params)?)
            }
            "frozenhot" | "fh" => Self::FrozenHot(frozen_hot::FrozenHotConfig::parse(params)?),
            "optclock" => Self::OptClock(opt_clock::OptClockConfig::parse(params)?),
            _ => {
                return Err(Error::new(ErrorKind::Config, "unknown eviction algorithm").with_context("algorithm", algorithm))
            }
        };
        Ok(config)
    }

    /// Bucket bits the policy wants for a given hint.
    ///
    /// Random sampling probes buckets blindly, so it runs on a denser table.
    pub fn hash_power(&self, hint: u8) -> u8 {
        match self {
            Self::RandomK(_) => hint.saturating_sub(8).max(12).min(hint.max(1)),
            _ => hint,
        }
    }

    pub(crate) fn build(self, core: Arc<CacheCore>) -> Box<dyn EvictionPolicy> {
        match self {
            Self::Fifo(config) => Box::new(fifo::Fifo::new(core, config)),
            Self::RandomK(config) => Box::new(random_k::RandomK::new(core, config)),
            Self::BatchPromotion(config) => Box::new(batch::BatchPromotion::new(core, config)),
            Self::FrozenHot(config) => Box::new(frozen_hot::FrozenHot::new(core, config)),
            Self::OptClock(config) => Box::new(opt_clock::OptClock::new(core, config)),
        }
    }
}

impl From<fifo::FifoConfig> for EvictionConfig {
    fn from(config: fifo::FifoConfig) -> Self {
        Self::Fifo(config)
    }
}

impl From<random_k::RandomKConfig> for EvictionConfig {
    fn from(config: random_k::RandomKConfig) -> Self {
        Self::RandomK(config)
    }
}

impl From<batch::BatchPromotionConfig> for EvictionConfig {
    fn from(config: batch::BatchPromotionConfig) -> Self {
        Self::BatchPromotion(config)
    }
}

impl From<frozen_hot::FrozenHotConfig> for EvictionConfig {
    fn from(config: frozen_hot::FrozenHotConfig) -> Self {
        Self::FrozenHot(config)
    }
}

impl From<opt_clock::OptClockConfig> for EvictionConfig {
    fn from(config: opt_clock::OptClockConfig) -> Self {
        Self::OptClock(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_algorithms() {
        assert!(matches!(EvictionConfig::parse("FIFO", "").unwrap(), EvictionConfig::Fifo(_)));
        assert!(matches!(
            EvictionConfig::parse("bp-wrapper", "batch-size=8,queue-size=16").unwrap(),
            EvictionConfig::BatchPromotion(batch::BatchPromotionConfig {
                batch_size: 8,
                queue_size: 16
            })
        ));
        assert!(matches!(EvictionConfig::parse("fh", "").unwrap(), EvictionConfig::FrozenHot(_)));
        assert!(matches!(
            EvictionConfig::parse("OptClock", "iter=3").unwrap(),
            EvictionConfig::OptClock(opt_clock::OptClockConfig { iter: 3, .. })
        ));

        let err = EvictionConfig::parse("lru-k", "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_print_is_not_fatal() {
        let err = EvictionConfig::parse("randomk", "k=3, print").unwrap_err();
        assert!(err.is_print_requested());
        assert_eq!(err.message(), "k=3");
    }

    #[test]
    fn test_hash_power() {
        let random = EvictionConfig::parse("randomk", "").unwrap();
        assert_eq!(random.hash_power(24), 16);
        assert_eq!(random.hash_power(18), 12);
        assert_eq!(random.hash_power(8), 8);
        assert_eq!(EvictionConfig::default().hash_power(24), 24);
    }
}
