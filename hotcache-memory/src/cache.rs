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

use crate::{
    eviction::{EvictionConfig, EvictionPolicy},
    local::LocalState,
    object::{CacheObject, ObjHandle},
    raw::CacheCore,
    request::Request,
};

/// Default bucket bits of the hash index.
pub const DEFAULT_HASH_POWER: u8 = 20;

/// Builder of [`CacheEngine`].
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    capacity: u64,
    hash_power: u8,
    object_slots: Option<usize>,
    eviction_config: EvictionConfig,
}

impl CacheBuilder {
    /// A cache holding at most `capacity` bytes. With unit-size objects this is an object count.
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            hash_power: DEFAULT_HASH_POWER,
            object_slots: None,
            eviction_config: EvictionConfig::default(),
        }
    }

    /// Bucket bits hint of the hash index. The policy may adjust it.
    pub fn with_hash_power(mut self, hash_power: u8) -> Self {
        self.hash_power = hash_power;
        self
    }

    /// Number of object slots to preallocate.
    ///
    /// Defaults to `capacity + max(capacity / 8, 1024)`, which suits unit-size objects. Running out of slots is fatal,
    /// so size it for the largest resident object count when objects are small relative to the capacity.
    pub fn with_object_slots(mut self, object_slots: usize) -> Self {
        self.object_slots = Some(object_slots);
        self
    }

    /// Eviction policy and its parameters.
    pub fn with_eviction_config(mut self, eviction_config: impl Into<EvictionConfig>) -> Self {
        self.eviction_config = eviction_config.into();
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<CacheEngine> {
        if self.capacity == 0 {
            return Err(Error::new(ErrorKind::Config, "capacity must be positive"));
        }
        let hash_power = self.eviction_config.hash_power(self.hash_power);
        if !(1..=31).contains(&hash_power) {
            return Err(Error::new(ErrorKind::Config, "hash power must be in 1..=31").with_context("hash_power", hash_power));
        }
        let object_slots = self
            .object_slots
            .map(|slots| slots as u64)
            .unwrap_or_else(|| self.capacity + (self.capacity / 8).max(1024));
        if object_slots == 0 || object_slots >= u32::MAX as u64 {
            return Err(
                Error::new(ErrorKind::Config, "object slots must be in 1..u32::MAX").with_context("object_slots", object_slots)
            );
        }

        let core = Arc::new(CacheCore::new(self.capacity, hash_power, object_slots as usize));
        let policy = self.eviction_config.build(core.clone());
        tracing::info!(
            policy = %policy.name(),
            capacity = self.capacity,
            hash_power,
            object_slots,
            "[cache]: engine built"
        );
        Ok(CacheEngine { core, policy })
    }
}

/// The cache: a shared [`CacheCore`] driven by one [`EvictionPolicy`].
///
/// The engine is `Sync`. Worker threads share one engine and each open a [`Session`].
pub struct CacheEngine {
    core: Arc<CacheCore>,
    policy: Box<dyn EvictionPolicy>,
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("policy", &self.policy.name())
            .field("core", &self.core)
            .finish()
    }
}

impl CacheEngine {
    /// Open a per-worker session.
    pub fn session(&self) -> Session<'_> {
        Session {
            engine: self,
            local: LocalState::default(),
        }
    }

    /// The shared core.
    pub fn core(&self) -> &Arc<CacheCore> {
        &self.core
    }

    /// The active policy.
    pub fn policy(&self) -> &dyn EvictionPolicy {
        self.policy.as_ref()
    }

    /// Policy name.
    pub fn name(&self) -> String {
        self.policy.name()
    }

    /// Serve `req` with an explicit worker state. Returns `true` on a hit.
    pub fn get(&self, req: &Request, local: &mut LocalState) -> bool {
        let hit = self.policy.get(req, local);
        local.record(hit);
        hit
    }

    /// See [`EvictionPolicy::find`].
    pub fn find(&self, req: &Request, update: bool) -> Option<ObjHandle> {
        self.policy.find(req, update)
    }

    /// Insert `req`, evicting first if it does not fit.
    pub fn insert(&self, req: &Request) -> Option<ObjHandle> {
        if !self.core.can_insert(req) {
            return None;
        }
        while self.core.needs_eviction(req) {
            if !self.policy.evict(req) {
                break;
            }
        }
        self.policy.insert(req)
    }

    /// See [`EvictionPolicy::to_evict`].
    pub fn to_evict(&self, req: &Request) -> Result<Option<ObjHandle>> {
        self.policy.to_evict(req)
    }

    /// See [`EvictionPolicy::evict`].
    pub fn evict(&self, req: &Request) -> bool {
        self.policy.evict(req)
    }

    /// See [`EvictionPolicy::remove`].
    pub fn remove(&self, obj_id: u64) -> Result<bool> {
        self.policy.remove(obj_id)
    }

    /// See [`EvictionPolicy::reset`].
    pub fn reset(&self) -> Result<()> {
        self.policy.reset()
    }

    /// Replay passes requested by the policy.
    pub fn iterations(&self) -> usize {
        self.policy.iterations()
    }

    /// Wait for background work of the policy.
    pub fn quiesce(&self) {
        self.policy.quiesce()
    }

    /// Policy specific counters.
    pub fn stats(&self) -> Vec<(&'static str, u64)> {
        self.policy.stats()
    }

    /// Resident ids in policy order.
    pub fn dump(&self) -> Vec<u64> {
        self.policy.dump()
    }

    /// Whether `req` can ever be cached.
    pub fn can_insert(&self, req: &Request) -> bool {
        self.core.can_insert(req)
    }

    /// End the single-threaded warm-up phase.
    pub fn complete_warmup(&self) {
        self.core.complete_warmup()
    }

    /// Whether warm-up has completed.
    pub fn is_warmup_complete(&self) -> bool {
        self.core.is_warmup_complete()
    }

    /// Resident objects.
    pub fn n_obj(&self) -> u64 {
        self.core.n_obj()
    }

    /// Resident bytes.
    pub fn occupied_bytes(&self) -> u64 {
        self.core.occupied()
    }

    /// Byte budget.
    pub fn capacity(&self) -> u64 {
        self.core.capacity()
    }

    /// The object behind a live handle.
    pub fn object(&self, handle: ObjHandle) -> Option<&CacheObject> {
        let arena = self.core.arena();
        arena.is_live(handle).then(|| arena.get(handle.index()))
    }
}

/// A worker's view of a [`CacheEngine`].
///
/// Owns the worker's [`LocalState`] and applies everything it buffered when dropped.
pub struct Session<'a> {
    engine: &'a CacheEngine,
    local: LocalState,
}

impl Session<'_> {
    /// Serve `req`. Returns `true` on a hit.
    pub fn get(&mut self, req: &Request) -> bool {
        self.engine.get(req, &mut self.local)
    }

    /// Apply buffered state now.
    pub fn flush(&mut self) {
        self.engine.policy.flush(&mut self.local);
    }

    /// Hits served by this session.
    pub fn hits(&self) -> u64 {
        self.local.hits()
    }

    /// Misses served by this session.
    pub fn misses(&self) -> u64 {
        self.local.misses()
    }

    /// The engine.
    pub fn engine(&self) -> &CacheEngine {
        self.engine
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::{batch::BatchPromotionConfig, fifo::FifoConfig};

    #[test]
    fn test_build_errors() {
        assert_eq!(CacheBuilder::new(0).build().unwrap_err().kind(), ErrorKind::Config);
        assert_eq!(
            CacheBuilder::new(10).with_hash_power(40).build().unwrap_err().kind(),
            ErrorKind::Config
        );
        assert_eq!(
            CacheBuilder::new(10).with_object_slots(0).build().unwrap_err().kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_engine_surface() {
        let cache = CacheBuilder::new(4)
            .with_hash_power(4)
            .with_eviction_config(FifoConfig::default())
            .build()
            .unwrap();

        let h = cache.insert(&Request::new(7, 2)).unwrap();
        assert_eq!(cache.object(h).unwrap().obj_id(), 7);
        assert_eq!(cache.occupied_bytes(), 2);
        assert!(cache.insert(&Request::new(8, 5)).is_none());

        cache.insert(&Request::new(9, 2));
        cache.insert(&Request::new(10, 2));
        assert!(cache.object(h).is_none());
        assert_eq!(cache.dump(), vec![10, 9]);
        assert!(cache.remove(9).unwrap());
        assert_eq!(cache.n_obj(), 1);
    }

    #[test]
    fn test_session_flushes_on_drop() {
        let cache = CacheBuilder::new(8)
            .with_hash_power(4)
            .with_eviction_config(BatchPromotionConfig::default())
            .build()
            .unwrap();

        {
            let mut session = cache.session();
            for id in 1..=4 {
                session.get(&Request::new(id, 1));
            }
            assert!(session.get(&Request::new(1, 1)));
            assert_eq!(session.hits(), 1);
            assert_eq!(session.misses(), 4);
            assert_eq!(cache.dump(), vec![4, 3, 2, 1]);
        }
        assert_eq!(cache.dump(), vec![1, 4, 3, 2]);
    }
}
