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

use itertools::Itertools;

use super::EvictionPolicy;
use crate::{local::LocalState, raw::CacheCore, request::Request};

/// A core for `capacity` unit-size objects.
pub fn core(capacity: u64) -> Arc<CacheCore> {
    Arc::new(CacheCore::new(capacity, 8, capacity as usize + 1024))
}

/// Unit-size requests for `ids`.
pub fn requests(ids: impl IntoIterator<Item = u64>) -> Vec<Request> {
    ids.into_iter().map(|id| Request::new(id, 1)).collect_vec()
}

/// Replay `reqs` on one state and return the hit flags.
pub fn replay(policy: &dyn EvictionPolicy, local: &mut LocalState, reqs: &[Request]) -> Vec<bool> {
    reqs.iter().map(|req| policy.get(req, local)).collect_vec()
}

/// Resident ids, sorted.
pub fn residents(policy: &dyn EvictionPolicy) -> Vec<u64> {
    policy.dump().into_iter().sorted().collect_vec()
}

/// Assert the policy view agrees with the core counters and the index is well formed.
pub fn assert_consistent(policy: &dyn EvictionPolicy) {
    let core = policy.core();
    assert!(core.index().check_integrity());
    let dump = policy.dump();
    assert_eq!(dump.len() as u64, core.n_obj());
    assert_eq!(dump.iter().unique().count(), dump.len());
    for id in dump {
        assert!(core.index().find(id).is_some(), "{id} is listed but not indexed");
    }
}
