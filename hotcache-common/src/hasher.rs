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

use std::hash::Hasher;

use twox_hash::XxHash64;

/// Hash an object id for bucket selection.
#[inline]
pub fn hash_obj_id(obj_id: u64) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write_u64(obj_id);
    hasher.finish()
}

/// Bucket of `obj_id` in a table of `1 << hash_power` buckets.
#[inline]
pub fn bucket_of(obj_id: u64, hash_power: u8) -> usize {
    (hash_obj_id(obj_id) & ((1u64 << hash_power) - 1)) as usize
}
