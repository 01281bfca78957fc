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

use serde::{Deserialize, Serialize};

/// A single cache request replayed against the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    /// Object id. Never zero in generated workloads.
    pub obj_id: u64,
    /// Object size in bytes.
    pub obj_size: u32,
    /// Logical time of the next request to the same object, `-1` if unknown or never.
    pub next_access_vtime: i64,
}

impl Request {
    /// A request without future knowledge.
    pub fn new(obj_id: u64, obj_size: u32) -> Self {
        Self {
            obj_id,
            obj_size,
            next_access_vtime: -1,
        }
    }
}
