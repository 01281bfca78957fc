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

//! Shared components for the hotcache workspace.

/// Assertion helpers gated on the `strict_assertions` feature.
pub mod assert;
/// Per-worker batched counters.
pub mod counter;
/// Error type shared by all hotcache crates.
pub mod error;
/// Key hashing.
pub mod hasher;
/// Flat `key=value` parameter parsing.
pub mod params;
/// Test-and-test-and-set spin lock.
pub mod spin;
