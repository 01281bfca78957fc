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

use anyhow::anyhow;
use hotcache_memory::prelude::Request;
use itertools::Itertools;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Zipf};

/// Synthetic workload shape.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Distinct objects.
    pub objects: u64,
    /// Zipf exponent, `0` for uniform popularity.
    pub alpha: f64,
    /// Generated requests.
    pub requests: usize,
    /// Inclusive object size range.
    pub obj_size: (u32, u32),
    /// RNG seed.
    pub seed: u64,
}

/// Generate zipf distributed requests. Object ids start at 1, the most popular object being id 1.
pub fn generate(config: &WorkloadConfig) -> anyhow::Result<Vec<Request>> {
    let zipf = Zipf::new(config.objects as f64, config.alpha).map_err(|e| anyhow!("invalid zipf parameters: {e}"))?;
    let (min_size, max_size) = config.obj_size;
    if min_size == 0 || min_size > max_size {
        return Err(anyhow!("invalid object size range {min_size}..={max_size}"));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let reqs = (0..config.requests)
        .map(|_| {
            let obj_id = zipf.sample(&mut rng) as u64;
            // Sizes are a pure function of the id so every request for an object agrees.
            let obj_size = if min_size == max_size {
                min_size
            } else {
                StdRng::seed_from_u64(obj_id ^ config.seed).random_range(min_size..=max_size)
            };
            Request::new(obj_id, obj_size)
        })
        .collect_vec();
    Ok(reqs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zipf_workload() {
        let config = WorkloadConfig {
            objects: 1_000,
            alpha: 1.0,
            requests: 10_000,
            obj_size: (1, 1),
            seed: 42,
        };
        let reqs = generate(&config).unwrap();
        assert_eq!(reqs.len(), 10_000);
        assert!(reqs.iter().all(|r| (1..=1_000).contains(&r.obj_id) && r.obj_size == 1));

        let ones = reqs.iter().filter(|r| r.obj_id == 1).count();
        let tail = reqs.iter().filter(|r| r.obj_id == 1_000).count();
        assert!(ones > tail * 10);

        assert_eq!(generate(&config).unwrap(), reqs);
    }

    #[test]
    fn test_sizes_are_stable_per_object() {
        let reqs = generate(&WorkloadConfig {
            objects: 100,
            alpha: 0.8,
            requests: 5_000,
            obj_size: (1, 64),
            seed: 7,
        })
        .unwrap();
        let sizes = reqs.iter().map(|r| (r.obj_id, r.obj_size)).into_group_map();
        for (_, sizes) in sizes {
            assert!(sizes.iter().all_equal());
        }
    }

    #[test]
    fn test_invalid_config() {
        let config = WorkloadConfig {
            objects: 10,
            alpha: -1.0,
            requests: 1,
            obj_size: (1, 1),
            seed: 0,
        };
        assert!(generate(&config).is_err());
    }
}
