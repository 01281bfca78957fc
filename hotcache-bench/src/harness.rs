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

use std::{
    collections::BTreeMap,
    thread,
    time::{Duration, Instant},
};

use hotcache_memory::prelude::*;
use itertools::Itertools;
use serde::Serialize;

/// Result of one replay pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    /// Policy name at the start of the pass.
    pub policy: String,
    /// Requests consumed by the single-threaded warm-up.
    pub warmup_requests: usize,
    /// Requests replayed by the workers.
    pub requests: u64,
    /// Worker hits.
    pub hits: u64,
    /// Worker misses.
    pub misses: u64,
    /// `misses / requests`.
    pub miss_ratio: f64,
    /// Wall time of the concurrent replay.
    pub elapsed: Duration,
    /// Million requests per second.
    pub mqps: f64,
}

/// Result of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Worker threads.
    pub threads: usize,
    /// Every pass, in order.
    pub passes: Vec<PassReport>,
    /// Policy counters after the last pass.
    pub stats: BTreeMap<String, u64>,
}

/// How workers are placed.
#[derive(Debug, Clone, Copy)]
pub struct HarnessConfig {
    /// Worker threads.
    pub threads: usize,
    /// Pin worker `i` to core `i`.
    pub pin: bool,
}

/// Insert requests single-threaded until the next one would need an eviction. Returns the consumed count.
fn warmup(cache: &CacheEngine, reqs: &[Request]) -> usize {
    let mut session = cache.session();
    let mut consumed = 0;
    for req in reqs {
        let resident = cache.core().index().find(req.obj_id).is_some();
        if !resident && cache.can_insert(req) && cache.core().needs_eviction(req) {
            break;
        }
        session.get(req);
        consumed += 1;
    }
    drop(session);
    cache.complete_warmup();
    tracing::info!(
        consumed,
        n_obj = cache.n_obj(),
        occupied = cache.occupied_bytes(),
        "[harness]: warm-up done"
    );
    consumed
}

fn pin(worker: usize, cores: &[core_affinity::CoreId]) {
    if cores.is_empty() {
        tracing::warn!(worker, "[harness]: core ids unavailable, worker is not pinned");
        return;
    }
    let core = cores[worker % cores.len()];
    if !core_affinity::set_for_current(core) {
        tracing::warn!(worker, core = core.id, "[harness]: failed to pin worker");
    }
}

/// Replay `reqs` against `cache`: warm up on one thread, then shard the rest over the workers.
///
/// Worker `i` serves requests `i, i + threads, i + 2 * threads, ...` of the post warm-up stream. Policies asking for
/// several passes get the whole stream once per pass with a [`CacheEngine::reset`] in between.
pub fn run(cache: &CacheEngine, reqs: &[Request], config: HarnessConfig) -> anyhow::Result<Report> {
    let threads = config.threads.max(1);
    let cores = config
        .pin
        .then(|| core_affinity::get_core_ids().unwrap_or_default());

    let mut passes = vec![];
    for pass in 0..cache.iterations() {
        if pass > 0 {
            cache.reset()?;
        }
        let policy = cache.name();
        let warmup_requests = warmup(cache, reqs);
        let measured = &reqs[warmup_requests..];

        let start = Instant::now();
        let (hits, misses) = thread::scope(|s| {
            (0..threads)
                .map(|worker| {
                    let cores = cores.as_deref();
                    s.spawn(move || {
                        if let Some(cores) = cores {
                            pin(worker, cores);
                        }
                        let mut session = cache.session();
                        for req in measured.iter().skip(worker).step_by(threads) {
                            session.get(req);
                        }
                        session.flush();
                        (session.hits(), session.misses())
                    })
                })
                .collect_vec()
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .fold((0, 0), |(h, m), (dh, dm)| (h + dh, m + dm))
        });
        let elapsed = start.elapsed();
        cache.quiesce();

        let requests = hits + misses;
        let report = PassReport {
            policy,
            warmup_requests,
            requests,
            hits,
            misses,
            miss_ratio: if requests == 0 { 0.0 } else { misses as f64 / requests as f64 },
            elapsed,
            mqps: requests as f64 / elapsed.as_secs_f64().max(f64::EPSILON) / 1e6,
        };
        tracing::info!(pass, ?report, "[harness]: pass done");
        passes.push(report);
    }

    let stats = cache
        .stats()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect::<BTreeMap<_, _>>();
    for (k, v) in stats.iter() {
        tracing::info!(policy = %cache.name(), stat = k.as_str(), value = *v, "[harness]: policy stat");
    }

    Ok(Report { threads, passes, stats })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(algorithm: &str, capacity: u64) -> CacheEngine {
        CacheBuilder::new(capacity)
            .with_hash_power(10)
            .with_eviction_config(EvictionConfig::parse(algorithm, "").unwrap())
            .build()
            .unwrap()
    }

    #[test_log::test]
    fn test_fifo_scan_has_no_hits() {
        let cache = build("fifo", 100);
        let reqs = (1..=1_000).map(|id| Request::new(id, 1)).collect_vec();
        let report = run(&cache, &reqs, HarnessConfig { threads: 4, pin: false }).unwrap();

        assert_eq!(report.passes.len(), 1);
        let pass = &report.passes[0];
        assert_eq!(pass.warmup_requests, 100);
        assert_eq!(pass.requests, 900);
        assert_eq!(pass.hits, 0);
        assert_eq!(pass.miss_ratio, 1.0);
    }

    #[test_log::test]
    fn test_opt_clock_runs_every_pass() {
        let cache = build("optclock", 64);
        let reqs = (0..10_000u64).map(|i| Request::new((i * i) % 257 + 1, 1)).collect_vec();
        let report = run(&cache, &reqs, HarnessConfig { threads: 2, pin: true }).unwrap();

        assert_eq!(report.passes.len(), 2);
        assert_eq!(report.passes[0].policy, "OptClock-1-1");
        assert_eq!(report.passes[1].policy, "OptClock-1-2");
        assert!(report.stats.contains_key("n_promotion"));
        assert!(serde_json::to_string(&report).unwrap().contains("OptClock-1-2"));
    }
}
