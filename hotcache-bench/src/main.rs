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

//! Replay a request stream against one shared cache from many pinned threads.

mod harness;
mod trace;
mod workload;

use std::path::PathBuf;

use clap::Parser;
use harness::{HarnessConfig, Report};
use hotcache_memory::prelude::*;
use workload::WorkloadConfig;

#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
struct Args {
    /// Cache capacity. (B, an object count with unit-size objects)
    #[arg(short, long, default_value_t = 100_000)]
    capacity: u64,

    /// Bucket bits of the hash index. Derived from the capacity if absent.
    #[arg(long)]
    hash_power: Option<u8>,

    /// Preallocated object slots. Defaults to the capacity plus headroom.
    #[arg(long)]
    object_slots: Option<usize>,

    /// Eviction algorithm: fifo, randomK, bp-wrapper, frozenhot, optclock.
    #[arg(short, long, default_value = "fifo")]
    algorithm: String,

    /// Algorithm parameters as `key=value,key=value`. `print` lists the effective parameters.
    #[arg(short, long, default_value = "")]
    params: String,

    /// Worker threads.
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// Do not pin workers to cores.
    #[arg(long, default_value_t = false)]
    no_pin: bool,

    /// Binary trace to replay instead of a synthetic workload.
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Write the synthetic workload to this trace file before replaying it.
    #[arg(long)]
    dump_trace: Option<PathBuf>,

    /// Treat every object as one byte.
    #[arg(long, default_value_t = false)]
    ignore_obj_size: bool,

    /// Synthetic workload: requests.
    #[arg(long, default_value_t = 10_000_000)]
    requests: usize,

    /// Synthetic workload: distinct objects.
    #[arg(long, default_value_t = 1_000_000)]
    objects: u64,

    /// Synthetic workload: zipf exponent.
    #[arg(long, default_value_t = 0.99)]
    zipf: f64,

    /// Synthetic workload: min object size. (B)
    #[arg(long, default_value_t = 1)]
    obj_size_min: u32,

    /// Synthetic workload: max object size. (B)
    #[arg(long, default_value_t = 1)]
    obj_size_max: u32,

    /// Synthetic workload: RNG seed.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn init_logger() {
    use tracing_subscriber::{prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_line_number(true))
        .with(EnvFilter::from_default_env())
        .init();
}

#[cfg(feature = "deadlock")]
fn spawn_deadlock_detector() {
    std::thread::spawn(move || loop {
        std::thread::sleep(std::time::Duration::from_secs(1));
        let deadlocks = parking_lot::deadlock::check_deadlock();
        if deadlocks.is_empty() {
            continue;
        }

        println!("{} deadlocks detected", deadlocks.len());
        for (i, threads) in deadlocks.iter().enumerate() {
            println!("Deadlock #{i}");
            for t in threads {
                println!("Thread Id {:#?}", t.thread_id());
                println!("{:#?}", t.backtrace());
            }
        }
        panic!()
    });
}

fn default_hash_power(capacity: u64) -> u8 {
    (capacity.max(2).next_power_of_two().trailing_zeros() as u8).clamp(4, 31)
}

fn print_report(report: &Report) {
    for (i, pass) in report.passes.iter().enumerate() {
        println!(
            "pass {i}: {policy}, {threads} threads, warm-up {warmup} req, {requests} req, miss ratio {ratio:.4}, \
             throughput {mqps:.2} MQPS, {elapsed:.2?}",
            policy = pass.policy,
            threads = report.threads,
            warmup = pass.warmup_requests,
            requests = pass.requests,
            ratio = pass.miss_ratio,
            mqps = pass.mqps,
            elapsed = pass.elapsed,
        );
    }
    for (k, v) in report.stats.iter() {
        println!("    {k}: {v}");
    }
}

fn main() -> anyhow::Result<()> {
    init_logger();

    #[cfg(feature = "deadlock")]
    spawn_deadlock_detector();

    let args = Args::parse();

    let eviction_config = match EvictionConfig::parse(&args.algorithm, &args.params) {
        Ok(config) => config,
        Err(e) if e.is_print_requested() => {
            println!("{} parameters: {}", args.algorithm, e.message());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut builder = CacheBuilder::new(args.capacity)
        .with_hash_power(args.hash_power.unwrap_or_else(|| default_hash_power(args.capacity)))
        .with_eviction_config(eviction_config);
    if let Some(slots) = args.object_slots {
        builder = builder.with_object_slots(slots);
    }
    let cache = builder.build()?;

    let reqs = match &args.trace {
        Some(path) => trace::read(path, args.ignore_obj_size)?,
        None => workload::generate(&WorkloadConfig {
            objects: args.objects,
            alpha: args.zipf,
            requests: args.requests,
            obj_size: (args.obj_size_min, args.obj_size_max),
            seed: args.seed,
        })?,
    };
    if let (None, Some(path)) = (&args.trace, &args.dump_trace) {
        trace::write(path, &reqs)?;
    }

    let report = harness::run(
        &cache,
        &reqs,
        HarnessConfig {
            threads: args.threads,
            pin: !args.no_pin,
        },
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::parse_from(["hotcache-bench", "-a", "randomK", "-p", "k=4", "--capacity", "1000"]);
        assert_eq!(args.threads, 4);
        assert!(matches!(
            EvictionConfig::parse(&args.algorithm, &args.params).unwrap(),
            EvictionConfig::RandomK(RandomKConfig { k: 4 })
        ));
        assert_eq!(default_hash_power(args.capacity), 10);
        assert_eq!(default_hash_power(1), 4);
    }
}
