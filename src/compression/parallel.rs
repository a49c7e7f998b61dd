//! Runs a batch of independent block jobs on a rayon pool and hands the results back in
//! block sequence order, whatever order the workers finish in.

use std::sync::mpsc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rustc_hash::FxHashMap;

use super::decompress_block::BlockRecord;
use crate::error::{Error, Result};
use crate::tools::rle1::Block;

/// Build a pool with `workers` threads.
pub fn build_pool(workers: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| Error::InvalidConfiguration(format!("cannot start {} workers: {}", workers, e)))
}

/// A job that knows its place in the stream.
pub trait Sequenced {
    fn seq(&self) -> u64;
}

impl Sequenced for Block {
    fn seq(&self) -> u64 {
        self.seq
    }
}

impl Sequenced for BlockRecord {
    fn seq(&self) -> u64 {
        self.seq
    }
}

/// Apply `work` to every job in parallel. Results come back over a channel tagged with their
/// job's sequence number and wait in a reorder buffer until every lower numbered result has
/// been released. Sequence numbers in a batch must be consecutive.
pub fn run_in_order<T, U, F>(pool: &ThreadPool, jobs: Vec<T>, work: F) -> Vec<U>
where
    T: Sequenced + Send,
    U: Send,
    F: Fn(T) -> U + Sync + Send,
{
    let Some(first) = jobs.iter().map(|job| job.seq()).min() else {
        return Vec::new();
    };
    let count = jobs.len();
    let (tx, rx) = mpsc::channel();
    pool.install(|| {
        jobs.into_par_iter().for_each_with(tx, |tx, job| {
            let seq = job.seq();
            // The receiver outlives every sender, so this cannot fail.
            let _ = tx.send((seq, work(job)));
        })
    });

    let mut pending: FxHashMap<u64, U> = FxHashMap::default();
    let mut out = Vec::with_capacity(count);
    let mut next = first;
    for (seq, result) in rx.iter() {
        pending.insert(seq, result);
        while let Some(ready) = pending.remove(&next) {
            out.push(ready);
            next += 1;
        }
    }
    debug_assert!(pending.is_empty(), "gap in block sequence at {}", next);
    out
}
