//! # Pipeline Module
//!
//! The coordinator: partitions the input, runs one worker per chunk on a
//! bounded thread pool, waits for all of them and sums their partial counts.
//!
//! ## Stages
//! 1. **Scan** - Enumerate and sort the input images
//! 2. **Partition** - Split the list into contiguous chunks
//! 3. **Dispatch** - Hand every chunk to a pool of `worker_count` threads
//! 4. **Join** - Block until every chunk has succeeded or failed
//! 5. **Reduce** - Sum the partial counts of the chunks that succeeded
//!
//! ## Parallelism
//! Uses a dedicated rayon thread pool sized to the worker count, so at most
//! `worker_count` chunks are in flight at once.

mod cancel;
mod executor;

pub use cancel::CancellationToken;
pub use executor::{
    execute, resolve_worker_count, ChunkFailure, Pipeline, PipelineBuilder, PipelineConfig,
    RunReport,
};
pub use crate::events::CoordinatorState;
