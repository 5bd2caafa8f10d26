//! # Core Module
//!
//! The masking engine, independent of any front end.
//!
//! ## Modules
//! - `scanner` - Enumerates input images in a stable order
//! - `threshold` - Decodes images and computes binary masks
//! - `chunker` - Partitions the input list into per-worker chunks
//! - `worker` - Processes one chunk and returns its partial count
//! - `pipeline` - Dispatches chunks to a bounded pool and reduces the results

pub mod chunker;
pub mod pipeline;
pub mod scanner;
pub mod threshold;
pub mod worker;

// Re-export commonly used types
pub use chunker::{partition, ChunkAssignment};
pub use pipeline::{CancellationToken, Pipeline, RunReport};
pub use threshold::{ColorRange, Mask, Thresholder};
pub use worker::{ChunkReport, DecodePolicy};
