//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the masking pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Input enumeration events
    Scan(ScanEvent),
    /// Per-chunk worker events
    Chunk(ChunkEvent),
    /// Coordinator-level events
    Pipeline(PipelineEvent),
}

/// Events during input enumeration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Enumeration has started
    Started { root: PathBuf },
    /// An entry could not be read but enumeration continues
    Error { path: PathBuf, message: String },
    /// Enumeration completed
    Completed { total_images: usize },
}

/// Events emitted by workers while they process a chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChunkEvent {
    /// A worker picked up its chunk
    Started { chunk_id: usize, images: usize },
    /// One image was masked and its mask written
    ImageMasked {
        chunk_id: usize,
        path: PathBuf,
        masked_pixels: u64,
    },
    /// An image could not be decoded and was skipped
    ImageSkipped {
        chunk_id: usize,
        path: PathBuf,
        message: String,
    },
    /// The chunk finished; `masked_pixels` is its partial count
    Completed { chunk_id: usize, masked_pixels: u64 },
    /// The chunk stopped on a fatal error
    Failed { chunk_id: usize, message: String },
}

/// Coordinator-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Run has started
    Started,
    /// Work was partitioned
    Partitioned { chunks: usize, workers: usize },
    /// The coordinator moved to a new state
    StateChanged { state: CoordinatorState },
    /// Run finished; `summary.state` tells whether it succeeded
    Completed { summary: PipelineSummary },
}

/// Lifecycle of a single run.
///
/// Transitions only move forward:
/// `Idle -> Dispatching -> AwaitingCompletion -> Reducing -> Done | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinatorState {
    Idle,
    Dispatching,
    AwaitingCompletion,
    Reducing,
    Done,
    Failed,
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Masked pixels across all successful chunks
    pub total_masked_pixels: u64,
    /// Images whose masks were written
    pub images_processed: usize,
    /// Images skipped because they could not be decoded
    pub images_skipped: usize,
    /// Chunks that failed
    pub chunks_failed: usize,
    /// Terminal coordinator state
    pub state: CoordinatorState,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatorState::Idle => write!(f, "Idle"),
            CoordinatorState::Dispatching => write!(f, "Dispatching"),
            CoordinatorState::AwaitingCompletion => write!(f, "Awaiting completion"),
            CoordinatorState::Reducing => write!(f, "Reducing"),
            CoordinatorState::Done => write!(f, "Done"),
            CoordinatorState::Failed => write!(f, "Failed"),
        }
    }
}
