//! Pipeline execution implementation.

use super::CancellationToken;
use crate::core::chunker::{partition, ChunkAssignment};
use crate::core::scanner::{ImageScanner, ScanConfig, WalkDirScanner};
use crate::core::threshold::{ColorRange, Thresholder};
use crate::core::worker::{ChunkReport, DecodePolicy, Worker};
use crate::error::{MaskError, ProcessingError, Result};
use crate::events::{
    null_sender, ChunkEvent, CoordinatorState, Event, EventSender, PipelineEvent,
    PipelineSummary,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A chunk that stopped on a fatal error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub chunk_id: usize,
    /// Number of images assigned to the chunk
    pub images: usize,
    pub message: String,
}

/// Result of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Sum of partial counts over successful chunks only
    pub total_masked_pixels: u64,
    /// Images handed to the chunker
    pub total_images: usize,
    /// Resolved pool size
    pub worker_count: usize,
    /// Successful chunks, sorted by id
    pub chunks: Vec<ChunkReport>,
    /// Failed chunks, sorted by id
    pub failures: Vec<ChunkFailure>,
    /// Non-fatal enumeration errors
    pub scan_errors: Vec<String>,
    /// `Done` or `Failed`
    pub state: CoordinatorState,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl RunReport {
    pub fn chunks_succeeded(&self) -> usize {
        self.chunks.len()
    }

    pub fn images_processed(&self) -> usize {
        self.chunks.iter().map(|c| c.images_processed).sum()
    }

    pub fn images_skipped(&self) -> usize {
        self.chunks.iter().map(|c| c.skipped.len()).sum()
    }

    /// Images whose mask file replaced another mask of the same chunk
    pub fn masks_overwritten(&self) -> usize {
        self.chunks.iter().map(|c| c.overwritten.len()).sum()
    }

    /// Images belonging to failed chunks
    pub fn images_failed(&self) -> usize {
        self.failures.iter().map(|f| f.images).sum()
    }

    pub fn is_success(&self) -> bool {
        self.state == CoordinatorState::Done
    }

    /// The grand total, or an error naming how many chunks failed.
    ///
    /// A failed chunk never contributes a silent zero.
    pub fn into_total(self) -> Result<u64> {
        if self.failures.is_empty() {
            Ok(self.total_masked_pixels)
        } else {
            Err(MaskError::ChunksFailed {
                failed: self.failures.len(),
                succeeded: self.chunks.len(),
            })
        }
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            total_masked_pixels: self.total_masked_pixels,
            images_processed: self.images_processed(),
            images_skipped: self.images_skipped(),
            chunks_failed: self.failures.len(),
            state: self.state,
            duration_ms: self.duration_ms,
        }
    }
}

/// Configuration for the pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Directory to enumerate (used by `run`)
    pub input_dir: Option<PathBuf>,
    /// Directory masks are written into; created if absent
    pub output_dir: Option<PathBuf>,
    /// Pool size; `None` or `Some(0)` means all available cores
    pub worker_count: Option<usize>,
    /// Pixel predicate
    pub color_range: ColorRange,
    /// Handling of undecodable images
    pub decode_policy: DecodePolicy,
    /// Scanner configuration
    pub scan_config: ScanConfig,
}

/// Builder for pipeline configuration
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    cancellation: Option<CancellationToken>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory to enumerate
    pub fn input_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_dir = Some(path.into());
        self
    }

    /// Set the directory masks are written into
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(path.into());
        self
    }

    /// Set the pool size (`None` = all cores)
    pub fn worker_count(mut self, count: Option<usize>) -> Self {
        self.config.worker_count = count;
        self
    }

    /// Set the color range
    pub fn color_range(mut self, range: ColorRange) -> Self {
        self.config.color_range = range;
        self
    }

    /// Set the decode failure policy
    pub fn decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.config.decode_policy = policy;
        self
    }

    /// Set scanner configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    /// Skip hidden files and directories
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.config.scan_config.skip_hidden = skip;
        self
    }

    /// Share a cancellation token with the caller
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            cancellation: self.cancellation.unwrap_or_default(),
        }
    }
}

/// The masking pipeline
pub struct Pipeline {
    config: PipelineConfig,
    cancellation: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Token that stops this pipeline's workers when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Enumerate the input directory and process it, without events
    pub fn run(&self) -> Result<RunReport> {
        self.run_with_events(&null_sender())
    }

    /// Enumerate the input directory and process it, with event reporting
    pub fn run_with_events(&self, events: &EventSender) -> Result<RunReport> {
        let input_dir = self
            .config
            .input_dir
            .as_deref()
            .ok_or_else(|| MaskError::Config("input directory not set".to_string()))?;

        info!(input = %input_dir.display(), "reading image paths");
        let scanner = WalkDirScanner::new(self.config.scan_config.clone());
        let scan_result = scanner.scan_with_events(input_dir, events)?;

        let mut report = self.execute(&scan_result.images, events)?;
        report.scan_errors = scan_result
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect();
        Ok(report)
    }

    /// Process an already enumerated, ordered list of images.
    ///
    /// Returns `Err` only for problems that stop the run before any chunk is
    /// dispatched. Chunk failures are reported in the returned
    /// [`RunReport`], whose state is then `Failed`.
    pub fn execute(&self, paths: &[PathBuf], events: &EventSender) -> Result<RunReport> {
        let start_time = Instant::now();
        let mut state = CoordinatorState::Idle;

        let output_dir = self
            .config
            .output_dir
            .as_deref()
            .ok_or_else(|| MaskError::Config("output directory not set".to_string()))?;

        events.send(Event::Pipeline(PipelineEvent::Started));

        fs::create_dir_all(output_dir).map_err(|e| ProcessingError::CreateOutputDir {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        let worker_count = resolve_worker_count(self.config.worker_count);
        let assignments = partition(paths, worker_count, output_dir)?;

        events.send(Event::Pipeline(PipelineEvent::Partitioned {
            chunks: assignments.len(),
            workers: worker_count,
        }));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|i| format!("mask-worker-{}", i))
            .build()
            .map_err(|e| MaskError::ThreadPool(e.to_string()))?;

        let worker = Worker::new(
            Thresholder::new(self.config.color_range),
            self.config.decode_policy,
            self.cancellation.clone(),
            events.clone(),
        );

        info!(
            workers = worker_count,
            chunks = assignments.len(),
            images = paths.len(),
            "launching pool"
        );
        advance(&mut state, CoordinatorState::Dispatching, events);

        let outcomes = dispatch(&pool, &worker, &assignments, &mut state, events);

        advance(&mut state, CoordinatorState::Reducing, events);

        let mut chunks = Vec::new();
        let mut failures = Vec::new();
        for (assignment, outcome) in assignments.iter().zip(outcomes) {
            match outcome {
                Ok(report) => chunks.push(report),
                Err(e) => failures.push(ChunkFailure {
                    chunk_id: assignment.id,
                    images: assignment.len(),
                    message: e.to_string(),
                }),
            }
        }

        let total_masked_pixels = chunks.iter().map(|c| c.masked_pixels).sum();

        let terminal = if failures.is_empty() {
            CoordinatorState::Done
        } else {
            warn!(
                failed = failures.len(),
                succeeded = chunks.len(),
                "some chunks failed; their images are excluded from the total"
            );
            CoordinatorState::Failed
        };
        advance(&mut state, terminal, events);

        let report = RunReport {
            total_masked_pixels,
            total_images: paths.len(),
            worker_count,
            chunks,
            failures,
            scan_errors: Vec::new(),
            state,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            total_masked_pixels = report.total_masked_pixels,
            state = %report.state,
            "processing complete"
        );
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: report.summary(),
        }));

        Ok(report)
    }
}

/// Run every assignment on `pool` and block until all have returned.
///
/// Results come back in assignment order regardless of completion order.
fn dispatch(
    pool: &rayon::ThreadPool,
    worker: &Worker,
    assignments: &[ChunkAssignment],
    state: &mut CoordinatorState,
    events: &EventSender,
) -> Vec<std::result::Result<ChunkReport, ProcessingError>> {
    let (sender, receiver) = crossbeam_channel::unbounded();

    pool.scope(|scope| {
        for (index, assignment) in assignments.iter().enumerate() {
            let sender = sender.clone();
            scope.spawn(move |_| {
                let outcome = guarded(assignment.id, events, || worker.run(assignment));
                let _ = sender.send((index, outcome));
            });
        }
        advance(state, CoordinatorState::AwaitingCompletion, events);
    });
    drop(sender);

    let mut outcomes: Vec<_> = receiver.iter().collect();
    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

/// Run one chunk, turning a panic into a failure of that chunk alone
fn guarded<F>(
    chunk_id: usize,
    events: &EventSender,
    run: F,
) -> std::result::Result<ChunkReport, ProcessingError>
where
    F: FnOnce() -> std::result::Result<ChunkReport, ProcessingError>,
{
    panic::catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        warn!(chunk = chunk_id, "worker panicked: {}", message);
        let error = ProcessingError::WorkerPanicked { chunk_id, message };
        events.send(Event::Chunk(ChunkEvent::Failed {
            chunk_id,
            message: error.to_string(),
        }));
        Err(error)
    })
}

fn advance(state: &mut CoordinatorState, next: CoordinatorState, events: &EventSender) {
    debug!(from = %state, to = %next, "coordinator state change");
    *state = next;
    events.send(Event::Pipeline(PipelineEvent::StateChanged { state: next }));
}

/// Resolve a requested pool size; `None` and `Some(0)` mean all available cores
pub fn resolve_worker_count(requested: Option<usize>) -> usize {
    match requested {
        Some(n) if n > 0 => n,
        _ => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
    }
}

/// Mask `paths` into `output_dir` with default settings and return the run report
pub fn execute(
    paths: &[PathBuf],
    output_dir: &Path,
    worker_count: Option<usize>,
) -> Result<RunReport> {
    Pipeline::builder()
        .output_dir(output_dir)
        .worker_count(worker_count)
        .build()
        .execute(paths, &null_sender())
}
