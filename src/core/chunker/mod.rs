//! # Chunker Module
//!
//! Splits the sorted input list into contiguous, near-equal runs, one per
//! worker.
//!
//! `chunk_size = ceil(len / workers)`. Every chunk except possibly the last
//! has exactly `chunk_size` paths, so a short list produces fewer chunks than
//! workers rather than empty chunks. Each chunk gets the prefix `proc_<id>_`,
//! which keeps the mask filenames of different chunks apart inside one
//! output directory.

use crate::error::ChunkError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Suffix appended to the source stem of every mask file
pub const MASK_SUFFIX: &str = "_mask.png";

/// One worker's share of the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkAssignment {
    /// Sequential id, starting at 0
    pub id: usize,
    /// Paths in their original order
    pub paths: Vec<PathBuf>,
    /// Filename prefix unique to this chunk (`proc_<id>_`)
    pub output_prefix: String,
    /// Directory the masks are written into
    pub output_dir: PathBuf,
}

impl ChunkAssignment {
    /// Where the mask for `source` is written:
    /// `<output_dir>/<output_prefix><stem>_mask.png`
    ///
    /// Only the file stem is kept, so `x.png` and `x.bmp` (or `a/x.png` and
    /// `b/x.png`) in the same chunk map to the same file.
    pub fn mask_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        self.output_dir
            .join(format!("{}{}{}", self.output_prefix, stem, MASK_SUFFIX))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Filename prefix for chunk `id`
pub fn output_prefix(id: usize) -> String {
    format!("proc_{}_", id)
}

/// Partition `paths` into at most `worker_count` contiguous chunks.
///
/// Returns no chunks for an empty list. `worker_count` must be at least 1;
/// resolving "use every core" to a number is the caller's job.
pub fn partition(
    paths: &[PathBuf],
    worker_count: usize,
    output_dir: &Path,
) -> Result<Vec<ChunkAssignment>, ChunkError> {
    if worker_count == 0 {
        return Err(ChunkError::InvalidWorkerCount {
            value: worker_count,
        });
    }

    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let chunk_size = paths.len().div_ceil(worker_count);

    Ok(paths
        .chunks(chunk_size)
        .enumerate()
        .map(|(id, slice)| ChunkAssignment {
            id,
            paths: slice.to_vec(),
            output_prefix: output_prefix(id),
            output_dir: output_dir.to_path_buf(),
        })
        .collect())
}
