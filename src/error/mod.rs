//! # Error Module
//!
//! Error types for the batch masking pipeline.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, chunk ids, what went wrong
//! - **Scope errors to where they stop work** - a bad image is local to its
//!   worker, a failed write ends its chunk, a missing input ends the run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Input error: {0}")]
    Scan(#[from] ScanError),

    #[error("Chunking error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid color range on channel {channel}: lower {lower} exceeds upper {upper}")]
    InvalidColorRange { channel: usize, lower: u8, upper: u8 },

    #[error("{failed} chunk(s) failed, {succeeded} chunk(s) succeeded")]
    ChunksFailed { failed: usize, succeeded: usize },
}

/// Errors that occur while enumerating the input directory
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An image could not be read as a raster
#[derive(Error, Debug)]
#[error("Failed to decode image {path}: {reason}")]
pub struct DecodeError {
    pub path: PathBuf,
    pub reason: String,
}

/// Errors raised while partitioning work
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Invalid worker count: {value} (must be at least 1)")]
    InvalidWorkerCount { value: usize },
}

/// Errors that end a single chunk
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write mask {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Chunk {chunk_id} was cancelled")]
    Cancelled { chunk_id: usize },

    #[error("Worker for chunk {chunk_id} panicked: {message}")]
    WorkerPanicked { chunk_id: usize, message: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, MaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/images/batch_01"),
        };
        assert!(error.to_string().contains("/images/batch_01"));
    }

    #[test]
    fn decode_error_includes_path_and_reason() {
        let error = DecodeError {
            path: PathBuf::from("/images/broken.png"),
            reason: "invalid PNG signature".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/images/broken.png"));
        assert!(message.contains("invalid PNG signature"));
    }

    #[test]
    fn processing_error_wraps_decode_error_transparently() {
        let error = ProcessingError::from(DecodeError {
            path: PathBuf::from("/images/a.jpg"),
            reason: "truncated".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Failed to decode image /images/a.jpg: truncated"
        );
    }

    #[test]
    fn chunks_failed_reports_both_counts() {
        let error = MaskError::ChunksFailed {
            failed: 2,
            succeeded: 6,
        };
        let message = error.to_string();
        assert!(message.contains("2 chunk(s) failed"));
        assert!(message.contains("6 chunk(s) succeeded"));
    }
}
