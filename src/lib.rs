//! # Binary Mask
//!
//! Batch tool that masks near-white pixels in a directory of images, writes
//! each mask as a PNG and reports the total number of masked pixels.
//!
//! ## Architecture
//! - `core` - Scanning, thresholding, chunking, workers and the coordinator
//! - `events` - Channel-based progress reporting
//! - `error` - Error types scoped to image, chunk and run
//!
//! ## Example
//! ```rust,ignore
//! use binary_mask::core::Pipeline;
//!
//! let report = Pipeline::builder()
//!     .input_dir("/data/frames")
//!     .output_dir("/data/masks")
//!     .worker_count(Some(8))
//!     .build()
//!     .run()?;
//! println!("{}", report.into_total()?);
//! ```

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{MaskError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. The filter is
/// read from `RUST_LOG`, falling back to `default_directive`.
pub fn init_tracing(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // A subscriber installed earlier (e.g. by a test harness) wins
    let _ = tracing::subscriber::set_global_default(subscriber);
}
