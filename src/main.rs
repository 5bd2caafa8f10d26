//! # binarymask CLI
//!
//! Command-line interface for the batch masking pipeline.
//!
//! ## Usage
//! ```bash
//! binarymask -i ./frames -o ./masks
//! binarymask -i ./frames -o ./masks -p 4 --format json
//! ```

mod cli;

use binary_mask::Result;

fn main() -> Result<()> {
    cli::run()
}
