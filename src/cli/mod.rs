//! # CLI Module
//!
//! Command-line interface for the batch masking pipeline.
//!
//! ## Usage
//! ```bash
//! # Mask every image under ./frames using all cores
//! binarymask --images ./frames --output ./masks
//!
//! # Four workers, stop a chunk on the first unreadable image
//! binarymask -i ./frames -o ./masks -p 4 --on-decode-error abort
//!
//! # JSON summary for scripting
//! binarymask -i ./frames -o ./masks --format json
//! ```

use binary_mask::core::pipeline::{resolve_worker_count, Pipeline, RunReport};
use binary_mask::core::worker::DecodePolicy;
use binary_mask::error::Result;
use binary_mask::events::{ChunkEvent, Event, EventChannel, PipelineEvent, ScanEvent};
use clap::{Parser, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::thread;

/// Binary Mask - isolate near-white pixels across a directory of images
#[derive(Parser, Debug)]
#[command(name = "binarymask")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to input directory of images
    #[arg(short, long)]
    images: PathBuf,

    /// Path to output directory for mask files (created if missing)
    #[arg(short, long)]
    output: PathBuf,

    /// Number of workers to spin up (<= 0 uses every core)
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    procs: i64,

    /// What to do with images that cannot be decoded
    #[arg(long, default_value = "skip")]
    on_decode_error: DecodeErrorArg,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    format: OutputFormat,

    /// Skip hidden files and directories (names starting with .)
    #[arg(long)]
    skip_hidden: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DecodeErrorArg {
    /// Warn and continue with the next image
    Skip,
    /// Fail the chunk containing the image
    Abort,
}

impl From<DecodeErrorArg> for DecodePolicy {
    fn from(arg: DecodeErrorArg) -> Self {
        match arg {
            DecodeErrorArg::Skip => DecodePolicy::Skip,
            DecodeErrorArg::Abort => DecodePolicy::Abort,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Map the `--procs` flag onto a pool size request
fn requested_workers(procs: i64) -> Option<usize> {
    usize::try_from(procs).ok().filter(|&n| n > 0)
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    binary_mask::init_tracing(if cli.verbose {
        "binary_mask=info"
    } else {
        "binary_mask=warn"
    });

    let term = Term::stderr();
    let pretty = matches!(cli.format, OutputFormat::Pretty);
    let worker_count = requested_workers(cli.procs);

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Binary Mask").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line(&format!(
            "  launching pool using {} workers",
            style(resolve_worker_count(worker_count)).cyan()
        ))
        .ok();
        term.write_line("").ok();
    }

    let pipeline = Pipeline::builder()
        .input_dir(cli.images.clone())
        .output_dir(cli.output.clone())
        .worker_count(worker_count)
        .decode_policy(cli.on_decode_error.into())
        .skip_hidden(cli.skip_hidden)
        .build();

    // Workers stop at their next image; finished masks stay on disk
    let token = pipeline.cancellation_token();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, cancelling remaining images...");
        token.cancel();
    }) {
        term.write_line(&format!(
            "  {} Ctrl-C handler not installed: {}",
            style("!").yellow(),
            e
        ))
        .ok();
    }

    let (sender, receiver) = EventChannel::new();

    let progress = if pretty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = cli.verbose;

    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Scan(ScanEvent::Completed { total_images }) => {
                    pb.set_length(total_images as u64);
                }
                Event::Pipeline(PipelineEvent::StateChanged { state }) => {
                    pb.set_message(format!("{}", state));
                }
                Event::Chunk(ChunkEvent::ImageMasked {
                    chunk_id,
                    path,
                    masked_pixels,
                }) => {
                    pb.inc(1);
                    if verbose {
                        pb.println(format!(
                            "  [worker {}] {}: {} pixels with mask value 255",
                            chunk_id,
                            path.file_name().unwrap_or_default().to_string_lossy(),
                            masked_pixels
                        ));
                    }
                }
                Event::Chunk(ChunkEvent::ImageSkipped { path, message, .. }) => {
                    pb.inc(1);
                    pb.println(format!(
                        "  {} skipped {}: {}",
                        style("!").yellow(),
                        path.display(),
                        message
                    ));
                }
                Event::Chunk(ChunkEvent::Failed { chunk_id, message }) => {
                    pb.println(format!(
                        "  {} worker {} failed: {}",
                        style("✗").red(),
                        chunk_id,
                        message
                    ));
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if let Some(pb) = progress {
                pb.abandon();
            }
            return Err(e);
        }
    };

    match cli.format {
        OutputFormat::Pretty => print_pretty_results(&term, &report),
        OutputFormat::Json => print_json_results(&report),
    }

    report.into_total().map(|_| ())
}

fn print_pretty_results(term: &Term, report: &RunReport) {
    let (marker, headline) = if report.is_success() {
        (style("✓").green().bold(), "Masking Complete")
    } else {
        (style("✗").red().bold(), "Masking Finished With Failures")
    };
    term.write_line(&format!("{} {}", marker, headline)).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images processed in {:.1}s by {} workers",
        style(report.images_processed()).cyan(),
        report.duration_ms as f64 / 1000.0,
        report.worker_count
    ))
    .ok();

    if report.masks_overwritten() > 0 {
        term.write_line(&format!(
            "  {} masks overwritten (sources share a file stem within a chunk)",
            style(report.masks_overwritten()).yellow()
        ))
        .ok();
    }

    if report.images_skipped() > 0 {
        term.write_line(&format!(
            "  {} images skipped (could not be decoded)",
            style(report.images_skipped()).yellow()
        ))
        .ok();
    }

    if !report.failures.is_empty() {
        term.write_line(&format!(
            "  {} of {} chunks failed ({} images not counted)",
            style(report.failures.len()).red(),
            report.failures.len() + report.chunks_succeeded(),
            style(report.images_failed()).red()
        ))
        .ok();
        for failure in &report.failures {
            term.write_line(&format!(
                "    {} chunk {}: {}",
                style("○").dim(),
                failure.chunk_id,
                failure.message
            ))
            .ok();
        }
    }

    for error in &report.scan_errors {
        term.write_line(&format!("  {} {}", style("!").yellow(), error))
            .ok();
    }

    term.write_line("").ok();
    term.write_line(&format!(
        "  Total pixels with mask value 255: {}",
        style(report.total_masked_pixels).bold().green()
    ))
    .ok();
}

fn print_json_results(report: &RunReport) {
    let output = serde_json::json!({
        "total_masked_pixels": report.total_masked_pixels,
        "total_images": report.total_images,
        "images_processed": report.images_processed(),
        "images_skipped": report.images_skipped(),
        "masks_overwritten": report.masks_overwritten(),
        "images_failed": report.images_failed(),
        "worker_count": report.worker_count,
        "state": report.state,
        "duration_ms": report.duration_ms,
        "chunks": report.chunks,
        "failures": report.failures,
        "scan_errors": report.scan_errors,
    });

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed to serialize report: {}", e),
    }
}
