//! # Worker Module
//!
//! Processes one [`ChunkAssignment`]: for each path, in order, decode the
//! image, threshold it, write the mask as PNG and add its masked-pixel count
//! to the chunk's running total.
//!
//! Only one decoded image and one mask are alive at a time, so peak memory
//! follows the largest image rather than the size of the chunk.
//!
//! ## Failure Scope
//! - A file that cannot be decoded is skipped with a warning under
//!   [`DecodePolicy::Skip`], or ends the chunk under [`DecodePolicy::Abort`].
//! - A mask that cannot be written always ends the chunk.
//! - Cancellation is checked before each image.
//! - Two sources in one chunk that map to the same mask name (`x.png` and
//!   `x.bmp`, or `a/x.png` and `b/x.png`) are both counted; the later mask
//!   replaces the earlier file and the source is listed in
//!   [`ChunkReport::overwritten`].

use crate::core::chunker::ChunkAssignment;
use crate::core::pipeline::CancellationToken;
use crate::core::threshold::{count_masked, Thresholder};
use crate::error::ProcessingError;
use crate::events::{ChunkEvent, Event, EventSender};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What a worker does with an image it cannot decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecodePolicy {
    /// Log a warning, record the path, continue with the next image
    #[default]
    Skip,
    /// Fail the whole chunk
    Abort,
}

/// Outcome of a successfully processed chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReport {
    pub chunk_id: usize,
    /// Images whose masks were written
    pub images_processed: usize,
    /// Images skipped because they could not be decoded
    pub skipped: Vec<PathBuf>,
    /// Sum of masked pixels over `images_processed`
    pub masked_pixels: u64,
    /// Sources whose mask replaced one written earlier in this chunk
    #[serde(default)]
    pub overwritten: Vec<PathBuf>,
}

/// Stateless chunk processor; one instance is shared by every pool thread
#[derive(Clone)]
pub struct Worker {
    thresholder: Thresholder,
    decode_policy: DecodePolicy,
    cancellation: CancellationToken,
    events: EventSender,
}

impl Worker {
    pub fn new(
        thresholder: Thresholder,
        decode_policy: DecodePolicy,
        cancellation: CancellationToken,
        events: EventSender,
    ) -> Self {
        Self {
            thresholder,
            decode_policy,
            cancellation,
            events,
        }
    }

    /// Process every path of `assignment` and return the chunk's partial count
    pub fn run(&self, assignment: &ChunkAssignment) -> Result<ChunkReport, ProcessingError> {
        info!(chunk = assignment.id, images = assignment.len(), "starting chunk");
        self.events.send(Event::Chunk(ChunkEvent::Started {
            chunk_id: assignment.id,
            images: assignment.len(),
        }));

        match self.process(assignment) {
            Ok(report) => {
                info!(
                    chunk = assignment.id,
                    masked_pixels = report.masked_pixels,
                    skipped = report.skipped.len(),
                    "chunk complete"
                );
                self.events.send(Event::Chunk(ChunkEvent::Completed {
                    chunk_id: assignment.id,
                    masked_pixels: report.masked_pixels,
                }));
                Ok(report)
            }
            Err(e) => {
                warn!(chunk = assignment.id, "chunk failed: {}", e);
                self.events.send(Event::Chunk(ChunkEvent::Failed {
                    chunk_id: assignment.id,
                    message: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    fn process(&self, assignment: &ChunkAssignment) -> Result<ChunkReport, ProcessingError> {
        let mut report = ChunkReport {
            chunk_id: assignment.id,
            images_processed: 0,
            skipped: Vec::new(),
            masked_pixels: 0,
            overwritten: Vec::new(),
        };
        let mut written = HashSet::with_capacity(assignment.len());

        for path in &assignment.paths {
            if self.cancellation.is_cancelled() {
                return Err(ProcessingError::Cancelled {
                    chunk_id: assignment.id,
                });
            }

            let mask = match self.thresholder.mask_file(path) {
                Ok(mask) => mask,
                Err(e) if self.decode_policy == DecodePolicy::Skip => {
                    warn!(chunk = assignment.id, "skipping image: {}", e);
                    self.events.send(Event::Chunk(ChunkEvent::ImageSkipped {
                        chunk_id: assignment.id,
                        path: path.clone(),
                        message: e.reason.clone(),
                    }));
                    report.skipped.push(path.clone());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let target = assignment.mask_path(path);
            mask.save_with_format(&target, image::ImageFormat::Png)
                .map_err(|e| ProcessingError::WriteFailed {
                    path: target.clone(),
                    reason: e.to_string(),
                })?;

            if !written.insert(target.clone()) {
                warn!(
                    chunk = assignment.id,
                    path = %path.display(),
                    target = %target.display(),
                    "mask name already used in this chunk, earlier mask replaced"
                );
                report.overwritten.push(path.clone());
            }

            let masked_pixels = count_masked(&mask);
            debug!(
                chunk = assignment.id,
                path = %path.display(),
                masked_pixels,
                "pixels with mask value 255"
            );
            self.events.send(Event::Chunk(ChunkEvent::ImageMasked {
                chunk_id: assignment.id,
                path: path.clone(),
                masked_pixels,
            }));

            report.masked_pixels += masked_pixels;
            report.images_processed += 1;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chunker::partition;
    use crate::events::{null_sender, EventChannel};
    use image::{ImageBuffer, Rgb, RgbImage};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// 4x4 PNG with the first `white` pixels (row-major) set to white
    fn write_image(dir: &Path, name: &str, white: u32) -> PathBuf {
        let path = dir.join(name);
        let image: RgbImage = ImageBuffer::from_fn(4, 4, |x, y| {
            if y * 4 + x < white {
                Rgb([255, 255, 255])
            } else {
                Rgb([10, 20, 30])
            }
        });
        image.save(&path).unwrap();
        path
    }

    fn worker(policy: DecodePolicy) -> Worker {
        Worker::new(
            Thresholder::default(),
            policy,
            CancellationToken::new(),
            null_sender(),
        )
    }

    fn single_chunk(paths: Vec<PathBuf>, output_dir: &Path) -> ChunkAssignment {
        partition(&paths, 1, output_dir).unwrap().remove(0)
    }

    #[test]
    fn sums_masked_pixels_and_writes_one_mask_per_image() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let paths = vec![
            write_image(input.path(), "a.png", 5),
            write_image(input.path(), "b.png", 0),
            write_image(input.path(), "c.png", 12),
        ];

        let report = worker(DecodePolicy::Skip)
            .run(&single_chunk(paths, output.path()))
            .unwrap();

        assert_eq!(report.masked_pixels, 17);
        assert_eq!(report.images_processed, 3);
        assert!(report.skipped.is_empty());
        for stem in ["a", "b", "c"] {
            assert!(output.path().join(format!("proc_0_{}_mask.png", stem)).exists());
        }
    }

    #[test]
    fn written_mask_is_binary_and_matches_source_size() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let paths = vec![write_image(input.path(), "frame.png", 6)];

        worker(DecodePolicy::Skip)
            .run(&single_chunk(paths, output.path()))
            .unwrap();

        let mask = image::open(output.path().join("proc_0_frame_mask.png"))
            .unwrap()
            .to_luma8();
        assert_eq!(mask.dimensions(), (4, 4));
        assert!(mask.as_raw().iter().all(|&v| v == 0 || v == 255));
        assert_eq!(count_masked(&mask), 6);
    }

    #[test]
    fn skip_policy_continues_past_corrupt_image() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let corrupt = input.path().join("b.png");
        fs::write(&corrupt, b"not a png").unwrap();
        let paths = vec![
            write_image(input.path(), "a.png", 3),
            corrupt.clone(),
            write_image(input.path(), "c.png", 4),
        ];

        let report = worker(DecodePolicy::Skip)
            .run(&single_chunk(paths, output.path()))
            .unwrap();

        assert_eq!(report.masked_pixels, 7);
        assert_eq!(report.images_processed, 2);
        assert_eq!(report.skipped, vec![corrupt]);
        assert!(!output.path().join("proc_0_b_mask.png").exists());
    }

    #[test]
    fn abort_policy_fails_chunk_on_corrupt_image() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let corrupt = input.path().join("broken.jpg");
        fs::write(&corrupt, b"garbage").unwrap();

        let result = worker(DecodePolicy::Abort).run(&single_chunk(vec![corrupt], output.path()));

        assert!(matches!(result, Err(ProcessingError::Decode(_))));
    }

    #[test]
    fn missing_output_directory_is_a_write_failure() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let paths = vec![write_image(input.path(), "a.png", 1)];
        let missing = output.path().join("does-not-exist");

        let result = worker(DecodePolicy::Skip).run(&single_chunk(paths, &missing));

        assert!(matches!(result, Err(ProcessingError::WriteFailed { .. })));
    }

    #[test]
    fn cancelled_token_stops_before_first_image() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let paths = vec![write_image(input.path(), "a.png", 1)];
        let token = CancellationToken::new();
        token.cancel();

        let worker = Worker::new(
            Thresholder::default(),
            DecodePolicy::Skip,
            token,
            null_sender(),
        );
        let result = worker.run(&single_chunk(paths, output.path()));

        assert!(matches!(
            result,
            Err(ProcessingError::Cancelled { chunk_id: 0 })
        ));
        assert!(!output.path().join("proc_0_a_mask.png").exists());
    }

    #[test]
    fn colliding_mask_names_are_reported() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let bmp = input.path().join("x.bmp");
        RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]))
            .save(&bmp)
            .unwrap();
        let png = write_image(input.path(), "x.png", 2);

        let report = worker(DecodePolicy::Skip)
            .run(&single_chunk(vec![bmp, png.clone()], output.path()))
            .unwrap();

        assert_eq!(report.images_processed, 2);
        assert_eq!(report.masked_pixels, 18);
        assert_eq!(report.overwritten, vec![png]);
        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 1);
    }

    #[test]
    fn emits_per_image_and_completion_events() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let paths = vec![
            write_image(input.path(), "a.png", 2),
            write_image(input.path(), "b.png", 3),
        ];
        let (sender, receiver) = EventChannel::new();

        let worker = Worker::new(
            Thresholder::default(),
            DecodePolicy::Skip,
            CancellationToken::new(),
            sender,
        );
        worker.run(&single_chunk(paths, output.path())).unwrap();
        drop(worker);

        let events: Vec<_> = receiver.iter().collect();
        let masked = events
            .iter()
            .filter(|e| matches!(e, Event::Chunk(ChunkEvent::ImageMasked { .. })))
            .count();
        assert_eq!(masked, 2);
        assert!(matches!(
            events.last(),
            Some(Event::Chunk(ChunkEvent::Completed {
                chunk_id: 0,
                masked_pixels: 5
            }))
        ));
    }
}
