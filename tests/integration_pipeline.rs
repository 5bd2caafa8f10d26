//! Integration tests for the pipeline module.
//!
//! These tests drive the full scan -> partition -> dispatch -> reduce flow
//! against real files in temporary directories.

use binary_mask::core::pipeline::{execute, CoordinatorState, Pipeline};
use binary_mask::core::worker::DecodePolicy;
use binary_mask::error::{MaskError, ScanError};
use image::{ImageBuffer, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 8x8 PNG whose first `white` pixels (row-major) are near-white
fn create_test_png(dir: &Path, name: &str, white: u32) -> PathBuf {
    let path = dir.join(name);
    let image: RgbImage = ImageBuffer::from_fn(8, 8, |x, y| {
        if y * 8 + x < white {
            Rgb([230, 240, 250])
        } else {
            Rgb([120, 199, 255])
        }
    });
    image.save(&path).unwrap();
    path
}

fn pipeline(input: &Path, output: &Path, workers: usize) -> Pipeline {
    Pipeline::builder()
        .input_dir(input)
        .output_dir(output)
        .worker_count(Some(workers))
        .build()
}

fn sorted_dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn total_is_sum_of_per_image_counts() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    create_test_png(input.path(), "01.png", 5);
    create_test_png(input.path(), "02.png", 0);
    create_test_png(input.path(), "03.png", 12);
    create_test_png(input.path(), "04.png", 3);

    let report = pipeline(input.path(), output.path(), 2).run().unwrap();

    assert_eq!(report.state, CoordinatorState::Done);
    assert_eq!(report.images_processed(), 4);
    assert_eq!(report.into_total().unwrap(), 20);
}

#[test]
fn total_does_not_depend_on_worker_count() {
    let input = TempDir::new().unwrap();
    for (i, white) in [5, 0, 12, 3, 64, 1, 9].iter().enumerate() {
        create_test_png(input.path(), &format!("img_{}.png", i), *white);
    }

    for workers in 1..=8 {
        let output = TempDir::new().unwrap();
        let report = pipeline(input.path(), output.path(), workers).run().unwrap();
        assert_eq!(report.total_masked_pixels, 94, "workers={}", workers);
    }
}

#[test]
fn masks_are_named_by_chunk_prefix_and_stem() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for name in ["a.png", "b.png", "c.png", "d.png"] {
        create_test_png(input.path(), name, 1);
    }

    pipeline(input.path(), output.path(), 2).run().unwrap();

    assert_eq!(
        sorted_dir_listing(output.path()),
        vec![
            "proc_0_a_mask.png",
            "proc_0_b_mask.png",
            "proc_1_c_mask.png",
            "proc_1_d_mask.png",
        ]
    );
}

#[test]
fn rerun_produces_identical_masks_and_total() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for (i, white) in [7, 0, 33].iter().enumerate() {
        create_test_png(input.path(), &format!("f{}.png", i), *white);
    }

    let first = pipeline(input.path(), output.path(), 2).run().unwrap();
    let first_bytes: Vec<_> = sorted_dir_listing(output.path())
        .iter()
        .map(|name| fs::read(output.path().join(name)).unwrap())
        .collect();

    let second = pipeline(input.path(), output.path(), 2).run().unwrap();
    let second_bytes: Vec<_> = sorted_dir_listing(output.path())
        .iter()
        .map(|name| fs::read(output.path().join(name)).unwrap())
        .collect();

    assert_eq!(first.total_masked_pixels, second.total_masked_pixels);
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(first_bytes.len(), 3);
}

#[test]
fn empty_input_directory_yields_zero() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    let report = pipeline(input.path(), output.path(), 4).run().unwrap();

    assert_eq!(report.state, CoordinatorState::Done);
    assert!(report.chunks.is_empty());
    assert_eq!(report.into_total().unwrap(), 0);
    assert!(sorted_dir_listing(output.path()).is_empty());
}

#[test]
fn more_workers_than_images_gives_one_chunk_each() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for name in ["x.png", "y.png", "z.png"] {
        create_test_png(input.path(), name, 2);
    }

    let report = pipeline(input.path(), output.path(), 32).run().unwrap();

    assert_eq!(report.chunks.len(), 3);
    assert!(report.chunks.iter().all(|c| c.images_processed == 1));
    assert_eq!(
        sorted_dir_listing(output.path()),
        vec!["proc_0_x_mask.png", "proc_1_y_mask.png", "proc_2_z_mask.png"]
    );
}

#[test]
fn nonexistent_input_directory_is_rejected() {
    let output = TempDir::new().unwrap();

    let result = pipeline(
        Path::new("/nonexistent/path/that/does/not/exist"),
        output.path(),
        2,
    )
    .run();

    assert!(matches!(
        result,
        Err(MaskError::Scan(ScanError::DirectoryNotFound { .. }))
    ));
}

#[test]
fn corrupt_file_is_skipped_by_default() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    create_test_png(input.path(), "good.png", 10);
    fs::write(input.path().join("corrupt.jpg"), b"this is not a valid image file").unwrap();

    let report = pipeline(input.path(), output.path(), 2).run().unwrap();

    assert!(report.is_success());
    assert_eq!(report.images_skipped(), 1);
    assert_eq!(report.images_processed(), 1);
    assert_eq!(report.total_masked_pixels, 10);
}

#[test]
fn corrupt_file_fails_its_chunk_under_abort_policy() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    // Sorted order: a_corrupt.png, b.png -> two chunks of one
    fs::write(input.path().join("a_corrupt.png"), b"garbage").unwrap();
    create_test_png(input.path(), "b.png", 6);

    let report = Pipeline::builder()
        .input_dir(input.path())
        .output_dir(output.path())
        .worker_count(Some(2))
        .decode_policy(DecodePolicy::Abort)
        .build()
        .run()
        .unwrap();

    assert_eq!(report.state, CoordinatorState::Failed);
    assert_eq!(report.total_masked_pixels, 6);
    assert_eq!(report.failures[0].chunk_id, 0);
    assert!(report.into_total().is_err());
}

#[test]
fn execute_accepts_an_explicit_path_list() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let paths = vec![
        create_test_png(input.path(), "p.png", 4),
        create_test_png(input.path(), "q.png", 8),
    ];

    let report = execute(&paths, &output.path().join("masks"), None).unwrap();

    assert_eq!(report.total_masked_pixels, 12);
    assert!(report.worker_count >= 1);
}

#[test]
fn jpeg_input_is_masked() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let path = input.path().join("white.jpg");
    RgbImage::from_pixel(16, 16, Rgb([255, 255, 255]))
        .save(&path)
        .unwrap();

    let report = pipeline(input.path(), output.path(), 1).run().unwrap();

    assert_eq!(report.total_masked_pixels, 256);
    assert!(output.path().join("proc_0_white_mask.png").exists());
}

#[test]
fn png_data_with_jpg_extension_is_masked() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let path = input.path().join("shot.jpg");
    RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]))
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap();

    let report = pipeline(input.path(), output.path(), 1).run().unwrap();

    assert_eq!(report.images_skipped(), 0);
    assert_eq!(report.into_total().unwrap(), 4);
}

#[test]
fn hidden_images_are_counted_unless_skipped() {
    let input = TempDir::new().unwrap();
    create_test_png(input.path(), ".frame.png", 4);
    create_test_png(input.path(), "frame2.png", 4);

    let output = TempDir::new().unwrap();
    let report = pipeline(input.path(), output.path(), 2).run().unwrap();
    assert_eq!(report.total_images, 2);
    assert_eq!(report.total_masked_pixels, 8);

    let output = TempDir::new().unwrap();
    let report = Pipeline::builder()
        .input_dir(input.path())
        .output_dir(output.path())
        .worker_count(Some(2))
        .skip_hidden(true)
        .build()
        .run()
        .unwrap();
    assert_eq!(report.total_images, 1);
    assert_eq!(report.total_masked_pixels, 4);
}

#[test]
fn shared_stem_in_one_chunk_is_reported_as_overwritten() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    RgbImage::from_pixel(2, 1, Rgb([255, 255, 255]))
        .save(input.path().join("x.bmp"))
        .unwrap();
    create_test_png(input.path(), "x.png", 2);

    let report = pipeline(input.path(), output.path(), 1).run().unwrap();

    assert_eq!(report.images_processed(), 2);
    assert_eq!(report.masks_overwritten(), 1);
    assert_eq!(report.total_masked_pixels, 4);
    assert_eq!(sorted_dir_listing(output.path()), vec!["proc_0_x_mask.png"]);
}
