//! # Threshold Module
//!
//! Turns an RGB image into a binary mask of the pixels whose every channel
//! falls inside a color range.
//!
//! ## How It Works
//! 1. Decode the image and drop any alpha channel
//! 2. For each pixel, test all three channels against the inclusive range
//! 3. Write 255 where the test passes and 0 elsewhere
//!
//! The default range is `[200, 255]` on every channel, which keeps near-white
//! pixels. The transform is purely per-pixel: no neighbourhood, no global state.
//!
//! ## Example
//! ```rust,ignore
//! use binary_mask::core::threshold::{count_masked, Thresholder};
//!
//! let mask = Thresholder::default().mask_file(&path)?;
//! println!("{} near-white pixels", count_masked(&mask));
//! ```

mod decode;

pub use decode::FastDecoder;

use crate::error::{DecodeError, MaskError};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Single-channel binary raster with values 0 or 255
pub type Mask = GrayImage;

/// Value written for pixels inside the range
pub const MASK_ON: u8 = 255;

/// Value written for pixels outside the range
pub const MASK_OFF: u8 = 0;

/// Inclusive per-channel bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    lower: [u8; 3],
    upper: [u8; 3],
}

impl ColorRange {
    /// Create a range, rejecting any channel whose lower bound exceeds its upper bound
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> Result<Self, MaskError> {
        for channel in 0..3 {
            if lower[channel] > upper[channel] {
                return Err(MaskError::InvalidColorRange {
                    channel,
                    lower: lower[channel],
                    upper: upper[channel],
                });
            }
        }
        Ok(Self { lower, upper })
    }

    /// `[200, 255]` on all three channels
    pub const fn near_white() -> Self {
        Self {
            lower: [200, 200, 200],
            upper: [255, 255, 255],
        }
    }

    pub fn lower(&self) -> [u8; 3] {
        self.lower
    }

    pub fn upper(&self) -> [u8; 3] {
        self.upper
    }

    /// True if every channel of `pixel` is within bounds
    #[inline]
    pub fn contains(&self, pixel: &Rgb<u8>) -> bool {
        pixel
            .0
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(value, (lo, hi))| lo <= value && value <= hi)
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self::near_white()
    }
}

/// Applies a [`ColorRange`] to images
#[derive(Debug, Clone, Copy, Default)]
pub struct Thresholder {
    range: ColorRange,
}

impl Thresholder {
    pub fn new(range: ColorRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> ColorRange {
        self.range
    }

    /// Compute the mask of an RGB image
    pub fn mask(&self, image: &RgbImage) -> Mask {
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            if self.range.contains(image.get_pixel(x, y)) {
                Luma([MASK_ON])
            } else {
                Luma([MASK_OFF])
            }
        })
    }

    /// Compute the mask of any decoded image, converting to 8-bit RGB first
    pub fn mask_dynamic(&self, image: &DynamicImage) -> Mask {
        match image {
            DynamicImage::ImageRgb8(rgb) => self.mask(rgb),
            other => self.mask(&other.to_rgb8()),
        }
    }

    /// Decode `path` and compute its mask
    pub fn mask_file(&self, path: &Path) -> Result<Mask, DecodeError> {
        let image = FastDecoder::decode(path)?;
        Ok(self.mask_dynamic(&image))
    }
}

/// Number of pixels set to 255
pub fn count_masked(mask: &Mask) -> u64 {
    mask.as_raw().iter().filter(|&&v| v == MASK_ON).count() as u64
}
