//! Binarization of the grayscale input into a cell mask.
//!
//! Foreground is strictly brighter than the level: with the default
//! fixed level of 128, a pixel of value 128 is background and 129 is a
//! cell.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::types::{BACKGROUND, FOREGROUND, SegmentConfig};

/// How the binarization level is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Threshold {
    /// Use this level directly.
    Fixed(u8),
    /// Pick the level that maximizes between-class variance.
    Otsu,
}

impl Default for Threshold {
    fn default() -> Self {
        Self::Fixed(SegmentConfig::DEFAULT_THRESHOLD_LEVEL)
    }
}

impl Threshold {
    /// Resolve the level for a particular image.
    ///
    /// Otsu on an empty image falls back to the default fixed level.
    #[must_use]
    pub fn level(self, gray: &GrayImage) -> u8 {
        match self {
            Self::Fixed(level) => level,
            Self::Otsu if gray.width() == 0 || gray.height() == 0 => {
                SegmentConfig::DEFAULT_THRESHOLD_LEVEL
            }
            Self::Otsu => imageproc::contrast::otsu_level(gray),
        }
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(level) => write!(f, "fixed({level})"),
            Self::Otsu => f.write_str("otsu"),
        }
    }
}

/// Binarize `gray`: 255 where the value is strictly above `level`, 0
/// elsewhere.
#[must_use = "returns the binary mask"]
pub fn binarize(gray: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > level {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}
