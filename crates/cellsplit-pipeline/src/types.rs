//! Shared types for the cellsplit segmentation pipeline.

use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

use crate::regions::{RegionFilter, RegionStats};
use crate::threshold::Threshold;
use crate::watershed::FloodOptions;

/// Re-export `GrayImage` so downstream crates can reference masks and
/// other 8-bit rasters without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` for renderers that colorize intermediates.
pub use image::RgbImage;

/// Per-pixel Euclidean distance to the nearest background pixel.
pub type DistanceImage = ImageBuffer<Luma<f64>, Vec<f64>>;

/// Integer label grid. Zero means unlabeled / background.
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Mask value for foreground (cell) pixels.
pub const FOREGROUND: u8 = 255;

/// Mask value for background pixels.
pub const BACKGROUND: u8 = 0;

/// Returns `true` if a mask pixel value counts as foreground.
///
/// Any non-zero value is foreground so masks produced by other tools
/// (e.g. 0/1 masks) are accepted as-is.
#[must_use]
pub const fn is_foreground(value: u8) -> bool {
    value != BACKGROUND
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of any image buffer.
    #[must_use]
    pub fn of<P: image::Pixel, C: std::ops::Deref<Target = [P::Subpixel]>>(
        image: &ImageBuffer<P, C>,
    ) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A detected seed: a local maximum of the distance field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    /// Column of the seed pixel.
    pub x: u32,
    /// Row of the seed pixel.
    pub y: u32,
    /// Distance-field value at the seed.
    pub distance: f64,
}

/// Configuration for the segmentation pipeline.
///
/// `min_distance` is the only parameter that changes how blobs are
/// split: larger values merge nearby peaks into one seed (less
/// over-segmentation), smaller values react to local bumps in the
/// distance field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Minimum Chebyshev separation between two seeds, in pixels.
    ///
    /// Must be at least 1.
    pub min_distance: u32,

    /// How the grayscale input is binarized.
    pub threshold: Threshold,

    /// Leave pixels where two basins meet unassigned during flooding.
    pub watershed_line: bool,

    /// Which separated regions are reported as cells.
    pub cell_filter: RegionFilter,
}

impl SegmentConfig {
    /// Default seed separation.
    pub const DEFAULT_MIN_DISTANCE: u32 = 6;

    /// Default fixed binarization level (foreground is strictly above it).
    pub const DEFAULT_THRESHOLD_LEVEL: u8 = 128;

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `min_distance` is zero
    /// or the cell area bounds are inverted.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.min_distance == 0 {
            return Err(PipelineError::InvalidConfig(
                "min_distance must be at least 1".to_string(),
            ));
        }
        self.cell_filter.validate()
    }

    /// Flooding options derived from this configuration.
    #[must_use]
    pub const fn flood_options(&self) -> FloodOptions {
        FloodOptions {
            watershed_line: self.watershed_line,
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_distance: Self::DEFAULT_MIN_DISTANCE,
            threshold: Threshold::Fixed(Self::DEFAULT_THRESHOLD_LEVEL),
            watershed_line: false,
            cell_filter: RegionFilter::default(),
        }
    }
}

/// Output of [`segment`](crate::segment): the separated mask and every
/// raster the separation was derived from.
///
/// Does not derive `PartialEq`; compare individual rasters instead.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Euclidean distance field of the input mask.
    pub distance: DistanceImage,
    /// Binary image with 255 at each accepted seed.
    pub peaks: GrayImage,
    /// Accepted seeds, strongest first.
    pub seeds: Vec<Seed>,
    /// Connected seed groups, labeled from 1.
    pub markers: LabelImage,
    /// Number of distinct markers (`num_peaks`).
    pub marker_count: u32,
    /// Flooded basins, restricted to the input mask.
    pub labels: LabelImage,
    /// Highest region label, which is also the number of regions.
    pub region_count: u32,
    /// Union of every region's 4-connected outer border.
    pub lines: GrayImage,
    /// The input mask with watershed-line pixels cleared.
    pub result: GrayImage,
    /// Regions accepted by the configured cell filter, in label order.
    pub cells: Vec<RegionStats>,
}

impl Segmentation {
    /// Number of foreground pixels cleared from the input mask.
    #[must_use]
    pub fn seam_pixel_count(&self, mask: &GrayImage) -> u64 {
        crate::boundary::count_seam_pixels(mask, &self.lines)
    }
}

/// Result of running the pipeline from encoded image bytes with every
/// intermediate preserved.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Decoded 8-bit grayscale image.
    pub grayscale: GrayImage,
    /// Level used for binarization (fixed or computed by Otsu).
    pub threshold_level: u8,
    /// Binary mask: 255 where `grayscale > threshold_level`.
    pub mask: GrayImage,
    /// Watershed separation of `mask`.
    pub segmentation: Segmentation,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// Two rasters that must share a grid have different sizes.
    #[error("raster size mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Size of the reference raster.
        expected: Dimensions,
        /// Size of the offending raster.
        actual: Dimensions,
    },
}
