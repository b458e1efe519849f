//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate raster before continuing.
//!
//! [`crate::process`] runs everything in one call; [`Pipeline`] lets the
//! caller drive execution one step at a time:
//!
//! ```rust
//! # use cellsplit_pipeline::{Pipeline, SegmentConfig, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let staged = Pipeline::new(png, SegmentConfig::default())
//!     .decode()?
//!     .threshold()
//!     .distance_transform()
//!     .find_peaks()
//!     .flood()?
//!     .separate()
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state, carrying
//! every previously computed raster forward, so stages cannot be skipped
//! or reordered.

use crate::diagnostics::{StageMetrics, count_foreground};
use crate::markers::Markers;
use crate::peaks::Peaks;
use crate::types::{
    Dimensions, DistanceImage, GrayImage, LabelImage, PipelineError, Seed, SegmentConfig,
    Segmentation, StagedResult,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    config: SegmentConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the configuration, then decode the source image to
    /// grayscale.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration is
    /// rejected by [`SegmentConfig::validate`],
    /// [`PipelineError::EmptyInput`] if the source bytes are empty, and
    /// [`PipelineError::ImageDecode`] if the data cannot be decoded.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        self.config.validate()?;
        let grayscale = crate::grayscale::decode_and_grayscale(&self.source)?;
        tracing::debug!(
            bytes = self.source.len(),
            dimensions = %Dimensions::of(&grayscale),
            "decoded source image"
        );
        Ok(Decoded {
            config: self.config,
            source_len: self.source.len(),
            grayscale,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding to 8-bit grayscale.
#[must_use = "pipeline stages are consumed by advancing; call .threshold() to continue"]
pub struct Decoded {
    config: SegmentConfig,
    source_len: usize,
    grayscale: GrayImage,
}

impl Decoded {
    /// The decoded grayscale image.
    #[must_use]
    pub const fn grayscale(&self) -> &GrayImage {
        &self.grayscale
    }

    /// Resolve the threshold level and binarize.
    pub fn threshold(self) -> Thresholded {
        let level = self.config.threshold.level(&self.grayscale);
        let mask = crate::threshold::binarize(&self.grayscale, level);
        tracing::debug!(threshold = %self.config.threshold, level, "binarized grayscale");
        Thresholded {
            config: self.config,
            grayscale: self.grayscale,
            level,
            mask,
        }
    }
}

// ─────────────────────── Stage 2: Thresholded ────────────────────────

/// Pipeline state after binarization.
#[must_use = "pipeline stages are consumed by advancing; call .distance_transform() to continue"]
pub struct Thresholded {
    config: SegmentConfig,
    grayscale: GrayImage,
    level: u8,
    mask: GrayImage,
}

impl Thresholded {
    /// The binary cell mask.
    #[must_use]
    pub const fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// The level the mask was cut at.
    #[must_use]
    pub const fn level(&self) -> u8 {
        self.level
    }

    /// Compute the Euclidean distance field of the mask.
    pub fn distance_transform(self) -> DistanceComputed {
        let distance = crate::distance::euclidean_distance_transform(&self.mask);
        DistanceComputed {
            config: self.config,
            grayscale: self.grayscale,
            level: self.level,
            mask: self.mask,
            distance,
        }
    }
}

// ───────────────────── Stage 3: DistanceComputed ─────────────────────

/// Pipeline state after the distance transform.
#[must_use = "pipeline stages are consumed by advancing; call .find_peaks() to continue"]
pub struct DistanceComputed {
    config: SegmentConfig,
    grayscale: GrayImage,
    level: u8,
    mask: GrayImage,
    distance: DistanceImage,
}

impl DistanceComputed {
    /// The distance field.
    #[must_use]
    pub const fn distance(&self) -> &DistanceImage {
        &self.distance
    }

    /// Detect seeds in the distance field and label them as markers.
    pub fn find_peaks(self) -> PeaksFound {
        let peaks = crate::peaks::find_peaks(&self.distance, self.config.min_distance);
        let markers = crate::markers::label_markers(&peaks.image);
        tracing::info!(centers = markers.count, "found centers");
        PeaksFound {
            config: self.config,
            grayscale: self.grayscale,
            level: self.level,
            mask: self.mask,
            distance: self.distance,
            peaks,
            markers,
        }
    }
}

// ──────────────────────── Stage 4: PeaksFound ────────────────────────

/// Pipeline state after seed detection and marker labeling.
#[must_use = "pipeline stages are consumed by advancing; call .flood() to continue"]
pub struct PeaksFound {
    config: SegmentConfig,
    grayscale: GrayImage,
    level: u8,
    mask: GrayImage,
    distance: DistanceImage,
    peaks: Peaks,
    markers: Markers,
}

impl PeaksFound {
    /// Binary image with 255 at each seed.
    #[must_use]
    pub const fn peaks(&self) -> &GrayImage {
        &self.peaks.image
    }

    /// Accepted seeds, strongest first.
    #[must_use]
    pub fn seeds(&self) -> &[Seed] {
        &self.peaks.seeds
    }

    /// Number of distinct markers.
    #[must_use]
    pub const fn marker_count(&self) -> u32 {
        self.markers.count
    }

    /// Flood the markers over the negated distance field.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DimensionMismatch`] if the intermediate
    /// rasters disagree in size, which indicates a bug upstream.
    pub fn flood(self) -> Result<Flooded, PipelineError> {
        let labels = crate::watershed::flood(
            &self.distance,
            &self.markers.labels,
            &self.mask,
            self.config.flood_options(),
        )?;
        let region_count = crate::markers::max_label(&labels);
        tracing::info!(regions = region_count, "flooded basins");
        Ok(Flooded {
            config: self.config,
            grayscale: self.grayscale,
            level: self.level,
            mask: self.mask,
            distance: self.distance,
            peaks: self.peaks,
            markers: self.markers,
            labels,
            region_count,
        })
    }
}

// ───────────────────────── Stage 5: Flooded ──────────────────────────

/// Pipeline state after watershed flooding.
#[must_use = "pipeline stages are consumed by advancing; call .separate() to continue"]
pub struct Flooded {
    config: SegmentConfig,
    grayscale: GrayImage,
    level: u8,
    mask: GrayImage,
    distance: DistanceImage,
    peaks: Peaks,
    markers: Markers,
    labels: LabelImage,
    region_count: u32,
}

impl Flooded {
    /// Region labels.
    #[must_use]
    pub const fn labels(&self) -> &LabelImage {
        &self.labels
    }

    /// Number of regions (the highest label).
    #[must_use]
    pub const fn region_count(&self) -> u32 {
        self.region_count
    }

    /// Compute watershed lines and erase them from the mask.
    pub fn separate(self) -> Separated {
        let lines = crate::boundary::watershed_lines(&self.labels);
        let result = crate::boundary::erase_lines(&self.mask, &lines);
        let cells =
            crate::regions::cells(&self.labels, self.region_count, &self.config.cell_filter);
        Separated {
            config: self.config,
            grayscale: self.grayscale,
            level: self.level,
            mask: self.mask,
            segmentation: Segmentation {
                distance: self.distance,
                peaks: self.peaks.image,
                seeds: self.peaks.seeds,
                markers: self.markers.labels,
                marker_count: self.markers.count,
                labels: self.labels,
                region_count: self.region_count,
                lines,
                result,
                cells,
            },
        }
    }
}

// ──────────────────────── Stage 6: Separated ─────────────────────────

/// Final pipeline state: the mask has been split along watershed lines.
#[must_use = "call .into_result() to extract the StagedResult"]
pub struct Separated {
    config: SegmentConfig,
    grayscale: GrayImage,
    level: u8,
    mask: GrayImage,
    segmentation: Segmentation,
}

impl Separated {
    /// The configuration this run used.
    #[must_use]
    pub const fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Watershed line mask.
    #[must_use]
    pub const fn lines(&self) -> &GrayImage {
        &self.segmentation.lines
    }

    /// The separated mask.
    #[must_use]
    pub const fn result(&self) -> &GrayImage {
        &self.segmentation.result
    }

    /// Consume the pipeline and return the full [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            dimensions: Dimensions::of(&self.grayscale),
            grayscale: self.grayscale,
            threshold_level: self.level,
            mask: self.mask,
            segmentation: self.segmentation,
        }
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 7;

/// The output produced by a single pipeline stage, borrowed from it.
#[must_use]
pub enum StageOutput<'a> {
    /// Source image bytes (not yet decoded).
    Source {
        /// The raw image bytes.
        bytes: &'a [u8],
    },
    /// Decoded grayscale image.
    Decoded {
        /// The grayscale image.
        grayscale: &'a GrayImage,
    },
    /// Binary mask.
    Thresholded {
        /// The mask.
        mask: &'a GrayImage,
        /// The level it was cut at.
        level: u8,
    },
    /// Distance field.
    DistanceComputed {
        /// The field.
        distance: &'a DistanceImage,
    },
    /// Seeds.
    PeaksFound {
        /// Binary seed image.
        peaks: &'a GrayImage,
        /// Accepted seeds.
        seeds: &'a [Seed],
    },
    /// Region labels.
    Flooded {
        /// The labels.
        labels: &'a LabelImage,
    },
    /// Watershed lines and the separated mask.
    Separated {
        /// Line mask.
        lines: &'a GrayImage,
        /// Separated mask.
        result: &'a GrayImage,
    },
}

/// Trait implemented by every pipeline stage, enabling uniform iteration.
///
/// ```rust
/// # use cellsplit_pipeline::{Pipeline, SegmentConfig, PipelineError};
/// # use cellsplit_pipeline::pipeline::{Stage, Advance};
/// # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
/// let mut stage: Stage = Pipeline::new(png, SegmentConfig::default()).into();
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => { stage = done; break; }
///     }
/// }
/// let result = stage.complete()?;
/// # Ok(())
/// # }
/// ```
pub trait PipelineStage: Sized {
    /// Short name of this stage (e.g. `"source"`, `"flood"`).
    const NAME: &str;

    /// Zero-based index of this stage.
    const INDEX: usize;

    /// The output this stage produced.
    fn output(&self) -> StageOutput<'_>;

    /// Metrics describing the work done to reach this state.
    fn metrics(&self) -> StageMetrics;

    /// Advance to the next stage, or `Ok(None)` at the final stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the stage transition fails.
    fn next(self) -> Result<Option<Stage>, PipelineError>;

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    fn complete(self) -> Result<StagedResult, PipelineError>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Source {
            bytes: &self.source,
        }
    }

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Source {
            input_bytes: self.source.len(),
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Decoded(self.decode()?)))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.decode()?.complete()
    }
}

impl PipelineStage for Decoded {
    const NAME: &str = "decode";
    const INDEX: usize = 1;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Decoded {
            grayscale: &self.grayscale,
        }
    }

    fn metrics(&self) -> StageMetrics {
        let dimensions = Dimensions::of(&self.grayscale);
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width: dimensions.width,
            height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Thresholded(self.threshold())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.threshold().complete()
    }
}

impl PipelineStage for Thresholded {
    const NAME: &str = "threshold";
    const INDEX: usize = 2;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Thresholded {
            mask: &self.mask,
            level: self.level,
        }
    }

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Threshold {
            mode: self.config.threshold.to_string(),
            level: self.level,
            foreground_pixel_count: count_foreground(&self.mask),
            total_pixel_count: Dimensions::of(&self.mask).pixel_count(),
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::DistanceComputed(self.distance_transform())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.distance_transform().complete()
    }
}

impl PipelineStage for DistanceComputed {
    const NAME: &str = "distance";
    const INDEX: usize = 3;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::DistanceComputed {
            distance: &self.distance,
        }
    }

    fn metrics(&self) -> StageMetrics {
        StageMetrics::DistanceTransform {
            max_distance: crate::distance::max_distance(&self.distance),
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::PeaksFound(self.find_peaks())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.find_peaks().complete()
    }
}

impl PipelineStage for PeaksFound {
    const NAME: &str = "peaks";
    const INDEX: usize = 4;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::PeaksFound {
            peaks: &self.peaks.image,
            seeds: &self.peaks.seeds,
        }
    }

    fn metrics(&self) -> StageMetrics {
        StageMetrics::PeakDetection {
            min_distance: self.config.min_distance,
            peak_count: self.peaks.seeds.len(),
            marker_count: self.markers.count,
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Flooded(self.flood()?)))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.flood()?.complete()
    }
}

impl PipelineStage for Flooded {
    const NAME: &str = "flood";
    const INDEX: usize = 5;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Flooded {
            labels: &self.labels,
        }
    }

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Flood {
            watershed_line: self.config.watershed_line,
            region_count: self.region_count,
            labeled_pixel_count: self.labels.pixels().map(|p| u64::from(p.0[0] > 0)).sum(),
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Separated(self.separate())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.separate().complete()
    }
}

impl PipelineStage for Separated {
    const NAME: &str = "separate";
    const INDEX: usize = 6;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Separated {
            lines: &self.segmentation.lines,
            result: &self.segmentation.result,
        }
    }

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Separation {
            line_pixel_count: count_foreground(&self.segmentation.lines),
            seam_pixel_count: self.segmentation.seam_pixel_count(&self.mask),
            result_pixel_count: count_foreground(&self.segmentation.result),
            cell_count: self.segmentation.cells.len(),
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(None)
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self.into_result())
    }
}

/// Enum wrapping all pipeline stages for uniform, loopable access.
#[must_use]
pub enum Stage {
    /// See [`Pending`].
    Pending(Pending),
    /// See [`Decoded`].
    Decoded(Decoded),
    /// See [`Thresholded`].
    Thresholded(Thresholded),
    /// See [`DistanceComputed`].
    DistanceComputed(DistanceComputed),
    /// See [`PeaksFound`].
    PeaksFound(PeaksFound),
    /// See [`Flooded`].
    Flooded(Flooded),
    /// See [`Separated`].
    Separated(Separated),
}

/// Compile-time guard: adding a [`Stage`] variant breaks this match,
/// a reminder to bump [`STAGE_COUNT`].
#[allow(dead_code, clippy::match_same_arms)]
const fn _stage_count_guard(s: &Stage) {
    match s {
        Stage::Pending(_)
        | Stage::Decoded(_)
        | Stage::Thresholded(_)
        | Stage::DistanceComputed(_)
        | Stage::PeaksFound(_)
        | Stage::Flooded(_)
        | Stage::Separated(_) => {}
    }
}

/// Result of [`Stage::advance`]: either the next stage or the final
/// stage returned unchanged.
#[must_use]
pub enum Advance {
    /// The pipeline advanced to this next stage.
    Next(Stage),
    /// The pipeline was already at the final stage.
    Complete(Stage),
}

/// Delegate a method call to whichever `Stage` variant is active.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Pending(s) => s.$method($($arg),*),
            Self::Decoded(s) => s.$method($($arg),*),
            Self::Thresholded(s) => s.$method($($arg),*),
            Self::DistanceComputed(s) => s.$method($($arg),*),
            Self::PeaksFound(s) => s.$method($($arg),*),
            Self::Flooded(s) => s.$method($($arg),*),
            Self::Separated(s) => s.$method($($arg),*),
        }
    };
}

impl Stage {
    /// Short name of the current stage.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current stage.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// The output this stage produced.
    pub fn output(&self) -> StageOutput<'_> {
        delegate!(self, output)
    }

    /// Stage-specific metrics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        delegate!(self, metrics)
    }

    /// Whether the pipeline is at the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Separated(_))
    }

    /// Advance to the next stage, consuming the final stage into
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn next(self) -> Result<Option<Self>, PipelineError> {
        delegate!(self, next)
    }

    /// Advance to the next stage, returning `self` unchanged if already
    /// complete.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn advance(self) -> Result<Advance, PipelineError> {
        if self.is_complete() {
            return Ok(Advance::Complete(self));
        }
        // Only the final stage returns None from next(), and it was
        // handled above.
        #[allow(clippy::unreachable)]
        let next = self
            .next()?
            .unwrap_or_else(|| unreachable!("non-final stage returned None from next()"));
        Ok(Advance::Next(next))
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<StagedResult, PipelineError> {
        delegate!(self, complete)
    }
}

// Lets the macro call `.name()` and `.index()` on `&self`; associated
// constants are not reachable through a value.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }
}

macro_rules! impl_from_stage {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Stage {
                fn from(s: $variant) -> Self {
                    Self::$variant(s)
                }
            }
        )*
    };
}

impl_from_stage!(
    Pending,
    Decoded,
    Thresholded,
    DistanceComputed,
    PeaksFound,
    Flooded,
    Separated,
);

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental segmentation pipeline.
///
/// Created via [`Pipeline::new`], which stores the source bytes and
/// config without doing any processing.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes and config.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: SegmentConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;
    use crate::testing::{encode_gray_png, two_disks};

    fn two_cells_png() -> Vec<u8> {
        encode_gray_png(&two_disks())
    }

    #[test]
    fn pending_exposes_source_bytes() {
        let png = two_cells_png();
        let expected_len = png.len();
        let pending = Pipeline::new(png, SegmentConfig::default());
        assert_eq!(pending.source().len(), expected_len);
    }

    #[test]
    fn decode_metrics_report_source_size() {
        let png = two_cells_png();
        let expected_len = png.len();
        let decoded = Pipeline::new(png, SegmentConfig::default())
            .decode()
            .unwrap();
        assert_eq!(
            decoded.metrics(),
            StageMetrics::Decode {
                input_bytes: expected_len,
                width: 32,
                height: 24,
                pixel_count: 32 * 24,
            }
        );
    }

    #[test]
    fn decode_empty_input_returns_error() {
        let result = Pipeline::new(vec![], SegmentConfig::default()).decode();
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn decode_corrupt_input_returns_error() {
        let result = Pipeline::new(vec![0xFF, 0x00], SegmentConfig::default()).decode();
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn decode_rejects_zero_min_distance() {
        let config = SegmentConfig {
            min_distance: 0,
            ..SegmentConfig::default()
        };
        let result = Pipeline::new(two_cells_png(), config).decode();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn threshold_uses_strict_level() {
        let gray = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 128 } else { 129 }]));
        let thresholded = Pipeline::new(encode_gray_png(&gray), SegmentConfig::default())
            .decode()
            .unwrap()
            .threshold();
        assert_eq!(thresholded.level(), 128);
        assert_eq!(thresholded.mask().as_raw(), &vec![0, 255]);
    }

    #[test]
    fn chained_stages_split_two_cells() {
        let flooded = Pipeline::new(two_cells_png(), SegmentConfig::default())
            .decode()
            .unwrap()
            .threshold()
            .distance_transform()
            .find_peaks()
            .flood()
            .unwrap();
        assert_eq!(flooded.region_count(), 2);

        let staged = flooded.separate().into_result();
        assert_eq!(staged.segmentation.region_count, 2);
        assert_eq!(staged.segmentation.marker_count, 2);
        assert!(staged.segmentation.seam_pixel_count(&staged.mask) > 0);
        assert_eq!(staged.dimensions, Dimensions::of(&staged.mask));
    }

    #[test]
    fn stage_names_and_indices() {
        assert_eq!(Pending::NAME, "source");
        assert_eq!(Pending::INDEX, 0);
        assert_eq!(Decoded::INDEX, 1);
        assert_eq!(Thresholded::INDEX, 2);
        assert_eq!(DistanceComputed::INDEX, 3);
        assert_eq!(PeaksFound::INDEX, 4);
        assert_eq!(Flooded::NAME, "flood");
        assert_eq!(Separated::INDEX, STAGE_COUNT - 1);
    }

    #[test]
    fn loop_to_completion_matches_chained_api() {
        let chained = Pipeline::new(two_cells_png(), SegmentConfig::default())
            .complete()
            .unwrap();

        let mut stage: Stage = Pipeline::new(two_cells_png(), SegmentConfig::default()).into();
        let mut visited = vec![stage.index()];
        loop {
            match stage.advance().unwrap() {
                Advance::Next(next) => {
                    visited.push(next.index());
                    stage = next;
                }
                Advance::Complete(done) => {
                    stage = done;
                    break;
                }
            }
        }
        assert_eq!(visited, (0..STAGE_COUNT).collect::<Vec<_>>());
        assert!(stage.is_complete());

        let looped = stage.complete().unwrap();
        assert_eq!(looped.segmentation.result, chained.segmentation.result);
        assert_eq!(looped.segmentation.labels, chained.segmentation.labels);
    }

    #[test]
    fn next_on_final_stage_returns_none() {
        let separated = Pipeline::new(two_cells_png(), SegmentConfig::default())
            .decode()
            .unwrap()
            .threshold()
            .distance_transform()
            .find_peaks()
            .flood()
            .unwrap()
            .separate();
        assert!(PipelineStage::next(separated).unwrap().is_none());
    }

    #[test]
    fn output_variant_matches_stage() {
        let stage: Stage = Pipeline::new(two_cells_png(), SegmentConfig::default()).into();
        assert!(matches!(stage.output(), StageOutput::Source { .. }));
        let stage = stage.next().unwrap().unwrap();
        assert!(matches!(stage.output(), StageOutput::Decoded { .. }));
        let stage = stage.next().unwrap().unwrap();
        assert!(matches!(stage.output(), StageOutput::Thresholded { level: 128, .. }));
        let stage = stage.next().unwrap().unwrap();
        assert!(matches!(stage.output(), StageOutput::DistanceComputed { .. }));
        let stage = stage.next().unwrap().unwrap();
        match stage.output() {
            StageOutput::PeaksFound { seeds, .. } => assert_eq!(seeds.len(), 2),
            _ => unreachable!("expected peaks output"),
        }
    }

    #[test]
    fn metrics_report_stage_counts() {
        let stage: Stage = Pipeline::new(two_cells_png(), SegmentConfig::default()).into();
        assert!(matches!(stage.metrics(), StageMetrics::Source { input_bytes } if input_bytes > 0));

        let peaks = Pipeline::new(two_cells_png(), SegmentConfig::default())
            .decode()
            .unwrap()
            .threshold()
            .distance_transform()
            .find_peaks();
        assert!(matches!(
            peaks.metrics(),
            StageMetrics::PeakDetection {
                min_distance: 6,
                peak_count: 2,
                marker_count: 2,
            }
        ));
    }

    #[test]
    fn decode_error_surfaces_through_advance() {
        let stage: Stage = Pipeline::new(vec![], SegmentConfig::default()).into();
        assert!(matches!(stage.advance(), Err(PipelineError::EmptyInput)));
    }
}
