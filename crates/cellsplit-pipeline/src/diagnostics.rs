//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! [`process_with_diagnostics`] drives the [`Pipeline`] stage by stage,
//! timing each transition through a caller-supplied [`Clock`] and
//! collecting the stage's [`StageMetrics`].
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::pipeline::{Pipeline, PipelineStage};
use crate::types::{PipelineError, SegmentConfig, StagedResult, is_foreground};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of time for stage measurements.
///
/// The library never reads the system clock itself; binaries pass a
/// clock backed by [`std::time::Instant`] and tests pass a fake one.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: image decoding and grayscale conversion.
    pub decode: StageDiagnostics,
    /// Stage 2: binarization.
    pub threshold: StageDiagnostics,
    /// Stage 3: Euclidean distance transform.
    pub distance_transform: StageDiagnostics,
    /// Stage 4: seed detection and marker labeling.
    pub peak_detection: StageDiagnostics,
    /// Stage 5: watershed flooding.
    pub flood: StageDiagnostics,
    /// Stage 6: watershed lines and separation.
    pub separation: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Source bytes before decoding.
    Source {
        /// Size of the input image bytes.
        input_bytes: usize,
    },
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Binarization metrics.
    Threshold {
        /// How the level was chosen (`fixed(N)` or `otsu`).
        mode: String,
        /// Level actually applied.
        level: u8,
        /// Pixels strictly above the level.
        foreground_pixel_count: u64,
        /// Total pixel count for computing coverage.
        total_pixel_count: u64,
    },
    /// Distance transform metrics.
    DistanceTransform {
        /// Largest distance in the field (radius of the fattest cell).
        max_distance: f64,
    },
    /// Seed detection metrics.
    PeakDetection {
        /// Seed separation used.
        min_distance: u32,
        /// Accepted seeds.
        peak_count: usize,
        /// Connected seed groups (`num_peaks`).
        marker_count: u32,
    },
    /// Flooding metrics.
    Flood {
        /// Whether line pixels were left unassigned.
        watershed_line: bool,
        /// Highest region label.
        region_count: u32,
        /// Pixels assigned to some region.
        labeled_pixel_count: u64,
    },
    /// Separation metrics.
    Separation {
        /// Pixels on any watershed line, inside or outside the mask.
        line_pixel_count: u64,
        /// Line pixels that were foreground, i.e. actually erased.
        seam_pixel_count: u64,
        /// Foreground pixels left in the result.
        result_pixel_count: u64,
        /// Regions accepted by the cell filter.
        cell_count: usize,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of seeds found.
    pub peak_count: usize,
    /// Number of separated regions.
    pub region_count: u32,
    /// Number of mask pixels erased along watershed lines.
    pub seam_pixel_count: u64,
    /// Number of regions accepted by the cell filter.
    pub cell_count: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Seeds: {}  |  Regions: {}  |  Cells: {}  |  Seam pixels: {}",
            self.summary.peak_count,
            self.summary.region_count,
            self.summary.cell_count,
            self.summary.seam_pixel_count,
        ));

        lines.join("\n")
    }

    /// Per-stage diagnostics in pipeline order, with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 6] {
        [
            ("Decode", &self.decode),
            ("Threshold", &self.threshold),
            ("Distance Transform", &self.distance_transform),
            ("Peak Detection", &self.peak_detection),
            ("Flood", &self.flood),
            ("Separation", &self.separation),
        ]
    }
}

/// Run the full pipeline, collecting per-stage timing and metrics.
///
/// # Errors
///
/// Returns the same errors as [`crate::process`].
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &SegmentConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let total_start = clock.now();

    let start = clock.now();
    let decoded = Pipeline::new(image_bytes.to_vec(), *config).decode()?;
    let decode = measure(clock, &start, &decoded);

    let start = clock.now();
    let thresholded = decoded.threshold();
    let threshold = measure(clock, &start, &thresholded);

    let start = clock.now();
    let distance = thresholded.distance_transform();
    let distance_transform = measure(clock, &start, &distance);

    let start = clock.now();
    let peaks = distance.find_peaks();
    let peak_detection = measure(clock, &start, &peaks);

    let start = clock.now();
    let flooded = peaks.flood()?;
    let flood = measure(clock, &start, &flooded);

    let start = clock.now();
    let separated = flooded.separate();
    let separation = measure(clock, &start, &separated);

    let staged = separated.into_result();
    let total_duration = clock.elapsed(&total_start);

    let dimensions = staged.dimensions;
    let summary = PipelineSummary {
        image_width: dimensions.width,
        image_height: dimensions.height,
        pixel_count: dimensions.pixel_count(),
        peak_count: staged.segmentation.seeds.len(),
        region_count: staged.segmentation.region_count,
        seam_pixel_count: staged.segmentation.seam_pixel_count(&staged.mask),
        cell_count: staged.segmentation.cells.len(),
    };

    let diagnostics = PipelineDiagnostics {
        decode,
        threshold,
        distance_transform,
        peak_detection,
        flood,
        separation,
        total_duration,
        summary,
    };
    Ok((staged, diagnostics))
}

fn measure<C: Clock, S: PipelineStage>(clock: &C, start: &C::Instant, stage: &S) -> StageDiagnostics {
    let duration = clock.elapsed(start);
    tracing::debug!(stage = S::NAME, ?duration, "stage finished");
    StageDiagnostics {
        duration,
        metrics: stage.metrics(),
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Source { input_bytes } => format!("{input_bytes} bytes"),
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Threshold {
            mode,
            level,
            foreground_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let coverage = if *total_pixel_count > 0 {
                *foreground_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("{mode} level={level} fg={foreground_pixel_count} ({coverage:.1}%)")
        }
        StageMetrics::DistanceTransform { max_distance } => format!("max={max_distance:.2}px"),
        StageMetrics::PeakDetection {
            min_distance,
            peak_count,
            marker_count,
        } => format!("min_distance={min_distance} peaks={peak_count} markers={marker_count}"),
        StageMetrics::Flood {
            watershed_line,
            region_count,
            labeled_pixel_count,
        } => {
            let mode = if *watershed_line { " (lines)" } else { "" };
            format!("{region_count} regions, {labeled_pixel_count} px labeled{mode}")
        }
        StageMetrics::Separation {
            line_pixel_count,
            seam_pixel_count,
            result_pixel_count,
            cell_count,
        } => format!(
            "lines={line_pixel_count} seam={seam_pixel_count} \
             remaining={result_pixel_count} cells={cell_count}"
        ),
    }
}

/// Count foreground (non-zero) pixels in a mask.
pub(crate) fn count_foreground(image: &GrayImage) -> u64 {
    image
        .pixels()
        .map(|p| u64::from(is_foreground(p.0[0])))
        .sum()
}
