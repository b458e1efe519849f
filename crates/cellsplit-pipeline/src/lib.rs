//! cellsplit-pipeline: Pure watershed cell separation (sans-IO).
//!
//! Splits touching cell blobs in a binary image through:
//! threshold -> distance transform -> peak detection -> marker labeling ->
//! watershed flooding -> watershed lines -> separated mask.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! byte slices and rasters and returns structured data. File handling
//! lives in the `cellsplit` binary.

pub mod boundary;
pub mod diagnostics;
pub mod distance;
pub mod grayscale;
mod grid;
pub mod markers;
pub mod peaks;
pub mod pipeline;
pub mod regions;
pub mod threshold;
pub mod types;
pub mod watershed;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::Pipeline;
pub use regions::{RegionFilter, RegionStats};
pub use threshold::Threshold;
pub use types::{
    Dimensions, DistanceImage, GrayImage, LabelImage, PipelineError, RgbImage, Seed,
    SegmentConfig, Segmentation, StagedResult,
};
pub use watershed::FloodOptions;

/// Separate touching cells in a binary mask.
///
/// Any non-zero mask pixel is foreground. Empty and all-background masks
/// are not errors: they produce zero regions and an all-background
/// result.
///
/// # Steps
///
/// 1. Euclidean distance transform (distance to nearest background)
/// 2. Peak detection with `config.min_distance` separation
/// 3. Connected-component labeling of the peaks into markers
/// 4. Marker-controlled watershed over the negated distance field
/// 5. Watershed lines (4-connected outer border of every region)
/// 6. Erase the lines from the mask
/// 7. Measure every region and keep those `config.cell_filter` accepts
///
/// `config.threshold` is not used here; the mask is taken as-is.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config.min_distance` is 0.
pub fn segment(mask: &GrayImage, config: &SegmentConfig) -> Result<Segmentation, PipelineError> {
    config.validate()?;

    let distance = distance::euclidean_distance_transform(mask);
    let peaks = peaks::find_peaks(&distance, config.min_distance);
    let markers = markers::label_markers(&peaks.image);
    tracing::info!(centers = markers.count, "found centers");

    let labels = watershed::flood(&distance, &markers.labels, mask, config.flood_options())?;
    let region_count = markers::max_label(&labels);
    let lines = boundary::watershed_lines(&labels);
    let result = boundary::erase_lines(mask, &lines);
    let cells = regions::cells(&labels, region_count, &config.cell_filter);
    tracing::info!(regions = region_count, cells = cells.len(), "separated mask");

    Ok(Segmentation {
        distance,
        peaks: peaks.image,
        seeds: peaks.seeds,
        markers: markers.labels,
        marker_count: markers.count,
        labels,
        region_count,
        lines,
        result,
        cells,
    })
}

/// Run the whole pipeline from encoded image bytes, keeping every
/// intermediate.
///
/// Equivalent to driving [`Pipeline`] through all of its stages.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for a rejected config,
/// [`PipelineError::EmptyInput`] if `image_bytes` is empty, and
/// [`PipelineError::ImageDecode`] if the image cannot be decoded.
pub fn process(image_bytes: &[u8], config: &SegmentConfig) -> Result<StagedResult, PipelineError> {
    pipeline::PipelineStage::complete(Pipeline::new(image_bytes.to_vec(), *config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::testing::{disks, encode_gray_png, two_disks};
    use crate::types::{BACKGROUND, FOREGROUND, is_foreground};

    fn is_subset(inner: &GrayImage, outer: &GrayImage) -> bool {
        inner
            .pixels()
            .zip(outer.pixels())
            .all(|(a, b)| !is_foreground(a.0[0]) || is_foreground(b.0[0]))
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &SegmentConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], &SegmentConfig::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_matches_segment_on_mask() {
        let mask = two_disks();
        let staged = process(&encode_gray_png(&mask), &SegmentConfig::default()).unwrap();
        let direct = segment(&mask, &SegmentConfig::default()).unwrap();
        assert_eq!(staged.mask, mask);
        assert_eq!(staged.segmentation.result, direct.result);
        assert_eq!(staged.segmentation.region_count, direct.region_count);
    }

    #[test]
    fn two_touching_disks_are_split() {
        let mask = two_disks();
        let seg = segment(&mask, &SegmentConfig::default()).unwrap();
        assert_eq!(seg.region_count, 2);
        assert_eq!(seg.marker_count, 2);
        assert!(is_subset(&seg.result, &mask));
        assert!(seg.seam_pixel_count(&mask) > 0);
        // The neck between the disks is cut.
        assert_eq!(seg.result.get_pixel(16, 12).0[0], BACKGROUND);
    }

    #[test]
    fn two_disks_are_measured_as_cells() {
        let mask = two_disks();
        let seg = segment(&mask, &SegmentConfig::default()).unwrap();
        assert_eq!(seg.cells.len(), 2);

        let total: u64 = seg.cells.iter().map(|c| c.area).sum();
        let foreground = mask.pixels().filter(|p| is_foreground(p.0[0])).count();
        assert_eq!(total, foreground as u64);

        let (left, right) = (&seg.cells[0], &seg.cells[1]);
        assert!(left.centroid_x < 16.0 && right.centroid_x > 16.0);
        assert!((left.centroid_y - 12.0).abs() < 0.5);
        assert!((right.centroid_y - 12.0).abs() < 0.5);
        assert!(!left.touches_border && !right.touches_border);
    }

    #[test]
    fn single_disk_is_untouched() {
        let mask = disks(24, 24, &[(12, 12)], 8);
        let seg = segment(&mask, &SegmentConfig::default()).unwrap();
        assert_eq!(seg.region_count, 1);
        assert_eq!(seg.result, mask);
        assert_eq!(seg.seam_pixel_count(&mask), 0);
    }

    #[test]
    fn all_background_has_no_regions() {
        let mask = GrayImage::new(10, 10);
        let seg = segment(&mask, &SegmentConfig::default()).unwrap();
        assert_eq!(seg.region_count, 0);
        assert!(seg.seeds.is_empty());
        assert!(seg.result.pixels().all(|p| p.0[0] == BACKGROUND));
    }

    #[test]
    fn empty_mask_is_not_an_error() {
        let seg = segment(&GrayImage::new(0, 0), &SegmentConfig::default()).unwrap();
        assert_eq!(seg.region_count, 0);
        assert_eq!(seg.result.dimensions(), (0, 0));
    }

    #[test]
    fn all_foreground_mask_is_one_region() {
        let mask = GrayImage::from_pixel(9, 9, Luma([FOREGROUND]));
        let seg = segment(&mask, &SegmentConfig::default()).unwrap();
        assert_eq!(seg.region_count, 1);
        assert_eq!(seg.result, mask);
    }

    #[test]
    fn watershed_line_mode_cuts_neck() {
        let mask = two_disks();
        let config = SegmentConfig {
            watershed_line: true,
            ..SegmentConfig::default()
        };
        let seg = segment(&mask, &config).unwrap();
        assert_eq!(seg.region_count, 2);
        assert!(is_subset(&seg.result, &mask));
        let unassigned = seg
            .labels
            .enumerate_pixels()
            .filter(|&(x, y, p)| p.0[0] == 0 && is_foreground(mask.get_pixel(x, y).0[0]))
            .count();
        assert!(unassigned > 0, "expected line pixels left at label 0");
    }

    #[test]
    fn zero_min_distance_is_rejected() {
        let config = SegmentConfig {
            min_distance: 0,
            ..SegmentConfig::default()
        };
        assert!(matches!(
            segment(&two_disks(), &config),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
