//! Per-region measurements: pixel area, centroid, and whether the region
//! reaches the image border.
//!
//! A [`RegionFilter`] decides which flooded regions count as cells.
//! Regions that are too small are usually noise; regions that touch the
//! border are usually cells cut off by the field of view.

use serde::{Deserialize, Serialize};

use crate::types::{LabelImage, PipelineError};

/// Area and border limits for accepting a region as a cell.
///
/// The default accepts every region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionFilter {
    /// Reject regions with fewer pixels than this.
    pub min_area: Option<u64>,
    /// Reject regions with more pixels than this.
    pub max_area: Option<u64>,
    /// Reject regions with a pixel on the outermost row or column.
    pub exclude_border: bool,
}

impl RegionFilter {
    /// Check that the area bounds are ordered.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `min_area > max_area`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let (Some(min), Some(max)) = (self.min_area, self.max_area)
            && min > max
        {
            return Err(PipelineError::InvalidConfig(format!(
                "min_area ({min}) must not exceed max_area ({max})"
            )));
        }
        Ok(())
    }

    /// Whether `region` passes every configured limit.
    #[must_use]
    pub const fn accepts(&self, region: &RegionStats) -> bool {
        let too_small = matches!(self.min_area, Some(min) if region.area < min);
        let too_large = matches!(self.max_area, Some(max) if region.area > max);
        let on_border = self.exclude_border && region.touches_border;
        !(too_small || too_large || on_border)
    }
}

/// Measurements of one labeled region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    /// Region label (1-based).
    pub label: u32,
    /// Number of pixels carrying the label.
    pub area: u64,
    /// Mean column of the region's pixels.
    pub centroid_x: f64,
    /// Mean row of the region's pixels.
    pub centroid_y: f64,
    /// Whether any pixel lies on the first or last row or column.
    pub touches_border: bool,
}

#[derive(Default)]
struct Accumulator {
    area: u64,
    sum_x: u64,
    sum_y: u64,
    touches_border: bool,
}

/// Measure every label in `1..=region_count`, in label order.
///
/// Labels with no pixels are skipped; label 0 and labels above
/// `region_count` are ignored.
#[must_use]
pub fn region_stats(labels: &LabelImage, region_count: u32) -> Vec<RegionStats> {
    let (width, height) = labels.dimensions();
    let mut acc: Vec<Accumulator> = (0..region_count).map(|_| Accumulator::default()).collect();

    for (x, y, pixel) in labels.enumerate_pixels() {
        let Some(slot) = pixel.0[0]
            .checked_sub(1)
            .and_then(|i| acc.get_mut(i as usize))
        else {
            continue;
        };
        slot.area += 1;
        slot.sum_x += u64::from(x);
        slot.sum_y += u64::from(y);
        slot.touches_border |= x == 0 || y == 0 || x + 1 == width || y + 1 == height;
    }

    (1..=region_count)
        .zip(acc)
        .filter(|(_, a)| a.area > 0)
        .map(|(label, a)| {
            #[allow(clippy::cast_precision_loss)]
            let (area, sum_x, sum_y) = (a.area as f64, a.sum_x as f64, a.sum_y as f64);
            RegionStats {
                label,
                area: a.area,
                centroid_x: sum_x / area,
                centroid_y: sum_y / area,
                touches_border: a.touches_border,
            }
        })
        .collect()
}

/// Measure every region and keep the ones `filter` accepts.
#[must_use]
pub fn cells(labels: &LabelImage, region_count: u32, filter: &RegionFilter) -> Vec<RegionStats> {
    let all = region_stats(labels, region_count);
    let total = all.len();
    let kept: Vec<RegionStats> = all.into_iter().filter(|r| filter.accepts(r)).collect();
    tracing::debug!(regions = total, cells = kept.len(), "measured regions");
    kept
}
