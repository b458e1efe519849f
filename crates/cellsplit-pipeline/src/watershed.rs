//! Marker-controlled watershed flooding.
//!
//! Basins grow from the markers over the negated distance field, so
//! flooding starts on the ridge at the center of each cell and moves
//! outward to the cell edges. The queue is ordered by (negated distance,
//! insertion age): among equal levels the oldest entry is expanded first.
//! Neighbours are 4-connected and pixels outside the mask are never
//! assigned.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, DistanceImage, LabelImage, PipelineError, is_foreground};

/// Flooding behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodOptions {
    /// When set, a pixel that already touches a different basin when it
    /// is reached stays unassigned (label 0) and is not expanded, leaving
    /// a one-pixel line between basins.
    pub watershed_line: bool,
}

/// Temporary label for line pixels while flooding.
const LINE: u32 = u32::MAX;

/// Heap entry. `BinaryHeap` is a max-heap, so `Ord` is reversed to pop
/// the lowest level (highest distance) and then the oldest entry.
#[derive(Debug, Clone, Copy)]
struct FloodEntry {
    level: f64,
    age: u64,
    index: usize,
}

impl Ord for FloodEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .level
            .total_cmp(&self.level)
            .then_with(|| other.age.cmp(&self.age))
    }
}

impl PartialOrd for FloodEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FloodEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloodEntry {}

/// Flood `markers` over `-distance`, restricted to `mask`.
///
/// Markers lying outside the mask are dropped. Mask pixels not connected
/// to any marker stay 0.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if the three rasters do
/// not share the same dimensions.
pub fn flood(
    distance: &DistanceImage,
    markers: &LabelImage,
    mask: &GrayImage,
    options: FloodOptions,
) -> Result<LabelImage, PipelineError> {
    let expected = Dimensions::of(mask);
    for actual in [Dimensions::of(distance), Dimensions::of(markers)] {
        if actual != expected {
            return Err(PipelineError::DimensionMismatch { expected, actual });
        }
    }

    let (w, h) = crate::grid::extent(expected.width, expected.height);
    let levels = distance.as_raw();
    let seeds = markers.as_raw();
    let inside = mask.as_raw();
    let mut out = vec![0_u32; w * h];
    let mut heap = BinaryHeap::new();
    let mut age: u64 = 0;

    for (index, &label) in seeds.iter().enumerate() {
        if label > 0 && is_foreground(inside[index]) {
            out[index] = label;
            heap.push(FloodEntry {
                level: -levels[index],
                age,
                index,
            });
            age += 1;
        }
    }

    while let Some(entry) = heap.pop() {
        let label = out[entry.index];
        for next in crate::grid::neighbors4(entry.index, w, h) {
            if out[next] != 0 || !is_foreground(inside[next]) {
                continue;
            }
            if options.watershed_line && touches_other_basin(&out, next, label, w, h) {
                out[next] = LINE;
                continue;
            }
            out[next] = label;
            heap.push(FloodEntry {
                level: -levels[next],
                age,
                index: next,
            });
            age += 1;
        }
    }

    for value in &mut out {
        if *value == LINE {
            *value = 0;
        }
    }

    tracing::debug!(
        pushed = age,
        watershed_line = options.watershed_line,
        "flooding finished"
    );
    Ok(LabelImage::from_fn(expected.width, expected.height, |x, y| {
        Luma([out[y as usize * w + x as usize]])
    }))
}

fn touches_other_basin(out: &[u32], index: usize, label: u32, w: usize, h: usize) -> bool {
    crate::grid::neighbors4(index, w, h).any(|n| {
        let other = out[n];
        other != 0 && other != LINE && other != label
    })
}
