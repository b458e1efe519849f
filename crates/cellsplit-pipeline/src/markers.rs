//! Marker labeling: one unique positive label per connected seed group.
//!
//! Wraps [`imageproc::region_labelling::connected_components`] with
//! 4-connectivity. Accepted seeds are always more than `min_distance`
//! apart, so in practice every seed becomes its own marker.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::types::{BACKGROUND, LabelImage};

/// Labeled seed groups.
#[derive(Debug, Clone)]
pub struct Markers {
    /// Marker labels, consecutive from 1; 0 is unlabeled.
    pub labels: LabelImage,
    /// Number of markers (the highest label).
    pub count: u32,
}

/// Label the connected groups of non-zero pixels in a peak image.
#[must_use = "returns the marker labels"]
pub fn label_markers(peaks: &GrayImage) -> Markers {
    let labels = connected_components(peaks, Connectivity::Four, Luma([BACKGROUND]));
    let count = max_label(&labels);
    Markers { labels, count }
}

/// Highest label in a label image, or 0 if nothing is labeled.
#[must_use]
pub fn max_label(labels: &LabelImage) -> u32 {
    labels.pixels().map(|p| p.0[0]).max().unwrap_or(0)
}
