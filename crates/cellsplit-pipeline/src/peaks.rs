//! Seed detection: local maxima of the distance field with a minimum
//! pairwise separation.
//!
//! A pixel is a candidate when it equals the maximum of the
//! `(2 * min_distance + 1)` square window centred on it and is strictly
//! above the field minimum (so background never qualifies when present).
//! Candidates are then accepted strongest first, ties broken in
//! row-major order; a candidate within Chebyshev distance `min_distance`
//! of an accepted peak is suppressed. Border pixels are eligible.
//!
//! On equal values the first pixel in raster order wins. scikit-image's
//! `peak_local_max` keeps the last one instead, so plateau seeds can sit
//! one pixel apart from it.

use image::{GrayImage, Luma};

use crate::types::{DistanceImage, FOREGROUND, Seed};

/// Accepted seeds and their binary image.
#[derive(Debug, Clone)]
pub struct Peaks {
    /// 255 at every accepted seed, 0 elsewhere.
    pub image: GrayImage,
    /// Accepted seeds, strongest first.
    pub seeds: Vec<Seed>,
}

/// Find seed pixels in `field`, keeping them at least
/// `min_distance + 1` pixels apart (Chebyshev).
#[must_use = "returns the detected peaks"]
pub fn find_peaks(field: &DistanceImage, min_distance: u32) -> Peaks {
    let (width, height) = field.dimensions();
    let mut image = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return Peaks {
            image,
            seeds: Vec::new(),
        };
    }

    let (w, h) = crate::grid::extent(width, height);
    let radius = min_distance as usize;
    let values = field.as_raw();
    let floor = values.iter().copied().fold(f64::INFINITY, f64::min);
    let window_max = sliding_max(values, w, h, radius);

    let mut candidates: Vec<usize> = (0..values.len())
        .filter(|&i| values[i] > floor && values[i] >= window_max[i])
        .collect();
    candidates.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));

    let mut suppressed = vec![false; values.len()];
    let mut seeds = Vec::new();
    for index in candidates {
        if suppressed[index] {
            continue;
        }
        let (x, y) = (index % w, index / w);
        for sy in y.saturating_sub(radius)..=(y + radius).min(h - 1) {
            for sx in x.saturating_sub(radius)..=(x + radius).min(w - 1) {
                suppressed[sy * w + sx] = true;
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let (x, y) = (x as u32, y as u32);
        image.put_pixel(x, y, Luma([FOREGROUND]));
        seeds.push(Seed {
            x,
            y,
            distance: values[index],
        });
    }

    tracing::debug!(
        min_distance,
        seeds = seeds.len(),
        "peak detection finished"
    );
    Peaks { image, seeds }
}

/// Maximum over the `(2 * radius + 1)` square window around each pixel,
/// clipped at the grid edges. Computed as a row pass then a column pass.
fn sliding_max(values: &[f64], width: usize, height: usize, radius: usize) -> Vec<f64> {
    let mut rows = vec![f64::NEG_INFINITY; values.len()];
    for y in 0..height {
        let row = &values[y * width..(y + 1) * width];
        for x in 0..width {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(width - 1);
            rows[y * width + x] = row[lo..=hi].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        }
    }

    let mut out = vec![f64::NEG_INFINITY; values.len()];
    for x in 0..width {
        for y in 0..height {
            let lo = y.saturating_sub(radius);
            let hi = (y + radius).min(height - 1);
            out[y * width + x] = (lo..=hi)
                .map(|yy| rows[yy * width + x])
                .fold(f64::NEG_INFINITY, f64::max);
        }
    }
    out
}
