//! Exact Euclidean distance transform of a binary mask.
//!
//! Wraps [`imageproc::distance_transform::euclidean_squared_distance_transform`],
//! which measures distance to the nearest non-zero pixel. The mask is
//! inverted first so that background pixels become the sources and every
//! cell pixel gets its distance to the nearest background pixel.

use image::{GrayImage, Luma};
use imageproc::distance_transform::euclidean_squared_distance_transform;

use crate::types::{BACKGROUND, DistanceImage, FOREGROUND, is_foreground};

/// Compute the distance from every foreground pixel to the nearest
/// background pixel. Background pixels are 0.
///
/// A mask without any background pixel is measured against the image
/// exterior, as if the image were framed by a one-pixel background
/// border. Empty masks produce an empty field.
#[must_use = "returns the distance field"]
pub fn euclidean_distance_transform(mask: &GrayImage) -> DistanceImage {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return DistanceImage::new(width, height);
    }

    if mask.pixels().all(|p| is_foreground(p.0[0])) {
        return framed_distance(width, height);
    }

    let sources = GrayImage::from_fn(width, height, |x, y| {
        if is_foreground(mask.get_pixel(x, y).0[0]) {
            Luma([BACKGROUND])
        } else {
            Luma([FOREGROUND])
        }
    });
    let squared = euclidean_squared_distance_transform(&sources);
    DistanceImage::from_fn(width, height, |x, y| {
        Luma([squared.get_pixel(x, y).0[0].sqrt()])
    })
}

/// Distance field of an all-foreground mask surrounded by background.
fn framed_distance(width: u32, height: u32) -> DistanceImage {
    let framed = GrayImage::from_fn(width + 2, height + 2, |x, y| {
        let inside = x > 0 && y > 0 && x <= width && y <= height;
        Luma([if inside { FOREGROUND } else { BACKGROUND }])
    });
    let field = euclidean_distance_transform(&framed);
    DistanceImage::from_fn(width, height, |x, y| *field.get_pixel(x + 1, y + 1))
}

/// Largest value in the field, or 0 for an empty field.
#[must_use]
pub fn max_distance(field: &DistanceImage) -> f64 {
    field.pixels().map(|p| p.0[0]).fold(0.0, f64::max)
}
