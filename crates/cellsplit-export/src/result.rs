//! Single-channel result image.

use cellsplit_pipeline::types::{BACKGROUND, FOREGROUND, is_foreground};
use image::{GrayImage, Luma};

/// Normalize a separated mask to 255 (cell) / 0 (background or
/// boundary), the format written to the result file.
#[must_use]
pub fn result_image(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if is_foreground(mask.get_pixel(x, y).0[0]) {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}
