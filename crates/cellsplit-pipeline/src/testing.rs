//! Shared fixtures for unit tests.

use image::{GrayImage, Luma};

use crate::types::{BACKGROUND, FOREGROUND};

/// Filled disks on a black background.
pub fn disks(width: u32, height: u32, centers: &[(i64, i64)], radius: i64) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let inside = centers.iter().any(|&(cx, cy)| {
            let dx = i64::from(x) - cx;
            let dy = i64::from(y) - cy;
            dx * dx + dy * dy <= radius * radius
        });
        Luma([if inside { FOREGROUND } else { BACKGROUND }])
    })
}

/// Two overlapping radius-8 disks, 12 px apart, in a 32x24 image.
pub fn two_disks() -> GrayImage {
    disks(32, 24, &[(10, 12), (22, 12)], 8)
}

/// Encode a grayscale image as PNG bytes.
#[allow(clippy::unwrap_used)]
pub fn encode_gray_png(image: &GrayImage) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::L8,
    )
    .unwrap();
    buf
}
