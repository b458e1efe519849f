//! Seed overlay: a red diagonal cross on every detected cell center.

use cellsplit_pipeline::Seed;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

/// Length of each cross diagonal in pixels.
pub const DEFAULT_CROSS_SIZE: u32 = 20;

const RED: Rgb<u8> = Rgb([255, 0, 0]);

/// Draw an `X` of `size` pixels per diagonal, centered on each seed,
/// over a color copy of `gray`. Crosses are clipped at the image edge.
#[must_use]
pub fn draw_seed_crosses(gray: &GrayImage, seeds: &[Seed], size: u32) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8(gray.clone()).to_rgb8();
    if size == 0 {
        return canvas;
    }

    #[allow(clippy::cast_precision_loss)]
    let (half, span) = ((size / 2) as f32, (size - 1) as f32);
    for seed in seeds {
        #[allow(clippy::cast_precision_loss)]
        let (x, y) = (seed.x as f32, seed.y as f32);
        let (left, top) = (x - half, y - half);
        draw_line_segment_mut(&mut canvas, (left, top), (left + span, top + span), RED);
        let right = x + half;
        draw_line_segment_mut(&mut canvas, (right, top), (right - span, top + span), RED);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    fn seed(x: u32, y: u32) -> Seed {
        Seed {
            x,
            y,
            distance: 1.0,
        }
    }

    #[test]
    fn cross_is_centered_on_seed() {
        let gray = GrayImage::from_pixel(40, 40, Luma([100]));
        let out = draw_seed_crosses(&gray, &[seed(20, 20)], DEFAULT_CROSS_SIZE);
        assert_eq!(out.get_pixel(20, 20), &RED);
        assert_eq!(out.get_pixel(17, 17), &RED);
        assert_eq!(out.get_pixel(23, 17), &RED);
        assert_eq!(out.get_pixel(21, 20), &Rgb([100, 100, 100]));
    }

    #[test]
    fn crosses_clip_at_the_border() {
        let gray = GrayImage::new(8, 8);
        let out = draw_seed_crosses(&gray, &[seed(0, 0), seed(7, 7)], DEFAULT_CROSS_SIZE);
        assert_eq!(out.dimensions(), (8, 8));
        assert_eq!(out.get_pixel(0, 0), &RED);
        assert_eq!(out.get_pixel(7, 7), &RED);
    }

    #[test]
    fn no_seeds_is_a_color_copy() {
        let gray = GrayImage::from_pixel(3, 3, Luma([42]));
        let out = draw_seed_crosses(&gray, &[], DEFAULT_CROSS_SIZE);
        assert!(out.pixels().all(|p| *p == Rgb([42, 42, 42])));
    }
}
