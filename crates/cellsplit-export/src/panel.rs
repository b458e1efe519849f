//! Six-panel diagnostic figure.
//!
//! Panels are laid out on a white canvas in a 2x3 grid with a
//! [`GUTTER`]-pixel margin around and between them, each at the source
//! resolution:
//!
//! | | column 0 | column 1 | column 2 |
//! |---|---|---|---|
//! | row 0 | binary mask | distance field (hot) | peaks |
//! | row 1 | region labels (spectral) | watershed lines | result |
//!
//! No text is drawn; the panel order is fixed.

use cellsplit_pipeline::{DistanceImage, LabelImage, StagedResult};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_cross_mut;

/// Margin around and between panels, in pixels.
pub const GUTTER: u32 = 8;

const CANVAS: Rgb<u8> = Rgb([255, 255, 255]);
const UNLABELED: Rgb<u8> = Rgb([0, 0, 0]);

/// Compose the diagnostic figure for one pipeline run.
///
/// The canvas is `3w + 4g` pixels wide and `2h + 3g` high, where `w x h`
/// is the source size and `g` is [`GUTTER`].
#[must_use]
pub fn render_panels(staged: &StagedResult) -> RgbImage {
    let seg = &staged.segmentation;
    let (w, h) = (staged.dimensions.width, staged.dimensions.height);

    let mut peaks = gray_to_rgb(&seg.peaks);
    for seed in &seg.seeds {
        #[allow(clippy::cast_possible_wrap)]
        let (x, y) = (seed.x as i32, seed.y as i32);
        draw_cross_mut(&mut peaks, Rgb([255, 255, 255]), x, y);
    }

    let panels = [
        gray_to_rgb(&staged.mask),
        distance_heatmap(&seg.distance),
        peaks,
        label_colors(&seg.labels, seg.region_count),
        gray_to_rgb(&seg.lines),
        gray_to_rgb(&seg.result),
    ];

    let mut canvas = RgbImage::from_pixel(3 * w + 4 * GUTTER, 2 * h + 3 * GUTTER, CANVAS);
    for (i, panel) in (0_u32..).zip(&panels) {
        let (col, row) = (i % 3, i / 3);
        let x = GUTTER + col * (w + GUTTER);
        let y = GUTTER + row * (h + GUTTER);
        image::imageops::replace(&mut canvas, panel, i64::from(x), i64::from(y));
    }
    canvas
}

fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(gray.clone()).to_rgb8()
}

/// Color a distance field with the "hot" map (black, red, yellow,
/// white), normalized to the field's maximum.
#[must_use]
pub fn distance_heatmap(field: &DistanceImage) -> RgbImage {
    let max = cellsplit_pipeline::distance::max_distance(field);
    RgbImage::from_fn(field.width(), field.height(), |x, y| {
        let t = if max > 0.0 {
            field.get_pixel(x, y).0[0] / max
        } else {
            0.0
        };
        hot(t)
    })
}

fn hot(t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let r = (t / 0.375).min(1.0);
    let g = ((t - 0.375) / 0.375).clamp(0.0, 1.0);
    let b = ((t - 0.75) / 0.25).clamp(0.0, 1.0);
    Rgb([channel(r), channel(g), channel(b)])
}

/// Color every region with a distinct hue; label 0 is black.
#[must_use]
pub fn label_colors(labels: &LabelImage, region_count: u32) -> RgbImage {
    let palette: Vec<Rgb<u8>> = (0..region_count).map(spectral).collect();
    RgbImage::from_fn(labels.width(), labels.height(), |x, y| {
        let label = labels.get_pixel(x, y).0[0];
        label
            .checked_sub(1)
            .and_then(|i| palette.get(i as usize))
            .copied()
            .unwrap_or(UNLABELED)
    })
}

/// Hue for the `i`-th region, stepping by the golden angle so that
/// consecutive labels land far apart on the color wheel.
fn spectral(i: u32) -> Rgb<u8> {
    const GOLDEN_ANGLE: f64 = 137.507_764;
    let hue = (f64::from(i) * GOLDEN_ANGLE) % 360.0;
    hsv(hue, 0.75, 0.95)
}

fn hsv(hue: f64, saturation: f64, value: f64) -> Rgb<u8> {
    let c = value * saturation;
    let sector = hue / 60.0;
    let x = c * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector {
        s if s < 1.0 => (c, x, 0.0),
        s if s < 2.0 => (x, c, 0.0),
        s if s < 3.0 => (0.0, c, x),
        s if s < 4.0 => (0.0, x, c),
        s if s < 5.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    Rgb([channel(r + m), channel(g + m), channel(b + m)])
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
