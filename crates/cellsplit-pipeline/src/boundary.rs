//! Watershed lines and cell separation.
//!
//! A pixel is on a watershed line when one of its 4-neighbours carries a
//! positive label different from its own. This is the union, over all
//! regions, of the region's 4-connected one-pixel dilation minus the
//! region itself. Lines are erased from the mask to split touching cells.

use image::{GrayImage, Luma};

use crate::types::{BACKGROUND, FOREGROUND, LabelImage, is_foreground};

/// Mark every pixel adjacent to a region it does not belong to.
#[must_use = "returns the watershed line mask"]
pub fn watershed_lines(labels: &LabelImage) -> GrayImage {
    let (width, height) = labels.dimensions();
    let (w, h) = crate::grid::extent(width, height);
    let raw = labels.as_raw();
    let lines: Vec<u8> = (0..raw.len())
        .map(|index| {
            let own = raw[index];
            let on_line = crate::grid::neighbors4(index, w, h).any(|n| {
                let other = raw[n];
                other > 0 && other != own
            });
            if on_line { FOREGROUND } else { BACKGROUND }
        })
        .collect();
    GrayImage::from_raw(width, height, lines).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Clear every line pixel from `mask`.
#[must_use = "returns the separated mask"]
pub fn erase_lines(mask: &GrayImage, lines: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let keep = is_foreground(mask.get_pixel(x, y).0[0])
            && !lines
                .get_pixel_checked(x, y)
                .is_some_and(|p| is_foreground(p.0[0]));
        Luma([if keep { FOREGROUND } else { BACKGROUND }])
    })
}

/// Number of line pixels that fall inside the mask (the erased seam).
#[must_use]
pub fn count_seam_pixels(mask: &GrayImage, lines: &GrayImage) -> u64 {
    mask.as_raw()
        .iter()
        .zip(lines.as_raw())
        .map(|(&m, &l)| u64::from(is_foreground(m) && is_foreground(l)))
        .sum()
}
