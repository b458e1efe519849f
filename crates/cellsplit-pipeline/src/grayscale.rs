//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces a
//! single-channel 8-bit image ready for binarization. Fully transparent
//! pixels become black, so a mask drawn on a transparent canvas keeps
//! its background.

use image::{GrayImage, Luma};

use crate::types::{BACKGROUND, PipelineError};

/// Decode raw image bytes and convert to grayscale.
///
/// Color inputs are reduced with the standard luminance weights, so an
/// already-binary black/white image stays 0/255. Pixels with zero alpha
/// are forced to 0 whatever their color.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_and_grayscale(bytes: &[u8]) -> Result<GrayImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let format = image::guess_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)?;
    let color = img.color();
    tracing::debug!(?format, ?color, "decoding source image");

    if !color.has_alpha() {
        return Ok(img.to_luma8());
    }
    let with_alpha = img.to_luma_alpha8();
    Ok(GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let [value, alpha] = with_alpha.get_pixel(x, y).0;
        Luma([if alpha == 0 { BACKGROUND } else { value }])
    }))
}
