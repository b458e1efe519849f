//! cellsplit-export: Pure raster renderers and encoders (sans-IO)
//!
//! Turns pipeline results into images: the six-panel diagnostic figure,
//! the 8-bit result mask, and the seed-cross overlay. Encoders return
//! bytes; writing them to disk is the caller's job.

pub mod overlay;
pub mod panel;
pub mod result;

use image::{ImageBuffer, ImageEncoder, PixelWithColorType};

pub use overlay::{DEFAULT_CROSS_SIZE, draw_seed_crosses};
pub use panel::{GUTTER, render_panels};
pub use result::result_image;

/// Errors that can occur while encoding an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The PNG encoder rejected the image.
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

/// Encode an 8-bit gray or RGB image as PNG bytes.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the encoder fails.
pub fn encode_png<P>(image: &ImageBuffer<P, Vec<u8>>) -> Result<Vec<u8>, ExportError>
where
    P: PixelWithColorType<Subpixel = u8>,
{
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    encoder.write_image(image.as_raw(), image.width(), image.height(), P::COLOR_TYPE)?;
    Ok(buf)
}
