//! Bitmap encoding: `DynamicImage` → PNG bytes for the OCR engine.
//!
//! Tesseract (through leptonica) reads encoded images from memory, so every
//! bitmap is handed over as lossless PNG. Float-sample images have no PNG
//! representation and are narrowed to 8-bit RGBA first.

use image::{ColorType, DynamicImage};
use std::io::Cursor;
use tracing::debug;

/// Encode a page bitmap as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    if matches!(img.color(), ColorType::Rgb32F | ColorType::Rgba32F) {
        DynamicImage::ImageRgba8(img.to_rgba8())
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    } else {
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    }

    debug!(
        "Encoded {}x{} bitmap → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}
