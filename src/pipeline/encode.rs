//! Image encoding: `DynamicImage` → PNG bytes for the OCR engine's stdin.
//!
//! PNG is lossless; JPEG artefacts around glyph edges cost Tesseract accuracy
//! on small invoice print. Encoding happens in memory, so no page image ever
//! touches the filesystem.

use crate::error::ExtractError;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ExtractError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ExtractError::Internal(format!("PNG encoding failed: {e}")))?;

    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Decode a downloaded image of any supported format.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ExtractError> {
    image::load_from_memory(bytes).map_err(|e| ExtractError::UnsupportedImage {
        detail: e.to_string(),
    })
}
