//! Image encoding: rasterised page → PNG bytes, and PNG → `data:` URI.
//!
//! PNG is lossless, which keeps rendered text crisp when the image is shown
//! next to the extracted content for proofreading. The `data:` URI form lets
//! the image be embedded directly into an exported HTML document or handed
//! to any front end that displays images from URLs.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded {}x{} image → {} bytes PNG", img.width(), img.height(), buf.len());
    Ok(buf)
}

/// Wrap PNG bytes as a base64 `data:image/png` URI.
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
