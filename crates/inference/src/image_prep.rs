//! Image preparation for vision payloads.
//!
//! Uploaded ingredient photos are scaled down and recompressed before they
//! are shipped to the provider, bounding the request size: longest side at
//! most 2048 px, JPEG quality 80, base64 data URL.

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;

/// Maximum pixels on the longest side after scaling.
pub const MAX_DIMENSION: u32 = 2048;

/// JPEG quality used when recompressing.
pub const JPEG_QUALITY: u8 = 80;

/// Decode, scale down, recompress, and base64-encode an uploaded image into
/// a `data:image/jpeg;base64,...` URL.
pub fn prepare_data_url(bytes: &[u8]) -> Result<String, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;

    // Only shrink; small images are sent as-is (re-encoded).
    let scaled = if decoded.width() > MAX_DIMENSION || decoded.height() > MAX_DIMENSION {
        decoded.resize(
            MAX_DIMENSION,
            MAX_DIMENSION,
            image::imageops::FilterType::Lanczos3,
        )
    } else {
        decoded
    };

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    scaled.write_with_encoder(encoder)?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(&jpeg);
    Ok(format!("data:image/jpeg;base64,{encoded}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
