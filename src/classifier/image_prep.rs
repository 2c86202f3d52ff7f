//! Image decoding, resizing, and fingerprinting for classification.
//!
//! Every submission is normalized to an RGB8 PNG no larger than 1024px on
//! its longest edge before it reaches the classifier.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use tracing::debug;

/// Maximum dimension (width or height) of the canonical image.
pub const MAX_IMAGE_DIMENSION: u32 = 1024;

/// Hex characters kept from the SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 16;

/// Normalized image ready for the classifier.
#[derive(Debug, Clone)]
pub struct CanonicalImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CanonicalImage {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }

    /// `data:image/png;base64,...` form used in classifier payloads.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", image_media_type(), self.to_base64())
    }
}

/// Decode, convert to RGB8, shrink if needed, and re-encode as PNG.
///
/// # Errors
/// - Image cannot be decoded
/// - PNG encoding fails
pub fn prepare_image(image_bytes: &[u8]) -> Result<CanonicalImage, String> {
    let img = image::load_from_memory(image_bytes)
        .map_err(|e| format!("Failed to load image: {}", e))?;
    debug!("Loaded image: {}x{}", img.width(), img.height());

    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let resized = resize_if_needed(rgb, MAX_IMAGE_DIMENSION);
    let png = encode_to_png(&resized)?;
    debug!(
        "Canonical image: {}x{}, {} bytes",
        resized.width(),
        resized.height(),
        png.len()
    );

    Ok(CanonicalImage {
        png,
        width: resized.width(),
        height: resized.height(),
    })
}

/// Short hex digest of the submitted bytes (not of the canonical image).
pub fn fingerprint(image_bytes: &[u8]) -> String {
    let digest = Sha256::digest(image_bytes);
    let mut encoded = hex::encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}

/// Resize image if either dimension exceeds max, maintaining aspect ratio.
fn resize_if_needed(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());

    if width <= max_dimension && height <= max_dimension {
        return img;
    }

    let scale = max_dimension as f32 / width.max(height) as f32;
    let new_width = ((width as f32 * scale) as u32).max(1);
    let new_height = ((height as f32 * scale) as u32).max(1);

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

fn encode_to_png(img: &DynamicImage) -> Result<Vec<u8>, String> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| format!("Failed to encode image to PNG: {}", e))?;
    Ok(buffer.into_inner())
}

pub fn image_media_type() -> &'static str {
    "image/png"
}
