use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

/// Downscales an image to a percentage of its original dimensions and
/// re-encodes it as JPEG at a fixed quality.
///
/// Pure and deterministic: identical input bytes and configuration always
/// produce byte-identical output. Safe to call concurrently; decoding and
/// encoding are CPU-bound, so callers on an async runtime should move the
/// call onto the blocking pool.
#[derive(Debug, Clone)]
pub struct ImageTransformer {
    scale_percent: u32,
    jpeg_quality: u8,
}

impl ImageTransformer {
    pub fn new(scale_percent: u32, jpeg_quality: u8) -> Self {
        Self {
            scale_percent,
            jpeg_quality,
        }
    }

    pub fn transform(&self, raw: &[u8]) -> Result<Vec<u8>, TransformError> {
        let img = image::load_from_memory(raw)?;

        let width = (img.width() * self.scale_percent / 100).max(1);
        let height = (img.height() * self.scale_percent / 100).max(1);
        let resized = img.resize_exact(width, height, FilterType::Triangle);

        // JPEG carries no alpha channel; flatten before encoding.
        let rgb = resized.into_rgb8();

        let mut out = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut out, self.jpeg_quality);
        rgb.write_with_encoder(encoder)
            .map_err(TransformError::Encode)?;

        Ok(out.into_inner())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("input is not a decodable image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("re-encoding failed: {0}")]
    Encode(image::ImageError),
}
