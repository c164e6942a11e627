use image::DynamicImage;

use super::types::{BinaryMask, MaskExtractor};
use crate::error::FrameError;

/// Alpha cutoff used when none is configured.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 127;

/// Thresholds the alpha channel: a pixel is foreground when `alpha > threshold`.
pub struct AlphaThreshold {
    threshold: u8,
}

impl AlphaThreshold {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }
}

impl Default for AlphaThreshold {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA_THRESHOLD)
    }
}

impl MaskExtractor for AlphaThreshold {
    fn extract(&self, frame: &DynamicImage) -> Result<BinaryMask, FrameError> {
        let _span = tracing::debug_span!("alpha_mask").entered();

        if !frame.color().has_alpha() {
            return Err(FrameError::MissingAlphaChannel);
        }

        // Any alpha-carrying color type is normalized to 8-bit RGBA first.
        let rgba = frame.to_rgba8();
        let threshold = self.threshold;
        let (width, height) = rgba.dimensions();
        Ok(BinaryMask::from_fn(width, height, |x, y| {
            rgba.get_pixel(x, y)[3] > threshold
        }))
    }
}
