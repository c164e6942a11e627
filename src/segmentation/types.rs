use image::{DynamicImage, GrayImage};

use crate::error::FrameError;

/// Foreground value written into a [`BinaryMask`].
pub const FOREGROUND: u8 = 255;

/// Binary silhouette: 255 = foreground, 0 = background.
/// Dimensions match the source frame.
#[derive(Debug, Clone)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    /// Builds a mask from a predicate over pixel coordinates.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        Self(GrayImage::from_fn(width, height, |x, y| {
            image::Luma([if f(x, y) { FOREGROUND } else { 0 }])
        }))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    #[cfg(test)]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y)[0] == FOREGROUND
    }

    pub fn foreground_count(&self) -> usize {
        self.0.pixels().filter(|p| p[0] == FOREGROUND).count()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }
}

/// Trait for mask extractors
/// Allows swapping how a frame is reduced to a silhouette (alpha, luma, ...)
pub trait MaskExtractor {
    /// Turn a decoded frame into a binary mask
    ///
    /// # Returns
    /// * The mask, or [`FrameError::MissingAlphaChannel`] when the frame
    ///   carries no data the extractor can threshold
    fn extract(&self, frame: &DynamicImage) -> Result<BinaryMask, FrameError>;
}
