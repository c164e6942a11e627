mod folder;

pub use folder::FolderSource;

use anyhow::Result;
use image::DynamicImage;
use std::path::{Path, PathBuf};

use crate::error::FrameError;

/// A decoded frame and the file it came from
pub struct RasterFrame {
    pub path: PathBuf,
    pub image: DynamicImage,
}

/// One video: a named folder of per-frame images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFolder {
    pub name: String,
    pub path: PathBuf,
}

/// Trait for frame sources
pub trait FrameSource {
    /// Videos in processing order. Failing to enumerate them is fatal.
    fn videos(&self) -> Result<Vec<VideoFolder>>;

    /// Frame files of one video, in processing order
    fn frames(&self, video: &VideoFolder) -> Result<Vec<PathBuf>>;

    /// Decode a single frame
    fn load_frame(&self, path: &Path) -> std::result::Result<RasterFrame, FrameError>;
}
