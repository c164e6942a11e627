use super::{FrameSource, RasterFrame, VideoFolder};
use crate::error::FrameError;
use anyhow::{bail, Context, Result};
use image::{ImageFormat, ImageReader};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Dataset laid out as `<root>/<video>/<frame image>`.
pub struct FolderSource {
    root: PathBuf,
}

impl FolderSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

/// Immediate children of `dir`, sorted by file name.
fn sorted_children(dir: &Path) -> Result<Vec<walkdir::DirEntry>> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| entry.with_context(|| format!("Failed to enumerate {}", dir.display())))
        .collect()
}

impl FrameSource for FolderSource {
    fn videos(&self) -> Result<Vec<VideoFolder>> {
        let root = &self.root;
        let metadata = fs::metadata(root)
            .with_context(|| format!("Failed to read input root {}", root.display()))?;
        if !metadata.is_dir() {
            bail!("Input root {} is not a directory", root.display());
        }

        let mut videos = Vec::new();
        for entry in sorted_children(root)? {
            if !entry.path().is_dir() {
                tracing::warn!("Skipping {}: not a video folder", entry.path().display());
                continue;
            }
            videos.push(VideoFolder {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.into_path(),
            });
        }

        tracing::info!("Found {} video folders under {}", videos.len(), root.display());
        Ok(videos)
    }

    fn frames(&self, video: &VideoFolder) -> Result<Vec<PathBuf>> {
        let mut frames = Vec::new();
        for entry in sorted_children(&video.path)? {
            let path = entry.into_path();
            if path.is_file() && ImageFormat::from_path(&path).is_ok() {
                frames.push(path);
            } else {
                tracing::debug!("Ignoring {}: not an image file", path.display());
            }
        }
        Ok(frames)
    }

    fn load_frame(&self, path: &Path) -> std::result::Result<RasterFrame, FrameError> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(RasterFrame {
            path: path.to_path_buf(),
            image,
        })
    }
}
