use std::path::PathBuf;

use crate::segmentation::{ChainApprox, DEFAULT_ALPHA_THRESHOLD};

/// Everything one pipeline run needs to know, passed in explicitly.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pixels with `alpha > alpha_threshold` are foreground.
    pub alpha_threshold: u8,

    /// Contour point reduction before fitting.
    pub chain: ChainApprox,

    /// Maximum squared distance between a contour point and its curve.
    pub tolerance: f64,

    /// Newton-Raphson rounds tried before a chain is split.
    pub max_reparam_iterations: usize,

    /// Frames needing more repaired segments than this are emptied.
    pub max_repairs: usize,

    /// Where to write debug overlays, if anywhere.
    pub overlay_dir: Option<PathBuf>,

    /// Only process these video folders. Empty means all of them.
    pub videos: Vec<String>,

    /// Frames processed per video, 0 for no limit.
    pub max_frames: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            chain: ChainApprox::Simple,
            tolerance: 4.0,
            max_reparam_iterations: 20,
            max_repairs: 5,
            overlay_dir: None,
            videos: Vec::new(),
            max_frames: 0,
        }
    }
}
