use thiserror::Error;

/// Per-frame failures. None of these abort a batch: the aggregator turns
/// each one into an empty frame result and moves on.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame has no alpha channel")]
    MissingAlphaChannel,
    #[error("mask has no foreground region")]
    NoContourFound,
    #[error("image decode failed: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fitted segment that broke the four-control-point contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("segment {index} is degenerate")]
pub struct FitDegenerate {
    pub index: usize,
}
