use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::capture::{FrameSource, VideoFolder};
use crate::config::PipelineConfig;
use crate::error::FrameError;
use crate::fitting::{BezierSegment, CurveFitter, CurveSet, DegeneracyRepair, RepairOutcome};
use crate::output::OverlayWriter;
use crate::segmentation::{self, ContourSelector, MaskExtractor};

/// Why a frame ended up without curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    MissingAlphaChannel,
    NoContourFound,
    ImageDecodeFailure,
    TooManyRepairs { repairs: usize },
}

impl From<&FrameError> for EmptyReason {
    fn from(err: &FrameError) -> Self {
        match err {
            FrameError::MissingAlphaChannel => EmptyReason::MissingAlphaChannel,
            FrameError::NoContourFound => EmptyReason::NoContourFound,
            FrameError::ImageDecode(_) | FrameError::Io(_) => EmptyReason::ImageDecodeFailure,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameResult {
    Fitted(CurveSet),
    Empty(EmptyReason),
}

impl FrameResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, FrameResult::Empty(_))
    }

    pub fn curves(&self) -> &[BezierSegment] {
        match self {
            FrameResult::Fitted(curves) => curves,
            FrameResult::Empty(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub path: PathBuf,
    pub result: FrameResult,
}

/// Frame results of one video, in frame file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoResult {
    pub frames: Vec<FrameRecord>,
}

impl VideoResult {
    pub fn fitted_count(&self) -> usize {
        self.frames.iter().filter(|f| !f.result.is_empty()).count()
    }

    pub fn segment_count(&self) -> usize {
        self.frames.iter().map(|f| f.result.curves().len()).sum()
    }
}

/// Video results keyed by video folder name.
pub type DatasetResult = BTreeMap<String, VideoResult>;

/// Drives mask -> contour -> fit -> repair over every frame of a dataset.
///
/// Frames are processed strictly one after another. A failing frame is
/// logged and recorded as empty; only failing to enumerate the dataset root
/// stops a run.
pub struct FrameAggregator<S: FrameSource> {
    source: S,
    extractor: Box<dyn MaskExtractor>,
    selector: ContourSelector,
    fitter: CurveFitter,
    repair: DegeneracyRepair,
    overlay: Option<OverlayWriter>,
    videos: Vec<String>,
    max_frames: usize,
}

impl<S: FrameSource> FrameAggregator<S> {
    pub fn new(source: S, config: &PipelineConfig) -> Self {
        Self {
            source,
            extractor: segmentation::create_default_extractor(config.alpha_threshold),
            selector: ContourSelector::new(config.chain),
            fitter: CurveFitter::new(config.tolerance, config.max_reparam_iterations),
            repair: DegeneracyRepair::new(config.max_repairs),
            overlay: config.overlay_dir.as_ref().map(OverlayWriter::new),
            videos: config.videos.clone(),
            max_frames: config.max_frames,
        }
    }

    pub fn process_dataset(&self) -> Result<DatasetResult> {
        let start = Instant::now();
        let mut dataset = DatasetResult::new();

        for video in self.source.videos()? {
            if !self.videos.is_empty() && !self.videos.contains(&video.name) {
                tracing::debug!("Skipping video {}: not selected", video.name);
                continue;
            }
            let result = self.process_video(&video);
            dataset.insert(video.name, result);
        }

        for name in &self.videos {
            if !dataset.contains_key(name) {
                tracing::warn!("Selected video {} was not found", name);
            }
        }

        let frames: usize = dataset.values().map(|v| v.frames.len()).sum();
        let fitted: usize = dataset.values().map(VideoResult::fitted_count).sum();
        tracing::info!(
            "Dataset finished: {} videos, {} frames, {} fitted, {} empty in {:.1}s",
            dataset.len(),
            frames,
            fitted,
            frames - fitted,
            start.elapsed().as_secs_f64()
        );

        Ok(dataset)
    }

    pub fn process_video(&self, video: &VideoFolder) -> VideoResult {
        let _span = tracing::info_span!("video", name = %video.name).entered();
        tracing::info!("Starting {}", video.name);
        let start = Instant::now();

        let paths = match self.source.frames(video) {
            Ok(paths) => paths,
            Err(err) => {
                tracing::warn!("Failed to list frames of {}: {:#}", video.name, err);
                return VideoResult::default();
            }
        };

        let limit = if self.max_frames == 0 {
            usize::MAX
        } else {
            self.max_frames
        };

        let frames: Vec<FrameRecord> = paths
            .into_iter()
            .take(limit)
            .map(|path| {
                let result = self.process_frame(&video.name, &path);
                FrameRecord { path, result }
            })
            .collect();

        let result = VideoResult { frames };
        let fitted = result.fitted_count();
        tracing::info!(
            "{} finished with {} frames: {} fitted, {} empty, {} segments in {:.1}s",
            video.name,
            result.frames.len(),
            fitted,
            result.frames.len() - fitted,
            result.segment_count(),
            start.elapsed().as_secs_f64()
        );
        result
    }

    /// Never fails: every error ends up as an empty result.
    pub fn process_frame(&self, video: &str, path: &Path) -> FrameResult {
        match self.fit_frame(video, path) {
            Ok(FrameResult::Fitted(curves)) => {
                tracing::debug!("{}: {} curves", path.display(), curves.len());
                FrameResult::Fitted(curves)
            }
            Ok(FrameResult::Empty(reason)) => {
                tracing::warn!("No curves for {} ({:?})", path.display(), reason);
                FrameResult::Empty(reason)
            }
            Err(err) => {
                tracing::warn!("Skipping {}: {}", path.display(), err);
                FrameResult::Empty(EmptyReason::from(&err))
            }
        }
    }

    fn fit_frame(&self, video: &str, path: &Path) -> std::result::Result<FrameResult, FrameError> {
        let _span = tracing::debug_span!("frame", path = %path.display()).entered();

        let mask = {
            let frame = self.source.load_frame(path)?;
            tracing::debug!(
                "Decoded {} ({}x{})",
                frame.path.display(),
                frame.image.width(),
                frame.image.height()
            );
            self.extractor.extract(&frame.image)?
        };
        tracing::debug!("Mask has {} foreground pixels", mask.foreground_count());
        let (width, height) = mask.dimensions();
        let contour = self.selector.select(&mask)?;
        drop(mask);

        let fit = self.fitter.fit(&contour.to_fit_points());
        let result = match self.repair.apply(&fit.curves) {
            RepairOutcome::Kept { curves, .. } => FrameResult::Fitted(curves),
            RepairOutcome::Rejected { repairs } => {
                FrameResult::Empty(EmptyReason::TooManyRepairs { repairs })
            }
        };

        if let (Some(overlay), FrameResult::Fitted(curves)) = (&self.overlay, &result) {
            let canvas = OverlayWriter::render(width, height, &contour, curves);
            if let Err(err) = overlay.write(video, path, &canvas) {
                tracing::warn!("{:#}", err);
            }
        }

        Ok(result)
    }
}
