mod capture;
mod config;
mod error;
mod fitting;
mod output;
mod pipeline;
mod segmentation;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use capture::FolderSource;
use clap::Parser;
use config::PipelineConfig;
use output::{JsonFileSink, JsonOptions, ResultSink};
use pipeline::FrameAggregator;
use segmentation::ChainApprox;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folder containing one sub-folder of frame images per video
    input_root: PathBuf,

    /// Output JSON file
    #[arg(short, long, default_value = "all_video_contours.json")]
    output: PathBuf,

    /// Maximum squared distance between a contour point and its fitted curve
    #[arg(short, long, default_value_t = 4.0)]
    tolerance: f64,

    /// Pixels with alpha above this value are foreground
    #[arg(long, default_value_t = 127)]
    alpha_threshold: u8,

    /// Frames needing more repaired segments than this are written empty
    #[arg(long, default_value_t = 5)]
    max_repairs: usize,

    /// Newton-Raphson rounds tried before a chain is split
    #[arg(long, default_value_t = 20)]
    max_reparam_iterations: usize,

    /// Contour point reduction before fitting
    #[arg(long, value_enum, default_value_t = ChainApprox::Simple)]
    chain: ChainApprox,

    /// Only process this video folder (repeatable)
    #[arg(long = "video", value_name = "NAME")]
    videos: Vec<String>,

    /// Frames processed per video, 0 for no limit
    #[arg(long, default_value_t = 0)]
    max_frames: usize,

    /// Write contour/curve overlays for every fitted frame into this folder
    #[arg(long, value_name = "DIR")]
    overlay_dir: Option<PathBuf>,

    /// Keep full precision instead of truncating to whole pixels
    #[arg(long)]
    exact: bool,

    /// Leave empty frames out of the output instead of writing []
    #[arg(long)]
    skip_empty: bool,

    /// Indent the output JSON
    #[arg(long)]
    pretty: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            alpha_threshold: self.alpha_threshold,
            chain: self.chain,
            tolerance: self.tolerance,
            max_reparam_iterations: self.max_reparam_iterations,
            max_repairs: self.max_repairs,
            overlay_dir: self.overlay_dir.clone(),
            videos: self.videos.clone(),
            max_frames: self.max_frames,
        }
    }

    fn json_options(&self) -> JsonOptions {
        JsonOptions {
            pretty: self.pretty,
            whole_pixels: !self.exact,
            skip_empty: self.skip_empty,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = args.pipeline_config();
    tracing::info!("outline-fx starting");
    tracing::info!("Input: {}", args.input_root.display());
    tracing::info!("Output: {}", args.output.display());
    tracing::info!(
        "Tolerance: {}, alpha threshold: {}, max repairs: {}",
        config.tolerance,
        config.alpha_threshold,
        config.max_repairs
    );
    if let Some(dir) = &config.overlay_dir {
        tracing::info!("Writing overlays to {}", dir.display());
    }

    let aggregator = FrameAggregator::new(FolderSource::new(&args.input_root), &config);
    let dataset = aggregator
        .process_dataset()
        .context("Failed to process input folder")?;

    let mut sink = JsonFileSink::new(&args.output, args.json_options());
    sink.write_dataset(&dataset)
        .context("Failed to write results")?;

    Ok(())
}
