use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_cubic_bezier_curve_mut, draw_line_segment_mut};
use std::fs;
use std::path::{Path, PathBuf};

use crate::fitting::{BezierSegment, Point};
use crate::segmentation::Contour;

const CONTOUR_COLOR: Rgb<u8> = Rgb([128, 128, 128]);
const CURVE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Debug visualization: the selected contour and its fitted curves, written
/// to `<dir>/<video>/<frame stem>.png`.
pub struct OverlayWriter {
    dir: PathBuf,
}

fn as_f32(p: Point) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

impl OverlayWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Draw the contour (gray, closed) and curves (red) on a black canvas.
    pub fn render(width: u32, height: u32, contour: &Contour, curves: &[BezierSegment]) -> RgbImage {
        let _span = tracing::debug_span!("render_overlay").entered();
        let mut canvas = RgbImage::new(width, height);

        let points = contour.to_fit_points();
        for (i, &start) in points.iter().enumerate() {
            let end = points[(i + 1) % points.len()];
            draw_line_segment_mut(&mut canvas, as_f32(start), as_f32(end), CONTOUR_COLOR);
        }

        for segment in curves {
            let [p0, p1, p2, p3] = segment.points;
            draw_cubic_bezier_curve_mut(
                &mut canvas,
                as_f32(p0),
                as_f32(p3),
                as_f32(p1),
                as_f32(p2),
                CURVE_COLOR,
            );
        }

        canvas
    }

    pub fn write(&self, video: &str, frame_path: &Path, overlay: &RgbImage) -> Result<PathBuf> {
        let stem = frame_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());
        let dir = self.dir.join(video);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create overlay folder {}", dir.display()))?;

        let path = dir.join(format!("{}.png", stem));
        overlay
            .save(&path)
            .with_context(|| format!("Failed to save overlay {}", path.display()))?;
        Ok(path)
    }
}
