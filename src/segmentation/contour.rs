use imageproc::contours::{find_contours, BorderType};

use super::types::BinaryMask;
use crate::error::FrameError;
use crate::fitting::Point;

/// How traced boundary pixels are reduced before selection and fitting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ChainApprox {
    /// Collapse straight horizontal, vertical and diagonal runs to their ends.
    #[default]
    Simple,
    /// Keep every traced boundary pixel.
    None,
}

/// Closed boundary of one foreground region, in pixel coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
}

impl Contour {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn to_fit_points(&self) -> Vec<Point> {
        self.points
            .iter()
            .map(|&(x, y)| Point::new(x as f64, y as f64))
            .collect()
    }
}

/// Traces the exterior boundaries of a mask and picks the dominant one.
#[derive(Debug, Clone, Default)]
pub struct ContourSelector {
    chain: ChainApprox,
}

impl ContourSelector {
    pub fn new(chain: ChainApprox) -> Self {
        Self { chain }
    }

    /// All outermost exterior boundaries, in trace order. Holes, and regions
    /// nested inside holes, are left out.
    pub fn trace(&self, mask: &BinaryMask) -> Vec<Contour> {
        find_contours::<i32>(mask.as_gray())
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| {
                let points: Vec<(i32, i32)> = c.points.iter().map(|p| (p.x, p.y)).collect();
                let points = match self.chain {
                    ChainApprox::Simple => approximate_simple(&points),
                    ChainApprox::None => points,
                };
                Contour { points }
            })
            .collect()
    }

    /// The contour with the most points. Ties go to the earliest traced one.
    pub fn select(&self, mask: &BinaryMask) -> Result<Contour, FrameError> {
        let _span = tracing::debug_span!("select_contour").entered();

        let contours = self.trace(mask);
        let count = contours.len();

        let mut selected: Option<Contour> = None;
        for contour in contours.into_iter().filter(|c| !c.is_empty()) {
            if selected.as_ref().map_or(true, |s| contour.len() > s.len()) {
                selected = Some(contour);
            }
        }

        let selected = selected.ok_or(FrameError::NoContourFound)?;
        tracing::debug!(
            "Selected contour with {} points out of {} candidates",
            selected.len(),
            count
        );
        Ok(selected)
    }
}

/// Keeps only the points where the step direction changes, treating the
/// chain as closed. Consecutive duplicates are removed first.
fn approximate_simple(points: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let mut chain = points.to_vec();
    chain.dedup();
    while chain.len() > 1 && chain.first() == chain.last() {
        chain.pop();
    }

    let n = chain.len();
    if n < 3 {
        return chain;
    }

    (0..n)
        .filter(|&i| {
            let prev = chain[(i + n - 1) % n];
            let next = chain[(i + 1) % n];
            step(prev, chain[i]) != step(chain[i], next)
        })
        .map(|i| chain[i])
        .collect()
}

fn step(from: (i32, i32), to: (i32, i32)) -> (i32, i32) {
    ((to.0 - from.0).signum(), (to.1 - from.1).signum())
}
