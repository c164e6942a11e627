use super::bezier::{BezierSegment, CurveSet, Point};

/// Outcome of repairing one frame's curves.
#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
    /// The curves survived, with `repairs` segments replaced by bridges.
    Kept { curves: CurveSet, repairs: usize },
    /// Too many segments needed repair to trust the outline.
    Rejected { repairs: usize },
}

/// Replaces degenerate segments with straight bridges and rejects frames that
/// needed more than `max_repairs` of them.
#[derive(Debug, Clone)]
pub struct DegeneracyRepair {
    max_repairs: usize,
}

impl DegeneracyRepair {
    pub fn new(max_repairs: usize) -> Self {
        Self { max_repairs }
    }

    pub fn apply(&self, segments: &[BezierSegment]) -> RepairOutcome {
        let mut repairs = 0;
        let curves = bridge_degenerate(segments, &mut repairs);
        if curves.is_none() {
            repairs = segments.len();
        }

        match curves {
            Some(curves) if repairs <= self.max_repairs && !curves.is_empty() => {
                if repairs > 0 {
                    tracing::debug!("Repaired {} of {} segments", repairs, curves.len());
                }
                RepairOutcome::Kept { curves, repairs }
            }
            _ => {
                tracing::debug!(
                    "Rejecting curves after {} repairs (limit {})",
                    repairs,
                    self.max_repairs
                );
                RepairOutcome::Rejected { repairs }
            }
        }
    }
}

/// Swap every segment that fails validation for a straight bridge from the
/// end of the previous kept segment to the start of the next well-formed one,
/// wrapping around the list at both ends. `repairs` is incremented once per
/// bridge.
///
/// Returns `None` when no segment is well-formed, since there is then nothing
/// to bridge between.
pub fn bridge_degenerate(segments: &[BezierSegment], repairs: &mut usize) -> Option<CurveSet> {
    let n = segments.len();
    let well_formed: Vec<bool> = segments
        .iter()
        .enumerate()
        .map(|(i, seg)| seg.validate(i).is_ok())
        .collect();

    let mut curves = CurveSet::with_capacity(n);
    for (i, seg) in segments.iter().enumerate() {
        if let Err(err) = seg.validate(i) {
            let from = match curves.last() {
                Some(prev) => prev.end(),
                None => {
                    let k = (1..n).map(|k| (i + n - k) % n).find(|&k| well_formed[k])?;
                    segments[k].end()
                }
            };
            let k = (1..n).map(|k| (i + k) % n).find(|&k| well_formed[k])?;
            let to = segments[k].start();

            tracing::debug!("{}, bridging ({:.1}, {:.1}) -> ({:.1}, {:.1})", err, from.x, from.y, to.x, to.y);
            *repairs += 1;
            curves.push(bridge(from, to));
        } else {
            curves.push(*seg);
        }
    }

    Some(curves)
}

/// Four evenly spaced collinear control points from `from` to `to`.
fn bridge(from: Point, to: Point) -> BezierSegment {
    BezierSegment::line(from, to)
}
