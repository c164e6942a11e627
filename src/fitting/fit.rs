use super::bezier::{BezierSegment, CurveSet, Point};

/// Reparametrization is only attempted when the first fit is already within
/// this multiple of the tolerance; further off than that, splitting wins.
const REPARAM_ERROR_FACTOR: f64 = 4.0;

/// Below this fraction of the chord length the least-squares tangent
/// magnitudes are considered unreliable.
const ALPHA_EPSILON: f64 = 1.0e-6;

/// Counters collected while fitting one chain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitStats {
    pub segments: usize,
    pub splits: usize,
    pub reparam_rounds: usize,
    /// Largest squared deviation among the accepted segments.
    pub max_error: f64,
}

#[derive(Debug, Clone)]
pub struct FitOutput {
    pub curves: CurveSet,
    pub stats: FitStats,
}

/// Piecewise cubic Bezier fitting by recursive least squares.
///
/// Each chain is fitted with one cubic whose inner control points slide along
/// fixed endpoint tangents. If the worst point is further than `tolerance`
/// (squared distance) after a few Newton-Raphson reparametrization rounds, the
/// chain is split at that point and both halves are fitted with a shared
/// tangent at the joint.
#[derive(Debug, Clone)]
pub struct CurveFitter {
    tolerance: f64,
    max_reparam_iterations: usize,
}

/// A pending sub-chain `points[start..=end]` with its endpoint tangents.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    left: Point,
    right: Point,
}

enum SpanFit {
    Accepted { segment: BezierSegment, error: f64 },
    Split(usize),
}

impl CurveFitter {
    pub fn new(tolerance: f64, max_reparam_iterations: usize) -> Self {
        Self {
            tolerance,
            max_reparam_iterations,
        }
    }

    /// Fit a chain, estimating the endpoint tangents from the neighbouring
    /// points.
    pub fn fit(&self, points: &[Point]) -> FitOutput {
        self.fit_with_tangents(points, None, None)
    }

    /// Fit a chain with optionally fixed unit tangents at its two ends.
    ///
    /// The left tangent points from the first point into the chain, the right
    /// tangent points from the last point back into it.
    pub fn fit_with_tangents(
        &self,
        points: &[Point],
        left: Option<Point>,
        right: Option<Point>,
    ) -> FitOutput {
        let _span = tracing::debug_span!("fit_curve", points = points.len()).entered();

        let mut stats = FitStats::default();
        let mut curves = CurveSet::new();

        let n = points.len();
        if n == 0 {
            return FitOutput { curves, stats };
        }
        if n == 1 {
            curves.push(BezierSegment::new(points[0], points[0], points[0], points[0]));
            stats.segments = 1;
            return FitOutput { curves, stats };
        }

        let left = left.unwrap_or_else(|| (points[1] - points[0]).normalize());
        let right = right.unwrap_or_else(|| (points[n - 2] - points[n - 1]).normalize());

        // Popping the left half first keeps the output in chain order.
        let mut pending = vec![Span {
            start: 0,
            end: n - 1,
            left,
            right,
        }];

        while let Some(span) = pending.pop() {
            let chain = &points[span.start..=span.end];
            match self.fit_span(chain, span.left, span.right, &mut stats) {
                SpanFit::Accepted { segment, error } => {
                    stats.max_error = stats.max_error.max(error);
                    curves.push(segment);
                }
                SpanFit::Split(local) => {
                    let split = span.start + local;
                    let center = (points[split - 1] - points[split + 1]).normalize();
                    stats.splits += 1;
                    pending.push(Span {
                        start: split,
                        end: span.end,
                        left: -center,
                        right: span.right,
                    });
                    pending.push(Span {
                        start: span.start,
                        end: split,
                        left: span.left,
                        right: center,
                    });
                }
            }
        }

        stats.segments = curves.len();
        tracing::debug!(
            "Fitted {} points with {} segments ({} splits, {} reparam rounds, max error {:.3})",
            n,
            stats.segments,
            stats.splits,
            stats.reparam_rounds,
            stats.max_error
        );

        FitOutput { curves, stats }
    }

    fn fit_span(&self, chain: &[Point], left: Point, right: Point, stats: &mut FitStats) -> SpanFit {
        let n = chain.len();
        if n == 2 {
            let third = chain[0].distance(chain[1]) / 3.0;
            return SpanFit::Accepted {
                segment: BezierSegment::new(
                    chain[0],
                    chain[0] + left * third,
                    chain[1] + right * third,
                    chain[1],
                ),
                error: 0.0,
            };
        }

        let mut params = chord_length_parameterize(chain);
        let mut segment = generate_bezier(chain, &params, left, right);
        let (mut error, mut split) = max_error(chain, &segment, &params);
        if error <= self.tolerance {
            return SpanFit::Accepted { segment, error };
        }

        if error <= self.tolerance * REPARAM_ERROR_FACTOR {
            for _ in 0..self.max_reparam_iterations {
                stats.reparam_rounds += 1;
                reparameterize(&segment, chain, &mut params);
                segment = generate_bezier(chain, &params, left, right);
                (error, split) = max_error(chain, &segment, &params);
                if error <= self.tolerance {
                    return SpanFit::Accepted { segment, error };
                }
            }
        }

        SpanFit::Split(split.clamp(1, n - 2))
    }
}

/// Cumulative chord length normalized to `[0, 1]`. A chain with zero total
/// length is parametrized uniformly.
fn chord_length_parameterize(chain: &[Point]) -> Vec<f64> {
    let mut params = Vec::with_capacity(chain.len());
    params.push(0.0);
    let mut total = 0.0;
    for pair in chain.windows(2) {
        total += pair[0].distance(pair[1]);
        params.push(total);
    }

    let last = chain.len() - 1;
    if total > 0.0 {
        params.iter_mut().for_each(|u| *u /= total);
    } else {
        params
            .iter_mut()
            .enumerate()
            .for_each(|(i, u)| *u = i as f64 / last as f64);
    }
    params
}

/// Least-squares placement of the two inner control points along the fixed
/// endpoint tangents.
fn generate_bezier(chain: &[Point], params: &[f64], left: Point, right: Point) -> BezierSegment {
    let first = chain[0];
    let last = chain[chain.len() - 1];
    let baseline = BezierSegment::new(first, first, last, last);

    let mut c = [[0.0f64; 2]; 2];
    let mut x = [0.0f64; 2];
    for (&point, &u) in chain.iter().zip(params) {
        let mu = 1.0 - u;
        let a0 = left * (3.0 * mu * mu * u);
        let a1 = right * (3.0 * mu * u * u);

        c[0][0] += a0.dot(a0);
        c[0][1] += a0.dot(a1);
        c[1][1] += a1.dot(a1);

        let residual = point - baseline.eval(u);
        x[0] += a0.dot(residual);
        x[1] += a1.dot(residual);
    }
    c[1][0] = c[0][1];

    let det_c0_c1 = c[0][0] * c[1][1] - c[1][0] * c[0][1];
    let det_c0_x = c[0][0] * x[1] - c[1][0] * x[0];
    let det_x_c1 = x[0] * c[1][1] - x[1] * c[0][1];

    let (alpha_l, alpha_r) = if det_c0_c1 == 0.0 {
        (0.0, 0.0)
    } else {
        (det_x_c1 / det_c0_c1, det_c0_x / det_c0_c1)
    };

    let seg_length = first.distance(last);
    let epsilon = ALPHA_EPSILON * seg_length;
    if alpha_l < epsilon || alpha_r < epsilon {
        let third = seg_length / 3.0;
        return BezierSegment::new(first, first + left * third, last + right * third, last);
    }

    BezierSegment::new(first, first + left * alpha_l, last + right * alpha_r, last)
}

/// Worst squared deviation and the index where it occurs.
fn max_error(chain: &[Point], segment: &BezierSegment, params: &[f64]) -> (f64, usize) {
    let mut max_dist = 0.0;
    let mut split = chain.len() / 2;
    for (i, (&point, &u)) in chain.iter().zip(params).enumerate() {
        let dist = segment.eval(u).distance_squared(point);
        if dist > max_dist {
            max_dist = dist;
            split = i;
        }
    }
    (max_dist, split)
}

/// One Newton-Raphson step towards each point's closest parameter.
fn reparameterize(segment: &BezierSegment, chain: &[Point], params: &mut [f64]) {
    for (u, &point) in params.iter_mut().zip(chain) {
        *u = newton_raphson_root_find(segment, point, *u);
    }
}

fn newton_raphson_root_find(segment: &BezierSegment, point: Point, u: f64) -> f64 {
    let d = segment.eval(u) - point;
    let q1 = segment.derivative(u);
    let q2 = segment.second_derivative(u);
    let numerator = d.dot(q1);
    let denominator = q1.dot(q1) + d.dot(q2);
    if denominator == 0.0 {
        u
    } else {
        (u - numerator / denominator).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitting::bezier::is_continuous;

    fn ellipse(samples: usize) -> Vec<Point> {
        // Open arc covering most of an ellipse, with distinct points.
        (0..samples)
            .map(|i| {
                let a = i as f64 / samples as f64 * 5.5;
                Point::new(60.0 + 50.0 * a.cos(), 40.0 + 25.0 * a.sin())
            })
            .collect()
    }

    fn closest_distance_squared(segment: &BezierSegment, point: Point) -> f64 {
        (0..=4000)
            .map(|i| segment.eval(i as f64 / 4000.0).distance_squared(point))
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_two_points_give_straight_connector() {
        let fitter = CurveFitter::new(1.0, 20);
        let a = Point::new(2.0, 3.0);
        let b = Point::new(11.0, -6.0);
        let out = fitter.fit(&[a, b]);

        assert_eq!(out.curves.len(), 1);
        assert_eq!(out.stats.splits, 0);
        let seg = out.curves[0];
        assert_eq!(seg.start(), a);
        assert_eq!(seg.end(), b);
        // Inner control points sit on the chord.
        let chord = b - a;
        for p in [seg.points[1], seg.points[2]] {
            let v = p - a;
            assert!((chord.x * v.y - chord.y * v.x).abs() < 1e-9);
        }
    }

    #[test]
    fn test_two_points_follow_given_tangents() {
        let fitter = CurveFitter::new(1.0, 20);
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 0.0);
        let up = Point::new(0.0, 1.0);
        let out = fitter.fit_with_tangents(&[a, b], Some(up), Some(up));

        assert_eq!(out.curves.len(), 1);
        let seg = out.curves[0];
        assert_eq!(seg.start(), a);
        assert_eq!(seg.end(), b);
        assert!(seg.points[1].distance(Point::new(0.0, 1.0)) < 1e-12);
        assert!(seg.points[2].distance(Point::new(3.0, 1.0)) < 1e-12);
    }

    /// Samples of a lopsided cubic at uniform `t`, so chord-length
    /// parameters are off and the first fit misses by a measurable amount.
    fn skewed_cubic() -> (BezierSegment, Vec<Point>) {
        let curve = BezierSegment::new(
            Point::new(0.0, 0.0),
            Point::new(5.0, 30.0),
            Point::new(60.0, 40.0),
            Point::new(50.0, 0.0),
        );
        let points = (0..=12).map(|i| curve.eval(i as f64 / 12.0)).collect();
        (curve, points)
    }

    fn first_fit_error(curve: &BezierSegment, points: &[Point]) -> f64 {
        let left = (curve.points[1] - curve.points[0]).normalize();
        let right = (curve.points[2] - curve.points[3]).normalize();
        let params = chord_length_parameterize(points);
        let segment = generate_bezier(points, &params, left, right);
        max_error(points, &segment, &params).0
    }

    #[test]
    fn test_reparameterization_rescues_near_miss() {
        let (curve, points) = skewed_cubic();
        let initial = first_fit_error(&curve, &points);
        assert!(initial > 1e-6);

        // First fit lands in (tolerance, 4 * tolerance].
        let fitter = CurveFitter::new(initial / 1.5, 20);
        let left = (curve.points[1] - curve.points[0]).normalize();
        let right = (curve.points[2] - curve.points[3]).normalize();
        let out = fitter.fit_with_tangents(&points, Some(left), Some(right));

        assert_eq!(out.curves.len(), 1);
        assert_eq!(out.stats.splits, 0);
        assert!(out.stats.reparam_rounds > 0);
        assert!(out.stats.max_error <= initial / 1.5);
    }

    #[test]
    fn test_far_miss_splits_without_reparameterization() {
        let (curve, points) = skewed_cubic();
        let initial = first_fit_error(&curve, &points);

        // First fit is more than 4 * tolerance off, so it goes straight to a split.
        let fitter = CurveFitter::new(initial / 5.0, 20);
        let left = (curve.points[1] - curve.points[0]).normalize();
        let right = (curve.points[2] - curve.points[3]).normalize();
        let mut stats = FitStats::default();
        let span = fitter.fit_span(&points, left, right, &mut stats);

        assert!(matches!(span, SpanFit::Split(_)));
        assert_eq!(stats.reparam_rounds, 0);
    }

    #[test]
    fn test_newton_step_is_clamped_to_unit_interval() {
        let seg = BezierSegment::line(Point::new(0.0, 0.0), Point::new(3.0, 0.0));
        assert_eq!(newton_raphson_root_find(&seg, Point::new(10.0, 0.0), 0.9), 1.0);
        assert_eq!(newton_raphson_root_find(&seg, Point::new(-5.0, 0.0), 0.1), 0.0);

        let inside = newton_raphson_root_find(&seg, Point::new(1.5, 2.0), 0.2);
        assert!((inside - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_single_point() {
        let fitter = CurveFitter::new(1.0, 20);
        let p = Point::new(4.0, 4.0);
        let out = fitter.fit(&[p]);
        assert_eq!(out.curves, vec![BezierSegment::new(p, p, p, p)]);
        assert!(fitter.fit(&[]).curves.is_empty());
    }

    #[test]
    fn test_collinear_points_fit_exactly() {
        let fitter = CurveFitter::new(1e-9, 20);
        let points = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(6.0, 0.0),
        ];
        let out = fitter.fit(&points);

        assert_eq!(out.curves.len(), 1);
        assert!(out.stats.max_error < 1e-9);
        for p in out.curves[0].points {
            assert_eq!(p.y, 0.0);
        }
    }

    #[test]
    fn test_collinear_diagonal_control_points() {
        let fitter = CurveFitter::new(1e-9, 20);
        let points: Vec<Point> = (0..10).map(|i| Point::new(i as f64, 2.0 * i as f64)).collect();
        let out = fitter.fit(&points);

        assert_eq!(out.curves.len(), 1);
        for p in out.curves[0].points {
            assert!((p.y - 2.0 * p.x).abs() < 1e-9);
        }
    }

    #[test]
    fn test_endpoints_and_continuity() {
        let fitter = CurveFitter::new(0.5, 20);
        let points = ellipse(200);
        let out = fitter.fit(&points);

        assert!(out.curves.len() > 1);
        assert_eq!(out.curves[0].start(), points[0]);
        assert_eq!(out.curves.last().map(|s| s.end()), points.last().copied());
        assert!(is_continuous(&out.curves));
        assert_eq!(out.stats.segments, out.curves.len());
        assert!(out.stats.max_error <= 0.5);
    }

    #[test]
    fn test_every_point_within_tolerance_of_its_segment() {
        let tolerance = 1.0;
        let fitter = CurveFitter::new(tolerance, 20);
        let points = ellipse(300);
        let out = fitter.fit(&points);

        let mut cursor = 0;
        for seg in &out.curves {
            let start = points[cursor..]
                .iter()
                .position(|&p| p == seg.start())
                .map(|i| i + cursor)
                .expect("segment start on the chain");
            let end = points[start..]
                .iter()
                .position(|&p| p == seg.end())
                .map(|i| i + start)
                .expect("segment end on the chain");
            for &p in &points[start..=end] {
                assert!(closest_distance_squared(seg, p) <= tolerance + 0.1);
            }
            cursor = end;
        }
        assert_eq!(cursor, points.len() - 1);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let fitter = CurveFitter::new(2.0, 20);
        let points = ellipse(150);
        let a = fitter.fit(&points);
        let b = fitter.fit(&points);
        assert_eq!(a.curves, b.curves);
        assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn test_fixed_tangents_are_respected() {
        let fitter = CurveFitter::new(100.0, 20);
        let points: Vec<Point> = (0..=10)
            .map(|i| {
                let x = i as f64;
                Point::new(x, 0.1 * x * (10.0 - x))
            })
            .collect();
        let left = Point::new(1.0, 0.0);
        let right = Point::new(-1.0, 0.0);
        let out = fitter.fit_with_tangents(&points, Some(left), Some(right));

        assert_eq!(out.curves.len(), 1);
        let seg = out.curves[0];
        assert_eq!(seg.points[1].y, seg.points[0].y);
        assert_eq!(seg.points[2].y, seg.points[3].y);
    }

    #[test]
    fn test_repeated_points_terminate() {
        let fitter = CurveFitter::new(0.0, 5);
        let p = Point::new(3.0, 3.0);
        let out = fitter.fit(&[p, p, p, p, p]);
        assert!(!out.curves.is_empty());
        assert!(is_continuous(&out.curves));
    }

    #[test]
    fn test_chord_length_parameterize() {
        let params = chord_length_parameterize(&[
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(4.0, 0.0),
        ]);
        assert_eq!(params, vec![0.0, 0.25, 1.0]);

        let p = Point::new(1.0, 1.0);
        assert_eq!(chord_length_parameterize(&[p, p, p]), vec![0.0, 0.5, 1.0]);
    }
}
