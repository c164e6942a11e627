pub mod bezier;
mod fit;
mod repair;

pub use bezier::{BezierSegment, CurveSet, Point};
pub use fit::CurveFitter;
pub use repair::{DegeneracyRepair, RepairOutcome};
