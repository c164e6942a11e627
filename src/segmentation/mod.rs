mod alpha;
mod contour;
pub mod types;

pub use alpha::{AlphaThreshold, DEFAULT_ALPHA_THRESHOLD};
pub use contour::{ChainApprox, Contour, ContourSelector};
pub use types::MaskExtractor;

/// Create the default mask extractor (alpha threshold)
pub fn create_default_extractor(threshold: u8) -> Box<dyn MaskExtractor> {
    Box::new(AlphaThreshold::new(threshold))
}
