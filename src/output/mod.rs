mod json;
mod overlay;

pub use json::{JsonFileSink, JsonOptions};
pub use overlay::OverlayWriter;

use anyhow::Result;

use crate::pipeline::DatasetResult;

/// Trait for result destinations
pub trait ResultSink {
    /// Persist the results of a whole dataset run
    fn write_dataset(&mut self, dataset: &DatasetResult) -> Result<()>;
}
