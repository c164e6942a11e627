use super::ResultSink;
use crate::pipeline::{DatasetResult, FrameResult};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A single number in a flattened curve array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Coordinate {
    Pixel(i64),
    Exact(f64),
}

/// `{"frames": [[x1, y1, ..., x4, y4, ...], ...]}`
#[derive(Debug, Serialize)]
pub struct VideoDocument {
    pub frames: Vec<Vec<Coordinate>>,
}

pub type DatasetDocument = BTreeMap<String, VideoDocument>;

#[derive(Debug, Clone)]
pub struct JsonOptions {
    /// Indented output
    pub pretty: bool,
    /// Truncate control points toward zero to whole pixels
    pub whole_pixels: bool,
    /// Leave empty frames out instead of writing `[]`
    pub skip_empty: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            whole_pixels: true,
            skip_empty: false,
        }
    }
}

/// Writes the dataset as one JSON document.
pub struct JsonFileSink {
    path: PathBuf,
    options: JsonOptions,
}

impl JsonFileSink {
    pub fn new<P: AsRef<Path>>(path: P, options: JsonOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
        }
    }
}

pub fn build_document(dataset: &DatasetResult, options: &JsonOptions) -> DatasetDocument {
    let coordinate = |v: f64| {
        if options.whole_pixels {
            Coordinate::Pixel(v.trunc() as i64)
        } else {
            Coordinate::Exact(v)
        }
    };

    dataset
        .iter()
        .map(|(name, video)| {
            let frames: Vec<Vec<Coordinate>> = video
                .frames
                .iter()
                .filter(|record| !(options.skip_empty && record.result.is_empty()))
                .map(|record| match &record.result {
                    FrameResult::Fitted(curves) => curves
                        .iter()
                        .flat_map(|segment| segment.flatten())
                        .map(coordinate)
                        .collect(),
                    FrameResult::Empty(_) => Vec::new(),
                })
                .collect();
            (name.clone(), VideoDocument { frames })
        })
        .collect()
}

impl ResultSink for JsonFileSink {
    fn write_dataset(&mut self, dataset: &DatasetResult) -> Result<()> {
        let document = build_document(dataset, &self.options);

        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        if self.options.pretty {
            serde_json::to_writer_pretty(&mut writer, &document)?;
        } else {
            serde_json::to_writer(&mut writer, &document)?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        tracing::info!("Wrote {} videos to {}", document.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitting::{BezierSegment, Point};
    use crate::pipeline::{EmptyReason, FrameRecord, VideoResult};

    fn dataset() -> DatasetResult {
        let first = BezierSegment::new(
            Point::new(0.4, 1.6),
            Point::new(2.0, 2.0),
            Point::new(3.5, 3.0),
            Point::new(4.0, 4.0),
        );
        let second = BezierSegment::new(
            Point::new(4.0, 4.0),
            Point::new(5.0, 4.0),
            Point::new(6.0, 4.0),
            Point::new(7.0, 4.0),
        );

        let mut dataset = DatasetResult::new();
        dataset.insert(
            "clip".to_string(),
            VideoResult {
                frames: vec![
                    FrameRecord {
                        path: PathBuf::from("clip/00001.png"),
                        result: FrameResult::Fitted(vec![first, second]),
                    },
                    FrameRecord {
                        path: PathBuf::from("clip/00002.png"),
                        result: FrameResult::Empty(EmptyReason::NoContourFound),
                    },
                ],
            },
        );
        dataset.insert("empty".to_string(), VideoResult::default());
        dataset
    }

    #[test]
    fn test_whole_pixel_document_layout() {
        let document = build_document(&dataset(), &JsonOptions::default());
        let json = serde_json::to_string(&document).unwrap();
        assert_eq!(
            json,
            r#"{"clip":{"frames":[[0,1,2,2,3,3,4,4,4,4,5,4,6,4,7,4],[]]},"empty":{"frames":[]}}"#
        );
    }

    #[test]
    fn test_whole_pixels_truncate_toward_zero() {
        let segment = BezierSegment::new(
            Point::new(10.6, 20.7),
            Point::new(11.5, 21.9),
            Point::new(12.5, 22.5),
            Point::new(-13.8, 23.6),
        );
        let mut dataset = DatasetResult::new();
        dataset.insert(
            "clip".to_string(),
            VideoResult {
                frames: vec![FrameRecord {
                    path: PathBuf::from("clip/00001.png"),
                    result: FrameResult::Fitted(vec![segment]),
                }],
            },
        );

        let document = build_document(&dataset, &JsonOptions::default());
        let frame: Vec<Coordinate> = document["clip"].frames[0].clone();
        let expected: Vec<Coordinate> = [10, 20, 11, 21, 12, 22, -13, 23]
            .into_iter()
            .map(Coordinate::Pixel)
            .collect();
        assert_eq!(frame, expected);
    }

    #[test]
    fn test_exact_coordinates_and_skip_empty() {
        let options = JsonOptions {
            pretty: false,
            whole_pixels: false,
            skip_empty: true,
        };
        let document = build_document(&dataset(), &options);
        let frames = &document["clip"].frames;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 16);
        assert_eq!(frames[0][0], Coordinate::Exact(0.4));
        assert_eq!(frames[0][1], Coordinate::Exact(1.6));
    }

    #[test]
    fn test_sink_writes_file() {
        let path = std::env::temp_dir().join(format!("outline-fx-json-{}.json", std::process::id()));
        let mut sink = JsonFileSink::new(&path, JsonOptions::default());
        sink.write_dataset(&dataset()).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["clip"]["frames"][1], serde_json::json!([]));
        assert_eq!(written["clip"]["frames"][0].as_array().map(|a| a.len()), Some(16));
        let _ = std::fs::remove_file(&path);
    }
}
