//! Core types, error definitions, and data structures for swave_dataset.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, SwaveDatasetError>;

#[derive(Debug, Error)]
pub enum SwaveDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("label file {path} could not be read: {msg}")]
    LabelFile { path: PathBuf, msg: String },
    #[error("label file {path} has no array named `{key}`")]
    MissingKey { path: PathBuf, key: String },
    #[error("label array has {actual} entries, expected {expected} cases")]
    Shape { expected: usize, actual: usize },
    #[error("image file not found: {path}")]
    MissingFile { path: PathBuf },
    #[error("indexed {actual} samples, expected {expected}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image {path} is {actual:?}, expected {expected:?} within the batch")]
    ImageSize {
        path: PathBuf,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("sample index {index} out of range for dataset of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid split: {0}")]
    InvalidSplit(String),
    #[error("{0}")]
    Other(String),
}

/// A decoded sample ready for batching.
#[derive(Debug, Clone)]
pub struct DatasetSample {
    /// Position of the sample in the dataset index.
    pub index: usize,
    /// Image in CHW layout. Values are in [0, 1] unless the pipeline normalizes.
    pub image_chw: Vec<f32>,
    pub width: u32,
    pub height: u32,
    pub label: i64,
}

/// Per-class label counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub total: usize,
    pub per_class: BTreeMap<i64, usize>,
}

impl LabelSummary {
    pub fn from_labels(labels: &[i64]) -> Self {
        let mut per_class = BTreeMap::new();
        for label in labels {
            *per_class.entry(*label).or_insert(0) += 1;
        }
        Self {
            total: labels.len(),
            per_class,
        }
    }

    pub fn count(&self, label: i64) -> usize {
        self.per_class.get(&label).copied().unwrap_or(0)
    }

    pub fn describe(&self) -> String {
        let classes = self
            .per_class
            .iter()
            .map(|(label, count)| format!("{label}:{count}"))
            .collect::<Vec<_>>()
            .join(" ");
        format!("total={} classes=[{}]", self.total, classes)
    }
}
