//! The SWAVE dataset: labels and index built eagerly, images decoded on access.

use crate::aug::{to_chw_sample, TransformPipeline};
use crate::index::{build_index, IndexConfig, SampleIndex, SampleLayout, DEFAULT_PREFIX};
use crate::labels::read_labels;
use crate::types::{DatasetResult, DatasetSample, LabelSummary, SwaveDatasetError};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Directory holding the images.
    pub image_dir: PathBuf,
    /// Labeled-array file (`.mat` or `.json`).
    pub label_file: PathBuf,
    /// Name of the label array inside `label_file`.
    pub label_key: String,
    pub case_count: usize,
    pub layout: SampleLayout,
    pub prefix: String,
    /// Applied by `get`; None returns raw decoded pixels.
    pub transform: Option<TransformPipeline>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("data/images"),
            label_file: PathBuf::from("data/label.mat"),
            label_key: "label".to_string(),
            case_count: 46,
            layout: SampleLayout::default(),
            prefix: DEFAULT_PREFIX.to_string(),
            transform: None,
        }
    }
}

impl DatasetConfig {
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            image_dir: self.image_dir.clone(),
            prefix: self.prefix.clone(),
            case_count: self.case_count,
            layout: self.layout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SwaveDataset {
    index: SampleIndex,
    case_labels: Vec<i64>,
    transform: Option<TransformPipeline>,
}

impl SwaveDataset {
    /// Read labels and index every image. Fails before returning anything if the
    /// label array has the wrong length or any image is missing.
    pub fn open(cfg: &DatasetConfig) -> DatasetResult<Self> {
        let case_labels = read_labels(&cfg.label_file, &cfg.label_key, cfg.case_count)?;
        let index = build_index(&cfg.index_config(), &case_labels)?;
        let dataset = Self {
            index,
            case_labels,
            transform: cfg.transform.clone(),
        };
        info!(
            samples = dataset.len(),
            cases = cfg.case_count,
            per_case = cfg.layout.samples_per_case(),
            labels = %dataset.label_summary().describe(),
            "indexed dataset"
        );
        Ok(dataset)
    }

    pub fn from_index(index: SampleIndex, case_labels: Vec<i64>) -> Self {
        Self {
            index,
            case_labels,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Option<TransformPipeline>) -> Self {
        self.transform = transform;
        self
    }

    pub fn transform(&self) -> Option<&TransformPipeline> {
        self.transform.as_ref()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &SampleIndex {
        &self.index
    }

    pub fn labels(&self) -> &[i64] {
        self.index.labels()
    }

    pub fn case_labels(&self) -> &[i64] {
        &self.case_labels
    }

    pub fn label_summary(&self) -> LabelSummary {
        LabelSummary::from_labels(self.labels())
    }

    /// Number of classes implied by the largest label.
    pub fn num_classes(&self) -> usize {
        self.labels()
            .iter()
            .copied()
            .max()
            .map(|m| (m.max(0) + 1) as usize)
            .unwrap_or(0)
    }

    fn entry(&self, index: usize) -> DatasetResult<(&Path, i64)> {
        match (self.index.path(index), self.index.label(index)) {
            (Some(path), Some(label)) => Ok((path, label)),
            _ => Err(SwaveDatasetError::IndexOutOfRange {
                index,
                len: self.len(),
            }),
        }
    }

    /// Decode sample `index` as 3-channel RGB, whatever the source encoding.
    pub fn image(&self, index: usize) -> DatasetResult<image::RgbImage> {
        let (path, _) = self.entry(index)?;
        decode_rgb(path)
    }

    /// Decode sample `index` and run the configured transform.
    pub fn get(&self, index: usize) -> DatasetResult<DatasetSample> {
        self.get_with(index, self.transform.as_ref())
    }

    /// Like `get`, with an explicit transform overriding the configured one.
    pub fn get_with(
        &self,
        index: usize,
        transform: Option<&TransformPipeline>,
    ) -> DatasetResult<DatasetSample> {
        let (path, label) = self.entry(index)?;
        let img = decode_rgb(path)?;
        Ok(match transform {
            Some(pipeline) => pipeline.apply(img, index, label),
            None => to_chw_sample(&img, index, label),
        })
    }
}

fn decode_rgb(path: &Path) -> DatasetResult<image::RgbImage> {
    let img = image::open(path).map_err(|e| SwaveDatasetError::Image {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(img.to_rgb8())
}
