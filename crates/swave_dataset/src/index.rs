//! Case-to-sample indexing.
//!
//! Every case owns a fixed number of images. The index lists them in ascending case
//! order, then ascending plane order, so a sample position is a pure function of
//! `(case, plane)`: `(case - 1) * samples_per_case + (plane - 1)`.

use crate::types::{DatasetResult, SwaveDatasetError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PREFIX: &str = "SWAVE";
pub const DEFAULT_EXTENSION: &str = "png";

/// How many images each case contributes and how they are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SampleLayout {
    /// One image per case: `{prefix}_{case}.png`.
    SinglePerCase,
    /// A fixed number of planes per case: `{prefix}{case}_{plane}.png`.
    Planes { per_case: usize },
}

impl Default for SampleLayout {
    fn default() -> Self {
        SampleLayout::Planes { per_case: 15 }
    }
}

impl SampleLayout {
    pub fn samples_per_case(&self) -> usize {
        match self {
            SampleLayout::SinglePerCase => 1,
            SampleLayout::Planes { per_case } => *per_case,
        }
    }

    /// File name for a 1-based `case` and 1-based `plane`.
    pub fn file_name(&self, prefix: &str, case: usize, plane: usize) -> String {
        match self {
            SampleLayout::SinglePerCase => format!("{prefix}_{case}.{DEFAULT_EXTENSION}"),
            SampleLayout::Planes { .. } => format!("{prefix}{case}_{plane}.{DEFAULT_EXTENSION}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub image_dir: PathBuf,
    pub prefix: String,
    pub case_count: usize,
    pub layout: SampleLayout,
}

impl IndexConfig {
    pub fn new(image_dir: impl Into<PathBuf>, case_count: usize, layout: SampleLayout) -> Self {
        Self {
            image_dir: image_dir.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            case_count,
            layout,
        }
    }

    pub fn expected_samples(&self) -> usize {
        self.case_count * self.layout.samples_per_case()
    }

    pub fn sample_path(&self, case: usize, plane: usize) -> PathBuf {
        self.image_dir
            .join(self.layout.file_name(&self.prefix, case, plane))
    }
}

/// Parallel path/label arrays, immutable once built.
#[derive(Debug, Clone)]
pub struct SampleIndex {
    paths: Vec<PathBuf>,
    labels: Vec<i64>,
    samples_per_case: usize,
}

impl SampleIndex {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn path(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(PathBuf::as_path)
    }

    pub fn label(&self, index: usize) -> Option<i64> {
        self.labels.get(index).copied()
    }

    pub fn samples_per_case(&self) -> usize {
        self.samples_per_case
    }

    /// 1-based case id owning sample `index`.
    pub fn case_of(&self, index: usize) -> Option<usize> {
        (index < self.len()).then(|| index / self.samples_per_case + 1)
    }

    /// Sample position of a 1-based `(case, plane)` pair.
    pub fn locate(&self, case: usize, plane: usize) -> Option<usize> {
        if case == 0 || plane == 0 || plane > self.samples_per_case {
            return None;
        }
        let index = (case - 1) * self.samples_per_case + (plane - 1);
        (index < self.len()).then_some(index)
    }
}

/// Build the full index, checking that every derived file exists.
///
/// Fails on the first missing file; no partial index is ever returned.
pub fn build_index(cfg: &IndexConfig, case_labels: &[i64]) -> DatasetResult<SampleIndex> {
    if case_labels.len() != cfg.case_count {
        return Err(SwaveDatasetError::Shape {
            expected: cfg.case_count,
            actual: case_labels.len(),
        });
    }
    let per_case = cfg.layout.samples_per_case();
    if per_case == 0 {
        return Err(SwaveDatasetError::Other(
            "sample layout must have at least one image per case".to_string(),
        ));
    }

    let expected = cfg.expected_samples();
    let mut paths = Vec::with_capacity(expected);
    let mut labels = Vec::with_capacity(expected);
    for (c, label) in case_labels.iter().enumerate() {
        for p in 0..per_case {
            let path = cfg.sample_path(c + 1, p + 1);
            if !path.is_file() {
                return Err(SwaveDatasetError::MissingFile { path });
            }
            paths.push(path);
            labels.push(*label);
        }
    }

    if paths.len() != expected {
        return Err(SwaveDatasetError::CountMismatch {
            expected,
            actual: paths.len(),
        });
    }
    Ok(SampleIndex {
        paths,
        labels,
        samples_per_case: per_case,
    })
}

#[cfg(test)]
mod tests {
    use super::SampleLayout;

    #[test]
    fn file_names_follow_layout() {
        let planes = SampleLayout::Planes { per_case: 15 };
        assert_eq!(planes.file_name("SWAVE", 3, 7), "SWAVE3_7.png");
        assert_eq!(SampleLayout::SinglePerCase.file_name("SWAVE", 12, 1), "SWAVE_12.png");
        assert_eq!(SampleLayout::SinglePerCase.samples_per_case(), 1);
    }
}
