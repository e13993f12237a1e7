//! Reading per-case labels from a labeled-array file.
//!
//! MATLAB `.mat` (level 5) files are parsed with `matfile`. A `.json` file holding an
//! object of named integer arrays is accepted as well, which keeps fixtures readable.

use crate::types::{DatasetResult, SwaveDatasetError};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Labels are class indices in `0..MAX_CLASS_LABEL`.
pub const MAX_CLASS_LABEL: i64 = 1024;

/// Read the array `key` from `path`, flatten it, and check it has one entry per case.
pub fn read_labels(path: &Path, key: &str, expected_cases: usize) -> DatasetResult<Vec<i64>> {
    let is_json = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let labels = if is_json {
        read_json_labels(path, key)?
    } else {
        read_mat_labels(path, key)?
    };
    if labels.len() != expected_cases {
        return Err(SwaveDatasetError::Shape {
            expected: expected_cases,
            actual: labels.len(),
        });
    }
    debug!(path = %path.display(), key, count = labels.len(), "read label array");
    Ok(labels)
}

fn read_mat_labels(path: &Path, key: &str) -> DatasetResult<Vec<i64>> {
    let file = fs::File::open(path).map_err(|e| SwaveDatasetError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mat = matfile::MatFile::parse(file).map_err(|e| SwaveDatasetError::LabelFile {
        path: path.to_path_buf(),
        msg: format!("{e:?}"),
    })?;
    let array = mat
        .find_by_name(key)
        .ok_or_else(|| SwaveDatasetError::MissingKey {
            path: path.to_path_buf(),
            key: key.to_string(),
        })?;
    let values = numeric_to_f64(array.data());
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| class_index(v).ok_or_else(|| invalid_label(path, key, i, v)))
        .collect()
}

fn numeric_to_f64(data: &matfile::NumericData) -> Vec<f64> {
    use matfile::NumericData;
    match data {
        NumericData::Int8 { real, .. } => real.iter().map(|v| f64::from(*v)).collect(),
        NumericData::UInt8 { real, .. } => real.iter().map(|v| f64::from(*v)).collect(),
        NumericData::Int16 { real, .. } => real.iter().map(|v| f64::from(*v)).collect(),
        NumericData::UInt16 { real, .. } => real.iter().map(|v| f64::from(*v)).collect(),
        NumericData::Int32 { real, .. } => real.iter().map(|v| f64::from(*v)).collect(),
        NumericData::UInt32 { real, .. } => real.iter().map(|v| f64::from(*v)).collect(),
        NumericData::Int64 { real, .. } => real.iter().map(|v| *v as f64).collect(),
        NumericData::UInt64 { real, .. } => real.iter().map(|v| *v as f64).collect(),
        NumericData::Single { real, .. } => real.iter().map(|v| f64::from(*v)).collect(),
        NumericData::Double { real, .. } => real.clone(),
    }
}

fn read_json_labels(path: &Path, key: &str) -> DatasetResult<Vec<i64>> {
    let raw = fs::read(path).map_err(|e| SwaveDatasetError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let doc: serde_json::Value =
        serde_json::from_slice(&raw).map_err(|e| SwaveDatasetError::LabelFile {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })?;
    let value = doc.get(key).ok_or_else(|| SwaveDatasetError::MissingKey {
        path: path.to_path_buf(),
        key: key.to_string(),
    })?;

    let mut flat = Vec::new();
    flatten_json(value, &mut flat).map_err(|msg| SwaveDatasetError::LabelFile {
        path: path.to_path_buf(),
        msg: format!("`{key}`: {msg}"),
    })?;
    flat.into_iter()
        .enumerate()
        .map(|(i, v)| class_index(v).ok_or_else(|| invalid_label(path, key, i, v)))
        .collect()
}

fn flatten_json(value: &serde_json::Value, out: &mut Vec<f64>) -> Result<(), String> {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                flatten_json(item, out)?;
            }
            Ok(())
        }
        serde_json::Value::Number(n) => {
            let v = n
                .as_f64()
                .ok_or_else(|| format!("number {n} is not representable"))?;
            out.push(v);
            Ok(())
        }
        other => Err(format!("expected numbers, found {other}")),
    }
}

fn class_index(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && (0.0..MAX_CLASS_LABEL as f64).contains(&v) {
        Some(v as i64)
    } else {
        None
    }
}

fn invalid_label(path: &Path, key: &str, i: usize, v: f64) -> SwaveDatasetError {
    SwaveDatasetError::LabelFile {
        path: path.to_path_buf(),
        msg: format!("`{key}`[{i}] = {v} is not a class index in 0..{MAX_CLASS_LABEL}"),
    }
}
