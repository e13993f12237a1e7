mod common;

use common::{write_json_labels, write_mat_doubles};
use std::fs;
use swave_dataset::{read_labels, LabelSummary, SwaveDatasetError, MAX_CLASS_LABEL};

#[test]
fn reads_label_array_from_mat_file() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let values = [0.0, 1.0, 0.0, 0.0, 1.0];
    let path = write_mat_doubles(&tmp.path().join("label.mat"), "label", &values)?;

    let labels = read_labels(&path, "label", 5)?;
    assert_eq!(labels, vec![0, 1, 0, 0, 1]);
    Ok(())
}

#[test]
fn mat_file_without_key_is_missing_key() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = write_mat_doubles(&tmp.path().join("label.mat"), "label", &[0.0, 1.0])?;
    match read_labels(&path, "labels_v2", 2) {
        Err(SwaveDatasetError::MissingKey { key, .. }) => assert_eq!(key, "labels_v2"),
        other => panic!("expected MissingKey, got {other:?}"),
    }
    Ok(())
}

#[test]
fn json_labels_are_flattened() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("label.json");
    fs::write(&path, r#"{"label": [[0], [1], [1]], "other": [5]}"#)?;
    assert_eq!(read_labels(&path, "label", 3)?, vec![0, 1, 1]);
    Ok(())
}

#[test]
fn wrong_length_is_a_shape_error() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("label.json");
    write_json_labels(&path, "label", &[0, 1, 0])?;
    match read_labels(&path, "label", 46) {
        Err(SwaveDatasetError::Shape { expected, actual }) => {
            assert_eq!((expected, actual), (46, 3));
        }
        other => panic!("expected Shape, got {other:?}"),
    }
    Ok(())
}

#[test]
fn fractional_labels_are_rejected() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("label.json");
    fs::write(&path, r#"{"label": [0, 0.5]}"#)?;
    assert!(matches!(
        read_labels(&path, "label", 2),
        Err(SwaveDatasetError::LabelFile { .. })
    ));
    Ok(())
}

#[test]
fn out_of_range_labels_are_rejected() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("label.mat");
    write_mat_doubles(&path, "label", &[0.0, 1.0, 1e12])?;
    assert!(matches!(
        read_labels(&path, "label", 3),
        Err(SwaveDatasetError::LabelFile { .. })
    ));

    let json = tmp.path().join("label.json");
    fs::write(&json, r#"{"label": [0, -1]}"#)?;
    assert!(matches!(
        read_labels(&json, "label", 2),
        Err(SwaveDatasetError::LabelFile { .. })
    ));

    let edge = tmp.path().join("edge.json");
    fs::write(&edge, format!(r#"{{"label": [0, {}]}}"#, MAX_CLASS_LABEL - 1))?;
    assert_eq!(read_labels(&edge, "label", 2)?, vec![0, MAX_CLASS_LABEL - 1]);
    Ok(())
}

#[test]
fn unreadable_label_file_reports_io() {
    let err = read_labels(std::path::Path::new("/nonexistent/label.mat"), "label", 1);
    assert!(matches!(err, Err(SwaveDatasetError::Io { .. })));
}

#[test]
fn summary_counts_each_class() {
    let summary = LabelSummary::from_labels(&[0, 1, 0, 0, 1]);
    assert_eq!(summary.total, 5);
    assert_eq!(summary.count(0), 3);
    assert_eq!(summary.count(1), 2);
    assert_eq!(summary.count(2), 0);
    assert_eq!(summary.describe(), "total=5 classes=[0:3 1:2]");
}
