//! Dataset loading, splitting, and Burn-compatible batching for SWAVE liver images.
//!
//! This crate provides utilities for:
//! - Reading per-case labels from a `.mat` (or `.json`) labeled-array file
//! - Indexing cases into image samples (one image or a fixed number of planes per case)
//! - Decoding samples as 3-channel images with an optional transform pipeline
//! - Stratified and random train/test splits with a fixed seed
//! - Burn-compatible batch iteration

pub mod aug;
pub mod dataset;
pub mod index;
pub mod labels;
pub mod splits;
pub mod types;

#[cfg(feature = "burn-runtime")]
pub mod batch;

pub use aug::{Normalize, TransformPipeline, TransformPipelineBuilder};
pub use dataset::{DatasetConfig, SwaveDataset};
pub use index::{build_index, IndexConfig, SampleIndex, SampleLayout};
pub use labels::{read_labels, MAX_CLASS_LABEL};
pub use splits::{
    expand_cases, split, split_dataset, split_random, split_sizes, split_stratified, Split,
    SplitConfig, SplitStrategy, SplitUnit,
};
pub use types::*;

#[cfg(feature = "burn-runtime")]
pub use batch::{BatchIter, ClassBatch};
