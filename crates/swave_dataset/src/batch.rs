//! Batch iteration for training and evaluation.

use crate::aug::TransformPipeline;
use crate::dataset::SwaveDataset;
use crate::types::{DatasetResult, SwaveDatasetError};
use burn::tensor::{backend::Backend, Int, Tensor, TensorData};
use rand::{seq::SliceRandom, SeedableRng};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct ClassBatch<B: Backend> {
    /// Shape `[batch, 3, height, width]`.
    pub images: Tensor<B, 4>,
    /// Shape `[batch]`.
    pub targets: Tensor<B, 1, Int>,
    /// Dataset positions of the batch members, in batch order.
    pub indices: Vec<usize>,
}

/// Walks a fixed list of sample indices in minibatches. Each batch is decoded in
/// parallel on the rayon pool; batch order matches index order.
pub struct BatchIter {
    indices: Vec<usize>,
    cursor: usize,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    transform: Option<TransformPipeline>,
    processed_batches: usize,
    total_load_time: Duration,
}

impl BatchIter {
    pub fn new(indices: Vec<usize>, batch_size: usize, shuffle: bool, seed: u64) -> Self {
        let mut iter = Self {
            indices,
            cursor: 0,
            batch_size: batch_size.max(1),
            shuffle,
            seed,
            transform: None,
            processed_batches: 0,
            total_load_time: Duration::ZERO,
        };
        iter.reset(0);
        iter
    }

    /// Override the dataset's configured transform for every batch.
    pub fn with_transform(mut self, transform: Option<TransformPipeline>) -> Self {
        self.transform = transform;
        self
    }

    /// Rewind; with shuffling on, reorder deterministically for `epoch`.
    pub fn reset(&mut self, epoch: usize) {
        self.cursor = 0;
        if self.shuffle {
            self.indices.sort_unstable();
            let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
            self.indices.shuffle(&mut rng);
        }
    }

    pub fn order(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }

    pub fn avg_load_ms(&self) -> f64 {
        if self.processed_batches == 0 {
            0.0
        } else {
            self.total_load_time.as_secs_f64() * 1000.0 / self.processed_batches as f64
        }
    }

    pub fn next_batch<B: Backend>(
        &mut self,
        dataset: &SwaveDataset,
        device: &B::Device,
    ) -> DatasetResult<Option<ClassBatch<B>>> {
        if self.cursor >= self.indices.len() {
            return Ok(None);
        }
        let end = (self.cursor + self.batch_size).min(self.indices.len());
        let slice = &self.indices[self.cursor..end];
        self.cursor = end;

        let transform = self.transform.as_ref().or(dataset.transform());
        let t_load = Instant::now();
        let mut loaded: Vec<_> = slice
            .par_iter()
            .enumerate()
            .map(|(i, idx)| (i, dataset.get_with(*idx, transform)))
            .collect();
        loaded.sort_by_key(|(i, _)| *i);
        let load_elapsed = t_load.elapsed();

        let mut images_buf = Vec::new();
        let mut targets = Vec::with_capacity(slice.len());
        let mut indices = Vec::with_capacity(slice.len());
        let mut expected_size: Option<(u32, u32)> = None;
        for (_, res) in loaded {
            let sample = res?;
            let size = (sample.width, sample.height);
            match expected_size {
                None => expected_size = Some(size),
                Some(sz) if sz != size => {
                    let path = dataset
                        .index()
                        .path(sample.index)
                        .map(|p| p.to_path_buf())
                        .unwrap_or_default();
                    return Err(SwaveDatasetError::ImageSize {
                        path,
                        expected: sz,
                        actual: size,
                    });
                }
                _ => {}
            }
            images_buf.extend_from_slice(&sample.image_chw);
            targets.push(sample.label);
            indices.push(sample.index);
        }

        let Some((width, height)) = expected_size else {
            return Ok(None);
        };
        let batch_len = indices.len();
        let images = Tensor::<B, 4>::from_data(
            TensorData::new(images_buf, [batch_len, 3, height as usize, width as usize]),
            device,
        );
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets, [batch_len]), device);

        self.processed_batches += 1;
        self.total_load_time += load_elapsed;
        debug!(
            batch = self.processed_batches,
            samples = batch_len,
            load_ms = load_elapsed.as_secs_f64() * 1000.0,
            "assembled batch"
        );

        Ok(Some(ClassBatch {
            images,
            targets,
            indices,
        }))
    }
}
