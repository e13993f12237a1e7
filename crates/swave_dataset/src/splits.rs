//! Train/test partitioning of sample indices.
//!
//! Both strategies size the subsets the same way: `train = round((1 - f) * n)` with
//! halves rounded away from zero, `test = n - train`.

use crate::dataset::SwaveDataset;
use crate::types::{DatasetResult, SwaveDatasetError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    #[default]
    Stratified,
    Random,
}

/// What the split partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitUnit {
    /// Individual samples; planes of one case may land on both sides.
    #[default]
    Sample,
    /// Whole cases; every plane follows its case.
    Case,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub strategy: SplitStrategy,
    pub test_fraction: f64,
    pub seed: u64,
    pub unit: SplitUnit,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            strategy: SplitStrategy::Stratified,
            test_fraction: 0.2,
            seed: 42,
            unit: SplitUnit::Sample,
        }
    }
}

/// Disjoint, sorted train/test indices covering `0..n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl Split {
    pub fn len(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split `labels` by `cfg.strategy`, ignoring `cfg.unit`.
pub fn split(labels: &[i64], cfg: &SplitConfig) -> DatasetResult<Split> {
    match cfg.strategy {
        SplitStrategy::Stratified => split_stratified(labels, cfg.test_fraction, cfg.seed),
        SplitStrategy::Random => split_random(labels.len(), cfg.test_fraction, cfg.seed),
    }
}

/// Split a dataset's sample indices, honoring `cfg.unit`.
pub fn split_dataset(dataset: &SwaveDataset, cfg: &SplitConfig) -> DatasetResult<Split> {
    match cfg.unit {
        SplitUnit::Sample => split(dataset.labels(), cfg),
        SplitUnit::Case => {
            let by_case = split(dataset.case_labels(), cfg)?;
            Ok(expand_cases(&by_case, dataset.index().samples_per_case()))
        }
    }
}

/// Map a split over 0-based case positions to the samples those cases own.
pub fn expand_cases(cases: &Split, samples_per_case: usize) -> Split {
    let expand = |ids: &[usize]| -> Vec<usize> {
        ids.iter()
            .flat_map(|c| c * samples_per_case..(c + 1) * samples_per_case)
            .collect()
    };
    Split {
        train: expand(&cases.train),
        test: expand(&cases.test),
    }
}

/// Subset sizes for `n` samples and test fraction `f`: `(train, test)`.
pub fn split_sizes(n: usize, test_fraction: f64) -> DatasetResult<(usize, usize)> {
    if n == 0 {
        return Err(SwaveDatasetError::InvalidSplit(
            "cannot split an empty dataset".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&test_fraction) {
        return Err(SwaveDatasetError::InvalidSplit(format!(
            "test fraction {test_fraction} outside [0, 1]"
        )));
    }
    let train = (((1.0 - test_fraction) * n as f64).round() as usize).min(n);
    Ok((train, n - train))
}

pub fn split_random(n: usize, test_fraction: f64, seed: u64) -> DatasetResult<Split> {
    let (train_size, _) = split_sizes(n, test_fraction)?;
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let mut test = order.split_off(train_size);
    let mut train = order;
    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}

/// Split so each label keeps its share of the test subset to within one sample.
pub fn split_stratified(labels: &[i64], test_fraction: f64, seed: u64) -> DatasetResult<Split> {
    let n = labels.len();
    let (_, test_size) = split_sizes(n, test_fraction)?;

    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        by_class.entry(*label).or_default().push(i);
    }

    let quotas = class_quotas(&by_class, n, test_size);
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - test_size);
    let mut test = Vec::with_capacity(test_size);
    for ((_, members), quota) in by_class.into_iter().zip(quotas) {
        let mut members = members;
        members.shuffle(&mut rng);
        let rest = members.split_off(quota);
        test.extend(members);
        train.extend(rest);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}

/// Largest-remainder allocation of `test_size` across classes, in class order.
fn class_quotas(by_class: &BTreeMap<i64, Vec<usize>>, n: usize, test_size: usize) -> Vec<usize> {
    let mut quotas = Vec::with_capacity(by_class.len());
    let mut remainders = Vec::with_capacity(by_class.len());
    for (slot, members) in by_class.values().enumerate() {
        let share = test_size * members.len();
        quotas.push(share / n);
        remainders.push((share % n, slot));
    }
    let assigned: usize = quotas.iter().sum();
    // Largest remainder first; earlier class wins ties.
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, slot) in remainders.into_iter().take(test_size - assigned) {
        quotas[slot] += 1;
    }
    quotas
}
