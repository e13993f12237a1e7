//! Epoch loop: train on the train split, evaluate on the test split, keep the best model.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use models::SwaveCnn;
use serde::Serialize;
use swave_dataset::{BatchIter, Split, SwaveDataset, TransformPipeline};
use tracing::{debug, info};

use crate::checkpoint::save_model;
use crate::config::TrainConfig;
use crate::metrics::{ClassMetrics, ConfusionMatrix};

/// Predictions of one model over a fixed set of samples.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub loss: f64,
    pub indices: Vec<usize>,
    pub predictions: Vec<i64>,
    pub targets: Vec<i64>,
    pub confusion: ConfusionMatrix,
}

impl Evaluation {
    pub fn accuracy(&self) -> f64 {
        self.confusion.accuracy()
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// Precision/recall/F1 of class 1 for binary problems, macro average otherwise.
    pub fn headline(&self) -> ClassMetrics {
        let cm = &self.confusion;
        if cm.num_classes() == 2 {
            return cm.class_metrics(1);
        }
        let n = cm.num_classes().max(1) as f64;
        (0..cm.num_classes())
            .map(|c| cm.class_metrics(c))
            .fold(
                ClassMetrics {
                    support: cm.total(),
                    ..Default::default()
                },
                |mut acc, m| {
                    acc.precision += m.precision / n;
                    acc.recall += m.recall / n;
                    acc.f1 += m.f1 / n;
                    acc
                },
            )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EpochStats {
    pub loss: f64,
    pub accuracy: f64,
    pub samples: usize,
    pub batches: usize,
    pub avg_load_ms: f64,
}

/// One line of the metrics log.
#[derive(Debug, Clone, Serialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub test_loss: f64,
    pub test_accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub improved: bool,
}

pub struct BestSnapshot<B: Backend> {
    pub model: SwaveCnn<B>,
    pub epoch: usize,
    pub accuracy: f64,
}

pub struct TrainingOutcome<B: Backend> {
    pub history: Vec<EpochRecord>,
    /// Epoch and test accuracy of the kept model; None when no epoch ran.
    pub best: Option<(usize, f64)>,
    /// The best snapshot, or the untrained model when no epoch ran.
    pub model: SwaveCnn<B>,
    /// `model` evaluated on the test split.
    pub evaluation: Evaluation,
}

/// Owns the model under training, its optimizer and the best snapshot so far.
pub struct TrainingSession<B: AutodiffBackend, O: Optimizer<SwaveCnn<B>, B>> {
    model: SwaveCnn<B>,
    optim: O,
    device: B::Device,
    config: TrainConfig,
    transform: TransformPipeline,
    best: Option<BestSnapshot<B::InnerBackend>>,
    history: Vec<EpochRecord>,
    metrics_path: Option<PathBuf>,
    checkpoint_path: Option<PathBuf>,
}

impl<B: AutodiffBackend, O: Optimizer<SwaveCnn<B>, B>> TrainingSession<B, O> {
    pub fn new(model: SwaveCnn<B>, optim: O, config: TrainConfig, device: B::Device) -> Self {
        let transform = config.transform_pipeline();
        Self {
            model,
            optim,
            device,
            config,
            transform,
            best: None,
            history: Vec::new(),
            metrics_path: None,
            checkpoint_path: None,
        }
    }

    /// Append one JSON record per epoch to `path` (truncated when the run starts).
    pub fn with_metrics_path(mut self, path: Option<PathBuf>) -> Self {
        self.metrics_path = path;
        self
    }

    /// Save the best model here whenever it is replaced.
    pub fn with_checkpoint_path(mut self, path: Option<PathBuf>) -> Self {
        self.checkpoint_path = path;
        self
    }

    pub fn model(&self) -> &SwaveCnn<B> {
        &self.model
    }

    pub fn best(&self) -> Option<&BestSnapshot<B::InnerBackend>> {
        self.best.as_ref()
    }

    pub fn history(&self) -> &[EpochRecord] {
        &self.history
    }

    pub fn eval_transform(&self) -> TransformPipeline {
        self.transform.eval()
    }

    /// One pass over `indices` in a per-epoch shuffled order, one optimizer step per batch.
    pub fn train_epoch(
        &mut self,
        dataset: &SwaveDataset,
        indices: &[usize],
        epoch: usize,
    ) -> anyhow::Result<EpochStats> {
        let transform = TransformPipeline {
            seed: self.transform.seed.map(|s| s.wrapping_add(epoch as u64)),
            ..self.transform.clone()
        };
        let mut iter = BatchIter::new(
            indices.to_vec(),
            self.config.batch_size,
            true,
            self.config.seed,
        )
        .with_transform(Some(transform));
        iter.reset(epoch);
        let loss_fn = CrossEntropyLossConfig::new().init(&self.device);

        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;
        let mut batches = 0usize;
        while let Some(batch) = iter.next_batch::<B>(dataset, &self.device)? {
            let batch_len = batch.indices.len();
            let targets: Vec<i64> = batch.targets.clone().into_data().iter::<i64>().collect();

            let logits = self.model.forward(batch.images);
            let predictions: Vec<i64> = logits
                .clone()
                .detach()
                .argmax(1)
                .reshape([batch_len])
                .into_data()
                .iter::<i64>()
                .collect();
            let loss = loss_fn.forward(logits, batch.targets);
            let loss_val = scalar(loss.clone().detach().into_data().iter::<f32>());

            let grads = GradientsParams::from_grads(loss.backward(), &self.model);
            self.model = self.optim.step(self.config.lr, self.model.clone(), grads);

            loss_sum += loss_val * batch_len as f64;
            correct += predictions
                .iter()
                .zip(&targets)
                .filter(|(p, t)| p == t)
                .count();
            seen += batch_len;
            batches += 1;
            debug!(epoch, batch = batches, loss = loss_val, "train step");
        }

        Ok(EpochStats {
            loss: mean(loss_sum, seen),
            accuracy: mean(correct as f64, seen),
            samples: seen,
            batches,
            avg_load_ms: iter.avg_load_ms(),
        })
    }

    /// Evaluate the current weights without gradient tracking or dropout.
    pub fn evaluate(&self, dataset: &SwaveDataset, indices: &[usize]) -> anyhow::Result<Evaluation> {
        let model = self.model.valid();
        evaluate_model(
            &model,
            dataset,
            indices,
            self.config.batch_size,
            &self.transform.eval(),
            &self.device,
        )
    }

    /// Train for the configured number of epochs, evaluating on `split.test` after each.
    ///
    /// The best snapshot is taken on the first epoch and replaced only when test
    /// accuracy strictly improves.
    pub fn run(
        &mut self,
        dataset: &SwaveDataset,
        split: &Split,
    ) -> anyhow::Result<TrainingOutcome<B::InnerBackend>> {
        let mut metrics_file = self.open_metrics_file()?;
        info!(
            train = split.train.len(),
            test = split.test.len(),
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            lr = self.config.lr,
            "starting training"
        );

        for epoch in 0..self.config.epochs {
            let stats = self.train_epoch(dataset, &split.train, epoch)?;
            let eval = self.evaluate(dataset, &split.test)?;
            let accuracy = eval.accuracy();
            let improved = self.best.as_ref().map_or(true, |b| accuracy > b.accuracy);
            if improved {
                self.replace_best(epoch, accuracy)?;
            }

            let headline = eval.headline();
            let record = EpochRecord {
                epoch,
                train_loss: stats.loss,
                train_accuracy: stats.accuracy,
                test_loss: eval.loss,
                test_accuracy: accuracy,
                precision: headline.precision,
                recall: headline.recall,
                f1: headline.f1,
                improved,
            };
            info!(
                epoch = epoch + 1,
                epochs = self.config.epochs,
                train_loss = record.train_loss,
                train_acc = record.train_accuracy,
                test_loss = record.test_loss,
                test_acc = record.test_accuracy,
                precision = record.precision,
                recall = record.recall,
                f1 = record.f1,
                load_ms = stats.avg_load_ms,
                "epoch complete"
            );
            if let Some(file) = metrics_file.as_mut() {
                serde_json::to_writer(&mut *file, &record)?;
                writeln!(file)?;
                file.flush()?;
            }
            self.history.push(record);
        }

        let (model, best) = match self.best.as_ref() {
            Some(b) => (b.model.clone(), Some((b.epoch, b.accuracy))),
            None => (self.model.valid(), None),
        };
        let evaluation = evaluate_model(
            &model,
            dataset,
            &split.test,
            self.config.batch_size,
            &self.transform.eval(),
            &self.device,
        )?;
        if let Some((epoch, accuracy)) = best {
            info!(best_epoch = epoch + 1, best_accuracy = accuracy, "training finished");
        }

        Ok(TrainingOutcome {
            history: self.history.clone(),
            best,
            model,
            evaluation,
        })
    }

    fn replace_best(&mut self, epoch: usize, accuracy: f64) -> anyhow::Result<()> {
        let model = self.model.valid();
        if let Some(path) = &self.checkpoint_path {
            save_model(&model, path)?;
            debug!(path = %path.display(), epoch, "saved best checkpoint");
        }
        self.best = Some(BestSnapshot {
            model,
            epoch,
            accuracy,
        });
        Ok(())
    }

    fn open_metrics_file(&self) -> anyhow::Result<Option<File>> {
        let Some(path) = &self.metrics_path else {
            return Ok(None);
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| anyhow::anyhow!("failed to open metrics file {}: {e}", path.display()))?;
        Ok(Some(file))
    }
}

/// Run `model` over `indices` in order and collect predictions, loss and confusion matrix.
pub fn evaluate_model<B: Backend>(
    model: &SwaveCnn<B>,
    dataset: &SwaveDataset,
    indices: &[usize],
    batch_size: usize,
    transform: &TransformPipeline,
    device: &B::Device,
) -> anyhow::Result<Evaluation> {
    let mut iter = BatchIter::new(indices.to_vec(), batch_size, false, 0)
        .with_transform(Some(transform.clone()));
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    let mut loss_sum = 0.0f64;
    let mut order = Vec::with_capacity(indices.len());
    let mut predictions = Vec::with_capacity(indices.len());
    let mut targets = Vec::with_capacity(indices.len());
    while let Some(batch) = iter.next_batch::<B>(dataset, device)? {
        let batch_len = batch.indices.len();
        targets.extend(batch.targets.clone().into_data().iter::<i64>());
        let logits = model.forward(batch.images);
        predictions.extend(
            logits
                .clone()
                .argmax(1)
                .reshape([batch_len])
                .into_data()
                .iter::<i64>(),
        );
        let loss = loss_fn.forward(logits, batch.targets);
        loss_sum += scalar(loss.into_data().iter::<f32>()) * batch_len as f64;
        order.extend(batch.indices);
    }

    let confusion = ConfusionMatrix::from_predictions(&targets, &predictions, model.num_classes());
    Ok(Evaluation {
        loss: mean(loss_sum, targets.len()),
        indices: order,
        predictions,
        targets,
        confusion,
    })
}

fn scalar(mut values: impl Iterator<Item = f32>) -> f64 {
    values.next().map(f64::from).unwrap_or(0.0)
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
