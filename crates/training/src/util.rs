use std::path::PathBuf;

use burn::backend::Autodiff;
use burn::optim::AdamConfig;
use clap::{Parser, ValueEnum};
use models::SwaveCnn;
use swave_dataset::{split_dataset, SampleLayout, SplitStrategy, SplitUnit, SwaveDataset};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::checkpoint::checkpoint_file;
use crate::config::ExperimentConfig;
use crate::metrics::ClassificationReport;
use crate::plots::render_run_plots;
use crate::session::{Evaluation, TrainingOutcome, TrainingSession};
use crate::TrainBackend;

pub type ADBackend = Autodiff<TrainBackend>;

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendKind {
    NdArray,
    Wgpu,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// One image per case: `SWAVE_<case>.png`.
    Single,
    /// A fixed number of planes per case: `SWAVE<case>_<plane>.png`.
    Planes,
}

/// Dataset and split flags shared by `train` and `eval`. Each flag overrides
/// the matching config value when given.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// TOML experiment config (falls back to $SWAVE_TRAIN_CONFIG, then ./swave-train.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Directory holding the PNG images.
    #[arg(long)]
    pub image_dir: Option<PathBuf>,
    /// Label file (.mat or .json).
    #[arg(long)]
    pub label_file: Option<PathBuf>,
    /// Variable name of the label array inside the label file.
    #[arg(long)]
    pub label_key: Option<String>,
    /// Number of cases to index.
    #[arg(long)]
    pub case_count: Option<usize>,
    /// File naming layout.
    #[arg(long, value_enum)]
    pub layout: Option<LayoutKind>,
    /// Planes per case (planes layout only).
    #[arg(long)]
    pub planes_per_case: Option<usize>,
    /// Split strategy.
    #[arg(long, value_enum)]
    pub split: Option<SplitStrategyArg>,
    /// Split individual samples or whole cases.
    #[arg(long, value_enum)]
    pub split_unit: Option<SplitUnitArg>,
    /// Fraction of samples held out for testing.
    #[arg(long)]
    pub test_fraction: Option<f64>,
    /// Seed for the split, minibatch order and augmentation.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Square side images are resized to.
    #[arg(long)]
    pub image_size: Option<u32>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SplitStrategyArg {
    Stratified,
    Random,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SplitUnitArg {
    Sample,
    Case,
}

#[derive(Parser, Debug)]
#[command(name = "train", about = "Train the SWAVE liver classifier and report test metrics")]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    pub backend: BackendKind,
    /// Number of epochs.
    #[arg(long)]
    pub epochs: Option<usize>,
    /// Batch size.
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Learning rate.
    #[arg(long)]
    pub lr: Option<f64>,
    /// Save the best model here (no checkpoint is written otherwise).
    #[arg(long)]
    pub checkpoint_out: Option<PathBuf>,
    /// Write per-epoch metrics as JSON lines.
    #[arg(long)]
    pub metrics_out: Option<PathBuf>,
    #[command(flatten)]
    pub plots: PlotArgs,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct PlotArgs {
    /// Directory for loss.png, accuracy.png and confusion_matrix.png.
    #[arg(long)]
    pub plot_dir: Option<PathBuf>,
    /// Skip rendering the PNG charts.
    #[arg(long)]
    pub no_plots: bool,
}

impl PlotArgs {
    pub fn apply(&self, cfg: &mut ExperimentConfig) {
        if let Some(dir) = &self.plot_dir {
            cfg.output.set_plot_dir(dir);
        }
        if self.no_plots {
            cfg.output.plots = false;
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "eval",
    about = "Evaluate a saved SWAVE classifier checkpoint on the test split"
)]
pub struct EvalArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    pub backend: BackendKind,
    /// Checkpoint written by `train --checkpoint-out`.
    #[arg(long)]
    pub checkpoint: PathBuf,
    /// Evaluate every sample instead of the held-out split.
    #[arg(long)]
    pub all: bool,
    /// Batch size (defaults to `train.batch_size` from the config).
    #[arg(long)]
    pub batch_size: Option<usize>,
    #[command(flatten)]
    pub plots: PlotArgs,
}

impl EvalArgs {
    pub fn resolve(&self) -> anyhow::Result<ExperimentConfig> {
        let mut cfg = self.data.resolve()?;
        if let Some(batch_size) = self.batch_size {
            cfg.train.batch_size = batch_size;
        }
        self.plots.apply(&mut cfg);
        if cfg.train.batch_size == 0 {
            anyhow::bail!("batch size must be at least 1");
        }
        Ok(cfg)
    }
}

impl DataArgs {
    /// Load the config file and apply the flags on top of it.
    pub fn resolve(&self) -> anyhow::Result<ExperimentConfig> {
        let mut cfg = ExperimentConfig::load(self.config.as_deref())?;
        self.apply(&mut cfg);
        Ok(cfg)
    }

    pub fn apply(&self, cfg: &mut ExperimentConfig) {
        if let Some(dir) = &self.image_dir {
            cfg.dataset.image_dir = dir.clone();
        }
        if let Some(file) = &self.label_file {
            cfg.dataset.label_file = file.clone();
        }
        if let Some(key) = &self.label_key {
            cfg.dataset.label_key = key.clone();
        }
        if let Some(count) = self.case_count {
            cfg.dataset.case_count = count;
        }
        match (self.layout, self.planes_per_case) {
            (Some(LayoutKind::Single), _) => cfg.dataset.layout = SampleLayout::SinglePerCase,
            (Some(LayoutKind::Planes), per_case) => {
                let current = cfg.dataset.layout.samples_per_case();
                cfg.dataset.layout = SampleLayout::Planes {
                    per_case: per_case.unwrap_or(if current > 1 { current } else { 15 }),
                };
            }
            (None, Some(per_case)) => cfg.dataset.layout = SampleLayout::Planes { per_case },
            (None, None) => {}
        }
        if let Some(strategy) = self.split {
            cfg.split.strategy = match strategy {
                SplitStrategyArg::Stratified => SplitStrategy::Stratified,
                SplitStrategyArg::Random => SplitStrategy::Random,
            };
        }
        if let Some(unit) = self.split_unit {
            cfg.split.unit = match unit {
                SplitUnitArg::Sample => SplitUnit::Sample,
                SplitUnitArg::Case => SplitUnit::Case,
            };
        }
        if let Some(f) = self.test_fraction {
            cfg.split.test_fraction = f;
        }
        if let Some(seed) = self.seed {
            cfg.split.seed = seed;
            cfg.train.seed = seed;
        }
        if let Some(size) = self.image_size {
            cfg.train.image_size = size;
        }
    }
}

impl TrainArgs {
    pub fn resolve(&self) -> anyhow::Result<ExperimentConfig> {
        let mut cfg = self.data.resolve()?;
        if let Some(epochs) = self.epochs {
            cfg.train.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            cfg.train.batch_size = batch_size;
        }
        if let Some(lr) = self.lr {
            cfg.train.lr = lr;
        }
        if self.checkpoint_out.is_some() {
            cfg.output.checkpoint = self.checkpoint_out.clone();
        }
        if self.metrics_out.is_some() {
            cfg.output.metrics_path = self.metrics_out.clone();
        }
        self.plots.apply(&mut cfg);
        Ok(cfg)
    }
}

/// Install the fmt subscriber; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    validate_backend_choice(args.backend)?;
    let cfg = args.resolve()?;
    let outcome = train_with_config(&cfg)?;
    print_report(&outcome.evaluation, &cfg);
    match outcome.best {
        Some((epoch, accuracy)) => {
            println!("best test accuracy {accuracy:.4} at epoch {}", epoch + 1)
        }
        None => println!("no epochs run; reported metrics are for the untrained model"),
    }
    let names = class_names(&cfg, &outcome.evaluation);
    for path in render_run_plots(
        &outcome.history,
        &outcome.evaluation.confusion,
        &names,
        &cfg.output,
    )? {
        println!("Saved plot to {}", path.display());
    }
    if let Some(path) = saved_checkpoint(&cfg, outcome.best) {
        println!("Saved best checkpoint to {}", path.display());
    }
    Ok(())
}

/// The checkpoint file a run left on disk: only written once a best snapshot exists.
pub fn saved_checkpoint(cfg: &ExperimentConfig, best: Option<(usize, f64)>) -> Option<PathBuf> {
    best.and(cfg.output.checkpoint.as_deref()).map(checkpoint_file)
}

pub fn class_names(cfg: &ExperimentConfig, eval: &Evaluation) -> Vec<String> {
    (0..eval.confusion.num_classes())
        .map(|c| cfg.model.class_name(c))
        .collect()
}

/// Open the dataset, split it and run a full training session.
pub fn train_with_config(
    cfg: &ExperimentConfig,
) -> anyhow::Result<TrainingOutcome<TrainBackend>> {
    let dataset = open_dataset(cfg)?;
    let split = split_dataset(&dataset, &cfg.split).map_err(|e| anyhow::anyhow!("{e}"))?;
    println!(
        "split ({:?}, by {:?}): train={} test={}",
        cfg.split.strategy,
        cfg.split.unit,
        split.train.len(),
        split.test.len()
    );

    let num_classes = resolve_num_classes(cfg, &dataset)?;
    let model_cfg = cfg.model.to_model_config(num_classes);
    check_image_size(cfg.train.image_size, model_cfg.min_input_side())?;
    if cfg.train.batch_size == 0 {
        anyhow::bail!("train.batch_size must be at least 1");
    }

    let device = <ADBackend as burn::tensor::backend::Backend>::Device::default();
    let model = SwaveCnn::<ADBackend>::new(model_cfg, &device);
    let optim = AdamConfig::new().init::<ADBackend, SwaveCnn<ADBackend>>();
    let mut session = TrainingSession::new(model, optim, cfg.train.clone(), device)
        .with_metrics_path(cfg.output.metrics_path.clone())
        .with_checkpoint_path(cfg.output.checkpoint.clone());
    session.run(&dataset, &split)
}

pub fn open_dataset(cfg: &ExperimentConfig) -> anyhow::Result<SwaveDataset> {
    let dataset_cfg = cfg.dataset.to_dataset_config();
    let dataset = SwaveDataset::open(&dataset_cfg).map_err(|e| {
        anyhow::anyhow!(
            "failed to open dataset at {}: {e}",
            dataset_cfg.image_dir.display()
        )
    })?;
    println!(
        "dataset: {} samples from {} cases ({})",
        dataset.len(),
        dataset.case_labels().len(),
        dataset.label_summary().describe()
    );
    Ok(dataset)
}

/// Configured class count, widened to cover every label present.
pub fn resolve_num_classes(cfg: &ExperimentConfig, dataset: &SwaveDataset) -> anyhow::Result<usize> {
    if dataset.labels().iter().any(|l| *l < 0) {
        anyhow::bail!("labels must be non-negative class indices");
    }
    let seen = dataset.num_classes();
    if seen > cfg.model.num_classes {
        info!(
            configured = cfg.model.num_classes,
            seen, "widening classifier to cover every label"
        );
    }
    Ok(cfg.model.num_classes.max(seen).max(1))
}

pub fn check_image_size(image_size: u32, min_side: usize) -> anyhow::Result<()> {
    if (image_size as usize) < min_side {
        anyhow::bail!(
            "image_size {image_size} is smaller than the model's minimum input side {min_side}"
        );
    }
    Ok(())
}

/// Print the confusion matrix and classification report for `eval`.
pub fn print_report(eval: &Evaluation, cfg: &ExperimentConfig) {
    let names = class_names(cfg, eval);
    println!("Confusion matrix ({} test samples):", eval.len());
    print!("{}", eval.confusion.render(&names));
    println!();
    println!("Classification report:");
    print!(
        "{}",
        ClassificationReport::from_confusion(&eval.confusion, &names)
    );
}

pub fn validate_backend_choice(kind: BackendKind) -> anyhow::Result<()> {
    let built_wgpu = cfg!(feature = "backend-wgpu");
    match (kind, built_wgpu) {
        (BackendKind::Wgpu, false) => {
            anyhow::bail!("backend-wgpu feature not enabled; rebuild with --features backend-wgpu or choose ndarray backend")
        }
        (BackendKind::NdArray, true) => {
            println!("note: built with backend-wgpu; training will still use the WGPU backend despite --backend ndarray");
        }
        _ => {}
    }
    Ok(())
}
