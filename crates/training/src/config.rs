use std::path::{Path, PathBuf};

use serde::Deserialize;
use swave_dataset::{DatasetConfig, Normalize, SampleLayout, SplitConfig, TransformPipeline};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_NAME: &str = "swave-train.toml";
pub const CONFIG_ENV: &str = "SWAVE_TRAIN_CONFIG";

/// Everything a training run needs, as read from TOML. Missing keys take defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub dataset: DatasetSection,
    pub split: SplitConfig,
    pub train: TrainConfig,
    pub model: ModelSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetSection {
    pub image_dir: PathBuf,
    pub label_file: PathBuf,
    pub label_key: String,
    pub case_count: usize,
    pub prefix: String,
    pub layout: SampleLayout,
}

impl Default for DatasetSection {
    fn default() -> Self {
        let defaults = DatasetConfig::default();
        Self {
            image_dir: defaults.image_dir,
            label_file: defaults.label_file,
            label_key: defaults.label_key,
            case_count: defaults.case_count,
            prefix: defaults.prefix,
            layout: defaults.layout,
        }
    }
}

impl DatasetSection {
    pub fn to_dataset_config(&self) -> DatasetConfig {
        DatasetConfig {
            image_dir: self.image_dir.clone(),
            label_file: self.label_file.clone(),
            label_key: self.label_key.clone(),
            case_count: self.case_count,
            layout: self.layout,
            prefix: self.prefix.clone(),
            transform: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub lr: f64,
    /// Images are resized to `image_size x image_size`.
    pub image_size: u32,
    pub flip_prob: f32,
    /// Map pixels from [0, 1] to [-1, 1].
    pub normalize: bool,
    /// Seed for minibatch order and augmentation.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 20,
            batch_size: 16,
            lr: 1e-3,
            image_size: 128,
            flip_prob: 0.0,
            normalize: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub num_classes: usize,
    pub channels: Vec<usize>,
    pub hidden: usize,
    pub dropout: f64,
    /// Display names for the report, indexed by label.
    pub class_names: Vec<String>,
}

impl Default for ModelSection {
    fn default() -> Self {
        let defaults = models::SwaveCnnConfig::default();
        Self {
            num_classes: defaults.num_classes,
            channels: defaults.channels,
            hidden: defaults.hidden,
            dropout: defaults.dropout,
            class_names: Vec::new(),
        }
    }
}

impl ModelSection {
    pub fn to_model_config(&self, num_classes: usize) -> models::SwaveCnnConfig {
        models::SwaveCnnConfig {
            num_classes,
            channels: self.channels.clone(),
            hidden: self.hidden,
            dropout: self.dropout,
            ..Default::default()
        }
    }

    pub fn class_name(&self, label: usize) -> String {
        self.class_names
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Best-model checkpoint; nothing is written when unset.
    pub checkpoint: Option<PathBuf>,
    /// Per-epoch metrics, one JSON object per line.
    pub metrics_path: Option<PathBuf>,
    /// Render the loss/accuracy curves and the confusion heatmap as PNG.
    pub plots: bool,
    pub loss_plot: PathBuf,
    pub accuracy_plot: PathBuf,
    pub confusion_plot: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self::with_plot_dir(Path::new("plots"))
    }
}

impl OutputSection {
    /// Defaults with the three plot files placed under `dir`.
    pub fn with_plot_dir(dir: &Path) -> Self {
        Self {
            checkpoint: None,
            metrics_path: None,
            plots: true,
            loss_plot: dir.join("loss.png"),
            accuracy_plot: dir.join("accuracy.png"),
            confusion_plot: dir.join("confusion_matrix.png"),
        }
    }

    pub fn set_plot_dir(&mut self, dir: &Path) {
        let placed = Self::with_plot_dir(dir);
        self.loss_plot = placed.loss_plot;
        self.accuracy_plot = placed.accuracy_plot;
        self.confusion_plot = placed.confusion_plot;
    }
}

impl ExperimentConfig {
    /// Resolve the config file: explicit path, then `$SWAVE_TRAIN_CONFIG`, then
    /// `swave-train.toml` in the working directory. Defaults when none exists.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_path(Path::new(&path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_NAME);
        if default_path.exists() {
            return Self::from_path(default_path);
        }
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        let cfg = Self::from_toml(&raw)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        info!(path = %path.display(), "loaded experiment config");
        cfg.warn_if_invalid();
        Ok(cfg)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn warn_if_invalid(&self) {
        if !self.dataset.image_dir.exists() {
            warn!(
                "image_dir does not exist: {}",
                self.dataset.image_dir.display()
            );
        }
        if !self.dataset.label_file.exists() {
            warn!(
                "label_file does not exist: {}",
                self.dataset.label_file.display()
            );
        }
        if self.train.epochs == 0 {
            warn!("train.epochs is 0; the run will only evaluate the initial model");
        }
    }
}

impl TrainConfig {
    /// Training-time pipeline; `TransformPipeline::eval` strips the random parts.
    pub fn transform_pipeline(&self) -> TransformPipeline {
        TransformPipeline::builder()
            .target_size(Some((self.image_size, self.image_size)))
            .flip_horizontal_prob(self.flip_prob)
            .normalize(self.normalize.then(Normalize::default))
            .seed(Some(self.seed))
            .build()
    }
}
