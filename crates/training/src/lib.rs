#![recursion_limit = "256"]

pub mod checkpoint;
pub mod config;
pub mod metrics;
pub mod plots;
pub mod session;
pub mod util;

pub use checkpoint::{checkpoint_file, load_model, save_model};
pub use config::{ExperimentConfig, ModelSection, OutputSection, TrainConfig};
pub use metrics::{BinarySummary, ClassMetrics, ClassificationReport, ConfusionMatrix};
pub use plots::{plot_accuracy_curve, plot_confusion_heatmap, plot_loss_curve, render_run_plots};
pub use session::{
    evaluate_model, BestSnapshot, EpochRecord, EpochStats, Evaluation, TrainingOutcome,
    TrainingSession,
};
pub use util::{run_train, TrainArgs};
/// Backend alias for training/eval (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn_ndarray::NdArray<f32>;
