use std::path::PathBuf;

use clap::Parser;
use swave_dataset::{SampleLayout, SplitStrategy, SplitUnit};
use training::util::{saved_checkpoint, EvalArgs};
use training::{ExperimentConfig, TrainArgs};

#[test]
fn defaults_describe_the_plane_dataset() {
    let cfg = ExperimentConfig::default();
    assert_eq!(cfg.dataset.case_count, 46);
    assert_eq!(cfg.dataset.label_key, "label");
    assert_eq!(cfg.dataset.layout, SampleLayout::Planes { per_case: 15 });
    assert_eq!(cfg.split.strategy, SplitStrategy::Stratified);
    assert_eq!(cfg.split.test_fraction, 0.2);
    assert_eq!(cfg.split.seed, 42);
    assert_eq!(cfg.train.batch_size, 16);
    assert!(cfg.output.checkpoint.is_none());
}

#[test]
fn partial_toml_keeps_remaining_defaults() -> anyhow::Result<()> {
    let cfg = ExperimentConfig::from_toml(
        r#"
        [dataset]
        image_dir = "scans"
        case_count = 10
        layout = { kind = "single_per_case" }

        [split]
        strategy = "random"
        unit = "case"

        [train]
        epochs = 3

        [model]
        class_names = ["normal", "fibrosis"]

        [output]
        metrics_path = "runs/metrics.jsonl"
        "#,
    )?;
    assert_eq!(cfg.dataset.image_dir, PathBuf::from("scans"));
    assert_eq!(cfg.dataset.case_count, 10);
    assert_eq!(cfg.dataset.layout, SampleLayout::SinglePerCase);
    assert_eq!(cfg.dataset.label_key, "label");
    assert_eq!(cfg.split.strategy, SplitStrategy::Random);
    assert_eq!(cfg.split.unit, SplitUnit::Case);
    assert_eq!(cfg.split.test_fraction, 0.2);
    assert_eq!(cfg.train.epochs, 3);
    assert_eq!(cfg.train.lr, 1e-3);
    assert_eq!(cfg.model.class_name(1), "fibrosis");
    assert_eq!(cfg.model.class_name(5), "5");
    assert_eq!(
        cfg.output.metrics_path,
        Some(PathBuf::from("runs/metrics.jsonl"))
    );
    Ok(())
}

#[test]
fn unknown_strategy_is_rejected() {
    assert!(ExperimentConfig::from_toml("[split]\nstrategy = \"kfold\"\n").is_err());
}

#[test]
fn cli_flags_override_config_file() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("exp.toml");
    std::fs::write(
        &path,
        "[train]\nepochs = 7\nbatch_size = 4\n\n[split]\nseed = 1\n",
    )?;
    let path_str = path.to_string_lossy().to_string();
    let args = TrainArgs::try_parse_from([
        "train",
        "--config",
        path_str.as_str(),
        "--epochs",
        "2",
        "--planes-per-case",
        "5",
        "--seed",
        "9",
        "--split",
        "random",
    ])?;
    let cfg = args.resolve()?;
    assert_eq!(cfg.train.epochs, 2);
    assert_eq!(cfg.train.batch_size, 4);
    assert_eq!(cfg.dataset.layout, SampleLayout::Planes { per_case: 5 });
    assert_eq!(cfg.split.seed, 9);
    assert_eq!(cfg.train.seed, 9);
    assert_eq!(cfg.split.strategy, SplitStrategy::Random);
    Ok(())
}

#[test]
fn missing_config_file_is_an_error() {
    let err = ExperimentConfig::from_path(std::path::Path::new("/nonexistent/swave.toml"));
    assert!(err.is_err());
}

#[test]
fn eval_batch_size_falls_back_to_config() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("exp.toml");
    std::fs::write(&path, "[train]\nbatch_size = 6\n")?;
    let path_str = path.to_string_lossy().to_string();

    let args = EvalArgs::try_parse_from([
        "eval",
        "--config",
        path_str.as_str(),
        "--checkpoint",
        "best",
    ])?;
    assert_eq!(args.resolve()?.train.batch_size, 6);

    let args = EvalArgs::try_parse_from([
        "eval",
        "--config",
        path_str.as_str(),
        "--checkpoint",
        "best",
        "--batch-size",
        "3",
    ])?;
    assert_eq!(args.resolve()?.train.batch_size, 3);
    Ok(())
}

#[test]
fn plot_flags_move_or_disable_plots() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("exp.toml");
    std::fs::write(&path, "")?;
    let path_str = path.to_string_lossy().to_string();

    let cfg = TrainArgs::try_parse_from([
        "train",
        "--config",
        path_str.as_str(),
        "--plot-dir",
        "out",
    ])?
    .resolve()?;
    assert!(cfg.output.plots);
    assert_eq!(cfg.output.loss_plot, PathBuf::from("out/loss.png"));
    assert_eq!(cfg.output.confusion_plot, PathBuf::from("out/confusion_matrix.png"));

    let cfg = TrainArgs::try_parse_from(["train", "--config", path_str.as_str(), "--no-plots"])?
        .resolve()?;
    assert!(!cfg.output.plots);

    let cfg = ExperimentConfig::from_toml("[output]\nplots = false\n")?;
    assert!(!cfg.output.plots);
    assert_eq!(cfg.output.accuracy_plot, PathBuf::from("plots/accuracy.png"));
    Ok(())
}

#[test]
fn checkpoint_is_reported_only_when_written() -> anyhow::Result<()> {
    let mut cfg = ExperimentConfig::default();
    assert_eq!(saved_checkpoint(&cfg, Some((0, 0.5))), None);

    cfg.output.checkpoint = Some(PathBuf::from("runs/best"));
    assert_eq!(saved_checkpoint(&cfg, None), None);
    assert_eq!(
        saved_checkpoint(&cfg, Some((2, 0.9))),
        Some(PathBuf::from("runs/best.bin"))
    );
    Ok(())
}
