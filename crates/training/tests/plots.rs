use training::{render_run_plots, ConfusionMatrix, EpochRecord, OutputSection};

fn history(epochs: usize) -> Vec<EpochRecord> {
    (0..epochs)
        .map(|epoch| {
            let t = epoch as f64;
            EpochRecord {
                epoch,
                train_loss: 0.7 / (1.0 + t),
                train_accuracy: 0.5 + 0.1 * t,
                test_loss: 0.8 / (1.0 + t),
                test_accuracy: 0.45 + 0.1 * t,
                precision: 0.5,
                recall: 0.5,
                f1: 0.5,
                improved: true,
            }
        })
        .collect()
}

fn confusion() -> ConfusionMatrix {
    ConfusionMatrix::from_predictions(&[0, 0, 1, 1, 1], &[0, 1, 1, 1, 0], 2)
}

#[test]
fn writes_curves_and_heatmap_as_png() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let output = OutputSection::with_plot_dir(&tmp.path().join("plots"));
    let names = vec!["normal".to_string(), "fibrosis".to_string()];

    let written = render_run_plots(&history(4), &confusion(), &names, &output)?;
    assert_eq!(
        written,
        vec![
            output.loss_plot.clone(),
            output.accuracy_plot.clone(),
            output.confusion_plot.clone()
        ]
    );
    for path in &written {
        assert!(path.exists(), "{} missing", path.display());
        let img = image::open(path)?;
        assert!(img.width() > 0 && img.height() > 0);
    }
    assert_eq!(image::open(&output.loss_plot)?.width(), 800);
    Ok(())
}

#[test]
fn single_epoch_and_flat_values_still_render() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let output = OutputSection::with_plot_dir(tmp.path());
    let mut one = history(1);
    one[0].train_accuracy = 1.0;
    one[0].test_accuracy = 1.0;
    render_run_plots(&one, &confusion(), &[], &output)?;
    assert!(output.accuracy_plot.exists());
    Ok(())
}

#[test]
fn no_epochs_renders_only_the_heatmap() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let output = OutputSection::with_plot_dir(tmp.path());
    let written = render_run_plots(&[], &confusion(), &[], &output)?;
    assert_eq!(written, vec![output.confusion_plot.clone()]);
    assert!(!output.loss_plot.exists());
    assert!(output.confusion_plot.exists());
    Ok(())
}

#[test]
fn disabled_plots_write_nothing() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let output = OutputSection {
        plots: false,
        ..OutputSection::with_plot_dir(tmp.path())
    };
    assert!(render_run_plots(&history(2), &confusion(), &[], &output)?.is_empty());
    assert!(!output.confusion_plot.exists());
    Ok(())
}
