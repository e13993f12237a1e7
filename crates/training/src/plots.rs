//! PNG charts for a finished run: loss and accuracy curves per epoch, and the
//! confusion matrix as a heatmap. Rendering is headless (bitmap backend only).

use std::fmt;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::{info, warn};

use crate::config::OutputSection;
use crate::metrics::ConfusionMatrix;
use crate::session::EpochRecord;

const CURVE_SIZE: (u32, u32) = (800, 500);
const HEATMAP_SIZE: (u32, u32) = (600, 560);

fn plot_error<E: fmt::Display>(path: &Path, e: E) -> anyhow::Error {
    anyhow::anyhow!("failed to render {}: {e}", path.display())
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Train and test loss against epoch (1-based).
pub fn plot_loss_curve(history: &[EpochRecord], path: &Path) -> anyhow::Result<()> {
    draw_curves(history, path, "Loss", "cross-entropy loss", |r| {
        (r.train_loss, r.test_loss)
    })
}

/// Train and test accuracy against epoch (1-based).
pub fn plot_accuracy_curve(history: &[EpochRecord], path: &Path) -> anyhow::Result<()> {
    draw_curves(history, path, "Accuracy", "accuracy", |r| {
        (r.train_accuracy, r.test_accuracy)
    })
}

fn draw_curves(
    history: &[EpochRecord],
    path: &Path,
    title: &str,
    y_desc: &str,
    pick: impl Fn(&EpochRecord) -> (f64, f64),
) -> anyhow::Result<()> {
    if history.is_empty() {
        anyhow::bail!("no epochs to plot for {}", path.display());
    }
    ensure_parent(path)?;

    let train: Vec<(f64, f64)> = history
        .iter()
        .map(|r| ((r.epoch + 1) as f64, pick(r).0))
        .collect();
    let test: Vec<(f64, f64)> = history
        .iter()
        .map(|r| ((r.epoch + 1) as f64, pick(r).1))
        .collect();

    let (mut lo, mut hi) = train
        .iter()
        .chain(&test)
        .map(|(_, y)| *y)
        .filter(|y| y.is_finite())
        .fold((f64::MAX, f64::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));
    if lo > hi {
        (lo, hi) = (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(0.05);
    let (lo, hi) = (lo - pad, hi + pad);
    let x_hi = history.len().max(2) as f64;

    let root = BitMapBackend::new(path, CURVE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_error(path, e))?;
    {
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(title, ("sans-serif", 24.0))
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(1.0..x_hi, lo..hi)
            .map_err(|e| plot_error(path, e))?;
        chart
            .configure_mesh()
            .x_desc("epoch")
            .y_desc(y_desc)
            .draw()
            .map_err(|e| plot_error(path, e))?;

        chart
            .draw_series(LineSeries::new(train, &BLUE))
            .map_err(|e| plot_error(path, e))?
            .label("train")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
        chart
            .draw_series(LineSeries::new(test, &RED))
            .map_err(|e| plot_error(path, e))?
            .label("test")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|e| plot_error(path, e))?;
    }
    root.present().map_err(|e| plot_error(path, e))?;
    Ok(())
}

/// Heatmap of `cm`, actual classes top to bottom, predicted classes left to right.
pub fn plot_confusion_heatmap(
    cm: &ConfusionMatrix,
    names: &[String],
    path: &Path,
) -> anyhow::Result<()> {
    let n = cm.num_classes();
    if n == 0 {
        anyhow::bail!("empty confusion matrix for {}", path.display());
    }
    ensure_parent(path)?;

    let peak = (0..n)
        .flat_map(|a| (0..n).map(move |p| (a, p)))
        .map(|(a, p)| cm.get(a, p))
        .max()
        .unwrap_or(0)
        .max(1);
    let name = |c: usize| names.get(c).cloned().unwrap_or_else(|| c.to_string());
    let side = n as f64;

    let root = BitMapBackend::new(path, HEATMAP_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_error(path, e))?;
    {
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("Confusion matrix", ("sans-serif", 24.0))
            .set_label_area_size(LabelAreaPosition::Left, 80)
            .set_label_area_size(LabelAreaPosition::Bottom, 60)
            .build_cartesian_2d(0.0..side, 0.0..side)
            .map_err(|e| plot_error(path, e))?;

        let x_label = |v: &f64| name(v.floor().max(0.0) as usize);
        let y_label = |v: &f64| name(n.saturating_sub(1 + v.floor().max(0.0) as usize));
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n)
            .y_labels(n)
            .x_label_formatter(&x_label)
            .y_label_formatter(&y_label)
            .x_desc("predicted")
            .y_desc("actual")
            .draw()
            .map_err(|e| plot_error(path, e))?;

        let mut cells = Vec::with_capacity(n * n);
        let mut counts = Vec::with_capacity(n * n);
        for a in 0..n {
            let top = (n - a) as f64;
            for p in 0..n {
                let count = cm.get(a, p);
                let t = count as f64 / peak as f64;
                let color = RGBColor(
                    (255.0 - 200.0 * t) as u8,
                    (255.0 - 150.0 * t) as u8,
                    255,
                );
                let left = p as f64;
                cells.push(Rectangle::new(
                    [(left, top - 1.0), (left + 1.0, top)],
                    color.filled(),
                ));
                let ink = if t > 0.6 { WHITE } else { BLACK };
                counts.push(Text::new(
                    count.to_string(),
                    (left + 0.45, top - 0.45),
                    ("sans-serif", 20.0).into_font().color(&ink),
                ));
            }
        }
        chart
            .draw_series(cells)
            .map_err(|e| plot_error(path, e))?;
        chart
            .draw_series(counts)
            .map_err(|e| plot_error(path, e))?;
    }
    root.present().map_err(|e| plot_error(path, e))?;
    Ok(())
}

/// Render every configured chart; returns the files written.
pub fn render_run_plots(
    history: &[EpochRecord],
    confusion: &ConfusionMatrix,
    names: &[String],
    output: &OutputSection,
) -> anyhow::Result<Vec<PathBuf>> {
    if !output.plots {
        return Ok(Vec::new());
    }
    let mut written = Vec::with_capacity(3);
    if history.is_empty() {
        warn!("no epochs ran; skipping loss and accuracy curves");
    } else {
        plot_loss_curve(history, &output.loss_plot)?;
        written.push(output.loss_plot.clone());
        plot_accuracy_curve(history, &output.accuracy_plot)?;
        written.push(output.accuracy_plot.clone());
    }
    plot_confusion_heatmap(confusion, names, &output.confusion_plot)?;
    written.push(output.confusion_plot.clone());
    for path in &written {
        info!(path = %path.display(), "wrote plot");
    }
    Ok(written)
}
