use clap::Parser;
use swave_dataset::split_dataset;
use training::plots::plot_confusion_heatmap;
use training::util::{
    check_image_size, class_names, init_tracing, open_dataset, print_report, resolve_num_classes,
    validate_backend_choice, EvalArgs,
};
use training::{evaluate_model, load_model, TrainBackend};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = EvalArgs::parse();
    validate_backend_choice(args.backend)?;
    let cfg = args.resolve()?;

    let dataset = open_dataset(&cfg)?;
    let indices: Vec<usize> = if args.all {
        (0..dataset.len()).collect()
    } else {
        split_dataset(&dataset, &cfg.split)
            .map_err(|e| anyhow::anyhow!("{e}"))?
            .test
    };
    if indices.is_empty() {
        println!("No samples to evaluate");
        return Ok(());
    }

    let num_classes = resolve_num_classes(&cfg, &dataset)?;
    let model_cfg = cfg.model.to_model_config(num_classes);
    check_image_size(cfg.train.image_size, model_cfg.min_input_side())?;

    let device = <TrainBackend as burn::tensor::backend::Backend>::Device::default();
    let model = load_model::<TrainBackend>(model_cfg, &args.checkpoint, &device).map_err(|e| {
        anyhow::anyhow!(
            "failed to load checkpoint {}: {e}",
            args.checkpoint.display()
        )
    })?;

    let transform = cfg.train.transform_pipeline().eval();
    let eval = evaluate_model(
        &model,
        &dataset,
        &indices,
        cfg.train.batch_size,
        &transform,
        &device,
    )?;
    println!("Eval complete: loss={:.4} accuracy={:.4}", eval.loss, eval.accuracy());
    print_report(&eval, &cfg);
    if cfg.output.plots {
        let path = &cfg.output.confusion_plot;
        plot_confusion_heatmap(&eval.confusion, &class_names(&cfg, &eval), path)?;
        println!("Saved plot to {}", path.display());
    }
    Ok(())
}
