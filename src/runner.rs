use crate::config::Config;
use crate::{MergeParamsArgs, PredictorKind};
use anyhow::{anyhow, bail, Context};
use docrectify::backends::load_predictors;
use docrectify::ocr::{join_texts, OcrEngine};
use docrectify::params::{load_parameter_file, merge_parameters, save_parameter_file, MergePolicy};
use docrectify::Rectifier;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// What one successfully processed input produced
struct Processed {
    output_path: PathBuf,
    text: Option<String>,
}

/// Rectify every configured input, then write the OCR results if requested
pub async fn run(config: Config) -> anyhow::Result<()> {
    if let Some(path) = config.colliding_output() {
        bail!("Several inputs would be written to {:?}", path);
    }

    let predictors = load_predictors(&config.predictors)?;
    let rectifier = Arc::new(Rectifier::new(predictors.mask, predictors.backward_map));
    let (mask_name, backward_map_name) = rectifier.predictor_names();
    tracing::info!(
        "Rectifier built with {} mask and {} backward-map predictors",
        mask_name,
        backward_map_name
    );

    let ocr = if config.ocr {
        Some(
            tokio::task::spawn_blocking(load_ocr_engine)
                .await
                .context("OCR engine initialization panicked")??,
        )
    } else {
        None
    };

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output directory {:?}", config.output_dir)
    })?;

    tracing::info!(
        "Rectifying {} images with {} parallel jobs",
        config.inputs.len(),
        config.jobs
    );

    let outcomes: Vec<(PathBuf, anyhow::Result<Processed>)> = stream::iter(config.inputs.clone())
        .map(|input| {
            let rectifier = Arc::clone(&rectifier);
            let ocr = ocr.clone();
            let output_path = config.output_path(&input);
            let timeout = config.timeout;
            async move {
                let result =
                    process_one(rectifier, ocr, input.clone(), output_path, timeout).await;
                (input, result)
            }
        })
        .buffered(config.jobs)
        .collect()
        .await;

    let mut texts = Vec::new();
    let mut failed = 0;
    for (input, outcome) in outcomes {
        match outcome {
            Ok(processed) => {
                tracing::info!("{:?} -> {:?}", input, processed.output_path);
                texts.extend(processed.text);
            }
            Err(e) => {
                tracing::error!("Failed to process {:?}: {:#}", input, e);
                failed += 1;
            }
        }
    }

    if ocr.is_some() {
        let results_path = config.results_path();
        std::fs::write(&results_path, join_texts(&texts))
            .with_context(|| format!("Failed to write OCR results to {:?}", results_path))?;
        tracing::info!("Wrote OCR results for {} pages to {:?}", texts.len(), results_path);
    }

    if failed > 0 {
        bail!("{} of {} images failed", failed, config.inputs.len());
    }

    Ok(())
}

async fn process_one(
    rectifier: Arc<Rectifier>,
    ocr: Option<Arc<dyn OcrEngine>>,
    input: PathBuf,
    output_path: PathBuf,
    timeout: Option<Duration>,
) -> anyhow::Result<Processed> {
    let task = tokio::task::spawn_blocking(move || -> anyhow::Result<Processed> {
        let output = rectifier.rectify_path(&input)?;
        output
            .image
            .save(&output_path)
            .with_context(|| format!("Failed to save {:?}", output_path))?;

        tracing::info!(
            "Rectified {:?} in {}ms (mask coverage {:.1}%)",
            input,
            output.total_time_ms,
            output.mask_coverage * 100.0
        );

        let text = match ocr {
            Some(engine) => Some(engine.recognize(&output.image)?.text),
            None => None,
        };

        Ok(Processed { output_path, text })
    });

    // A timed-out task keeps running on the blocking pool; its result is discarded
    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| anyhow!("Timed out after {}s", limit.as_secs()))?,
        None => task.await,
    };

    joined.context("Rectification task panicked")?
}

#[cfg(feature = "engine-ocrs")]
fn load_ocr_engine() -> anyhow::Result<Arc<dyn OcrEngine>> {
    let engine = docrectify::ocr::ocrs::OcrsEngine::new()?;
    tracing::info!("Using OCR engine {}", engine.name());
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "engine-ocrs"))]
fn load_ocr_engine() -> anyhow::Result<Arc<dyn OcrEngine>> {
    bail!("No OCR engine available. Build with --features engine-ocrs")
}

fn merge_policy(args: &MergeParamsArgs) -> MergePolicy {
    match args.predictor {
        Some(PredictorKind::Mask) => MergePolicy::mask(),
        Some(PredictorKind::BackwardMap) => MergePolicy::backward_map(),
        None => MergePolicy {
            strip_prefix: args.strip_prefix,
        },
    }
}

/// Offline tolerant merge of one parameter file into another
pub fn merge_params(args: MergeParamsArgs) -> anyhow::Result<()> {
    let mut destination = load_parameter_file(&args.into)?;
    let source = load_parameter_file(&args.source)?;

    let report = merge_parameters(&mut destination, source, merge_policy(&args))?;
    save_parameter_file(&args.output, &destination)?;

    tracing::info!(
        "Merged {} entries into {:?} ({} ignored, {} untouched)",
        report.updated.len(),
        args.output,
        report.ignored.len(),
        report.untouched
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
