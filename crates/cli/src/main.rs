mod batch;
mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use framereel_core::{
    load_config_or_default,
    tools::{resolve_decompiler, resolve_encoder, ToolStatus},
    validate_config, Capability, Config, ConversionRequest, ExtractionRequest, Pipeline,
    PipelineEvent, ProcessEngine,
};

use batch::{collect_inputs, destination_for, BatchSummary};
use cli::{Cli, Commands};

/// Buffer size for pipeline event channels
const EVENT_BUFFER_SIZE: usize = 256;

type ProcessPipeline = Pipeline<ProcessEngine, ProcessEngine>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the level
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "framereel=debug,framereel_core=debug".to_string()
        } else {
            "framereel=info,framereel_core=info".to_string()
        }
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config_or_default(cli.config.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    match cli.command {
        Commands::Convert {
            inputs,
            output,
            fps,
            keep,
            recursive,
            test_frames,
            timeout,
        } => {
            apply_overrides(&mut config, test_frames, timeout);
            config.pipeline.keep_intermediate |= keep;
            validate_config(&config).context("Configuration validation failed")?;

            let sources = collect_inputs(&inputs, recursive);
            if sources.is_empty() {
                anyhow::bail!("No source files found in {:?}", inputs);
            }

            let fps = fps.unwrap_or(config.pipeline.default_frame_rate);
            let keep = config.pipeline.keep_intermediate;
            let pipeline = build_pipeline(config);
            convert_all(&pipeline, &sources, output.as_deref(), fps, keep).await
        }
        Commands::Extract {
            input,
            output,
            test_frames,
            timeout,
        } => {
            apply_overrides(&mut config, test_frames, timeout);
            validate_config(&config).context("Configuration validation failed")?;

            let request = ExtractionRequest::new(&input, &output)
                .with_frame_cap(config.pipeline.test_frame_cap);
            let pipeline = build_pipeline(config);
            extract_one(&pipeline, &request).await
        }
        Commands::Tools => {
            check_tools(&config);
            Ok(())
        }
    }
}

fn apply_overrides(config: &mut Config, test_frames: Option<u32>, timeout: Option<f64>) {
    if test_frames.is_some() {
        config.pipeline.test_frame_cap = test_frames;
    }
    if timeout.is_some() {
        config.pipeline.timeout_override_minutes = timeout;
    }
}

/// Resolves both engines once and wraps them for the pipeline.
fn build_pipeline(config: Config) -> ProcessPipeline {
    let archive = config.decompiler.archive_path.clone();
    let decompiler = Capability::from_status(
        resolve_decompiler(&config.decompiler.runtime_path, &archive),
        |runtime| ProcessEngine::java_archive("decompiler", runtime, &archive),
    );
    let encoder = Capability::from_status(
        resolve_encoder(config.encoder.ffmpeg_path.as_deref()).ffmpeg,
        |path| ProcessEngine::new("ffmpeg", path),
    );

    for capability in [&decompiler, &encoder] {
        if let Err((tool, reason)) = capability.require() {
            warn!(tool, reason, "Engine unavailable");
        }
    }

    Pipeline::new(config, decompiler, encoder)
}

/// Logs pipeline events for one request until the sender is dropped.
fn spawn_event_logger(label: String) -> (mpsc::Sender<PipelineEvent>, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER_SIZE);
    let handle = tokio::spawn(async move {
        let mut last_logged = -10.0_f32;
        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::StateChanged { state } => debug!(source = %label, %state, "State"),
                PipelineEvent::DecompilerProgress { line, .. } => {
                    debug!(source = %label, "{}", line)
                }
                PipelineEvent::FrameRateResolved { fps, detected } => {
                    info!(source = %label, fps, detected, "Frame rate")
                }
                PipelineEvent::AssemblyProgress { percent } => {
                    if percent - last_logged >= 10.0 || percent >= 100.0 {
                        last_logged = percent;
                        info!(source = %label, "Encoding {:.0}%", percent);
                    }
                }
                PipelineEvent::Warning { warning } => warn!(source = %label, "{}", warning),
            }
        }
    });
    (tx, handle)
}

/// Converts sources one at a time, continuing past failures.
async fn convert_all(
    pipeline: &ProcessPipeline,
    sources: &[std::path::PathBuf],
    output_dir: Option<&Path>,
    fps: u32,
    keep: bool,
) -> Result<()> {
    let mut summary = BatchSummary::default();

    for (index, source) in sources.iter().enumerate() {
        let destination = destination_for(source, output_dir);
        info!(
            "[{}/{}] {} -> {}",
            index + 1,
            sources.len(),
            source.display(),
            destination.display()
        );

        let request = ConversionRequest::new(source, &destination)
            .with_frame_rate(fps)
            .keep_intermediate(keep);
        let (tx, logger) = spawn_event_logger(source.display().to_string());
        let result = pipeline.convert(&request, Some(tx)).await;
        let _ = logger.await;

        match result {
            Ok(outcome) => {
                summary.record(true);
                println!(
                    "{}: {} frames at {} fps{}, {:.1}s, {} bytes",
                    outcome.output_path.display(),
                    outcome.frame_count,
                    outcome.frame_rate,
                    if outcome.has_audio { " with audio" } else { "" },
                    outcome.duration_secs,
                    outcome.output_size_bytes
                );
                if let Some(ref work_dir) = outcome.work_dir {
                    println!("  intermediate files kept in {}", work_dir.display());
                }
            }
            Err(e) => {
                summary.record(false);
                error!(source = %source.display(), "{}", e);
                if let Some(stderr) = e.stderr() {
                    debug!(source = %source.display(), "Engine output:\n{}", stderr);
                }
            }
        }
    }

    if sources.len() > 1 {
        println!(
            "{} converted, {} failed",
            summary.succeeded, summary.failed
        );
    }

    if summary.failed > 0 {
        anyhow::bail!("{} of {} conversions failed", summary.failed, summary.total());
    }
    Ok(())
}

async fn extract_one(pipeline: &ProcessPipeline, request: &ExtractionRequest) -> Result<()> {
    let (tx, logger) = spawn_event_logger(request.source.display().to_string());
    let result = pipeline.extract(request, Some(tx)).await;
    let _ = logger.await;

    let outcome = result.with_context(|| format!("Extraction of {:?} failed", request.source))?;
    println!(
        "{}: {} frames, {} audio files{}",
        request.output_dir.display(),
        outcome.frame_count(),
        outcome.audio.len(),
        if outcome.decompiler_succeeded { "" } else { " (partial)" }
    );
    Ok(())
}

fn check_tools(config: &Config) {
    println!("Checking external tools...\n");

    let encoder = resolve_encoder(config.encoder.ffmpeg_path.as_deref());
    let decompiler = resolve_decompiler(
        &config.decompiler.runtime_path,
        &config.decompiler.archive_path,
    );

    let mut all_ok = true;
    for (name, status) in [
        ("decompiler", &decompiler),
        ("ffmpeg", &encoder.ffmpeg),
        ("ffprobe", &encoder.ffprobe),
    ] {
        match status {
            ToolStatus::Available(path) => println!("✓ {} - {}", name, path.display()),
            ToolStatus::Unavailable { reason, .. } => {
                all_ok = false;
                println!("✗ {} - {}", name, reason);
            }
        }
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them or set their paths in the config file.");
    }
}
