//! Batch audio transcription CLI

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use batchscribe::{
    CheckpointHeader, CheckpointStore, Config, ContentFilter, Controller, FallbackTranscriber,
    FfmpegExtractor, HardwareProfile, Preprocessor, ProgressCounters, ProgressReporter,
    RunParameters, Transcriber,
};

/// Resumable batch audio transcription
#[derive(Parser)]
#[command(name = "batchscribe")]
#[command(about = "Segmented, resumable audio transcription", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe every discovered input file (the default)
    Run {
        /// Path to the primary model file
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Language code (e.g. zh, en)
        #[arg(short, long)]
        language: Option<String>,

        /// Directory for result files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Transcribe a short fixed-offset sample to check the setup
    Test {
        /// Sample start offset in seconds
        #[arg(long, default_value = "12")]
        start: f64,

        /// Sample duration in seconds
        #[arg(long, default_value = "10")]
        duration: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    let mut config = if let Some(ref config_path) = cli.config {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        Config::default()
    };

    match cli.command {
        None => run_batch(config),
        Some(Commands::Run {
            model,
            language,
            output_dir,
        }) => {
            if let Some(model) = model {
                config.stt.primary_model = model;
            }
            if let Some(language) = language {
                config.stt.language = language;
            }
            if let Some(output_dir) = output_dir {
                config.checkpoint.output_dir = output_dir;
            }
            run_batch(config)
        }
        Some(Commands::Test { start, duration }) => run_test(config, start, duration),
    }
}

/// Find input files by the fixed base name and known extensions.
fn discover_inputs(config: &Config) -> Vec<PathBuf> {
    config
        .discovery
        .extensions
        .iter()
        .map(|ext| PathBuf::from(format!("{}.{}", config.discovery.base_name, ext)))
        .filter(|path| path.exists())
        .collect()
}

fn run_batch(config: Config) -> Result<()> {
    let profile = HardwareProfile::detect();
    let params = RunParameters::derive(&profile);
    info!(
        "Run parameters: {} s segments, stride {} s, batch {}, {}, boost up to {:.1} dB",
        params.segment_duration_sec,
        params.stride_sec,
        params.batch_size,
        params.precision,
        params.volume_boost_db
    );

    // Most likely failure first: no loadable model aborts the run
    let transcriber =
        FallbackTranscriber::from_config(&config.stt).context("Failed to load any model")?;

    let inputs = discover_inputs(&config);
    if inputs.is_empty() {
        println!(
            "No input files found. Name the audio {}.{{{}}} and run again.",
            config.discovery.base_name,
            config.discovery.extensions.join(",")
        );
        return Ok(());
    }
    info!("Discovered {} input file(s)", inputs.len());

    // Graceful shutdown: finish the current segment, then stop
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            stop.store(true, Ordering::SeqCst);
        }) {
            warn!("Could not install signal handler: {}", e);
        }
    }

    let counters = ProgressCounters::new();
    let reporter = (!config.progress.disabled).then(|| {
        ProgressReporter::start(
            counters.clone(),
            Duration::from_secs(config.progress.report_interval_sec),
        )
    });

    let store = CheckpointStore::new(&config.checkpoint);
    let filter = ContentFilter::default();
    let extractor = FfmpegExtractor;
    let controller = Controller::new(
        &extractor,
        &transcriber,
        &filter,
        &store,
        counters.clone(),
        stop.clone(),
    );

    // One failure boundary per file: log and move on
    for input in &inputs {
        if stop.load(Ordering::SeqCst) {
            break;
        }

        info!("Processing {}", input.display());
        match process_file(&controller, &config, &profile, &params, &transcriber, input) {
            Ok(()) => info!("Finished {}", input.display()),
            Err(e) => error!("Processing {} failed: {:#}", input.display(), e),
        }
    }

    if let Some(reporter) = reporter {
        reporter.stop();
    }

    Ok(())
}

fn process_file(
    controller: &Controller<FfmpegExtractor, FallbackTranscriber>,
    config: &Config,
    profile: &HardwareProfile,
    params: &RunParameters,
    transcriber: &FallbackTranscriber,
    input: &PathBuf,
) -> Result<()> {
    // All intermediates live here and vanish with the guard
    let workspace = tempfile::tempdir().context("Failed to create working directory")?;

    let preprocessor = Preprocessor::new(&config.preprocess, params);
    let outcome = preprocessor
        .preprocess(input, workspace.path())
        .context("Preprocessing failed")?;

    let header = CheckpointHeader {
        source: input.clone(),
        model: transcriber.name().to_string(),
        hardware: profile.description(),
        total_memory_gb: profile.total_memory_gb,
        size_mb: outcome.info.size_mb,
        duration_min: outcome.info.duration_min,
        segment_duration_sec: params.segment_duration_sec,
        batch_size: params.batch_size,
        precision: params.precision.to_string(),
    };

    let result = controller.run(
        &outcome.working_path,
        &outcome.info,
        &header,
        workspace.path(),
    )?;

    if result.resumed_complete {
        println!(
            "Transcript already complete: {}",
            result.checkpoint_path.display()
        );
        return Ok(());
    }

    println!();
    println!("Transcript saved to {}", result.checkpoint_path.display());
    if !result.combined.text.is_empty() {
        println!("{}", result.combined.text);
    }

    Ok(())
}

/// Extract and transcribe one short sample instead of the full file.
fn run_test(config: Config, start: f64, duration: f64) -> Result<()> {
    use batchscribe::SegmentExtractor;

    let profile = HardwareProfile::detect();
    let params = RunParameters::derive(&profile);

    let input = discover_inputs(&config)
        .into_iter()
        .next()
        .context("No input file found for the test sample")?;

    println!(
        "Testing {}: sample at {:.1}s for {:.1}s",
        input.display(),
        start,
        duration
    );

    let transcriber =
        FallbackTranscriber::from_config(&config.stt).context("Failed to load any model")?;

    let workspace = tempfile::tempdir().context("Failed to create working directory")?;
    let sample = workspace.path().join("test_sample.wav");
    FfmpegExtractor
        .extract(&input, start, duration, &sample)
        .context("Sample extraction failed")?;

    let preprocessor = Preprocessor::new(&config.preprocess, &params);
    let outcome = preprocessor
        .preprocess(&sample, workspace.path())
        .context("Sample preprocessing failed")?;

    let result = transcriber.transcribe(&outcome.working_path)?;
    println!("Transcription: {:?}", result.text);
    println!("Length: {} chars", result.text.chars().count());

    Ok(())
}
