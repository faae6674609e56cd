//! Telemetry Pipeline - aircraft engine anomaly detection
//!
//! Simulates engine telemetry, flags out-of-bounds readings, confirms them
//! with an isolation-forest classifier and asks a text-generation service for
//! a diagnosis and a maintenance recommendation.
//!
//! # Usage
//!
//! ```bash
//! # Run the default 8 cycles against the configured service
//! OPENAI_API_KEY=sk-... cargo run --release
//!
//! # Reproducible offline run with canned replies
//! cargo run --release -- run --offline --seed 42 --cycles 20 --interval-ms 0
//!
//! # Verify the API key and endpoint
//! cargo run --release -- check-api
//! ```
//!
//! # Environment Variables
//!
//! - `TELEMETRY_PIPELINE_CONFIG`: config file used when `--config` is absent
//! - `OPENAI_API_KEY`: API key used when `llm.api_key` is empty
//! - `RUST_LOG`: Logging level (default: info)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use telemetry_pipeline::config::{mask_api_key, PipelineConfig};
use telemetry_pipeline::llm::{
    GenerationRequest, LlmBackend, OpenAiBackend, RequestKind, StaticBackend,
};
use telemetry_pipeline::pipeline::CycleCoordinator;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "telemetry-pipeline")]
#[command(about = "Aircraft engine telemetry anomaly pipeline")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides TELEMETRY_PIPELINE_CONFIG and ./pipeline.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Run the cycle pipeline (default)
    Run(RunArgs),

    /// Check the API key and text-generation endpoint with one short request
    CheckApi,

    /// Print the effective configuration as TOML
    ShowConfig,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Number of cycles (overrides orchestrator.num_cycles)
    #[arg(long)]
    cycles: Option<u32>,

    /// Fault injection probability per cycle, 0.0-1.0
    #[arg(long)]
    probability: Option<f64>,

    /// Simulator seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Pause between cycles in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Use built-in canned replies instead of the HTTPS service
    #[arg(long)]
    offline: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        let orchestrator = &mut config.orchestrator;
        if let Some(cycles) = self.cycles {
            orchestrator.num_cycles = cycles;
        }
        if let Some(p) = self.probability {
            orchestrator.anomaly_probability = p;
        }
        if let Some(seed) = self.seed {
            orchestrator.seed = Some(seed);
        }
        if let Some(ms) = self.interval_ms {
            orchestrator.cycle_interval_ms = ms;
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let (config, source) =
        PipelineConfig::load(path).context("Failed to load pipeline configuration")?;
    info!(source = %source, "Configuration loaded");
    Ok(config)
}

/// HTTPS backend for the configured endpoint. Requires an API key.
fn http_backend(config: &PipelineConfig) -> Result<OpenAiBackend> {
    let api_key = config
        .llm
        .resolve_api_key()
        .context("No usable API key (set llm.api_key or OPENAI_API_KEY, or pass --offline)")?;
    OpenAiBackend::from_config(&config.llm, api_key).context("Failed to build HTTP client")
}

// ============================================================================
// Commands
// ============================================================================

async fn run_pipeline(config_path: Option<&Path>, args: &RunArgs) -> Result<()> {
    let mut config = load_config(config_path)?;
    args.apply(&mut config);
    config
        .validate()
        .context("Invalid configuration after command-line overrides")?;

    let backend: Arc<dyn LlmBackend> = if args.offline {
        Arc::new(StaticBackend::offline())
    } else {
        Arc::new(http_backend(&config)?)
    };

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Telemetry Pipeline - aircraft engine anomaly detection");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        cycles = config.orchestrator.num_cycles,
        probability = config.orchestrator.anomaly_probability,
        seed = ?config.orchestrator.seed,
        backend = backend.backend_name(),
        diagnosis_model = %config.models.diagnosis,
        resolution_model = %config.models.resolution,
        "Pipeline settings"
    );

    let mut coordinator = CycleCoordinator::from_config(&config, backend)
        .context("Pipeline startup failed")?
        .with_console(true);

    tokio::select! {
        result = coordinator.run() => {
            result.context("Pipeline aborted")?;
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping before all cycles completed");
        }
    }

    info!("✓ Telemetry pipeline finished");
    Ok(())
}

async fn check_api(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let api_key = config
        .llm
        .resolve_api_key()
        .context("No usable API key (set llm.api_key or OPENAI_API_KEY)")?;

    println!("Endpoint: {}", config.llm.base_url);
    println!("API key:  {}", mask_api_key(&api_key));
    println!("Model:    {}", config.models.monitoring);

    let backend = OpenAiBackend::from_config(&config.llm, api_key).context("Failed to build HTTP client")?;
    let request = GenerationRequest {
        kind: RequestKind::Ping,
        model: config.models.monitoring.clone(),
        system_prompt: "You are a connectivity check.".to_string(),
        prompt: "Reply with the single word OK.".to_string(),
        temperature: 0.0,
        max_tokens: 10,
    };

    match backend.generate(&request).await {
        Ok(reply) => {
            println!("✓ API reachable, reply: {}", reply.trim());
            Ok(())
        }
        Err(e) => {
            println!("✗ API check failed: {e}");
            Err(e).context("API check failed")
        }
    }
}

fn show_config(config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if !config.llm.api_key.is_empty() {
        config.llm.api_key = mask_api_key(&config.llm.api_key);
    }
    print!("{}", config.to_toml().context("Failed to serialize configuration")?);
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so the cycle report on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config_path = args.config.as_deref();

    let result = match args.command {
        Some(SubCommand::CheckApi) => check_api(config_path).await,
        Some(SubCommand::ShowConfig) => show_config(config_path),
        Some(SubCommand::Run(run)) => run_pipeline(config_path, &run).await,
        None => run_pipeline(config_path, &RunArgs::default()).await,
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
    Ok(())
}
