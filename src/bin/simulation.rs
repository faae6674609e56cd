//! Engine Telemetry Simulation
//!
//! Streams simulated aircraft engine readings for inspection or for feeding
//! other tools. Nominal readings are drawn uniformly from the nominal
//! envelope; with the configured probability one channel is replaced by an
//! injected fault:
//! - Pressure drop (700-1200 PSI)
//! - Vibration spike (1.5-3.5 mm/s)
//! - EGT jump (950-1200 °C)
//!
//! # Usage
//! ```bash
//! ./simulation --cycles 100 --probability 0.2 --seed 42 --format csv > readings.csv
//! ```

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use telemetry_pipeline::acquisition::{TelemetrySimulator, NOMINAL_ENVELOPE};
use telemetry_pipeline::config::defaults;
use telemetry_pipeline::types::{Channel, Reading};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "simulation")]
#[command(about = "Engine telemetry simulation for the telemetry pipeline")]
#[command(version)]
struct Args {
    /// Number of readings to generate
    #[arg(short, long, default_value_t = 100)]
    cycles: u64,

    /// Fault injection probability per reading (0.0-1.0)
    #[arg(short, long, default_value_t = defaults::ANOMALY_PROBABILITY)]
    probability: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Pause between readings in milliseconds (0 = as fast as possible)
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// Suppress mission log (only output readings)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================================
// Output
// ============================================================================

const CSV_HEADER: &str = "cycle,timestamp,rpm,pressure,vibration,egt,injected_fault";

fn csv_row(reading: &Reading) -> String {
    format!(
        "{},{},{:.1},{:.1},{:.3},{:.1},{}",
        reading.cycle(),
        reading.timestamp().to_rfc3339(),
        reading.rpm(),
        reading.pressure(),
        reading.vibration(),
        reading.egt(),
        reading.injected_fault().map_or("", |f| f.short_code()),
    )
}

// ============================================================================
// Logging Utilities
// ============================================================================

fn format_time(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}

fn log_mission(start: Instant, message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[{}] {}", format_time(start.elapsed()), message);
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = Args::parse();
    let start = Instant::now();

    let mut simulator = TelemetrySimulator::new(args.probability, args.seed)
        .context("Probability must be between 0.0 and 1.0")?;

    // Mission briefing
    log_mission(start, &"=".repeat(70), args.quiet);
    log_mission(start, "ENGINE TELEMETRY SIMULATION", args.quiet);
    log_mission(start, "Telemetry Pipeline Test Data Generator", args.quiet);
    log_mission(start, &"=".repeat(70), args.quiet);
    log_mission(start, "", args.quiet);
    log_mission(start, "NOMINAL ENVELOPE:", args.quiet);
    for channel in Channel::ALL {
        let (low, high) = NOMINAL_ENVELOPE[channel.index()];
        log_mission(
            start,
            &format!(
                "  {:<10} {} - {}",
                channel.display_name(),
                channel.format_value(low),
                channel.format_value(high)
            ),
            args.quiet,
        );
    }
    log_mission(start, "", args.quiet);
    log_mission(start, "SIMULATION PARAMETERS:", args.quiet);
    log_mission(start, &format!("  Readings: {}", args.cycles), args.quiet);
    log_mission(start, &format!("  Fault probability: {:.2}", args.probability), args.quiet);
    log_mission(start, &format!("  Format: {:?}", args.format), args.quiet);
    if let Some(seed) = args.seed {
        log_mission(start, &format!("  Random seed: {seed}"), args.quiet);
    }
    log_mission(start, &"=".repeat(70), args.quiet);
    log_mission(start, "SIMULATION START", args.quiet);
    log_mission(start, &"=".repeat(70), args.quiet);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let interval = Duration::from_millis(args.interval_ms);

    if args.format == OutputFormat::Csv {
        writeln!(out, "{CSV_HEADER}")?;
    }

    for i in 0..args.cycles {
        let reading = simulator.next_reading()?;

        if let Some(fault) = reading.injected_fault() {
            let channel = fault.channel();
            log_mission(
                start,
                &format!(
                    ">>> Cycle {}: injected {} ({} = {})",
                    reading.cycle(),
                    fault,
                    channel.display_name(),
                    channel.format_value(reading.value(channel))
                ),
                args.quiet,
            );
        }

        match args.format {
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&reading)?)?,
            OutputFormat::Csv => writeln!(out, "{}", csv_row(&reading))?,
        }
        out.flush()?;

        if !interval.is_zero() && i + 1 < args.cycles {
            std::thread::sleep(interval);
        }
    }

    drop(out);

    // Mission debrief
    log_mission(start, &"=".repeat(70), args.quiet);
    log_mission(start, "SIMULATION COMPLETE", args.quiet);
    log_mission(start, &"=".repeat(70), args.quiet);
    log_mission(start, &format!("Total readings: {}", simulator.cycles()), args.quiet);
    log_mission(start, &format!("Injected faults: {}", simulator.injected()), args.quiet);
    log_mission(
        start,
        &format!("Real time: {:.1}s", start.elapsed().as_secs_f64()),
        args.quiet,
    );
    log_mission(start, &"=".repeat(70), args.quiet);

    Ok(())
}
