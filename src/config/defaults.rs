//! System-wide default constants.
//!
//! Centralises the numbers the pipeline falls back to when a config file
//! omits a value. Grouped by subsystem for easy discovery.

// ============================================================================
// Orchestrator
// ============================================================================

/// Cycles per run.
pub const NUM_CYCLES: u32 = 8;

/// Probability that the simulator injects a fault into a reading.
pub const ANOMALY_PROBABILITY: f64 = 0.15;

/// Assessments kept in the bounded history.
pub const HISTORY_WINDOW: usize = 10;

/// Most recent history entries embedded in each prompt.
pub const HISTORY_IN_PROMPT: usize = 3;

/// Pause between cycles (ms). Skipped after the final cycle.
pub const CYCLE_INTERVAL_MS: u64 = 1_000;

// ============================================================================
// Outlier Classifier
// ============================================================================

/// Synthetic nominal readings used to train the isolation forest.
pub const ML_N_SAMPLES: usize = 1_000;

/// Expected outlier fraction; sets the decision threshold quantile.
pub const ML_CONTAMINATION: f64 = 0.1;

pub const ML_N_ESTIMATORS: usize = 100;

/// Rows drawn (without replacement) to grow each tree.
pub const ML_MAX_SAMPLES: usize = 256;

pub const ML_SEED: u64 = 42;

// ============================================================================
// Text Generation
// ============================================================================

pub const DIAGNOSIS_MODEL: &str = "gpt-4-turbo";
pub const RESOLUTION_MODEL: &str = "gpt-4-turbo";

/// Model used by `check-api` connectivity pings.
pub const MONITORING_MODEL: &str = "gpt-4o-mini";

pub const LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// Placeholder shipped in sample config files; never a usable key.
pub const API_KEY_PLACEHOLDER: &str = "your-openai-api-key-here";

/// Environment variable consulted when `llm.api_key` is empty.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const LLM_TEMPERATURE: f64 = 0.3;
pub const LLM_MAX_TOKENS: u32 = 500;

/// Per-request timeout for the text-generation service (seconds).
pub const LLM_TIMEOUT_SECS: u64 = 30;

pub const LLM_MAX_RETRIES: u32 = 2;
pub const LLM_RETRY_BACKOFF_MS: u64 = 500;

// ============================================================================
// Threshold Bounds
// ============================================================================

pub const RPM_MIN: f64 = 8_500.0;
pub const RPM_MAX: f64 = 9_500.0;

/// Pressure bounds (PSI).
pub const PRESSURE_MIN: f64 = 1_500.0;
pub const PRESSURE_MAX: f64 = 2_100.0;

/// Vibration bounds (mm/s).
pub const VIBRATION_MIN: f64 = 0.0;
pub const VIBRATION_MAX: f64 = 1.0;

/// Exhaust gas temperature bounds (°C).
pub const EGT_MIN: f64 = 0.0;
pub const EGT_MAX: f64 = 900.0;

// ============================================================================
// Config Discovery
// ============================================================================

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "TELEMETRY_PIPELINE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "pipeline.toml";
