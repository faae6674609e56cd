//! Pipeline Configuration - cycle, classifier, model and threshold settings
//!
//! Every tunable the pipeline reads is a field in this module. Each struct
//! implements `Default` with the built-in values, so an empty or partial TOML
//! file is always valid input.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::types::Channel;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a pipeline run.
///
/// Load with `PipelineConfig::load()` which searches:
/// 1. `--config <path>` (explicit path)
/// 2. `$TELEMETRY_PIPELINE_CONFIG` env var
/// 3. `./pipeline.toml`
/// 4. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Cycle loop settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Outlier classifier training
    #[serde(default)]
    pub ml_model: MlModelConfig,

    /// Model identifiers per request kind
    #[serde(default)]
    pub models: ModelsConfig,

    /// Text-generation service connection
    #[serde(default)]
    pub llm: LlmConfig,

    /// Per-channel threshold bounds
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` flag
    Flag(PathBuf),
    /// `$TELEMETRY_PIPELINE_CONFIG`
    Env(PathBuf),
    /// `./pipeline.toml`
    Local(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flag(p) => write!(f, "{} (--config)", p.display()),
            Self::Env(p) => write!(f, "{} (${})", p.display(), defaults::CONFIG_ENV),
            Self::Local(p) => write!(f, "{}", p.display()),
            Self::Defaults => write!(f, "built-in defaults"),
        }
    }
}

impl PipelineConfig {
    /// Load configuration using the standard search order.
    ///
    /// A file named by the flag or the env var must load; any failure there
    /// is returned. A broken `./pipeline.toml` is logged and skipped.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let env_path = std::env::var_os(defaults::CONFIG_ENV).map(PathBuf::from);
        Self::load_from_sources(explicit, env_path.as_deref(), Path::new(defaults::LOCAL_CONFIG_FILE))
    }

    /// Search order with every location passed in explicitly.
    pub fn load_from_sources(
        explicit: Option<&Path>,
        env_path: Option<&Path>,
        local: &Path,
    ) -> Result<(Self, ConfigSource), ConfigError> {
        // 1. --config flag
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "Loaded config from --config");
            return Ok((config, ConfigSource::Flag(path.to_path_buf())));
        }

        // 2. Env var
        if let Some(path) = env_path {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "Loaded config from {}", defaults::CONFIG_ENV);
            return Ok((config, ConfigSource::Env(path.to_path_buf())));
        }

        // 3. ./pipeline.toml
        if local.exists() {
            match Self::load_from_file(local) {
                Ok(config) => {
                    info!(path = %local.display(), "Loaded config from working directory");
                    return Ok((config, ConfigSource::Local(local.to_path_buf())));
                }
                Err(e) => {
                    warn!(path = %local.display(), error = %e, "Failed to load local config, using defaults");
                }
            }
        }

        // 4. Defaults
        info!("No pipeline.toml found, using built-in defaults");
        Ok((Self::default(), ConfigSource::Defaults))
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Two passes: unknown keys are reported as warnings first, then serde
    /// deserializes the document and `validate()` checks the values.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!(field = %w.field, "{}", w);
        }

        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;

        for w in super::validation::validate_ranges(&config) {
            warn!(field = %w.field, "{}", w);
        }
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate every section. All violations are collected and reported
    /// together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let o = &self.orchestrator;
        if o.num_cycles < 1 {
            errors.push("orchestrator.num_cycles must be >= 1".to_string());
        }
        if !(0.0..=1.0).contains(&o.anomaly_probability) {
            errors.push(format!(
                "orchestrator.anomaly_probability = {} must be within [0, 1]",
                o.anomaly_probability
            ));
        }
        if o.history_window < 1 {
            errors.push("orchestrator.history_window must be >= 1".to_string());
        }
        if o.history_in_prompt > o.history_window {
            errors.push(format!(
                "orchestrator.history_in_prompt ({}) must be <= history_window ({})",
                o.history_in_prompt, o.history_window
            ));
        }

        let m = &self.ml_model;
        if !(m.contamination > 0.0 && m.contamination <= 0.5) {
            errors.push(format!(
                "ml_model.contamination = {} must be within (0, 0.5]",
                m.contamination
            ));
        }
        if m.n_samples < 2 {
            errors.push(format!("ml_model.n_samples = {} must be >= 2", m.n_samples));
        }
        if m.n_estimators < 1 {
            errors.push("ml_model.n_estimators must be >= 1".to_string());
        }
        if m.max_samples < 2 {
            errors.push(format!("ml_model.max_samples = {} must be >= 2", m.max_samples));
        }

        for (name, model) in [
            ("diagnosis", &self.models.diagnosis),
            ("resolution", &self.models.resolution),
            ("monitoring", &self.models.monitoring),
        ] {
            if model.trim().is_empty() {
                errors.push(format!("models.{name} must not be empty"));
            }
        }

        let l = &self.llm;
        if !(0.0..=2.0).contains(&l.temperature) {
            errors.push(format!("llm.temperature = {} must be within [0, 2]", l.temperature));
        }
        if l.timeout_secs < 1 {
            errors.push("llm.timeout_secs must be >= 1".to_string());
        }
        if l.max_tokens < 1 {
            errors.push("llm.max_tokens must be >= 1".to_string());
        }
        if l.base_url.trim().is_empty() {
            errors.push("llm.base_url must not be empty".to_string());
        }

        for channel in Channel::ALL {
            Self::check_bounds(self.thresholds.bounds(channel), channel, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_bounds(bounds: ChannelBounds, channel: Channel, errors: &mut Vec<String>) {
        let name = channel.key();
        // NaN/Inf comparisons silently pass, catch them explicitly
        if !bounds.min.is_finite() || !bounds.max.is_finite() {
            errors.push(format!(
                "thresholds.{name}: bounds must be finite (got min={}, max={})",
                bounds.min, bounds.max
            ));
            return;
        }
        if bounds.min >= bounds.max {
            errors.push(format!(
                "thresholds.{name}: min ({:.3}) must be < max ({:.3})",
                bounds.min, bounds.max
            ));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error ({}): {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),

    #[error("No API key configured: set llm.api_key or OPENAI_API_KEY")]
    MissingApiKey,

    #[error("llm.api_key is still the placeholder value, set a real key")]
    PlaceholderApiKey,
}

// ============================================================================
// Orchestrator
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Number of cycles to run
    #[serde(default = "default_num_cycles")]
    pub num_cycles: u32,

    /// Probability of injecting a fault into each reading
    #[serde(default = "default_anomaly_probability")]
    pub anomaly_probability: f64,

    /// Assessments kept in history
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// History entries embedded in each prompt
    #[serde(default = "default_history_in_prompt")]
    pub history_in_prompt: usize,

    /// Pause between cycles (ms)
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    /// Simulator seed. Unset means a fresh entropy seed per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

const fn default_num_cycles() -> u32 { defaults::NUM_CYCLES }
const fn default_anomaly_probability() -> f64 { defaults::ANOMALY_PROBABILITY }
const fn default_history_window() -> usize { defaults::HISTORY_WINDOW }
const fn default_history_in_prompt() -> usize { defaults::HISTORY_IN_PROMPT }
const fn default_cycle_interval_ms() -> u64 { defaults::CYCLE_INTERVAL_MS }

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            num_cycles: default_num_cycles(),
            anomaly_probability: default_anomaly_probability(),
            history_window: default_history_window(),
            history_in_prompt: default_history_in_prompt(),
            cycle_interval_ms: default_cycle_interval_ms(),
            seed: None,
        }
    }
}

// ============================================================================
// ML Model
// ============================================================================

/// Isolation forest training parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlModelConfig {
    /// Synthetic nominal readings generated for training
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,

    /// Expected outlier fraction in (0, 0.5]
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    /// Subsample size per tree (capped at n_samples)
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    /// Seed for the training sample and tree construction
    #[serde(default = "default_ml_seed")]
    pub seed: u64,
}

const fn default_n_samples() -> usize { defaults::ML_N_SAMPLES }
const fn default_contamination() -> f64 { defaults::ML_CONTAMINATION }
const fn default_n_estimators() -> usize { defaults::ML_N_ESTIMATORS }
const fn default_max_samples() -> usize { defaults::ML_MAX_SAMPLES }
const fn default_ml_seed() -> u64 { defaults::ML_SEED }

impl Default for MlModelConfig {
    fn default() -> Self {
        Self {
            n_samples: default_n_samples(),
            contamination: default_contamination(),
            n_estimators: default_n_estimators(),
            max_samples: default_max_samples(),
            seed: default_ml_seed(),
        }
    }
}

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_diagnosis_model")]
    pub diagnosis: String,

    #[serde(default = "default_resolution_model")]
    pub resolution: String,

    /// Used for connectivity checks
    #[serde(default = "default_monitoring_model")]
    pub monitoring: String,
}

fn default_diagnosis_model() -> String {
    defaults::DIAGNOSIS_MODEL.to_string()
}
fn default_resolution_model() -> String {
    defaults::RESOLUTION_MODEL.to_string()
}
fn default_monitoring_model() -> String {
    defaults::MONITORING_MODEL.to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            diagnosis: default_diagnosis_model(),
            resolution: default_resolution_model(),
            monitoring: default_monitoring_model(),
        }
    }
}

// ============================================================================
// LLM Service
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. Empty means read `OPENAI_API_KEY`.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts after a transient failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_base_url() -> String {
    defaults::LLM_BASE_URL.to_string()
}
const fn default_temperature() -> f64 { defaults::LLM_TEMPERATURE }
const fn default_max_tokens() -> u32 { defaults::LLM_MAX_TOKENS }
const fn default_timeout_secs() -> u64 { defaults::LLM_TIMEOUT_SECS }
const fn default_max_retries() -> u32 { defaults::LLM_MAX_RETRIES }
const fn default_retry_backoff_ms() -> u64 { defaults::LLM_RETRY_BACKOFF_MS }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the config, falling back to `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_api_key_with(std::env::var(defaults::API_KEY_ENV).ok())
    }

    /// Key resolution with the environment value passed in.
    pub fn resolve_api_key_with(&self, env_key: Option<String>) -> Result<String, ConfigError> {
        let key = if self.api_key.trim().is_empty() {
            env_key.map(|k| k.trim().to_string()).unwrap_or_default()
        } else {
            self.api_key.trim().to_string()
        };

        if key.is_empty() {
            Err(ConfigError::MissingApiKey)
        } else if key == defaults::API_KEY_PLACEHOLDER {
            Err(ConfigError::PlaceholderApiKey)
        } else {
            Ok(key)
        }
    }
}

/// Mask an API key for display: first 7 and last 4 characters.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 11 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 11))
}

// ============================================================================
// Threshold Bounds
// ============================================================================

/// Inclusive `[min, max]` range for one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelBounds {
    pub min: f64,
    pub max: f64,
}

impl ChannelBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Per-channel bounds. A channel table may set only `min` or only `max`;
/// the other key keeps that channel's default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ThresholdTables")]
pub struct ThresholdConfig {
    pub rpm: ChannelBounds,

    /// PSI
    pub pressure: ChannelBounds,

    /// mm/s
    pub vibration: ChannelBounds,

    /// °C
    pub egt: ChannelBounds,
}

/// `[thresholds.<channel>]` tables as written in the file
#[derive(Debug, Default, Deserialize)]
struct ThresholdTables {
    #[serde(default)]
    rpm: BoundsTable,
    #[serde(default)]
    pressure: BoundsTable,
    #[serde(default)]
    vibration: BoundsTable,
    #[serde(default)]
    egt: BoundsTable,
}

#[derive(Debug, Default, Deserialize)]
struct BoundsTable {
    min: Option<f64>,
    max: Option<f64>,
}

impl BoundsTable {
    fn or_default(self, fallback: ChannelBounds) -> ChannelBounds {
        ChannelBounds::new(
            self.min.unwrap_or(fallback.min),
            self.max.unwrap_or(fallback.max),
        )
    }
}

impl From<ThresholdTables> for ThresholdConfig {
    fn from(t: ThresholdTables) -> Self {
        Self {
            rpm: t.rpm.or_default(default_rpm_bounds()),
            pressure: t.pressure.or_default(default_pressure_bounds()),
            vibration: t.vibration.or_default(default_vibration_bounds()),
            egt: t.egt.or_default(default_egt_bounds()),
        }
    }
}

const fn default_rpm_bounds() -> ChannelBounds {
    ChannelBounds::new(defaults::RPM_MIN, defaults::RPM_MAX)
}
const fn default_pressure_bounds() -> ChannelBounds {
    ChannelBounds::new(defaults::PRESSURE_MIN, defaults::PRESSURE_MAX)
}
const fn default_vibration_bounds() -> ChannelBounds {
    ChannelBounds::new(defaults::VIBRATION_MIN, defaults::VIBRATION_MAX)
}
const fn default_egt_bounds() -> ChannelBounds {
    ChannelBounds::new(defaults::EGT_MIN, defaults::EGT_MAX)
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            rpm: default_rpm_bounds(),
            pressure: default_pressure_bounds(),
            vibration: default_vibration_bounds(),
            egt: default_egt_bounds(),
        }
    }
}

impl ThresholdConfig {
    pub const fn bounds(&self, channel: Channel) -> ChannelBounds {
        match channel {
            Channel::Rpm => self.rpm,
            Channel::Pressure => self.pressure,
            Channel::Vibration => self.vibration,
            Channel::Egt => self.egt,
        }
    }
}
