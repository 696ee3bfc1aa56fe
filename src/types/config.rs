//! Configuration for Concord.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{ConcordError, ConcordResult};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "concord.toml";

/// Main configuration for Concord.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Council membership.
    #[serde(default)]
    pub council: CouncilConfig,

    /// Fan-out dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Circuit breaker settings.
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    /// Query cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Preference aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Claim extraction settings.
    #[serde(default)]
    pub claims: ClaimsConfig,

    /// Calibration tracking settings.
    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// Command-line model client settings.
    #[serde(default)]
    pub client: ClientConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Whole-query timeout (in seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GeneralConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_timeout() -> u64 {
    120
}

/// Which models sit on the council.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilConfig {
    /// Members queried in parallel for every query.
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Model that writes the final synthesis.
    #[serde(default = "default_chairman")]
    pub chairman: String,

    /// Model that extracts claims (defaults to the chairman).
    #[serde(default)]
    pub extractor: Option<String>,

    /// Model that verifies claims (defaults to the chairman).
    #[serde(default)]
    pub verifier: Option<String>,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            chairman: default_chairman(),
            extractor: None,
            verifier: None,
        }
    }
}

impl CouncilConfig {
    pub fn extractor(&self) -> &str {
        self.extractor.as_deref().unwrap_or(&self.chairman)
    }

    pub fn verifier(&self) -> &str {
        self.verifier.as_deref().unwrap_or(&self.chairman)
    }
}

fn default_models() -> Vec<String> {
    vec![
        "google/gemini-2.0-flash-exp:free".to_string(),
        "meta-llama/llama-3.3-70b-instruct:free".to_string(),
        "google/gemma-3-27b-it:free".to_string(),
        "tngtech/deepseek-r1t2-chimera:free".to_string(),
    ]
}

fn default_chairman() -> String {
    "google/gemini-2.0-flash-exp:free".to_string()
}

/// Fan-out dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Minimum successful responses (quorum).
    #[serde(default = "default_min_required")]
    pub min_required: usize,

    /// Per-model timeout (in seconds).
    #[serde(default = "default_timeout_per_model")]
    pub timeout_per_model_secs: u64,

    /// Return a partial set instead of failing when quorum is not met.
    #[serde(default = "default_true")]
    pub allow_partial: bool,

    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base retry delay (in milliseconds).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Double the delay after every attempt.
    #[serde(default = "default_true")]
    pub exponential: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_required: default_min_required(),
            timeout_per_model_secs: default_timeout_per_model(),
            allow_partial: true,
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            exponential: true,
        }
    }
}

impl DispatchConfig {
    pub fn timeout_per_model(&self) -> Duration {
        Duration::from_secs(self.timeout_per_model_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_min_required() -> usize {
    2
}

fn default_timeout_per_model() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    1000
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before a model is excluded.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Exclusion period (in seconds).
    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_recovery_timeout() -> u64 {
    60
}

/// Query cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum cache capacity (number of entries).
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Entry time to live in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_cache_ttl() -> u64 {
    3600 // 1 hour
}

/// Preference aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Kendall's W at or above which the council counts as agreeing.
    #[serde(default = "default_disagreement_threshold")]
    pub disagreement_threshold: f64,

    /// Bradley-Terry iterations.
    #[serde(default = "default_bt_iterations")]
    pub bt_iterations: usize,

    /// Stop Bradley-Terry early once no score moves more than this.
    #[serde(default)]
    pub bt_tolerance: Option<f64>,

    /// Collect pairwise comparisons and report Bradley-Terry scores.
    #[serde(default)]
    pub pairwise: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            disagreement_threshold: default_disagreement_threshold(),
            bt_iterations: default_bt_iterations(),
            bt_tolerance: None,
            pairwise: false,
        }
    }
}

fn default_disagreement_threshold() -> f64 {
    0.5
}

fn default_bt_iterations() -> usize {
    20
}

/// Claim extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimsConfig {
    /// Enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Re-check every extracted claim with the verifier model.
    #[serde(default)]
    pub verify: bool,

    /// Verifications in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Deadline for a whole verification batch (in seconds).
    #[serde(default)]
    pub verify_timeout_secs: Option<u64>,
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            verify: false,
            max_concurrent: default_max_concurrent(),
            verify_timeout_secs: None,
        }
    }
}

fn default_max_concurrent() -> usize {
    3
}

/// Calibration tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Characters of each response stored as the prediction text.
    #[serde(default = "default_prediction_chars")]
    pub prediction_chars: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: default_db_path(),
            prediction_chars: default_prediction_chars(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".concord/calibration.db")
}

fn default_prediction_chars() -> usize {
    200
}

/// Settings for the command-line model client.
///
/// `{model}` in `args` is replaced by the model id; the prompt is passed as
/// the last argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Command to execute.
    #[serde(default = "default_client_command")]
    pub command: String,

    /// Arguments placed before the prompt.
    #[serde(default = "default_client_args")]
    pub args: Vec<String>,

    /// Extra arguments when structured JSON output is wanted.
    #[serde(default = "default_json_args")]
    pub json_args: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            command: default_client_command(),
            args: default_client_args(),
            json_args: default_json_args(),
        }
    }
}

fn default_client_command() -> String {
    "llm".to_string()
}

fn default_client_args() -> Vec<String> {
    vec!["-m".to_string(), "{model}".to_string()]
}

fn default_json_args() -> Vec<String> {
    vec!["--json".to_string()]
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConcordResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConcordResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Creates default configuration.
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Path of the per-user configuration file, if the platform has one.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("concord").join(CONFIG_FILE))
    }

    /// Loads `./concord.toml`, then the per-user file, then defaults.
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::load(CONFIG_FILE) {
            return config;
        }
        Self::user_config_path()
            .and_then(|path| Self::load(path).ok())
            .unwrap_or_else(Self::default_config)
    }

    /// Rejects settings the council cannot run with.
    pub fn validate(&self) -> ConcordResult<()> {
        if self.council.models.is_empty() {
            return Err(ConcordError::config("council.models must not be empty"));
        }
        if self.council.chairman.trim().is_empty() {
            return Err(ConcordError::config("council.chairman must not be empty"));
        }
        if self.dispatch.min_required == 0 {
            return Err(ConcordError::config("dispatch.min_required must be at least 1"));
        }
        if self.dispatch.timeout_per_model_secs == 0 {
            return Err(ConcordError::config(
                "dispatch.timeout_per_model_secs must be at least 1",
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConcordError::config(
                "circuit_breaker.failure_threshold must be at least 1",
            ));
        }
        if self.cache.capacity == 0 {
            return Err(ConcordError::config("cache.capacity must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.aggregation.disagreement_threshold) {
            return Err(ConcordError::config(
                "aggregation.disagreement_threshold must be within [0, 1]",
            ));
        }
        if self.aggregation.bt_iterations == 0 {
            return Err(ConcordError::config("aggregation.bt_iterations must be at least 1"));
        }
        if self.claims.max_concurrent == 0 {
            return Err(ConcordError::config("claims.max_concurrent must be at least 1"));
        }
        if self.client.command.trim().is_empty() {
            return Err(ConcordError::config("client.command must not be empty"));
        }
        Ok(())
    }
}
