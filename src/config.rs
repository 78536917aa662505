use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::core::{ActiveStatuses, FanOutLimits, MatchPolicy, SightingOptions};
use crate::models::CaseStatus;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub gemini: GeminiSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
    /// Summed size of cached candidate images
    #[serde(default = "default_image_cache_bytes")]
    pub image_cache_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_active_statuses")]
    pub active_statuses: Vec<String>,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_request_deadline_secs")]
    pub request_deadline_secs: u64,
    #[serde(default = "default_retain_sighting_on_failure")]
    pub retain_sighting_on_failure: bool,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            active_statuses: default_active_statuses(),
            max_concurrency: default_max_concurrency(),
            call_timeout_secs: default_call_timeout_secs(),
            request_deadline_secs: default_request_deadline_secs(),
            retain_sighting_on_failure: default_retain_sighting_on_failure(),
        }
    }
}

impl MatchingSettings {
    pub fn policy(&self) -> Result<MatchPolicy, ConfigError> {
        MatchPolicy::new(self.confidence_threshold)
            .map_err(|e| ConfigError::Message(format!("matching.confidence_threshold: {}", e)))
    }

    pub fn active_statuses(&self) -> Result<ActiveStatuses, ConfigError> {
        let statuses = self
            .active_statuses
            .iter()
            .map(|s| CaseStatus::from_str(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::Message(format!("matching.active_statuses: {}", e)))?;

        ActiveStatuses::new(statuses)
            .map_err(|e| ConfigError::Message(format!("matching.active_statuses: {}", e)))
    }

    pub fn fan_out_limits(&self) -> Result<FanOutLimits, ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Message(
                "matching.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.call_timeout_secs == 0 || self.request_deadline_secs == 0 {
            return Err(ConfigError::Message(
                "matching timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(FanOutLimits {
            max_concurrency: self.max_concurrency,
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            deadline: Duration::from_secs(self.request_deadline_secs),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Stored for sightings submitted without an image URL
    #[serde(default = "default_placeholder_image_url")]
    pub placeholder_image_url: String,
    /// Stored for cases created from inline image data only
    #[serde(default = "default_case_placeholder_image_url")]
    pub case_placeholder_image_url: String,
    /// Largest candidate image that will be downloaded
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            placeholder_image_url: default_placeholder_image_url(),
            case_placeholder_image_url: default_case_placeholder_image_url(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `compact`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_max_payload_bytes() -> usize { 10 * 1024 * 1024 }
fn default_image_cache_bytes() -> u64 { 256 * 1024 * 1024 }
fn default_gemini_endpoint() -> String { "https://generativelanguage.googleapis.com".to_string() }
fn default_gemini_model() -> String { "gemini-2.5-pro".to_string() }
fn default_max_retries() -> u32 { 3 }
fn default_confidence_threshold() -> f64 { crate::core::DEFAULT_CONFIDENCE_THRESHOLD }
fn default_active_statuses() -> Vec<String> {
    vec![
        CaseStatus::ActiveSearch.as_str().to_string(),
        CaseStatus::HighPriority.as_str().to_string(),
        CaseStatus::New.as_str().to_string(),
    ]
}
fn default_max_concurrency() -> usize { 8 }
fn default_call_timeout_secs() -> u64 { 30 }
fn default_request_deadline_secs() -> u64 { 120 }
fn default_retain_sighting_on_failure() -> bool { true }
fn default_placeholder_image_url() -> String { "https://via.placeholder.com/400/sighting".to_string() }
fn default_case_placeholder_image_url() -> String { "https://via.placeholder.com/400".to_string() }
fn default_max_image_bytes() -> usize { 10 * 1024 * 1024 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with FINDTOGETHER__)
    /// 4. DATABASE_URL, GEMINI_API_KEY, LOG_LEVEL and LOG_FORMAT
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Development overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., FINDTOGETHER__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?;

        let settings: Settings = apply_env_overrides(settings)?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the matching workflow cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matching.policy()?;
        self.matching.active_statuses()?;
        self.matching.fan_out_limits()?;
        Ok(())
    }

    /// Matching options handed to the sighting processor
    pub fn sighting_options(&self) -> Result<SightingOptions, ConfigError> {
        Ok(SightingOptions {
            policy: self.matching.policy()?,
            active_statuses: self.matching.active_statuses()?,
            retain_sighting_on_failure: self.matching.retain_sighting_on_failure,
            placeholder_image_url: self.storage.placeholder_image_url.clone(),
        })
    }
}

fn environment() -> Environment {
    Environment::with_prefix("FINDTOGETHER")
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("matching.active_statuses")
        .try_parsing(true)
}

/// Apply the conventional unprefixed variables on top of loaded settings
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }
    if let Ok(api_key) = env::var("GEMINI_API_KEY") {
        builder = builder.set_override("gemini.api_key", api_key)?;
    }
    if let Ok(level) = env::var("LOG_LEVEL") {
        builder = builder.set_override("logging.level", level)?;
    }
    if let Ok(format) = env::var("LOG_FORMAT") {
        builder = builder.set_override("logging.format", format)?;
    }

    builder.build()
}
