//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::core::models::Job;
use crate::core::retry::RetryPolicy;

/// Default endpoint of the free API tier
pub const DEFAULT_API_ENDPOINT: &str = "https://api-free.deepl.com/v2/translate";

/// Settings for the HTTP translation client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_key: String,
    pub api_endpoint: String,
    /// Total attempts per request, including the first one
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("DEEPL_AUTH_KEY").unwrap_or_default(),
            api_endpoint: std::env::var("DEEPL_API_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_API_ENDPOINT.to_string()),
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_ms: 60000,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("DEEPL_AUTH_KEY")
            .map_err(|_| anyhow::anyhow!("DEEPL_AUTH_KEY environment variable is required"))?;

        let api_endpoint = std::env::var("DEEPL_API_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_API_ENDPOINT.to_string());

        let max_retries = std::env::var("MAX_RETRIES")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u32>()?;

        let retry_delay_ms = std::env::var("RETRY_DELAY_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse::<u64>()?;

        let timeout_ms = std::env::var("REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "60000".to_string())
            .parse::<u64>()?;

        Ok(Self {
            api_key,
            api_endpoint,
            max_retries,
            retry_delay_ms,
            timeout_ms,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            return Err(anyhow::anyhow!("API key is required"));
        }

        if self.api_endpoint.is_empty() {
            return Err(anyhow::anyhow!("API endpoint is required"));
        }

        if self.max_retries == 0 {
            return Err(anyhow::anyhow!("max_retries must be greater than 0"));
        }

        Ok(())
    }

    /// Retry policy derived from these settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }
}

/// Contents of the job file (`config.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslateConfig {
    #[serde(default)]
    pub target_lang: Option<String>,
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl TranslateConfig {
    /// Load the job file; the format is always TOML
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", path.display(), e))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;

        if config.jobs.is_empty() {
            warn!("No jobs configured in {}", path.display());
        } else {
            info!("Loaded {} jobs from {}", config.jobs.len(), path.display());
        }

        Ok(config)
    }

    /// Target language for a job: the job override, then the global default
    pub fn target_lang_for(&self, job: &Job) -> Option<String> {
        job.target_lang
            .clone()
            .or_else(|| self.target_lang.clone())
            .filter(|lang| !lang.trim().is_empty())
    }

    /// Source language for a job, if any is configured
    pub fn source_lang_for(&self, job: &Job) -> Option<String> {
        job.source_lang
            .clone()
            .or_else(|| self.source_lang.clone())
            .filter(|lang| !lang.trim().is_empty())
    }
}

/// Directory holding the config file; the cache and error log live there
pub fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
