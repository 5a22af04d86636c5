

use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    DEFAULT_API_BASE_URL, DEFAULT_HOST, DEFAULT_MAX_PARALLEL_LOOKUPS, DEFAULT_PORT,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};

const ENV_PREFIX: &str = "MEMBERSCOPE";
const CONFIG_FILE: &str = "memberscope";


#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    pub host: String,
    pub port: u16,

    pub api_base_url: String,
    pub request_timeout_secs: u64,

    pub max_parallel_lookups: usize,
    /// Also run numeric chat ids through chat resolution (title, type, kind check).
    pub resolve_chat_ids: bool,

    /// Development mode: expose upstream diagnostics in error bodies.
    pub detailed_errors: bool,
}

impl CheckerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_parallel_lookups: DEFAULT_MAX_PARALLEL_LOOKUPS,
            resolve_chat_ids: true,
            detailed_errors: false,
        }
    }

    /// Defaults, then `memberscope.{toml,yaml,json}` if present, then `MEMBERSCOPE_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64)?
            .set_default("max_parallel_lookups", DEFAULT_MAX_PARALLEL_LOOKUPS as i64)?
            .set_default("resolve_chat_ids", true)?
            .set_default("detailed_errors", false)?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }
        if self.max_parallel_lookups == 0 {
            return Err(ConfigError::Invalid(
                "max_parallel_lookups must be at least 1".to_string(),
            ));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_base_url is empty".to_string()));
        }
        url::Url::parse(&self.api_base_url)
            .map_err(|e| ConfigError::Invalid(format!("api_base_url: {e}")))?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}
