//! Configuration for the storefront API client
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML file,
//! then environment variables.

use crate::error::ApiResult;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use storefront_core::retry::RetryConfig;
use storefront_core::AppError;

/// Default local Supabase API gateway
const DEFAULT_API_URL: &str = "http://localhost:54321/rest/v1";

/// Config file names searched in the working directory
const CONFIG_CANDIDATES: [&str; 3] = [
    "storefront.toml",
    ".storefront.toml",
    ".config/storefront.toml",
];

/// Environment types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development (typically localhost Supabase)
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

impl Environment {
    /// Parse an environment name; unknown names fall back to development
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        }
    }

    /// Read `STOREFRONT_ENV`
    pub fn from_env() -> Self {
        Self::parse(&env::var("STOREFRONT_ENV").unwrap_or_default())
    }

    /// Retry preset for queries in this environment
    #[must_use]
    pub fn query_retry(self) -> RetryConfig {
        match self {
            Self::Development => RetryConfig::quick(),
            Self::Staging | Self::Production => RetryConfig::default(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the storefront API
    pub base_url: String,
    /// Supabase anonymous key, sent as `apikey` and as the fallback bearer token
    pub anon_key: Option<String>,
    /// Transport ceiling for a single call
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// How long cached query results stay fresh
    #[serde(with = "duration_secs")]
    pub cache_ttl: Duration,
    /// Retry policy for queries
    pub retry: RetryConfig,
    /// Retry policy for cart mutations
    pub mutation_retry: RetryConfig,
    /// Current environment
    pub environment: Environment,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            anon_key: None,
            timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(60),
            retry: RetryConfig::default(),
            mutation_retry: RetryConfig::cart_mutation(),
            environment: Environment::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with environment variables
    ///
    /// Reads:
    /// - `STOREFRONT_API_URL`, or `SUPABASE_URL` (suffixed with `/rest/v1`)
    /// - `SUPABASE_ANON_KEY`
    /// - `STOREFRONT_ENV`: development / staging / production
    /// - `STOREFRONT_TIMEOUT_SECS`
    pub fn from_env() -> ApiResult<Self> {
        let environment = Environment::from_env();
        let config = Self {
            retry: environment.query_retry(),
            environment,
            ..Self::default()
        };
        config.apply_env(|name| env::var(name).ok())
    }

    /// Load a TOML file (explicit path, or the first candidate found), then
    /// apply environment overrides
    pub fn load(path: Option<&Path>) -> ApiResult<Self> {
        let path = path.map(Path::to_path_buf).or_else(find_config_file);
        let config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self {
                retry: Environment::from_env().query_retry(),
                environment: Environment::from_env(),
                ..Self::default()
            },
        };
        config.apply_env(|name| env::var(name).ok())
    }

    /// Parse a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> ApiResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            config_error(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            config_error(format!("Failed to parse config file {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values supplied by `lookup` (environment variables in practice)
    pub fn apply_env<F>(mut self, lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("STOREFRONT_API_URL") {
            self.base_url = url;
        } else if let Some(url) = lookup("SUPABASE_URL") {
            self.base_url = format!("{}/rest/v1", url.trim_end_matches('/'));
        }
        if let Some(key) = lookup("SUPABASE_ANON_KEY") {
            self.anon_key = Some(key);
        }
        if let Some(env_name) = lookup("STOREFRONT_ENV") {
            self.environment = Environment::parse(&env_name);
        }
        if let Some(secs) = lookup("STOREFRONT_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| config_error(format!("STOREFRONT_TIMEOUT_SECS is not a number: {secs}")))?;
            self.timeout = Duration::from_secs(secs);
        }

        self.validate()?;
        Ok(self)
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set anon key
    #[must_use]
    pub fn with_anon_key(mut self, key: impl Into<String>) -> Self {
        self.anon_key = Some(key.into());
        self
    }

    /// Builder-style method to set the transport ceiling
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set cache freshness
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Builder-style method to set query retry config
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Builder-style method to set mutation retry config
    #[must_use]
    pub fn with_mutation_retry(mut self, retry: RetryConfig) -> Self {
        self.mutation_retry = retry;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.base_url.is_empty() {
            return Err(config_error("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(config_error("base_url must start with http:// or https://"));
        }

        if self.timeout.is_zero() {
            return Err(config_error("timeout cannot be zero"));
        }

        if self.retry.max_attempts == 0 || self.mutation_retry.max_attempts == 0 {
            return Err(config_error("max_attempts must be at least 1"));
        }

        Ok(())
    }

    /// Join a path onto the base URL; absolute URLs pass through
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        }
    }
}

fn find_config_file() -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

fn config_error(message: impl Into<String>) -> AppError {
    AppError::unknown(message).with_code("CONFIG_ERROR")
}
