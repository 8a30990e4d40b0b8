//! Relay configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STORAGE_URL` - Base URL of the object storage service
//! - `STORAGE_KEY` - Service key used to write to the bucket
//!
//! ## Optional
//! - `RELAY_HOST` - Bind address (default: 127.0.0.1)
//! - `RELAY_PORT` - Listen port, falls back to `PORT` (default: 3000)
//! - `STORAGE_BUCKET` - Bucket for generated images (default: try-on-results)
//! - `INFERENCE_SPACE` - Hosted model Space id (default: yisol/IDM-VTON)
//! - `INFERENCE_BASE_URL` - Override for the Space's base URL
//! - `INFERENCE_TOKEN` - Access token for the inference provider
//! - `RELAY_CORS_ORIGINS` - `*` or a comma-separated list of origins (default: *)
//! - `RELAY_MAX_IMAGE_BYTES` - Largest image fetched from any URL (default: 10 MiB)
//! - `RELAY_FETCH_TIMEOUT_SECS` - Timeout for each image fetch (default: 30)
//! - `RELAY_INFERENCE_TIMEOUT_SECS` - Timeout for one inference call (default: 300)
//! - `RELAY_RATE_LIMIT_BURST` - Per-IP burst on `/generate-tryon`, 0 disables (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_PORT: &str = "3000";
const DEFAULT_BUCKET: &str = "try-on-results";
const DEFAULT_SPACE: &str = "yisol/IDM-VTON";
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_RATE_LIMIT_BURST: u32 = 5;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Relay application configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Object storage configuration
    pub storage: StorageConfig,
    /// Inference provider configuration
    pub inference: InferenceConfig,
    /// Limits applied to outbound calls
    pub limits: FetchLimits,
    /// Allowed CORS origins
    pub cors: CorsOrigins,
    /// Per-IP burst allowed on the generate endpoint (0 disables rate limiting)
    pub rate_limit_burst: u32,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Object storage configuration.
///
/// Implements `Debug` manually to redact the service key.
#[derive(Clone)]
pub struct StorageConfig {
    /// Base URL of the storage service
    pub url: Url,
    /// Service key with write access to the bucket
    pub key: SecretString,
    /// Bucket receiving generated images
    pub bucket: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("url", &self.url.as_str())
            .field("key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// Inference provider configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct InferenceConfig {
    /// Hosted Space id (e.g., yisol/IDM-VTON)
    pub space: String,
    /// Base URL of the Space's API
    pub base_url: Url,
    /// Optional access token
    pub token: Option<SecretString>,
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("space", &self.space)
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Size and time limits for outbound calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    /// Largest body accepted from any image URL
    pub max_image_bytes: usize,
    /// Timeout for one image fetch
    pub fetch_timeout: Duration,
    /// Timeout for one inference call, upload through result event
    pub inference_timeout: Duration,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            inference_timeout: Duration::from_secs(DEFAULT_INFERENCE_TIMEOUT_SECS),
        }
    }
}

/// Origins allowed to call the relay from a browser.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CorsOrigins {
    /// Any origin (`*`).
    #[default]
    Any,
    /// Only the listed origins.
    List(Vec<String>),
}

impl CorsOrigins {
    /// Parse `*` or a comma-separated origin list.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let origins: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
            Self::Any
        } else {
            Self::List(origins)
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("RELAY_HOST", &get_env_or_default("RELAY_HOST", "127.0.0.1"))?;
        let port_value = get_optional_env("RELAY_PORT")
            .or_else(|| get_optional_env("PORT"))
            .unwrap_or_else(|| DEFAULT_PORT.to_string());
        let port = parse_env("RELAY_PORT", &port_value)?;

        let storage = StorageConfig::from_env()?;
        let inference = InferenceConfig::from_env()?;

        let limits = FetchLimits {
            max_image_bytes: parse_env_or(
                "RELAY_MAX_IMAGE_BYTES",
                DEFAULT_MAX_IMAGE_BYTES,
            )?,
            fetch_timeout: Duration::from_secs(parse_env_or(
                "RELAY_FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )?),
            inference_timeout: Duration::from_secs(parse_env_or(
                "RELAY_INFERENCE_TIMEOUT_SECS",
                DEFAULT_INFERENCE_TIMEOUT_SECS,
            )?),
        };

        Ok(Self {
            host,
            port,
            storage,
            inference,
            limits,
            cors: CorsOrigins::parse(&get_env_or_default("RELAY_CORS_ORIGINS", "*")),
            rate_limit_burst: parse_env_or("RELAY_RATE_LIMIT_BURST", DEFAULT_RATE_LIMIT_BURST)?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: parse_env("STORAGE_URL", &get_required_env("STORAGE_URL")?)?,
            key: get_validated_secret("STORAGE_KEY")?,
            bucket: get_env_or_default("STORAGE_BUCKET", DEFAULT_BUCKET),
        })
    }
}

impl InferenceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let space = get_env_or_default("INFERENCE_SPACE", DEFAULT_SPACE);
        let base_url = match get_optional_env("INFERENCE_BASE_URL") {
            Some(value) => parse_env("INFERENCE_BASE_URL", &value)?,
            None => space_base_url(&space)?,
        };
        let token = match get_optional_env("INFERENCE_TOKEN") {
            Some(_) => Some(get_validated_secret("INFERENCE_TOKEN")?),
            None => None,
        };

        Ok(Self {
            space,
            base_url,
            token,
        })
    }
}

/// Derive a hosted Space's API host from its `owner/name` id.
///
/// `yisol/IDM-VTON` is served from `https://yisol-idm-vton.hf.space`.
fn space_base_url(space: &str) -> Result<Url, ConfigError> {
    let Some((owner, name)) = space.split_once('/') else {
        return Err(ConfigError::InvalidEnvVar(
            "INFERENCE_SPACE".to_string(),
            format!("expected owner/name, got '{space}'"),
        ));
    };

    let subdomain = format!("{owner}-{name}")
        .to_lowercase()
        .replace(['.', '_'], "-");

    parse_env("INFERENCE_SPACE", &format!("https://{subdomain}.hf.space"))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a value read from `key`, reporting failures against that variable.
fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an optional environment variable, using `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |value| parse_env(key, &value))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real keys and tokens have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
