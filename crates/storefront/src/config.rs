//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATA_STORE_URL` - Base URL of the hosted data store
//! - `DATA_STORE_ANON_KEY` - Public (anon) API key of the data store
//!
//! ## Optional
//! - `RELAY_URL` - Base URL of the try-on relay (default: <http://localhost:3000>)
//! - `UPLOADS_BUCKET` - Bucket for user photos (default: user-uploads)

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Relay address used when `RELAY_URL` is unset.
pub const DEFAULT_RELAY_URL: &str = "http://localhost:3000";
const DEFAULT_UPLOADS_BUCKET: &str = "user-uploads";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &["your-", "changeme", "replace", "placeholder", "xxx", "todo"];

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

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Base URL of the hosted data store
    pub data_store_url: Url,
    /// Public API key sent with every data store request
    pub anon_key: SecretString,
    /// Base URL of the try-on relay
    pub relay_url: Url,
    /// Bucket receiving user photos for try-on
    pub uploads_bucket: String,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("data_store_url", &self.data_store_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("relay_url", &self.relay_url.as_str())
            .field("uploads_bucket", &self.uploads_bucket)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the API key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let anon_key = get_required_env("DATA_STORE_ANON_KEY")?;
        validate_secret_strength(&anon_key, "DATA_STORE_ANON_KEY")?;

        Ok(Self {
            data_store_url: parse_url("DATA_STORE_URL", &get_required_env("DATA_STORE_URL")?)?,
            anon_key: SecretString::from(anon_key),
            relay_url: parse_url(
                "RELAY_URL",
                &std::env::var("RELAY_URL").unwrap_or_else(|_| DEFAULT_RELAY_URL.to_string()),
            )?,
            uploads_bucket: std::env::var("UPLOADS_BUCKET")
                .unwrap_or_else(|_| DEFAULT_UPLOADS_BUCKET.to_string()),
        })
    }
}

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq = std::collections::HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0_usize) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("entropy too low ({entropy:.2} bits/char)"),
        ));
    }

    Ok(())
}
