//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CONTENT_API_URL` - Origin of the content backend (e.g., `https://cms.example.com`)
//!
//! ## Optional
//! - `CONTENT_API_PATH` - Path prefix of the REST API (default: /api)
//! - `CONTENT_MEDIA_URL` - Base URL for relative upload paths (default: `CONTENT_API_URL`)
//! - `CONTENT_API_TOKEN` - Bearer token for protected collections
//! - `CONTENT_TIMEOUT_SECS` - HTTP request timeout in seconds (default: 10)
//! - `BOUTIQUE_DATA_DIR` - Directory holding the persisted cart (default: .boutique)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
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

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct BoutiqueConfig {
    /// Content backend configuration
    pub content: ContentConfig,
    /// Directory for the file-backed cart store
    pub data_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Content backend configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct ContentConfig {
    /// Backend origin
    pub api_url: Url,
    /// REST API path prefix (e.g., /api)
    pub api_path: String,
    /// Base URL prepended to relative upload paths
    pub media_url: Url,
    /// Optional bearer token
    pub api_token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for ContentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_path", &self.api_path)
            .field("media_url", &self.media_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BoutiqueConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`BoutiqueConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let content = ContentConfig::from_env(&env)?;
        let data_dir = PathBuf::from(env.get_or_default("BOUTIQUE_DATA_DIR", ".boutique"));
        let sentry_dsn = env.get_optional("SENTRY_DSN");

        Ok(Self {
            content,
            data_dir,
            sentry_dsn,
        })
    }
}

impl ContentConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let api_url = env.get_url("CONTENT_API_URL")?;
        let api_path = normalize_api_path(&env.get_or_default("CONTENT_API_PATH", "/api"));
        let media_url = match env.get_optional("CONTENT_MEDIA_URL") {
            Some(_) => env.get_url("CONTENT_MEDIA_URL")?,
            None => api_url.clone(),
        };
        let api_token = env.get_optional_secret("CONTENT_API_TOKEN")?;
        let timeout_secs = env
            .get_or_default("CONTENT_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CONTENT_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            api_url,
            api_path,
            media_url,
            api_token,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Root URL of the REST API (origin + path prefix, no trailing slash).
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.api_url.as_str().trim_end_matches('/'),
            self.api_path
        )
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable source used while loading.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get a required variable.
    fn get_required(&self, key: &str) -> Result<String, ConfigError> {
        (self.0)(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable; empty values count as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a required variable as an absolute URL.
    fn get_url(&self, key: &str) -> Result<Url, ConfigError> {
        let raw = self.get_required(key)?;
        Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Get an optional secret, validating it if present.
    fn get_optional_secret(&self, key: &str) -> Result<Option<SecretString>, ConfigError> {
        let Some(value) = self.get_optional(key) else {
            return Ok(None);
        };
        let secret = SecretString::from(value);
        validate_secret_strength(secret.expose_secret(), key)?;
        Ok(Some(secret))
    }
}

/// Ensure the API path starts with `/` and has no trailing `/`.
fn normalize_api_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
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
    let len = s.chars().count() as f64;
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

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
