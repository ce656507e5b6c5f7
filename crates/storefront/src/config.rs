//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `AUTH_JWT_PUBLIC_KEY` or `AUTH_JWT_SECRET` - Key for verifying identity provider session tokens
//!   (RS256 PEM public key, or HS256 shared secret)
//! - `IDENTITY_WEBHOOK_SECRET` - Signing secret for identity lifecycle webhooks (`whsec_...`)
//! - `CLOUDINARY_URL` - Image CDN credentials (`cloudinary://<api_key>:<api_secret>@<cloud_name>`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `AUTH_JWT_ISSUER` - Expected `iss` claim of session tokens
//! - `ORDER_BATCH_MAX_SIZE` - Max order events per consumer batch (default: 5)
//! - `ORDER_BATCH_WINDOW_SECS` - Max wait before flushing a partial batch (default: 5)
//! - `ORDER_MAX_DELIVERY_ATTEMPTS` - Deliveries per event before it is dropped (default: 5)
//! - `ORDER_EVENT_QUEUE_CAPACITY` - Bounded queue size between intake and consumer (default: 1024)
//! - `ORDER_LINE_ITEM_POLICY` - `skip` or `reject` malformed line items (default: skip)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::services::pricing::LineItemPolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Session token verification
    pub auth: AuthConfig,
    /// Signing secret for identity lifecycle webhooks
    pub identity_webhook_secret: SecretString,
    /// Image CDN credentials
    pub cloudinary: CloudinaryConfig,
    /// Order pipeline tuning
    pub orders: OrderConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Key material for verifying session tokens.
#[derive(Clone)]
pub enum JwtKey {
    /// RS256 public key in PEM form (identity provider's published key).
    RsaPem(String),
    /// HS256 shared secret.
    Secret(SecretString),
}

impl std::fmt::Debug for JwtKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RsaPem(_) => f.write_str("RsaPem(..)"),
            Self::Secret(_) => f.write_str("Secret([REDACTED])"),
        }
    }
}

/// Session token verification settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Verification key
    pub key: JwtKey,
    /// Expected issuer, if the provider sets one
    pub issuer: Option<String>,
}

/// Cloudinary upload credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct CloudinaryConfig {
    /// Cloud name (account namespace in upload URLs)
    pub cloud_name: String,
    /// API key (public half of the credential pair)
    pub api_key: String,
    /// API secret used to sign upload requests
    pub api_secret: SecretString,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

impl FromStr for CloudinaryConfig {
    type Err = ConfigError;

    /// Parse a `cloudinary://<api_key>:<api_secret>@<cloud_name>` URL.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |msg: &str| ConfigError::InvalidEnvVar("CLOUDINARY_URL".to_string(), msg.to_string());

        let url = Url::parse(s).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "cloudinary" {
            return Err(invalid("scheme must be cloudinary://"));
        }

        let cloud_name = url.host_str().filter(|h| !h.is_empty()).ok_or_else(|| invalid("missing cloud name"))?;
        let api_key = url.username();
        let api_secret = url.password().ok_or_else(|| invalid("missing api secret"))?;
        if api_key.is_empty() {
            return Err(invalid("missing api key"));
        }

        Ok(Self {
            cloud_name: cloud_name.to_string(),
            api_key: api_key.to_string(),
            api_secret: SecretString::from(api_secret.to_string()),
        })
    }
}

/// Tuning for order intake and the batched order consumer.
#[derive(Debug, Clone)]
pub struct OrderConfig {
    /// Flush a batch once it holds this many events
    pub batch_max_size: usize,
    /// Flush a partial batch after this long
    pub batch_window: Duration,
    /// Deliveries per event before it is dropped
    pub max_delivery_attempts: u32,
    /// Capacity of the queue between intake and consumer
    pub queue_capacity: usize,
    /// Handling of malformed line items
    pub line_item_policy: LineItemPolicy,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            batch_max_size: 5,
            batch_window: Duration::from_secs(5),
            max_delivery_attempts: 5,
            queue_capacity: 1024,
            line_item_policy: LineItemPolicy::Skip,
        }
    }
}

impl StorefrontConfig {
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

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_parsed_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("STOREFRONT_PORT", "3000")?;

        let auth = AuthConfig::from_env()?;
        let identity_webhook_secret = get_validated_secret("IDENTITY_WEBHOOK_SECRET")?;
        let cloudinary = get_required_env("CLOUDINARY_URL")?.parse::<CloudinaryConfig>()?;
        let orders = OrderConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            auth,
            identity_webhook_secret,
            cloudinary,
            orders,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_parsed_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: get_parsed_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let key = if let Some(pem) = get_optional_env("AUTH_JWT_PUBLIC_KEY") {
            // Env files commonly carry PEM blocks with escaped newlines
            JwtKey::RsaPem(pem.replace("\\n", "\n"))
        } else if std::env::var("AUTH_JWT_SECRET").is_ok() {
            JwtKey::Secret(get_validated_secret("AUTH_JWT_SECRET")?)
        } else {
            return Err(ConfigError::MissingEnvVar(
                "AUTH_JWT_PUBLIC_KEY or AUTH_JWT_SECRET".to_string(),
            ));
        };

        Ok(Self {
            key,
            issuer: get_optional_env("AUTH_JWT_ISSUER"),
        })
    }
}

impl OrderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let batch_max_size: usize = get_parsed_or_default("ORDER_BATCH_MAX_SIZE", "5")?;
        if batch_max_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ORDER_BATCH_MAX_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let queue_capacity: usize = get_parsed_or_default("ORDER_EVENT_QUEUE_CAPACITY", "1024")?;
        if queue_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ORDER_EVENT_QUEUE_CAPACITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            batch_max_size,
            batch_window: Duration::from_secs(get_parsed_or_default("ORDER_BATCH_WINDOW_SECS", "5")?),
            max_delivery_attempts: get_parsed_or_default::<u32>("ORDER_MAX_DELIVERY_ATTEMPTS", "5")?.max(1),
            queue_capacity,
            line_item_policy: get_parsed_or_default("ORDER_LINE_ITEM_POLICY", "skip")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
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
