//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Backend
//! - `MARKETSTALL_BACKEND` - `http` (default) or `memory`
//!
//! ## Required for the `http` backend
//! - `MARKETSTALL_STORE_URL` - Document API base URL
//! - `MARKETSTALL_AUTH_URL` - Auth API base URL
//! - `MARKETSTALL_API_KEY` - Backend web API key
//!
//! ## Optional
//! - `MARKETSTALL_DATA_DIR` - Device storage directory (default: .marketstall)
//! - `MARKETSTALL_CATALOG_TTL_SECS` - Product cache lifetime (default: 300)
//! - `MARKETSTALL_REQUEST_TIMEOUT_SECS` - HTTP request timeout (default: none)
//! - `MARKETSTALL_CART_FAILURE_POLICY` - `rollback` (default) or `optimistic`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::services::cart::PersistFailurePolicy;

const DEFAULT_DATA_DIR: &str = ".marketstall";
const DEFAULT_CATALOG_TTL_SECS: u64 = 300;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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
    "api-key",
];

/// Why the environment could not be turned into a config.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingEnvVar(String),
    #[error("{0} has an unusable value: {1}")]
    InvalidEnvVar(String, String),
    #[error("{0} looks like a placeholder secret: {1}")]
    InsecureSecret(String, String),
}

/// Which backend adapters to build.
#[derive(Debug, Clone)]
pub enum BackendKind {
    /// Hosted document store and auth service.
    Http(HttpBackendConfig),
    /// Everything in process memory. Nothing survives a restart except
    /// device storage.
    Memory,
}

/// Endpoints and credentials for the hosted backend.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct HttpBackendConfig {
    pub store_url: Url,
    pub auth_url: Url,
    pub api_key: SecretString,
}

impl std::fmt::Debug for HttpBackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackendConfig")
            .field("store_url", &self.store_url.as_str())
            .field("auth_url", &self.auth_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Sentry reporting settings.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub backend: BackendKind,
    /// Directory for device storage (guest cart, saved session)
    pub data_dir: PathBuf,
    /// How long the product catalog is cached
    pub catalog_ttl: Duration,
    /// Optional timeout for backend HTTP requests
    pub request_timeout: Option<Duration>,
    /// What happens to the in-memory cart when persisting it fails
    pub cart_failure_policy: PersistFailurePolicy,
    pub sentry: SentryConfig,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let backend = match env.or_default("MARKETSTALL_BACKEND", "http").as_str() {
            "http" => BackendKind::Http(HttpBackendConfig {
                store_url: env.url("MARKETSTALL_STORE_URL")?,
                auth_url: env.url("MARKETSTALL_AUTH_URL")?,
                api_key: env.validated_secret("MARKETSTALL_API_KEY")?,
            }),
            "memory" => BackendKind::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "MARKETSTALL_BACKEND".to_string(),
                    format!("expected 'http' or 'memory', got '{other}'"),
                ));
            }
        };

        let catalog_ttl = Duration::from_secs(
            env.parsed("MARKETSTALL_CATALOG_TTL_SECS")?
                .unwrap_or(DEFAULT_CATALOG_TTL_SECS),
        );
        let request_timeout = env
            .parsed::<u64>("MARKETSTALL_REQUEST_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let cart_failure_policy = env
            .parsed("MARKETSTALL_CART_FAILURE_POLICY")?
            .unwrap_or_default();

        Ok(Self {
            backend,
            data_dir: PathBuf::from(env.or_default("MARKETSTALL_DATA_DIR", DEFAULT_DATA_DIR)),
            catalog_ttl,
            request_timeout,
            cart_failure_policy,
            sentry: SentryConfig {
                dsn: env.optional("SENTRY_DSN"),
                environment: env.optional("SENTRY_ENVIRONMENT"),
            },
        })
    }

    /// Configuration for the in-memory backend with defaults everywhere.
    #[must_use]
    pub fn memory(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Memory,
            data_dir: data_dir.into(),
            catalog_ttl: Duration::from_secs(DEFAULT_CATALOG_TTL_SECS),
            request_timeout: None,
            cart_failure_policy: PersistFailurePolicy::default(),
            sentry: SentryConfig::default(),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable source with the lookup helpers.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable. Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
            })
            .transpose()
    }

    fn url(&self, key: &str) -> Result<Url, ConfigError> {
        let raw = self.required(key)?;
        let url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must be an http(s) base URL".to_string(),
            ));
        }
        Ok(url)
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let secret = SecretString::from(self.required(key)?);
        validate_secret_strength(secret.expose_secret(), key)?;
        Ok(secret)
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

    #[allow(clippy::cast_precision_loss)] // key lengths are tiny
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
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
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const KEY: &str = "AIzaSyB3xY9mK2nL5pQ7rT0uW4zC6dE8fG1hJ";

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| map.get(key).cloned())
    }

    fn http_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MARKETSTALL_STORE_URL", "https://db.shop.test/v1"),
            ("MARKETSTALL_AUTH_URL", "https://auth.shop.test/v1"),
            ("MARKETSTALL_API_KEY", KEY),
        ]
    }

    #[test]
    fn test_memory_backend_defaults() {
        let config = load(&[("MARKETSTALL_BACKEND", "memory")]).unwrap();
        assert!(matches!(config.backend, BackendKind::Memory));
        assert_eq!(config.data_dir, PathBuf::from(".marketstall"));
        assert_eq!(config.catalog_ttl, Duration::from_secs(300));
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.cart_failure_policy, PersistFailurePolicy::Rollback);
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_http_backend_requires_urls_and_key() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "MARKETSTALL_STORE_URL"));

        let config = load(&http_vars()).unwrap();
        let BackendKind::Http(http) = config.backend else {
            panic!("expected http backend");
        };
        assert_eq!(http.store_url.as_str(), "https://db.shop.test/v1");
        assert_eq!(http.api_key.expose_secret(), KEY);
    }

    #[test]
    fn test_optional_values_parsed() {
        let mut vars = http_vars();
        vars.extend([
            ("MARKETSTALL_CATALOG_TTL_SECS", "30"),
            ("MARKETSTALL_REQUEST_TIMEOUT_SECS", "10"),
            ("MARKETSTALL_CART_FAILURE_POLICY", "optimistic"),
            ("MARKETSTALL_DATA_DIR", "/tmp/shop"),
            ("SENTRY_ENVIRONMENT", "staging"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.catalog_ttl, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(10)));
        assert_eq!(
            config.cart_failure_policy,
            PersistFailurePolicy::KeepOptimistic
        );
        assert_eq!(config.data_dir, PathBuf::from("/tmp/shop"));
        assert_eq!(config.sentry.environment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (key, value) in [
            ("MARKETSTALL_BACKEND", "sqlite"),
            ("MARKETSTALL_CATALOG_TTL_SECS", "soon"),
            ("MARKETSTALL_CART_FAILURE_POLICY", "sometimes"),
            ("MARKETSTALL_STORE_URL", "not a url"),
        ] {
            let mut vars = http_vars();
            vars.retain(|(k, _)| *k != key);
            vars.push((key, value));
            assert!(
                matches!(load(&vars), Err(ConfigError::InvalidEnvVar(ref k, _)) if k == key),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_placeholder_api_key_rejected() {
        let mut vars = http_vars();
        vars.retain(|(k, _)| *k != "MARKETSTALL_API_KEY");
        vars.push(("MARKETSTALL_API_KEY", "your-api-key-here"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InsecureSecret(_, _))
        ));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy(KEY) > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_low_entropy_secret_rejected() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = load(&http_vars()).unwrap();
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("db.shop.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(KEY));
    }
}
