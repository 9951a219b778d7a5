//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

use bookwatch_connectors::venue_rest::DEFAULT_VENUE_URL;

use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Venue connection configuration
    pub venue: VenueConfig,

    /// Depth feed configuration
    pub depth: DepthFeedConfig,

    /// Position reconciler configuration
    pub reconciler: ReconcilerConfig,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Venue connection configuration.
#[derive(Debug, Clone)]
pub struct VenueConfig {
    /// Base URL of the venue's polling API
    pub base_url: String,
}

/// Depth feed configuration.
#[derive(Debug, Clone, Copy)]
pub struct DepthFeedConfig {
    /// Delay between order book snapshots
    pub poll_interval: Duration,
}

/// Position reconciler configuration.
///
/// # Invariants
/// - `lookup_timeout < interval`, so every tick resolves before the next one
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerConfig {
    interval: Duration,
    lookup_timeout: Duration,
}

impl ReconcilerConfig {
    /// Create a validated reconciler configuration.
    ///
    /// # Errors
    /// Returns `DaemonError::Config` if the interval is zero or the lookup
    /// timeout is not strictly smaller than the interval.
    pub fn new(interval: Duration, lookup_timeout: Duration) -> DaemonResult<Self> {
        if interval.is_zero() {
            return Err(DaemonError::Config("Reconcile interval must be positive".to_string()));
        }
        if lookup_timeout >= interval {
            return Err(DaemonError::Config(format!(
                "Lookup timeout ({}ms) must be shorter than reconcile interval ({}ms)",
                lookup_timeout.as_millis(),
                interval.as_millis()
            )));
        }
        Ok(Self {
            interval,
            lookup_timeout,
        })
    }

    /// Delay between reconciliation ticks
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Upper bound for a single status lookup
    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10_000),
            lookup_timeout: Duration::from_millis(5_000),
        }
    }
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses the stub venue)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    fn from_vars(var: impl Fn(&str) -> Option<String>) -> DaemonResult<Self> {
        let environment = Self::load_environment(&var)?;
        let api = Self::load_api_config(&var)?;
        let venue = VenueConfig {
            base_url: var("BOOKWATCH_VENUE_URL").unwrap_or_else(|| DEFAULT_VENUE_URL.to_string()),
        };
        let depth = DepthFeedConfig {
            poll_interval: Self::load_millis(&var, "BOOKWATCH_DEPTH_POLL_MS", 5_000)?,
        };
        if depth.poll_interval.is_zero() {
            return Err(DaemonError::Config("BOOKWATCH_DEPTH_POLL_MS must be positive".to_string()));
        }
        let reconciler = ReconcilerConfig::new(
            Self::load_millis(&var, "BOOKWATCH_RECONCILE_INTERVAL_MS", 10_000)?,
            Self::load_millis(&var, "BOOKWATCH_LOOKUP_TIMEOUT_MS", 5_000)?,
        )?;

        Ok(Self {
            api,
            venue,
            depth,
            reconciler,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            venue: VenueConfig {
                base_url: DEFAULT_VENUE_URL.to_string(),
            },
            depth: DepthFeedConfig {
                poll_interval: Duration::from_millis(100),
            },
            reconciler: ReconcilerConfig {
                interval: Duration::from_millis(200),
                lookup_timeout: Duration::from_millis(100),
            },
            environment: Environment::Test,
        }
    }

    fn load_environment(var: &impl Fn(&str) -> Option<String>) -> DaemonResult<Environment> {
        let env_str = var("BOOKWATCH_ENV").unwrap_or_else(|| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid BOOKWATCH_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_api_config(var: &impl Fn(&str) -> Option<String>) -> DaemonResult<ApiConfig> {
        let host = var("BOOKWATCH_API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port_str = var("BOOKWATCH_API_PORT").unwrap_or_else(|| "8080".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| DaemonError::Config(format!("Invalid BOOKWATCH_API_PORT: {}", port_str)))?;

        Ok(ApiConfig { host, port })
    }

    fn load_millis(
        var: &impl Fn(&str) -> Option<String>,
        key: &str,
        default_ms: u64,
    ) -> DaemonResult<Duration> {
        match var(key) {
            Some(val) => val
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            None => Ok(Duration::from_millis(default_ms)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            venue: VenueConfig {
                base_url: DEFAULT_VENUE_URL.to_string(),
            },
            depth: DepthFeedConfig {
                poll_interval: Duration::from_millis(5_000),
            },
            reconciler: ReconcilerConfig::default(),
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> DaemonResult<Config> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_vars(|key| map.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.reconciler.interval(), Duration::from_secs(10));
        assert_eq!(config.reconciler.lookup_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.api.port, 0);
        assert_eq!(config.environment, Environment::Test);
        assert!(config.reconciler.lookup_timeout() < config.reconciler.interval());
    }

    #[test]
    fn test_empty_vars_match_defaults() {
        let config = load(&[]).unwrap();
        let default = Config::default();

        assert_eq!(config.api.host, default.api.host);
        assert_eq!(config.venue.base_url, DEFAULT_VENUE_URL);
        assert_eq!(config.depth.poll_interval, Duration::from_secs(5));
        assert_eq!(config.reconciler.interval(), default.reconciler.interval());
    }

    #[test]
    fn test_vars_override_defaults() {
        let config = load(&[
            ("BOOKWATCH_ENV", "prod"),
            ("BOOKWATCH_API_PORT", "9090"),
            ("BOOKWATCH_VENUE_URL", "http://venue:4000"),
            ("BOOKWATCH_RECONCILE_INTERVAL_MS", "2000"),
            ("BOOKWATCH_LOOKUP_TIMEOUT_MS", "750"),
        ])
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.api.port, 9090);
        assert_eq!(config.venue.base_url, "http://venue:4000");
        assert_eq!(config.reconciler.interval(), Duration::from_millis(2000));
        assert_eq!(config.reconciler.lookup_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn test_lookup_timeout_must_be_shorter_than_interval() {
        let err = load(&[
            ("BOOKWATCH_RECONCILE_INTERVAL_MS", "1000"),
            ("BOOKWATCH_LOOKUP_TIMEOUT_MS", "1000"),
        ])
        .unwrap_err();
        assert!(matches!(err, DaemonError::Config(_)));

        assert!(ReconcilerConfig::new(Duration::ZERO, Duration::ZERO).is_err());
        assert!(ReconcilerConfig::new(Duration::from_secs(2), Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(load(&[("BOOKWATCH_ENV", "staging")]), Err(DaemonError::Config(_))));
        assert!(matches!(load(&[("BOOKWATCH_API_PORT", "http")]), Err(DaemonError::Config(_))));
        assert!(matches!(
            load(&[("BOOKWATCH_DEPTH_POLL_MS", "-5")]),
            Err(DaemonError::Config(_))
        ));
        assert!(matches!(
            load(&[("BOOKWATCH_DEPTH_POLL_MS", "0")]),
            Err(DaemonError::Config(_))
        ));
    }
}
