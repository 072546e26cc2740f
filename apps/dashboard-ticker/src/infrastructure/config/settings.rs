//! Service Configuration Settings
//!
//! Configuration types for the ticker service, loaded from environment
//! variables.

use std::time::Duration;

use crate::application::services::TickerSettings;

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Port serving the REST API, WebSocket, health and metrics.
    pub http_port: u16,
    /// How long in-flight requests may run after shutdown is requested.
    pub shutdown_grace: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: 3000,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

/// Feed retrieval and refresh settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// Upper bound on one feed fetch.
    pub timeout: Duration,
    /// Scheduler period when no dashboard qualifies for polling.
    pub default_refresh_interval: Duration,
    /// `User-Agent` sent to feed hosts.
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            default_refresh_interval: Duration::from_millis(300_000),
            user_agent: default_user_agent(),
        }
    }
}

/// Viewer delivery settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastSettings {
    /// Outbound queue length per connection.
    pub connection_buffer: usize,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            connection_buffer: 256,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// HTTP listener settings.
    pub server: ServerSettings,
    /// Feed retrieval settings.
    pub fetch: FetchSettings,
    /// Viewer delivery settings.
    pub broadcast: BroadcastSettings,
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_defaults = ServerSettings::default();
        let fetch_defaults = FetchSettings::default();

        let server = ServerSettings {
            http_port: parse_env_u16(&lookup, "TICKER_HTTP_PORT", server_defaults.http_port),
            shutdown_grace: parse_env_duration_secs(
                &lookup,
                "TICKER_SHUTDOWN_GRACE_SECS",
                server_defaults.shutdown_grace,
            ),
        };

        let fetch = FetchSettings {
            timeout: parse_env_duration_millis(
                &lookup,
                "TICKER_FETCH_TIMEOUT_MS",
                fetch_defaults.timeout,
            ),
            default_refresh_interval: parse_env_duration_millis(
                &lookup,
                "TICKER_DEFAULT_REFRESH_INTERVAL_MS",
                fetch_defaults.default_refresh_interval,
            ),
            user_agent: lookup("TICKER_USER_AGENT")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(fetch_defaults.user_agent),
        };

        let broadcast = BroadcastSettings {
            connection_buffer: parse_env_usize(
                &lookup,
                "TICKER_CONNECTION_BUFFER",
                BroadcastSettings::default().connection_buffer,
            ),
        };

        let config = Self {
            server,
            fetch,
            broadcast,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "TICKER_FETCH_TIMEOUT_MS",
                reason: "must be greater than zero",
            });
        }
        if self.fetch.default_refresh_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "TICKER_DEFAULT_REFRESH_INTERVAL_MS",
                reason: "must be greater than zero",
            });
        }
        if self.broadcast.connection_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TICKER_CONNECTION_BUFFER",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    /// Engine tuning derived from these settings.
    #[must_use]
    pub const fn ticker_settings(&self) -> TickerSettings {
        TickerSettings {
            fetch_timeout: self.fetch.timeout,
            default_refresh_interval: self.fetch.default_refresh_interval,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable holds a value outside its range.
    #[error("environment variable {key} {reason}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

fn default_user_agent() -> String {
    format!("dashboard-ticker/{}", env!("CARGO_PKG_VERSION"))
}

fn parse_env_u16(lookup: impl Fn(&str) -> Option<String>, key: &str, default: u16) -> u16 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(lookup: impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
