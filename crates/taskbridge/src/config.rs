// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::bridge::BridgeConfig;

/// taskbridge configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL or SQLite connection URL
    pub database_url: String,
    /// HTTP server address
    pub http_addr: SocketAddr,
    /// Bridge tuning
    pub bridge: BridgeConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Database (one of):
    /// - `TASKBRIDGE_DATABASE_URL`: PostgreSQL or SQLite connection string
    /// - `TASKBRIDGE_DB_HOST`, `TASKBRIDGE_DB_USER`, `TASKBRIDGE_DB_NAME` (required),
    ///   `TASKBRIDGE_DB_PASSWORD` (default empty), `TASKBRIDGE_DB_PORT` (default 5432):
    ///   parts of a PostgreSQL URL
    ///
    /// Optional (with defaults):
    /// - `TASKBRIDGE_HTTP_PORT`: HTTP server port (default: 8080)
    /// - `TASKBRIDGE_REQUEST_TIMEOUT_MS`: Per-request timeout (default: 5000)
    /// - `TASKBRIDGE_QUEUE_CAPACITY`: Outbound queue bound (default: 1024)
    /// - `TASKBRIDGE_MAX_IN_FLIGHT`: Maximum outstanding requests (default: 1024)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = match std::env::var("TASKBRIDGE_DATABASE_URL") {
            Ok(url) => url,
            Err(_) => database_url_from_parts()?,
        };

        let http_port: u16 = parse_var(
            "TASKBRIDGE_HTTP_PORT",
            "8080",
            "must be a valid port number",
        )?;

        let timeout_ms: u64 = parse_var(
            "TASKBRIDGE_REQUEST_TIMEOUT_MS",
            "5000",
            "must be a positive integer",
        )?;
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "TASKBRIDGE_REQUEST_TIMEOUT_MS",
                "must be a positive integer",
            ));
        }

        let queue_capacity: usize = parse_var(
            "TASKBRIDGE_QUEUE_CAPACITY",
            "1024",
            "must be a positive integer",
        )?;
        if queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "TASKBRIDGE_QUEUE_CAPACITY",
                "must be a positive integer",
            ));
        }

        let max_in_flight: usize = parse_var(
            "TASKBRIDGE_MAX_IN_FLIGHT",
            "1024",
            "must be a positive integer",
        )?;
        if max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "TASKBRIDGE_MAX_IN_FLIGHT",
                "must be a positive integer",
            ));
        }

        Ok(Self {
            database_url,
            http_addr: SocketAddr::from(([0, 0, 0, 0], http_port)),
            bridge: BridgeConfig {
                request_timeout: Duration::from_millis(timeout_ms),
                queue_capacity,
                max_in_flight,
                ..BridgeConfig::default()
            },
        })
    }
}

fn parse_var<T: FromStr>(
    key: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::Invalid(key, expected))
}

fn database_url_from_parts() -> Result<String, ConfigError> {
    let host = std::env::var("TASKBRIDGE_DB_HOST")
        .map_err(|_| ConfigError::Missing("TASKBRIDGE_DATABASE_URL"))?;
    let user = std::env::var("TASKBRIDGE_DB_USER")
        .map_err(|_| ConfigError::Missing("TASKBRIDGE_DB_USER"))?;
    let name = std::env::var("TASKBRIDGE_DB_NAME")
        .map_err(|_| ConfigError::Missing("TASKBRIDGE_DB_NAME"))?;
    let password = std::env::var("TASKBRIDGE_DB_PASSWORD").unwrap_or_default();
    let port: u16 = parse_var("TASKBRIDGE_DB_PORT", "5432", "must be a valid port number")?;

    Ok(format!(
        "postgres://{}:{}@{}:{}/{}",
        user, password, host, port, name
    ))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 10] = [
        "TASKBRIDGE_DATABASE_URL",
        "TASKBRIDGE_DB_HOST",
        "TASKBRIDGE_DB_PORT",
        "TASKBRIDGE_DB_USER",
        "TASKBRIDGE_DB_PASSWORD",
        "TASKBRIDGE_DB_NAME",
        "TASKBRIDGE_HTTP_PORT",
        "TASKBRIDGE_REQUEST_TIMEOUT_MS",
        "TASKBRIDGE_QUEUE_CAPACITY",
        "TASKBRIDGE_MAX_IN_FLIGHT",
    ];

    /// Helper to set env vars for a test and restore them after
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        /// Start from a clean slate: every taskbridge variable unset.
        fn clean() -> Self {
            let mut guard = Self { vars: Vec::new() };
            for key in ALL_VARS {
                guard.remove(key);
            }
            guard
        }

        fn set(&mut self, key: &str, value: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }

        fn remove(&mut self, key: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::remove_var(key) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.drain(..).rev() {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(&key, v),
                        None => env::remove_var(&key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let mut guard = EnvGuard::clean();

        guard.set("TASKBRIDGE_DATABASE_URL", "postgres://localhost/tasks");

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "postgres://localhost/tasks");
        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.bridge.request_timeout, Duration::from_millis(5000));
        assert_eq!(config.bridge.queue_capacity, 1024);
        assert_eq!(config.bridge.max_in_flight, 1024);
        assert_eq!(config.bridge.token_space, u64::MAX);
    }

    #[test]
    fn test_config_from_env_all_custom() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let mut guard = EnvGuard::clean();

        guard.set("TASKBRIDGE_DATABASE_URL", "sqlite:tasks.db");
        guard.set("TASKBRIDGE_HTTP_PORT", "9999");
        guard.set("TASKBRIDGE_REQUEST_TIMEOUT_MS", "250");
        guard.set("TASKBRIDGE_QUEUE_CAPACITY", "16");
        guard.set("TASKBRIDGE_MAX_IN_FLIGHT", "8");

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "sqlite:tasks.db");
        assert_eq!(config.http_addr.port(), 9999);
        assert_eq!(config.bridge.request_timeout, Duration::from_millis(250));
        assert_eq!(config.bridge.queue_capacity, 16);
        assert_eq!(config.bridge.max_in_flight, 8);
    }

    #[test]
    fn test_config_database_url_from_parts() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let mut guard = EnvGuard::clean();

        guard.set("TASKBRIDGE_DB_HOST", "db");
        guard.set("TASKBRIDGE_DB_USER", "app");
        guard.set("TASKBRIDGE_DB_PASSWORD", "secret");
        guard.set("TASKBRIDGE_DB_NAME", "tasks");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database_url, "postgres://app:secret@db:5432/tasks");

        guard.set("TASKBRIDGE_DB_PORT", "6543");
        let config = Config::from_env().unwrap();
        assert_eq!(config.database_url, "postgres://app:secret@db:6543/tasks");
    }

    #[test]
    fn test_config_full_url_wins_over_parts() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let mut guard = EnvGuard::clean();

        guard.set("TASKBRIDGE_DATABASE_URL", "postgres://primary/tasks");
        guard.set("TASKBRIDGE_DB_HOST", "ignored");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database_url, "postgres://primary/tasks");
    }

    #[test]
    fn test_config_missing_database() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _guard = EnvGuard::clean();

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TASKBRIDGE_DATABASE_URL")));
        assert!(err.to_string().contains("TASKBRIDGE_DATABASE_URL"));
    }

    #[test]
    fn test_config_partial_database_parts() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let mut guard = EnvGuard::clean();

        guard.set("TASKBRIDGE_DB_HOST", "db");
        guard.set("TASKBRIDGE_DB_USER", "app");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TASKBRIDGE_DB_NAME")));
    }

    #[test]
    fn test_config_invalid_http_port() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let mut guard = EnvGuard::clean();

        guard.set("TASKBRIDGE_DATABASE_URL", "postgres://localhost/tasks");

        for bad in ["not_a_number", "99999"] {
            guard.set("TASKBRIDGE_HTTP_PORT", bad);
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::Invalid("TASKBRIDGE_HTTP_PORT", _)));
        }
    }

    #[test]
    fn test_config_rejects_zero_bounds() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let mut guard = EnvGuard::clean();

        guard.set("TASKBRIDGE_DATABASE_URL", "postgres://localhost/tasks");

        for key in [
            "TASKBRIDGE_REQUEST_TIMEOUT_MS",
            "TASKBRIDGE_QUEUE_CAPACITY",
            "TASKBRIDGE_MAX_IN_FLIGHT",
        ] {
            guard.set(key, "0");
            let err = Config::from_env().unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid(k, _) if k == key),
                "{} = 0 should be rejected",
                key
            );
            guard.set(key, "1");
        }
    }

    #[test]
    fn test_config_negative_max_in_flight() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let mut guard = EnvGuard::clean();

        guard.set("TASKBRIDGE_DATABASE_URL", "postgres://localhost/tasks");
        guard.set("TASKBRIDGE_MAX_IN_FLIGHT", "-5");

        assert!(Config::from_env().is_err());
    }

    #[test]
    fn test_config_error_display() {
        let missing = ConfigError::Missing("MY_VAR");
        assert_eq!(
            missing.to_string(),
            "missing required environment variable: MY_VAR"
        );

        let invalid = ConfigError::Invalid("MY_VAR", "must be a number");
        assert_eq!(
            invalid.to_string(),
            "invalid value for MY_VAR: must be a number"
        );
    }
}
