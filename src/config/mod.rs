//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `TASK_PULSE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use task_pulse::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod auth;
mod broker;
mod error;
mod server;
mod websocket;
mod worker;

pub use auth::AuthConfig;
pub use broker::{BrokerConfig, ResultStoreConfig};
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use websocket::WebSocketConfig;
pub use worker::WorkerConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a usable
/// development config apart from the JWT secret.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Broker configuration (job queues, pub/sub fanout)
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Result store configuration (task state records)
    #[serde(default)]
    pub result_store: ResultStoreConfig,

    /// Worker pool configuration
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Authentication configuration (JWT)
    #[serde(default)]
    pub auth: AuthConfig,

    /// WebSocket session configuration
    #[serde(default)]
    pub websocket: WebSocketConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `TASK_PULSE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `TASK_PULSE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `TASK_PULSE__RESULT_STORE__RESULT_EXPIRY_SECS=60` -> `result_store.result_expiry_secs = 60`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("TASK_PULSE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.broker.validate()?;
        self.result_store.validate()?;
        self.worker.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.websocket.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "TASK_PULSE__AUTH__JWT_SECRET",
        "TASK_PULSE__SERVER__PORT",
        "TASK_PULSE__SERVER__ENVIRONMENT",
        "TASK_PULSE__BROKER__URL",
        "TASK_PULSE__RESULT_STORE__RESULT_EXPIRY_SECS",
        "TASK_PULSE__WORKER__QUEUES",
    ];

    fn set_minimal_env() {
        env::set_var("TASK_PULSE__AUTH__JWT_SECRET", "test-secret");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("TASK_PULSE__BROKER__URL", "redis://broker:6379/0");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.broker.url, "redis://broker:6379/0");
        assert_eq!(config.auth.jwt_secret.expose_secret(), "test-secret");
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_without_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.result_store.result_expiry_secs, 1800);
        assert_eq!(config.worker.default_queue, "p1");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("TASK_PULSE__RESULT_STORE__RESULT_EXPIRY_SECS", "60");
        env::set_var("TASK_PULSE__WORKER__QUEUES", "p1,p2,p3");
        env::set_var("TASK_PULSE__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.result_store.result_expiry_secs, 60);
        assert_eq!(config.worker.queue_list().len(), 3);
        assert!(config.is_production());
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("TASK_PULSE__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        assert_eq!(result.unwrap().server.port, 3000);
    }
}
