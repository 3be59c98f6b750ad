//! Authentication configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

const SUPPORTED_ALGORITHMS: &[&str] = &["HS256", "HS384", "HS512"];

/// Authentication configuration (HS-family JWT)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared signing secret
    #[serde(default = "empty_secret")]
    pub jwt_secret: Secret<String>,

    /// Signing algorithm
    #[serde(default = "default_algorithm")]
    pub jwt_algorithm: String,

    /// Lifetime of issued access tokens in minutes
    #[serde(default = "default_expire_minutes")]
    pub access_token_expire_minutes: i64,

    /// Refuse websocket connections without a valid token
    #[serde(default = "default_require_token")]
    pub require_token: bool,

    /// Scopes every connecting token must carry (comma-separated)
    pub required_scopes: Option<String>,
}

impl AuthConfig {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_expire_minutes.max(0) as u64 * 60)
    }

    /// Get required scopes as a vector
    pub fn required_scopes_list(&self) -> Vec<String> {
        self.required_scopes
            .as_ref()
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Validate authentication configuration
    ///
    /// A secret is mandatory whenever tokens are checked, and always in
    /// production since the service also issues tokens there.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if !SUPPORTED_ALGORITHMS.contains(&self.jwt_algorithm.as_str()) {
            return Err(ValidationError::UnsupportedAlgorithm(
                self.jwt_algorithm.clone(),
            ));
        }
        if self.access_token_expire_minutes <= 0 {
            return Err(ValidationError::InvalidTokenExpiry);
        }
        let secret_needed = self.require_token || *environment == Environment::Production;
        if secret_needed && self.jwt_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: empty_secret(),
            jwt_algorithm: default_algorithm(),
            access_token_expire_minutes: default_expire_minutes(),
            require_token: default_require_token(),
            required_scopes: None,
        }
    }
}

fn empty_secret() -> Secret<String> {
    Secret::new(String::new())
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_expire_minutes() -> i64 {
    120
}

fn default_require_token() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.jwt_algorithm, "HS256");
        assert_eq!(config.access_token_ttl(), Duration::from_secs(7200));
        assert!(config.require_token);
    }

    #[test]
    fn test_validation_missing_secret_when_tokens_required() {
        let config = AuthConfig::default();
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"))
        );
    }

    #[test]
    fn test_anonymous_development_needs_no_secret() {
        let config = AuthConfig {
            require_token: false,
            ..Default::default()
        };
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(config.validate(&Environment::Production).is_err());
    }

    #[test]
    fn test_validation_rejects_asymmetric_algorithm() {
        let config = AuthConfig {
            jwt_secret: Secret::new("secret".to_string()),
            jwt_algorithm: "RS256".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::UnsupportedAlgorithm("RS256".to_string()))
        );
    }

    #[test]
    fn test_required_scopes_parsing() {
        let config = AuthConfig {
            required_scopes: Some("ADMIN, GUEST".to_string()),
            ..Default::default()
        };
        assert_eq!(config.required_scopes_list(), vec!["ADMIN", "GUEST"]);
    }

    #[test]
    fn test_debug_output_redacts_secret() {
        let config = AuthConfig {
            jwt_secret: Secret::new("hunter2-signing-key".to_string()),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2-signing-key"));
        assert!(printed.contains("jwt_secret"));
    }
}
