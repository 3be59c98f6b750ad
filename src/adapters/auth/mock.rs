//! Mock token validator for testing.
//!
//! Implements the `TokenValidator` port from a fixed token table, so
//! handshake and scope checks can be exercised without signing JWTs.
//!
//! # Example
//!
//! ```ignore
//! use task_pulse::adapters::auth::MockTokenValidator;
//!
//! let validator = MockTokenValidator::new().with_test_user("valid-token", "42", &["ADMIN"]);
//!
//! let user = validator.validate("valid-token").await?;
//! assert!(user.has_scope("ADMIN"));
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::TokenValidator;

/// Mock token validator for testing.
///
/// Tokens not in the table return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockTokenValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Returned for every validation while set
    force_error: RwLock<Option<AuthError>>,
}

impl MockTokenValidator {
    /// Creates a new empty mock validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a valid token that maps to a user.
    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Adds a valid token for a user with the given id and scopes.
    ///
    /// Ids must be non-empty; an empty id registers nothing.
    pub fn with_test_user(
        self,
        token: impl Into<String>,
        user_id: impl Into<String>,
        scopes: &[&str],
    ) -> Self {
        match UserId::new(user_id) {
            Ok(id) => {
                let user = AuthenticatedUser::new(id, scopes.iter().map(|s| s.to_string()).collect());
                self.with_user(token, user)
            }
            Err(_) => self,
        }
    }

    /// Forces all validations to return the specified error.
    pub fn with_error(self, error: AuthError) -> Self {
        *self.force_error.write().unwrap_or_else(PoisonError::into_inner) = Some(error);
        self
    }

    /// Clears the forced error and returns to normal operation.
    pub fn clear_error(&self) {
        *self.force_error.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Registers a new valid token at runtime.
    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), user);
    }

    /// Removes a token, making it invalid.
    pub fn remove_token(&self, token: &str) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
    }
}

#[async_trait]
impl TokenValidator for MockTokenValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self
            .force_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }

        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_token_returns_user() {
        let validator = MockTokenValidator::new().with_test_user("t", "42", &["ADMIN"]);
        let user = validator.validate("t").await.unwrap();
        assert_eq!(user.id.as_str(), "42");
        assert!(user.has_scope("ADMIN"));
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let validator = MockTokenValidator::new();
        assert_eq!(validator.validate("nope").await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn forced_error_overrides_table_until_cleared() {
        let validator = MockTokenValidator::new()
            .with_test_user("t", "42", &[])
            .with_error(AuthError::TokenExpired);

        assert_eq!(validator.validate("t").await, Err(AuthError::TokenExpired));
        validator.clear_error();
        assert!(validator.validate("t").await.is_ok());
    }

    #[tokio::test]
    async fn removed_token_becomes_invalid() {
        let validator = MockTokenValidator::new().with_test_user("t", "42", &[]);
        validator.remove_token("t");
        assert_eq!(validator.validate("t").await, Err(AuthError::InvalidToken));
    }
}
