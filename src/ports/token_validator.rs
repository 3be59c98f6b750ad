//! Token validation port.
//!
//! The token service is an opaque capability: it turns a raw access token
//! into an identity or refuses it. The default adapter verifies HS-family
//! JWTs; tests use a table-driven mock.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates access tokens and extracts user identity.
///
/// # Contract
///
/// Implementations must:
/// - Return `AuthError::InvalidToken` for malformed or badly signed tokens
/// - Return `AuthError::TokenExpired` for expired tokens
/// - Return `AuthError::ServiceUnavailable` when misconfigured
///
/// Scope checks are left to the caller.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validate a raw token and return the authenticated user.
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use std::collections::HashMap;

    struct FixedTokens(HashMap<String, AuthenticatedUser>);

    #[async_trait]
    impl TokenValidator for FixedTokens {
        async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
            self.0.get(token).cloned().ok_or(AuthError::InvalidToken)
        }
    }

    #[tokio::test]
    async fn validator_is_usable_as_trait_object() {
        let user = AuthenticatedUser::new(UserId::new("1").unwrap(), vec!["ADMIN".into()]);
        let mut tokens = HashMap::new();
        tokens.insert("good".to_string(), user.clone());
        let validator: Box<dyn TokenValidator> = Box::new(FixedTokens(tokens));

        assert_eq!(validator.validate("good").await, Ok(user));
        assert_eq!(validator.validate("bad").await, Err(AuthError::InvalidToken));
    }
}
