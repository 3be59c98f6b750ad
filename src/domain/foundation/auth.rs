//! Authentication types for the domain layer.
//!
//! These types represent the identity attached to a connection after its
//! access token has been validated. They have no dependency on the token
//! format; any `TokenValidator` adapter can populate them.

use super::UserId;
use thiserror::Error;

/// Identity extracted from a validated access token.
///
/// Established once at connect time and never re-validated for the life
/// of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The `sub` claim.
    pub id: UserId,

    /// Scopes granted to the token (roles in the issuing service).
    pub scopes: Vec<String>,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(id: UserId, scopes: Vec<String>) -> Self {
        Self { id, scopes }
    }

    /// Returns true if the token carries the given scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Returns the first required scope the token lacks, if any.
    pub fn missing_scope<'a>(&self, required: &'a [String]) -> Option<&'a str> {
        required
            .iter()
            .find(|scope| !self.has_scope(scope))
            .map(String::as_str)
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No token was supplied where one is required.
    #[error("Missing token")]
    MissingToken,

    /// The token is malformed or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token signature is valid but it has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but lacks a scope required by the endpoint.
    #[error("Not enough permissions: missing scope '{0}'")]
    InsufficientScope(String),

    /// The token service is unavailable or misconfigured.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if the caller must come back with a different token.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::TokenExpired
        )
    }
}
