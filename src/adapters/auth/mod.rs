//! Authentication adapters.
//!
//! Implementations of the `TokenValidator` port:
//!
//! - `jwt` - HS-family JWT issuance and validation
//! - `mock` - Test implementation backed by a token table

mod jwt;
mod mock;

pub use jwt::JwtTokenService;
pub use mock::MockTokenValidator;
