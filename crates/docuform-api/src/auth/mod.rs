//! Bearer-token authentication for management routes.
//!
//! Provides:
//! - [`AuthenticatedUser`]: identity attached to an authenticated request
//! - [`TokenValidator`]: async token check, one implementation per scheme
//! - [`StaticTokenValidator`]: a single shared secret from configuration
//! - [`AuthLayer`] / [`AuthService`]: Tower middleware over a validator

mod error;
mod middleware;

use std::future::Future;
use std::pin::Pin;

pub use error::AuthError;
pub use middleware::{AuthLayer, AuthService};

/// Configuration for the auth middleware.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    /// Whether authentication is enabled. When false, all requests pass through.
    pub enabled: bool,
}

/// Identity of the caller, stored in request extensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Who the token belongs to.
    pub subject: String,
}

/// Boxed future returned by [`TokenValidator::validate`].
pub type ValidateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<AuthenticatedUser, AuthError>> + Send + 'a>>;

/// Trait for validating bearer tokens.
pub trait TokenValidator: Send + Sync + 'static {
    /// Validate a token and return the authenticated user.
    fn validate<'a>(&'a self, token: &'a str) -> ValidateFuture<'a>;
}

/// Accepts exactly one configured token.
#[derive(Clone)]
pub struct StaticTokenValidator {
    token: String,
}

impl std::fmt::Debug for StaticTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenValidator")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl StaticTokenValidator {
    /// Accept `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate<'a>(&'a self, token: &'a str) -> ValidateFuture<'a> {
        Box::pin(async move {
            if constant_time_eq(token.as_bytes(), self.token.as_bytes()) {
                Ok(AuthenticatedUser {
                    subject: "admin".to_string(),
                })
            } else {
                Err(AuthError::InvalidToken)
            }
        })
    }
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
