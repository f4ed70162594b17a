//! Validated token claims and auth errors.

use std::collections::HashSet;

/// Claims extracted from a validated token.
#[derive(Debug, Clone)]
pub struct Claims {
    /// Subject identifier reported by the provider.
    pub subject: String,
    /// Scopes granted to the token.
    pub scopes: HashSet<String>,
    /// Unix timestamp (seconds) after which the claims no longer hold.
    pub expires_at: u64,
}

impl Claims {
    /// True when every required scope is present.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|s| self.scopes.contains(s))
    }
}

/// Error type for token validation.
///
/// Every variant denies the request; the distinction exists for logging
/// and metrics, not for the client-facing status.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token rejected by identity provider")]
    Invalid,

    #[error("identity provider request failed: {0}")]
    Provider(String),

    #[error("identity provider request timed out")]
    Timeout,
}
