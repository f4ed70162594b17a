//! RFC 7662 token introspection client.
//!
//! # Responsibilities
//! - POST the raw token to the provider's introspection endpoint
//! - Authenticate with client id/secret over HTTP basic auth
//! - Surface provider failures distinctly so the caller can fail closed

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use crate::auth::claims::AuthError;

/// The introspection response fields the gateway reads.
#[derive(Debug, Deserialize)]
pub struct IntrospectionResponse {
    pub active: bool,

    #[serde(default)]
    pub sub: Option<String>,

    /// Space-delimited scope string per RFC 7662.
    #[serde(default)]
    pub scope: Option<String>,

    /// Unix expiry timestamp in seconds.
    #[serde(default)]
    pub exp: Option<u64>,
}

impl IntrospectionResponse {
    pub fn scopes(&self) -> HashSet<String> {
        self.scope
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .map(String::from)
            .collect()
    }
}

/// Client for one introspection endpoint.
pub struct IntrospectionClient {
    endpoint: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl IntrospectionClient {
    pub fn new(
        endpoint: String,
        client_id: String,
        client_secret: String,
        http: reqwest::Client,
        timeout: Duration,
    ) -> Self {
        Self {
            endpoint,
            client_id,
            client_secret,
            http,
            timeout,
        }
    }

    /// Ask the provider about a token.
    ///
    /// Any transport failure, timeout, or non-success status is an error;
    /// the validator never treats those as a valid token.
    pub async fn introspect(&self, token: &str) -> Result<IntrospectionResponse, AuthError> {
        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("token", token)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::Timeout
                } else {
                    AuthError::Provider(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "introspection returned status {}",
                response.status()
            )));
        }

        response
            .json::<IntrospectionResponse>()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))
    }
}
