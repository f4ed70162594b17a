//! OIDC provider metadata discovery.
//!
//! Resolves the introspection endpoint from the issuer's well-known
//! configuration document at startup. A configured override skips this
//! entirely.

use serde::Deserialize;

/// Error type for discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("could not fetch discovery document: {0}")]
    Http(#[from] reqwest::Error),

    #[error("discovery document does not advertise an introspection endpoint")]
    MissingIntrospectionEndpoint,
}

/// The fields of the provider metadata document the gateway reads.
#[derive(Debug, Deserialize)]
struct ProviderMetadata {
    #[serde(default)]
    introspection_endpoint: Option<String>,
}

/// Fetch the issuer's metadata document and return its introspection endpoint.
pub async fn discover_introspection_endpoint(
    http: &reqwest::Client,
    issuer_url: &str,
) -> Result<String, DiscoveryError> {
    let url = format!(
        "{}/.well-known/openid-configuration",
        issuer_url.trim_end_matches('/')
    );

    let metadata: ProviderMetadata = http
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    metadata
        .introspection_endpoint
        .ok_or(DiscoveryError::MissingIntrospectionEndpoint)
}
