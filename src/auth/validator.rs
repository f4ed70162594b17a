//! Token validation.
//!
//! # Responsibilities
//! - Answer "is this bearer token valid, and what may it do"
//! - Serve repeated validations from the cache
//! - Fail closed when the identity provider cannot answer

use std::time::Duration;

use crate::auth::cache::{token_key, unix_now, CacheOutcome, TokenCache};
use crate::auth::claims::{AuthError, Claims};
use crate::auth::discovery::{discover_introspection_endpoint, DiscoveryError};
use crate::auth::introspection::IntrospectionClient;
use crate::config::AuthConfig;
use crate::observability::metrics;

pub struct TokenValidator {
    cache: TokenCache,
    introspection: IntrospectionClient,
    max_ttl: Duration,
    negative_ttl: Duration,
}

impl TokenValidator {
    /// Build a validator, discovering the introspection endpoint from the
    /// issuer's metadata document unless an override is configured.
    pub async fn from_config(
        config: &AuthConfig,
        introspection_timeout: Duration,
    ) -> Result<Self, DiscoveryError> {
        let http = reqwest::Client::new();

        let endpoint = match &config.introspection_url {
            Some(url) => url.clone(),
            None => discover_introspection_endpoint(&http, &config.issuer_url).await?,
        };
        tracing::info!(endpoint = %endpoint, "Token introspection endpoint resolved");

        Ok(Self::new(endpoint, config, http, introspection_timeout))
    }

    pub fn new(
        endpoint: String,
        config: &AuthConfig,
        http: reqwest::Client,
        introspection_timeout: Duration,
    ) -> Self {
        Self {
            cache: TokenCache::new(config.cache_capacity),
            introspection: IntrospectionClient::new(
                endpoint,
                config.client_id.clone(),
                config.client_secret.clone(),
                http,
                introspection_timeout,
            ),
            max_ttl: Duration::from_secs(config.max_ttl_secs),
            negative_ttl: Duration::from_secs(config.negative_ttl_secs),
        }
    }

    /// Validate a raw bearer token.
    ///
    /// Cache hits never touch the network. Two concurrent misses on the
    /// same new token may both introspect; the provider answers are
    /// identical so last-write-wins on the cache is harmless.
    pub async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let key = token_key(token);

        match self.cache.get(&key) {
            CacheOutcome::Valid(claims) => {
                metrics::record_auth_cache(true);
                return Ok(claims);
            }
            CacheOutcome::Rejected => {
                metrics::record_auth_cache(true);
                return Err(AuthError::Invalid);
            }
            CacheOutcome::Miss => {
                metrics::record_auth_cache(false);
            }
        }

        let response = self.introspection.introspect(token).await?;
        let now = unix_now();

        if !response.active {
            self.cache.store_rejected(key, now + self.negative_ttl.as_secs());
            return Err(AuthError::Invalid);
        }

        let capped_expiry = match response.exp {
            Some(exp) => exp.min(now + self.max_ttl.as_secs()),
            None => now + self.max_ttl.as_secs(),
        };
        if capped_expiry <= now {
            // Active but already past its expiry; nothing worth caching.
            return Err(AuthError::Invalid);
        }

        let claims = Claims {
            subject: response.sub.clone().unwrap_or_default(),
            scopes: response.scopes(),
            expires_at: capped_expiry,
        };

        // Responses without an expiry are served but not cached, so a
        // revocation at the provider is observed on the next request.
        if response.exp.is_some() {
            self.cache.store_validated(key, claims.clone());
        }

        Ok(claims)
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
