//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (static registry covers routed services)
//! - Validate value ranges (timeouts > 0, capacities > 0)
//! - Detect duplicate route names and malformed patterns
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::GatewayConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

const KNOWN_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "DELETE", "OPTIONS", "PATCH", "TRACE",
];

/// Validate a deserialized configuration.
///
/// Collects every violation rather than bailing at the first, so an
/// operator fixing a config sees the complete list in one pass.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a valid socket address", config.listener.bind_address),
        ));
    }

    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new(
            "listener.max_body_bytes",
            "must be greater than zero",
        ));
    }

    let mut seen_names = HashSet::new();
    for (idx, route) in config.routes.iter().enumerate() {
        let field = |suffix: &str| format!("routes[{}].{}", idx, suffix);

        if route.name.is_empty() {
            errors.push(ValidationError::new(field("name"), "must not be empty"));
        } else if !seen_names.insert(route.name.as_str()) {
            errors.push(ValidationError::new(
                field("name"),
                format!("duplicate route name '{}'", route.name),
            ));
        }

        validate_pattern(&route.pattern, &field("pattern"), &mut errors);

        if route.service.is_empty() {
            errors.push(ValidationError::new(field("service"), "must not be empty"));
        }

        for method in &route.methods {
            if !KNOWN_METHODS.contains(&method.to_ascii_uppercase().as_str()) {
                errors.push(ValidationError::new(
                    field("methods"),
                    format!("unknown HTTP method '{}'", method),
                ));
            }
        }

        if !route.rewrite_prefix.is_empty() && !route.rewrite_prefix.starts_with('/') {
            errors.push(ValidationError::new(
                field("rewrite_prefix"),
                "must start with '/' when set",
            ));
        }

        if !route.required_scopes.is_empty() && !route.requires_auth {
            errors.push(ValidationError::new(
                field("required_scopes"),
                "requires_auth must be set when scopes are required",
            ));
        }
    }

    match config.registry.mode.as_str() {
        "static" => {
            let known: HashSet<&str> = config
                .registry
                .services
                .iter()
                .map(|s| s.name.as_str())
                .collect();
            for (idx, route) in config.routes.iter().enumerate() {
                if !route.service.is_empty() && !known.contains(route.service.as_str()) {
                    errors.push(ValidationError::new(
                        format!("routes[{}].service", idx),
                        format!("'{}' is not defined in registry.services", route.service),
                    ));
                }
            }
            for (idx, service) in config.registry.services.iter().enumerate() {
                let field = |suffix: &str| format!("registry.services[{}].{}", idx, suffix);
                if service.name.is_empty() {
                    errors.push(ValidationError::new(field("name"), "must not be empty"));
                }
                if service.addresses.is_empty() {
                    errors.push(ValidationError::new(
                        field("addresses"),
                        "must list at least one endpoint",
                    ));
                }
                for addr in &service.addresses {
                    if addr.parse::<std::net::SocketAddr>().is_err() {
                        errors.push(ValidationError::new(
                            field("addresses"),
                            format!("'{}' is not a valid host:port address", addr),
                        ));
                    }
                }
            }
        }
        "consul" => {
            if url::Url::parse(&config.registry.consul_url).is_err() {
                errors.push(ValidationError::new(
                    "registry.consul_url",
                    format!("'{}' is not a valid URL", config.registry.consul_url),
                ));
            }
        }
        other => {
            errors.push(ValidationError::new(
                "registry.mode",
                format!("'{}' is not a supported mode (static, consul)", other),
            ));
        }
    }

    if config.registry.poll_interval_secs == 0 {
        errors.push(ValidationError::new(
            "registry.poll_interval_secs",
            "must be greater than zero",
        ));
    }

    if config.registry.stale_after_secs < config.registry.poll_interval_secs {
        errors.push(ValidationError::new(
            "registry.stale_after_secs",
            "must be at least the poll interval",
        ));
    }

    let any_auth = config.routes.iter().any(|r| r.requires_auth);
    if any_auth {
        let has_issuer = !config.auth.issuer_url.is_empty();
        let has_override = config.auth.introspection_url.is_some();
        if !has_issuer && !has_override {
            errors.push(ValidationError::new(
                "auth.issuer_url",
                "required when any route sets requires_auth",
            ));
        }
        if has_issuer && url::Url::parse(&config.auth.issuer_url).is_err() {
            errors.push(ValidationError::new(
                "auth.issuer_url",
                format!("'{}' is not a valid URL", config.auth.issuer_url),
            ));
        }
        if let Some(introspection) = &config.auth.introspection_url {
            if url::Url::parse(introspection).is_err() {
                errors.push(ValidationError::new(
                    "auth.introspection_url",
                    format!("'{}' is not a valid URL", introspection),
                ));
            }
        }
        if config.auth.cache_capacity == 0 {
            errors.push(ValidationError::new(
                "auth.cache_capacity",
                "must be greater than zero",
            ));
        }
    }

    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::new(
                "health_check.interval_secs",
                "must be greater than zero",
            ));
        }
        if config.health_check.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "health_check.timeout_secs",
                "must be greater than zero",
            ));
        }
        if !config.health_check.path.starts_with('/') {
            errors.push(ValidationError::new(
                "health_check.path",
                "must start with '/'",
            ));
        }
        if config.health_check.unhealthy_threshold == 0 {
            errors.push(ValidationError::new(
                "health_check.unhealthy_threshold",
                "must be greater than zero",
            ));
        }
    }

    for (field, value) in [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
        ("timeouts.introspection_secs", config.timeouts.introspection_secs),
        ("timeouts.registry_secs", config.timeouts.registry_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a valid socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_pattern(pattern: &str, field: &str, errors: &mut Vec<ValidationError>) {
    if !pattern.starts_with('/') {
        errors.push(ValidationError::new(field, "must start with '/'"));
        return;
    }

    let segments: Vec<&str> = pattern.trim_start_matches('/').split('/').collect();
    for (i, segment) in segments.iter().enumerate() {
        if *segment == "*" && i != segments.len() - 1 {
            errors.push(ValidationError::new(
                field,
                "wildcard '*' is only allowed as the final segment",
            ));
            return;
        }
        if segment.contains('*') && *segment != "*" {
            errors.push(ValidationError::new(
                field,
                "wildcard '*' must occupy a whole segment",
            ));
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RouteConfig, StaticServiceConfig};

    fn base_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.registry.services.push(StaticServiceConfig {
            name: "orders".to_string(),
            addresses: vec!["10.0.0.5:5000".to_string()],
        });
        config
    }

    fn route(pattern: &str) -> RouteConfig {
        RouteConfig {
            name: "orders".to_string(),
            pattern: pattern.to_string(),
            methods: Vec::new(),
            service: "orders".to_string(),
            rewrite_prefix: String::new(),
            requires_auth: false,
            required_scopes: Vec::new(),
        }
    }

    #[test]
    fn accepts_default_config() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn accepts_wildcard_route() {
        let mut config = base_config();
        config.routes.push(route("/api/orders/*"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_pattern_without_leading_slash() {
        let mut config = base_config();
        config.routes.push(route("api/orders"));
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "routes[0].pattern"));
    }

    #[test]
    fn rejects_interior_wildcard() {
        let mut config = base_config();
        config.routes.push(route("/api/*/orders"));
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "routes[0].pattern"));
    }

    #[test]
    fn rejects_route_to_unknown_static_service() {
        let mut config = base_config();
        let mut r = route("/api/billing/*");
        r.service = "billing".to_string();
        config.routes.push(r);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "routes[0].service"));
    }

    #[test]
    fn rejects_auth_route_without_issuer() {
        let mut config = base_config();
        let mut r = route("/api/orders/*");
        r.requires_auth = true;
        config.routes.push(r);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "auth.issuer_url"));
    }

    #[test]
    fn rejects_scopes_without_requires_auth() {
        let mut config = base_config();
        let mut r = route("/api/orders/*");
        r.required_scopes = vec!["orders.read".to_string()];
        config.routes.push(r);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "routes[0].required_scopes"));
    }

    #[test]
    fn reports_all_errors_at_once() {
        let mut config = base_config();
        config.routes.push(route("no-slash"));
        config.registry.poll_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 2);
    }

    #[test]
    fn rejects_unknown_registry_mode() {
        let mut config = GatewayConfig::default();
        config.registry.mode = "zookeeper".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "registry.mode"));
    }
}
