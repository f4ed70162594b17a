//! Route table lookup.
//!
//! # Responsibilities
//! - Store compiled routes in declaration order
//! - Look up the matching route for a path and method
//! - Return matched route plus rewritten upstream path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Longest literal prefix wins; ties break by declaration order
//! - Reload builds a whole new table swapped in behind ArcSwap

use std::sync::Arc;

use axum::http::Method;

use crate::config::RouteConfig;
use crate::routing::rule::CompiledRoute;

/// The outcome of a successful route lookup.
#[derive(Debug)]
pub struct RouteMatch {
    pub route: Arc<CompiledRoute>,
    /// Path to present upstream, query string excluded.
    pub upstream_path: String,
}

/// An immutable set of compiled routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<CompiledRoute>>,
}

impl RouteTable {
    /// Compile a table from configuration, preserving declaration order.
    pub fn build(configs: &[RouteConfig]) -> Self {
        let routes = configs
            .iter()
            .map(|c| Arc::new(CompiledRoute::compile(c)))
            .collect();
        Self { routes }
    }

    /// Find the best route for a path and method.
    ///
    /// Among method-compatible matches the most specific (most literal
    /// segments) wins; equal specificity keeps the first declared.
    pub fn match_route(&self, path: &str, method: &Method) -> Option<RouteMatch> {
        let mut best: Option<(usize, RouteMatch)> = None;

        for route in &self.routes {
            if !route.allows_method(method) {
                continue;
            }
            let Some(remainder) = route.match_path(path) else {
                continue;
            };

            let specificity = route.specificity();
            // Strictly-greater comparison keeps the earliest declared on ties.
            if best.as_ref().map(|(s, _)| specificity > *s).unwrap_or(true) {
                let upstream_path = route.rewrite(&remainder);
                best = Some((
                    specificity,
                    RouteMatch {
                        route: route.clone(),
                        upstream_path,
                    },
                ));
            }
        }

        best.map(|(_, m)| m)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Distinct service names referenced by this table.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.routes.iter().map(|r| r.service.clone()).collect();
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, pattern: &str, service: &str) -> RouteConfig {
        RouteConfig {
            name: name.to_string(),
            pattern: pattern.to_string(),
            methods: Vec::new(),
            service: service.to_string(),
            rewrite_prefix: String::new(),
            requires_auth: false,
            required_scopes: Vec::new(),
        }
    }

    #[test]
    fn longest_prefix_wins() {
        let table = RouteTable::build(&[
            config("catchall", "/api/*", "fallback"),
            config("orders", "/api/orders/*", "orders"),
        ]);

        let m = table.match_route("/api/orders/123", &Method::GET).unwrap();
        assert_eq!(m.route.name, "orders");

        let m = table.match_route("/api/other", &Method::GET).unwrap();
        assert_eq!(m.route.name, "catchall");
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let table = RouteTable::build(&[
            config("first", "/api/orders/*", "a"),
            config("second", "/api/orders/*", "b"),
        ]);

        let m = table.match_route("/api/orders/1", &Method::GET).unwrap();
        assert_eq!(m.route.name, "first");
    }

    #[test]
    fn method_mismatch_falls_through() {
        let mut get_only = config("orders-get", "/api/orders/*", "orders");
        get_only.methods = vec!["GET".to_string()];
        let table = RouteTable::build(&[get_only, config("any", "/api/*", "fallback")]);

        let m = table.match_route("/api/orders/1", &Method::POST).unwrap();
        assert_eq!(m.route.name, "any");

        let m = table.match_route("/api/orders/1", &Method::GET).unwrap();
        assert_eq!(m.route.name, "orders-get");
    }

    #[test]
    fn no_match_is_none() {
        let table = RouteTable::build(&[config("orders", "/api/orders/*", "orders")]);
        assert!(table.match_route("/other", &Method::GET).is_none());
    }

    #[test]
    fn match_carries_rewritten_path() {
        let table = RouteTable::build(&[config("orders", "/api/orders/*", "orders")]);
        let m = table.match_route("/api/orders/values", &Method::GET).unwrap();
        assert_eq!(m.upstream_path, "/values");
    }

    #[test]
    fn service_names_deduplicated() {
        let table = RouteTable::build(&[
            config("a", "/a/*", "orders"),
            config("b", "/b/*", "orders"),
            config("c", "/c/*", "billing"),
        ]);
        assert_eq!(table.service_names(), vec!["billing", "orders"]);
    }
}
