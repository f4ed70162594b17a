//! Compiled route rules.
//!
//! # Responsibilities
//! - Compile a RouteConfig into its matchable form once, at table build
//! - Match paths segment-by-segment (literal prefix + optional wildcard)
//! - Rewrite matched paths for the upstream hop
//!
//! # Design Decisions
//! - Paths are compared segment-wise, case-sensitive
//! - A trailing `*` matches any remainder, including none
//! - No regex to guarantee O(n) matching

use std::collections::HashSet;

use axum::http::Method;

use crate::config::RouteConfig;

/// A route compiled for matching.
#[derive(Debug)]
pub struct CompiledRoute {
    /// Route identifier for logging and metrics.
    pub name: String,
    /// Literal path segments of the pattern.
    segments: Vec<String>,
    /// Whether the pattern ends in a `*` wildcard segment.
    wildcard: bool,
    /// Allowed methods. Empty = all methods.
    methods: HashSet<Method>,
    /// Logical service resolved through the registry.
    pub service: String,
    /// Prefix replacing the matched literal segments on forward.
    rewrite_prefix: String,
    /// Whether requests must carry a valid bearer token.
    pub requires_auth: bool,
    /// Scopes the validated token must carry.
    pub required_scopes: Vec<String>,
}

impl CompiledRoute {
    pub fn compile(config: &RouteConfig) -> Self {
        let mut segments: Vec<String> = config
            .pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let wildcard = segments.last().map(|s| s == "*").unwrap_or(false);
        if wildcard {
            segments.pop();
        }

        let methods = config
            .methods
            .iter()
            .filter_map(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
            .collect();

        Self {
            name: config.name.clone(),
            segments,
            wildcard,
            methods,
            service: config.service.clone(),
            rewrite_prefix: config.rewrite_prefix.clone(),
            requires_auth: config.requires_auth,
            required_scopes: config.required_scopes.clone(),
        }
    }

    /// Number of literal segments. Higher = more specific.
    pub fn specificity(&self) -> usize {
        self.segments.len()
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    /// Match a request path against this rule.
    ///
    /// Returns the wildcard remainder segments on a match, empty when the
    /// pattern consumed the whole path.
    pub fn match_path<'a>(&self, path: &'a str) -> Option<Vec<&'a str>> {
        let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if path_segments.len() < self.segments.len() {
            return None;
        }
        if !self.wildcard && path_segments.len() != self.segments.len() {
            return None;
        }

        for (literal, actual) in self.segments.iter().zip(&path_segments) {
            if literal != actual {
                return None;
            }
        }

        Some(path_segments[self.segments.len()..].to_vec())
    }

    /// Build the upstream path: rewrite prefix plus the wildcard remainder.
    pub fn rewrite(&self, remainder: &[&str]) -> String {
        let prefix = self.rewrite_prefix.trim_end_matches('/');
        let rewritten = if remainder.is_empty() {
            prefix.to_string()
        } else {
            format!("{}/{}", prefix, remainder.join("/"))
        };

        if rewritten.is_empty() {
            "/".to_string()
        } else {
            rewritten
        }
    }
}
