//! Gate scope: decides whether a request is inspected at all.
//!
//! Compiled once from [`ScopeConfig`] and immutable afterwards.

use crate::config::ScopeConfig;
use crate::routing::matcher::{AnyMatcher, ExactPathMatcher, ExtensionMatcher, Matcher, PathPrefixMatcher};

#[derive(Debug)]
pub struct GateScope {
    excluded: AnyMatcher,
}

impl GateScope {
    pub fn from_config(config: &ScopeConfig) -> Self {
        let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
        for prefix in &config.excluded_prefixes {
            matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
        }
        for path in &config.excluded_paths {
            matchers.push(Box::new(ExactPathMatcher::new(path.clone())));
        }
        for ext in &config.excluded_extensions {
            matchers.push(Box::new(ExtensionMatcher::new(ext.clone())));
        }
        Self {
            excluded: AnyMatcher::new(matchers),
        }
    }

    /// True when the gate should run for this path.
    pub fn is_gated(&self, path: &str) -> bool {
        !self.excluded.matches(path)
    }
}
