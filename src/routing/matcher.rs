//! Path matching logic.
//!
//! # Design Decisions
//! - Path matching is case-sensitive; extension matching is not
//! - No regex to guarantee O(n) matching

/// Trait for matching request paths against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Matches a path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// Matches one exact path.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    path: String,
}

impl ExactPathMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, path: &str) -> bool {
        path == self.path
    }
}

/// Matches the extension of the last path segment.
#[derive(Debug, Clone)]
pub struct ExtensionMatcher {
    /// Lowercased, without the leading dot.
    extension: String,
}

impl ExtensionMatcher {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_lowercase(),
        }
    }
}

impl Matcher for ExtensionMatcher {
    fn matches(&self, path: &str) -> bool {
        let segment = path.rsplit('/').next().unwrap_or(path);
        match segment.rsplit_once('.') {
            Some((stem, ext)) => !stem.is_empty() && ext.eq_ignore_ascii_case(&self.extension),
            None => false,
        }
    }
}

/// Combines multiple matchers with OR semantics.
#[derive(Debug, Default)]
pub struct AnyMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AnyMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AnyMatcher {
    fn matches(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/_next/static");
        assert!(matcher.matches("/_next/static/chunks/main.js"));
        assert!(!matcher.matches("/notes"));
    }

    #[test]
    fn test_extension_matcher() {
        let matcher = ExtensionMatcher::new("png");
        assert!(matcher.matches("/images/logo.png"));
        assert!(matcher.matches("/images/LOGO.PNG"));
        assert!(!matcher.matches("/images/logo.png/edit"));
        assert!(!matcher.matches("/.png"));
        assert!(!matcher.matches("/notes"));
    }

    #[test]
    fn test_any_matcher() {
        let matcher = AnyMatcher::new(vec![
            Box::new(ExactPathMatcher::new("/favicon.ico")),
            Box::new(ExtensionMatcher::new("svg")),
        ]);
        assert!(matcher.matches("/favicon.ico"));
        assert!(matcher.matches("/icons/a.svg"));
        assert!(!matcher.matches("/favicon.ico/x"));
        assert!(!AnyMatcher::default().matches("/"));
    }
}
