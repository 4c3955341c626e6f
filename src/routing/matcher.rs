//! Path matching.
//!
//! # Responsibilities
//! - Match a normalized pathname exactly (case-sensitive)
//! - Provide the any-path variant used by catch-all routes
//!
//! # Design Decisions
//! - Paths are normalized once, at route construction
//! - No wildcard segments and no regex

use crate::context::normalize_pathname;

/// Which pathnames a route accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    /// Exactly this normalized path.
    Exact(String),
    /// Any path at all.
    Any,
}

impl PathMatch {
    /// Exact matcher for `path`, normalized.
    pub fn exact(path: &str) -> Self {
        PathMatch::Exact(normalize_pathname(path))
    }

    /// Returns true if the (already normalized) pathname matches.
    pub fn matches(&self, pathname: &str) -> bool {
        match self {
            PathMatch::Exact(path) => path == pathname,
            PathMatch::Any => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_matcher_normalizes() {
        assert_eq!(PathMatch::exact("/x/"), PathMatch::Exact("/x".into()));
        assert_eq!(PathMatch::exact("x//"), PathMatch::Exact("/x".into()));
        assert_eq!(PathMatch::exact("/"), PathMatch::Exact("/".into()));
    }

    #[test]
    fn test_exact_matcher() {
        let matcher = PathMatch::exact("/api/items");
        assert!(matcher.matches("/api/items"));
        assert!(!matcher.matches("/api/items/1"));
        assert!(!matcher.matches("/api"));
        assert!(!matcher.matches("/API/items")); // Case sensitive
    }

    #[test]
    fn test_any_matcher() {
        assert!(PathMatch::Any.matches("/"));
        assert!(PathMatch::Any.matches("/whatever/deep/path"));
    }
}
