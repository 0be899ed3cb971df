//! Changed-path matching.
//!
//! # Responsibilities
//! - Normalize repository-relative paths into segments
//! - Match a path against a unit's path prefix (segment-wise)
//! - Combine several prefixes with ANY semantics
//!
//! # Design Decisions
//! - Matching is case-sensitive (git paths are)
//! - `src/cat` never matches `src/catalog/...`: comparison is per segment
//! - Malformed paths match nothing instead of failing
//! - Empty prefix (or `.`) is the repository root and matches every path

/// Trait for matching a changed path against a condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the changed path falls under this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Split a changed path into its segments.
///
/// Returns `None` for paths that can never name a file inside the
/// repository: empty, absolute, containing NUL or a `..` segment.
pub(crate) fn path_segments(path: &str) -> Option<Vec<&str>> {
    let segments = prefix_segments(path)?;
    if segments.is_empty() {
        return None;
    }
    Some(segments)
}

/// Split a unit prefix into its segments. An empty result is the root.
pub(crate) fn prefix_segments(prefix: &str) -> Option<Vec<&str>> {
    if prefix.starts_with('/') || prefix.contains('\0') {
        return None;
    }

    let mut segments = Vec::new();
    for segment in prefix.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s => segments.push(s),
        }
    }
    Some(segments)
}

/// Matches paths that live below a directory prefix.
#[derive(Debug, Clone)]
pub struct SegmentPrefixMatcher {
    /// `None` when the configured prefix is itself malformed.
    segments: Option<Vec<String>>,
}

impl SegmentPrefixMatcher {
    /// Create a new prefix matcher. Leading `./` and trailing `/` are ignored.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        let segments = prefix_segments(prefix.as_ref())
            .map(|s| s.into_iter().map(str::to_owned).collect());
        Self { segments }
    }
}

impl Matcher for SegmentPrefixMatcher {
    fn matches(&self, path: &str) -> bool {
        let Some(prefix) = &self.segments else {
            return false;
        };
        let Some(path) = path_segments(path) else {
            return false;
        };

        // The prefix must be followed by at least one more segment.
        path.len() > prefix.len() && prefix.iter().zip(&path).all(|(p, s)| p == s)
    }
}

/// Combines multiple matchers with ANY semantics.
#[derive(Debug)]
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
    fn test_prefix_matcher() {
        let matcher = SegmentPrefixMatcher::new("src/catalog");

        assert!(matcher.matches("src/catalog/app.py"));
        assert!(matcher.matches("src/catalog/internal/db/repo.go"));
        assert!(!matcher.matches("src/cart/app.py"));
        assert!(!matcher.matches("src/catalog")); // no separator after prefix
    }

    #[test]
    fn test_prefix_is_segment_aligned() {
        let matcher = SegmentPrefixMatcher::new("src/cat");

        assert!(!matcher.matches("src/catalog/app.py"));
        assert!(matcher.matches("src/cat/app.py"));
    }

    #[test]
    fn test_normalization() {
        let matcher = SegmentPrefixMatcher::new("./src/ui/");

        assert!(matcher.matches("src/ui/index.html"));
        assert!(matcher.matches("./src//ui/index.html"));
    }

    #[test]
    fn test_malformed_paths_never_match() {
        let matcher = SegmentPrefixMatcher::new("src/ui");

        assert!(!matcher.matches(""));
        assert!(!matcher.matches("/src/ui/index.html"));
        assert!(!matcher.matches("src/ui/../../etc/passwd"));
        assert!(!matcher.matches("src/ui/a\0b"));
    }

    #[test]
    fn test_malformed_prefix_matches_nothing() {
        let matcher = SegmentPrefixMatcher::new("../outside");
        assert!(!matcher.matches("outside/file"));

        let matcher = SegmentPrefixMatcher::new("/abs");
        assert!(!matcher.matches("abs/file"));
    }

    #[test]
    fn test_root_prefix() {
        let matcher = SegmentPrefixMatcher::new("");
        assert!(matcher.matches("README.md"));
        assert!(matcher.matches("src/ui/index.html"));
        assert!(!matcher.matches(""));

        let matcher = SegmentPrefixMatcher::new(".");
        assert!(matcher.matches("README.md"));
    }

    #[test]
    fn test_any_matcher() {
        let matcher = AnyMatcher::new(vec![
            Box::new(SegmentPrefixMatcher::new("src/orders")),
            Box::new(SegmentPrefixMatcher::new("lib/shared")),
        ]);

        assert!(matcher.matches("src/orders/pom.xml"));
        assert!(matcher.matches("lib/shared/util.java"));
        assert!(!matcher.matches("src/checkout/index.ts"));
    }
}
