//! Paths exempt from request logging.

use std::collections::HashSet;

/// Exact-match set of request paths.
///
/// Built once when the middleware is constructed and shared read-only by every
/// request afterwards. An empty input produces no set at all, so membership
/// checks on the common no-skip configuration are a single `None` test.
///
/// Matching is byte-for-byte: `/health` does not match `/health/`, `/healthz`
/// or `/Health`.
#[derive(Clone, Debug, Default)]
pub struct SkipSet(Option<HashSet<String>>);

impl SkipSet {
    pub fn contains(&self, path: &str) -> bool {
        self.0.as_ref().is_some_and(|paths| paths.contains(path))
    }

    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, HashSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

/// Collects `paths` into a [`SkipSet`]. Duplicates collapse.
pub fn build_skip_set<I, S>(paths: I) -> SkipSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut paths = paths.into_iter().peekable();
    if paths.peek().is_none() {
        return SkipSet(None);
    }
    SkipSet(Some(paths.map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_nothing() {
        let skip = build_skip_set(Vec::<String>::new());
        assert!(skip.is_empty());
        assert!(!skip.contains("/"));
        assert!(!skip.contains(""));
    }

    #[test]
    fn matching_is_exact() {
        let skip = build_skip_set(["/health"]);
        assert!(skip.contains("/health"));
        assert!(!skip.contains("/health/"));
        assert!(!skip.contains("/healthz"));
        assert!(!skip.contains("/Health"));
    }

    #[test]
    fn duplicates_collapse() {
        let skip = build_skip_set(["/ping", "/metrics", "/ping"]);
        assert_eq!(skip.len(), 2);
        assert!(skip.contains("/metrics"));
    }
}
