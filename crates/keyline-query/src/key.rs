//! Storage key derivation.
//!
//! A record lives at `root / resource / record`, where the resource segment
//! names the collection. Resolution is pure: no store access, no side
//! effects.

use keyline_types::Model;

use crate::error::{QueryError, QueryResult};

/// Resolve the resource prefix for `M`.
///
/// Precedence: a non-empty explicit override, then the model's declared
/// [`Model::key_prefix`], then the lower-cased [`Model::type_name`].
pub fn resource_prefix<M: Model>(override_prefix: Option<&str>) -> String {
    match override_prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => prefix.to_string(),
        None => M::key_prefix().unwrap_or_else(|| M::type_name().to_lowercase()),
    }
}

/// Join path segments with `/` and clean the result. Empty segments are
/// skipped; joining only empty segments yields `""`.
pub fn join(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        return joined;
    }
    clean(&joined)
}

/// Lexically normalize a slash-separated path: collapse repeated
/// separators, drop `.` segments and trailing separators, and resolve `..`
/// against the preceding segment. `..` never climbs above a rooted path.
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if !rooted => segments.push(".."),
                _ => {}
            },
            other => segments.push(other),
        }
    }
    let body = segments.join("/");
    if rooted {
        format!("/{body}")
    } else if body.is_empty() {
        ".".to_string()
    } else {
        body
    }
}

/// Key layout of one collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyResolver {
    root: String,
    resource: String,
}

impl KeyResolver {
    pub fn new(root: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            resource: resource.into(),
        }
    }

    /// Resolver for model `M` under `root`, honoring an optional override.
    pub fn for_model<M: Model>(root: &str, override_prefix: Option<&str>) -> Self {
        Self::new(root, resource_prefix::<M>(override_prefix))
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn resource_prefix(&self) -> &str {
        &self.resource
    }

    /// The collection key, `root / resource`.
    pub fn list_prefix(&self) -> String {
        join(&[&self.root, &self.resource])
    }

    /// The prefix scanned by list: the collection key plus a trailing
    /// separator, so `/a/user` never picks up `/a/users/...`.
    pub fn scan_prefix(&self) -> String {
        let mut prefix = self.list_prefix();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        prefix
    }

    /// Full storage key of record `key`.
    ///
    /// Fails with [`QueryError::InvalidKey`] when `key` is empty or when it
    /// normalizes to something outside this collection (`"."`, `".."`,
    /// `"/"`), since either would silently address a different key.
    pub fn record_key(&self, key: &str) -> QueryResult<String> {
        if key.trim().is_empty() {
            return Err(QueryError::InvalidKey {
                key: key.to_string(),
                reason: "record key must not be empty".into(),
            });
        }
        let full = join(&[&self.root, &self.resource, key]);
        let scan = self.scan_prefix();
        if full.len() <= scan.len() || !full.starts_with(&scan) {
            return Err(QueryError::InvalidKey {
                key: key.to_string(),
                reason: format!("resolves to {full:?}, outside collection {scan:?}"),
            });
        }
        Ok(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct StreamRoute {}

    impl Model for StreamRoute {}

    #[derive(Serialize, Deserialize)]
    struct Consumer {}

    impl Model for Consumer {
        fn key_prefix() -> Option<String> {
            Some("consumers".into())
        }
    }

    // -----------------------------------------------------------------------
    // Resource prefix precedence
    // -----------------------------------------------------------------------

    #[test]
    fn type_name_is_the_default_prefix() {
        assert_eq!(resource_prefix::<StreamRoute>(None), "streamroute");
    }

    #[test]
    fn declared_prefix_beats_type_name() {
        assert_eq!(resource_prefix::<Consumer>(None), "consumers");
    }

    #[test]
    fn override_beats_everything() {
        assert_eq!(resource_prefix::<Consumer>(Some("/custom")), "/custom");
        assert_eq!(resource_prefix::<Consumer>(Some("")), "consumers");
    }

    // -----------------------------------------------------------------------
    // Joining
    // -----------------------------------------------------------------------

    #[test]
    fn join_normalizes_separators() {
        assert_eq!(join(&["/apisix", "test_prefix", "test2"]), "/apisix/test_prefix/test2");
        assert_eq!(join(&["/apisix/", "/test_prefix", "test2"]), "/apisix/test_prefix/test2");
        assert_eq!(join(&["/apisix//", "routes/", "1/"]), "/apisix/routes/1");
        assert_eq!(join(&["", "routes", ""]), "routes");
        assert_eq!(join(&["", ""]), "");
    }

    #[test]
    fn clean_resolves_dots() {
        assert_eq!(clean("/a/./b/../c"), "/a/c");
        assert_eq!(clean("/.."), "/");
        assert_eq!(clean("a/../.."), "..");
        assert_eq!(clean(""), ".");
    }

    // -----------------------------------------------------------------------
    // Record keys
    // -----------------------------------------------------------------------

    #[test]
    fn record_key_layout() {
        let r = KeyResolver::for_model::<Consumer>("/management", None);
        assert_eq!(r.record_key("jack").unwrap(), "/management/consumers/jack");
        assert_eq!(r.list_prefix(), "/management/consumers");
        assert_eq!(r.scan_prefix(), "/management/consumers/");
    }

    #[test]
    fn nested_record_keys_stay_in_collection() {
        let r = KeyResolver::new("/m", "routes");
        assert_eq!(r.record_key("a/b").unwrap(), "/m/routes/a/b");
    }

    #[test]
    fn empty_record_key_rejected() {
        let r = KeyResolver::new("/m", "routes");
        assert!(matches!(r.record_key(""), Err(QueryError::InvalidKey { .. })));
        assert!(matches!(r.record_key("  "), Err(QueryError::InvalidKey { .. })));
    }

    #[test]
    fn keys_collapsing_onto_other_keys_rejected() {
        let r = KeyResolver::new("/m", "routes");
        for key in [".", "/", "..", "../upstreams/1", "x/../.."] {
            assert!(r.record_key(key).is_err(), "{key} should be rejected");
        }
    }
}
