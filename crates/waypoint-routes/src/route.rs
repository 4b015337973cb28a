//! Resolved route snapshot

use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::location::{Location, Params, Query};
use crate::record::RouteRecord;

/// Where the router is, or is about to be.
///
/// Value object: a new navigation always produces a new `Route`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub name: Option<String>,
    pub path: String,
    pub hash: String,
    pub query: Query,
    /// Location params layered over params captured from the path
    pub params: Params,
    /// Path + serialized query + hash
    pub full_path: String,
    /// Root-to-leaf record chain; empty when nothing matched
    #[serde(serialize_with = "serialize_matched")]
    pub matched: Vec<Arc<RouteRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirected_from: Option<Location>,
}

fn serialize_matched<S: Serializer>(
    matched: &[Arc<RouteRecord>],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(matched.iter().map(|record| record.path()))
}

impl Route {
    /// The unmatched root route a router starts from
    pub fn start() -> Self {
        Self {
            name: None,
            path: "/".to_string(),
            hash: String::new(),
            query: Query::new(),
            params: Params::new(),
            full_path: "/".to_string(),
            matched: Vec::new(),
            redirected_from: None,
        }
    }

    pub fn leaf(&self) -> Option<&Arc<RouteRecord>> {
        self.matched.last()
    }

    pub fn is_matched(&self) -> bool {
        !self.matched.is_empty()
    }

    pub fn with_redirected_from(mut self, from: Location) -> Self {
        self.redirected_from = Some(from);
        self
    }

    pub fn to_location(&self) -> Location {
        Location {
            path: self.path.clone(),
            query: self.query.clone(),
            hash: self.hash.clone(),
            name: self.name.clone(),
            params: self.params.clone(),
        }
    }

    /// Canonical identity check used for duplicate-navigation detection.
    ///
    /// Paths compare with trailing slashes stripped.
    pub fn is_same_location(&self, other: &Route) -> bool {
        if !self.path.is_empty() && !other.path.is_empty() {
            return trim_trailing_slashes(&self.path) == trim_trailing_slashes(&other.path)
                && self.hash == other.hash
                && self.query == other.query
                && self.params == other.params;
        }

        match (&self.name, &other.name) {
            (Some(a), Some(b)) => a == b && self.query == other.query && self.params == other.params,
            _ => false,
        }
    }
}

fn trim_trailing_slashes(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

impl Default for Route {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(path: &str) -> Route {
        Route {
            path: path.to_string(),
            ..Route::start()
        }
    }

    #[test]
    fn test_same_location_ignores_trailing_slash() {
        assert!(at("/a/").is_same_location(&at("/a")));
        assert!(at("/").is_same_location(&at("//")));
        assert!(!at("/a").is_same_location(&at("/b")));
    }

    #[test]
    fn test_same_location_compares_query_and_hash() {
        let mut with_query = at("/a");
        with_query.query.insert("x".to_string(), "1".to_string());
        assert!(!with_query.is_same_location(&at("/a")));

        let mut with_hash = at("/a");
        with_hash.hash = "#top".to_string();
        assert!(!with_hash.is_same_location(&at("/a")));
    }
}
