//! Location normalization
//!
//! Raw navigation input (a path string, a named-route descriptor, or a
//! params-only update) is turned into a canonical [`Location`] relative to the
//! current route:
//! 1. Named or already-normalized input passes through
//! 2. Params-only input refills the current route's pattern
//! 3. Everything else is split into path / query / hash and joined against
//!    the current path

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pattern::fill_params;
use crate::query::parse_query;
use crate::route::Route;

pub type Params = BTreeMap<String, String>;
pub type Query = BTreeMap<String, String>;

/// Canonical navigation target, before matching
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub query: Query,
    /// Either empty or starting with `#`
    pub hash: String,
    pub name: Option<String>,
    pub params: Params,
}

/// Navigation input as supplied by callers and guards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLocation {
    pub path: Option<String>,
    pub name: Option<String>,
    pub params: Params,
    pub query: Query,
    pub hash: Option<String>,
    /// Replace the current history entry instead of pushing
    pub replace: bool,
    #[serde(skip)]
    normalized: bool,
}

impl RawLocation {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Params-only update of the current route
    pub fn params(params: Params) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn replacing(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }
}

impl From<&str> for RawLocation {
    fn from(path: &str) -> Self {
        Self::path(path)
    }
}

impl From<String> for RawLocation {
    fn from(path: String) -> Self {
        Self::path(path)
    }
}

impl From<&String> for RawLocation {
    fn from(path: &String) -> Self {
        Self::path(path.clone())
    }
}

impl From<Location> for RawLocation {
    fn from(location: Location) -> Self {
        Self {
            path: Some(location.path),
            name: location.name,
            params: location.params,
            query: location.query,
            hash: Some(location.hash),
            replace: false,
            normalized: true,
        }
    }
}

/// Path split into its three parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPath {
    /// May be empty when the input was only a query and/or hash
    pub path: String,
    pub query: Query,
    pub hash: String,
}

/// Split on the first `#`, then on the first `?`.
pub fn parse_path(input: &str) -> ParsedPath {
    let (rest, hash) = match input.find('#') {
        Some(index) => (&input[..index], input[index..].to_string()),
        None => (input, String::new()),
    };

    let (path, query) = match rest.find('?') {
        Some(index) => (&rest[..index], parse_query(&rest[index + 1..])),
        None => (rest, Query::new()),
    };

    ParsedPath {
        path: path.to_string(),
        query,
        hash,
    }
}

/// Join a relative path against `base`.
///
/// The last segment of `base` is dropped, then each relative segment is
/// applied: `..` pops, `.` is skipped, anything else is pushed.
pub fn resolve_relative(relative: &str, base: &str) -> String {
    if relative.starts_with('/') {
        return relative.to_string();
    }

    let mut stack: Vec<&str> = base.split('/').collect();
    stack.pop();

    for segment in relative.split('/') {
        match segment {
            ".." => {
                stack.pop();
            }
            "." => {}
            other => stack.push(other),
        }
    }

    if stack.first() != Some(&"") {
        stack.insert(0, "");
    }

    let joined = stack.join("/");
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

fn normalize_hash(hash: &str) -> String {
    if hash.is_empty() || hash.starts_with('#') {
        hash.to_string()
    } else {
        format!("#{hash}")
    }
}

/// Normalize raw input against the current route.
pub fn normalize(raw: impl Into<RawLocation>, current: Option<&Route>) -> Location {
    let raw = raw.into();

    if raw.name.is_some() || raw.normalized {
        return Location {
            path: raw.path.unwrap_or_default(),
            query: raw.query,
            hash: normalize_hash(raw.hash.as_deref().unwrap_or_default()),
            name: raw.name,
            params: raw.params,
        };
    }

    let base_path = current.map(|route| route.path.as_str()).unwrap_or("/");

    if raw.path.is_none() && !raw.params.is_empty() {
        if let Some(current) = current {
            let mut params = current.params.clone();
            params.extend(raw.params);

            let path = match current.leaf() {
                Some(record) => fill_params(record.path(), &params),
                None => current.path.clone(),
            };

            return Location {
                path,
                query: raw.query,
                hash: normalize_hash(raw.hash.as_deref().unwrap_or_default()),
                name: current.name.clone(),
                params,
            };
        }
    }

    let parsed = parse_path(raw.path.as_deref().unwrap_or_default());
    let path = if parsed.path.is_empty() {
        base_path.to_string()
    } else {
        resolve_relative(&parsed.path, base_path)
    };

    let mut query = raw.query;
    query.extend(parsed.query);

    let hash = match raw.hash.as_deref() {
        Some(hash) if !hash.is_empty() => normalize_hash(hash),
        _ => parsed.hash,
    };

    Location {
        path,
        query,
        hash,
        name: None,
        params: raw.params,
    }
}
