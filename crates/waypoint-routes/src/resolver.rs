//! Route resolution
//!
//! Priority order:
//! 1. Name index
//! 2. Exact path index
//! 3. Pattern scan in registration order
//!
//! A miss is not an error: it yields a route with an empty matched chain.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::definition::RouteDefinition;
use crate::location::{normalize, Location, Params, RawLocation};
use crate::pattern::fill_params;
use crate::query::stringify_query;
use crate::record::{RecordId, RouteRecord};
use crate::route::Route;
use crate::table::RouteTable;
use crate::Result;

/// Shared handle over a route table; clones see the same table.
#[derive(Clone, Default)]
pub struct RouteMatcher {
    table: Arc<RwLock<RouteTable>>,
}

impl RouteMatcher {
    pub fn new(definitions: &[RouteDefinition]) -> Self {
        Self {
            table: Arc::new(RwLock::new(RouteTable::from_definitions(definitions))),
        }
    }

    pub fn add_routes(&self, definitions: &[RouteDefinition]) -> Vec<RecordId> {
        self.table.write().register(definitions)
    }

    pub fn add_route(
        &self,
        parent: Option<&str>,
        definition: &RouteDefinition,
    ) -> Result<Option<RecordId>> {
        self.table.write().add_route(parent, definition)
    }

    pub fn get_routes(&self) -> Vec<Arc<RouteRecord>> {
        self.table.read().records().to_vec()
    }

    pub fn with_table<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&RouteTable) -> T,
    {
        f(&self.table.read())
    }

    /// Normalize and match without side effects.
    pub fn resolve(&self, raw: impl Into<RawLocation>, current: Option<&Route>) -> Route {
        let location = normalize(raw, current);
        self.resolve_location(&location)
    }

    pub fn resolve_location(&self, location: &Location) -> Route {
        let table = self.table.read();

        if let Some(name) = &location.name {
            if let Some(record) = table.lookup_by_name(name) {
                let mut named = location.clone();
                if named.path.is_empty() {
                    named.path = fill_params(record.path(), &location.params);
                }
                return build_route(&table, Some(record), &named, Params::new());
            }
            tracing::debug!(name = %name, "No route registered under this name");
        }

        if let Some(record) = table.lookup_by_path(&location.path) {
            return build_route(&table, Some(record), location, Params::new());
        }

        if let Some(hit) = table.scan(&location.path) {
            return build_route(&table, Some(&hit.record), location, hit.params);
        }

        tracing::debug!(path = %location.path, "No route matched");
        build_route(&table, None, location, Params::new())
    }
}

fn build_route(
    table: &RouteTable,
    record: Option<&Arc<RouteRecord>>,
    location: &Location,
    captured: Params,
) -> Route {
    let mut params = captured;
    params.extend(location.params.clone());

    let path = if location.path.is_empty() {
        "/".to_string()
    } else {
        location.path.clone()
    };
    let full_path = format!("{}{}{}", path, stringify_query(&location.query), location.hash);

    Route {
        name: record.and_then(|record| record.name().map(String::from)),
        path,
        hash: location.hash.clone(),
        query: location.query.clone(),
        params,
        full_path,
        matched: record
            .map(|record| table.matched_chain(record.id()))
            .unwrap_or_default(),
        redirected_from: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> RouteMatcher {
        RouteMatcher::new(&[
            RouteDefinition::new("/").named("home"),
            RouteDefinition::new("/users/:id").named("user"),
            RouteDefinition::new("/a").with_children(vec![RouteDefinition::new("b")]),
            RouteDefinition::new("/files/*"),
        ])
    }

    #[test]
    fn test_resolve_params_query_hash() {
        let route = matcher().resolve("/users/42?tab=profile#bio", None);
        assert_eq!(route.path, "/users/42");
        assert_eq!(route.params.get("id").map(String::as_str), Some("42"));
        assert_eq!(route.query.get("tab").map(String::as_str), Some("profile"));
        assert_eq!(route.hash, "#bio");
        assert_eq!(route.full_path, "/users/42?tab=profile#bio");
        assert_eq!(route.name.as_deref(), Some("user"));
    }

    #[test]
    fn test_nested_chain() {
        let route = matcher().resolve("/a/b", None);
        let paths: Vec<&str> = route.matched.iter().map(|record| record.path()).collect();
        assert_eq!(paths, vec!["/a", "/a/b"]);
    }

    #[test]
    fn test_resolve_by_name_fills_path() {
        let raw = RawLocation::named("user").with_param("id", "7").with_query("x", "1");
        let route = matcher().resolve(raw, None);
        assert_eq!(route.path, "/users/7");
        assert_eq!(route.full_path, "/users/7?x=1");
        assert_eq!(route.matched.len(), 1);
    }

    #[test]
    fn test_unmatched_is_soft() {
        let route = matcher().resolve("/nowhere", None);
        assert!(route.matched.is_empty());
        assert!(route.name.is_none());
        assert_eq!(route.path, "/nowhere");
    }

    #[test]
    fn test_location_params_override_captured() {
        let raw = RawLocation::path("/users/42").with_param("id", "override");
        let route = matcher().resolve(raw, None);
        assert_eq!(route.params.get("id").map(String::as_str), Some("override"));
    }

    #[test]
    fn test_params_only_update_refills_current_pattern() {
        let matcher = matcher();
        let current = matcher.resolve("/users/1?keep=no", None);
        let next = matcher.resolve(RawLocation::params(Params::from([("id".to_string(), "2".to_string())])), Some(&current));
        assert_eq!(next.path, "/users/2");
        assert_eq!(next.name.as_deref(), Some("user"));
        assert!(next.query.is_empty());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let matcher = matcher();
        for input in ["/users/9?b=2&a=1", "/a/b#x", "/files/x/y", "/missing"] {
            assert_eq!(matcher.resolve(input, None), matcher.resolve(input, None), "{input}");
        }
    }

    #[test]
    fn test_wildcard_and_decoding() {
        let route = matcher().resolve("/files/docs/read%20me.md", None);
        assert_eq!(
            route.params.get("pathMatch").map(String::as_str),
            Some("docs/read me.md")
        );
    }

    #[test]
    fn test_added_route_is_visible_to_clones() {
        let matcher = matcher();
        let clone = matcher.clone();
        matcher.add_routes(&[RouteDefinition::new("/late")]);
        assert!(clone.resolve("/late", None).is_matched());
        assert_eq!(clone.get_routes().len(), matcher.get_routes().len());
    }
}
