//! Route table
//!
//! Records live in an arena indexed by [`RecordId`]; parent/child links are
//! ids, never object references. Lookups:
//! - by path: O(1) index on the full path string
//! - by name: O(1) index, first registration wins
//! - by scan: compiled patterns in registration order, first match wins

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::definition::RouteDefinition;
use crate::error::RouteError;
use crate::location::Params;
use crate::pattern::PathPattern;
use crate::record::{RecordId, RouteRecord};
use crate::Result;

/// Children are only registered below this depth
pub const MAX_NESTING_DEPTH: usize = 10;
pub const MAX_CHILDREN: usize = 100;
pub const MAX_ALIASES: usize = 5;
/// Bound on any parent walk
pub const MAX_CHAIN_DEPTH: usize = 20;

/// A record hit together with the params captured from the path
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub record: Arc<RouteRecord>,
    pub params: Params,
}

#[derive(Debug, Default)]
pub struct RouteTable {
    records: Vec<Arc<RouteRecord>>,
    by_path: HashMap<String, RecordId>,
    by_name: HashMap<String, RecordId>,
    children: HashMap<RecordId, Vec<RecordId>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(definitions: &[RouteDefinition]) -> Self {
        let mut table = Self::new();
        table.register(definitions);
        table
    }

    /// Register top-level definitions. Bad entries are logged and skipped.
    pub fn register(&mut self, definitions: &[RouteDefinition]) -> Vec<RecordId> {
        definitions
            .iter()
            .filter_map(|definition| self.add_record(definition, None, None))
            .collect()
    }

    /// Register one definition, optionally below a parent given by name or path.
    pub fn add_route(
        &mut self,
        parent: Option<&str>,
        definition: &RouteDefinition,
    ) -> Result<Option<RecordId>> {
        let parent_id = match parent {
            Some(key) => Some(
                self.by_name
                    .get(key)
                    .or_else(|| self.by_path.get(key))
                    .copied()
                    .ok_or_else(|| RouteError::UnknownParent(key.to_string()))?,
            ),
            None => None,
        };

        Ok(self.add_record(definition, parent_id, None))
    }

    fn add_record(
        &mut self,
        definition: &RouteDefinition,
        parent: Option<RecordId>,
        alias_of: Option<RecordId>,
    ) -> Option<RecordId> {
        if definition.path.trim().is_empty() {
            tracing::warn!(name = ?definition.name, "Route definition without a path, skipping");
            return None;
        }

        let parent_path = parent
            .and_then(|id| self.records.get(id.0))
            .map(|record| record.path.clone());
        let path = join_paths(parent_path.as_deref(), &definition.path);

        if self.by_path.contains_key(&path) {
            tracing::warn!(path = %path, "Route path already registered, skipping");
            return None;
        }

        if let Some(parent_id) = parent {
            let siblings = self.children.get(&parent_id).map_or(0, Vec::len);
            if siblings >= MAX_CHILDREN {
                tracing::warn!(path = %path, limit = MAX_CHILDREN, "Too many child routes, skipping");
                return None;
            }
        }

        let id = RecordId(self.records.len());
        let indexed_name = match &definition.name {
            Some(name) if self.by_name.contains_key(name) => {
                if alias_of.is_none() {
                    tracing::warn!(name = %name, path = %path, "Route name already registered");
                }
                None
            }
            other => other.clone(),
        };

        let record = RouteRecord {
            id,
            path: path.clone(),
            name: definition.name.clone(),
            parent,
            alias_of,
            pattern: PathPattern::compile(&path, definition.case_sensitive),
            meta: definition.meta.clone(),
            view: definition.view.clone(),
            redirect: definition.redirect.clone(),
            before_enter: definition.before_enter.clone(),
        };

        self.records.push(Arc::new(record));
        self.by_path.insert(path.clone(), id);
        if let Some(name) = indexed_name {
            self.by_name.insert(name, id);
        }

        if definition.alias.len() > MAX_ALIASES {
            tracing::warn!(path = %path, limit = MAX_ALIASES, "Too many aliases, ignoring the rest");
        }
        for alias in definition.alias.iter().take(MAX_ALIASES) {
            if alias.trim().is_empty() {
                continue;
            }
            let alias_definition = definition.alias_definition(alias);
            self.add_record(&alias_definition, parent, Some(id));
        }

        if !definition.children.is_empty() {
            if self.depth(id) < MAX_NESTING_DEPTH {
                for child in &definition.children {
                    self.add_record(child, Some(id), None);
                }
            } else {
                tracing::warn!(path = %path, limit = MAX_NESTING_DEPTH, "Route nesting too deep, ignoring children");
            }
        }

        if let Some(parent_id) = parent {
            self.children.entry(parent_id).or_default().push(id);
        }

        tracing::debug!(path = %path, record_id = id.0, "Registered route");

        Some(id)
    }

    fn depth(&self, id: RecordId) -> usize {
        self.ancestors(id).len()
    }

    /// Parent ids from nearest to root, bounded and cycle-safe
    fn ancestors(&self, id: RecordId) -> Vec<RecordId> {
        let mut ancestors = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut current = self.records.get(id.0).and_then(|record| record.parent);

        while let Some(parent) = current {
            if ancestors.len() >= MAX_CHAIN_DEPTH {
                tracing::warn!(record_id = id.0, "Route hierarchy too deep, truncating");
                break;
            }
            if !visited.insert(parent) {
                tracing::warn!(record_id = id.0, "Circular reference in route hierarchy");
                break;
            }
            ancestors.push(parent);
            current = self.records.get(parent.0).and_then(|record| record.parent);
        }

        ancestors
    }

    pub fn record(&self, id: RecordId) -> Option<&Arc<RouteRecord>> {
        self.records.get(id.0)
    }

    pub fn lookup_by_path(&self, path: &str) -> Option<&Arc<RouteRecord>> {
        self.by_path.get(path).and_then(|id| self.record(*id))
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&Arc<RouteRecord>> {
        self.by_name.get(name).and_then(|id| self.record(*id))
    }

    /// Exact path index first, then a scan over compiled patterns.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        if let Some(record) = self.lookup_by_path(path) {
            return Some(RouteMatch {
                record: Arc::clone(record),
                params: Params::new(),
            });
        }
        self.scan(path)
    }

    /// Linear scan in registration order
    pub fn scan(&self, path: &str) -> Option<RouteMatch> {
        self.records.iter().find_map(|record| {
            record.pattern.captures(path).map(|params| RouteMatch {
                record: Arc::clone(record),
                params,
            })
        })
    }

    /// Root-to-leaf chain ending at `id`
    pub fn matched_chain(&self, id: RecordId) -> Vec<Arc<RouteRecord>> {
        let Some(leaf) = self.record(id) else {
            return Vec::new();
        };

        let mut chain: Vec<Arc<RouteRecord>> = self
            .ancestors(id)
            .into_iter()
            .filter_map(|ancestor| self.record(ancestor).cloned())
            .collect();
        chain.reverse();
        chain.push(Arc::clone(leaf));
        chain
    }

    pub fn children(&self, id: RecordId) -> &[RecordId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// All records in registration order
    pub fn records(&self) -> &[Arc<RouteRecord>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Join a child path onto its parent and collapse repeated slashes.
fn join_paths(parent: Option<&str>, path: &str) -> String {
    let path = path.trim();
    if path == "*" && parent.is_none() {
        return path.to_string();
    }

    let joined = match parent {
        _ if path.starts_with('/') => path.to_string(),
        Some(parent) => format!("{}/{}", parent.trim_end_matches('/'), path),
        None => format!("/{path}"),
    };

    let mut collapsed = String::with_capacity(joined.len());
    for ch in joined.chars() {
        if ch == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(ch);
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(definitions: Vec<RouteDefinition>) -> RouteTable {
        RouteTable::from_definitions(&definitions)
    }

    #[test]
    fn test_nested_registration() {
        let table = table(vec![RouteDefinition::new("/a").with_children(vec![
            RouteDefinition::new("b"),
            RouteDefinition::new("/absolute"),
        ])]);

        assert!(table.lookup_by_path("/a/b").is_some());
        assert!(table.lookup_by_path("/absolute").is_some());

        let a = table.lookup_by_path("/a").unwrap();
        assert_eq!(table.children(a.id()).len(), 2);

        let ab = table.lookup_by_path("/a/b").unwrap();
        let chain = table.matched_chain(ab.id());
        let paths: Vec<&str> = chain.iter().map(|record| record.path()).collect();
        assert_eq!(paths, vec!["/a", "/a/b"]);
    }

    #[test]
    fn test_duplicate_path_is_skipped() {
        let table = table(vec![
            RouteDefinition::new("/dup").named("first"),
            RouteDefinition::new("/dup").named("second"),
        ]);
        assert_eq!(table.len(), 1);
        assert!(table.lookup_by_name("second").is_none());
    }

    #[test]
    fn test_duplicate_name_keeps_first() {
        let table = table(vec![
            RouteDefinition::new("/one").named("same"),
            RouteDefinition::new("/two").named("same"),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup_by_name("same").unwrap().path(), "/one");
    }

    #[test]
    fn test_aliases_share_view_and_are_capped() {
        let mut definition = RouteDefinition::new("/home")
            .named("home")
            .with_view(serde_json::json!({ "component": "Home" }));
        for i in 0..7 {
            definition = definition.with_alias(format!("/alias-{i}"));
        }
        let table = table(vec![definition]);

        assert_eq!(table.len(), 1 + MAX_ALIASES);
        let alias = table.lookup_by_path("/alias-0").unwrap();
        let home = table.lookup_by_path("/home").unwrap();
        assert_eq!(alias.alias_of(), Some(home.id()));
        assert_eq!(alias.view(), home.view());
        assert!(table.lookup_by_path("/alias-6").is_none());
        assert_eq!(table.lookup_by_name("home").unwrap().id(), home.id());
    }

    #[test]
    fn test_scan_uses_registration_order() {
        let table = table(vec![
            RouteDefinition::new("/items/:id"),
            RouteDefinition::new("/items/:slug"),
        ]);
        let hit = table.scan("/items/5").unwrap();
        assert_eq!(hit.record.path(), "/items/:id");
        assert_eq!(hit.params.get("id").map(String::as_str), Some("5"));
    }

    #[test]
    fn test_lookup_and_scan_agree_for_static_paths() {
        let paths = ["/", "/about", "/about/team", "/contact", "/a/b/c"];
        let table = table(paths.iter().map(|p| RouteDefinition::new(*p)).collect());

        for path in paths {
            let indexed = table.lookup_by_path(path).unwrap();
            let scanned = table.scan(path).unwrap();
            assert_eq!(indexed.id(), scanned.record.id(), "{path}");
        }
    }

    #[test]
    fn test_depth_cap() {
        let mut definition = RouteDefinition::new("level-last");
        for level in (0..15).rev() {
            definition = RouteDefinition::new(format!("l{level}")).with_children(vec![definition]);
        }
        let table = table(vec![definition]);
        assert_eq!(table.len(), MAX_NESTING_DEPTH + 1);
    }

    #[test]
    fn test_add_route_under_parent() {
        let mut table = table(vec![RouteDefinition::new("/admin").named("admin")]);

        let id = table
            .add_route(Some("admin"), &RouteDefinition::new("users"))
            .unwrap()
            .unwrap();
        assert_eq!(table.record(id).unwrap().path(), "/admin/users");
        assert_eq!(table.matched_chain(id).len(), 2);

        let missing = table.add_route(Some("nope"), &RouteDefinition::new("x"));
        assert_eq!(missing, Err(RouteError::UnknownParent("nope".to_string())));
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths(Some("/a/"), "b"), "/a/b");
        assert_eq!(join_paths(Some("/a"), "/b"), "/b");
        assert_eq!(join_paths(None, "about"), "/about");
        assert_eq!(join_paths(None, "//double//slash"), "/double/slash");
        assert_eq!(join_paths(None, "*"), "*");
    }
}
