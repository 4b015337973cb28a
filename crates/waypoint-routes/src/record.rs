//! Compiled route records

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::guard::NavigationGuard;
use crate::pattern::PathPattern;

pub type Meta = BTreeMap<String, serde_json::Value>;

/// Stable index of a record inside its route table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub(crate) usize);

impl RecordId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One compiled route. Immutable once registered.
pub struct RouteRecord {
    pub(crate) id: RecordId,
    /// Full path, parent prefix included
    pub(crate) path: String,
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<RecordId>,
    /// Set on records registered from another record's `alias` list
    pub(crate) alias_of: Option<RecordId>,
    pub(crate) pattern: PathPattern,
    pub(crate) meta: Meta,
    pub(crate) view: Option<serde_json::Value>,
    pub(crate) redirect: Option<String>,
    pub(crate) before_enter: Option<Arc<dyn NavigationGuard>>,
}

impl RouteRecord {
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<RecordId> {
        self.parent
    }

    pub fn alias_of(&self) -> Option<RecordId> {
        self.alias_of
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.pattern.param_names()
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// View-binding payload, opaque to the router
    pub fn view(&self) -> Option<&serde_json::Value> {
        self.view.as_ref()
    }

    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    pub fn before_enter(&self) -> Option<&Arc<dyn NavigationGuard>> {
        self.before_enter.as_ref()
    }
}

impl PartialEq for RouteRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.path == other.path
    }
}

impl fmt::Debug for RouteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRecord")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("alias_of", &self.alias_of)
            .field("redirect", &self.redirect)
            .field("before_enter", &self.before_enter.is_some())
            .finish_non_exhaustive()
    }
}
