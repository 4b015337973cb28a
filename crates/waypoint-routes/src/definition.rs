//! Caller-authored route definitions

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::guard::NavigationGuard;
use crate::record::Meta;

/// Route configuration before compilation.
///
/// Deserializable from TOML/JSON; `before_enter` can only be attached in code.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RouteDefinition {
    /// Absolute, or relative to the parent when nested
    pub path: String,
    pub name: Option<String>,
    pub children: Vec<RouteDefinition>,
    #[serde(deserialize_with = "one_or_many")]
    pub alias: Vec<String>,
    pub meta: Meta,
    /// View-binding payload, opaque to the router
    pub view: Option<serde_json::Value>,
    /// Entering this route redirects here before any guard runs
    pub redirect: Option<String>,
    pub case_sensitive: bool,
    #[serde(skip)]
    pub before_enter: Option<Arc<dyn NavigationGuard>>,
}

impl RouteDefinition {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_children(mut self, children: Vec<RouteDefinition>) -> Self {
        self.children = children;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias.push(alias.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn with_view(mut self, view: serde_json::Value) -> Self {
        self.view = Some(view);
        self
    }

    pub fn with_redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    pub fn with_before_enter(mut self, guard: Arc<dyn NavigationGuard>) -> Self {
        self.before_enter = Some(guard);
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// Whether the path is joined onto the parent's path
    pub fn is_parent_relative(&self) -> bool {
        !self.path.starts_with('/')
    }

    /// Copy registered under an alias path, sharing everything but the aliases
    pub(crate) fn alias_definition(&self, alias: &str) -> Self {
        Self {
            path: alias.to_string(),
            alias: Vec::new(),
            ..self.clone()
        }
    }
}

impl Default for RouteDefinition {
    fn default() -> Self {
        Self {
            path: String::new(),
            name: None,
            children: Vec::new(),
            alias: Vec::new(),
            meta: Meta::new(),
            view: None,
            redirect: None,
            case_sensitive: true,
            before_enter: None,
        }
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("children", &self.children)
            .field("alias", &self.alias)
            .field("redirect", &self.redirect)
            .field("case_sensitive", &self.case_sensitive)
            .field("before_enter", &self.before_enter.is_some())
            .finish_non_exhaustive()
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(alias) => vec![alias],
        OneOrMany::Many(aliases) => aliases,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_definitions() {
        let source = r#"
            path = "/users/:id"
            name = "user"
            alias = "/u/:id"
            meta = { requires_auth = true }

            [[children]]
            path = "posts"
            alias = ["p", "articles"]
        "#;

        let definition: RouteDefinition = toml::from_str(source).unwrap();
        assert_eq!(definition.path, "/users/:id");
        assert_eq!(definition.alias, vec!["/u/:id".to_string()]);
        assert_eq!(definition.meta.get("requires_auth"), Some(&serde_json::json!(true)));
        assert!(definition.case_sensitive);

        let child = &definition.children[0];
        assert!(child.is_parent_relative());
        assert_eq!(child.alias.len(), 2);
    }

    #[test]
    fn test_alias_definition_drops_aliases() {
        let definition = RouteDefinition::new("/a").named("a").with_alias("/b");
        let alias = definition.alias_definition("/b");
        assert_eq!(alias.path, "/b");
        assert_eq!(alias.name.as_deref(), Some("a"));
        assert!(alias.alias.is_empty());
    }
}
