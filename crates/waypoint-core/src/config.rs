//! Router configuration

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use waypoint_history::normalize_base;
use waypoint_routes::RouteDefinition;
use waypoint_transition::{EngineConfig, DEFAULT_MAX_GUARDS, DEFAULT_MAX_REDIRECTS};

use crate::error::CoreError;
use crate::Result;

pub const DEFAULT_GUARD_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    /// Prefix applied to generated hrefs
    pub base: String,
    /// Per-guard timeout; `0` disables it
    pub guard_timeout_ms: Option<u64>,
    /// Longest redirect chain before the navigation is aborted
    pub max_redirects: usize,
    /// Guards allowed per stage
    pub max_guards: usize,
    pub routes: Vec<RouteDefinition>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            base: "/".to_string(),
            guard_timeout_ms: Some(DEFAULT_GUARD_TIMEOUT_MS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_guards: DEFAULT_MAX_GUARDS,
            routes: Vec::new(),
        }
    }
}

impl RouterOptions {
    pub fn new(routes: Vec<RouteDefinition>) -> Self {
        Self {
            routes,
            ..Self::default()
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = normalize_base(&base.into());
        self
    }

    pub fn with_guard_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.guard_timeout_ms = timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Parse TOML, normalize the base and validate
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut options: RouterOptions = toml::from_str(content)?;
        options.base = normalize_base(&options.base);

        let problems = options.validate();
        if !problems.is_empty() {
            return Err(CoreError::Config(problems.join(", ")));
        }

        Ok(options)
    }

    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let options = Self::from_toml_str(&content)?;

        tracing::info!(
            path = %path.display(),
            routes = options.routes.len(),
            "Loaded router configuration"
        );

        Ok(options)
    }

    /// Every problem found; empty when the options are usable
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.max_redirects == 0 {
            problems.push("max_redirects must be at least 1".to_string());
        }
        if self.max_guards == 0 {
            problems.push("max_guards must be at least 1".to_string());
        }
        if self.base.contains(|c: char| c == '?' || c == '#') {
            problems.push(format!("base must be a plain path, got {:?}", self.base));
        }

        let mut pending: Vec<&RouteDefinition> = self.routes.iter().collect();
        while let Some(definition) = pending.pop() {
            if definition.path.trim().is_empty() {
                tracing::warn!(name = ?definition.name, "Route without a path will be skipped");
            }
            pending.extend(definition.children.iter());
        }

        problems
    }

    pub fn guard_timeout(&self) -> Option<Duration> {
        self.guard_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            guard_timeout: self.guard_timeout(),
            max_redirects: self.max_redirects,
            max_guards: self.max_guards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RouterOptions::default();
        assert_eq!(options.base, "/");
        assert_eq!(options.guard_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(options.max_redirects, 10);
        assert_eq!(options.max_guards, 100);
        assert!(options.validate().is_empty());
    }

    #[test]
    fn test_from_toml() {
        let options = RouterOptions::from_toml_str(
            r#"
            base = "app/"
            guard_timeout_ms = 0
            max_redirects = 4

            [[routes]]
            path = "/users/:id"
            name = "user"

            [[routes]]
            path = "/settings"
            alias = "/prefs"

            [[routes.children]]
            path = "profile"
            "#,
        )
        .unwrap();

        assert_eq!(options.base, "/app");
        assert_eq!(options.guard_timeout(), None);
        assert_eq!(options.max_redirects, 4);
        assert_eq!(options.max_guards, 100);
        assert_eq!(options.routes.len(), 2);
        assert_eq!(options.routes[1].children.len(), 1);
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let result = RouterOptions::from_toml_str(
            r#"
            base = "/app?x=1"
            max_redirects = 0
            max_guards = 0
            "#,
        );

        match result {
            Err(CoreError::Config(message)) => {
                assert!(message.contains("max_redirects"));
                assert!(message.contains("max_guards"));
                assert!(message.contains("base"));
            }
            other => panic!("Expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_guard_timeout_saturates() {
        let options = RouterOptions::default().with_guard_timeout(Some(Duration::MAX));
        assert_eq!(options.guard_timeout_ms, Some(u64::MAX));

        let options = RouterOptions::default().with_guard_timeout(Some(Duration::from_millis(250)));
        assert_eq!(options.guard_timeout(), Some(Duration::from_millis(250)));

        let options = RouterOptions::default().with_guard_timeout(None);
        assert_eq!(options.guard_timeout(), None);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            RouterOptions::from_toml_str("routes = 3"),
            Err(CoreError::Toml(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            RouterOptions::load("/nonexistent/waypoint.toml"),
            Err(CoreError::Io(_))
        ));
    }
}
