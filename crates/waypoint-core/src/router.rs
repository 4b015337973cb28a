//! Navigation facade
//!
//! The router is constructed once and handed to whoever needs it. It owns the
//! route matcher, the location source and the transition engine, and is the
//! only place where raw navigation input is normalized and resolved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use waypoint_history::{normalize_base, LocationSource, SubscriptionId};
use waypoint_routes::{
    normalize, Location, NavigationGuard, RawLocation, RecordId, Route, RouteDefinition,
    RouteMatcher, RouteRecord,
};
use waypoint_transition::{
    GuardId, NavigationFailure, NavigationResult, NavigationType, TransitionEngine,
};

use crate::config::RouterOptions;
use crate::error::CoreError;
use crate::Result;

/// Side-effect-free resolution result
#[derive(Debug, Clone, Serialize)]
pub struct Resolved {
    pub location: Location,
    pub route: Route,
    /// Full path with the router base applied
    pub href: String,
}

pub struct Router {
    options: RouterOptions,
    matcher: RouteMatcher,
    source: Arc<dyn LocationSource>,
    engine: TransitionEngine,
    subscription: Mutex<Option<SubscriptionId>>,
    initialized: AtomicBool,
    destroyed: AtomicBool,
}

impl Router {
    /// Build the route table and start the transition worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(mut options: RouterOptions, source: Arc<dyn LocationSource>) -> Result<Self> {
        Handle::try_current().map_err(|_| CoreError::NoRuntime)?;
        options.base = normalize_base(&options.base);

        let problems = options.validate();
        if !problems.is_empty() {
            return Err(CoreError::Config(problems.join(", ")));
        }

        let matcher = RouteMatcher::new(&options.routes);
        let engine = TransitionEngine::spawn(
            matcher.clone(),
            Arc::clone(&source),
            options.engine_config(),
        );

        tracing::info!(
            base = %options.base,
            records = matcher.get_routes().len(),
            "Router created"
        );

        Ok(Self {
            options,
            matcher,
            source,
            engine,
            subscription: Mutex::new(None),
            initialized: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Navigate to the source's current location and start following its
    /// change notifications. Later calls only report the current route.
    pub async fn init(&self) -> NavigationResult {
        if self.is_destroyed() {
            return Err(NavigationFailure::Destroyed);
        }
        if self.initialized.swap(true, Ordering::SeqCst) {
            tracing::debug!("Router already initialized");
            return Ok(self.current_route());
        }

        let engine = self.engine.clone();
        let matcher = self.matcher.clone();
        let id = self.source.on_change(Arc::new(move |location: &str| {
            let route = matcher.resolve(location, Some(&engine.current()));
            tracing::debug!(location = %location, "Location changed externally");
            // Outcome is reported through the listener and error subscribers
            drop(engine.submit(route, NavigationType::Pop));
        }));
        *self.subscription.lock() = Some(id);

        let location = self.source.current_location();
        tracing::info!(location = %location, "Initial navigation");
        let route = self.matcher.resolve(location.as_str(), Some(&self.current_route()));
        self.engine.navigate(route, NavigationType::Pop).await
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Push `to` onto history once the guards allow it; a location with
    /// `replace` set replaces instead.
    pub async fn navigate(&self, to: impl Into<RawLocation>) -> NavigationResult {
        let raw = to.into();
        let kind = if raw.replace {
            NavigationType::Replace
        } else {
            NavigationType::Push
        };
        self.transition(raw, kind).await
    }

    pub async fn replace(&self, to: impl Into<RawLocation>) -> NavigationResult {
        self.transition(to.into(), NavigationType::Replace).await
    }

    async fn transition(&self, raw: RawLocation, kind: NavigationType) -> NavigationResult {
        if self.is_destroyed() {
            return Err(NavigationFailure::Destroyed);
        }

        let route = self.matcher.resolve(raw, Some(&self.current_route()));
        self.engine.navigate(route, kind).await
    }

    /// Move through the location source's history. The resulting change
    /// comes back through the change notification like any other.
    pub fn go(&self, delta: i32) -> Result<()> {
        if self.is_destroyed() {
            return Err(NavigationFailure::Destroyed.into());
        }
        if !self.is_initialized() {
            return Err(CoreError::NotInitialized);
        }

        self.source.go(delta);
        Ok(())
    }

    pub fn back(&self) -> Result<()> {
        self.go(-1)
    }

    pub fn forward(&self) -> Result<()> {
        self.go(1)
    }

    /// Normalize and match without navigating. `current` defaults to the
    /// router's current route.
    pub fn resolve(&self, to: impl Into<RawLocation>, current: Option<&Route>) -> Resolved {
        let current = current.cloned().unwrap_or_else(|| self.current_route());
        let location = normalize(to, Some(&current));
        let route = self.matcher.resolve_location(&location);
        let href = create_href(&self.options.base, &route.full_path);

        Resolved {
            location,
            route,
            href,
        }
    }

    // === Guards and hooks ===

    pub fn before_each(&self, guard: Arc<dyn NavigationGuard>) -> Result<GuardId> {
        Ok(self.engine.guards().add_before(guard)?)
    }

    pub fn before_resolve(&self, guard: Arc<dyn NavigationGuard>) -> Result<GuardId> {
        Ok(self.engine.guards().add_resolve(guard)?)
    }

    pub fn after_each<F>(&self, hook: F) -> Result<GuardId>
    where
        F: Fn(&Route, &Route) + Send + Sync + 'static,
    {
        Ok(self.engine.guards().add_after(Arc::new(hook))?)
    }

    /// Takes effect from the next transition
    pub fn remove_guard(&self, id: GuardId) -> bool {
        self.engine.guards().remove(id)
    }

    /// Presentation subscriber, called once per committed route
    pub fn listen<F>(&self, listener: F)
    where
        F: Fn(&Route) + Send + Sync + 'static,
    {
        self.engine.lifecycle().listen(Arc::new(listener));
    }

    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce(&Route) + Send + 'static,
    {
        self.engine
            .lifecycle()
            .on_ready(&self.current_route(), Box::new(callback), None);
    }

    /// Like [`Router::on_ready`], with a callback for a failed first navigation
    pub fn on_ready_or_error<F, E>(&self, callback: F, on_error: E)
    where
        F: FnOnce(&Route) + Send + 'static,
        E: FnOnce(&NavigationFailure) + Send + 'static,
    {
        self.engine.lifecycle().on_ready(
            &self.current_route(),
            Box::new(callback),
            Some(Box::new(on_error)),
        );
    }

    /// Subscribe to guard failures for every later navigation
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(&NavigationFailure) + Send + Sync + 'static,
    {
        self.engine.lifecycle().on_error(Arc::new(callback));
    }

    pub fn is_ready(&self) -> bool {
        self.engine.lifecycle().is_ready()
    }

    // === Route table ===

    /// Register a route, nested under `parent` (a route name or path) if given
    pub fn add_route(&self, parent: Option<&str>, definition: RouteDefinition) -> Result<Option<RecordId>> {
        let id = self.matcher.add_route(parent, &definition)?;
        self.refresh();
        Ok(id)
    }

    pub fn add_routes(&self, definitions: &[RouteDefinition]) -> Vec<RecordId> {
        let ids = self.matcher.add_routes(definitions);
        self.refresh();
        ids
    }

    pub fn get_routes(&self) -> Vec<Arc<RouteRecord>> {
        self.matcher.get_routes()
    }

    /// Re-run the current location against the updated table
    fn refresh(&self) {
        if !self.is_initialized() || self.is_destroyed() {
            return;
        }

        let location = self.source.current_location();
        let route = self.matcher.resolve(location.as_str(), Some(&self.current_route()));
        tracing::debug!(location = %location, "Route table changed, re-navigating");
        drop(self.engine.submit(route, NavigationType::Pop));
    }

    // === State ===

    pub fn current_route(&self) -> Route {
        self.engine.current()
    }

    /// Current path equals `to`'s path or lies below it. The root only
    /// matches exactly.
    pub fn is_active(&self, to: impl Into<RawLocation>) -> bool {
        let current = self.current_route();
        let target = self.matcher.resolve(to, Some(&current));

        let current_path = current.path.trim_end_matches('/');
        let target_path = target.path.trim_end_matches('/');
        if target_path.is_empty() {
            return current_path.is_empty();
        }

        current_path == target_path
            || current_path
                .strip_prefix(target_path)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Path, query, hash and params all equal the current route's
    pub fn is_exact_active(&self, to: impl Into<RawLocation>) -> bool {
        let current = self.current_route();
        let target = self.matcher.resolve(to, Some(&current));
        target.is_same_location(&current)
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    pub fn matcher(&self) -> &RouteMatcher {
        &self.matcher
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Stop following the location source and shut the engine down. Every
    /// later navigation fails with [`NavigationFailure::Destroyed`].
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(id) = self.subscription.lock().take() {
            self.source.unsubscribe(id);
        }
        self.engine.close();

        tracing::info!("Router destroyed");
    }
}

fn create_href(base: &str, full_path: &str) -> String {
    if base == "/" {
        full_path.to_string()
    } else {
        format!("{base}{full_path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use waypoint_history::MemoryHistory;
    use waypoint_routes::{sync_guard, GuardError, GuardOutcome};
    use waypoint_transition::NavigationFailureType;

    fn routes() -> Vec<RouteDefinition> {
        vec![
            RouteDefinition::new("/").named("home"),
            RouteDefinition::new("/users")
                .named("users")
                .with_children(vec![RouteDefinition::new(":id").named("user")]),
            RouteDefinition::new("/login").named("login"),
            RouteDefinition::new("/admin"),
        ]
    }

    fn router_at(initial: &str) -> (Router, Arc<MemoryHistory>) {
        let history = Arc::new(MemoryHistory::with_initial(initial));
        let router = Router::new(RouterOptions::new(routes()), history.clone()).unwrap();
        (router, history)
    }

    #[test]
    fn test_requires_runtime() {
        let result = Router::new(RouterOptions::default(), Arc::new(MemoryHistory::new()));
        assert!(matches!(result, Err(CoreError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let options = RouterOptions::default().with_max_redirects(0);
        let result = Router::new(options, Arc::new(MemoryHistory::new()));
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[tokio::test]
    async fn test_init_navigates_to_source_location() {
        let (router, history) = router_at("/users/5?tab=posts");
        let route = router.init().await.unwrap();
        assert_eq!(route.name.as_deref(), Some("user"));
        assert_eq!(route.params.get("id").map(String::as_str), Some("5"));
        assert_eq!(route.matched.len(), 2);
        assert!(router.is_ready());
        // Initial navigation does not write history
        assert_eq!(history.len(), 1);

        // Second init is a no-op
        assert_eq!(router.init().await.unwrap().full_path, "/users/5?tab=posts");
    }

    #[tokio::test]
    async fn test_navigate_and_replace() {
        let (router, history) = router_at("/");
        router.init().await.unwrap();

        router.navigate("/users/1").await.unwrap();
        assert_eq!(history.len(), 2);

        router.replace("/users/2").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.current_location(), "/users/2");

        router
            .navigate(RawLocation::named("login").replacing())
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(router.current_route().path, "/login");
    }

    #[tokio::test]
    async fn test_params_only_navigation() {
        let (router, _history) = router_at("/users/1");
        router.init().await.unwrap();

        let params = [("id".to_string(), "9".to_string())].into_iter().collect();
        let route = router.navigate(RawLocation::params(params)).await.unwrap();
        assert_eq!(route.path, "/users/9");
        assert_eq!(route.name.as_deref(), Some("user"));
    }

    #[tokio::test]
    async fn test_duplicate_navigation() {
        let (router, _history) = router_at("/login");
        router.init().await.unwrap();

        let failure = router.navigate("/login").await.unwrap_err();
        assert_eq!(failure.kind(), NavigationFailureType::Duplicated);
    }

    #[tokio::test]
    async fn test_resolve_is_pure() {
        let (router, history) = router_at("/");
        router.init().await.unwrap();

        let resolved = router.resolve("users/3?x=1#top", None);
        assert_eq!(resolved.location.path, "/users/3");
        assert_eq!(resolved.route.name.as_deref(), Some("user"));
        assert_eq!(resolved.href, "/users/3?x=1#top");
        assert_eq!(router.current_route().path, "/");
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_href_uses_base() {
        let options = RouterOptions::new(routes()).with_base("/app/");
        let router = Router::new(options, Arc::new(MemoryHistory::new())).unwrap();
        assert_eq!(router.resolve("/login", None).href, "/app/login");
    }

    #[tokio::test]
    async fn test_literal_base_is_normalized() {
        let options = RouterOptions {
            base: "app/".into(),
            ..RouterOptions::new(routes())
        };
        let router = Router::new(options, Arc::new(MemoryHistory::new())).unwrap();
        assert_eq!(router.options().base, "/app");
        assert_eq!(router.resolve("/login", None).href, "/app/login");
    }

    #[tokio::test]
    async fn test_back_reenters_through_queue() {
        let (router, _history) = router_at("/");
        assert!(matches!(router.back(), Err(CoreError::NotInitialized)));
        router.init().await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        router.listen(move |route: &Route| {
            let _ = tx.send(route.path.clone());
        });

        router.navigate("/login").await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("/login"));

        router.back().unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("/"));
        router.forward().unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn test_back_runs_guards() {
        let (router, history) = router_at("/");
        router.init().await.unwrap();
        router.navigate("/admin").await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        router.on_error(move |failure: &NavigationFailure| {
            let _ = tx.send(failure.clone());
        });
        router
            .before_each(sync_guard(|to, _| {
                if to.path == "/" {
                    GuardError::rejected("stay").into()
                } else {
                    GuardOutcome::Continue
                }
            }))
            .unwrap();

        router.back().unwrap();
        let failure = rx.recv().await.unwrap();
        assert_eq!(failure.cause(), Some(&GuardError::rejected("stay")));
        assert_eq!(router.current_route().path, "/admin");
        // The source moved even though the router refused
        assert_eq!(history.current_location(), "/");
    }

    #[tokio::test]
    async fn test_add_route_renavigates_current_location() {
        let (router, _history) = router_at("/late");
        let route = router.init().await.unwrap();
        assert!(!route.is_matched());

        let (tx, mut rx) = mpsc::unbounded_channel();
        router.listen(move |route: &Route| {
            let _ = tx.send(route.is_matched());
        });

        router.add_routes(&[RouteDefinition::new("/late").named("late")]);
        assert_eq!(rx.recv().await, Some(true));
        assert_eq!(router.current_route().name.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_add_child_route() {
        let (router, _history) = router_at("/");
        router.init().await.unwrap();

        router
            .add_route(Some("users"), RouteDefinition::new("new"))
            .unwrap();
        let route = router.navigate("/users/new").await.unwrap();
        assert_eq!(route.matched.len(), 2);
        assert!(route.params.is_empty());

        assert!(matches!(
            router.add_route(Some("missing"), RouteDefinition::new("x")),
            Err(CoreError::Route(_))
        ));
    }

    #[tokio::test]
    async fn test_active_links() {
        let (router, _history) = router_at("/users/4");
        router.init().await.unwrap();

        assert!(router.is_active("/users"));
        assert!(router.is_active("/users/4/"));
        assert!(!router.is_active("/"));
        assert!(!router.is_active("/use"));
        assert!(router.is_exact_active("/users/4"));
        assert!(!router.is_exact_active("/users"));
    }

    #[tokio::test]
    async fn test_guard_removal_and_hooks() {
        let (router, _history) = router_at("/");
        router.init().await.unwrap();

        let hooks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hooks);
        router
            .after_each(move |_: &Route, _: &Route| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let blocker = router
            .before_resolve(sync_guard(|to, _| (to.path != "/admin").into()))
            .unwrap();
        assert!(router.navigate("/admin").await.is_err());

        assert!(router.remove_guard(blocker));
        router.navigate("/admin").await.unwrap();
        assert_eq!(hooks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_on_ready_after_init() {
        let (router, _history) = router_at("/login");
        router.init().await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        router.on_ready(move |route: &Route| {
            let _ = tx.send(route.path.clone());
        });
        assert_eq!(rx.recv().await.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn test_destroy() {
        let (router, history) = router_at("/");
        router.init().await.unwrap();
        router.destroy();

        assert_eq!(history.listener_count(), 0);
        assert_eq!(
            router.navigate("/login").await.unwrap_err(),
            NavigationFailure::Destroyed
        );
        assert!(matches!(
            router.go(-1),
            Err(CoreError::Navigation(NavigationFailure::Destroyed))
        ));
        assert!(router.init().await.is_err());
    }

    #[tokio::test]
    async fn test_guard_timeout_from_options() {
        let options = RouterOptions::new(routes()).with_guard_timeout(Some(Duration::from_millis(10)));
        let router = Router::new(options, Arc::new(MemoryHistory::new())).unwrap();
        router
            .before_each(waypoint_routes::callback_guard(|_, _, next| {
                // Keep the continuation alive without ever settling it
                std::mem::forget(next);
            }))
            .unwrap();

        let failure = router.navigate("/login").await.unwrap_err();
        assert_eq!(
            failure.cause(),
            Some(&GuardError::TimedOut(Duration::from_millis(10)))
        );
    }
}
