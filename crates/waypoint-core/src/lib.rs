//! Waypoint Core
//!
//! Navigation facade for the Waypoint router. The [`Router`] is built once
//! from [`RouterOptions`] and a location source, then passed explicitly to
//! whatever needs to navigate.

mod config;
mod error;
mod router;

pub use config::{RouterOptions, DEFAULT_GUARD_TIMEOUT_MS};
pub use error::CoreError;
pub use router::{Resolved, Router};

// Re-export the building blocks
pub use waypoint_history::{
    normalize_base, ChangeCallback, HistoryEntry, LocationSource, MemoryHistory, SubscriptionId,
};
pub use waypoint_routes::{
    callback_guard, guard_fn, sync_guard, GuardError, GuardOutcome, Location, Meta,
    NavigationGuard, Next, Params, Query, RawLocation, RecordId, Route, RouteDefinition,
    RouteError, RouteMatcher, RouteRecord,
};
pub use waypoint_transition::{
    is_navigation_failure, GuardId, GuardStage, NavigationFailure, NavigationFailureType,
    NavigationResult, NavigationType, TransitionError,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    init_logging_with(None);
}

/// Initialize logging, with `level` taking precedence over `RUST_LOG`.
/// Output goes to stderr so stdout stays free for command output.
pub fn init_logging_with(level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
