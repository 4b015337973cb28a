//! Waypoint Transition
//!
//! Serializes navigation requests into one authoritative transition at a
//! time:
//! - FIFO drain loop on a single worker task
//! - Guard pipeline: before guards, the leaf record's `before_enter`, resolve guards
//! - Redirect, block, fail and supersession handling
//! - Listener, after hooks, ready and error callbacks

mod engine;
mod error;
mod lifecycle;
mod registry;
mod state;
mod transition;

pub use engine::{
    EngineConfig, TransitionEngine, DEFAULT_GUARD_TIMEOUT, DEFAULT_MAX_GUARDS,
    DEFAULT_MAX_REDIRECTS,
};
pub use error::{is_navigation_failure, NavigationFailure, NavigationFailureType, TransitionError};
pub use lifecycle::{ErrorCallback, Lifecycle, ReadyCallback, ReadyErrorCallback, RouteListener};
pub use registry::{AfterHook, GuardId, GuardRegistry, GuardSnapshot};
pub use state::{GuardStage, NavigationType, TransitionState};
pub use transition::NavigationResult;

pub type Result<T> = std::result::Result<T, TransitionError>;
