//! Listener, ready and error callbacks

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use waypoint_routes::Route;

use crate::error::NavigationFailure;

/// Presentation subscriber, called once per committed route
pub type RouteListener = Arc<dyn Fn(&Route) + Send + Sync>;
pub type ReadyCallback = Box<dyn FnOnce(&Route) + Send>;
pub type ReadyErrorCallback = Box<dyn FnOnce(&NavigationFailure) + Send>;
pub type ErrorCallback = Arc<dyn Fn(&NavigationFailure) + Send + Sync>;

#[derive(Default)]
struct ReadyState {
    ready: bool,
    on_ready: Vec<ReadyCallback>,
    on_ready_error: Vec<ReadyErrorCallback>,
}

#[derive(Default)]
pub struct Lifecycle {
    listener: RwLock<Option<RouteListener>>,
    ready: Mutex<ReadyState>,
    error_subscribers: RwLock<Vec<ErrorCallback>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previous listener
    pub fn listen(&self, listener: RouteListener) {
        *self.listener.write() = Some(listener);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.lock().ready
    }

    /// Queue callbacks for the first settled transition.
    ///
    /// Once ready, `on_ready` runs immediately with `current` and the error
    /// callback is discarded.
    pub fn on_ready(
        &self,
        current: &Route,
        on_ready: ReadyCallback,
        on_error: Option<ReadyErrorCallback>,
    ) {
        let mut state = self.ready.lock();
        if state.ready {
            drop(state);
            guarded("ready callback", || on_ready(current));
            return;
        }

        state.on_ready.push(on_ready);
        if let Some(on_error) = on_error {
            state.on_ready_error.push(on_error);
        }
    }

    pub fn on_error(&self, callback: ErrorCallback) {
        self.error_subscribers.write().push(callback);
    }

    pub fn error_subscriber_count(&self) -> usize {
        self.error_subscribers.read().len()
    }

    pub(crate) fn notify_listener(&self, route: &Route) {
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            guarded("route listener", || listener(route));
        }
    }

    pub(crate) fn mark_ready(&self, route: &Route) {
        let callbacks = {
            let mut state = self.ready.lock();
            if state.ready {
                return;
            }
            state.ready = true;
            state.on_ready_error.clear();
            std::mem::take(&mut state.on_ready)
        };

        tracing::info!(path = %route.full_path, "Router ready");
        for callback in callbacks {
            guarded("ready callback", || callback(route));
        }
    }

    pub(crate) fn mark_ready_failed(&self, failure: &NavigationFailure) {
        let callbacks = {
            let mut state = self.ready.lock();
            if state.ready {
                return;
            }
            state.ready = true;
            state.on_ready.clear();
            std::mem::take(&mut state.on_ready_error)
        };

        tracing::info!(error = %failure, "Router ready after failed initial navigation");
        for callback in callbacks {
            guarded("ready error callback", || callback(failure));
        }
    }

    pub(crate) fn broadcast_error(&self, failure: &NavigationFailure) {
        let subscribers = self.error_subscribers.read().clone();
        if subscribers.is_empty() {
            tracing::error!(error = %failure, cause = ?failure.cause(), "Uncaught navigation guard failure");
            return;
        }

        for subscriber in subscribers {
            guarded("error subscriber", || subscriber(failure));
        }
    }
}

/// Run caller code, logging instead of unwinding through the engine
pub(crate) fn guarded<F: FnOnce()>(what: &str, f: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(callback = what, panic = %panic_message(payload.as_ref()), "Callback panicked");
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
