//! Navigation guard contract
//!
//! A guard inspects `(to, from)` and settles with a [`GuardOutcome`]:
//! continue, block, fail with an error, or redirect elsewhere.
//!
//! Three ways to write one:
//! - [`guard_fn`]: async closure returning an outcome
//! - [`sync_guard`]: plain closure returning an outcome
//! - [`callback_guard`]: closure handed a one-shot [`Next`] continuation

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{self, BoxFuture, FutureExt};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::location::RawLocation;
use crate::route::Route;

/// Failure value produced by, or on behalf of, a guard
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("{0}")]
    Rejected(String),

    #[error("Navigation guard panicked: {0}")]
    Panicked(String),

    #[error("Navigation guard did not settle within {0:?}")]
    TimedOut(Duration),

    #[error("Navigation guard dropped its continuation without settling")]
    Abandoned,

    #[error("Redirect limit of {0} exceeded")]
    RedirectLimit(usize),
}

impl GuardError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    Continue,
    Block,
    Fail(GuardError),
    Redirect { to: RawLocation, replace: bool },
}

impl GuardOutcome {
    /// Redirect, replacing history if the location asks for it
    pub fn redirect(to: impl Into<RawLocation>) -> Self {
        let to = to.into();
        let replace = to.replace;
        Self::Redirect { to, replace }
    }

    pub fn redirect_replace(to: impl Into<RawLocation>) -> Self {
        Self::Redirect {
            to: to.into(),
            replace: true,
        }
    }
}

impl From<bool> for GuardOutcome {
    fn from(allow: bool) -> Self {
        if allow {
            Self::Continue
        } else {
            Self::Block
        }
    }
}

impl From<GuardError> for GuardOutcome {
    fn from(error: GuardError) -> Self {
        Self::Fail(error)
    }
}

pub trait NavigationGuard: Send + Sync {
    fn check(&self, to: &Route, from: &Route) -> BoxFuture<'static, GuardOutcome>;
}

pub struct FnGuard<F>(F);

impl<F, Fut> NavigationGuard for FnGuard<F>
where
    F: Fn(Route, Route) -> Fut + Send + Sync,
    Fut: Future<Output = GuardOutcome> + Send + 'static,
{
    fn check(&self, to: &Route, from: &Route) -> BoxFuture<'static, GuardOutcome> {
        (self.0)(to.clone(), from.clone()).boxed()
    }
}

pub struct SyncGuard<F>(F);

impl<F> NavigationGuard for SyncGuard<F>
where
    F: Fn(&Route, &Route) -> GuardOutcome + Send + Sync,
{
    fn check(&self, to: &Route, from: &Route) -> BoxFuture<'static, GuardOutcome> {
        future::ready((self.0)(to, from)).boxed()
    }
}

/// One-shot continuation handed to a [`callback_guard`]
pub struct Next {
    tx: oneshot::Sender<GuardOutcome>,
}

impl Next {
    pub fn call(self, outcome: impl Into<GuardOutcome>) {
        // The receiver is gone only if the transition was already torn down
        let _ = self.tx.send(outcome.into());
    }

    pub fn proceed(self) {
        self.call(GuardOutcome::Continue);
    }

    pub fn block(self) {
        self.call(GuardOutcome::Block);
    }

    pub fn fail(self, error: GuardError) {
        self.call(GuardOutcome::Fail(error));
    }

    pub fn redirect(self, to: impl Into<RawLocation>) {
        self.call(GuardOutcome::redirect(to));
    }

    pub fn redirect_replace(self, to: impl Into<RawLocation>) {
        self.call(GuardOutcome::redirect_replace(to));
    }
}

pub struct CallbackGuard<F>(F);

impl<F> NavigationGuard for CallbackGuard<F>
where
    F: Fn(&Route, &Route, Next) + Send + Sync,
{
    fn check(&self, to: &Route, from: &Route) -> BoxFuture<'static, GuardOutcome> {
        let (tx, rx) = oneshot::channel();
        (self.0)(to, from, Next { tx });
        async move {
            rx.await
                .unwrap_or(GuardOutcome::Fail(GuardError::Abandoned))
        }
        .boxed()
    }
}

pub fn guard_fn<F, Fut>(f: F) -> Arc<dyn NavigationGuard>
where
    F: Fn(Route, Route) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GuardOutcome> + Send + 'static,
{
    Arc::new(FnGuard(f))
}

pub fn sync_guard<F>(f: F) -> Arc<dyn NavigationGuard>
where
    F: Fn(&Route, &Route) -> GuardOutcome + Send + Sync + 'static,
{
    Arc::new(SyncGuard(f))
}

pub fn callback_guard<F>(f: F) -> Arc<dyn NavigationGuard>
where
    F: Fn(&Route, &Route, Next) + Send + Sync + 'static,
{
    Arc::new(CallbackGuard(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sync_guard() {
        let guard = sync_guard(|to, _from| (to.path != "/admin").into());
        let admin = Route {
            path: "/admin".to_string(),
            ..Route::start()
        };
        assert_eq!(guard.check(&admin, &Route::start()).await, GuardOutcome::Block);
        assert_eq!(
            guard.check(&Route::start(), &Route::start()).await,
            GuardOutcome::Continue
        );
    }

    #[tokio::test]
    async fn test_callback_guard_redirect() {
        let guard = callback_guard(|_to, _from, next| next.redirect("/login"));
        match guard.check(&Route::start(), &Route::start()).await {
            GuardOutcome::Redirect { to, replace } => {
                assert_eq!(to.path.as_deref(), Some("/login"));
                assert!(!replace);
            }
            other => panic!("Expected Redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_callback_guard_redirect_replace() {
        let guard = callback_guard(|_to, _from, next| next.redirect_replace("/login"));
        match guard.check(&Route::start(), &Route::start()).await {
            GuardOutcome::Redirect { to, replace } => {
                assert_eq!(to.path.as_deref(), Some("/login"));
                assert!(replace);
            }
            other => panic!("Expected Redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_continuation_is_abandoned() {
        let guard = callback_guard(|_to, _from, next| drop(next));
        assert_eq!(
            guard.check(&Route::start(), &Route::start()).await,
            GuardOutcome::Fail(GuardError::Abandoned)
        );
    }

    #[tokio::test]
    async fn test_async_guard() {
        let guard = guard_fn(|to: Route, _from: Route| async move {
            tokio::task::yield_now().await;
            if to.query.contains_key("token") {
                GuardOutcome::Continue
            } else {
                GuardOutcome::Fail(GuardError::rejected("missing token"))
            }
        });
        assert_eq!(
            guard.check(&Route::start(), &Route::start()).await,
            GuardOutcome::Fail(GuardError::rejected("missing token"))
        );
    }
}
