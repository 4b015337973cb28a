//! One queued navigation request

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use waypoint_routes::Route;

use crate::error::{NavigationFailure, TransitionError};
use crate::state::{NavigationType, TransitionState};

pub type NavigationResult = std::result::Result<Route, NavigationFailure>;

pub(crate) struct Transition {
    pub id: u64,
    pub target: Route,
    pub kind: NavigationType,
    pub state: TransitionState,
    pub enqueued_at: DateTime<Utc>,
    /// Hops taken so far in a redirect chain
    pub redirects: usize,
    reply: oneshot::Sender<NavigationResult>,
}

impl Transition {
    pub fn new(
        id: u64,
        target: Route,
        kind: NavigationType,
        reply: oneshot::Sender<NavigationResult>,
    ) -> Self {
        Self {
            id,
            target,
            kind,
            state: TransitionState::Queued,
            enqueued_at: Utc::now(),
            redirects: 0,
            reply,
        }
    }

    /// Next hop of a redirect chain. Keeps the id and the caller's reply channel.
    pub fn redirected(self, target: Route, kind: NavigationType) -> Self {
        Self {
            id: self.id,
            target,
            kind,
            state: TransitionState::Queued,
            enqueued_at: Utc::now(),
            redirects: self.redirects + 1,
            reply: self.reply,
        }
    }

    pub fn queued_ms(&self) -> i64 {
        (Utc::now() - self.enqueued_at).num_milliseconds()
    }

    pub fn transition_to(&mut self, next: TransitionState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }

        tracing::debug!(
            transition_id = self.id,
            from = %self.state,
            to = %next,
            path = %self.target.full_path,
            "Transition state change"
        );

        self.state = next;
        Ok(())
    }

    /// Settle with `result`. A caller that stopped waiting is not an error.
    pub fn reply(self, result: NavigationResult) {
        let _ = self.reply.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_changes_are_checked() {
        let (tx, _rx) = oneshot::channel();
        let mut transition = Transition::new(1, Route::start(), NavigationType::Push, tx);
        assert!(transition.transition_to(TransitionState::Committed).is_err());
        transition.transition_to(TransitionState::Pending).unwrap();
        transition.transition_to(TransitionState::Committed).unwrap();
        assert!(transition.transition_to(TransitionState::Aborted).is_err());
    }

    #[tokio::test]
    async fn test_redirect_keeps_reply_channel() {
        let (tx, rx) = oneshot::channel();
        let first = Transition::new(1, Route::start(), NavigationType::Push, tx);
        let target = Route {
            path: "/b".to_string(),
            full_path: "/b".to_string(),
            ..Route::start()
        };
        let second = first.redirected(target.clone(), NavigationType::Replace);
        assert_eq!(second.redirects, 1);
        assert_eq!(second.id, 1);

        second.reply(Ok(target));
        assert_eq!(rx.await.unwrap().unwrap().path, "/b");
    }
}
