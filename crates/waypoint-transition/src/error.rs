//! Transition error types

use serde::{Deserialize, Serialize};
use thiserror::Error;
use waypoint_routes::GuardError;

use crate::state::{GuardStage, TransitionState};

/// How a single navigation request failed to commit.
///
/// Returned to the caller that requested the navigation. Only guard failures
/// are also broadcast to error subscribers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavigationFailure {
    #[error("Navigating to current location (\"{path}\") is not allowed")]
    Duplicated { path: String },

    #[error("Navigation aborted from \"{from}\" to \"{to}\" via a navigation guard.")]
    Aborted {
        from: String,
        to: String,
        cause: Option<GuardError>,
    },

    #[error("Navigation cancelled from \"{from}\" to \"{to}\" with a new navigation.")]
    Cancelled { from: String, to: String },

    #[error("Router destroyed")]
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationFailureType {
    Aborted,
    Cancelled,
    Duplicated,
    Destroyed,
}

impl NavigationFailure {
    pub fn kind(&self) -> NavigationFailureType {
        match self {
            Self::Duplicated { .. } => NavigationFailureType::Duplicated,
            Self::Aborted { .. } => NavigationFailureType::Aborted,
            Self::Cancelled { .. } => NavigationFailureType::Cancelled,
            Self::Destroyed => NavigationFailureType::Destroyed,
        }
    }

    /// Guard error behind an abort, if the guard failed rather than blocked
    pub fn cause(&self) -> Option<&GuardError> {
        match self {
            Self::Aborted { cause, .. } => cause.as_ref(),
            _ => None,
        }
    }

    /// Aborts caused by a failing guard are surfaced to error subscribers
    pub fn is_guard_failure(&self) -> bool {
        self.cause().is_some()
    }

    /// Terminal state a transition ends in when it fails this way
    pub fn terminal_state(&self) -> TransitionState {
        match self {
            Self::Duplicated { .. } => TransitionState::Duplicate,
            Self::Aborted { .. } | Self::Destroyed => TransitionState::Aborted,
            Self::Cancelled { .. } => TransitionState::Cancelled,
        }
    }
}

/// True if `failure` is one of `kinds`; any kind when `kinds` is empty
pub fn is_navigation_failure(failure: &NavigationFailure, kinds: &[NavigationFailureType]) -> bool {
    kinds.is_empty() || kinds.contains(&failure.kind())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Too many {stage} guards registered (limit {limit})")]
    GuardLimit { stage: GuardStage, limit: usize },

    #[error("Invalid transition state change: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages() {
        let duplicated = NavigationFailure::Duplicated {
            path: "/a".to_string(),
        };
        assert_eq!(
            duplicated.to_string(),
            "Navigating to current location (\"/a\") is not allowed"
        );

        let cancelled = NavigationFailure::Cancelled {
            from: "/a".to_string(),
            to: "/b".to_string(),
        };
        assert_eq!(
            cancelled.to_string(),
            "Navigation cancelled from \"/a\" to \"/b\" with a new navigation."
        );
    }

    #[test]
    fn test_is_navigation_failure() {
        let blocked = NavigationFailure::Aborted {
            from: "/".to_string(),
            to: "/admin".to_string(),
            cause: None,
        };
        assert!(is_navigation_failure(&blocked, &[]));
        assert!(is_navigation_failure(&blocked, &[NavigationFailureType::Aborted]));
        assert!(!is_navigation_failure(&blocked, &[NavigationFailureType::Duplicated]));
        assert!(!blocked.is_guard_failure());
    }

    #[test]
    fn test_guard_failure_has_cause() {
        let failed = NavigationFailure::Aborted {
            from: "/".to_string(),
            to: "/admin".to_string(),
            cause: Some(GuardError::rejected("no session")),
        };
        assert!(failed.is_guard_failure());
        assert_eq!(failed.terminal_state(), TransitionState::Aborted);
    }
}
