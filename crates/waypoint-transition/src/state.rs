//! Transition State Machine
//!
//! ```text
//! Queued
//!   ↓ drained
//! Pending
//!   ↓ guards settle
//! Committed | Aborted | Cancelled | Duplicate
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionState {
    /// Accepted, waiting behind earlier requests
    Queued,
    /// Running the guard pipeline
    Pending,
    Committed,
    /// Blocked or failed by a guard, or dropped on shutdown
    Aborted,
    /// Superseded by a newer request
    Cancelled,
    /// Target equals the current route
    Duplicate,
}

impl TransitionState {
    pub fn can_transition_to(&self, target: TransitionState) -> bool {
        match (self, target) {
            (TransitionState::Queued, TransitionState::Pending) => true,
            // Shutdown and supersession can hit a request before it runs
            (TransitionState::Queued, TransitionState::Aborted) => true,
            (TransitionState::Queued, TransitionState::Cancelled) => true,
            (TransitionState::Pending, next) => next.is_terminal(),
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransitionState::Queued | TransitionState::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionState::Queued => "queued",
            TransitionState::Pending => "pending",
            TransitionState::Committed => "committed",
            TransitionState::Aborted => "aborted",
            TransitionState::Cancelled => "cancelled",
            TransitionState::Duplicate => "duplicate",
        }
    }
}

impl std::fmt::Display for TransitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a committed route is written back to the location source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationType {
    Push,
    Replace,
    /// The location source already moved; nothing is written
    Pop,
}

impl NavigationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationType::Push => "push",
            NavigationType::Replace => "replace",
            NavigationType::Pop => "pop",
        }
    }
}

impl std::fmt::Display for NavigationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardStage {
    Before,
    Resolve,
    After,
}

impl GuardStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardStage::Before => "before",
            GuardStage::Resolve => "resolve",
            GuardStage::After => "after",
        }
    }
}

impl std::fmt::Display for GuardStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
