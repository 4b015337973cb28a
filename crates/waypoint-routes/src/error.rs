//! Route table error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Malformed route pattern \"{pattern}\": {reason}")]
    Malformed { pattern: String, reason: String },

    #[error("Unknown parent route: {0}")]
    UnknownParent(String),
}
