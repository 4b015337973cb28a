//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Route error: {0}")]
    Route(#[from] waypoint_routes::RouteError),

    #[error("Transition error: {0}")]
    Transition(#[from] waypoint_transition::TransitionError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] waypoint_transition::NavigationFailure),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Router must be created inside a tokio runtime")]
    NoRuntime,

    #[error("Router not initialized")]
    NotInitialized,
}
