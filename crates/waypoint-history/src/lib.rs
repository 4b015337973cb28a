//! Waypoint History
//!
//! The location source is the router's only window onto the outside world:
//! it reports the current location, accepts push/replace writes and emits a
//! notification whenever the location changes underneath the router
//! (back/forward). Browser-backed sources live outside this workspace;
//! [`MemoryHistory`] is the in-process implementation.

mod memory;
mod source;

pub use memory::{HistoryEntry, MemoryHistory, MAX_GO_DISTANCE, MAX_LISTENERS};
pub use source::{normalize_base, ChangeCallback, LocationSource, SubscriptionId};
