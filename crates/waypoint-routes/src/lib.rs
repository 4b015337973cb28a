//! Waypoint Routes
//!
//! Route catalog and resolution for the navigation engine:
//! - Route table: definitions compiled into an indexed record arena
//! - Location normalizer: raw input → canonical [`Location`]
//! - Route resolver: [`Location`] → immutable [`Route`]
//!
//! Also defines the guard contract shared by route definitions and the
//! transition engine.

mod definition;
mod error;
mod guard;
mod location;
mod pattern;
mod query;
mod record;
mod resolver;
mod route;
mod table;

pub use definition::RouteDefinition;
pub use error::RouteError;
pub use guard::{
    callback_guard, guard_fn, sync_guard, CallbackGuard, FnGuard, GuardError, GuardOutcome,
    NavigationGuard, Next, SyncGuard,
};
pub use location::{normalize, parse_path, resolve_relative, Location, Params, ParsedPath, Query, RawLocation};
pub use pattern::{decode_segment, fill_params, PathPattern, Segment, WILDCARD_PARAM};
pub use query::{parse_query, stringify_query, MAX_QUERY_KEY_LEN, MAX_QUERY_VALUE_LEN};
pub use record::{Meta, RecordId, RouteRecord};
pub use resolver::RouteMatcher;
pub use route::Route;
pub use table::{
    RouteMatch, RouteTable, MAX_ALIASES, MAX_CHAIN_DEPTH, MAX_CHILDREN, MAX_NESTING_DEPTH,
};

pub type Result<T> = std::result::Result<T, RouteError>;
