use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "waypoint",
    about = "Waypoint: resolve locations and replay navigations against a route config",
    version
)]
pub struct Cli {
    /// Router configuration (TOML)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `waypoint_transition=trace`; overrides RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve locations without navigating
    Resolve {
        /// Paths such as `/users/42?tab=profile#bio`
        #[arg(required = true)]
        locations: Vec<String>,

        /// Resolve relative locations against this path
        #[arg(long, default_value = "/")]
        from: String,
    },

    /// Replay navigation steps against an in-memory history
    Navigate {
        /// `/path` pushes, `replace:/path` replaces, `back`, `forward` and `go:<n>` traverse
        #[arg(required = true)]
        steps: Vec<String>,

        /// Location the history starts at
        #[arg(long, default_value = "/")]
        start: String,
    },

    /// List compiled route records
    Routes,
}
