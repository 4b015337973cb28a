//! `waypoint resolve`

use std::sync::Arc;

use waypoint_core::{MemoryHistory, Router, RouterOptions};

use super::emit;

pub async fn run(options: RouterOptions, locations: Vec<String>, from: String) -> anyhow::Result<()> {
    let router = Router::new(options, Arc::new(MemoryHistory::new()))?;
    let current = router.resolve(from.as_str(), None).route;

    for location in &locations {
        let resolved = router.resolve(location.as_str(), Some(&current));
        if !resolved.route.is_matched() {
            tracing::warn!(location = %location, "No route matched");
        }
        emit(&resolved)?;
    }

    router.destroy();
    Ok(())
}
