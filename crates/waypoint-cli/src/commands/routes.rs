//! `waypoint routes`

use serde_json::json;
use waypoint_core::{RouteMatcher, RouterOptions};

use super::emit;

pub fn run(options: RouterOptions) -> anyhow::Result<()> {
    let matcher = RouteMatcher::new(&options.routes);

    for record in matcher.get_routes() {
        let parent = record
            .parent()
            .and_then(|id| matcher.with_table(|table| table.record(id).map(|p| p.path().to_string())));
        let alias_of = record
            .alias_of()
            .and_then(|id| matcher.with_table(|table| table.record(id).map(|p| p.path().to_string())));

        emit(&json!({
            "path": record.path(),
            "name": record.name(),
            "params": record.param_names(),
            "parent": parent,
            "alias_of": alias_of,
            "redirect": record.redirect(),
            "catch_all": record.pattern().is_catch_all(),
            "meta": record.meta(),
        }))?;
    }

    Ok(())
}
