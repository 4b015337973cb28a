//! `waypoint navigate`

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Serialize;
use tokio::sync::mpsc;
use waypoint_core::{
    LocationSource, MemoryHistory, NavigationFailureType, NavigationResult, Route, Router,
    RouterOptions,
};

use super::emit;

/// How long a traversal waits for the resulting commit
const TRAVERSAL_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Push(String),
    Replace(String),
    Go(i32),
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "back" => return Ok(Step::Go(-1)),
            "forward" => return Ok(Step::Go(1)),
            _ => {}
        }

        if let Some(path) = s.strip_prefix("replace:") {
            return Ok(Step::Replace(path.to_string()));
        }
        if let Some(delta) = s.strip_prefix("go:") {
            let delta = delta
                .parse()
                .with_context(|| format!("Invalid history delta in step {s:?}"))?;
            return Ok(Step::Go(delta));
        }
        if s.is_empty() {
            bail!("Empty navigation step");
        }

        Ok(Step::Push(s.to_string()))
    }
}

#[derive(Serialize)]
struct StepReport<'a> {
    step: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    committed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirected_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<NavigationFailureType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    history: String,
}

impl<'a> StepReport<'a> {
    fn new(step: &'a str, result: &NavigationResult, history: &MemoryHistory) -> Self {
        let (committed, redirected_from, failure, reason) = match result {
            Ok(route) => (
                Some(route.full_path.clone()),
                route.redirected_from.as_ref().map(|from| from.path.clone()),
                None,
                None,
            ),
            Err(failure) => (None, None, Some(failure.kind()), Some(failure.to_string())),
        };

        Self {
            step,
            committed,
            redirected_from,
            failure,
            reason,
            history: history.current_url(),
        }
    }
}

pub async fn run(options: RouterOptions, steps: Vec<String>, start: String) -> anyhow::Result<()> {
    let steps: Vec<(String, Step)> = steps
        .into_iter()
        .map(|raw| raw.parse().map(|step| (raw, step)))
        .collect::<anyhow::Result<_>>()?;

    let history = Arc::new(MemoryHistory::with_base(&options.base, &start));
    let router = Router::new(options, history.clone())?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Route>();
    router.listen(move |route: &Route| {
        let _ = tx.send(route.clone());
    });

    let initial = router.init().await;
    emit(&StepReport::new("init", &initial, &history))?;

    for (raw, step) in &steps {
        while rx.try_recv().is_ok() {}

        let result = match step {
            Step::Push(path) => router.navigate(path.as_str()).await,
            Step::Replace(path) => router.replace(path.as_str()).await,
            Step::Go(delta) => {
                let before = history.index();
                router.go(*delta)?;
                if history.index() == before {
                    tracing::info!(delta, "History did not move");
                    Ok(router.current_route())
                } else {
                    match tokio::time::timeout(TRAVERSAL_WAIT, rx.recv()).await {
                        Ok(Some(route)) => Ok(route),
                        _ => {
                            tracing::warn!(delta, location = %history.current_location(), "Traversal was not committed");
                            Ok(router.current_route())
                        }
                    }
                }
            }
        };

        emit(&StepReport::new(raw, &result, &history))?;
    }

    router.destroy();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        assert_eq!("/users/1".parse::<Step>().unwrap(), Step::Push("/users/1".to_string()));
        assert_eq!("replace:/a".parse::<Step>().unwrap(), Step::Replace("/a".to_string()));
        assert_eq!("back".parse::<Step>().unwrap(), Step::Go(-1));
        assert_eq!("forward".parse::<Step>().unwrap(), Step::Go(1));
        assert_eq!("go:-3".parse::<Step>().unwrap(), Step::Go(-3));
        assert!("go:x".parse::<Step>().is_err());
        assert!("  ".parse::<Step>().is_err());
    }
}
