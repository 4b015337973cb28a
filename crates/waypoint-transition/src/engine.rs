//! Transition Engine
//!
//! A single worker task owns the drain loop. Requests arrive over an
//! unbounded channel and run one at a time; a redirect is re-queued at the
//! front so it runs before anything submitted later.
//!
//! Each request gets a sequence id when it is accepted. The newest accepted
//! id is the pending marker: a transition whose id is no longer the marker at
//! a guard boundary has been superseded and settles as cancelled.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use waypoint_history::LocationSource;
use waypoint_routes::{GuardError, GuardOutcome, NavigationGuard, RawLocation, Route, RouteMatcher};

use crate::error::NavigationFailure;
use crate::lifecycle::{guarded, panic_message, Lifecycle};
use crate::registry::{GuardRegistry, GuardSnapshot};
use crate::state::{NavigationType, TransitionState};
use crate::transition::{NavigationResult, Transition};

pub const DEFAULT_GUARD_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_MAX_GUARDS: usize = 100;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `None` lets a guard that never settles stall its transition
    pub guard_timeout: Option<Duration>,
    pub max_redirects: usize,
    /// Per-stage registration bound
    pub max_guards: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            guard_timeout: Some(DEFAULT_GUARD_TIMEOUT),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_guards: DEFAULT_MAX_GUARDS,
        }
    }
}

enum Command {
    Navigate(Transition),
    Shutdown,
}

struct Shared {
    current: RwLock<Route>,
    /// Duplicate detection starts with the first commit
    committed: AtomicBool,
    /// Id of the newest accepted request
    latest: AtomicU64,
    /// Serializes id assignment with channel order
    sequence: Mutex<u64>,
    closed: AtomicBool,
    guards: GuardRegistry,
    lifecycle: Lifecycle,
}

impl Shared {
    fn current(&self) -> Route {
        self.current.read().clone()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Handle to the transition worker. Clones share the same worker.
#[derive(Clone)]
pub struct TransitionEngine {
    shared: Arc<Shared>,
    tx: mpsc::UnboundedSender<Command>,
}

impl TransitionEngine {
    /// Start the worker on the current tokio runtime.
    ///
    /// Panics if called outside a runtime; use `Handle::try_current` first
    /// when that is possible.
    pub fn spawn(
        matcher: RouteMatcher,
        source: Arc<dyn LocationSource>,
        config: EngineConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            current: RwLock::new(Route::start()),
            committed: AtomicBool::new(false),
            latest: AtomicU64::new(0),
            sequence: Mutex::new(0),
            closed: AtomicBool::new(false),
            guards: GuardRegistry::new(config.max_guards),
            lifecycle: Lifecycle::new(),
        });

        tracing::debug!(
            guard_timeout = ?config.guard_timeout,
            max_redirects = config.max_redirects,
            "Starting transition worker"
        );

        let worker = Worker {
            shared: Arc::clone(&shared),
            matcher,
            source,
            config,
            rx,
        };
        tokio::spawn(worker.run());

        Self { shared, tx }
    }

    /// Queue a navigation to an already resolved route.
    ///
    /// The receiver settles once the request (or the redirect chain it starts)
    /// reaches a terminal state.
    pub fn submit(&self, target: Route, kind: NavigationType) -> oneshot::Receiver<NavigationResult> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.shared.is_closed() {
            let _ = reply_tx.send(Err(NavigationFailure::Destroyed));
            return reply_rx;
        }

        let mut sequence = self.shared.sequence.lock();
        *sequence += 1;
        let id = *sequence;

        // A request for the current location settles as duplicate when drained,
        // so it must not supersede the transition in flight
        let looks_duplicate = self.shared.committed.load(Ordering::SeqCst)
            && is_duplicate(&target, &self.shared.current.read());
        if !looks_duplicate {
            self.shared.latest.fetch_max(id, Ordering::SeqCst);
        }

        tracing::debug!(
            transition_id = id,
            path = %target.full_path,
            kind = %kind,
            state = %TransitionState::Queued,
            "Navigation queued"
        );

        let transition = Transition::new(id, target, kind, reply_tx);
        if let Err(mpsc::error::SendError(Command::Navigate(transition))) =
            self.tx.send(Command::Navigate(transition))
        {
            transition.reply(Err(NavigationFailure::Destroyed));
        }

        reply_rx
    }

    /// Submit and wait for the outcome
    pub async fn navigate(&self, target: Route, kind: NavigationType) -> NavigationResult {
        self.submit(target, kind)
            .await
            .unwrap_or(Err(NavigationFailure::Destroyed))
    }

    pub fn current(&self) -> Route {
        self.shared.current()
    }

    pub fn guards(&self) -> &GuardRegistry {
        &self.shared.guards
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.shared.lifecycle
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Stop the worker. Queued and in-flight transitions settle as destroyed.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(Command::Shutdown);
        tracing::info!("Transition engine closed");
    }
}

enum Step {
    Proceed,
    Redirect { to: RawLocation, replace: bool },
    Fail(NavigationFailure),
}

struct Worker {
    shared: Arc<Shared>,
    matcher: RouteMatcher,
    source: Arc<dyn LocationSource>,
    config: EngineConfig,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl Worker {
    async fn run(mut self) {
        let mut queue: VecDeque<Transition> = VecDeque::new();

        loop {
            if queue.is_empty() {
                match self.rx.recv().await {
                    Some(command) => accept(command, &mut queue),
                    None => break,
                }
            }
            while let Ok(command) = self.rx.try_recv() {
                accept(command, &mut queue);
            }

            if self.shared.is_closed() {
                break;
            }

            let Some(transition) = queue.pop_front() else {
                continue;
            };
            if let Some(next) = self.process(transition).await {
                queue.push_front(next);
            }
        }

        self.rx.close();
        while let Ok(command) = self.rx.try_recv() {
            accept(command, &mut queue);
        }
        for transition in queue.drain(..) {
            self.settle_failure(transition, NavigationFailure::Destroyed);
        }

        tracing::debug!("Transition worker stopped");
    }

    async fn process(&self, mut transition: Transition) -> Option<Transition> {
        advance(&mut transition, TransitionState::Pending);
        tracing::debug!(
            transition_id = transition.id,
            path = %transition.target.full_path,
            queued_ms = transition.queued_ms(),
            redirects = transition.redirects,
            "Navigation pending"
        );

        let from = self.shared.current();

        if self.shared.is_closed() {
            self.settle_failure(transition, NavigationFailure::Destroyed);
            return None;
        }

        if self.shared.committed.load(Ordering::SeqCst) && is_duplicate(&transition.target, &from) {
            let failure = NavigationFailure::Duplicated {
                path: transition.target.full_path.clone(),
            };
            self.settle_failure(transition, failure);
            return None;
        }

        // Claim the pending marker; a newer accepted request wins
        let previous = self.shared.latest.fetch_max(transition.id, Ordering::SeqCst);
        if previous > transition.id {
            let failure = cancelled(&transition, &from);
            self.settle_failure(transition, failure);
            return None;
        }

        let record_redirect = transition
            .target
            .leaf()
            .and_then(|record| record.redirect())
            .map(RawLocation::from);
        if let Some(to) = record_redirect {
            let replace = transition.kind == NavigationType::Replace;
            return self.follow_redirect(transition, &from, to, replace);
        }

        let guards = self.shared.guards.snapshot();
        match self.run_pipeline(&transition, &from, &guards).await {
            Step::Proceed => {
                self.commit(transition, from, &guards);
                None
            }
            Step::Redirect { to, replace } => self.follow_redirect(transition, &from, to, replace),
            Step::Fail(failure) => {
                self.settle_failure(transition, failure);
                None
            }
        }
    }

    /// Boundary check run before every guard and before commit
    fn checkpoint(&self, transition: &Transition, from: &Route) -> Result<(), NavigationFailure> {
        if self.shared.is_closed() {
            return Err(NavigationFailure::Destroyed);
        }
        if self.shared.latest.load(Ordering::SeqCst) != transition.id {
            return Err(cancelled(transition, from));
        }
        Ok(())
    }

    async fn run_pipeline(
        &self,
        transition: &Transition,
        from: &Route,
        guards: &GuardSnapshot,
    ) -> Step {
        let before_enter = transition
            .target
            .leaf()
            .and_then(|record| record.before_enter())
            .cloned();
        let chain = guards
            .before
            .iter()
            .cloned()
            .chain(before_enter)
            .chain(guards.resolve.iter().cloned());

        for guard in chain {
            if let Err(failure) = self.checkpoint(transition, from) {
                return Step::Fail(failure);
            }

            match self.run_guard(guard.as_ref(), &transition.target, from).await {
                GuardOutcome::Continue => {}
                GuardOutcome::Block => return Step::Fail(aborted(transition, from, None)),
                GuardOutcome::Fail(error) => {
                    return Step::Fail(aborted(transition, from, Some(error)))
                }
                GuardOutcome::Redirect { to, replace } => return Step::Redirect { to, replace },
            }
        }

        match self.checkpoint(transition, from) {
            Ok(()) => Step::Proceed,
            Err(failure) => Step::Fail(failure),
        }
    }

    async fn run_guard(&self, guard: &dyn NavigationGuard, to: &Route, from: &Route) -> GuardOutcome {
        let check = match panic::catch_unwind(AssertUnwindSafe(|| guard.check(to, from))) {
            Ok(check) => check,
            Err(payload) => {
                return GuardOutcome::Fail(GuardError::Panicked(panic_message(payload.as_ref())))
            }
        };

        let settled = AssertUnwindSafe(check).catch_unwind();
        let result = match self.config.guard_timeout {
            Some(limit) => match timeout(limit, settled).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(target_path = %to.full_path, timeout = ?limit, "Navigation guard timed out");
                    return GuardOutcome::Fail(GuardError::TimedOut(limit));
                }
            },
            None => settled.await,
        };

        result.unwrap_or_else(|payload| {
            GuardOutcome::Fail(GuardError::Panicked(panic_message(payload.as_ref())))
        })
    }

    fn follow_redirect(
        &self,
        transition: Transition,
        from: &Route,
        to: RawLocation,
        replace: bool,
    ) -> Option<Transition> {
        if let Err(failure) = self.checkpoint(&transition, from) {
            self.settle_failure(transition, failure);
            return None;
        }

        if transition.redirects >= self.config.max_redirects {
            let failure = aborted(
                &transition,
                from,
                Some(GuardError::RedirectLimit(self.config.max_redirects)),
            );
            self.settle_failure(transition, failure);
            return None;
        }

        let origin = transition
            .target
            .redirected_from
            .clone()
            .unwrap_or_else(|| transition.target.to_location());
        let target = self.matcher.resolve(to, Some(from)).with_redirected_from(origin);

        let kind = if replace || transition.kind == NavigationType::Pop {
            NavigationType::Replace
        } else {
            transition.kind
        };

        tracing::info!(
            transition_id = transition.id,
            from = %transition.target.full_path,
            to = %target.full_path,
            hop = transition.redirects + 1,
            "Navigation redirected"
        );

        Some(transition.redirected(target, kind))
    }

    fn commit(&self, mut transition: Transition, from: Route, guards: &GuardSnapshot) {
        let route = transition.target.clone();
        *self.shared.current.write() = route.clone();
        self.shared.committed.store(true, Ordering::SeqCst);
        advance(&mut transition, TransitionState::Committed);

        self.shared.lifecycle.notify_listener(&route);

        match transition.kind {
            NavigationType::Push => self.source.push_location(&route.full_path),
            NavigationType::Replace => self.source.replace_location(&route.full_path),
            NavigationType::Pop => {}
        }

        for hook in &guards.after {
            guarded("after hook", || hook(&route, &from));
        }

        tracing::info!(
            transition_id = transition.id,
            from = %from.full_path,
            to = %route.full_path,
            kind = %transition.kind,
            "Navigation committed"
        );

        self.shared.lifecycle.mark_ready(&route);
        transition.reply(Ok(route));
    }

    fn settle_failure(&self, mut transition: Transition, failure: NavigationFailure) {
        advance(&mut transition, failure.terminal_state());

        match &failure {
            NavigationFailure::Duplicated { .. } | NavigationFailure::Destroyed => {
                tracing::debug!(transition_id = transition.id, reason = %failure, "Navigation dropped");
            }
            _ => {
                tracing::info!(transition_id = transition.id, reason = %failure, "Navigation failed");
            }
        }

        if failure.is_guard_failure() {
            self.shared.lifecycle.broadcast_error(&failure);
        }
        if matches!(
            failure,
            NavigationFailure::Aborted { .. } | NavigationFailure::Cancelled { .. }
        ) {
            self.shared.lifecycle.mark_ready_failed(&failure);
        }

        transition.reply(Err(failure));
    }
}

fn accept(command: Command, queue: &mut VecDeque<Transition>) {
    match command {
        Command::Navigate(transition) => queue.push_back(transition),
        // Wakes the worker; the closed flag is already set
        Command::Shutdown => {}
    }
}

/// Same location resolved to the same leaf record. A location whose match
/// changed after a table update is a real navigation.
fn is_duplicate(target: &Route, current: &Route) -> bool {
    target.is_same_location(current)
        && target.leaf().map(|record| record.id()) == current.leaf().map(|record| record.id())
}

fn advance(transition: &mut Transition, next: TransitionState) {
    if let Err(error) = transition.transition_to(next) {
        tracing::warn!(transition_id = transition.id, error = %error, "Unexpected transition state change");
    }
}

fn aborted(transition: &Transition, from: &Route, cause: Option<GuardError>) -> NavigationFailure {
    NavigationFailure::Aborted {
        from: from.full_path.clone(),
        to: transition.target.full_path.clone(),
        cause,
    }
}

fn cancelled(transition: &Transition, from: &Route) -> NavigationFailure {
    NavigationFailure::Cancelled {
        from: from.full_path.clone(),
        to: transition.target.full_path.clone(),
    }
}
