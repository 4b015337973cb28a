//! Guard registration
//!
//! Guards are kept per stage in registration order. Each transition works on
//! a snapshot taken when it becomes pending, so registering or removing a
//! guard mid-transition only affects later transitions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use waypoint_routes::{NavigationGuard, Route};

use crate::error::TransitionError;
use crate::state::GuardStage;
use crate::Result;

/// Runs after a commit with `(to, from)`; cannot affect the navigation
pub type AfterHook = Arc<dyn Fn(&Route, &Route) + Send + Sync>;

/// Handle for removing a registered guard or hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuardId {
    stage: GuardStage,
    seq: u64,
}

impl GuardId {
    pub fn stage(&self) -> GuardStage {
        self.stage
    }
}

pub struct GuardRegistry {
    limit: usize,
    next_seq: AtomicU64,
    before: RwLock<Vec<(GuardId, Arc<dyn NavigationGuard>)>>,
    resolve: RwLock<Vec<(GuardId, Arc<dyn NavigationGuard>)>>,
    after: RwLock<Vec<(GuardId, AfterHook)>>,
}

/// Guards in effect for one transition
#[derive(Clone, Default)]
pub struct GuardSnapshot {
    pub before: Vec<Arc<dyn NavigationGuard>>,
    pub resolve: Vec<Arc<dyn NavigationGuard>>,
    pub after: Vec<AfterHook>,
}

impl GuardRegistry {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            next_seq: AtomicU64::new(1),
            before: RwLock::new(Vec::new()),
            resolve: RwLock::new(Vec::new()),
            after: RwLock::new(Vec::new()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn next_id(&self, stage: GuardStage) -> GuardId {
        GuardId {
            stage,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn push_bounded<T>(
        &self,
        stage: GuardStage,
        list: &RwLock<Vec<(GuardId, T)>>,
        item: T,
    ) -> Result<GuardId> {
        let mut list = list.write();
        if list.len() >= self.limit {
            tracing::warn!(stage = %stage, limit = self.limit, "Guard registration limit reached");
            return Err(TransitionError::GuardLimit {
                stage,
                limit: self.limit,
            });
        }

        let id = self.next_id(stage);
        list.push((id, item));
        tracing::debug!(stage = %stage, count = list.len(), "Registered navigation guard");
        Ok(id)
    }

    pub fn add_before(&self, guard: Arc<dyn NavigationGuard>) -> Result<GuardId> {
        self.push_bounded(GuardStage::Before, &self.before, guard)
    }

    pub fn add_resolve(&self, guard: Arc<dyn NavigationGuard>) -> Result<GuardId> {
        self.push_bounded(GuardStage::Resolve, &self.resolve, guard)
    }

    pub fn add_after(&self, hook: AfterHook) -> Result<GuardId> {
        self.push_bounded(GuardStage::After, &self.after, hook)
    }

    /// Returns false if the guard was already removed
    pub fn remove(&self, id: GuardId) -> bool {
        fn remove_from<T>(list: &RwLock<Vec<(GuardId, T)>>, id: GuardId) -> bool {
            let mut list = list.write();
            let before = list.len();
            list.retain(|(existing, _)| *existing != id);
            list.len() != before
        }

        match id.stage {
            GuardStage::Before => remove_from(&self.before, id),
            GuardStage::Resolve => remove_from(&self.resolve, id),
            GuardStage::After => remove_from(&self.after, id),
        }
    }

    pub fn count(&self, stage: GuardStage) -> usize {
        match stage {
            GuardStage::Before => self.before.read().len(),
            GuardStage::Resolve => self.resolve.read().len(),
            GuardStage::After => self.after.read().len(),
        }
    }

    pub fn snapshot(&self) -> GuardSnapshot {
        GuardSnapshot {
            before: self.before.read().iter().map(|(_, g)| Arc::clone(g)).collect(),
            resolve: self.resolve.read().iter().map(|(_, g)| Arc::clone(g)).collect(),
            after: self.after.read().iter().map(|(_, h)| Arc::clone(h)).collect(),
        }
    }
}
