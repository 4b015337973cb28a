//! In-memory history stack

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::source::{normalize_base, ChangeCallback, LocationSource, SubscriptionId};

/// `go(n)` requests beyond this distance are ignored
pub const MAX_GO_DISTANCE: i32 = 100;
pub const MAX_LISTENERS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Stored with the base prefix applied
    pub url: String,
    pub visited_at: DateTime<Utc>,
}

impl HistoryEntry {
    fn new(url: String) -> Self {
        Self {
            url,
            visited_at: Utc::now(),
        }
    }
}

struct HistoryStack {
    entries: Vec<HistoryEntry>,
    index: usize,
}

pub struct MemoryHistory {
    base: String,
    stack: Arc<RwLock<HistoryStack>>,
    listeners: Arc<RwLock<Vec<(SubscriptionId, ChangeCallback)>>>,
    next_subscription: Arc<AtomicU64>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::with_base("/", "/")
    }

    /// Start at `initial` (relative to the base), e.g. a deep link
    pub fn with_initial(initial: &str) -> Self {
        Self::with_base("/", initial)
    }

    pub fn with_base(base: &str, initial: &str) -> Self {
        let base = normalize_base(base);
        let url = prefix_base(&base, initial);

        Self {
            base,
            stack: Arc::new(RwLock::new(HistoryStack {
                entries: vec![HistoryEntry::new(url)],
                index: 0,
            })),
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_subscription: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.stack.read().entries.clone()
    }

    pub fn index(&self) -> usize {
        self.stack.read().index
    }

    pub fn len(&self) -> usize {
        self.stack.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.read().entries.is_empty()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Current entry with the base prefix, as a browser would show it
    pub fn current_url(&self) -> String {
        let stack = self.stack.read();
        stack
            .entries
            .get(stack.index)
            .map(|entry| entry.url.clone())
            .unwrap_or_else(|| self.base.clone())
    }

    fn strip_base(&self, url: &str) -> String {
        if self.base == "/" {
            return url.to_string();
        }

        let stripped = match url.get(..self.base.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(&self.base) => &url[self.base.len()..],
            _ => url,
        };

        if stripped.is_empty() || !stripped.starts_with('/') {
            format!("/{stripped}")
        } else {
            stripped.to_string()
        }
    }

    fn notify(&self, location: &str) {
        let listeners: Vec<ChangeCallback> = self
            .listeners
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(location))).is_err() {
                tracing::error!(location = %location, "Location change listener panicked");
            }
        }
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationSource for MemoryHistory {
    fn current_location(&self) -> String {
        self.strip_base(&self.current_url())
    }

    fn push_location(&self, full_path: &str) {
        let url = prefix_base(&self.base, full_path);
        let mut stack = self.stack.write();
        let keep = stack.index + 1;
        stack.entries.truncate(keep);
        stack.entries.push(HistoryEntry::new(url));
        stack.index = stack.entries.len() - 1;

        tracing::debug!(location = %full_path, depth = stack.entries.len(), "Pushed history entry");
    }

    fn replace_location(&self, full_path: &str) {
        let url = prefix_base(&self.base, full_path);
        let mut stack = self.stack.write();
        let index = stack.index;
        match stack.entries.get_mut(index) {
            Some(entry) => *entry = HistoryEntry::new(url),
            None => {
                stack.entries.push(HistoryEntry::new(url));
                stack.index = stack.entries.len() - 1;
            }
        }

        tracing::debug!(location = %full_path, "Replaced history entry");
    }

    fn go(&self, delta: i32) {
        if delta == 0 || !(-MAX_GO_DISTANCE..=MAX_GO_DISTANCE).contains(&delta) {
            tracing::warn!(delta, "Ignoring history traversal");
            return;
        }

        let moved = {
            let mut stack = self.stack.write();
            let last = stack.entries.len().saturating_sub(1) as i64;
            let target = (stack.index as i64 + i64::from(delta)).clamp(0, last) as usize;
            if target == stack.index {
                false
            } else {
                stack.index = target;
                true
            }
        };

        if moved {
            let location = self.current_location();
            tracing::debug!(delta, location = %location, "History traversal");
            self.notify(&location);
        }
    }

    fn on_change(&self, callback: ChangeCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.write();
        if listeners.len() >= MAX_LISTENERS {
            tracing::warn!(limit = MAX_LISTENERS, "Too many location listeners, ignoring new listener");
            return id;
        }
        listeners.push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.write().retain(|(existing, _)| *existing != id);
    }
}

/// Apply the base and collapse repeated slashes
fn prefix_base(base: &str, full_path: &str) -> String {
    let joined = if base == "/" {
        full_path.to_string()
    } else {
        format!("{base}/{full_path}")
    };

    let mut cleaned = String::with_capacity(joined.len() + 1);
    if !joined.starts_with('/') {
        cleaned.push('/');
    }
    for ch in joined.chars() {
        if ch == '/' && cleaned.ends_with('/') {
            continue;
        }
        cleaned.push(ch);
    }
    cleaned
}
