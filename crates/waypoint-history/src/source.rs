//! Location source contract

use std::sync::Arc;

/// Receives the new location (base stripped) after an external change
pub type ChangeCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

pub trait LocationSource: Send + Sync {
    /// Current location relative to the base, e.g. `/users/42?tab=1#bio`
    fn current_location(&self) -> String;

    fn push_location(&self, full_path: &str);

    fn replace_location(&self, full_path: &str);

    /// Move through the history stack. Resulting changes are reported through
    /// [`LocationSource::on_change`], never applied directly.
    fn go(&self, delta: i32);

    fn on_change(&self, callback: ChangeCallback) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// Leading slash, no trailing slash; empty becomes `/`.
pub fn normalize_base(base: &str) -> String {
    let base = base.trim();
    if base.is_empty() {
        return "/".to_string();
    }

    let with_slash = if base.starts_with('/') {
        base.to_string()
    } else {
        format!("/{base}")
    };

    let trimmed = with_slash.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base() {
        assert_eq!(normalize_base(""), "/");
        assert_eq!(normalize_base("/"), "/");
        assert_eq!(normalize_base("app"), "/app");
        assert_eq!(normalize_base("/app/"), "/app");
    }
}
