//! At most one copy or screenshot in flight per container.

use dashmap::DashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusyAction {
    Copy,
    Screenshot,
}

#[derive(Debug, Clone, Default)]
pub struct BusySet {
    active: Arc<DashSet<(String, BusyAction)>>,
}

impl BusySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `action` on `instance_id`. Returns `None` while a previous claim
    /// is still held; the claim is released when the guard drops.
    pub fn try_acquire(&self, instance_id: &str, action: BusyAction) -> Option<BusyGuard> {
        let key = (instance_id.to_string(), action);
        if !self.active.insert(key.clone()) {
            tracing::debug!(instance = instance_id, ?action, "action already in progress");
            return None;
        }
        Some(BusyGuard {
            active: Arc::clone(&self.active),
            key,
        })
    }

    pub fn is_busy(&self, instance_id: &str, action: BusyAction) -> bool {
        self.active.contains(&(instance_id.to_string(), action))
    }
}

#[derive(Debug)]
pub struct BusyGuard {
    active: Arc<DashSet<(String, BusyAction)>>,
    key: (String, BusyAction),
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.active.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let busy = BusySet::new();
        let guard = busy.try_acquire("a", BusyAction::Copy).unwrap();
        assert!(busy.try_acquire("a", BusyAction::Copy).is_none());
        // other actions and other containers are independent
        assert!(busy.try_acquire("a", BusyAction::Screenshot).is_some());
        assert!(busy.try_acquire("b", BusyAction::Copy).is_some());
        drop(guard);
        assert!(!busy.is_busy("a", BusyAction::Copy));
        assert!(busy.try_acquire("a", BusyAction::Copy).is_some());
    }
}
