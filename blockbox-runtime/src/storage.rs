//! Durable key-value storage for per-instance UI state.

use dashmap::DashMap;

use crate::error::RuntimeResult;

/// Browser `localStorage` or any equivalent the host injects. Access failures
/// (private mode, quota) are reported as [`RuntimeError::Storage`].
///
/// [`RuntimeError::Storage`]: crate::error::RuntimeError::Storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> RuntimeResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> RuntimeResult<()>;
    fn remove(&self, key: &str) -> RuntimeResult<()>;
}

/// In-process store; state lives as long as the runtime.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> RuntimeResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> RuntimeResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> RuntimeResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", "collapsed").unwrap();
        store.set("a", "expanded").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("expanded"));
        assert_eq!(store.len(), 1);
        store.remove("a").unwrap();
        assert!(store.is_empty());
    }
}
