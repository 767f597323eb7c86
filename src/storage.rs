//! Key/value storage backends for persisted wallet records
//!
//! Records are JSON strings keyed by a type prefix plus the record id.
//! [`MemoryStorage`] backs native builds and tests; [`LocalStorage`] uses the
//! browser's `localStorage` on wasm32.

use crate::error::WasmAlgoError;
use dashmap::DashMap;
use std::sync::Arc;

/// String key/value store
pub trait StorageBackend {
    fn get(&self, key: &str) -> Result<Option<String>, WasmAlgoError>;
    fn set(&self, key: &str, value: &str) -> Result<(), WasmAlgoError>;
    fn remove(&self, key: &str) -> Result<(), WasmAlgoError>;
    /// All keys starting with `prefix`
    fn keys(&self, prefix: &str) -> Result<Vec<String>, WasmAlgoError>;
}

/// In-memory store; clones share the same records
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Arc<DashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, WasmAlgoError> {
        Ok(self.records.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), WasmAlgoError> {
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), WasmAlgoError> {
        self.records.remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, WasmAlgoError> {
        let mut keys: Vec<String> = self
            .records
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::LocalStorage;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::StorageBackend;
    use crate::error::WasmAlgoError;
    use web_sys::Storage;

    /// Browser `localStorage`, namespaced under `algo:`
    #[derive(Debug, Clone)]
    pub struct LocalStorage {
        storage: Option<Storage>,
    }

    const NAMESPACE: &str = "algo:";

    impl LocalStorage {
        pub fn new() -> Self {
            let storage = web_sys::window()
                .and_then(|w| w.local_storage().ok())
                .flatten();
            Self { storage }
        }

        fn storage(&self) -> Result<&Storage, WasmAlgoError> {
            self.storage
                .as_ref()
                .ok_or_else(|| WasmAlgoError::Storage("localStorage not available".to_string()))
        }
    }

    impl Default for LocalStorage {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StorageBackend for LocalStorage {
        fn get(&self, key: &str) -> Result<Option<String>, WasmAlgoError> {
            self.storage()?
                .get_item(&format!("{NAMESPACE}{key}"))
                .map_err(|e| WasmAlgoError::Storage(format!("Failed to read {key}: {e:?}")))
        }

        fn set(&self, key: &str, value: &str) -> Result<(), WasmAlgoError> {
            self.storage()?
                .set_item(&format!("{NAMESPACE}{key}"), value)
                .map_err(|e| WasmAlgoError::Storage(format!("Failed to write {key}: {e:?}")))
        }

        fn remove(&self, key: &str) -> Result<(), WasmAlgoError> {
            self.storage()?
                .remove_item(&format!("{NAMESPACE}{key}"))
                .map_err(|e| WasmAlgoError::Storage(format!("Failed to remove {key}: {e:?}")))
        }

        fn keys(&self, prefix: &str) -> Result<Vec<String>, WasmAlgoError> {
            let storage = self.storage()?;
            let length = storage
                .length()
                .map_err(|e| WasmAlgoError::Storage(format!("Failed to list keys: {e:?}")))?;
            let full_prefix = format!("{NAMESPACE}{prefix}");

            let mut keys = Vec::new();
            for index in 0..length {
                let key = storage
                    .key(index)
                    .map_err(|e| WasmAlgoError::Storage(format!("Failed to list keys: {e:?}")))?;
                if let Some(key) = key.filter(|k| k.starts_with(&full_prefix)) {
                    keys.push(key[NAMESPACE.len()..].to_string());
                }
            }
            keys.sort();
            Ok(keys)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage.set("session_b", "2").unwrap();
        storage.set("session_a", "1").unwrap();
        storage.set("account_x", "3").unwrap();

        assert_eq!(storage.get("session_a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.keys("session_").unwrap(), vec!["session_a", "session_b"]);

        storage.remove("session_a").unwrap();
        assert!(storage.get("session_a").unwrap().is_none());
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_clones_share_records() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.set("k", "v").unwrap();
        assert_eq!(other.get("k").unwrap().as_deref(), Some("v"));
    }
}
