//! Backend store boundary
//!
//! The engine never talks to a store directly; callers move batches through
//! a [`KvStore`]. [`MemoryStore`] is the in-process implementation.

use std::collections::BTreeMap;

use kvmig_flat::{FlatEntry, FlatKey};
use parking_lot::RwLock;

use crate::error::StoreError;

/// Flat key/value store collaborator
pub trait KvStore: Send + Sync {
    /// All entries whose key has `prefix` as a segment-aligned prefix, in key order
    ///
    /// # Errors
    /// Returns error on backend failure
    fn list(&self, prefix: &FlatKey) -> Result<Vec<FlatEntry>, StoreError>;

    /// Create or overwrite every entry
    ///
    /// # Errors
    /// Returns error on backend failure
    fn put(&self, entries: &[FlatEntry]) -> Result<(), StoreError>;
}

/// In-memory [`KvStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<FlatKey, String>>,
    read_only: bool,
}

impl MemoryStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = FlatEntry>) -> Self {
        let map = entries.into_iter().map(|e| (e.key, e.value)).collect();
        Self {
            entries: RwLock::new(map),
            read_only: false,
        }
    }

    /// Reject all further writes
    #[inline]
    #[must_use]
    pub fn into_read_only(self) -> Self {
        Self {
            read_only: true,
            ..self
        }
    }

    /// Get one value
    #[must_use]
    pub fn get(&self, key: &FlatKey) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn list(&self, prefix: &FlatKey) -> Result<Vec<FlatEntry>, StoreError> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| prefix.is_prefix_of(key))
            .map(|(key, value)| FlatEntry::new(key.clone(), value.clone()))
            .collect())
    }

    fn put(&self, entries: &[FlatEntry]) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let mut map = self.entries.write();
        for entry in entries {
            map.insert(entry.key.clone(), entry.value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> FlatKey {
        s.parse().unwrap()
    }

    #[test]
    fn list_by_prefix() {
        let store = MemoryStore::from_entries([
            FlatEntry::new(key("/calico/v1/config/A"), "1"),
            FlatEntry::new(key("/calico/v1/config/B"), "2"),
            FlatEntry::new(key("/calico/v1/configs/C"), "3"),
            FlatEntry::new(key("/calico/v1/host/n1/config/A"), "4"),
            FlatEntry::new(key("/other/x"), "5"),
        ]);

        let config = store.list(&key("/calico/v1/config")).unwrap();
        let keys: Vec<_> = config.iter().map(|e| e.key.to_string()).collect();
        assert_eq!(keys, vec!["/calico/v1/config/A", "/calico/v1/config/B"]);

        assert_eq!(store.list(&key("/calico/v1")).unwrap().len(), 4);
        assert_eq!(store.list(&FlatKey::root()).unwrap().len(), 5);
        assert!(store.list(&key("/nothing")).unwrap().is_empty());
    }

    #[test]
    fn put_overwrites() {
        let store = MemoryStore::new();
        store.put(&[FlatEntry::new(key("/a/b"), "1")]).unwrap();
        store.put(&[FlatEntry::new(key("/a/b"), "2")]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key("/a/b")).as_deref(), Some("2"));
    }

    #[test]
    fn read_only_rejects_put() {
        let store = MemoryStore::new().into_read_only();
        assert!(matches!(
            store.put(&[FlatEntry::new(key("/a"), "1")]),
            Err(StoreError::ReadOnly)
        ));
        assert!(store.is_empty());
    }
}
