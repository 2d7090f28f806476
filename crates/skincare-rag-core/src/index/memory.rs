//! In-memory [`IndexStore`] for tests and embedded use.
//!
//! Holds at most one index behind a `std::sync::RwLock`. Nothing survives
//! the process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::{Index, IndexError, IndexStore};

pub struct InMemoryIndexStore {
    slot: RwLock<Option<Index>>,
    persist_count: AtomicUsize,
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            persist_count: AtomicUsize::new(0),
        }
    }

    /// A store that already holds `index`, as if it had been persisted earlier.
    pub fn with_index(index: Index) -> Self {
        Self {
            slot: RwLock::new(Some(index)),
            persist_count: AtomicUsize::new(0),
        }
    }

    /// Number of successful `persist` calls.
    pub fn persist_count(&self) -> usize {
        self.persist_count.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn persist(&self, index: &Index) -> Result<(), IndexError> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(index.clone());
        self.persist_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self) -> Result<Index, IndexError> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.clone().ok_or_else(|| IndexError::NotFound {
            location: self.location(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Metric;

    #[tokio::test]
    async fn test_load_before_persist_is_not_found() {
        let store = InMemoryIndexStore::new();
        assert!(matches!(store.load().await, Err(IndexError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_persist_replaces_previous_index() {
        let store = InMemoryIndexStore::new();
        let first = Index::from_entries("m1", 2, Metric::Cosine, vec![]);
        let second = Index::from_entries("m2", 2, Metric::Cosine, vec![]);
        store.persist(&first).await.unwrap();
        store.persist(&second).await.unwrap();
        assert_eq!(store.load().await.unwrap().manifest().embedding_model, "m2");
        assert_eq!(store.persist_count(), 2);
    }
}
