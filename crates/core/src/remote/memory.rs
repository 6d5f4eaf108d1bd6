//! In-process document store
//!
//! Shares documents between every handle cloned from the same store, which
//! makes it a stand-in for a remote service in tests and offline sessions.
//! Subscribers are called synchronously on every write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{Document, RemoteStore, ResourceKey, SnapshotCallback};
use crate::error::{Error, Result};

#[derive(Default)]
struct Inner {
    documents: HashMap<ResourceKey, Document>,
    subscribers: Vec<(ResourceKey, SnapshotCallback)>,
    fail_writes: bool,
    write_count: u64,
}

/// Cloneable in-memory store handle
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every following write fail until reset
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Current value of a document
    pub fn document(&self, key: ResourceKey) -> Option<Document> {
        self.lock().documents.get(&key).cloned()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> u64 {
        self.lock().write_count
    }

    fn callbacks_for(inner: &Inner, key: ResourceKey) -> Vec<SnapshotCallback> {
        inner
            .subscribers
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, cb)| cb.clone())
            .collect()
    }
}

impl RemoteStore for MemoryStore {
    type Error = Error;

    async fn read(&self, key: ResourceKey) -> Result<Option<Document>> {
        Ok(self.document(key))
    }

    async fn write(&self, document: Document) -> Result<()> {
        let key = document.key();
        let callbacks = {
            let mut inner = self.lock();
            if inner.fail_writes {
                return Err(Error::Unavailable(format!("write to {} refused", key)));
            }
            inner.documents.insert(key, document.clone());
            inner.write_count += 1;
            Self::callbacks_for(&inner, key)
        };

        debug!(key = %key, subscribers = callbacks.len(), "Document written");
        for callback in callbacks {
            callback(key, Some(document.clone()));
        }
        Ok(())
    }

    async fn subscribe(&self, key: ResourceKey, callback: SnapshotCallback) -> Result<()> {
        let current = {
            let mut inner = self.lock();
            inner.subscribers.push((key, callback.clone()));
            inner.documents.get(&key).cloned()
        };
        callback(key, current);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::SeatingPlan;
    use crate::models::Side;
    use std::future::Future;

    fn block_on<F: Future>(future: F) -> F::Output {
        // Every MemoryStore future completes on first poll
        let waker = std::task::Waker::noop();
        let mut cx = std::task::Context::from_waker(waker);
        let mut future = std::pin::pin!(future);
        match future.as_mut().poll(&mut cx) {
            std::task::Poll::Ready(output) => output,
            std::task::Poll::Pending => panic!("MemoryStore future was pending"),
        }
    }

    fn recorder() -> (SnapshotCallback, Arc<Mutex<Vec<Option<Document>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: SnapshotCallback = Arc::new(move |_key, doc| sink.lock().unwrap().push(doc));
        (callback, seen)
    }

    #[test]
    fn test_absent_document_reads_none() {
        let store = MemoryStore::new();
        assert!(block_on(store.read_roster(Side::Groom)).unwrap().is_none());
        assert!(block_on(store.read_seating_plan()).unwrap().is_none());
    }

    #[test]
    fn test_subscribe_fires_immediately_then_on_change() {
        let store = MemoryStore::new();
        let (callback, seen) = recorder();
        block_on(store.subscribe(ResourceKey::Roster(Side::Bride), callback)).unwrap();
        block_on(store.write_roster(Side::Bride, vec!["Bea".to_string()])).unwrap();
        // Writes to other documents are not delivered
        block_on(store.write_seating_plan(SeatingPlan::new())).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].is_none());
        assert_eq!(
            seen[1],
            Some(Document::Roster {
                side: Side::Bride,
                names: vec!["Bea".to_string()]
            })
        );
    }

    #[test]
    fn test_last_write_wins() {
        let store = MemoryStore::new();
        let other_client = store.clone();
        block_on(store.write_roster(Side::Groom, vec!["A".to_string()])).unwrap();
        block_on(other_client.write_roster(Side::Groom, vec!["B".to_string()])).unwrap();

        assert_eq!(
            block_on(store.read_roster(Side::Groom)).unwrap(),
            Some(vec!["B".to_string()])
        );
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_failed_write_leaves_document_untouched() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(block_on(store.write_seating_plan(SeatingPlan::new())).is_err());
        assert!(store.document(ResourceKey::SeatingPlan).is_none());
    }
}
