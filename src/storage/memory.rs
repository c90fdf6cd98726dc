use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use super::KeyValueStore;
use crate::error::PersistenceError;

#[derive(Default)]
struct SharedInner {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
    contexts: Vec<(Uuid, Sender<String>)>,
}

impl SharedInner {
    fn used_bytes_with(&self, key: &str, value: &str) -> usize {
        let others: usize = self
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        others + key.len() + value.len()
    }

    /// Queue a change notice for every context except the writer.
    fn broadcast(&mut self, origin: Option<Uuid>, key: &str) {
        self.contexts.retain(|(id, sender)| {
            if Some(*id) == origin {
                return true;
            }
            sender.send(key.to_string()).is_ok()
        });
    }
}

/// An in-process key-value store shared by any number of contexts,
/// standing in for an origin's local storage seen from several tabs.
#[derive(Clone, Default)]
pub struct SharedStorage {
    inner: Arc<Mutex<SharedInner>>,
}

impl SharedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared storage that rejects writes once keys and values exceed
    /// `bytes` in total.
    pub fn with_quota(bytes: usize) -> Self {
        let storage = Self::default();
        if let Ok(mut inner) = storage.inner.lock() {
            inner.quota = Some(bytes);
        }
        storage
    }

    /// Open a new context (tab) on this storage.
    pub fn open_context(&self) -> MemoryContext {
        let (sender, receiver) = mpsc::channel();
        let id = Uuid::new_v4();
        if let Ok(mut inner) = self.inner.lock() {
            inner.contexts.push((id, sender));
        }
        MemoryContext {
            id,
            shared: self.clone(),
            receiver,
        }
    }

    /// Read a value without going through a context.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.entries.get(key).cloned())
    }

    /// Write a value as an outside party, notifying every context.
    pub fn set_raw(&self, key: &str, value: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.insert(key.to_string(), value.to_string());
            inner.broadcast(None, key);
        }
    }

    /// Number of contexts still attached.
    pub fn context_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.contexts.len()).unwrap_or(0)
    }

    fn lock(&self, key: &str) -> Result<MutexGuard<'_, SharedInner>, PersistenceError> {
        self.inner
            .lock()
            .map_err(|_| PersistenceError::backend(key, "storage lock poisoned"))
    }
}

/// One context's view of a [`SharedStorage`].
pub struct MemoryContext {
    id: Uuid,
    shared: SharedStorage,
    receiver: Receiver<String>,
}

impl MemoryContext {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn shared(&self) -> &SharedStorage {
        &self.shared
    }
}

impl KeyValueStore for MemoryContext {
    fn get(&mut self, key: &str) -> Result<Option<String>, PersistenceError> {
        let inner = self.shared.lock(key)?;
        Ok(inner.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut inner = self.shared.lock(key)?;
        if inner.entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        if let Some(limit) = inner.quota {
            let needed = inner.used_bytes_with(key, value);
            if needed > limit {
                return Err(PersistenceError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        inner.entries.insert(key.to_string(), value.to_string());
        inner.broadcast(Some(self.id), key);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        let mut inner = self.shared.lock(key)?;
        if inner.entries.remove(key).is_some() {
            inner.broadcast(Some(self.id), key);
        }
        Ok(())
    }

    fn poll_external_changes(&mut self) -> Result<Vec<String>, PersistenceError> {
        Ok(self.receiver.try_iter().collect())
    }
}

impl Drop for MemoryContext {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.shared.inner.lock() {
            let id = self.id;
            inner.contexts.retain(|(cid, _)| *cid != id);
        }
    }
}
