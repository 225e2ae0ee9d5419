use crate::infrastructure::storage::{KeyValueStore, Scope};
use anyhow::{Result, anyhow};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Scopes {
    durable: Map<String, Value>,
    local: Map<String, Value>,
    writes: usize,
}

impl Scopes {
    fn scope_mut(&mut self, scope: Scope) -> &mut Map<String, Value> {
        match scope {
            Scope::Durable => &mut self.durable,
            Scope::Local => &mut self.local,
        }
    }
}

/// In-process store. Clones share the same data, so a handle kept aside can
/// observe what a registry wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Scopes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with a durable scope, e.g. data from an older release.
    pub fn with_durable(durable: Map<String, Value>) -> Self {
        let store = Self::new();
        if let Ok(mut scopes) = store.inner.lock() {
            scopes.durable = durable;
        }
        store
    }

    /// Number of mutating calls received so far.
    pub fn write_count(&self) -> usize {
        self.lock().map(|s| s.writes).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Scopes>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>> {
        let mut scopes = self.lock()?;
        Ok(scopes.scope_mut(scope).get(key).cloned())
    }

    fn set_many(&self, scope: Scope, entries: Map<String, Value>) -> Result<()> {
        let mut scopes = self.lock()?;
        scopes.writes += 1;
        scopes.scope_mut(scope).extend(entries);
        Ok(())
    }

    fn remove(&self, scope: Scope, key: &str) -> Result<()> {
        let mut scopes = self.lock()?;
        scopes.writes += 1;
        scopes.scope_mut(scope).remove(key);
        Ok(())
    }

    fn snapshot(&self, scope: Scope) -> Result<Map<String, Value>> {
        let mut scopes = self.lock()?;
        Ok(scopes.scope_mut(scope).clone())
    }

    fn clear(&self, scope: Scope) -> Result<()> {
        let mut scopes = self.lock()?;
        scopes.writes += 1;
        scopes.scope_mut(scope).clear();
        Ok(())
    }

    fn backend_info(&self) -> &str {
        "In-memory storage"
    }
}
