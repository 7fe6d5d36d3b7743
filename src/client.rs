use std::sync::Arc;

use tracing::{debug, info};

use crate::store::{IndexSlot, SecondaryKeys, Store};

/// Client facade over a shared [`Store`]
///
/// Every operation is forwarded unchanged; the facade only adds lifecycle
/// logging. Clients are cheap to clone and all clones see the same store.
#[derive(Clone)]
pub struct Client {
    store: Arc<Store>,
}

impl Client {
    /// Create a client backed by a fresh store
    pub fn new() -> Self {
        Self::with_store(Arc::new(Store::new()))
    }

    /// Create a client over an existing store
    pub fn with_store(store: Arc<Store>) -> Self {
        info!(shards = store.shard_count(), "Client created");
        Self { store }
    }

    /// The store this client forwards to
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn ping(&self) -> &'static str {
        self.store.ping()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.store.set(key, value)
    }

    /// Returns an empty string when the key is absent
    pub fn get(&self, key: &str) -> String {
        self.store.get(key)
    }

    pub fn lookup(&self, key: &str) -> Option<String> {
        self.store.lookup(key)
    }

    pub fn set_indexed(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        secondary: SecondaryKeys,
    ) {
        self.store.set_indexed(key, value, secondary)
    }

    pub fn get_by_index(&self, slot: IndexSlot, idx: &str) -> Option<String> {
        self.store.get_by_index(slot, idx)
    }

    pub fn del(&self, key: &str) {
        self.store.del(key)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        debug!(
            holders = Arc::strong_count(&self.store) - 1,
            "Client dropped"
        );
    }
}
