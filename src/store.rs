use std::collections::HashMap;
use std::hash::{BuildHasher, RandomState};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

/// Reply to a liveness probe
pub const PONG: &str = "PONG";

/// Default number of lock shards
pub const DEFAULT_SHARDS: usize = 16;

/// One of the two secondary indexes an entry can be registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSlot {
    One,
    Two,
}

impl IndexSlot {
    pub const ALL: [IndexSlot; 2] = [IndexSlot::One, IndexSlot::Two];
}

/// Secondary keys attached to an entry by [`Store::set_indexed`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecondaryKeys {
    pub idx1: Option<String>,
    pub idx2: Option<String>,
}

impl SecondaryKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idx1(mut self, idx: impl Into<String>) -> Self {
        self.idx1 = Some(idx.into());
        self
    }

    pub fn with_idx2(mut self, idx: impl Into<String>) -> Self {
        self.idx2 = Some(idx.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.idx1.is_none() && self.idx2.is_none()
    }

    pub fn get(&self, slot: IndexSlot) -> Option<&String> {
        match slot {
            IndexSlot::One => self.idx1.as_ref(),
            IndexSlot::Two => self.idx2.as_ref(),
        }
    }

    fn set(&mut self, slot: IndexSlot, idx: String) {
        match slot {
            IndexSlot::One => self.idx1 = Some(idx),
            IndexSlot::Two => self.idx2 = Some(idx),
        }
    }
}

/// A stored value together with the secondary keys it was last indexed under
#[derive(Debug, Default)]
struct StoredValue {
    value: String,
    refs: SecondaryKeys,
}

impl StoredValue {
    fn new(value: String) -> Self {
        Self {
            value,
            refs: SecondaryKeys::default(),
        }
    }
}

/// Secondary key -> primary key maps
///
/// An entry's `refs` may go stale when another key takes over one of its
/// secondary keys, so a mapping is only removed while it still points at
/// the key being unlinked.
#[derive(Debug, Default)]
struct Indexes {
    one: HashMap<String, String>,
    two: HashMap<String, String>,
}

impl Indexes {
    fn map(&self, slot: IndexSlot) -> &HashMap<String, String> {
        match slot {
            IndexSlot::One => &self.one,
            IndexSlot::Two => &self.two,
        }
    }

    fn map_mut(&mut self, slot: IndexSlot) -> &mut HashMap<String, String> {
        match slot {
            IndexSlot::One => &mut self.one,
            IndexSlot::Two => &mut self.two,
        }
    }

    fn unlink(&mut self, slot: IndexSlot, idx: &str, key: &str) {
        let map = self.map_mut(slot);
        if map.get(idx).is_some_and(|owner| owner == key) {
            map.remove(idx);
        }
    }
}

type Shard = RwLock<HashMap<String, StoredValue>>;

/// In-memory key-value store
///
/// Entries are spread over a fixed set of shards, each behind its own
/// reader/writer lock. A key always hashes to the same shard, so every
/// operation on a given key is serialized by that shard's lock.
///
/// Secondary indexes live behind one more lock. Lock order is always a
/// single shard first, then the index lock; no path holds two shards.
pub struct Store {
    shards: Box<[Shard]>,
    indexes: RwLock<Indexes>,
    hasher: RandomState,
}

impl Store {
    /// Create a new empty store with the default shard count
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create a new empty store split over `shards` locks (at least one)
    pub fn with_shards(shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            shards,
            indexes: RwLock::new(Indexes::default()),
            hasher: RandomState::new(),
        }
    }

    /// Number of lock shards
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Liveness probe
    pub fn ping(&self) -> &'static str {
        PONG
    }

    /// Set a key to the given value, replacing any previous value
    ///
    /// Secondary keys previously attached to the entry stay attached.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let mut shard = self.write(&key);
        trace!(key = %key, "set");
        match shard.get_mut(&key) {
            Some(stored) => stored.value = value,
            None => {
                shard.insert(key, StoredValue::new(value));
            }
        }
    }

    /// Set a key and register it under the given secondary keys
    ///
    /// A secondary key already pointing at another entry is taken over. A
    /// slot left as `None` keeps whatever the entry had before.
    pub fn set_indexed(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        secondary: SecondaryKeys,
    ) {
        if secondary.is_empty() {
            return self.set(key, value);
        }

        let key = key.into();
        let mut shard = self.write(&key);
        let mut indexes = self.indexes_mut();
        trace!(key = %key, ?secondary, "set indexed");

        let stored = shard.entry(key.clone()).or_default();
        stored.value = value.into();
        for slot in IndexSlot::ALL {
            let Some(idx) = secondary.get(slot) else {
                continue;
            };
            if let Some(old) = stored.refs.get(slot) {
                if old != idx {
                    indexes.unlink(slot, old, &key);
                }
            }
            indexes.map_mut(slot).insert(idx.clone(), key.clone());
            stored.refs.set(slot, idx.clone());
        }
    }

    /// Get the value for a key, or an empty string if the key is absent
    pub fn get(&self, key: &str) -> String {
        self.lookup(key).unwrap_or_default()
    }

    /// Get the value for a key, distinguishing a stored empty value from absence
    pub fn lookup(&self, key: &str) -> Option<String> {
        let shard = self.read(key);
        trace!(key = %key, "get");
        shard.get(key).map(|stored| stored.value.clone())
    }

    /// Get the value of the entry registered under a secondary key
    pub fn get_by_index(&self, slot: IndexSlot, idx: &str) -> Option<String> {
        let mut key = self.indexes().map(slot).get(idx)?.clone();

        // The mapping may move between reading it and locking the owner's
        // shard, so it is confirmed again while both locks are held.
        loop {
            let shard = self.read(&key);
            let indexes = self.indexes();
            match indexes.map(slot).get(idx) {
                Some(owner) if *owner == key => {
                    trace!(?slot, idx = %idx, key = %key, "get by index");
                    return shard.get(&key).map(|stored| stored.value.clone());
                }
                Some(owner) => key = owner.clone(),
                None => return None,
            }
        }
    }

    /// Remove a key and its secondary keys. Removing an absent key is a no-op.
    pub fn del(&self, key: &str) {
        let mut shard = self.write(key);
        let removed = shard.remove(key);
        trace!(key = %key, removed = removed.is_some(), "del");

        if let Some(stored) = removed {
            if !stored.refs.is_empty() {
                let mut indexes = self.indexes_mut();
                for slot in IndexSlot::ALL {
                    if let Some(idx) = stored.refs.get(slot) {
                        indexes.unlink(slot, idx, key);
                    }
                }
            }
        }
    }

    /// Total number of entries
    ///
    /// Shards are visited one at a time, so the count is only a snapshot
    /// while other callers are writing.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of secondary keys registered in `slot`
    pub fn index_len(&self, slot: IndexSlot) -> usize {
        self.indexes().map(slot).len()
    }

    fn shard(&self, key: &str) -> &Shard {
        let idx = (self.hasher.hash_one(key) as usize) % self.shards.len();
        &self.shards[idx]
    }

    // A panic while holding a guard cannot leave a half-written entry behind,
    // so poisoned locks are recovered rather than reported.
    fn read(&self, key: &str) -> RwLockReadGuard<'_, HashMap<String, StoredValue>> {
        self.shard(key)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, key: &str) -> RwLockWriteGuard<'_, HashMap<String, StoredValue>> {
        self.shard(key)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn indexes(&self) -> RwLockReadGuard<'_, Indexes> {
        self.indexes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn indexes_mut(&self) -> RwLockWriteGuard<'_, Indexes> {
        self.indexes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::sync::Arc;

    #[test]
    fn test_ping() {
        let store = Store::new();
        assert_eq!(store.ping(), "PONG");

        store.set("k", "v");
        assert_eq!(store.ping(), "PONG");
    }

    #[test]
    fn test_set_and_get() {
        let store = Store::new();
        store.set("my_key", "my_value");
        assert_eq!(store.get("my_key"), "my_value");
    }

    #[test]
    fn test_get_absent_key() {
        let store = Store::new();
        assert_eq!(store.get("nonexistent"), "");
        assert_eq!(store.lookup("nonexistent"), None);
    }

    #[test]
    fn test_overwrite() {
        let store = Store::new();
        store.set("key", "v1");
        store.set("key", "v2");
        assert_eq!(store.get("key"), "v2");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_then_get() {
        let store = Store::new();
        store.set("key", "value");
        store.del("key");
        assert_eq!(store.get("key"), "");
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_absent_key() {
        let store = Store::new();
        store.set("other", "value");

        store.del("missing");

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("other"), "value");
    }

    #[test]
    fn test_empty_key_is_a_normal_key() {
        let store = Store::new();
        store.set("", "empty-key");
        assert_eq!(store.get(""), "empty-key");

        store.del("");
        assert_eq!(store.lookup(""), None);
    }

    #[test]
    fn test_lookup_distinguishes_empty_value() {
        let store = Store::new();
        store.set("blank", "");

        assert_eq!(store.get("blank"), "");
        assert_eq!(store.lookup("blank"), Some(String::new()));
        assert_eq!(store.lookup("missing"), None);
    }

    #[test]
    fn test_scenario() {
        let store = Store::new();
        store.set("my_key", "my_value");
        assert_eq!(store.get("my_key"), "my_value");
        store.del("my_key");
        assert_eq!(store.get("my_key"), "");
    }

    #[test]
    fn test_zero_shards_is_clamped() {
        let store = Store::with_shards(0);
        assert_eq!(store.shard_count(), 1);

        store.set("a", "1");
        assert_eq!(store.get("a"), "1");
    }

    #[test]
    fn test_independent_instances() {
        let a = Store::new();
        let b = Store::new();
        a.set("key", "a");

        assert_eq!(a.get("key"), "a");
        assert_eq!(b.get("key"), "");
    }

    #[test]
    fn test_many_keys_across_shards() {
        let store = Store::with_shards(4);
        for i in 0..1000 {
            store.set(format!("key{}", i), format!("value{}", i));
        }
        assert_eq!(store.len(), 1000);

        for i in (0..1000).step_by(2) {
            store.del(&format!("key{}", i));
        }
        assert_eq!(store.len(), 500);
        assert_eq!(store.get("key1"), "value1");
        assert_eq!(store.get("key2"), "");
    }

    const THREADS: usize = 8;
    const ITERATIONS: usize = 2000;
    const KEYS: usize = 8;

    /// Every value written is `<key>:<thread>:<iteration>`, so a reader can
    /// tell whether what it observed was ever written for that key.
    fn assert_written(key: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        let mut parts = value.rsplitn(3, ':');
        let iteration: usize = parts.next().and_then(|s| s.parse().ok()).unwrap();
        let thread: usize = parts.next().and_then(|s| s.parse().ok()).unwrap();
        let prefix = parts.next().unwrap();

        assert_eq!(prefix, key, "value {:?} observed under wrong key", value);
        assert!(thread < THREADS);
        assert!(iteration < ITERATIONS);
    }

    fn stress(shards: usize) {
        let store = Arc::new(Store::with_shards(shards));
        let keys: Vec<String> = (0..KEYS).map(|i| format!("key{}", i)).collect();

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let store = Arc::clone(&store);
                let keys = &keys;
                s.spawn(move || {
                    let mut rng = rand::rng();
                    for i in 0..ITERATIONS {
                        let key = &keys[rng.random_range(0..KEYS)];
                        match rng.random_range(0..10) {
                            0..=3 => store.set(key.as_str(), format!("{}:{}:{}", key, t, i)),
                            4 => store.del(key),
                            _ => assert_written(key, &store.get(key)),
                        }
                        assert_eq!(store.ping(), PONG);
                    }
                });
            }
        });

        assert!(store.len() <= KEYS);
        for key in &keys {
            assert_written(key, &store.get(key));
        }
    }

    #[test]
    fn test_concurrent_stress_single_lock() {
        stress(1);
    }

    #[test]
    fn test_concurrent_stress_sharded() {
        stress(DEFAULT_SHARDS);
    }

    #[test]
    fn test_concurrent_writers_same_key_last_writer_wins() {
        let store = Store::with_shards(1);
        std::thread::scope(|s| {
            for t in 0..THREADS {
                let store = &store;
                s.spawn(move || {
                    for i in 0..ITERATIONS {
                        store.set("shared", format!("shared:{}:{}", t, i));
                    }
                });
            }
        });

        let value = store.get("shared");
        assert_written("shared", &value);
        assert!(value.ends_with(&format!(":{}", ITERATIONS - 1)));
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let store = Arc::new(Store::with_shards(1));
        store.set("key", "value");

        let poisoner = Arc::clone(&store);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.write("key");
            panic!("poison the shard");
        })
        .join();
        assert!(result.is_err());

        assert_eq!(store.get("key"), "value");
        store.set("key", "after");
        assert_eq!(store.get("key"), "after");
    }

    #[test]
    fn test_set_indexed_and_get_by_index() {
        let store = Store::new();
        store.set_indexed(
            "user:1",
            "alice",
            SecondaryKeys::new().with_idx1("email:alice").with_idx2("phone:1"),
        );

        assert_eq!(store.get("user:1"), "alice");
        assert_eq!(
            store.get_by_index(IndexSlot::One, "email:alice"),
            Some("alice".to_string())
        );
        assert_eq!(
            store.get_by_index(IndexSlot::Two, "phone:1"),
            Some("alice".to_string())
        );
        assert_eq!(store.get_by_index(IndexSlot::Two, "email:alice"), None);
    }

    #[test]
    fn test_del_removes_secondary_keys() {
        let store = Store::new();
        store.set_indexed(
            "user:1",
            "alice",
            SecondaryKeys::new().with_idx1("email:alice").with_idx2("phone:1"),
        );

        store.del("user:1");

        assert_eq!(store.get_by_index(IndexSlot::One, "email:alice"), None);
        assert_eq!(store.get_by_index(IndexSlot::Two, "phone:1"), None);
        assert_eq!(store.index_len(IndexSlot::One), 0);
        assert_eq!(store.index_len(IndexSlot::Two), 0);
    }

    #[test]
    fn test_plain_set_keeps_secondary_keys() {
        let store = Store::new();
        store.set_indexed("user:1", "alice", SecondaryKeys::new().with_idx1("a"));
        store.set("user:1", "alice-v2");

        assert_eq!(
            store.get_by_index(IndexSlot::One, "a"),
            Some("alice-v2".to_string())
        );
    }

    #[test]
    fn test_reindex_replaces_old_secondary_key() {
        let store = Store::new();
        store.set_indexed("user:1", "alice", SecondaryKeys::new().with_idx1("old"));
        store.set_indexed("user:1", "alice", SecondaryKeys::new().with_idx1("new"));

        assert_eq!(store.get_by_index(IndexSlot::One, "old"), None);
        assert_eq!(
            store.get_by_index(IndexSlot::One, "new"),
            Some("alice".to_string())
        );
        assert_eq!(store.index_len(IndexSlot::One), 1);
    }

    #[test]
    fn test_secondary_key_taken_over_by_other_entry() {
        let store = Store::new();
        store.set_indexed("a", "value-a", SecondaryKeys::new().with_idx1("shared"));
        store.set_indexed("b", "value-b", SecondaryKeys::new().with_idx1("shared"));

        assert_eq!(
            store.get_by_index(IndexSlot::One, "shared"),
            Some("value-b".to_string())
        );

        // "a" no longer owns the secondary key, so deleting it leaves "b" reachable
        store.del("a");
        assert_eq!(
            store.get_by_index(IndexSlot::One, "shared"),
            Some("value-b".to_string())
        );

        store.del("b");
        assert_eq!(store.get_by_index(IndexSlot::One, "shared"), None);
    }

    #[test]
    fn test_set_indexed_without_keys_is_plain_set() {
        let store = Store::new();
        store.set_indexed("key", "value", SecondaryKeys::new());
        assert_eq!(store.get("key"), "value");
        assert_eq!(store.index_len(IndexSlot::One), 0);
    }

    #[test]
    fn test_concurrent_indexed_writes() {
        let store = Store::with_shards(4);
        let keys: Vec<String> = (0..KEYS).map(|i| format!("key{}", i)).collect();

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let store = &store;
                let keys = &keys;
                s.spawn(move || {
                    let mut rng = rand::rng();
                    for i in 0..ITERATIONS / 4 {
                        let key = &keys[rng.random_range(0..KEYS)];
                        match rng.random_range(0..6) {
                            0 | 1 => store.set_indexed(
                                key.as_str(),
                                format!("{}:{}:{}", key, t, i),
                                SecondaryKeys::new().with_idx1("hot").with_idx2(key.as_str()),
                            ),
                            2 => store.del(key),
                            _ => {
                                if let Some(value) = store.get_by_index(IndexSlot::One, "hot") {
                                    let owner = value.split(':').next().unwrap();
                                    assert!(keys.iter().any(|k| k == owner));
                                }
                                if let Some(value) = store.get_by_index(IndexSlot::Two, key) {
                                    assert_written(key, &value);
                                }
                            }
                        }
                    }
                });
            }
        });

        for key in &keys {
            if store.lookup(key).is_none() {
                assert_eq!(store.get_by_index(IndexSlot::Two, key), None);
            }
        }
        assert!(store.index_len(IndexSlot::One) <= 1);
    }
}
