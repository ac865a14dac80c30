//! In-memory PATRICIA (crit-bit) tree mapping byte-string keys to values.
//!
//! ```
//! use patricia_core::PatriciaTree;
//!
//! let mut tree = PatriciaTree::new();
//! tree.put(b"a", 1);
//! tree.put(b"ab", 2);
//! tree.put(b"b", 3);
//!
//! assert_eq!(tree.get(b"ab"), Some(&2));
//!
//! let mut seen = Vec::new();
//! tree.walk(b"a", |key, value| {
//!     seen.push((key.to_vec(), *value));
//!     false
//! });
//! assert_eq!(seen, vec![(b"a".to_vec(), 1), (b"ab".to_vec(), 2)]);
//! ```

pub mod constants;
pub mod errors;
pub mod helpers;
pub mod telemetry;
pub mod trie;
pub mod types;

pub use crate::errors::Error;
pub use crate::trie::Iter;
pub use crate::types::{Config, NodeId, PatriciaTree};

use crate::types::Trie;
use log::{trace, warn};
use metrics::{counter, gauge};
use std::fmt;

impl<V> PatriciaTree<V> {
    /// Empty tree with the default configuration.
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    /// Empty tree with room for `capacity` entries before the arena grows.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_config(Config {
            initial_capacity: capacity,
            ..Config::default()
        })
    }

    /// Empty tree with an explicit configuration.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        if config.max_entries == Some(0) {
            return Err(Error::ZeroCapacity);
        }
        Ok(Self::from_config(config))
    }

    fn from_config(config: Config) -> Self {
        Self {
            trie: Trie::with_capacity(config.initial_capacity),
            size: 0,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        if key.is_empty() {
            return self.trie.root_slot();
        }
        self.trie.lookup(key)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        if key.is_empty() {
            return self.trie.root_slot_mut().as_mut();
        }
        self.trie.lookup_mut(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Associates `value` with `key`, returning the value it replaced.
    ///
    /// Repeating a `put` with the same key overwrites in place and leaves
    /// [`size`](Self::size) unchanged.
    ///
    /// # Panics
    ///
    /// When [`try_put`](Self::try_put) would fail: the configured
    /// `max_entries` is reached and `key` is new, or the node arena is out
    /// of ids.
    pub fn put(&mut self, key: &[u8], value: V) -> Option<V> {
        match self.try_put(key, value) {
            Ok(previous) => previous,
            Err(e) => panic!("PatriciaTree::put: {e}"),
        }
    }

    /// Fallible [`put`](Self::put). Overwriting an existing key never fails.
    pub fn try_put(&mut self, key: &[u8], value: V) -> Result<Option<V>, Error> {
        counter!("patricia_puts_total").increment(1);
        trace!("[PUT] key={:02x?}", key);
        if let Some(limit) = self.config.max_entries {
            if self.size >= limit && !self.contains_key(key) {
                warn!("[PUT] Refusing new key: {} entries stored (limit {}).", self.size, limit);
                return Err(Error::CapacityExceeded { limit });
            }
        }

        let previous = if key.is_empty() {
            self.trie.root_slot_mut().replace(value)
        } else {
            self.trie.insert(key, value)?
        };
        if previous.is_none() {
            self.size += 1;
            counter!("patricia_inserts_total").increment(1);
        }
        Ok(previous)
    }

    /// Deletes the association for `key`, returning its value. Removing an
    /// absent key is a no-op.
    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        trace!("[REMOVE] key={:02x?}", key);
        let removed = if key.is_empty() {
            self.trie.root_slot_mut().take()
        } else {
            self.trie.remove(key)
        };
        if removed.is_some() {
            self.size -= 1;
            counter!("patricia_removes_total").increment(1);
        }
        removed
    }

    /// Calls `visit` on every pair whose key starts with `prefix`, in
    /// ascending key order, until `visit` returns `true`.
    ///
    /// Keys are ordered bytewise; a key sorts before every key it is a
    /// proper prefix of. `visit` borrows the tree shared, so it cannot
    /// mutate it.
    pub fn walk<F>(&self, prefix: &[u8], mut visit: F)
    where
        F: FnMut(&[u8], &V) -> bool,
    {
        for (key, value) in self.prefix_iter(prefix) {
            if visit(key, value) {
                trace!("[WALK] Stopped by visitor at key={:02x?}", key);
                return;
            }
        }
    }

    /// Every pair in ascending key order.
    pub fn iter(&self) -> Iter<'_, V> {
        self.prefix_iter(&[])
    }

    /// Pairs whose key starts with `prefix`, in ascending key order.
    pub fn prefix_iter<'a>(&'a self, prefix: &'a [u8]) -> Iter<'a, V> {
        let root = self.trie.root_slot().filter(|_| prefix.is_empty());
        self.trie.iter(prefix).with_root(root)
    }

    /// Number of live associations.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Removes every association, keeping the arena's allocation.
    pub fn clear(&mut self) {
        self.trie.clear();
        *self.trie.root_slot_mut() = None;
        self.size = 0;
    }

    /// Live nodes in the arena, the root sentinel included. Equals
    /// `len() + 1`, minus one when the empty key (stored in the sentinel)
    /// is present.
    pub fn node_count(&self) -> usize {
        self.trie.node_count()
    }

    /// Released slots waiting to be reused by the next insert.
    pub fn free_slots(&self) -> usize {
        self.trie.free_slots()
    }

    /// Emit gauges (caller decides cadence).
    pub fn report_metrics(&self) {
        gauge!("patricia_entries").set(self.size as f64);
        gauge!("patricia_nodes").set(self.node_count() as f64);
        gauge!("patricia_free_slots").set(self.free_slots() as f64);
    }
}

impl<V> Default for PatriciaTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for PatriciaTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a PatriciaTree<V> {
    type Item = (&'a [u8], &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: AsRef<[u8]>, V> Extend<(K, V)> for PatriciaTree<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key.as_ref(), value);
        }
    }
}

impl<K: AsRef<[u8]>, V> FromIterator<(K, V)> for PatriciaTree<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}
