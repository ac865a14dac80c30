//! Node-level PATRICIA engine: descent, insertion splice, deletion splice
//! and the ordered walk.
//!
//! Nodes live in an index-addressed arena. An edge `holder -> child` is a
//! leaf edge when `child.split <= holder.split`; the node it reaches is the
//! authoritative holder of the key for that path. A self edge
//! (`child == holder`) is the special case of a node being its own leaf.
//!
//! The engine never sees the empty key; the sentinel's value slot belongs
//! to the container.

use crate::constants::{MAX_NODES, NIL, ROOT, ROOT_SPLIT};
use crate::errors::Error;
use crate::helpers::{crit_bit, key_bit};
use crate::types::{Node, NodeId, Trie};
use log::{debug, trace};

impl<V> Trie<V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.saturating_add(1).min(MAX_NODES));
        nodes.push(Node {
            key: Box::default(),
            split: ROOT_SPLIT,
            value: None,
            left: ROOT,
            right: NIL,
        });
        Self {
            nodes,
            free: Vec::new(),
        }
    }

    #[inline(always)]
    fn node(&self, id: NodeId) -> &Node<V> {
        &self.nodes[id as usize]
    }

    #[inline(always)]
    fn node_mut(&mut self, id: NodeId) -> &mut Node<V> {
        &mut self.nodes[id as usize]
    }

    #[inline(always)]
    fn split(&self, id: NodeId) -> isize {
        self.node(id).split
    }

    /// Child of `id` on the side `key` takes at the node's split.
    #[inline(always)]
    fn child(&self, id: NodeId, key: &[u8]) -> NodeId {
        let node = self.node(id);
        if key_bit(key, node.split) == 0 {
            node.left
        } else {
            node.right
        }
    }

    /// Child of `id` on the side `key` does *not* take.
    #[inline(always)]
    fn other_child(&self, id: NodeId, key: &[u8]) -> NodeId {
        let node = self.node(id);
        if key_bit(key, node.split) == 0 {
            node.right
        } else {
            node.left
        }
    }

    #[inline(always)]
    fn set_child(&mut self, id: NodeId, key: &[u8], to: NodeId) {
        let node = self.node_mut(id);
        if key_bit(key, node.split) == 0 {
            node.left = to;
        } else {
            node.right = to;
        }
    }

    pub(crate) fn root_slot(&self) -> Option<&V> {
        self.node(ROOT).value.as_ref()
    }

    pub(crate) fn root_slot_mut(&mut self) -> &mut Option<V> {
        &mut self.node_mut(ROOT).value
    }

    /// Live nodes, sentinel included.
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub(crate) fn free_slots(&self) -> usize {
        self.free.len()
    }

    /// Takes a slot from the free list, or grows the arena.
    fn alloc(&mut self, key: &[u8], value: V, split: isize) -> Result<NodeId, Error> {
        let node = Node {
            key: key.into(),
            split,
            value: Some(value),
            left: NIL,
            right: NIL,
        };
        if let Some(id) = self.free.pop() {
            trace!("[ALLOC] Reusing freed slot {}", id);
            *self.node_mut(id) = node;
            return Ok(id);
        }
        if self.nodes.len() >= MAX_NODES {
            return Err(Error::CapacityExceeded { limit: MAX_NODES });
        }
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        Ok(id)
    }

    /// Clears a slot and queues it for reuse, handing back its value.
    fn release(&mut self, id: NodeId) -> Option<V> {
        debug_assert_ne!(id, ROOT, "the sentinel is never released");
        let node = self.node_mut(id);
        node.key = Box::default();
        node.split = ROOT_SPLIT;
        node.left = NIL;
        node.right = NIL;
        let value = node.value.take();
        self.free.push(id);
        value
    }

    /// Descends until a leaf edge and returns the node it reaches. The
    /// result is only a candidate: its key may differ from `key`.
    pub(crate) fn locate(&self, key: &[u8]) -> NodeId {
        let mut parent = ROOT;
        let mut next = self.child(ROOT, key);
        while self.split(next) > self.split(parent) {
            parent = next;
            next = self.child(next, key);
        }
        next
    }

    pub(crate) fn lookup(&self, key: &[u8]) -> Option<&V> {
        let node = self.node(self.locate(key));
        if *node.key == *key {
            node.value.as_ref()
        } else {
            None
        }
    }

    pub(crate) fn lookup_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        let id = self.locate(key);
        let node = self.node_mut(id);
        if *node.key == *key {
            node.value.as_mut()
        } else {
            None
        }
    }

    /// Upsert. `Ok(None)` means a node was spliced in for a new key,
    /// `Ok(Some(old))` means an existing value was overwritten in place.
    pub(crate) fn insert(&mut self, key: &[u8], value: V) -> Result<Option<V>, Error> {
        debug_assert!(!key.is_empty(), "the empty key lives in the sentinel slot");
        let candidate = self.locate(key);
        if *self.node(candidate).key == *key {
            trace!("[INSERT] Exact match at node {}. Overwriting value.", candidate);
            return Ok(self.node_mut(candidate).value.replace(value));
        }

        let split = crit_bit(&self.node(candidate).key, key);
        trace!("[INSERT] Candidate {} differs at split={}", candidate, split);

        // re-descend to the first edge whose target splits at or after `split`
        let mut parent = ROOT;
        let mut next = self.child(ROOT, key);
        while self.split(next) > self.split(parent) && self.split(next) < split {
            parent = next;
            next = self.child(next, key);
        }

        let id = self.alloc(key, value, split)?;
        let node = self.node_mut(id);
        if key_bit(key, split) == 0 {
            node.left = id;
            node.right = next;
        } else {
            node.left = next;
            node.right = id;
        }
        self.set_child(parent, key, id);
        debug!(
            "[INSERT] Spliced node {} (split={}) between {} and {}",
            id, split, parent, next
        );
        Ok(None)
    }

    /// Removes `key`, returning its value. Releases exactly one slot on
    /// success.
    pub(crate) fn remove(&mut self, key: &[u8]) -> Option<V> {
        debug_assert!(!key.is_empty(), "the empty key lives in the sentinel slot");
        let target = self.locate(key);
        if target == ROOT || *self.node(target).key != *key {
            trace!("[DELETE] Key not found.");
            return None;
        }

        // second descent, resolving every position to an index before any
        // slot is rewritten
        let mut grandparent = ROOT;
        let mut true_parent = ROOT;
        let mut parent = ROOT;
        let mut next = self.child(ROOT, key);
        while self.split(next) > self.split(parent) {
            if next == target {
                true_parent = parent;
            }
            grandparent = parent;
            parent = next;
            next = self.child(next, key);
        }
        debug_assert_eq!(next, target);

        if parent == target {
            // the target ended the descent through its own self edge
            debug_assert_eq!(grandparent, true_parent);
            let sibling = self.other_child(target, key);
            self.set_child(true_parent, key, sibling);
            debug!(
                "[DELETE] Leaf removal of node {}; sibling {} promoted into {}",
                target, sibling, true_parent
            );
        } else {
            // `parent` leaves its own position and takes over the target's;
            // the leaf edge pointing at `parent` stays valid because the
            // node keeps its identity
            let sibling = self.other_child(parent, key);
            self.set_child(grandparent, key, sibling);
            let (split, left, right) = {
                let t = self.node(target);
                (t.split, t.left, t.right)
            };
            let moved = self.node_mut(parent);
            moved.split = split;
            moved.left = left;
            moved.right = right;
            self.set_child(true_parent, key, parent);
            debug!(
                "[DELETE] Internal removal of node {}; node {} moved into its place",
                target, parent
            );
        }
        self.release(target)
    }

    /// Drops every stored pair except the sentinel slot.
    pub(crate) fn clear(&mut self) {
        self.nodes.truncate(1);
        self.free.clear();
        let root = self.node_mut(ROOT);
        root.left = ROOT;
        root.right = NIL;
    }

    pub(crate) fn iter<'a>(&'a self, prefix: &'a [u8]) -> Iter<'a, V> {
        Iter {
            trie: self,
            prefix,
            root: None,
            stack: vec![(self.node(ROOT).left, ROOT_SPLIT)],
        }
    }
}

/// Ascending-order iterator over `(key, value)` pairs whose key starts with
/// a prefix.
///
/// Created by [`PatriciaTree::iter`](crate::PatriciaTree::iter) and
/// [`PatriciaTree::prefix_iter`](crate::PatriciaTree::prefix_iter).
pub struct Iter<'a, V> {
    trie: &'a Trie<V>,
    prefix: &'a [u8],
    /// Value of the empty key, yielded before anything else.
    root: Option<&'a V>,
    /// Pending edges as `(target, split of the node holding the edge)`.
    stack: Vec<(NodeId, isize)>,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn with_root(mut self, root: Option<&'a V>) -> Self {
        self.root = root;
        self
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(value) = self.root.take() {
            return Some((&[][..], value));
        }
        let trie = self.trie;
        while let Some((id, holder_split)) = self.stack.pop() {
            let node = trie.node(id);
            if node.split <= holder_split {
                // leaf edge; the sentinel's pair is reported through `root`
                if id != ROOT && node.key.starts_with(self.prefix) {
                    if let Some(value) = node.value.as_ref() {
                        return Some((&node.key[..], value));
                    }
                }
                continue;
            }
            // left (bit 0) is popped first
            self.stack.push((node.right, node.split));
            self.stack.push((node.left, node.split));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// Walks every edge and checks the structural invariants: each non-root
    /// node has one branch edge and one leaf edge pointing at it, split
    /// positions increase along branch edges, and every leaf's key agrees
    /// with all branch decisions taken to reach it.
    fn validate<V>(trie: &Trie<V>) -> Vec<Vec<u8>> {
        let n = trie.nodes.len();
        let mut branch_refs = vec![0usize; n];
        let mut leaf_refs = vec![0usize; n];
        let mut leaves = Vec::new();

        let root = trie.node(ROOT);
        assert_eq!(root.right, NIL, "sentinel right slot must stay absent");
        let mut stack = vec![(root.left, ROOT_SPLIT, Vec::<(isize, u8)>::new())];
        while let Some((id, holder_split, path)) = stack.pop() {
            assert_ne!(id, NIL, "NIL reachable from the root");
            let node = trie.node(id);
            if node.split <= holder_split {
                leaf_refs[id as usize] += 1;
                for &(split, bit) in &path {
                    assert_eq!(
                        key_bit(&node.key, split),
                        bit,
                        "leaf {id} disagrees with branch at split {split}"
                    );
                }
                if id != ROOT {
                    leaves.push(node.key.to_vec());
                }
                continue;
            }
            branch_refs[id as usize] += 1;
            let mut right_path = path.clone();
            right_path.push((node.split, 1));
            let mut left_path = path;
            left_path.push((node.split, 0));
            stack.push((node.right, node.split, right_path));
            stack.push((node.left, node.split, left_path));
        }

        assert_eq!(leaf_refs[ROOT as usize], 1, "sentinel must be reachable as a leaf");
        assert_eq!(branch_refs[ROOT as usize], 0);
        for id in 1..n {
            if trie.free.contains(&(id as NodeId)) {
                assert_eq!(branch_refs[id] + leaf_refs[id], 0, "freed slot {id} still linked");
                continue;
            }
            assert_eq!(branch_refs[id], 1, "node {id} branch refs");
            assert_eq!(leaf_refs[id], 1, "node {id} leaf refs");
        }
        assert!(leaves.windows(2).all(|w| w[0] < w[1]), "leaves out of order");
        leaves
    }

    fn trie_with(keys: &[&str]) -> Trie<usize> {
        let mut trie = Trie::with_capacity(keys.len());
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(trie.insert(k.as_bytes(), i).unwrap(), None);
        }
        trie
    }

    #[test]
    fn empty_trie_locates_sentinel() {
        let trie: Trie<u8> = Trie::with_capacity(0);
        assert_eq!(trie.locate(b"anything"), ROOT);
        assert!(trie.lookup(b"anything").is_none());
        assert!(validate(&trie).is_empty());
    }

    #[test]
    fn first_insert_points_back_at_sentinel() {
        let trie = trie_with(&["k"]);
        let id = trie.node(ROOT).left;
        let node = trie.node(id);
        // framed bit 0 is the presence bit of byte 0
        assert_eq!(node.split, 0);
        assert_eq!(node.left, ROOT);
        assert_eq!(node.right, id);
        validate(&trie);
    }

    #[test]
    fn split_lands_on_the_differing_bit_in_either_order() {
        // '@' (0x40) vs '`' (0x60) differ at raw bit 2 -> framed position 3
        for keys in [["@", "`"], ["`", "@"]] {
            let trie = trie_with(&keys);
            let splits: Vec<isize> = trie.nodes[1..].iter().map(|n| n.split).collect();
            assert!(splits.contains(&3), "splits were {splits:?}");
            validate(&trie);
        }
    }

    #[test]
    fn trailing_zero_bytes_are_distinct_keys() {
        let trie = trie_with(&["a", "a\0", "a\0\0"]);
        assert_eq!(trie.lookup(b"a"), Some(&0));
        assert_eq!(trie.lookup(b"a\0"), Some(&1));
        assert_eq!(trie.lookup(b"a\0\0"), Some(&2));
        assert_eq!(validate(&trie), vec![b"a".to_vec(), b"a\0".to_vec(), b"a\0\0".to_vec()]);
    }

    #[test]
    fn leaf_removal_promotes_sibling() {
        let mut trie = trie_with(&["a", "b"]);
        // "b" is inserted second and sits below "a" as its own leaf
        let b = trie.locate(b"b");
        assert_eq!(trie.node(b).right, b);
        assert_eq!(trie.remove(b"b"), Some(1));
        assert_eq!(trie.free, vec![b]);
        assert_eq!(validate(&trie), vec![b"a".to_vec()]);
    }

    #[test]
    fn internal_removal_moves_parent_into_place() {
        // "a" becomes the top branch; removing it forces the parent of its
        // leaf edge to take over the branch position
        let mut trie = trie_with(&["a", "b", "c"]);
        let a = trie.locate(b"a");
        assert_eq!(trie.node(ROOT).left, a);
        assert_eq!(trie.remove(b"a"), Some(0));
        assert_eq!(trie.free, vec![a]);
        assert_eq!(trie.node_count(), 3);
        assert_eq!(validate(&trie), vec![b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(trie.lookup(b"b"), Some(&1));
        assert_eq!(trie.lookup(b"c"), Some(&2));
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut trie = trie_with(&["x", "y"]);
        trie.remove(b"x");
        assert_eq!(trie.free_slots(), 1);
        trie.insert(b"z", 9).unwrap();
        assert_eq!(trie.free_slots(), 0);
        assert_eq!(trie.nodes.len(), 3);
        validate(&trie);
    }

    #[test]
    fn iter_skips_sentinel_and_filters_prefix() {
        let trie = trie_with(&["ab", "a", "b", "abc"]);
        let got: Vec<(&[u8], &usize)> = trie.iter(b"ab").collect();
        assert_eq!(got, vec![(&b"ab"[..], &0), (&b"abc"[..], &3)]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn random_ops_keep_structure_valid(
            ops in proptest::collection::vec(
                (any::<bool>(), proptest::collection::vec(0u8..4, 1..5)),
                1..120,
            )
        ) {
            let mut trie = Trie::with_capacity(0);
            let mut oracle = BTreeMap::new();
            for (i, (is_insert, key)) in ops.into_iter().enumerate() {
                if is_insert {
                    prop_assert_eq!(trie.insert(&key, i).unwrap(), oracle.insert(key.clone(), i));
                } else {
                    prop_assert_eq!(trie.remove(&key), oracle.remove(&key));
                }
                let leaves = validate(&trie);
                let expected: Vec<Vec<u8>> = oracle.keys().cloned().collect();
                prop_assert_eq!(leaves, expected);
                prop_assert_eq!(trie.node_count(), oracle.len() + 1);
            }
        }
    }
}
