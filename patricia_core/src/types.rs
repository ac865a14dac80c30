//! Data structures for Patricia tree

/// Index of a node in the arena; always 32 bits regardless of platform.
pub type NodeId = u32;

/// Node in the Patricia tree.
///
/// Every node is a branch (split + children) and the holder of exactly one
/// stored pair at once. A child id equal to the node's own id is the
/// terminal marker: descending through it ends at this node's key.
#[derive(Clone, Debug)]
pub(crate) struct Node<V> {
    pub key: Box<[u8]>,
    /// Framed bit position where the two subtrees first differ.
    pub split: isize,
    /// `None` only for the sentinel while the empty key is absent, and for
    /// released slots.
    pub value: Option<V>,
    pub left: NodeId,
    pub right: NodeId,
}

/// Node arena plus the free list of released slots. Slot `ROOT` is the
/// sentinel and is never released.
#[derive(Clone, Debug)]
pub(crate) struct Trie<V> {
    pub nodes: Vec<Node<V>>,
    pub free: Vec<NodeId>,
}

/// Tuning knobs for a [`PatriciaTree`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Node slots reserved up front.
    pub initial_capacity: usize,
    /// Refuse new keys once this many entries are stored.
    pub max_entries: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: crate::constants::DEFAULT_CAPACITY,
            max_entries: None,
        }
    }
}

/// PatriciaTree struct (core handle)
///
/// A PATRICIA (crit-bit) tree mapping byte-string keys to values of type
/// `V`. The tree is single-threaded: it does no locking of its own, so
/// share it across threads behind your own `Mutex`/`RwLock`.
#[derive(Clone)]
pub struct PatriciaTree<V> {
    pub(crate) trie: Trie<V>,
    pub(crate) size: usize,
    pub(crate) config: Config,
}
