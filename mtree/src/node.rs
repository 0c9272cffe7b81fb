//! Nodes of the M-Tree.

use crate::distance::{DistanceValue, ObjectKey};
use crate::entry::{EntryLike, MTreeEntry};
use serde::{Deserialize, Serialize};

/// Handle of a node inside the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Entries are stored objects
    Leaf,
    /// Entries route to child nodes
    Directory,
}

/// Read access to a node, as needed by the split subsystem.
pub trait NodeLike {
    type Key: ObjectKey;
    type Distance: DistanceValue;
    type Entry: EntryLike<Key = Self::Key, Distance = Self::Distance> + Clone;

    fn entry_count(&self) -> usize;

    /// Entry at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= entry_count()`.
    fn entry_at(&self, index: usize) -> &Self::Entry;

    fn is_leaf(&self) -> bool;

    /// Index of the first entry routed by `key`.
    fn position_of(&self, key: &Self::Key) -> Option<usize> {
        (0..self.entry_count()).find(|&i| self.entry_at(i).routing_object_id() == *key)
    }
}

/// A leaf or directory node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MTreeNode<K, D> {
    pub kind: NodeKind,
    pub entries: Vec<MTreeEntry<K, D>>,
    /// Weak back-reference to the parent node, `None` at the root.
    pub parent: Option<NodeId>,
}

impl<K: ObjectKey, D: DistanceValue> MTreeNode<K, D> {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            parent: None,
        }
    }

    pub fn with_entries(kind: NodeKind, entries: Vec<MTreeEntry<K, D>>) -> Self {
        Self {
            kind,
            entries,
            parent: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once the node holds more entries than `capacity` allows.
    pub fn is_overflowing(&self, capacity: usize) -> bool {
        self.entries.len() > capacity
    }

    /// Index of the directory entry pointing at `child`.
    pub fn position_of_child(&self, child: NodeId) -> Option<usize> {
        self.entries.iter().position(|e| e.child == Some(child))
    }
}

impl<K: ObjectKey, D: DistanceValue> NodeLike for MTreeNode<K, D> {
    type Key = K;
    type Distance = D;
    type Entry = MTreeEntry<K, D>;

    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn entry_at(&self, index: usize) -> &MTreeEntry<K, D> {
        &self.entries[index]
    }

    fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }
}
