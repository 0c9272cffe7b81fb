//! Entries held by M-Tree nodes.

use crate::distance::{DistanceValue, ObjectKey};
use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Read access to one child reference inside a node.
pub trait EntryLike {
    type Key: ObjectKey;
    type Distance: DistanceValue;

    /// Identifier of the object representing this child.
    fn routing_object_id(&self) -> Self::Key;

    /// Upper bound of the distance from the routing object to anything
    /// reachable below this entry. Zero for leaf entries.
    fn covering_radius(&self) -> Self::Distance;

    /// Cached distance to the routing object of the enclosing node.
    fn distance_to_parent(&self) -> Option<Self::Distance>;
}

/// Entry of an [`MTreeNode`](crate::node::MTreeNode).
///
/// Leaf entries denote a single stored object. Directory entries carry a
/// non-owning handle to their child node, which lives in the tree arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MTreeEntry<K, D> {
    pub routing_object_id: K,
    pub covering_radius: D,
    pub distance_to_parent: Option<D>,
    pub child: Option<NodeId>,
}

impl<K: ObjectKey, D: DistanceValue> MTreeEntry<K, D> {
    /// Creates an entry for a stored object.
    pub fn leaf(object_id: K, distance_to_parent: Option<D>) -> Self {
        Self {
            routing_object_id: object_id,
            covering_radius: D::zero(),
            distance_to_parent,
            child: None,
        }
    }

    /// Creates an entry routing to a subtree.
    pub fn directory(
        routing_object_id: K,
        covering_radius: D,
        distance_to_parent: Option<D>,
        child: NodeId,
    ) -> Self {
        Self {
            routing_object_id,
            covering_radius,
            distance_to_parent,
            child: Some(child),
        }
    }

    pub fn is_leaf_entry(&self) -> bool {
        self.child.is_none()
    }
}

impl<K: ObjectKey, D: DistanceValue> EntryLike for MTreeEntry<K, D> {
    type Key = K;
    type Distance = D;

    fn routing_object_id(&self) -> K {
        self.routing_object_id
    }

    fn covering_radius(&self) -> D {
        self.covering_radius
    }

    fn distance_to_parent(&self) -> Option<D> {
        self.distance_to_parent
    }
}
