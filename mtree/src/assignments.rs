//! Result of a node split.

use crate::distance::DistanceValue;
use crate::entry::EntryLike;
use crate::node::NodeLike;
use serde::{Deserialize, Serialize};

/// One side of a split: a routing object, its covering radius and the
/// entries assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition<K, D, E> {
    routing_object_id: K,
    covering_radius: D,
    entries: Vec<E>,
}

impl<K: Copy, D: Copy, E> Partition<K, D, E> {
    pub fn new(routing_object_id: K, covering_radius: D, entries: Vec<E>) -> Self {
        Self {
            routing_object_id,
            covering_radius,
            entries,
        }
    }

    pub fn routing_object_id(&self) -> K {
        self.routing_object_id
    }

    pub fn covering_radius(&self) -> D {
        self.covering_radius
    }

    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<E> {
        self.entries
    }
}

impl<K, D, E> Partition<K, D, E>
where
    K: Copy + PartialEq,
    D: Copy,
    E: EntryLike<Key = K>,
{
    /// Identifiers of the routing objects of all member entries.
    pub fn member_ids(&self) -> Vec<K> {
        self.entries.iter().map(|e| e.routing_object_id()).collect()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.iter().any(|e| e.routing_object_id() == *key)
    }
}

/// Two disjoint partitions that together hold every entry of the split node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignments<K, D, E> {
    first: Partition<K, D, E>,
    second: Partition<K, D, E>,
}

/// Assignments produced for node type `N`.
pub type NodeAssignments<N> =
    Assignments<<N as NodeLike>::Key, <N as NodeLike>::Distance, <N as NodeLike>::Entry>;

impl<K: Copy, D: DistanceValue, E> Assignments<K, D, E> {
    pub fn new(first: Partition<K, D, E>, second: Partition<K, D, E>) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &Partition<K, D, E> {
        &self.first
    }

    pub fn second(&self) -> &Partition<K, D, E> {
        &self.second
    }

    pub fn first_routing_object_id(&self) -> K {
        self.first.routing_object_id
    }

    pub fn second_routing_object_id(&self) -> K {
        self.second.routing_object_id
    }

    pub fn first_covering_radius(&self) -> D {
        self.first.covering_radius
    }

    pub fn second_covering_radius(&self) -> D {
        self.second.covering_radius
    }

    /// Split objective: sum of both covering radii.
    pub fn summed_radius(&self) -> D {
        self.first.covering_radius.plus(self.second.covering_radius)
    }

    /// Total number of assigned entries.
    pub fn entry_count(&self) -> usize {
        self.first.len() + self.second.len()
    }

    /// Same partitions with the sides exchanged.
    pub fn swapped(self) -> Self {
        Self {
            first: self.second,
            second: self.first,
        }
    }

    pub fn into_parts(self) -> (Partition<K, D, E>, Partition<K, D, E>) {
        (self.first, self.second)
    }
}
