//! Partition policies: given two routing objects, distribute the entries of
//! a node between them and compute the covering radius of each side.
//!
//! Both policies share the same contract:
//! - each routing entry stays on its own side;
//! - every other entry lands on exactly one side;
//! - entries keep their original node order inside a partition;
//! - a side's covering radius is the maximum over its members of the
//!   distance to the routing object plus the member's own covering radius
//!   (zero for leaf entries).

use crate::assignments::{Assignments, NodeAssignments, Partition};
use crate::constants::DEFAULT_MIN_FILL;
use crate::distance::{DistanceValue, Metric};
use crate::entry::EntryLike;
use crate::errors::{MTreeError, MTreeResult};
use crate::node::NodeLike;
use std::cmp::Ordering;

/// Assigns the entries of a node to two given routing objects.
pub trait PartitionPolicy<N, M>: Send + Sync
where
    N: NodeLike,
    M: Metric<N::Key, Distance = N::Distance>,
{
    /// Partitions `node` between the routing objects `first` and `second`.
    ///
    /// # Errors
    ///
    /// - [`MTreeError::Underflow`] if the node has fewer than 2 entries.
    /// - [`MTreeError::InvalidRoutingPair`] if `first == second` or either
    ///   is not the routing object of an entry of the node.
    /// - Any error of the metric, unchanged.
    fn partition(
        &self,
        node: &N,
        first: N::Key,
        second: N::Key,
        metric: &M,
    ) -> MTreeResult<NodeAssignments<N>>;

    fn name(&self) -> &'static str;
}

/// Balanced partition with a minimum occupancy per side.
///
/// Non-routing entries are ranked by `d(e, first) - d(e, second)`, ties
/// broken by identifier order. Entries infinitely far from both routing
/// objects rank last. While a side is below the occupancy floor
/// the first side takes the lowest-ranked remaining entry and the second
/// side the highest-ranked one. Whatever is left then goes to the nearer
/// routing object, with equal distances going to the first side.
///
/// The floor is `ceil(n * min_fill)`, clamped to `1..=n / 2`.
///
/// The result only depends on the unordered routing pair: asking for
/// `(b, a)` yields the sides of `(a, b)` exchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalancedPartition {
    min_fill: f64,
}

impl BalancedPartition {
    /// Creates a balanced policy with the given minimum fill fraction.
    ///
    /// # Errors
    ///
    /// Returns [`MTreeError::InvalidConfig`] unless `0 < min_fill <= 0.5`.
    pub fn new(min_fill: f64) -> MTreeResult<Self> {
        if !(min_fill > 0.0 && min_fill <= 0.5) {
            log::error!("Minimum fill {} is outside (0, 0.5]", min_fill);
            return Err(MTreeError::InvalidConfig(format!(
                "minimum fill must be in (0, 0.5], got {}",
                min_fill
            )));
        }
        Ok(Self { min_fill })
    }

    pub fn min_fill(&self) -> f64 {
        self.min_fill
    }

    /// Minimum number of entries per side when splitting `entry_count`
    /// entries.
    pub fn min_occupancy(&self, entry_count: usize) -> usize {
        let floor = (entry_count as f64 * self.min_fill).ceil() as usize;
        floor.clamp(1, (entry_count / 2).max(1))
    }

    fn partition_ordered<N, M>(
        &self,
        node: &N,
        first: (usize, N::Key),
        second: (usize, N::Key),
        metric: &M,
    ) -> MTreeResult<NodeAssignments<N>>
    where
        N: NodeLike,
        M: Metric<N::Key, Distance = N::Distance>,
    {
        let mut candidates = measure(node, first, second, metric)?;
        candidates.sort_by(|a, b| {
            let (da, db) = (a.preference(), b.preference());
            da.is_nan()
                .cmp(&db.is_nan())
                .then_with(|| da.total_cmp(&db))
                .then_with(|| a.key.cmp(&b.key))
        });

        let floor = self.min_occupancy(node.entry_count());
        let mut first_side = vec![(first.0, N::Distance::zero())];
        let mut second_side = vec![(second.0, N::Distance::zero())];

        let (mut lo, mut hi) = (0, candidates.len());
        while lo < hi && (first_side.len() < floor || second_side.len() < floor) {
            if first_side.len() < floor {
                let c = &candidates[lo];
                first_side.push((c.index, c.to_first));
                lo += 1;
            }
            if lo < hi && second_side.len() < floor {
                hi -= 1;
                let c = &candidates[hi];
                second_side.push((c.index, c.to_second));
            }
        }

        for c in &candidates[lo..hi] {
            if c.to_first <= c.to_second {
                first_side.push((c.index, c.to_first));
            } else {
                second_side.push((c.index, c.to_second));
            }
        }

        Ok(assemble(node, first.1, first_side, second.1, second_side))
    }
}

impl Default for BalancedPartition {
    fn default() -> Self {
        Self {
            min_fill: DEFAULT_MIN_FILL,
        }
    }
}

impl<N, M> PartitionPolicy<N, M> for BalancedPartition
where
    N: NodeLike,
    M: Metric<N::Key, Distance = N::Distance>,
{
    fn partition(
        &self,
        node: &N,
        first: N::Key,
        second: N::Key,
        metric: &M,
    ) -> MTreeResult<NodeAssignments<N>> {
        let (i1, i2) = routing_positions(node, &first, &second)?;
        if second < first {
            let swapped = self.partition_ordered(node, (i2, second), (i1, first), metric)?;
            return Ok(swapped.swapped());
        }
        self.partition_ordered(node, (i1, first), (i2, second), metric)
    }

    fn name(&self) -> &'static str {
        "balanced"
    }
}

/// Generalized-hyperplane partition: every entry goes to the nearer routing
/// object. Equal distances go to the smaller side, then to the first side.
///
/// Entries are visited in identifier order with the routing pair taken in
/// key order, so like [`BalancedPartition`] the result only depends on the
/// unordered routing pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HyperplanePartition;

impl HyperplanePartition {
    fn partition_ordered<N, M>(
        &self,
        node: &N,
        first: (usize, N::Key),
        second: (usize, N::Key),
        metric: &M,
    ) -> MTreeResult<NodeAssignments<N>>
    where
        N: NodeLike,
        M: Metric<N::Key, Distance = N::Distance>,
    {
        let (i1, i2) = (first.0, second.0);
        let mut candidates = measure(node, first, second, metric)?;
        candidates.sort_by(|a, b| a.key.cmp(&b.key));

        let mut first_side = vec![(i1, N::Distance::zero())];
        let mut second_side = vec![(i2, N::Distance::zero())];
        for c in candidates {
            let to_first = match c.to_first.cmp_distance(&c.to_second) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => first_side.len() <= second_side.len(),
            };
            if to_first {
                first_side.push((c.index, c.to_first));
            } else {
                second_side.push((c.index, c.to_second));
            }
        }

        Ok(assemble(node, first.1, first_side, second.1, second_side))
    }
}

impl<N, M> PartitionPolicy<N, M> for HyperplanePartition
where
    N: NodeLike,
    M: Metric<N::Key, Distance = N::Distance>,
{
    fn partition(
        &self,
        node: &N,
        first: N::Key,
        second: N::Key,
        metric: &M,
    ) -> MTreeResult<NodeAssignments<N>> {
        let (i1, i2) = routing_positions(node, &first, &second)?;
        if second < first {
            let swapped = self.partition_ordered(node, (i2, second), (i1, first), metric)?;
            return Ok(swapped.swapped());
        }
        self.partition_ordered(node, (i1, first), (i2, second), metric)
    }

    fn name(&self) -> &'static str {
        "hyperplane"
    }
}

/// Distances of a non-routing entry to both routing objects.
struct Candidate<K, D> {
    index: usize,
    key: K,
    to_first: D,
    to_second: D,
}

impl<K, D: DistanceValue> Candidate<K, D> {
    /// `d(e, first) - d(e, second)`; NaN when the entry is infinitely far
    /// from both routing objects.
    fn preference(&self) -> f64 {
        // adding zero folds -0.0 into 0.0
        self.to_first.as_f64() - self.to_second.as_f64() + 0.0
    }
}

fn routing_positions<N: NodeLike>(
    node: &N,
    first: &N::Key,
    second: &N::Key,
) -> MTreeResult<(usize, usize)> {
    let entries = node.entry_count();
    if entries < 2 {
        log::error!("Refusing to partition a node with {} entries", entries);
        return Err(MTreeError::Underflow { entries });
    }
    if first == second {
        log::error!("Routing pair uses {:?} twice", first);
        return Err(MTreeError::InvalidRoutingPair(format!(
            "routing objects must differ, got {:?} twice",
            first
        )));
    }

    let position = |key: &N::Key| {
        node.position_of(key).ok_or_else(|| {
            log::error!("Routing object {:?} is not an entry of the node", key);
            MTreeError::InvalidRoutingPair(format!("{:?} is not an entry of the node", key))
        })
    };
    Ok((position(first)?, position(second)?))
}

fn measure<N, M>(
    node: &N,
    first: (usize, N::Key),
    second: (usize, N::Key),
    metric: &M,
) -> MTreeResult<Vec<Candidate<N::Key, N::Distance>>>
where
    N: NodeLike,
    M: Metric<N::Key, Distance = N::Distance>,
{
    let mut candidates = Vec::with_capacity(node.entry_count().saturating_sub(2));
    for index in 0..node.entry_count() {
        if index == first.0 || index == second.0 {
            continue;
        }
        let key = node.entry_at(index).routing_object_id();
        candidates.push(Candidate {
            index,
            key,
            to_first: metric.distance(&key, &first.1)?,
            to_second: metric.distance(&key, &second.1)?,
        });
    }
    Ok(candidates)
}

/// Materializes both sides from `(entry index, distance to routing object)`
/// pairs.
fn assemble<N: NodeLike>(
    node: &N,
    first: N::Key,
    first_side: Vec<(usize, N::Distance)>,
    second: N::Key,
    second_side: Vec<(usize, N::Distance)>,
) -> NodeAssignments<N> {
    Assignments::new(
        side(node, first, first_side),
        side(node, second, second_side),
    )
}

fn side<N: NodeLike>(
    node: &N,
    routing_object_id: N::Key,
    mut members: Vec<(usize, N::Distance)>,
) -> Partition<N::Key, N::Distance, N::Entry> {
    members.sort_by_key(|(index, _)| *index);

    let mut radius = N::Distance::zero();
    let mut entries = Vec::with_capacity(members.len());
    for (index, distance) in members {
        let entry = node.entry_at(index);
        radius = radius.max_distance(distance.plus(entry.covering_radius()));
        entries.push(entry.clone());
    }
    Partition::new(routing_object_id, radius, entries)
}
