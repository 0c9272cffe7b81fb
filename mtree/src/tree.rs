//! In-memory M-Tree over a [`Metric`].
//!
//! Nodes live in an arena addressed by [`NodeId`]; directory entries point
//! down at their child and every node keeps a back-reference to its parent.
//! The arena sits behind a `parking_lot::RwLock`: searches share the read
//! lock, insertion holds the write lock across any splits it causes.
//!
//! Insertion descends to the leaf whose routing object covers the new
//! object most tightly (or needs the least radius enlargement), widening
//! covering radii on the way. An overflowing node is handed to the
//! configured [`SplitStrategy`]; the first partition reuses the node's slot,
//! the second gets a new one, and the parent receives two directory entries.
//! Splits propagate upwards, and splitting the root grows the tree by one
//! level.

use crate::config::MTreeConfig;
use crate::distance::{DistanceValue, Metric, ObjectKey, OrderedDistance};
use crate::entry::MTreeEntry;
use crate::errors::{MTreeError, MTreeResult};
use crate::node::{MTreeNode, NodeId, NodeKind, NodeLike};
use crate::split::SplitStrategy;
use crate::stats::{IntegrityReport, MTreeStats, MeanVarianceMinMax};
use parking_lot::RwLock;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Split strategy object usable by an `MTree<K, M>`.
pub type BoxedSplitStrategy<K, M> =
    Box<dyn SplitStrategy<MTreeNode<K, <M as Metric<K>>::Distance>, M>>;

type PendingNode<D> = Reverse<(OrderedDistance<D>, NodeId, Option<OrderedDistance<D>>)>;

/// Relative slack allowed when checking covering radii of float distances.
const RADIUS_TOLERANCE: f64 = 1e-9;

struct TreeInner<K, D> {
    nodes: Vec<MTreeNode<K, D>>,
    root: Option<NodeId>,
    size: u64,
    split_count: u64,
    split_radius: MeanVarianceMinMax,
}

impl<K: ObjectKey, D: DistanceValue> TreeInner<K, D> {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            size: 0,
            split_count: 0,
            split_radius: MeanVarianceMinMax::new(),
        }
    }

    fn node(&self, id: NodeId) -> &MTreeNode<K, D> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut MTreeNode<K, D> {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, node: MTreeNode<K, D>) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn height(&self) -> u32 {
        let mut height = 0;
        let mut current = self.root;
        while let Some(id) = current {
            height += 1;
            current = self.node(id).entries.first().and_then(|e| e.child);
        }
        height
    }

    /// Routing object of the directory entry that points at `id`.
    fn routing_of(&self, id: NodeId) -> MTreeResult<Option<K>> {
        let Some(parent) = self.node(id).parent else {
            return Ok(None);
        };
        let position = self
            .node(parent)
            .position_of_child(id)
            .ok_or_else(|| broken_link(parent, id))?;
        Ok(Some(self.node(parent).entries[position].routing_object_id))
    }
}

/// Directory entry chosen while descending for an insertion.
struct PathStep<D> {
    node: NodeId,
    position: usize,
    distance: D,
}

/// A metric tree indexing object identifiers of type `K`.
///
/// ```rust
/// use mtree::config::MTreeConfig;
/// use mtree::distance::FnMetric;
/// use mtree::tree::MTree;
///
/// let metric = FnMetric::new(|a: &u32, b: &u32| a.abs_diff(*b) as f64);
/// let tree = MTree::new(metric, MTreeConfig::new().with_node_capacity(4)).unwrap();
/// for id in [1, 5, 9, 14, 20, 22] {
///     tree.insert(id).unwrap();
/// }
///
/// let found = tree.range_search(&10, 4.0).unwrap();
/// assert_eq!(found, vec![(9, 1.0), (14, 4.0)]);
/// assert_eq!(tree.knn_search(&21, 2).unwrap(), vec![(20, 1.0), (22, 1.0)]);
/// ```
pub struct MTree<K, M>
where
    K: ObjectKey,
    M: Metric<K>,
{
    metric: M,
    config: MTreeConfig,
    strategy: BoxedSplitStrategy<K, M>,
    inner: RwLock<TreeInner<K, M::Distance>>,
}

impl<K, M> MTree<K, M>
where
    K: ObjectKey,
    M: Metric<K>,
{
    /// Creates an empty tree using the split strategy named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`MTreeError::InvalidConfig`] if the configuration is invalid.
    pub fn new(metric: M, config: MTreeConfig) -> MTreeResult<Self> {
        let strategy: BoxedSplitStrategy<K, M> = config.build_strategy()?;
        Ok(Self::assemble(metric, config, strategy))
    }

    /// Creates an empty tree with a caller-supplied split strategy. The
    /// strategy named in `config` is ignored.
    pub fn with_strategy(
        metric: M,
        config: MTreeConfig,
        strategy: BoxedSplitStrategy<K, M>,
    ) -> MTreeResult<Self> {
        config.validate()?;
        Ok(Self::assemble(metric, config, strategy))
    }

    fn assemble(metric: M, config: MTreeConfig, strategy: BoxedSplitStrategy<K, M>) -> Self {
        log::debug!(
            "Creating M-Tree with node capacity {} and {} splits",
            config.node_capacity,
            strategy.name()
        );
        Self {
            metric,
            config,
            strategy,
            inner: RwLock::new(TreeInner::new()),
        }
    }

    pub fn config(&self) -> &MTreeConfig {
        &self.config
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Indexes `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MTreeError::InvalidOperation`] if `key` is already indexed
    /// and propagates metric and split errors. Metric failures during the
    /// descent leave the tree unchanged. If a split fails the object stays
    /// in its overfull node.
    pub fn insert(&self, key: K) -> MTreeResult<()> {
        let mut inner = self.inner.write();
        let Some(root) = inner.root else {
            let leaf = MTreeNode::with_entries(NodeKind::Leaf, vec![MTreeEntry::leaf(key, None)]);
            let root = inner.push(leaf);
            inner.root = Some(root);
            inner.size = 1;
            log::debug!("Created root leaf {:?} for {:?}", root, key);
            return Ok(());
        };

        if self.contains_in(&inner, &key)? {
            log::error!("Object {:?} is already indexed", key);
            return Err(MTreeError::InvalidOperation(format!(
                "object {:?} is already in the tree",
                key
            )));
        }

        let mut path = Vec::new();
        let leaf = self.choose_leaf(&inner, root, &key, &mut path)?;
        for step in &path {
            let entry = &mut inner.node_mut(step.node).entries[step.position];
            entry.covering_radius = entry.covering_radius.max_distance(step.distance);
        }

        let distance_to_parent = path.last().map(|step| step.distance);
        inner
            .node_mut(leaf)
            .entries
            .push(MTreeEntry::leaf(key, distance_to_parent));
        inner.size += 1;

        if inner.node(leaf).is_overflowing(self.config.node_capacity) {
            self.split_upwards(&mut inner, leaf)?;
        }
        Ok(())
    }

    /// All objects within `radius` of `query`, nearest first.
    pub fn range_search(&self, query: &K, radius: M::Distance) -> MTreeResult<Vec<(K, M::Distance)>> {
        let inner = self.inner.read();
        let mut found = Vec::new();
        if let Some(root) = inner.root {
            self.search_recursive(&inner, root, query, radius, None, &mut found)?;
        }
        sort_results(&mut found);
        Ok(found)
    }

    /// The `k` objects nearest to `query`, nearest first. Equal distances are
    /// ordered by key.
    pub fn knn_search(&self, query: &K, k: usize) -> MTreeResult<Vec<(K, M::Distance)>> {
        let inner = self.inner.read();
        let Some(root) = inner.root else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut pending: BinaryHeap<PendingNode<M::Distance>> = BinaryHeap::new();
        pending.push(Reverse((OrderedDistance(M::Distance::zero()), root, None)));
        let mut nearest: BinaryHeap<(OrderedDistance<M::Distance>, K)> =
            BinaryHeap::with_capacity(k + 1);

        while let Some(Reverse((OrderedDistance(bound), node_id, query_to_parent))) = pending.pop() {
            if bound > kth_distance(&nearest, k) {
                break;
            }

            for entry in &inner.node(node_id).entries {
                if let (Some(OrderedDistance(to_parent)), Some(entry_to_parent)) =
                    (query_to_parent, entry.distance_to_parent)
                {
                    let lower = to_parent
                        .abs_diff(entry_to_parent)
                        .clamped_sub(entry.covering_radius);
                    if lower > kth_distance(&nearest, k) {
                        continue;
                    }
                }

                let distance = self.metric.distance(query, &entry.routing_object_id)?;
                match entry.child {
                    None => {
                        nearest.push((OrderedDistance(distance), entry.routing_object_id));
                        if nearest.len() > k {
                            nearest.pop();
                        }
                    }
                    Some(child) => {
                        let lower = distance.clamped_sub(entry.covering_radius);
                        if lower <= kth_distance(&nearest, k) {
                            pending.push(Reverse((
                                OrderedDistance(lower),
                                child,
                                Some(OrderedDistance(distance)),
                            )));
                        }
                    }
                }
            }
        }

        let mut found: Vec<_> = nearest
            .into_iter()
            .map(|(OrderedDistance(distance), key)| (key, distance))
            .collect();
        sort_results(&mut found);
        Ok(found)
    }

    pub fn contains(&self, key: &K) -> MTreeResult<bool> {
        let inner = self.inner.read();
        self.contains_in(&inner, key)
    }

    pub fn size(&self) -> usize {
        self.inner.read().size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().root.is_none()
    }

    /// Number of levels, 0 for an empty tree.
    pub fn height(&self) -> u32 {
        self.inner.read().height()
    }

    /// Removes every object and resets split statistics.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        log::debug!("Clearing M-Tree with {} entries", inner.size);
        *inner = TreeInner::new();
    }

    pub fn stats(&self) -> MTreeStats {
        let inner = self.inner.read();
        MTreeStats {
            total_entries: inner.size,
            node_count: inner.nodes.len() as u64,
            leaf_count: inner.nodes.iter().filter(|n| n.is_leaf()).count() as u64,
            tree_height: inner.height(),
            split_count: inner.split_count,
            split_radius: inner.split_radius.clone(),
        }
    }

    /// Walks the whole tree and verifies its structure.
    ///
    /// Checks node capacity, parent links, leaf depth, cached parent
    /// distances, and that every covering radius bounds the objects below
    /// it.
    ///
    /// # Errors
    ///
    /// Propagates metric errors. Structural problems are reported, not
    /// returned as errors.
    pub fn check_integrity(&self) -> MTreeResult<IntegrityReport> {
        let inner = self.inner.read();
        let mut report = IntegrityReport::new();

        if let Some(root) = inner.root {
            if inner.node(root).parent.is_some() {
                report.broken_links.push(root);
                report.fail(format!("root {:?} has a parent", root));
            }
            let height = inner.height();
            self.check_node(&inner, root, None, 1, height, &mut report)?;
        }

        if report.entries_checked != inner.size {
            report.fail(format!(
                "found {} objects but the tree holds {}",
                report.entries_checked, inner.size
            ));
        }
        let allocated = inner.nodes.len() as u64;
        if report.nodes_checked != allocated {
            report.fail(format!(
                "{} of {} nodes are unreachable",
                allocated.saturating_sub(report.nodes_checked),
                allocated
            ));
        }
        Ok(report)
    }

    fn contains_in(&self, inner: &TreeInner<K, M::Distance>, key: &K) -> MTreeResult<bool> {
        let Some(root) = inner.root else {
            return Ok(false);
        };
        let mut found = Vec::new();
        self.search_recursive(inner, root, key, M::Distance::zero(), None, &mut found)?;
        Ok(found.iter().any(|(candidate, _)| candidate == key))
    }

    /// Descends from `root` to the leaf that should receive `key`, recording
    /// each chosen directory entry and its distance to `key`.
    fn choose_leaf(
        &self,
        inner: &TreeInner<K, M::Distance>,
        root: NodeId,
        key: &K,
        path: &mut Vec<PathStep<M::Distance>>,
    ) -> MTreeResult<NodeId> {
        let mut current = root;
        loop {
            let node = inner.node(current);
            if node.is_leaf() {
                return Ok(current);
            }

            // (covered, cost, position, distance)
            let mut chosen: Option<(bool, M::Distance, usize, M::Distance)> = None;
            for (position, entry) in node.entries.iter().enumerate() {
                let distance = self.metric.distance(key, &entry.routing_object_id)?;
                let covered = distance <= entry.covering_radius;
                let cost = if covered {
                    distance
                } else {
                    distance.clamped_sub(entry.covering_radius)
                };
                let better = match chosen {
                    None => true,
                    Some((best_covered, best_cost, _, _)) => match (covered, best_covered) {
                        (true, false) => true,
                        (false, true) => false,
                        _ => cost < best_cost,
                    },
                };
                if better {
                    chosen = Some((covered, cost, position, distance));
                }
            }

            let (_, _, position, distance) = chosen.ok_or_else(|| {
                log::error!("Directory node {:?} has no entries", current);
                MTreeError::InvalidOperation(format!("directory node {:?} is empty", current))
            })?;
            path.push(PathStep {
                node: current,
                position,
                distance,
            });
            current = node.entries[position].child.ok_or_else(|| {
                log::error!("Directory entry {} of {:?} has no child", position, current);
                MTreeError::InvalidOperation(format!(
                    "directory entry {} of {:?} has no child",
                    position, current
                ))
            })?;
        }
    }

    /// Splits `node_id` and every ancestor that overflows as a result.
    fn split_upwards(
        &self,
        inner: &mut TreeInner<K, M::Distance>,
        mut node_id: NodeId,
    ) -> MTreeResult<()> {
        loop {
            let assignments = self.strategy.split(inner.node(node_id), &self.metric)?;
            let summed_radius = assignments.summed_radius();

            let (first, second) = assignments.into_parts();
            let first_routing = first.routing_object_id();
            let first_radius = first.covering_radius();
            let second_routing = second.routing_object_id();
            let second_radius = second.covering_radius();
            let first_entries = self.rebase(first_routing, first.into_entries())?;
            let second_entries = self.rebase(second_routing, second.into_entries())?;

            let kind = inner.node(node_id).kind;
            let parent = inner.node(node_id).parent;
            let parent_slot = match parent {
                Some(parent_id) => {
                    let position = inner
                        .node(parent_id)
                        .position_of_child(node_id)
                        .ok_or_else(|| broken_link(parent_id, node_id))?;
                    let above = inner.routing_of(parent_id)?;
                    let first_to_parent = self.distance_to(first_routing, above)?;
                    let second_to_parent = self.distance_to(second_routing, above)?;
                    Some((parent_id, position, first_to_parent, second_to_parent))
                }
                None => None,
            };

            inner.split_count += 1;
            inner.split_radius.put(summed_radius.as_f64());

            inner.node_mut(node_id).entries = first_entries;
            let mut sibling = MTreeNode::with_entries(kind, second_entries);
            sibling.parent = parent;
            let sibling_id = inner.push(sibling);
            let moved: Vec<NodeId> = inner
                .node(sibling_id)
                .entries
                .iter()
                .filter_map(|e| e.child)
                .collect();
            for child in moved {
                inner.node_mut(child).parent = Some(sibling_id);
            }

            match parent_slot {
                None => {
                    let root = MTreeNode::with_entries(
                        NodeKind::Directory,
                        vec![
                            MTreeEntry::directory(first_routing, first_radius, None, node_id),
                            MTreeEntry::directory(second_routing, second_radius, None, sibling_id),
                        ],
                    );
                    let root_id = inner.push(root);
                    inner.node_mut(node_id).parent = Some(root_id);
                    inner.node_mut(sibling_id).parent = Some(root_id);
                    inner.root = Some(root_id);
                    log::debug!(
                        "Root split promoted {:?} and {:?}, height is now {}",
                        first_routing,
                        second_routing,
                        inner.height()
                    );
                    return Ok(());
                }
                Some((parent_id, position, first_to_parent, second_to_parent)) => {
                    let capacity = self.config.node_capacity;
                    let parent_node = inner.node_mut(parent_id);
                    parent_node.entries[position] =
                        MTreeEntry::directory(first_routing, first_radius, first_to_parent, node_id);
                    parent_node.entries.push(MTreeEntry::directory(
                        second_routing,
                        second_radius,
                        second_to_parent,
                        sibling_id,
                    ));
                    log::debug!(
                        "Split {:?} off {:?} under {:?}",
                        sibling_id,
                        node_id,
                        parent_id
                    );
                    if !parent_node.is_overflowing(capacity) {
                        return Ok(());
                    }
                    node_id = parent_id;
                }
            }
        }
    }

    /// Recomputes each entry's distance to its new routing object.
    fn rebase(
        &self,
        routing: K,
        mut entries: Vec<MTreeEntry<K, M::Distance>>,
    ) -> MTreeResult<Vec<MTreeEntry<K, M::Distance>>> {
        for entry in &mut entries {
            entry.distance_to_parent =
                Some(self.metric.distance(&entry.routing_object_id, &routing)?);
        }
        Ok(entries)
    }

    fn distance_to(&self, key: K, routing: Option<K>) -> MTreeResult<Option<M::Distance>> {
        routing
            .map(|routing| self.metric.distance(&key, &routing))
            .transpose()
    }

    fn search_recursive(
        &self,
        inner: &TreeInner<K, M::Distance>,
        node_id: NodeId,
        query: &K,
        radius: M::Distance,
        query_to_parent: Option<M::Distance>,
        found: &mut Vec<(K, M::Distance)>,
    ) -> MTreeResult<()> {
        for entry in &inner.node(node_id).entries {
            if let (Some(to_parent), Some(entry_to_parent)) =
                (query_to_parent, entry.distance_to_parent)
            {
                if to_parent.abs_diff(entry_to_parent) > radius.plus(entry.covering_radius) {
                    continue;
                }
            }

            let distance = self.metric.distance(query, &entry.routing_object_id)?;
            match entry.child {
                None => {
                    if distance <= radius {
                        found.push((entry.routing_object_id, distance));
                    }
                }
                Some(child) => {
                    if distance <= radius.plus(entry.covering_radius) {
                        self.search_recursive(inner, child, query, radius, Some(distance), found)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Checks the subtree at `node_id` and returns the objects stored in it.
    fn check_node(
        &self,
        inner: &TreeInner<K, M::Distance>,
        node_id: NodeId,
        parent_routing: Option<K>,
        depth: u32,
        height: u32,
        report: &mut IntegrityReport,
    ) -> MTreeResult<Vec<K>> {
        let node = inner.node(node_id);
        report.nodes_checked += 1;

        if node.is_overflowing(self.config.node_capacity) {
            report.overfull_nodes.push(node_id);
            report.fail(format!(
                "node {:?} holds {} entries, capacity is {}",
                node_id,
                node.len(),
                self.config.node_capacity
            ));
        }
        if node.is_empty() {
            report.fail(format!("node {:?} is empty", node_id));
        }
        if node.is_leaf() && depth != height {
            report.fail(format!(
                "leaf {:?} sits at depth {} in a tree of height {}",
                node_id, depth, height
            ));
        }

        let mut objects = Vec::new();
        for entry in &node.entries {
            let expected = self.distance_to(entry.routing_object_id, parent_routing)?;
            if !same_distance(entry.distance_to_parent, expected) {
                report.fail(format!(
                    "entry {:?} in {:?} caches parent distance {:?}, actual {:?}",
                    entry.routing_object_id, node_id, entry.distance_to_parent, expected
                ));
            }

            match (node.kind, entry.child) {
                (NodeKind::Leaf, None) => {
                    report.entries_checked += 1;
                    objects.push(entry.routing_object_id);
                }
                (NodeKind::Directory, Some(child)) => {
                    if inner.node(child).parent != Some(node_id) {
                        report.broken_links.push(child);
                        report.fail(format!(
                            "node {:?} does not point back at its parent {:?}",
                            child, node_id
                        ));
                    }
                    let below = self.check_node(
                        inner,
                        child,
                        Some(entry.routing_object_id),
                        depth + 1,
                        height,
                        report,
                    )?;
                    for object in &below {
                        let distance = self.metric.distance(object, &entry.routing_object_id)?;
                        if !within_radius(distance, entry.covering_radius) {
                            report.fail(format!(
                                "{:?} lies at {:?} from {:?}, outside covering radius {:?}",
                                object, distance, entry.routing_object_id, entry.covering_radius
                            ));
                        }
                    }
                    objects.extend(below);
                }
                _ => report.fail(format!(
                    "entry {:?} does not match the kind of node {:?}",
                    entry.routing_object_id, node_id
                )),
            }
        }
        Ok(objects)
    }
}

fn kth_distance<K: Ord, D: DistanceValue>(
    nearest: &BinaryHeap<(OrderedDistance<D>, K)>,
    k: usize,
) -> D {
    match nearest.peek() {
        Some((OrderedDistance(distance), _)) if nearest.len() >= k => *distance,
        _ => D::infinity(),
    }
}

fn sort_results<K: Ord, D: DistanceValue>(found: &mut [(K, D)]) {
    found.sort_by(|a, b| a.1.cmp_distance(&b.1).then_with(|| a.0.cmp(&b.0)));
}

fn same_distance<D: DistanceValue>(cached: Option<D>, actual: Option<D>) -> bool {
    match (cached, actual) {
        (Some(cached), Some(actual)) => cached.cmp_distance(&actual) == Ordering::Equal,
        (None, None) => true,
        _ => false,
    }
}

fn within_radius<D: DistanceValue>(distance: D, radius: D) -> bool {
    distance <= radius || distance.as_f64() <= radius.as_f64() * (1.0 + RADIUS_TOLERANCE)
}

fn broken_link(parent: NodeId, child: NodeId) -> MTreeError {
    log::error!("Broken link between {:?} and {:?}", parent, child);
    MTreeError::InvalidOperation(format!(
        "node {:?} is not linked to its parent {:?}",
        child, parent
    ))
}
