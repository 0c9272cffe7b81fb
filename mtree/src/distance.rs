//! Distance capability used by the split subsystem and the tree.
//!
//! The M-Tree never looks at coordinates. Everything it knows about the
//! stored objects comes through a [`Metric`] over object identifiers, which
//! must be symmetric, non-negative, zero only for identical objects and
//! satisfy the triangle inequality.

use crate::errors::{MTreeError, MTreeResult};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// Opaque handle of a stored object.
///
/// The ordering is only used to break ties deterministically.
pub trait ObjectKey: Copy + Ord + Hash + Debug + Send + Sync + 'static {}

impl<T> ObjectKey for T where T: Copy + Ord + Hash + Debug + Send + Sync + 'static {}

/// A totally ordered distance quantity.
///
/// Unordered pairs (NaN) compare as equal in [`DistanceValue::cmp_distance`].
pub trait DistanceValue: Copy + PartialOrd + Debug + Send + Sync + 'static {
    fn zero() -> Self;

    /// Sentinel that no finite distance exceeds.
    fn infinity() -> Self;

    /// Addition; integer distances saturate instead of overflowing.
    fn plus(self, other: Self) -> Self;

    /// Subtraction clamped at zero.
    fn clamped_sub(self, other: Self) -> Self;

    fn as_f64(self) -> f64;

    fn cmp_distance(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }

    fn max_distance(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }

    /// Absolute difference, `|self - other|`.
    fn abs_diff(self, other: Self) -> Self {
        self.clamped_sub(other).max_distance(other.clamped_sub(self))
    }
}

macro_rules! float_distance {
    ($($t:ty),*) => {
        $(
            impl DistanceValue for $t {
                fn zero() -> Self {
                    0.0
                }

                fn infinity() -> Self {
                    <$t>::INFINITY
                }

                fn plus(self, other: Self) -> Self {
                    self + other
                }

                fn clamped_sub(self, other: Self) -> Self {
                    (self - other).max(0.0)
                }

                fn as_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

macro_rules! integer_distance {
    ($($t:ty),*) => {
        $(
            impl DistanceValue for $t {
                fn zero() -> Self {
                    0
                }

                fn infinity() -> Self {
                    <$t>::MAX
                }

                fn plus(self, other: Self) -> Self {
                    self.saturating_add(other)
                }

                fn clamped_sub(self, other: Self) -> Self {
                    self.saturating_sub(other)
                }

                fn as_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

float_distance!(f32, f64);
integer_distance!(u32, u64, usize);

/// Distance capability over object identifiers.
pub trait Metric<K>: Send + Sync {
    type Distance: DistanceValue;

    /// Distance between the objects behind two identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`MTreeError::NotFound`] if an identifier does not resolve.
    fn distance(&self, a: &K, b: &K) -> MTreeResult<Self::Distance>;

    /// Initial best-so-far value for minimization loops.
    fn infinite_distance(&self) -> Self::Distance {
        Self::Distance::infinity()
    }
}

impl<K, M> Metric<K> for &M
where
    M: Metric<K> + ?Sized,
{
    type Distance = M::Distance;

    fn distance(&self, a: &K, b: &K) -> MTreeResult<Self::Distance> {
        (**self).distance(a, b)
    }

    fn infinite_distance(&self) -> Self::Distance {
        (**self).infinite_distance()
    }
}

impl<K, M> Metric<K> for Arc<M>
where
    M: Metric<K> + ?Sized,
{
    type Distance = M::Distance;

    fn distance(&self, a: &K, b: &K) -> MTreeResult<Self::Distance> {
        (**self).distance(a, b)
    }

    fn infinite_distance(&self) -> Self::Distance {
        (**self).infinite_distance()
    }
}

/// Metric computed directly from the identifiers by a closure.
///
/// # Examples
///
/// ```rust
/// use mtree::distance::{FnMetric, Metric};
///
/// let metric = FnMetric::new(|a: &i64, b: &i64| a.abs_diff(*b));
/// assert_eq!(metric.distance(&3, &10).unwrap(), 7);
/// ```
pub struct FnMetric<F, D> {
    distance_fn: F,
    _distance: PhantomData<fn() -> D>,
}

impl<F, D> FnMetric<F, D> {
    pub fn new(distance_fn: F) -> Self {
        Self {
            distance_fn,
            _distance: PhantomData,
        }
    }
}

impl<K, F, D> Metric<K> for FnMetric<F, D>
where
    F: Fn(&K, &K) -> D + Send + Sync,
    D: DistanceValue,
{
    type Distance = D;

    fn distance(&self, a: &K, b: &K) -> MTreeResult<D> {
        Ok((self.distance_fn)(a, b))
    }
}

/// Metric that resolves identifiers to stored objects before measuring.
///
/// The store can be shared (e.g. behind an `Arc`) with a tree while new
/// objects are registered.
pub struct ObjectStore<K, O, F, D> {
    objects: RwLock<HashMap<K, O>>,
    distance_fn: F,
    _distance: PhantomData<fn() -> D>,
}

impl<K, O, F, D> ObjectStore<K, O, F, D>
where
    K: ObjectKey,
    O: Clone,
{
    pub fn new(distance_fn: F) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            distance_fn,
            _distance: PhantomData,
        }
    }

    /// Registers an object, returning the previous object under `key`.
    pub fn insert(&self, key: K, object: O) -> Option<O> {
        self.objects.write().insert(key, object)
    }

    pub fn remove(&self, key: &K) -> Option<O> {
        self.objects.write().remove(key)
    }

    pub fn get(&self, key: &K) -> Option<O> {
        self.objects.read().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.objects.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl<K, O, F, D> Metric<K> for ObjectStore<K, O, F, D>
where
    K: ObjectKey,
    O: Send + Sync,
    F: Fn(&O, &O) -> D + Send + Sync,
    D: DistanceValue,
{
    type Distance = D;

    fn distance(&self, a: &K, b: &K) -> MTreeResult<D> {
        let objects = self.objects.read();
        let first = objects.get(a).ok_or_else(|| not_found(a))?;
        let second = objects.get(b).ok_or_else(|| not_found(b))?;
        Ok((self.distance_fn)(first, second))
    }
}

fn not_found<K: Debug>(key: &K) -> MTreeError {
    log::error!("Object {:?} is not registered with the object store", key);
    MTreeError::NotFound(format!("{:?}", key))
}

/// Distance wrapper with a total order, for heaps and sorting.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OrderedDistance<D>(pub D);

impl<D: DistanceValue> PartialEq for OrderedDistance<D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<D: DistanceValue> Eq for OrderedDistance<D> {}

impl<D: DistanceValue> PartialOrd for OrderedDistance<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<D: DistanceValue> Ord for OrderedDistance<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_distance(&other.0)
    }
}

/// Common distance functions over raw objects.
pub mod functions {
    /// Euclidean (L2) distance over the common prefix of two vectors.
    pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    /// Manhattan (L1) distance over the common prefix of two vectors.
    pub fn manhattan(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
    }

    /// Levenshtein edit distance between two strings, by characters.
    pub fn levenshtein(a: &str, b: &str) -> u32 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        if a.is_empty() {
            return b.len() as u32;
        }
        if b.is_empty() {
            return a.len() as u32;
        }

        let mut previous: Vec<u32> = (0..=b.len() as u32).collect();
        let mut current = vec![0u32; b.len() + 1];

        for (i, ca) in a.iter().enumerate() {
            current[0] = i as u32 + 1;
            for (j, cb) in b.iter().enumerate() {
                let substitution = previous[j] + u32::from(ca != cb);
                current[j + 1] = substitution
                    .min(previous[j + 1] + 1)
                    .min(current[j] + 1);
            }
            std::mem::swap(&mut previous, &mut current);
        }

        previous[b.len()]
    }
}
