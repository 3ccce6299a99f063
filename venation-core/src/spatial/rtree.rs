//! R-tree backed spatial index using the rstar crate.
//!
//! Nearest-neighbor and radius queries are `O(log n)` on average, and
//! single inserts and removals keep the tree balanced, which matters
//! because both indices change every step.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use super::{Entry, SpatialIndex, sort_by_distance};
use crate::types::Point2;

impl RTreeObject for Entry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.pos.to_array())
    }
}

impl PointDistance for Entry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.pos.distance_squared(Point2::from_array(*point))
    }
}

/// Default [`SpatialIndex`] implementation.
#[derive(Debug, Default)]
pub struct PointIndex {
    tree: RTree<Entry>,
}

impl PointIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from a batch of points in one pass.
    ///
    /// Cheaper than inserting the points one by one.
    pub fn bulk_load(entries: Vec<Entry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }
}

impl SpatialIndex for PointIndex {
    fn insert(&mut self, pos: Point2, id: usize) {
        self.tree.insert(Entry::new(pos, id));
    }

    fn remove(&mut self, pos: Point2, id: usize) -> bool {
        self.tree.remove(&Entry::new(pos, id)).is_some()
    }

    fn nearest(&self, pos: Point2) -> Option<Entry> {
        self.tree.nearest_neighbor(&pos.to_array()).copied()
    }

    fn within_radius(&self, pos: Point2, radius: f64) -> Vec<Entry> {
        let mut found: Vec<Entry> = self
            .tree
            .locate_within_distance(pos.to_array(), radius * radius)
            .copied()
            .collect();
        sort_by_distance(&mut found, pos);
        found
    }

    fn entries(&self) -> Vec<Entry> {
        self.tree.iter().copied().collect()
    }

    fn len(&self) -> usize {
        self.tree.size()
    }

    fn clear(&mut self) {
        self.tree = RTree::new();
    }
}
