//! Proximity queries over 2-D point sets tagged with integer ids.
//!
//! The engine keeps two independent indices: one over attractor positions
//! (ids only used for bookkeeping) and one over node positions (ids are
//! [`crate::types::NodeId`]s). Both go through [`SpatialIndex`] so the
//! growth logic never touches a concrete structure directly.

mod linear;
mod rtree;

pub use linear::LinearIndex;
pub use rtree::PointIndex;

use crate::types::Point2;

/// A point stored in a [`SpatialIndex`] together with its id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entry {
    pub pos: Point2,
    pub id: usize,
}

impl Entry {
    pub fn new(pos: Point2, id: usize) -> Self {
        Self { pos, id }
    }
}

/// Incrementally updatable planar index.
pub trait SpatialIndex: Default {
    /// Adds a single point.
    fn insert(&mut self, pos: Point2, id: usize);

    /// Adds a batch of points.
    fn extend<T>(&mut self, entries: T)
    where
        T: IntoIterator<Item = (Point2, usize)>,
    {
        for (pos, id) in entries {
            self.insert(pos, id);
        }
    }

    /// Removes the element with exactly this position and id.
    ///
    /// Returns `true` if it was present.
    fn remove(&mut self, pos: Point2, id: usize) -> bool;

    /// Returns the element closest to `pos`, or `None` if the index is empty.
    fn nearest(&self, pos: Point2) -> Option<Entry>;

    /// Returns every element within `radius` of `pos`.
    ///
    /// This is a plain radius query, not a triangulation neighborhood.
    /// Closed venation narrows it down with
    /// [`crate::phases::relative_neighborhood`].
    ///
    /// Results are ordered by distance to `pos`, ties broken by id.
    fn within_radius(&self, pos: Point2, radius: f64) -> Vec<Entry>;

    /// Snapshot of every element currently stored.
    fn entries(&self) -> Vec<Entry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}

/// Orders radius query results by distance, then id.
pub(crate) fn sort_by_distance(entries: &mut [Entry], pos: Point2) {
    entries.sort_by(|a, b| {
        a.pos
            .distance_squared(pos)
            .total_cmp(&b.pos.distance_squared(pos))
            .then(a.id.cmp(&b.id))
    });
}
