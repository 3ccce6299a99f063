use super::{Entry, SpatialIndex, sort_by_distance};
use crate::types::Point2;

/// Brute-force index that scans every element on each query.
///
/// Linear in the number of points, so only suitable for small sets. Kept
/// as the reference the tree-backed [`super::PointIndex`] is checked
/// against.
#[derive(Debug, Default, Clone)]
pub struct LinearIndex {
    entries: Vec<Entry>,
}

impl SpatialIndex for LinearIndex {
    fn insert(&mut self, pos: Point2, id: usize) {
        self.entries.push(Entry::new(pos, id));
    }

    fn remove(&mut self, pos: Point2, id: usize) -> bool {
        match self
            .entries
            .iter()
            .position(|e| e.id == id && e.pos == pos)
        {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    fn nearest(&self, pos: Point2) -> Option<Entry> {
        let mut best = None;
        let mut best_d2 = f64::MAX;
        for e in &self.entries {
            let d2 = e.pos.distance_squared(pos);
            if d2 < best_d2 {
                best_d2 = d2;
                best = Some(*e);
            }
        }
        best
    }

    fn within_radius(&self, pos: Point2, radius: f64) -> Vec<Entry> {
        let r2 = radius * radius;
        let mut found: Vec<Entry> = self
            .entries
            .iter()
            .filter(|e| e.pos.distance_squared(pos) <= r2)
            .copied()
            .collect();
        sort_by_distance(&mut found, pos);
        found
    }

    fn entries(&self) -> Vec<Entry> {
        self.entries.clone()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
