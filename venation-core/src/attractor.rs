use glam::DVec2;
use rand::Rng;
use tracing::debug;

use crate::{
    mask::MaskSampler,
    spatial::{Entry, PointIndex, SpatialIndex},
    types::Point2,
};

/// Tolerance for matching a removal request to a stored attractor.
///
/// Attractors are identified by position alone, and positions reached by
/// growth arithmetic rarely match bit for bit.
pub const REMOVE_EPSILON: f64 = 1e-9;

/// The cloud of attractor points driving growth.
///
/// Attractors have no identity besides their position. Ids handed to the
/// index are a running counter used only to tell duplicates apart.
#[derive(Debug, Default)]
pub struct AttractorField<I = PointIndex> {
    index: I,
    next_id: usize,
}

impl<I: SpatialIndex> AttractorField<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(positions: impl IntoIterator<Item = Point2>) -> Self {
        let mut field = Self::new();
        for pos in positions {
            field.insert(pos);
        }
        field
    }

    pub fn insert(&mut self, pos: Point2) {
        self.index.insert(pos, self.next_id);
        self.next_id += 1;
    }

    /// Draws `count` candidates uniformly over
    /// `[-aspect_ratio, aspect_ratio] × [-1, 1]`.
    ///
    /// With a mask, each candidate survives with probability equal to the
    /// mask brightness at its normalized position. Returns the number of
    /// attractors kept.
    pub fn generate<R>(
        &mut self,
        count: usize,
        aspect_ratio: f64,
        mask: Option<&dyn MaskSampler>,
        rng: &mut R,
    ) -> usize
    where
        R: Rng + ?Sized,
    {
        let mut kept = 0;
        for _ in 0..count {
            let u: f64 = rng.random();
            let v: f64 = rng.random();
            let pos = DVec2::new((u * 2.0 - 1.0) * aspect_ratio, v * 2.0 - 1.0);

            if let Some(mask) = mask {
                let keep: f64 = rng.random();
                if keep >= mask.brightness(u, v) {
                    continue;
                }
            }

            self.insert(pos);
            kept += 1;
        }

        debug!(count, kept, masked = mask.is_some(), "generated attractors");
        kept
    }

    /// Adds `count` attractors uniformly inside the axis-aligned rectangle
    /// `center ± half_extents`. No mask is applied.
    pub fn scatter_in_rect<R>(
        &mut self,
        center: Point2,
        half_extents: DVec2,
        count: usize,
        rng: &mut R,
    ) where
        R: Rng + ?Sized,
    {
        for _ in 0..count {
            let x = rng.random_range(-half_extents.x..=half_extents.x);
            let y = rng.random_range(-half_extents.y..=half_extents.y);
            self.insert(center + DVec2::new(x, y));
        }
    }

    /// Removes the attractor at `pos`, tolerating [`REMOVE_EPSILON`] of
    /// drift. Returns `true` if one was removed.
    pub fn remove(&mut self, pos: Point2) -> bool {
        match self.index.nearest(pos) {
            Some(e) if e.pos.distance(pos) < REMOVE_EPSILON => self.index.remove(e.pos, e.id),
            _ => false,
        }
    }

    /// Removes exactly this stored attractor.
    pub fn remove_entry(&mut self, entry: Entry) -> bool {
        self.index.remove(entry.pos, entry.id)
    }

    /// Snapshot of the stored attractors.
    pub fn entries(&self) -> Vec<Entry> {
        self.index.entries()
    }

    /// Snapshot of the current attractor positions.
    pub fn positions(&self) -> Vec<Point2> {
        self.index.entries().into_iter().map(|e| e.pos).collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }
}
