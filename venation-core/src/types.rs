use glam::DVec2;

/// Identifier for a node in a [`crate::forest::Forest`].
///
/// This is an index into `Forest::nodes`. Ids are never reused: pruned
/// nodes keep their slot, so an id stays valid for the lifetime of a
/// given `Forest` instance.
pub type NodeId = usize;

/// A position in simulation space.
///
/// The field spans `[-aspect_ratio, aspect_ratio] × [-1, 1]`.
pub type Point2 = DVec2;

/// A direction or displacement in simulation space.
pub type Vector2 = DVec2;
