use crate::types::{NodeId, Point2, Vector2};

/// One vertex of the growing structure.
///
/// Nodes live in a [`crate::forest::Forest`] arena and refer to each other
/// by [`NodeId`].
#[derive(Debug, Clone)]
pub struct GrowthNode {
    pub position: Point2,
    /// Unit heading of the step that created this node.
    pub direction: Vector2,
    pub base_width: f64,
    /// Derived by [`crate::forest::Forest::update_width`].
    pub width: f64,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// For anastomosis bridges: the node whose branch this one merges into.
    /// That node may have been pruned since.
    pub joins: Option<NodeId>,
    /// Set when pruning collapsed this node out of its chain. Retired nodes
    /// are unreachable from every root and are no longer indexed.
    pub retired: bool,
}

impl GrowthNode {
    pub fn new_root(position: Point2, direction: Vector2, base_width: f64) -> Self {
        Self {
            position,
            direction,
            base_width,
            width: base_width,
            parent: None,
            children: Vec::with_capacity(2),
            joins: None,
            retired: false,
        }
    }

    pub fn new_child(position: Point2, direction: Vector2, base_width: f64, parent: NodeId) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new_root(position, direction, base_width)
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
