//! Arena of growth nodes, one tree per seed.
//!
//! Every node ever created gets the next [`NodeId`] and keeps it; pruning
//! retires nodes in place rather than shifting the arena. Roots are listed
//! in seed order.

use crate::{
    node::GrowthNode,
    types::{NodeId, Point2, Vector2},
};

/// Largest per-component difference at which two chain directions still
/// count as the same heading.
pub const DIRECTION_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Default, Clone)]
pub struct Forest {
    pub nodes: Vec<GrowthNode>,
    roots: Vec<NodeId>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &GrowthNode {
        &self.nodes[id]
    }

    /// Number of ids handed out so far, retired nodes included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes still part of a tree.
    pub fn live_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.retired).count()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    pub fn add_root(&mut self, position: Point2, direction: Vector2, base_width: f64) -> NodeId {
        let id = self.nodes.len();
        self.nodes
            .push(GrowthNode::new_root(position, direction, base_width));
        self.roots.push(id);
        id
    }

    /// Appends a child to `parent`. The child inherits the parent's base width.
    pub fn add_child(&mut self, parent: NodeId, position: Point2, direction: Vector2) -> NodeId {
        let id = self.nodes.len();
        let base_width = self.nodes[parent].base_width;
        self.nodes
            .push(GrowthNode::new_child(position, direction, base_width, parent));
        self.nodes[parent].children.push(id);
        id
    }

    /// Closes a loop: adds a leaf under `parent` sitting on `target`'s
    /// position and remembers `target` as the node it joins.
    pub fn add_bridge(&mut self, parent: NodeId, target: NodeId) -> NodeId {
        let from = self.nodes[parent].position;
        let to = self.nodes[target].position;
        let direction = (to - from)
            .try_normalize()
            .unwrap_or(self.nodes[parent].direction);

        let id = self.add_child(parent, to, direction);
        self.nodes[id].joins = Some(target);
        id
    }

    /// `true` if `parent` already has a child at exactly `position`.
    pub fn has_child_at(&self, parent: NodeId, position: Point2) -> bool {
        self.nodes[parent]
            .children
            .iter()
            .any(|&c| self.nodes[c].position == position)
    }

    /// All nodes reachable from `root`, in depth-first pre-order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        order
    }

    /// Recomputes widths bottom-up below `root` and returns the root's width.
    ///
    /// - Leaf: its base width.
    /// - One child: the child's width.
    /// - Several children: `cbrt(Σ child_width³)`, i.e. cross-sectional
    ///   area is preserved at a branch point.
    pub fn update_width(&mut self, root: NodeId) -> f64 {
        // Pre-order reversed visits every child before its parent.
        for id in self.descendants(root).into_iter().rev() {
            let node = &self.nodes[id];
            let width = match node.children.as_slice() {
                [] => node.base_width,
                [only] => self.nodes[*only].width,
                many => many
                    .iter()
                    .map(|&c| self.nodes[c].width.powi(3))
                    .sum::<f64>()
                    .cbrt(),
            };
            self.nodes[id].width = width;
        }
        self.nodes[root].width
    }

    /// Collapses straight single-child chains below `root`.
    ///
    /// For every child `c` of a node `n`, the chain below `c` is followed
    /// while each link has exactly one child lying in the same direction
    /// from `n` as `c` does. `n` then points straight at the last node of
    /// the chain. A bridge ends the chain without being followed, so the
    /// node it hangs from is kept. Skipped nodes are retired and returned
    /// so the caller can drop them from its spatial index.
    pub fn optimize(&mut self, root: NodeId) -> Vec<NodeId> {
        let mut removed = Vec::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            let origin = self.nodes[id].position;

            for slot in 0..self.nodes[id].children.len() {
                let first = self.nodes[id].children[slot];
                let skipped_from = removed.len();

                if let Some(heading) = (self.nodes[first].position - origin).try_normalize() {
                    let mut last = first;
                    while let [next] = self.nodes[last].children[..] {
                        // Bridges are never indexed; `last` stays the growth tip.
                        if self.nodes[next].joins.is_some() {
                            break;
                        }
                        let same = (self.nodes[next].position - origin)
                            .try_normalize()
                            .is_some_and(|d| same_heading(d, heading));
                        if !same {
                            break;
                        }
                        removed.push(last);
                        last = next;
                    }

                    if last != first {
                        for &gone in &removed[skipped_from..] {
                            let node = &mut self.nodes[gone];
                            node.retired = true;
                            node.children.clear();
                            node.parent = None;
                        }
                        self.nodes[id].children[slot] = last;
                        self.nodes[last].parent = Some(id);
                    }
                }

                stack.push(self.nodes[id].children[slot]);
            }
        }

        removed
    }
}

fn same_heading(a: Vector2, b: Vector2) -> bool {
    (a - b).abs().max_element() <= DIRECTION_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn add_child_links_parent_and_inherits_base_width() {
        let mut forest = Forest::new();
        let root = forest.add_root(DVec2::ZERO, DVec2::X, 0.25);
        let child = forest.add_child(root, DVec2::new(1.0, 0.0), DVec2::X);

        assert_eq!(child, 1);
        assert_eq!(forest.node(root).children, vec![child]);
        assert_eq!(forest.node(child).parent, Some(root));
        assert_eq!(forest.node(child).base_width, 0.25);
        assert!(forest.has_child_at(root, DVec2::new(1.0, 0.0)));
        assert!(!forest.has_child_at(root, DVec2::new(1.0, 1e-9)));
    }

    #[test]
    fn update_width_leaf_and_single_child_pass_through() {
        let mut forest = Forest::new();
        let root = forest.add_root(DVec2::ZERO, DVec2::X, 0.1);
        assert!(approx(forest.update_width(root), 0.1));

        let a = forest.add_child(root, DVec2::new(1.0, 0.0), DVec2::X);
        forest.nodes[a].base_width = 0.4;
        assert!(approx(forest.update_width(root), 0.4));
        assert!(approx(forest.node(root).width, forest.node(a).width));
    }

    #[test]
    fn update_width_preserves_area_at_branches() {
        let mut forest = Forest::new();
        let root = forest.add_root(DVec2::ZERO, DVec2::X, 1.0);
        forest.add_child(root, DVec2::new(1.0, 1.0), DVec2::X);
        forest.add_child(root, DVec2::new(1.0, -1.0), DVec2::X);

        let w = forest.update_width(root);
        assert!(approx(w, 2f64.cbrt()));
    }

    #[test]
    fn optimize_collapses_straight_chain_ending_in_branch() {
        let mut forest = Forest::new();
        let a = forest.add_root(DVec2::new(0.0, 0.0), DVec2::X, 0.1);
        let b = forest.add_child(a, DVec2::new(1.0, 0.0), DVec2::X);
        let c = forest.add_child(b, DVec2::new(2.0, 0.0), DVec2::X);
        let d = forest.add_child(c, DVec2::new(3.0, 1.0), DVec2::ONE.normalize());
        let e = forest.add_child(c, DVec2::new(3.0, -1.0), DVec2::new(1.0, -1.0).normalize());

        let removed = forest.optimize(a);

        assert_eq!(removed, vec![b]);
        assert_eq!(forest.node(a).children, vec![c]);
        assert_eq!(forest.node(c).parent, Some(a));
        assert_eq!(forest.node(c).children, vec![d, e]);
        assert!(forest.node(b).retired);
        assert_eq!(forest.descendants(a), vec![a, c, d, e]);
        assert_eq!(forest.live_count(), 4);
    }

    #[test]
    fn optimize_leaves_bent_chain_untouched() {
        let mut forest = Forest::new();
        let a = forest.add_root(DVec2::new(0.0, 0.0), DVec2::X, 0.1);
        let b = forest.add_child(a, DVec2::new(1.0, 0.0), DVec2::X);
        let c = forest.add_child(b, DVec2::new(2.0, 0.5), DVec2::X);

        assert!(forest.optimize(a).is_empty());
        assert_eq!(forest.node(a).children, vec![b]);
        assert_eq!(forest.node(b).children, vec![c]);
    }

    #[test]
    fn optimize_keeps_straight_tip_as_single_edge() {
        let mut forest = Forest::new();
        let a = forest.add_root(DVec2::ZERO, DVec2::X, 0.1);
        let mut tip = a;
        for i in 1..=10 {
            tip = forest.add_child(tip, DVec2::new(0.002 * i as f64, 0.0), DVec2::X);
        }

        let removed = forest.optimize(a);

        assert_eq!(removed.len(), 9);
        assert_eq!(forest.node(a).children, vec![tip]);
    }

    #[test]
    fn bridge_joins_two_trees() {
        let mut forest = Forest::new();
        let a = forest.add_root(DVec2::new(-1.0, 0.0), DVec2::X, 0.1);
        let b = forest.add_root(DVec2::new(1.0, 0.0), -DVec2::X, 0.1);

        let bridge = forest.add_bridge(a, b);

        let node = forest.node(bridge);
        assert_eq!(node.position, DVec2::new(1.0, 0.0));
        assert_eq!(node.direction, DVec2::X);
        assert_eq!(node.joins, Some(b));
        assert_eq!(forest.descendants(a), vec![a, bridge]);
    }

    #[test]
    fn optimize_stops_at_a_collinear_bridge() {
        let mut forest = Forest::new();
        let a = forest.add_root(DVec2::new(-0.01, 0.0), DVec2::X, 0.1);
        let b = forest.add_root(DVec2::new(0.01, 0.0), -DVec2::X, 0.1);
        let tip = forest.add_child(a, DVec2::new(-0.002, 0.0), DVec2::X);
        let bridge = forest.add_bridge(tip, b);

        assert!(forest.optimize(a).is_empty());
        assert_eq!(forest.node(a).children, vec![tip]);
        assert_eq!(forest.node(tip).children, vec![bridge]);
        assert!(!forest.node(tip).retired);
    }

    proptest! {
        #[test]
        fn width_invariant_holds_on_random_trees(
            picks in prop::collection::vec((0usize..1000, -1.0f64..1.0, -1.0f64..1.0, 0.01f64..1.0), 1..80)
        ) {
            let mut forest = Forest::new();
            let root = forest.add_root(DVec2::ZERO, DVec2::X, 0.1);
            for (parent, x, y, base) in picks {
                let parent = parent % forest.len();
                let id = forest.add_child(parent, DVec2::new(x, y), DVec2::X);
                forest.nodes[id].base_width = base;
            }

            forest.update_width(root);

            for node in &forest.nodes {
                let widths: Vec<f64> = node.children.iter().map(|&c| forest.node(c).width).collect();
                match widths.as_slice() {
                    [] => prop_assert_eq!(node.width, node.base_width),
                    [only] => prop_assert_eq!(node.width, *only),
                    many => {
                        let expected = many.iter().map(|w| w.powi(3)).sum::<f64>().cbrt();
                        prop_assert!((node.width - expected).abs() < 1e-12);
                        let widest = many.iter().cloned().fold(0.0, f64::max);
                        prop_assert!(node.width >= widest);
                    }
                }
            }
        }
    }
}
