//! Simulation phases for the node–attractor system.
//!
//! One step runs:
//! 1. An attraction phase: [`open_attraction_phase`] (each attractor pulls
//!    its nearest node) or [`closed_attraction_phase`] (each attractor pulls
//!    its relative neighborhood), accumulating pulls in an
//!    [`InfluenceBuffer`].
//! 2. [`growth_phase`]: every influenced node grows one child along its
//!    summed pull.
//! 3. A kill phase: [`open_kill_phase`] or [`closed_kill_phase`] removes
//!    reached attractors; the closed variant also bridges branches that
//!    reached one together.
//! 4. [`prune_phase`]: straight chains are collapsed and widths refreshed.

use tracing::trace;

use crate::{
    attractor::AttractorField,
    forest::Forest,
    influence_buffer::InfluenceBuffer,
    spatial::{Entry, SpatialIndex},
    types::{NodeId, Point2, Vector2},
};

/// Below this per-axis magnitude the sum of a node's heading and its new
/// growth direction means the node is being pulled straight backwards.
pub const BACKWARD_THRESHOLD: f64 = 0.01;

/// Effective distances for one step, after stagnation backoff.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepParams {
    pub growth_radius: f64,
    pub growth_rate: f64,
    pub consume_radius: f64,
}

impl StepParams {
    /// Distances at or below this are treated as coincident points.
    pub fn degenerate_epsilon(&self) -> f64 {
        self.consume_radius * 0.01
    }

    /// Open-mode reach: an attractor whose nearest node is closer than half
    /// a step can no longer be approached any further.
    ///
    /// Follows `growth_rate`, so it widens with the stagnation backoff too:
    /// after `k` idle steps it is `2^k` times the base half step. A node
    /// stepping straight at an attractor always lands within this reach.
    pub fn open_reach(&self) -> f64 {
        self.growth_rate * 0.5
    }
}

/// An attractor together with the nodes it pulled this step.
///
/// An empty `nodes` list means a node already sits on the attractor.
#[derive(Clone, Debug, PartialEq)]
pub struct Capture {
    pub attractor: Entry,
    pub nodes: Vec<NodeId>,
}

/// Pull of an attractor on a node `dist` away along `delta`: the unit
/// direction, weighted by inverse distance.
#[inline]
fn pull(delta: Vector2, dist: f64) -> Vector2 {
    delta / dist / dist
}

/// Open venation: every attractor pulls its single nearest node.
///
/// For each attractor:
///
/// 1. Looks up the nearest node in `node_index`.
/// 2. If `epsilon < dist < growth_radius`, adds the pull toward the
///    attractor to that node's entry in `acc`.
///
/// The buffer is resized (and cleared) to `forest.len()` first.
///
/// ### Returns
/// The attractors that may be consumed after growth: every influencing
/// attractor plus any lying on a node already.
pub fn open_attraction_phase<I, J>(
    forest: &Forest,
    node_index: &I,
    attractors: &AttractorField<J>,
    params: &StepParams,
    acc: &mut InfluenceBuffer,
) -> Vec<Entry>
where
    I: SpatialIndex,
    J: SpatialIndex,
{
    acc.ensure_len(forest.len());
    let epsilon = params.degenerate_epsilon();
    let mut candidates = Vec::new();

    for a in attractors.entries() {
        let Some(node) = node_index.nearest(a.pos) else {
            continue;
        };
        let delta = a.pos - node.pos;
        let dist = delta.length();

        if dist <= epsilon {
            candidates.push(a);
        } else if dist < params.growth_radius {
            acc.add(node.id, pull(delta, dist));
            candidates.push(a);
        }
    }

    candidates
}

/// Keeps the candidates that form the relative neighborhood of `s`.
///
/// A candidate `v` is dropped if some other candidate `u` is at least as
/// close to both `s` and `v` as `v` is to `s`:
/// `‖v − s‖ ≥ max(‖u − s‖, ‖v − u‖)`.
///
/// A dominating `u` is never farther from `s` than `v`, so given every
/// point within some radius of `s` the result is the exact relative
/// neighborhood of `s` inside that radius. Only closer candidates are
/// tested against each `v`.
///
/// ### Returns
/// The kept candidates ordered by distance to `s` (stable for ties).
pub fn relative_neighborhood(s: Point2, candidates: &[Entry]) -> Vec<Entry> {
    let mut by_distance: Vec<(f64, Entry)> =
        candidates.iter().map(|&c| (c.pos.distance(s), c)).collect();
    by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));

    by_distance
        .iter()
        .filter(|&&(v_s, v)| {
            !by_distance
                .iter()
                .take_while(|&&(u_s, _)| u_s <= v_s)
                .any(|&(_, u)| u.pos != v.pos && v_s >= v.pos.distance(u.pos))
        })
        .map(|&(_, v)| v)
        .collect()
}

/// Closed venation: every attractor pulls all nodes in its relative
/// neighborhood.
///
/// For each attractor `s`:
///
/// 1. Gathers the nodes within the current growth radius of `s`.
/// 2. Filters them with [`relative_neighborhood`].
/// 3. Each remaining node `v` with `epsilon < ‖s − v‖ < growth_radius`
///    receives the pull toward `s` and is recorded against `s`.
///
/// An attractor with a node within `epsilon` is captured with no nodes,
/// which makes it consumed unconditionally in [`closed_kill_phase`].
pub fn closed_attraction_phase<I, J>(
    forest: &Forest,
    node_index: &I,
    attractors: &AttractorField<J>,
    params: &StepParams,
    acc: &mut InfluenceBuffer,
) -> Vec<Capture>
where
    I: SpatialIndex,
    J: SpatialIndex,
{
    acc.ensure_len(forest.len());
    let epsilon = params.degenerate_epsilon();
    let mut captures = Vec::new();

    for s in attractors.entries() {
        let nearby = node_index.within_radius(s.pos, params.growth_radius);
        let Some(closest) = nearby.first() else {
            continue;
        };

        if closest.pos.distance(s.pos) <= epsilon {
            captures.push(Capture {
                attractor: s,
                nodes: Vec::new(),
            });
            continue;
        }

        let mut nodes = Vec::new();
        for v in relative_neighborhood(s.pos, &nearby) {
            let delta = s.pos - v.pos;
            let dist = delta.length();
            if dist > epsilon && dist < params.growth_radius {
                acc.add(v.id, pull(delta, dist));
                nodes.push(v.id);
            }
        }

        if !nodes.is_empty() {
            captures.push(Capture { attractor: s, nodes });
        }
    }

    captures
}

/// Grows one child for every influenced node.
///
/// For each node with at least one influence:
///
/// 1. Normalize the summed pull to a direction `d`. A pull that cancels
///    out to zero grows nothing.
/// 2. If `d` points straight back along the node's heading, keep the
///    heading instead; branches never retreat.
/// 3. Propose a child at `position + d * growth_rate`.
/// 4. Skip it if the node already has a child at exactly that position.
///
/// New nodes are appended to `forest`, then inserted into `node_index` as
/// one batch.
///
/// ### Returns
/// The ids of the created nodes, in ascending order.
pub fn growth_phase<I: SpatialIndex>(
    forest: &mut Forest,
    node_index: &mut I,
    acc: &InfluenceBuffer,
    growth_rate: f64,
) -> Vec<NodeId> {
    let mut to_add = Vec::with_capacity(16);

    for id in acc.influenced_indices() {
        let Some(mut dir) = acc.sum(id).try_normalize() else {
            continue;
        };

        let parent = forest.node(id);
        let back = parent.direction + dir;
        if back.x.abs() < BACKWARD_THRESHOLD && back.y.abs() < BACKWARD_THRESHOLD {
            dir = parent.direction;
        }

        let new_pos = parent.position + dir * growth_rate;
        if forest.has_child_at(id, new_pos) {
            continue;
        }

        let heading = (new_pos - parent.position).try_normalize().unwrap_or(dir);
        to_add.push((id, new_pos, heading));
    }

    let mut queued = Vec::with_capacity(to_add.len());
    for (parent, pos, heading) in to_add {
        queued.push((pos, forest.add_child(parent, pos, heading)));
    }
    let new_ids = queued.iter().map(|&(_, id)| id).collect();
    node_index.extend(queued);
    new_ids
}

/// Removes open-mode candidates whose nearest node is now within reach.
///
/// ### Returns
/// The number of attractors removed.
pub fn open_kill_phase<I, J>(
    node_index: &I,
    attractors: &mut AttractorField<J>,
    candidates: &[Entry],
    reach: f64,
) -> usize
where
    I: SpatialIndex,
    J: SpatialIndex,
{
    let mut consumed = 0;
    for a in candidates {
        let reached = node_index
            .nearest(a.pos)
            .is_some_and(|node| node.pos.distance(a.pos) < reach);
        if reached && attractors.remove_entry(*a) {
            consumed += 1;
        }
    }
    consumed
}

/// `true` if the node or one of its direct children lies within `radius`
/// of `s`.
pub fn has_consumed(forest: &Forest, id: NodeId, s: Point2, radius: f64) -> bool {
    let node = forest.node(id);
    node.position.distance(s) < radius
        || node
            .children
            .iter()
            .any(|&c| forest.node(c).position.distance(s) < radius)
}

/// Removes closed-mode attractors reached by every node they pulled.
///
/// When exactly two nodes reached an attractor together, their branches
/// are joined: a bridge leaf is added under the newest child of the first
/// node if it has children, else under the newest child of the second,
/// else directly under the first node.
///
/// ### Returns
/// The number of attractors removed and the ids of the bridge nodes.
pub fn closed_kill_phase<J: SpatialIndex>(
    forest: &mut Forest,
    attractors: &mut AttractorField<J>,
    captures: &[Capture],
    consume_radius: f64,
) -> (usize, Vec<NodeId>) {
    let mut consumed = 0;
    let mut bridges = Vec::new();

    for capture in captures {
        let s = capture.attractor.pos;
        let reached = capture
            .nodes
            .iter()
            .all(|&id| has_consumed(forest, id, s, consume_radius));
        if !reached || !attractors.remove_entry(capture.attractor) {
            continue;
        }
        consumed += 1;

        if let [first, second] = capture.nodes[..] {
            let bridge = match (
                forest.node(first).children.last().copied(),
                forest.node(second).children.last().copied(),
            ) {
                (Some(tip), _) => forest.add_bridge(tip, second),
                (None, Some(tip)) => forest.add_bridge(tip, first),
                (None, None) => forest.add_bridge(first, second),
            };
            bridges.push(bridge);
        }
    }

    (consumed, bridges)
}

/// Collapses straight chains under every root, drops the collapsed nodes
/// from `node_index`, then recomputes widths.
///
/// ### Returns
/// The number of nodes pruned.
pub fn prune_phase<I: SpatialIndex>(forest: &mut Forest, node_index: &mut I) -> usize {
    let mut pruned = 0;
    for root in forest.roots().to_vec() {
        for id in forest.optimize(root) {
            // Bridges were never indexed; nothing to remove for them.
            node_index.remove(forest.node(id).position, id);
            pruned += 1;
        }
        forest.update_width(root);
    }
    trace!(pruned, "pruned straight chains");
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::PointIndex;
    use glam::DVec2;

    fn params() -> StepParams {
        StepParams {
            growth_radius: 0.1,
            growth_rate: 0.002,
            consume_radius: 0.0005,
        }
    }

    /// A forest with one root per position, indexed.
    fn seeded(positions: &[Point2]) -> (Forest, PointIndex) {
        let mut forest = Forest::new();
        let mut index = PointIndex::new();
        for &p in positions {
            let id = forest.add_root(p, DVec2::new(0.6, 0.8), 0.1);
            index.insert(p, id);
        }
        (forest, index)
    }

    #[test]
    fn open_reach_widens_with_backoff() {
        let base = params();
        let backed_off = StepParams {
            growth_rate: base.growth_rate * 32.0,
            ..base
        };

        assert_eq!(base.open_reach(), 0.001);
        assert_eq!(backed_off.open_reach(), 0.032);
        assert_eq!(backed_off.degenerate_epsilon(), base.degenerate_epsilon());
    }

    #[test]
    fn open_attraction_accumulates_inverse_distance_pull() {
        let (forest, index) = seeded(&[DVec2::ZERO]);
        let attractors: AttractorField = AttractorField::from_positions([
            DVec2::new(0.05, 0.0),
            DVec2::new(0.0, 0.025),
        ]);
        let mut acc = InfluenceBuffer::default();

        let candidates = open_attraction_phase(&forest, &index, &attractors, &params(), &mut acc);

        assert_eq!(candidates.len(), 2);
        assert_eq!(acc.count, vec![2]);
        let sum = acc.sum(0);
        assert!((sum.x - 20.0).abs() < 1e-9);
        assert!((sum.y - 40.0).abs() < 1e-9);
    }

    #[test]
    fn open_attraction_ignores_attractors_outside_radius() {
        let (forest, index) = seeded(&[DVec2::ZERO]);
        let attractors: AttractorField = AttractorField::from_positions([DVec2::new(0.5, 0.0)]);
        let mut acc = InfluenceBuffer::default();

        let candidates = open_attraction_phase(&forest, &index, &attractors, &params(), &mut acc);

        assert!(candidates.is_empty());
        assert_eq!(acc.count.len(), 1);
        assert!(acc.is_empty());
    }

    #[test]
    fn attractor_on_a_node_is_a_candidate_without_pull() {
        let (forest, index) = seeded(&[DVec2::ZERO]);
        let attractors: AttractorField = AttractorField::from_positions([DVec2::ZERO]);
        let mut acc = InfluenceBuffer::default();

        let candidates = open_attraction_phase(&forest, &index, &attractors, &params(), &mut acc);

        assert_eq!(candidates.len(), 1);
        assert!(acc.is_empty());
    }

    #[test]
    fn relative_neighborhood_drops_dominated_candidates() {
        let s = DVec2::ZERO;
        let near = Entry::new(DVec2::new(1.0, 0.0), 0);
        // Behind `near` as seen from `s`: `near` is closer to both.
        let shadowed = Entry::new(DVec2::new(2.0, 0.1), 1);
        let side = Entry::new(DVec2::new(0.0, 1.0), 2);

        let kept = relative_neighborhood(s, &[near, shadowed, side]);

        assert_eq!(kept, vec![near, side]);
    }

    #[test]
    fn relative_neighborhood_keeps_both_ends_of_a_symmetric_pair() {
        let s = DVec2::ZERO;
        let left = Entry::new(DVec2::new(-1.0, 0.0), 0);
        let right = Entry::new(DVec2::new(1.0, 0.0), 1);

        assert_eq!(relative_neighborhood(s, &[left, right]), vec![left, right]);
    }

    #[test]
    fn closed_attraction_records_every_pulled_node() {
        let (forest, index) = seeded(&[DVec2::new(-0.02, 0.0), DVec2::new(0.02, 0.0)]);
        let attractors: AttractorField = AttractorField::from_positions([DVec2::ZERO]);
        let mut acc = InfluenceBuffer::default();

        let captures = closed_attraction_phase(&forest, &index, &attractors, &params(), &mut acc);

        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].nodes, vec![0, 1]);
        assert!(acc.sum(0).x > 0.0);
        assert!(acc.sum(1).x < 0.0);
    }

    #[test]
    fn closed_attraction_skips_nodes_shadowed_by_a_closer_node() {
        let (forest, index) = seeded(&[DVec2::new(0.01, 0.0), DVec2::new(0.02, 0.0001)]);
        let attractors: AttractorField = AttractorField::from_positions([DVec2::ZERO]);
        let mut acc = InfluenceBuffer::default();

        assert_eq!(index.within_radius(DVec2::ZERO, 0.1).len(), 2);
        let captures = closed_attraction_phase(&forest, &index, &attractors, &params(), &mut acc);

        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].nodes, vec![0]);
        assert!(!acc.is_influenced(1));
    }

    #[test]
    fn closed_attractor_on_a_node_is_consumed_outright() {
        let (mut forest, index) = seeded(&[DVec2::ZERO, DVec2::new(0.03, 0.0)]);
        let mut attractors: AttractorField = AttractorField::from_positions([DVec2::ZERO]);
        let mut acc = InfluenceBuffer::default();

        let captures = closed_attraction_phase(&forest, &index, &attractors, &params(), &mut acc);
        assert_eq!(captures.len(), 1);
        assert!(captures[0].nodes.is_empty());
        assert!(acc.is_empty());

        let (consumed, bridges) =
            closed_kill_phase(&mut forest, &mut attractors, &captures, params().consume_radius);
        assert_eq!(consumed, 1);
        assert!(bridges.is_empty());
        assert!(attractors.is_empty());
    }

    #[test]
    fn growth_phase_creates_child_in_influence_direction() {
        let (mut forest, mut index) = seeded(&[DVec2::ZERO]);
        let mut acc = InfluenceBuffer::with_len(1);
        acc.add(0, DVec2::new(3.0, 0.0));

        let new_ids = growth_phase(&mut forest, &mut index, &acc, 2.0);

        assert_eq!(new_ids, vec![1]);
        let child = forest.node(1);
        assert_eq!(child.position, DVec2::new(2.0, 0.0));
        assert_eq!(child.direction, DVec2::X);
        assert_eq!(child.base_width, forest.node(0).base_width);
        assert_eq!(forest.node(0).children, vec![1]);
        assert_eq!(index.nearest(DVec2::new(2.1, 0.0)).map(|e| e.id), Some(1));
    }

    #[test]
    fn growth_phase_skips_duplicate_child() {
        let (mut forest, mut index) = seeded(&[DVec2::ZERO]);
        forest.add_child(0, DVec2::new(2.0, 0.0), DVec2::X);
        let mut acc = InfluenceBuffer::with_len(2);
        acc.add(0, DVec2::X);

        let new_ids = growth_phase(&mut forest, &mut index, &acc, 2.0);

        assert!(new_ids.is_empty());
        assert_eq!(forest.len(), 2);
    }

    #[test]
    fn growth_phase_refuses_to_grow_backwards() {
        let mut forest = Forest::new();
        let mut index = PointIndex::new();
        let root = forest.add_root(DVec2::ZERO, DVec2::X, 0.1);
        index.insert(DVec2::ZERO, root);
        let mut acc = InfluenceBuffer::with_len(1);
        acc.add(root, DVec2::new(-1.0, 0.0));

        let new_ids = growth_phase(&mut forest, &mut index, &acc, 0.5);

        assert_eq!(forest.node(new_ids[0]).position, DVec2::new(0.5, 0.0));
    }

    #[test]
    fn growth_phase_skips_cancelled_pull() {
        let (mut forest, mut index) = seeded(&[DVec2::ZERO]);
        let mut acc = InfluenceBuffer::with_len(1);
        acc.add(0, DVec2::X);
        acc.add(0, -DVec2::X);

        assert!(growth_phase(&mut forest, &mut index, &acc, 1.0).is_empty());
    }

    #[test]
    fn open_kill_phase_removes_only_reached_attractors() {
        let (_, index) = seeded(&[DVec2::ZERO]);
        let mut attractors: AttractorField =
            AttractorField::from_positions([DVec2::new(0.0005, 0.0), DVec2::new(0.05, 0.0)]);
        let candidates = attractors.entries();

        let consumed = open_kill_phase(&index, &mut attractors, &candidates, 0.001);

        assert_eq!(consumed, 1);
        assert_eq!(attractors.positions(), vec![DVec2::new(0.05, 0.0)]);
    }

    #[test]
    fn closed_kill_requires_every_pulled_node() {
        let (mut forest, _) = seeded(&[DVec2::new(-0.01, 0.0), DVec2::new(0.01, 0.0)]);
        forest.add_child(0, DVec2::new(-0.0001, 0.0), DVec2::X);
        let mut attractors: AttractorField = AttractorField::from_positions([DVec2::ZERO]);
        let capture = Capture {
            attractor: attractors.entries()[0],
            nodes: vec![0, 1],
        };

        let (consumed, bridges) =
            closed_kill_phase(&mut forest, &mut attractors, &[capture.clone()], 0.0005);
        assert_eq!(consumed, 0);
        assert!(bridges.is_empty());

        forest.add_child(1, DVec2::new(0.0001, 0.0), -DVec2::X);
        let (consumed, bridges) = closed_kill_phase(&mut forest, &mut attractors, &[capture], 0.0005);
        assert_eq!(consumed, 1);
        assert!(attractors.is_empty());

        // Bridge hangs off the first node's newest child and lands on the second node.
        let bridge = forest.node(bridges[0]);
        assert_eq!(bridge.parent, Some(2));
        assert_eq!(bridge.position, DVec2::new(0.01, 0.0));
        assert_eq!(bridge.joins, Some(1));
    }

    #[test]
    fn closed_kill_bridges_childless_pair_directly() {
        let (mut forest, _) = seeded(&[DVec2::new(-0.0001, 0.0), DVec2::new(0.0001, 0.0)]);
        let mut attractors: AttractorField = AttractorField::from_positions([DVec2::ZERO]);
        let capture = Capture {
            attractor: attractors.entries()[0],
            nodes: vec![0, 1],
        };

        let (consumed, bridges) = closed_kill_phase(&mut forest, &mut attractors, &[capture], 0.0005);

        assert_eq!(consumed, 1);
        assert_eq!(forest.node(bridges[0]).parent, Some(0));
    }

    #[test]
    fn closed_kill_with_three_nodes_consumes_without_bridging() {
        let (mut forest, _) = seeded(&[
            DVec2::new(-0.01, 0.0),
            DVec2::new(0.01, 0.0),
            DVec2::new(0.0, 0.01),
        ]);
        forest.add_child(0, DVec2::new(-0.0001, 0.0), DVec2::X);
        forest.add_child(1, DVec2::new(0.0001, 0.0), -DVec2::X);
        forest.add_child(2, DVec2::new(0.0, 0.0001), -DVec2::Y);
        let mut attractors: AttractorField = AttractorField::from_positions([DVec2::ZERO]);
        let capture = Capture {
            attractor: attractors.entries()[0],
            nodes: vec![0, 1, 2],
        };

        let (consumed, bridges) = closed_kill_phase(&mut forest, &mut attractors, &[capture], 0.0005);

        assert_eq!(consumed, 1);
        assert!(attractors.is_empty());
        assert!(bridges.is_empty());
        assert_eq!(forest.len(), 6);
        assert!(forest.nodes.iter().all(|n| n.joins.is_none()));
    }

    #[test]
    fn prune_phase_unindexes_collapsed_nodes_and_updates_width() {
        let (mut forest, mut index) = seeded(&[DVec2::ZERO]);
        let a = forest.add_child(0, DVec2::new(1.0, 0.0), DVec2::X);
        index.insert(DVec2::new(1.0, 0.0), a);
        let b = forest.add_child(a, DVec2::new(2.0, 0.0), DVec2::X);
        index.insert(DVec2::new(2.0, 0.0), b);

        assert_eq!(prune_phase(&mut forest, &mut index), 1);
        assert_eq!(index.len(), 2);
        assert!(index.entries().iter().all(|e| e.id != a));
        assert_eq!(forest.node(0).children, vec![b]);
        assert_eq!(forest.node(0).width, 0.1);
    }
}
