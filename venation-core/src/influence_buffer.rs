use crate::types::{NodeId, Vector2};

/// A temporary buffer that accumulates directional influence per node.
///
/// For each `NodeId`, this buffer stores:
///
/// - The sum of all incoming influence vectors.
/// - The number of contributions that were added.
///
/// Attractors add one inverse-distance weighted pull per node they
/// influence; growth only needs the direction of the sum, so no averaging
/// happens here.
///
/// Internally, `dir[i]` and `count[i]` correspond to node `i`.
#[derive(Debug, Default)]
pub struct InfluenceBuffer {
    /// Accumulated influence vectors for each node.
    dir: Vec<Vector2>,
    /// Number of contributions for each node.
    pub count: Vec<u32>,
}

impl InfluenceBuffer {
    /// Creates a new [`InfluenceBuffer`] with the given length, all
    /// entries zeroed.
    pub fn with_len(len: usize) -> Self {
        Self {
            dir: vec![Vector2::ZERO; len],
            count: vec![0; len],
        }
    }

    /// Resizes the buffer to `len` entries and clears every entry, even
    /// when the length was already correct.
    pub fn ensure_len(&mut self, len: usize) {
        if self.dir.len() != len {
            self.dir.resize(len, Vector2::ZERO);
            self.count.resize(len, 0);
        }
        self.clear();
    }

    /// Clears all accumulated influences, keeping the length.
    pub fn clear(&mut self) {
        self.dir.fill(Vector2::ZERO);
        self.count.fill(0);
    }

    /// Adds one influence vector for the given node.
    ///
    /// ### Panics
    /// Panics if `id` is out of bounds for the internal arrays.
    #[inline]
    pub fn add(&mut self, id: NodeId, dir: Vector2) {
        self.dir[id] += dir;
        self.count[id] += 1;
    }

    /// Returns the summed influence for a node, or `Vector2::ZERO` if it
    /// received none.
    #[inline]
    pub fn sum(&self, id: NodeId) -> Vector2 {
        self.dir[id]
    }

    #[inline]
    pub fn is_influenced(&self, id: NodeId) -> bool {
        self.count[id] > 0
    }

    /// Returns `true` if no node received any influence.
    pub fn is_empty(&self) -> bool {
        self.count.iter().all(|&c| c == 0)
    }

    /// Returns an iterator over all influenced node ids, in ascending order.
    pub fn influenced_indices(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.count
            .iter()
            .enumerate()
            .filter_map(|(i, &c)| if c > 0 { Some(i) } else { None })
    }
}
