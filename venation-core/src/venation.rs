//! The growth engine: owns the attractor field, the node forest and both
//! spatial indices, and advances them one step at a time.

use glam::DVec2;
use rand::Rng;
use tracing::{debug, trace};

use crate::{
    attractor::AttractorField,
    config::{Config, VenationMode},
    error::ConfigError,
    forest::Forest,
    influence_buffer::InfluenceBuffer,
    mask::MaskSampler,
    phases::{self, StepParams},
    spatial::{PointIndex, SpatialIndex},
    stagnation::Stagnation,
    types::{NodeId, Point2, Vector2},
};

/// A space-colonization venation simulation.
///
/// Typical use:
///
/// 1. [`Venation::new`] with a validated [`Config`].
/// 2. [`Venation::setup`] to scatter attractors and plant the seeds.
/// 3. [`Venation::step`] repeatedly; read [`Venation::nodes`] and
///    [`Venation::attractors`] between steps to render.
///
/// A step always completes. Degenerate geometry is skipped locally and a
/// step without growth only widens the search for the next one.
#[derive(Debug)]
pub struct Venation<I = PointIndex> {
    cfg: Config,
    attractors: AttractorField<I>,
    forest: Forest,
    node_index: I,
    acc: InfluenceBuffer,
    stagnation: Stagnation,
    steps: u64,
}

impl Venation<PointIndex> {
    /// Creates an empty simulation backed by R-tree indices.
    pub fn new(cfg: Config) -> Result<Self, ConfigError> {
        Self::with_index(cfg)
    }
}

impl<I: SpatialIndex> Venation<I> {
    /// Creates an empty simulation backed by indices of type `I`.
    pub fn with_index(cfg: Config) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            attractors: AttractorField::new(),
            forest: Forest::new(),
            node_index: I::default(),
            acc: InfluenceBuffer::default(),
            stagnation: Stagnation::default(),
            steps: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Replaces the configuration. Takes effect from the next step; mode,
    /// size, attractor count and seeds matter only on the next `setup`.
    pub fn set_config(&mut self, cfg: Config) -> Result<(), ConfigError> {
        cfg.validate()?;
        self.cfg = cfg;
        Ok(())
    }

    /// Discards all state, scatters a fresh attractor field and plants one
    /// root per configured seed.
    pub fn setup<R>(&mut self, rng: &mut R, mask: Option<&dyn MaskSampler>)
    where
        R: Rng + ?Sized,
    {
        self.clear();
        self.reseed_attractors(rng, mask);

        let aspect = self.cfg.aspect_ratio();
        for seed in self.cfg.seeds.clone() {
            self.add_seed(DVec2::new(seed.x * aspect, seed.y), rng);
        }

        debug!(
            mode = %self.cfg.mode,
            attractors = self.attractors.len(),
            seeds = self.forest.roots().len(),
            "venation setup"
        );
    }

    /// Adds another `num_attractors` candidates over the whole field.
    ///
    /// Returns the number kept after masking.
    pub fn reseed_attractors<R>(&mut self, rng: &mut R, mask: Option<&dyn MaskSampler>) -> usize
    where
        R: Rng + ?Sized,
    {
        self.attractors.generate(
            self.cfg.num_attractors,
            self.cfg.aspect_ratio(),
            mask,
            rng,
        )
    }

    /// Plants a new root at `position` (field coordinates) with a random
    /// initial heading in the positive quadrant.
    pub fn add_seed<R>(&mut self, position: Point2, rng: &mut R) -> NodeId
    where
        R: Rng + ?Sized,
    {
        let heading = DVec2::new(rng.random(), rng.random())
            .try_normalize()
            .unwrap_or(DVec2::X);
        self.add_seed_with_heading(position, heading)
    }

    /// Plants a new root at `position` with the given initial heading.
    pub fn add_seed_with_heading(&mut self, position: Point2, heading: Vector2) -> NodeId {
        let id = self
            .forest
            .add_root(position, heading, self.cfg.base_width);
        self.node_index.insert(position, id);
        id
    }

    /// Removes every node and attractor and resets the backoff.
    pub fn clear(&mut self) {
        self.attractors.clear();
        self.forest.clear();
        self.node_index.clear();
        self.acc = InfluenceBuffer::default();
        self.stagnation.reset();
        self.steps = 0;
    }

    /// Capture radius for the next step: the base radius times
    /// `2^no_growth_count`.
    pub fn growth_radius(&self) -> f64 {
        self.cfg.growth_radius * self.stagnation.factor()
    }

    /// Step length for the next step: the base rate times
    /// `2^no_growth_count`.
    pub fn growth_rate(&self) -> f64 {
        self.cfg.growth_rate * self.stagnation.factor()
    }

    pub fn no_growth_count(&self) -> u32 {
        self.stagnation.no_growth_count()
    }

    /// Number of completed steps since the last setup.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Snapshot of the current attractor positions.
    pub fn attractors(&self) -> Vec<Point2> {
        self.attractors.positions()
    }

    pub fn attractor_count(&self) -> usize {
        self.attractors.len()
    }

    pub fn attractor_field(&self) -> &AttractorField<I> {
        &self.attractors
    }

    pub fn attractor_field_mut(&mut self) -> &mut AttractorField<I> {
        &mut self.attractors
    }

    /// The growth forest. Walk it from [`Forest::roots`].
    pub fn nodes(&self) -> &Forest {
        &self.forest
    }

    /// Nodes still part of a tree (pruned ones excluded).
    pub fn live_node_count(&self) -> usize {
        self.forest.live_count()
    }

    fn step_params(&self) -> StepParams {
        StepParams {
            growth_radius: self.growth_radius(),
            growth_rate: self.growth_rate(),
            consume_radius: self.cfg.consume_radius,
        }
    }

    /// Advances the simulation by one step: attraction, growth,
    /// consumption, then pruning and width update.
    pub fn step(&mut self) {
        let params = self.step_params();

        let (new_ids, consumed, bridges) = match self.cfg.mode {
            VenationMode::Open => {
                let candidates = phases::open_attraction_phase(
                    &self.forest,
                    &self.node_index,
                    &self.attractors,
                    &params,
                    &mut self.acc,
                );
                let new_ids = phases::growth_phase(
                    &mut self.forest,
                    &mut self.node_index,
                    &self.acc,
                    params.growth_rate,
                );
                let consumed = phases::open_kill_phase(
                    &self.node_index,
                    &mut self.attractors,
                    &candidates,
                    params.open_reach(),
                );
                (new_ids, consumed, 0)
            }
            VenationMode::Closed => {
                let captures = phases::closed_attraction_phase(
                    &self.forest,
                    &self.node_index,
                    &self.attractors,
                    &params,
                    &mut self.acc,
                );
                let new_ids = phases::growth_phase(
                    &mut self.forest,
                    &mut self.node_index,
                    &self.acc,
                    params.growth_rate,
                );
                let (consumed, bridges) = phases::closed_kill_phase(
                    &mut self.forest,
                    &mut self.attractors,
                    &captures,
                    params.consume_radius,
                );
                (new_ids, consumed, bridges.len())
            }
        };

        let influenced = self.acc.influenced_indices().count();
        let before = self.stagnation.no_growth_count();
        self.stagnation.record(!new_ids.is_empty());
        if self.stagnation.no_growth_count() > before {
            debug!(
                no_growth_count = self.stagnation.no_growth_count(),
                growth_radius = self.growth_radius(),
                "no growth, widening search"
            );
        }

        let pruned = phases::prune_phase(&mut self.forest, &mut self.node_index);
        self.steps += 1;

        trace!(
            step = self.steps,
            mode = %self.cfg.mode,
            influenced,
            grown = new_ids.len(),
            consumed,
            bridges,
            pruned,
            attractors = self.attractors.len(),
            "step complete"
        );
    }
}
