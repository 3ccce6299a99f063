//! Leaf venation growth by space colonization.
//!
//! A cloud of attractor points pulls a forest of growth nodes toward it;
//! nodes advance one step at a time and consume attractors as they reach
//! them. Two styles are supported: open venation (trees) and closed
//! venation (branches fuse into loops).
//!
//! Main components:
//! - [`venation`]: the growth engine driving one step at a time.
//! - [`phases`]: the attraction, growth, kill and prune phases of a step.
//! - [`forest`] / [`node`]: the node arena, width propagation and pruning.
//! - [`attractor`]: attractor generation, masking and removal.
//! - [`spatial`]: proximity indices over node and attractor positions.
//! - [`mask`]: brightness masks that shape the attractor density.
//! - [`config`] / [`error`]: configuration and its validation.
//! - [`influence_buffer`]: per-node accumulation of attractor pulls.
//! - [`stagnation`]: backoff that widens the search after idle steps.
//! - [`rng`]: seedable generators for reproducible runs.
//! - [`types`]: shared type aliases and IDs.

pub mod attractor;
pub mod config;
pub mod error;
pub mod forest;
pub mod influence_buffer;
pub mod mask;
pub mod node;
pub mod phases;
pub mod rng;
pub mod spatial;
pub mod stagnation;
pub mod types;
pub mod venation;

pub use config::{Config, VenationMode};
pub use error::ConfigError;
pub use venation::Venation;
