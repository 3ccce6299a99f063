use thiserror::Error;

/// Rejected configuration.
///
/// Returned by [`crate::config::Config::validate`] and everything that
/// validates through it. Values are never clamped into range: a bad value
/// is reported and the previous configuration stays in effect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown venation mode `{0}` (expected `open` or `closed`)")]
    UnknownMode(String),

    #[error("field size must be non-zero, got {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("`{name}` must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("at least one seed is required")]
    NoSeeds,

    #[error("seed {index} has a non-finite coordinate ({x}, {y})")]
    NonFiniteSeed { index: usize, x: f64, y: f64 },

    #[error("mask_shades must be at least 1")]
    InvalidMaskShades,

    #[error("mask buffer holds {actual} bytes, expected {expected} for a {width}x{height} RGB8 image")]
    MaskSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}
