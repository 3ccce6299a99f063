use std::fmt;
use std::str::FromStr;

use glam::DVec2;

use crate::{error::ConfigError, mask::ImageMask, types::Point2};

/// Growth style of a simulation.
///
/// Fixed for the lifetime of a [`crate::venation::Venation`] run; changing
/// it takes effect on the next `setup`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VenationMode {
    /// Each attractor pulls only its nearest node. Produces trees.
    #[default]
    Open,
    /// Each attractor pulls its whole relative neighborhood of nodes, and
    /// jointly reached attractors bridge branches into loops.
    Closed,
}

impl FromStr for VenationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for VenationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// Parameters of the growth algorithm.
///
/// `width` and `height` only define the aspect ratio of the attractor
/// field; the core never renders anything.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Field width in pixels.
    pub width: u32,
    /// Field height in pixels.
    pub height: u32,
    /// Number of candidate attractors drawn by `setup` (before mask thinning).
    pub num_attractors: usize,
    pub mode: VenationMode,
    /// Base capture radius; the effective radius doubles per stagnant step.
    pub growth_radius: f64,
    /// Base step length; the effective rate doubles per stagnant step.
    pub growth_rate: f64,
    /// Distance at which a node (or one of its children) reaches an
    /// attractor in closed mode.
    pub consume_radius: f64,
    /// Quantization levels used when building an [`crate::mask::ImageMask`].
    pub mask_shades: u32,
    /// Seed positions in unit coordinates. `x` is scaled by the aspect
    /// ratio at setup.
    pub seeds: Vec<Point2>,
    /// Width of a leaf node; branch widths are derived from it.
    pub base_width: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            num_attractors: 5000,
            mode: VenationMode::Open,
            growth_radius: 0.1,
            growth_rate: 0.002,
            consume_radius: 0.0005,
            mask_shades: 2,
            seeds: vec![DVec2::ZERO],
            base_width: 0.1,
        }
    }
}

impl Config {
    /// Ratio of field width to height.
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Checks every field, reporting the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }

        for (name, value) in [
            ("growth_radius", self.growth_radius),
            ("growth_rate", self.growth_rate),
            ("consume_radius", self.consume_radius),
            ("base_width", self.base_width),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        if self.mask_shades == 0 {
            return Err(ConfigError::InvalidMaskShades);
        }

        if self.seeds.is_empty() {
            return Err(ConfigError::NoSeeds);
        }
        if let Some((index, seed)) = self
            .seeds
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_finite())
        {
            return Err(ConfigError::NonFiniteSeed {
                index,
                x: seed.x,
                y: seed.y,
            });
        }

        Ok(())
    }

    /// Adopts the dimensions of a mask image. The image's size wins over
    /// whatever was configured before.
    pub fn with_mask_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builds an [`ImageMask`] from packed RGB8 pixels, quantized to
    /// `mask_shades` levels, and adopts the image's size.
    ///
    /// On error the configuration is left unchanged.
    pub fn mask_from_rgb8(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<ImageMask, ConfigError> {
        let mask = ImageMask::from_rgb8(width, height, pixels, self.mask_shades)?;
        *self = std::mem::take(self).with_mask_size(width, height);
        Ok(mask)
    }

    /// Shrinks the field so it fits in `max_width × max_height`, keeping
    /// the aspect ratio. Neither side drops below one pixel. Returns `true`
    /// if the size changed.
    pub fn fit_within(&mut self, max_width: u32, max_height: u32) -> bool {
        let aspect = self.aspect_ratio();
        let (mut width, mut height) = (self.width, self.height);

        if max_width < width {
            width = max_width.max(1);
            height = ((f64::from(width) / aspect) as u32).max(1);
        }
        if max_height < height {
            height = max_height.max(1);
            width = ((f64::from(height) * aspect) as u32).max(1);
        }

        let changed = width != self.width || height != self.height;
        self.width = width;
        self.height = height;
        changed
    }
}
