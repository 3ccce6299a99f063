//! Brightness masks that shape where attractors survive.
//!
//! A mask maps a normalized point (`x`, `y` in `[0, 1]`, `y` pointing up)
//! to a keep probability in `[0, 1]`. Brighter regions keep more
//! attractors and therefore grow denser structure.

use crate::error::ConfigError;

pub trait MaskSampler {
    /// Keep probability at the normalized point `(x, y)`.
    fn brightness(&self, x: f64, y: f64) -> f64;
}

impl<F> MaskSampler for F
where
    F: Fn(f64, f64) -> f64,
{
    fn brightness(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// A quantized grayscale grid built from an RGB8 image buffer.
#[derive(Debug, Clone)]
pub struct ImageMask {
    width: u32,
    height: u32,
    /// Row-major, first row is the top of the image.
    shades: Vec<f64>,
}

impl ImageMask {
    /// Converts packed RGB8 pixels into brightness levels.
    ///
    /// Each pixel's mean channel value is rounded to one of `shades + 1`
    /// evenly spaced levels in `[0, 1]`, so `shades = 1` gives a pure
    /// black-and-white mask.
    pub fn from_rgb8(
        width: u32,
        height: u32,
        pixels: &[u8],
        shades: u32,
    ) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidSize { width, height });
        }
        if shades == 0 {
            return Err(ConfigError::InvalidMaskShades);
        }

        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(ConfigError::MaskSizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }

        let levels = f64::from(shades);
        let shades = pixels
            .chunks_exact(3)
            .map(|px| {
                let mean = px.iter().map(|&c| f64::from(c) / 255.0).sum::<f64>() / 3.0;
                (mean * levels).round() / levels
            })
            .collect();

        Ok(Self {
            width,
            height,
            shades,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Brightness of the pixel at column `x`, row `y` (row 0 at the top).
    pub fn pixel(&self, x: u32, y: u32) -> f64 {
        self.shades[y as usize * self.width as usize + x as usize]
    }
}

impl MaskSampler for ImageMask {
    fn brightness(&self, x: f64, y: f64) -> f64 {
        let max_x = f64::from(self.width - 1);
        let max_y = f64::from(self.height - 1);
        let ix = (x * max_x).round().clamp(0.0, max_x) as u32;
        // Image rows run top to bottom, field y runs bottom to top.
        let iy = ((1.0 - y) * max_y).round().clamp(0.0, max_y) as u32;
        self.pixel(ix, iy)
    }
}
