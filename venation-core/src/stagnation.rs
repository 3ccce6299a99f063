/// Upper bound on the backoff exponent. `2^64` already exceeds any field
/// diameter by many orders of magnitude while keeping radii finite.
pub const MAX_BACKOFF_EXPONENT: u32 = 64;

/// Adaptive widening of the capture radius and step size.
///
/// Every step without growth doubles both; every step with growth halves
/// them again, never below their configured base values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stagnation {
    no_growth_count: u32,
}

impl Stagnation {
    pub fn no_growth_count(&self) -> u32 {
        self.no_growth_count
    }

    /// Multiplier applied to the base radius and rate: `2^no_growth_count`.
    pub fn factor(&self) -> f64 {
        2f64.powi(self.no_growth_count as i32)
    }

    /// Records the outcome of one growth phase.
    pub fn record(&mut self, grew: bool) {
        if grew {
            self.no_growth_count = self.no_growth_count.saturating_sub(1);
        } else {
            self.no_growth_count = (self.no_growth_count + 1).min(MAX_BACKOFF_EXPONENT);
        }
    }

    pub fn reset(&mut self) {
        self.no_growth_count = 0;
    }
}
