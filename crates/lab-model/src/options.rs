//! Configuration options for report evaluation.

use serde::{Deserialize, Serialize};

/// Hard cap on formula passes per evaluation.
pub const MAX_FORMULA_PASSES: usize = 3;

/// Options controlling range selection, formula evaluation and status calls.
///
/// Defaults reproduce the established lab rules; overriding them is meant
/// for labs with locally validated thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Bands whose upper age bound is at or below this many days count as
    /// neonatal ("baby-only") bands and rank last for older patients.
    pub baby_band_max_days: i64,

    /// Fixed-point passes over formula rows, clamped into `1..=3`.
    pub formula_max_passes: usize,

    /// A result below `min * critical_low_factor` is Critical.
    pub critical_low_factor: f64,

    /// A result above `max * critical_high_factor` is Critical.
    pub critical_high_factor: f64,

    /// Rounding applied to formula outputs.
    pub decimal_places: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            baby_band_max_days: 60,
            formula_max_passes: MAX_FORMULA_PASSES,
            critical_low_factor: 0.5,
            critical_high_factor: 2.0,
            decimal_places: 2,
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_baby_band_max_days(mut self, days: i64) -> Self {
        self.baby_band_max_days = days;
        self
    }

    #[must_use]
    pub fn with_formula_max_passes(mut self, passes: usize) -> Self {
        self.formula_max_passes = passes;
        self
    }

    #[must_use]
    pub fn with_critical_factors(mut self, low: f64, high: f64) -> Self {
        self.critical_low_factor = low;
        self.critical_high_factor = high;
        self
    }

    /// Formula passes after applying the hard cap.
    pub fn effective_formula_passes(&self) -> usize {
        self.formula_max_passes.clamp(1, MAX_FORMULA_PASSES)
    }
}
