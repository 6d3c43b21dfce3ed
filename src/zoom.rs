//! Render scale stepping
//!
//! The render coordinator owns the scale a page is actually drawn at. This
//! only computes the next scale to request when the reader zooms.

use crate::coords::Scale;

/// Zoom state for the page view
#[derive(Debug, Clone, Copy)]
pub struct Zoom {
    /// Scale of the last rendered page
    factor: f64,
}

impl Default for Zoom {
    fn default() -> Self {
        Self {
            factor: Self::DEFAULT_SCALE,
        }
    }
}

impl Zoom {
    /// Scale used for freshly opened documents
    pub const DEFAULT_SCALE: f64 = 1.5;
    /// Increment per zoom step
    pub const STEP: f64 = 0.25;
    /// Minimum allowed scale
    pub const MIN_SCALE: f64 = 0.5;
    /// Maximum allowed scale
    pub const MAX_SCALE: f64 = 3.0;

    pub fn new(factor: f64) -> Self {
        Self {
            factor: Self::clamp_factor(factor),
        }
    }

    pub fn scale(&self) -> Scale {
        Scale::new(self.factor).unwrap_or_default()
    }

    /// Zoom level as a whole percentage, e.g. `150`
    pub fn percent(&self) -> u32 {
        (self.factor * 100.0).round() as u32
    }

    /// Record the scale the page was actually rendered at. The renderer is
    /// authoritative and may report a scale outside the stepping range; the
    /// next step lands back inside it.
    pub fn sync(&mut self, scale: Scale) {
        self.factor = scale.get();
    }

    /// Scale one step in, or `None` when already at the maximum
    pub fn step_in(&self) -> Option<Scale> {
        if self.factor >= Self::MAX_SCALE {
            return None;
        }
        Scale::new(Self::clamp_factor(self.factor + Self::STEP))
    }

    /// Scale one step out, or `None` when already at the minimum
    pub fn step_out(&self) -> Option<Scale> {
        if self.factor <= Self::MIN_SCALE {
            return None;
        }
        Scale::new(Self::clamp_factor(self.factor - Self::STEP))
    }

    /// Clamp factor to valid range, handling NaN/Inf
    pub fn clamp_factor(factor: f64) -> f64 {
        if !factor.is_finite() {
            Self::DEFAULT_SCALE
        } else {
            factor.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
        }
    }
}
