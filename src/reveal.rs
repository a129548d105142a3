//! One-shot "in view" latch for page sections.

use crate::config::ConfigError;
use crate::layout::Rect;

/// Fraction of `rect`'s height that lies inside a viewport of the given
/// height. Zero-height rects count as invisible.
pub fn visible_fraction(rect: &Rect, viewport_height: f32) -> f32 {
    if !(rect.height > 0.0) {
        return 0.0;
    }
    let top = rect.top.max(0.0);
    let bottom = rect.bottom().min(viewport_height);
    ((bottom - top) / rect.height).clamp(0.0, 1.0)
}

/// Latches once the visible fraction reaches the threshold and never resets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibilityLatch {
    threshold: f32,
    revealed: bool,
}

impl VisibilityLatch {
    pub fn new(threshold: f32) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }
        Ok(Self {
            threshold,
            revealed: false,
        })
    }

    /// Returns true only on the observation that first crosses the threshold.
    pub fn observe(&mut self, fraction: f32) -> bool {
        if self.revealed || !(fraction > 0.0) || fraction < self.threshold {
            return false;
        }
        self.revealed = true;
        true
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }
}
