//! Exponential smoothing shared by every animated quantity.
//!
//! Input events only ever move a `target`; once per frame `current` is pulled
//! toward it by a fixed fraction, and the target itself decays so that the
//! system comes back to rest when input stops.

use crate::config::ConfigError;

/// Move `current` toward `target` by `blend_factor` of the remaining distance.
pub fn advance(target: f32, current: f32, blend_factor: f32) -> f32 {
    current + (target - current) * blend_factor
}

/// Shrink a target toward zero by one frame's worth of decay.
pub fn decay(target: f32, decay_factor: f32) -> f32 {
    target * decay_factor
}

/// A target/current pair with its blend and decay constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothedValue {
    pub target: f32,
    pub current: f32,
    blend_factor: f32,
    decay_factor: f32,
}

impl SmoothedValue {
    /// Both factors must lie in `(0, 1]`. A decay of `1.0` disables decay,
    /// which is what absolute quantities such as a scroll offset want.
    pub fn new(blend_factor: f32, decay_factor: f32) -> Result<Self, ConfigError> {
        check_unit_factor("blendFactor", blend_factor)?;
        check_unit_factor("decayFactor", decay_factor)?;
        Ok(Self {
            target: 0.0,
            current: 0.0,
            blend_factor,
            decay_factor,
        })
    }

    pub fn blend_factor(&self) -> f32 {
        self.blend_factor
    }

    pub fn decay_factor(&self) -> f32 {
        self.decay_factor
    }

    /// Add an impulse to the target.
    pub fn push(&mut self, amount: f32) {
        self.target += amount;
    }

    /// Replace the target outright.
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump both values to `value` (used when a quantity is first measured).
    pub fn snap(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// One frame: blend current toward target, then decay the target.
    /// Returns the new current value.
    pub fn tick(&mut self) -> f32 {
        self.current = advance(self.target, self.current, self.blend_factor);
        self.target = decay(self.target, self.decay_factor);
        self.current
    }

    /// True when both values are within `epsilon` of zero.
    pub fn is_at_rest(&self, epsilon: f32) -> bool {
        self.current.abs() < epsilon && self.target.abs() < epsilon
    }
}

pub(crate) fn check_unit_factor(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::FactorOutOfRange { name, value })
    }
}
