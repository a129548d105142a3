//! Infinitely scrolling strip (marquee).
//!
//! The strip's content is duplicated once, so translating it anywhere in
//! `(-halfWidth, 0]` and folding by exactly one half width at the edges
//! gives a seamless loop. Scrolling adds a smoothed speed boost on top of a
//! constant drift; scrolling up can reverse the strip.

use crate::config::{ConfigError, MarqueeConfig};
use crate::smoother::SmoothedValue;

/// Fold `value` into `(-modulus, 0]` by whole multiples of `modulus`.
///
/// For values at most one modulus outside the band this is the same as
/// "if `<= -modulus` add it; then if `> 0` subtract it". Larger overshoots
/// are folded as many times as needed instead of escaping the band.
/// Returns `value` untouched when `modulus` is not a positive number.
pub fn fold_into_band(value: f32, modulus: f32) -> f32 {
    if !(modulus > 0.0) || !value.is_finite() {
        return value;
    }
    let mut r = value.rem_euclid(modulus);
    // rem_euclid can round up to exactly `modulus` for tiny negative inputs.
    if r >= modulus {
        r = 0.0;
    }
    let folded = r - modulus;
    if r == 0.0 || folded <= -modulus {
        0.0
    } else {
        folded
    }
}

/// Position of one strip and the extent it loops over.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackState {
    pub position: f32,
    /// Zero until the strip has been measured.
    pub content_half_width: f32,
}

pub struct LoopingTrack {
    state: TrackState,
    speed: SmoothedValue,
    base_drift_speed: f32,
    sensitivity: f32,
    wrap_count: u64,
    displacement: f64,
}

impl LoopingTrack {
    pub fn new(config: &MarqueeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: TrackState::default(),
            speed: SmoothedValue::new(config.blend_factor, config.decay_factor)?,
            base_drift_speed: config.base_drift_speed,
            sensitivity: config.sensitivity,
            wrap_count: 0,
            displacement: 0.0,
        })
    }

    /// Set the loop extent from the full (duplicated) content width.
    ///
    /// Called on load and on every resize. The current position is refolded
    /// into the new band so a resize never jumps more than one fold. Returns
    /// false, and stops the strip, if the width is not a usable measurement.
    pub fn measure(&mut self, content_width: f32) -> bool {
        let half_width = content_width / 2.0;
        if !(half_width > 0.0) || !half_width.is_finite() {
            if self.state.content_half_width > 0.0 {
                log::debug!("Marquee width measured as {}; pausing", content_width);
            }
            self.state.content_half_width = 0.0;
            return false;
        }
        self.state.content_half_width = half_width;
        self.state.position = fold_into_band(self.state.position, half_width);
        true
    }

    pub fn is_measured(&self) -> bool {
        self.state.content_half_width > 0.0
    }

    /// Feed one scroll delta into the speed target.
    pub fn on_scroll_delta(&mut self, delta: f32) {
        self.speed.push(delta * self.sensitivity);
    }

    /// Advance one frame and return the new translation.
    pub fn tick(&mut self) -> f32 {
        let boost = self.speed.tick();
        let half_width = self.state.content_half_width;
        if half_width <= 0.0 {
            return self.state.position;
        }

        let move_amount = self.base_drift_speed + boost;
        let raw = self.state.position - move_amount;
        let folded = fold_into_band(raw, half_width);

        self.wrap_count += ((folded - raw) / half_width).round().abs() as u64;
        self.displacement -= move_amount as f64;
        self.state.position = folded;
        folded
    }

    pub fn position(&self) -> f32 {
        self.state.position
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Current smoothed scroll boost.
    pub fn boost(&self) -> f32 {
        self.speed.current
    }

    pub fn target_boost(&self) -> f32 {
        self.speed.target
    }

    /// Number of half-width folds applied so far.
    pub fn wrap_count(&self) -> u64 {
        self.wrap_count
    }

    /// Total unfolded distance moved since creation.
    pub fn displacement(&self) -> f64 {
        self.displacement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(drift: f32, sensitivity: f32, blend: f32, decay: f32) -> LoopingTrack {
        LoopingTrack::new(&MarqueeConfig {
            base_drift_speed: drift,
            sensitivity,
            blend_factor: blend,
            decay_factor: decay,
            ..MarqueeConfig::default()
        })
        .unwrap()
    }

    fn two_step_fold(mut position: f32, half: f32) -> f32 {
        if position <= -half {
            position += half;
        }
        if position > 0.0 {
            position -= half;
        }
        position
    }

    #[test]
    fn test_fold_matches_two_step_rule_for_small_steps() {
        let half = 500.0;
        let mut position = 0.0;
        let steps = [1.0, 250.0, 499.0, -320.0, -500.0, 17.5, 480.0, -1.0, 500.0];
        for &step in steps.iter().cycle().take(200) {
            let raw = position - step;
            let expected = two_step_fold(raw, half);
            let folded = fold_into_band(raw, half);
            assert!(
                (expected - folded).abs() < 1e-3,
                "raw {} expected {} got {}",
                raw,
                expected,
                folded
            );
            position = folded;
        }
    }

    #[test]
    fn test_fold_keeps_band_for_large_overshoot() {
        for &raw in &[-1700.0_f32, 2600.0, -500.0, 0.0, -0.0001, 1e6] {
            let folded = fold_into_band(raw, 500.0);
            assert!(folded > -500.0 && folded <= 0.0, "{} -> {}", raw, folded);
        }
    }

    #[test]
    fn test_fold_without_modulus_is_identity() {
        assert_eq!(fold_into_band(-42.0, 0.0), -42.0);
        assert_eq!(fold_into_band(42.0, -3.0), 42.0);
    }

    #[test]
    fn test_marquee_idle_wraps_once() {
        let mut t = track(1.0, 2.0, 0.1, 0.9);
        assert!(t.measure(1000.0));
        for _ in 0..500 {
            t.tick();
        }
        assert!((t.displacement() + 500.0).abs() < 1e-3);
        assert_eq!(t.wrap_count(), 1);
        assert!(t.position().abs() < 1e-3);
    }

    #[test]
    fn test_band_invariant_under_scroll_bursts() {
        let mut t = track(1.0, 2.0, 0.1, 0.9);
        t.measure(800.0);
        let deltas = [120.0, -300.0, 5.0, 0.0, 190.0, -60.0];
        for frame in 0..600 {
            if frame % 7 == 0 {
                t.on_scroll_delta(deltas[(frame / 7) % deltas.len()]);
            }
            let p = t.tick();
            assert!(p > -400.0 && p <= 0.0, "frame {} left band: {}", frame, p);
        }
    }

    #[test]
    fn test_scroll_burst_decays() {
        let mut t = track(1.0, 2.0, 0.1, 0.95);
        t.measure(1000.0);
        t.on_scroll_delta(100.0);
        assert_eq!(t.target_boost(), 200.0);
        let mut peak: f32 = 0.0;
        for _ in 0..150 {
            t.tick();
            peak = peak.max(t.boost().abs());
        }
        assert!(peak > 50.0);
        assert!(t.boost().abs() < 0.01 * 200.0);
        assert!(t.target_boost().abs() < 0.01 * 200.0);
    }

    #[test]
    fn test_scrolling_up_reverses_direction() {
        let mut t = track(1.0, 2.0, 0.5, 0.99);
        t.measure(10_000.0);
        t.on_scroll_delta(-50.0);
        // First frame crosses zero and folds to the far end of the band.
        let before = t.tick();
        assert!(before < -4900.0);
        let after = t.tick();
        assert!(after > before);
    }

    #[test]
    fn test_unmeasured_track_does_not_move() {
        let mut t = track(1.0, 2.0, 0.1, 0.9);
        assert!(!t.measure(0.0));
        for _ in 0..10 {
            assert_eq!(t.tick(), 0.0);
        }
        assert_eq!(t.wrap_count(), 0);
        // Speed still settles while paused.
        t.on_scroll_delta(10.0);
        t.tick();
        assert!(t.boost() > 0.0);
    }

    #[test]
    fn test_resize_refolds_position() {
        let mut t = track(1.0, 2.0, 0.1, 0.9);
        t.measure(2000.0);
        for _ in 0..700 {
            t.tick();
        }
        assert!((t.position() + 700.0).abs() < 1e-3);
        t.measure(1000.0);
        assert!((t.position() + 200.0).abs() < 1e-3);
        assert!(t.position() > -500.0 && t.position() <= 0.0);
    }
}
