//! Scroll-progress mappings for text reveals.
//!
//! These are stateless: each scroll tick reads an element's position
//! relative to the viewport and maps it straight to a visual output, with no
//! smoothing between ticks.

use crate::config::{
    check_phase_order, ConfigError, HeadingFadeConfig, SplitTextConfig, TitleSlideConfig,
};

const CONTINUITY_EPSILON: f32 = 1e-5;

/// Opacity, scale and a translation offset produced by a mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualOutput {
    pub opacity: f32,
    pub scale: f32,
    pub translate: f32,
}

impl VisualOutput {
    pub const REST: VisualOutput = VisualOutput {
        opacity: 1.0,
        scale: 1.0,
        translate: 0.0,
    };

    pub const fn new(opacity: f32, scale: f32, translate: f32) -> Self {
        Self {
            opacity,
            scale,
            translate,
        }
    }

    pub fn lerp(self, other: VisualOutput, t: f32) -> VisualOutput {
        VisualOutput {
            opacity: self.opacity + (other.opacity - self.opacity) * t,
            scale: self.scale + (other.scale - self.scale) * t,
            translate: self.translate + (other.translate - self.translate) * t,
        }
    }

    fn approx_eq(&self, other: &VisualOutput) -> bool {
        (self.opacity - other.opacity).abs() < CONTINUITY_EPSILON
            && (self.scale - other.scale).abs() < CONTINUITY_EPSILON
            && (self.translate - other.translate).abs() < CONTINUITY_EPSILON
    }
}

/// One linear piece between two normalized positions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressSegment {
    pub threshold_high: f32,
    pub threshold_low: f32,
    pub output_at_high: VisualOutput,
    pub output_at_low: VisualOutput,
}

/// Piecewise-linear map from a normalized position to a [`VisualOutput`].
///
/// Segments are ordered from the highest position down, share their
/// boundaries, and agree on the output at each shared boundary, so the map
/// is continuous everywhere. Positions above the first segment take its high
/// output; positions below the last take its low output.
#[derive(Clone, Debug, PartialEq)]
pub struct PiecewiseMap {
    segments: Vec<ProgressSegment>,
}

impl PiecewiseMap {
    pub fn new(segments: Vec<ProgressSegment>) -> Result<Self, ConfigError> {
        if segments.is_empty() {
            return Err(ConfigError::EmptySegments);
        }
        for (index, segment) in segments.iter().enumerate() {
            if !(segment.threshold_high > segment.threshold_low) {
                return Err(ConfigError::InvertedSegment {
                    index,
                    high: segment.threshold_high,
                    low: segment.threshold_low,
                });
            }
            if index == 0 {
                continue;
            }
            let previous = &segments[index - 1];
            if segment.threshold_high != previous.threshold_low {
                return Err(ConfigError::GapBetweenSegments {
                    index,
                    high: segment.threshold_high,
                    previous_low: previous.threshold_low,
                });
            }
            if !segment.output_at_high.approx_eq(&previous.output_at_low) {
                return Err(ConfigError::DiscontinuousSegments { index });
            }
        }
        Ok(Self { segments })
    }

    pub fn evaluate(&self, position: f32) -> VisualOutput {
        let first = &self.segments[0];
        if position >= first.threshold_high {
            return first.output_at_high;
        }
        for segment in &self.segments {
            if position > segment.threshold_low {
                let span = segment.threshold_high - segment.threshold_low;
                let t = (segment.threshold_high - position) / span;
                return segment.output_at_high.lerp(segment.output_at_low, t);
            }
        }
        self.segments[self.segments.len() - 1].output_at_low
    }

    pub fn segments(&self) -> &[ProgressSegment] {
        &self.segments
    }
}

/// Result of the title slide mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlideOutput {
    /// 0 while outside the active range, 1 once the element reaches the top.
    pub progress: f32,
    pub offset: f32,
}

/// Linear slide-in as an element approaches the top of the viewport.
#[derive(Clone, Debug, PartialEq)]
pub struct SlideReveal {
    range_divisor: f32,
    speed_factor: f32,
    hidden_offset: f32,
}

impl SlideReveal {
    pub fn new(config: &TitleSlideConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            range_divisor: config.range_divisor,
            speed_factor: config.speed_factor,
            hidden_offset: config.hidden_offset,
        })
    }

    pub fn hidden_offset(&self) -> f32 {
        self.hidden_offset
    }

    /// Offset stays within `[hidden_offset, 0]` for every input.
    pub fn evaluate(&self, distance_from_top: f32, viewport_height: f32) -> SlideOutput {
        let hidden = SlideOutput {
            progress: 0.0,
            offset: self.hidden_offset,
        };
        let range = viewport_height / self.range_divisor;
        if !(range > 0.0) || !distance_from_top.is_finite() || distance_from_top >= range {
            return hidden;
        }
        let progress = ((range - distance_from_top) / range).clamp(0.0, 1.0);
        let offset = (-distance_from_top * self.speed_factor).clamp(self.hidden_offset, 0.0);
        SlideOutput { progress, offset }
    }
}

/// Four-phase fade/scale of a transitional heading.
///
/// With `p` the element's top edge as a fraction of the viewport height
/// (1 = entering at the bottom, 0 = at the top):
/// hidden above `start_point`, fading in down to `solid_point`, fully shown
/// down to `action_point`, then fading out while growing to
/// `1 + max_scale_boost` as it reaches the top.
#[derive(Clone, Debug, PartialEq)]
pub struct FadeScalePhases {
    map: PiecewiseMap,
    start_point: f32,
    solid_point: f32,
    action_point: f32,
}

impl FadeScalePhases {
    pub fn new(
        start_point: f32,
        solid_point: f32,
        action_point: f32,
        max_scale_boost: f32,
    ) -> Result<Self, ConfigError> {
        check_phase_order(start_point, solid_point, action_point)?;

        let hidden = VisualOutput::new(0.0, 1.0, 0.0);
        let shown = VisualOutput::REST;
        let gone = VisualOutput::new(0.0, 1.0 + max_scale_boost, 0.0);

        let mut segments = Vec::with_capacity(4);
        // Positions are clamped to 1, so a start point at or above 1 leaves
        // no room for the hidden phase.
        if start_point < 1.0 {
            segments.push(ProgressSegment {
                threshold_high: 1.0,
                threshold_low: start_point,
                output_at_high: hidden,
                output_at_low: hidden,
            });
        }
        segments.push(ProgressSegment {
            threshold_high: start_point,
            threshold_low: solid_point,
            output_at_high: hidden,
            output_at_low: shown,
        });
        segments.push(ProgressSegment {
            threshold_high: solid_point,
            threshold_low: action_point,
            output_at_high: shown,
            output_at_low: shown,
        });
        segments.push(ProgressSegment {
            threshold_high: action_point,
            threshold_low: 0.0,
            output_at_high: shown,
            output_at_low: gone,
        });

        Ok(Self {
            map: PiecewiseMap::new(segments)?,
            start_point,
            solid_point,
            action_point,
        })
    }

    pub fn from_config(config: &HeadingFadeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(
            config.start_point,
            config.solid_point,
            config.action_point,
            config.max_scale_boost,
        )
    }

    pub fn boundaries(&self) -> (f32, f32, f32) {
        (self.start_point, self.solid_point, self.action_point)
    }

    /// Normalize an element's top edge against the viewport height.
    pub fn position_norm(distance_from_top: f32, viewport_height: f32) -> f32 {
        if !(viewport_height > 0.0) || !distance_from_top.is_finite() {
            return 1.0;
        }
        (distance_from_top / viewport_height).clamp(0.0, 1.0)
    }

    pub fn evaluate_norm(&self, position_norm: f32) -> VisualOutput {
        self.map.evaluate(position_norm.clamp(0.0, 1.0))
    }

    pub fn evaluate(&self, distance_from_top: f32, viewport_height: f32) -> VisualOutput {
        self.evaluate_norm(Self::position_norm(distance_from_top, viewport_height))
    }
}

/// Horizontal offsets for the two halves of a split line of text.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitOutput {
    pub separation: f32,
    pub left: f32,
    pub right: f32,
}

impl SplitOutput {
    pub const CLOSED: SplitOutput = SplitOutput {
        separation: 0.0,
        left: 0.0,
        right: 0.0,
    };
}

/// Pushes split text halves apart once the block's center rises above the
/// viewport center. Exactly zero at or below the center.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitSeparation {
    max_separation: f32,
}

impl SplitSeparation {
    pub fn new(config: &SplitTextConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            max_separation: config.max_separation,
        })
    }

    pub fn evaluate(&self, block_center: f32, viewport_height: f32) -> SplitOutput {
        let viewport_center = viewport_height / 2.0;
        if !(viewport_center > 0.0) || !(block_center < viewport_center) {
            return SplitOutput::CLOSED;
        }
        let progress = ((viewport_center - block_center) / viewport_center).clamp(0.0, 1.0);
        let separation = progress * self.max_separation;
        SplitOutput {
            separation,
            left: -separation,
            right: separation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_phases() -> FadeScalePhases {
        FadeScalePhases::from_config(&HeadingFadeConfig::default()).unwrap()
    }

    fn assert_close(a: VisualOutput, b: VisualOutput, eps: f32) {
        assert!(
            (a.opacity - b.opacity).abs() < eps
                && (a.scale - b.scale).abs() < eps
                && (a.translate - b.translate).abs() < eps,
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_title_reveal_scenario() {
        let slide = SlideReveal::new(&TitleSlideConfig::default()).unwrap();
        let out = slide.evaluate(267.0, 800.0);
        assert!((out.offset + 80.1).abs() < 1e-3);
        assert!((out.progress - 0.499).abs() < 1e-2);
    }

    #[test]
    fn test_title_hidden_outside_range() {
        let slide = SlideReveal::new(&TitleSlideConfig::default()).unwrap();
        // range = 800 / 1.5 = 533.33
        assert_eq!(slide.evaluate(534.0, 800.0).offset, -150.0);
        assert_eq!(slide.evaluate(2000.0, 800.0).progress, 0.0);
        assert_eq!(slide.evaluate(100.0, 0.0).offset, -150.0);
    }

    #[test]
    fn test_title_offset_bounded_and_monotonic() {
        let slide = SlideReveal::new(&TitleSlideConfig::default()).unwrap();
        let mut last = f32::NEG_INFINITY;
        let mut distance = 900.0;
        while distance > -300.0 {
            let out = slide.evaluate(distance, 800.0);
            assert!(out.offset >= -150.0 && out.offset <= 0.0);
            assert!(out.offset >= last, "not monotonic at {}", distance);
            last = out.offset;
            distance -= 3.5;
        }
        assert_eq!(slide.evaluate(-50.0, 800.0).offset, 0.0);
    }

    #[test]
    fn test_phase_values() {
        let phases = default_phases();
        // (0.9, 0.6, 0.3, boost 4)
        assert_close(phases.evaluate_norm(1.0), VisualOutput::new(0.0, 1.0, 0.0), 1e-5);
        assert_close(phases.evaluate_norm(0.95), VisualOutput::new(0.0, 1.0, 0.0), 1e-5);
        assert_close(phases.evaluate_norm(0.75), VisualOutput::new(0.5, 1.0, 0.0), 1e-4);
        assert_close(phases.evaluate_norm(0.45), VisualOutput::REST, 1e-5);
        assert_close(phases.evaluate_norm(0.15), VisualOutput::new(0.5, 3.0, 0.0), 1e-4);
        assert_close(phases.evaluate_norm(0.0), VisualOutput::new(0.0, 5.0, 0.0), 1e-5);
    }

    #[test]
    fn test_phases_continuous_at_boundaries() {
        let phases = default_phases();
        let (start, solid, action) = phases.boundaries();
        for &boundary in &[start, solid, action] {
            let above = phases.evaluate_norm(boundary + 1e-4);
            let at = phases.evaluate_norm(boundary);
            let below = phases.evaluate_norm(boundary - 1e-4);
            assert_close(above, at, 1e-2);
            assert_close(below, at, 1e-2);
        }
        // Fade-in ends exactly at full opacity.
        assert_close(phases.evaluate_norm(solid), VisualOutput::REST, 1e-6);
        // Action phase starts exactly at rest.
        assert_close(phases.evaluate_norm(action), VisualOutput::REST, 1e-6);
        assert_close(phases.evaluate_norm(start), VisualOutput::new(0.0, 1.0, 0.0), 1e-6);
    }

    #[test]
    fn test_phases_from_geometry() {
        let phases = default_phases();
        // 240 / 800 = 0.3 = action point.
        assert_close(phases.evaluate(240.0, 800.0), VisualOutput::REST, 1e-5);
        // Below the top is clamped to 0.
        assert_close(phases.evaluate(-100.0, 800.0), VisualOutput::new(0.0, 5.0, 0.0), 1e-5);
        // Far below the viewport is clamped to 1.
        assert_close(phases.evaluate(5000.0, 800.0), VisualOutput::new(0.0, 1.0, 0.0), 1e-5);
    }

    #[test]
    fn test_phases_reject_bad_order() {
        assert!(matches!(
            FadeScalePhases::new(0.5, 0.6, 0.3, 4.0),
            Err(ConfigError::UnorderedPhases { .. })
        ));
        assert!(FadeScalePhases::new(0.9, 0.6, 0.6, 4.0).is_err());
        assert!(FadeScalePhases::new(0.9, 0.6, 0.0, 4.0).is_err());
    }

    #[test]
    fn test_start_point_at_one_has_no_hidden_phase() {
        let phases = FadeScalePhases::new(1.0, 0.5, 0.25, 4.0).unwrap();
        assert_close(phases.evaluate_norm(0.75), VisualOutput::new(0.5, 1.0, 0.0), 1e-4);
    }

    #[test]
    fn test_piecewise_rejects_gaps_and_jumps() {
        let a = VisualOutput::new(0.0, 1.0, 0.0);
        let b = VisualOutput::REST;
        let gap = PiecewiseMap::new(vec![
            ProgressSegment {
                threshold_high: 1.0,
                threshold_low: 0.5,
                output_at_high: a,
                output_at_low: b,
            },
            ProgressSegment {
                threshold_high: 0.4,
                threshold_low: 0.0,
                output_at_high: b,
                output_at_low: b,
            },
        ]);
        assert!(matches!(gap, Err(ConfigError::GapBetweenSegments { index: 1, .. })));

        let jump = PiecewiseMap::new(vec![
            ProgressSegment {
                threshold_high: 1.0,
                threshold_low: 0.5,
                output_at_high: a,
                output_at_low: b,
            },
            ProgressSegment {
                threshold_high: 0.5,
                threshold_low: 0.0,
                output_at_high: a,
                output_at_low: b,
            },
        ]);
        assert_eq!(jump, Err(ConfigError::DiscontinuousSegments { index: 1 }));

        assert_eq!(PiecewiseMap::new(vec![]), Err(ConfigError::EmptySegments));
    }

    #[test]
    fn test_split_closed_below_center() {
        let split = SplitSeparation::new(&SplitTextConfig::default()).unwrap();
        assert_eq!(split.evaluate(400.0, 800.0), SplitOutput::CLOSED);
        assert_eq!(split.evaluate(650.0, 800.0), SplitOutput::CLOSED);
    }

    #[test]
    fn test_split_opens_above_center() {
        let split = SplitSeparation::new(&SplitTextConfig::default()).unwrap();
        let out = split.evaluate(200.0, 800.0);
        assert!((out.separation - 50.0).abs() < 1e-4);
        assert_eq!(out.left, -out.separation);
        assert_eq!(out.right, out.separation);
        // Capped once the center leaves the top of the viewport.
        assert_eq!(split.evaluate(-300.0, 800.0).separation, 100.0);
    }
}
