//! Engine configuration.
//!
//! Every tunable constant of every effect lives here, so that successive
//! variants of the same effect are just different configurations. The JSON
//! shape uses camelCase keys to match the page scripts that pass it in.

use serde::Deserialize;
use thiserror::Error;

use crate::layout::CapabilityGate;
use crate::smoother::check_unit_factor;

/// Rejected configuration or construction parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be in (0, 1], got {value}")]
    FactorOutOfRange { name: &'static str, value: f32 },

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },

    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f32 },

    #[error(
        "phase boundaries must satisfy startPoint > solidPoint > actionPoint > 0 \
         (got {start_point}, {solid_point}, {action_point})"
    )]
    UnorderedPhases {
        start_point: f32,
        solid_point: f32,
        action_point: f32,
    },

    #[error("piecewise map needs at least one segment")]
    EmptySegments,

    #[error("segment {index} has thresholdHigh {high} not above thresholdLow {low}")]
    InvertedSegment { index: usize, high: f32, low: f32 },

    #[error("segment {index} starts at {high} but the previous one ended at {previous_low}")]
    GapBetweenSegments {
        index: usize,
        high: f32,
        previous_low: f32,
    },

    #[error("segment {index} output at its high threshold does not continue the previous segment")]
    DiscontinuousSegments { index: usize },

    #[error("parallax needs at least one speed ratio")]
    NoSpeedRatios,

    #[error("threshold must be in [0, 1], got {0}")]
    ThresholdOutOfRange(f32),

    #[error("invalid configuration JSON: {0}")]
    Parse(String),
}

/// Top-level configuration for a page.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Element whose scroll offset drives everything.
    pub scroll_container_selector: String,
    /// Applies to the parallax columns and every scroll-progress effect.
    pub capability_gate: CapabilityGate,
    pub marquee: MarqueeConfig,
    pub parallax: ParallaxConfig,
    pub title_slide: TitleSlideConfig,
    pub heading_fade: HeadingFadeConfig,
    pub split_text: SplitTextConfig,
    pub section_reveal: SectionRevealConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scroll_container_selector: ".main-container".to_string(),
            capability_gate: CapabilityGate::default(),
            marquee: MarqueeConfig::default(),
            parallax: ParallaxConfig::default(),
            title_slide: TitleSlideConfig::default(),
            heading_fade: HeadingFadeConfig::default(),
            split_text: SplitTextConfig::default(),
            section_reveal: SectionRevealConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("minViewportWidth", self.capability_gate.min_viewport_width)?;
        self.marquee.validate()?;
        self.parallax.validate()?;
        self.title_slide.validate()?;
        self.heading_fade.validate()?;
        self.split_text.validate()?;
        self.section_reveal.validate()
    }
}

/// Scroll-boosted looping strip.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MarqueeConfig {
    pub track_selector: String,
    /// Pixels per frame moved with no scroll input.
    pub base_drift_speed: f32,
    /// Multiplier applied to each scroll delta before it joins the target speed.
    pub sensitivity: f32,
    pub blend_factor: f32,
    pub decay_factor: f32,
}

impl Default for MarqueeConfig {
    fn default() -> Self {
        Self {
            track_selector: ".software-track".to_string(),
            base_drift_speed: 1.0,
            sensitivity: 2.0,
            blend_factor: 0.1,
            decay_factor: 0.9,
        }
    }
}

impl MarqueeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("baseDriftSpeed", self.base_drift_speed)?;
        check_finite("sensitivity", self.sensitivity)?;
        check_unit_factor("blendFactor", self.blend_factor)?;
        check_unit_factor("decayFactor", self.decay_factor)
    }
}

/// Image columns moving at per-column speed ratios.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ParallaxConfig {
    pub column_selector: String,
    pub blend_factor: f32,
    /// Signed ratios, cycled by column index.
    pub speed_ratios: Vec<f32>,
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        Self {
            column_selector: ".gallery-column".to_string(),
            blend_factor: 0.1,
            speed_ratios: vec![-0.4, 0.25],
        }
    }
}

impl ParallaxConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_factor("blendFactor", self.blend_factor)?;
        if self.speed_ratios.is_empty() {
            return Err(ConfigError::NoSpeedRatios);
        }
        for &ratio in &self.speed_ratios {
            check_finite("speedRatios", ratio)?;
        }
        Ok(())
    }

    /// Speed ratio for the column at `index`.
    pub fn ratio_for(&self, index: usize) -> f32 {
        if self.speed_ratios.is_empty() {
            return 0.0;
        }
        self.speed_ratios[index % self.speed_ratios.len()]
    }
}

/// Section title sliding in as it approaches the top of the viewport.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TitleSlideConfig {
    pub selector: String,
    /// The active range is `viewportHeight / rangeDivisor`.
    pub range_divisor: f32,
    pub speed_factor: f32,
    /// Offset used while hidden; also the lower clamp bound. Must be negative.
    pub hidden_offset: f32,
}

impl Default for TitleSlideConfig {
    fn default() -> Self {
        Self {
            selector: ".section-title".to_string(),
            range_divisor: 1.5,
            speed_factor: 0.3,
            hidden_offset: -150.0,
        }
    }
}

impl TitleSlideConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("rangeDivisor", self.range_divisor)?;
        check_positive("speedFactor", self.speed_factor)?;
        check_positive("-hiddenOffset", -self.hidden_offset)
    }
}

/// Transitional heading: fade in, hold, then fade out while scaling up.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct HeadingFadeConfig {
    pub selector: String,
    pub start_point: f32,
    pub solid_point: f32,
    pub action_point: f32,
    /// Extra scale reached at the top: final scale is `1 + maxScaleBoost`.
    pub max_scale_boost: f32,
}

impl Default for HeadingFadeConfig {
    fn default() -> Self {
        Self {
            selector: ".transition-heading".to_string(),
            start_point: 0.9,
            solid_point: 0.6,
            action_point: 0.3,
            max_scale_boost: 4.0,
        }
    }
}

impl HeadingFadeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_phase_order(self.start_point, self.solid_point, self.action_point)?;
        check_finite("maxScaleBoost", self.max_scale_boost)
    }
}

/// Split text halves pushed apart once the block passes the viewport center.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SplitTextConfig {
    pub block_selector: String,
    pub left_selector: String,
    pub right_selector: String,
    pub max_separation: f32,
}

impl Default for SplitTextConfig {
    fn default() -> Self {
        Self {
            block_selector: ".split-text".to_string(),
            left_selector: ".split-left".to_string(),
            right_selector: ".split-right".to_string(),
            max_separation: 100.0,
        }
    }
}

impl SplitTextConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("maxSeparation", self.max_separation)
    }
}

/// One-shot class added to sections once enough of them is visible.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SectionRevealConfig {
    pub selector: String,
    pub threshold: f32,
    pub class_name: String,
}

impl Default for SectionRevealConfig {
    fn default() -> Self {
        Self {
            selector: ".scroll-section".to_string(),
            threshold: 0.2,
            class_name: "in-view".to_string(),
        }
    }
}

impl SectionRevealConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if (0.0..=1.0).contains(&self.threshold) {
            Ok(())
        } else {
            Err(ConfigError::ThresholdOutOfRange(self.threshold))
        }
    }
}

pub(crate) fn check_phase_order(
    start_point: f32,
    solid_point: f32,
    action_point: f32,
) -> Result<(), ConfigError> {
    if start_point > solid_point && solid_point > action_point && action_point > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::UnorderedPhases {
            start_point,
            solid_point,
            action_point,
        })
    }
}

fn check_finite(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { name, value })
    }
}

fn check_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{
            "marquee": { "baseDriftSpeed": 2.5, "decayFactor": 0.95 },
            "parallax": { "speedRatios": [0.1, -0.2, 0.3] }
        }"#;
        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.marquee.base_drift_speed, 2.5);
        assert_eq!(config.marquee.decay_factor, 0.95);
        // Untouched keys in a partially specified section keep their defaults.
        assert_eq!(config.marquee.sensitivity, 2.0);
        assert_eq!(config.parallax.ratio_for(4), -0.2);
    }

    #[test]
    fn test_rejects_unordered_phases() {
        let json = r#"{ "headingFade": { "startPoint": 0.5, "solidPoint": 0.6 } }"#;
        let err = EngineConfig::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::UnorderedPhases { .. }));
    }

    #[test]
    fn test_rejects_bad_blend() {
        let json = r#"{ "marquee": { "blendFactor": 0.0 } }"#;
        let err = EngineConfig::from_json(json).unwrap_err();
        assert_eq!(
            err,
            ConfigError::FactorOutOfRange {
                name: "blendFactor",
                value: 0.0
            }
        );
    }

    #[test]
    fn test_rejects_empty_speed_ratios() {
        let json = r#"{ "parallax": { "speedRatios": [] } }"#;
        assert_eq!(
            EngineConfig::from_json(json).unwrap_err(),
            ConfigError::NoSpeedRatios
        );
    }

    #[test]
    fn test_rejects_positive_hidden_offset() {
        let json = r#"{ "titleSlide": { "hiddenOffset": 20 } }"#;
        assert!(matches!(
            EngineConfig::from_json(json).unwrap_err(),
            ConfigError::NotPositive { .. }
        ));
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(matches!(
            EngineConfig::from_json("{ not json").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_capability_gate_from_json() {
        let json = r#"{ "capabilityGate": { "minViewportWidth": 1024, "requireHover": false } }"#;
        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.capability_gate.min_viewport_width, 1024.0);
        assert!(!config.capability_gate.require_hover);
    }

    #[test]
    fn test_ratio_cycles_by_index() {
        let config = ParallaxConfig::default();
        assert_eq!(config.ratio_for(0), -0.4);
        assert_eq!(config.ratio_for(1), 0.25);
        assert_eq!(config.ratio_for(2), -0.4);
    }
}
