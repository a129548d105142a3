//! Visual output written onto target elements.

use glam::Vec2;
use serde::Serialize;

use crate::layout::TargetId;
use crate::progress::VisualOutput;

/// Translation, scale and (optionally) opacity for one element.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Style {
    pub translate: Vec2,
    pub scale: f32,
    /// None leaves the element's opacity alone.
    pub opacity: Option<f32>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: 1.0,
            opacity: None,
        }
    }
}

impl Style {
    pub fn translate_x(x: f32) -> Self {
        Self {
            translate: Vec2::new(x, 0.0),
            ..Self::default()
        }
    }

    pub fn translate_y(y: f32) -> Self {
        Self {
            translate: Vec2::new(0.0, y),
            ..Self::default()
        }
    }

    /// Opacity and scale from a phase mapping, with no translation.
    pub fn faded(output: VisualOutput) -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: output.scale,
            opacity: Some(output.opacity),
        }
    }

    /// CSS `transform` value.
    pub fn transform_css(&self) -> String {
        let Vec2 { x, y } = self.translate;
        let mut css = if y == 0.0 {
            format!("translateX({}px)", x)
        } else if x == 0.0 {
            format!("translateY({}px)", y)
        } else {
            format!("translate({}px, {}px)", x, y)
        };
        if self.scale != 1.0 {
            css.push_str(&format!(" scale({})", self.scale));
        }
        css
    }

    /// CSS `opacity` value, if this style sets one.
    pub fn opacity_css(&self) -> Option<String> {
        self.opacity.map(|o| format!("{}", o.clamp(0.0, 1.0)))
    }
}

/// Where effects write their output. Each write replaces the previous value
/// of that property on the target.
pub trait StyleSink {
    fn apply(&mut self, target: &TargetId, style: &Style);
    fn add_class(&mut self, target: &TargetId, class_name: &str);
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StyleWrite {
    Style {
        target: TargetId,
        /// Structured values, for consumers that do not parse CSS.
        style: Style,
        transform: String,
        opacity: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Class {
        target: TargetId,
        class_name: String,
    },
}

/// Sink that keeps every write, for headless runs and tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    writes: Vec<StyleWrite>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> &[StyleWrite] {
        &self.writes
    }

    /// Remove and return everything recorded so far.
    pub fn take(&mut self) -> Vec<StyleWrite> {
        std::mem::take(&mut self.writes)
    }

    /// Most recent transform written to `target`.
    pub fn last_transform(&self, target: &TargetId) -> Option<&str> {
        self.writes.iter().rev().find_map(|w| match w {
            StyleWrite::Style {
                target: t,
                transform,
                ..
            } if t == target => Some(transform.as_str()),
            _ => None,
        })
    }

    /// Most recent opacity written to `target`.
    pub fn last_opacity(&self, target: &TargetId) -> Option<&str> {
        self.writes.iter().rev().find_map(|w| match w {
            StyleWrite::Style {
                target: t,
                opacity: Some(opacity),
                ..
            } if t == target => Some(opacity.as_str()),
            _ => None,
        })
    }

    pub fn has_class(&self, target: &TargetId, class_name: &str) -> bool {
        self.writes.iter().any(|w| {
            matches!(w, StyleWrite::Class { target: t, class_name: c } if t == target && c == class_name)
        })
    }
}

impl StyleSink for RecordingSink {
    fn apply(&mut self, target: &TargetId, style: &Style) {
        self.writes.push(StyleWrite::Style {
            target: target.clone(),
            style: *style,
            transform: style.transform_css(),
            opacity: style.opacity_css(),
        });
    }

    fn add_class(&mut self, target: &TargetId, class_name: &str) {
        self.writes.push(StyleWrite::Class {
            target: target.clone(),
            class_name: class_name.to_string(),
        });
    }
}
