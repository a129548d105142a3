//! Element geometry as seen by the effects.
//!
//! The DOM host and the headless simulator both answer the same questions:
//! where is an element relative to the viewport, how large is its content,
//! and what can the current device do.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One element matched by a selector.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId {
    pub selector: String,
    pub index: usize,
}

impl TargetId {
    pub fn new(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.selector, self.index)
    }
}

/// Bounding box relative to the viewport's top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(top: f32, left: f32, width: f32, height: f32) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn center_y(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    /// Whether the primary pointer supports hover (mouse rather than touch).
    pub can_hover: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            can_hover: true,
        }
    }
}

/// Decides whether layout-sensitive effects run on the current device.
///
/// Narrow or touch layouts fall back to a static stack.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CapabilityGate {
    pub min_viewport_width: f32,
    pub require_hover: bool,
}

impl Default for CapabilityGate {
    fn default() -> Self {
        Self {
            min_viewport_width: 768.0,
            require_hover: true,
        }
    }
}

impl CapabilityGate {
    pub fn allows(&self, viewport: &Viewport) -> bool {
        viewport.width >= self.min_viewport_width && (viewport.can_hover || !self.require_hover)
    }
}

/// Geometry queries answered by the host.
pub trait Layout {
    /// All elements matching `selector`, in document order.
    fn query(&self, selector: &str) -> Vec<TargetId>;

    /// Bounding box relative to the viewport, or None if the element is gone.
    fn rect(&self, target: &TargetId) -> Option<Rect>;

    /// Full scrollable content width (the duplicated strip for marquees).
    fn content_width(&self, target: &TargetId) -> Option<f32>;

    /// Full scrollable content height.
    fn content_height(&self, target: &TargetId) -> Option<f32>;

    fn viewport(&self) -> Viewport;

    /// Whether images and other late content have finished loading, so that
    /// content extents reflect the final layout.
    fn content_loaded(&self) -> bool;
}

/// Geometry of one element in document coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementGeometry {
    /// Top edge relative to the top of the scroll content (not the viewport).
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
    pub scroll_width: f32,
    pub scroll_height: f32,
}

/// In-memory layout for headless runs and tests.
///
/// Elements are placed in content coordinates and shifted by the current
/// scroll offset, the way a scroll container moves its children.
#[derive(Clone, Debug, Default)]
pub struct StaticLayout {
    elements: HashMap<String, Vec<ElementGeometry>>,
    viewport: Viewport,
    scroll_offset: f32,
    loaded: bool,
}

impl StaticLayout {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            elements: HashMap::new(),
            viewport,
            scroll_offset: 0.0,
            loaded: true,
        }
    }

    pub fn insert(&mut self, selector: impl Into<String>, element: ElementGeometry) -> TargetId {
        let selector = selector.into();
        let list = self.elements.entry(selector.clone()).or_default();
        list.push(element);
        TargetId::new(selector, list.len() - 1)
    }

    pub fn element_mut(&mut self, target: &TargetId) -> Option<&mut ElementGeometry> {
        self.elements
            .get_mut(&target.selector)
            .and_then(|list| list.get_mut(target.index))
    }

    pub fn set_scroll_offset(&mut self, offset: f32) {
        self.scroll_offset = offset;
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    fn element(&self, target: &TargetId) -> Option<&ElementGeometry> {
        self.elements
            .get(&target.selector)
            .and_then(|list| list.get(target.index))
    }
}

impl Layout for StaticLayout {
    fn query(&self, selector: &str) -> Vec<TargetId> {
        let count = self.elements.get(selector).map(|l| l.len()).unwrap_or(0);
        (0..count).map(|i| TargetId::new(selector, i)).collect()
    }

    fn rect(&self, target: &TargetId) -> Option<Rect> {
        self.element(target).map(|e| {
            Rect::new(e.top - self.scroll_offset, e.left, e.width, e.height)
        })
    }

    fn content_width(&self, target: &TargetId) -> Option<f32> {
        self.element(target).map(|e| e.scroll_width)
    }

    fn content_height(&self, target: &TargetId) -> Option<f32> {
        self.element(target).map(|e| e.scroll_height)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn content_loaded(&self) -> bool {
        self.loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_follows_scroll() {
        let mut layout = StaticLayout::new(Viewport::default());
        let id = layout.insert(
            ".title",
            ElementGeometry {
                top: 1200.0,
                height: 100.0,
                ..ElementGeometry::default()
            },
        );
        assert_eq!(layout.rect(&id).unwrap().top, 1200.0);
        layout.set_scroll_offset(500.0);
        let rect = layout.rect(&id).unwrap();
        assert_eq!(rect.top, 700.0);
        assert_eq!(rect.bottom(), 800.0);
        assert_eq!(rect.center_y(), 750.0);
    }

    #[test]
    fn test_query_lists_in_order() {
        let mut layout = StaticLayout::new(Viewport::default());
        layout.insert(".col", ElementGeometry::default());
        layout.insert(".col", ElementGeometry::default());
        let ids = layout.query(".col");
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[1].index, 1);
        assert!(layout.query(".missing").is_empty());
        assert_eq!(ids[0].to_string(), ".col[0]");
    }

    #[test]
    fn test_capability_gate() {
        let gate = CapabilityGate::default();
        let desktop = Viewport {
            width: 1440.0,
            height: 900.0,
            can_hover: true,
        };
        let narrow = Viewport {
            width: 400.0,
            ..desktop
        };
        let touch = Viewport {
            can_hover: false,
            ..desktop
        };
        assert!(gate.allows(&desktop));
        assert!(!gate.allows(&narrow));
        assert!(!gate.allows(&touch));

        let touch_ok = CapabilityGate {
            require_hover: false,
            ..CapabilityGate::default()
        };
        assert!(touch_ok.allows(&touch));
    }
}
