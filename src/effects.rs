//! Effects binding the scroll components to page elements.
//!
//! [`mount_page`] looks up every configured selector and starts the effects
//! whose elements exist. Missing elements simply mean the effect is absent.

use crate::config::{
    ConfigError, EngineConfig, MarqueeConfig, ParallaxConfig, SectionRevealConfig,
    SplitTextConfig,
};
use crate::driver::{AnimationDriver, Effect, FrameContext, ScrollEvent, TaskHandle};
use crate::layout::{CapabilityGate, Layout, TargetId, Viewport};
use crate::looping_track::LoopingTrack;
use crate::parallax::ParallaxField;
use crate::progress::{FadeScalePhases, SlideReveal, SplitSeparation, VisualOutput};
use crate::reveal::{visible_fraction, VisibilityLatch};
use crate::style::{Style, StyleSink};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GateTransition {
    Active,
    /// Just switched off; the effect should write its rest style once.
    Deactivated,
    Inactive,
}

/// Tracks a capability gate across resizes.
#[derive(Clone, Debug)]
struct GateState {
    gate: CapabilityGate,
    active: Option<bool>,
}

impl GateState {
    fn new(gate: CapabilityGate) -> Self {
        Self { gate, active: None }
    }

    fn update(&mut self, viewport: &Viewport) -> GateTransition {
        let allowed = self.gate.allows(viewport);
        let previous = self.active.replace(allowed);
        match (previous, allowed) {
            (_, true) => GateTransition::Active,
            (Some(false), false) => GateTransition::Inactive,
            (_, false) => {
                log::debug!(
                    "Viewport {}px wide (hover: {}) is below capability gate",
                    viewport.width,
                    viewport.can_hover
                );
                GateTransition::Deactivated
            }
        }
    }

    fn is_active(&self) -> bool {
        self.active.unwrap_or(false)
    }
}

/// Looping strip whose speed follows scroll velocity.
pub struct MarqueeEffect {
    target: TargetId,
    track: LoopingTrack,
}

impl MarqueeEffect {
    pub fn new(config: &MarqueeConfig, target: TargetId) -> Result<Self, ConfigError> {
        Ok(Self {
            target,
            track: LoopingTrack::new(config)?,
        })
    }

    pub fn track(&self) -> &LoopingTrack {
        &self.track
    }

    fn measure(&mut self, layout: &dyn Layout) {
        let width = layout.content_width(&self.target).unwrap_or(0.0);
        self.track.measure(width);
    }
}

impl Effect for MarqueeEffect {
    fn name(&self) -> &'static str {
        "marquee"
    }

    fn on_mount(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.measure(layout);
        sink.apply(&self.target, &Style::translate_x(self.track.position()));
    }

    fn on_scroll(&mut self, event: &ScrollEvent, _layout: &dyn Layout, _sink: &mut dyn StyleSink) {
        self.track.on_scroll_delta(event.delta);
    }

    fn on_resize(&mut self, layout: &dyn Layout, _sink: &mut dyn StyleSink) {
        self.measure(layout);
    }

    fn on_content_loaded(&mut self, layout: &dyn Layout, _sink: &mut dyn StyleSink) {
        self.measure(layout);
    }

    fn on_frame(&mut self, _frame: &FrameContext<'_>, sink: &mut dyn StyleSink) {
        let was_measured = self.track.is_measured();
        let position = self.track.tick();
        if was_measured {
            sink.apply(&self.target, &Style::translate_x(position));
        }
    }
}

/// Image columns drifting against the scroll at their own ratios.
pub struct ParallaxEffect {
    columns: Vec<TargetId>,
    field: ParallaxField,
    gate: GateState,
    loaded: bool,
}

impl ParallaxEffect {
    pub fn new(
        config: &ParallaxConfig,
        gate: CapabilityGate,
        columns: Vec<TargetId>,
        scroll_offset: f32,
    ) -> Result<Self, ConfigError> {
        let mut field = ParallaxField::new(config, columns.len())?;
        field.snap_scroll(scroll_offset);
        Ok(Self {
            columns,
            field,
            gate: GateState::new(gate),
            loaded: false,
        })
    }

    pub fn field(&self) -> &ParallaxField {
        &self.field
    }

    /// Heights are only trusted once content has loaded; measuring earlier
    /// would give half heights that are too small.
    fn measure(&mut self, layout: &dyn Layout) {
        if !self.loaded {
            return;
        }
        for (index, column) in self.columns.iter().enumerate() {
            let height = layout.content_height(column).unwrap_or(0.0);
            self.field.measure_column(index, height);
        }
        if self.field.is_ready() {
            log::debug!("Parallax measured {} columns", self.columns.len());
        }
    }

    fn apply_gate(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        if self.gate.update(&layout.viewport()) == GateTransition::Deactivated {
            for column in &self.columns {
                sink.apply(column, &Style::translate_y(0.0));
            }
        }
    }
}

impl Effect for ParallaxEffect {
    fn name(&self) -> &'static str {
        "parallax"
    }

    fn on_mount(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.loaded = layout.content_loaded();
        self.measure(layout);
        self.apply_gate(layout, sink);
    }

    fn on_scroll(&mut self, event: &ScrollEvent, _layout: &dyn Layout, _sink: &mut dyn StyleSink) {
        self.field.set_scroll_target(event.offset);
    }

    fn on_resize(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.measure(layout);
        self.apply_gate(layout, sink);
    }

    fn on_content_loaded(&mut self, layout: &dyn Layout, _sink: &mut dyn StyleSink) {
        self.loaded = true;
        self.measure(layout);
    }

    fn on_frame(&mut self, _frame: &FrameContext<'_>, sink: &mut dyn StyleSink) {
        if !self.loaded {
            return;
        }
        // Keep smoothing while disabled so re-enabling does not jump.
        let offsets = self.field.tick();
        if !self.gate.is_active() {
            return;
        }
        for (column, offset) in self.columns.iter().zip(offsets) {
            if let Some(offset) = offset {
                sink.apply(column, &Style::translate_y(*offset));
            }
        }
    }
}

/// Section titles sliding in from the left.
pub struct TitleSlideEffect {
    targets: Vec<TargetId>,
    slide: SlideReveal,
    gate: GateState,
}

impl TitleSlideEffect {
    pub fn new(slide: SlideReveal, gate: CapabilityGate, targets: Vec<TargetId>) -> Self {
        Self {
            targets,
            slide,
            gate: GateState::new(gate),
        }
    }

    fn update(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        let viewport = layout.viewport();
        match self.gate.update(&viewport) {
            GateTransition::Active => {}
            GateTransition::Deactivated => {
                for target in &self.targets {
                    sink.apply(target, &Style::translate_x(0.0));
                }
                return;
            }
            GateTransition::Inactive => return,
        }
        for target in &self.targets {
            if let Some(rect) = layout.rect(target) {
                let out = self.slide.evaluate(rect.top, viewport.height);
                sink.apply(target, &Style::translate_x(out.offset));
            }
        }
    }
}

impl Effect for TitleSlideEffect {
    fn name(&self) -> &'static str {
        "title-slide"
    }

    fn on_mount(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.update(layout, sink);
    }

    fn on_scroll(&mut self, _event: &ScrollEvent, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.update(layout, sink);
    }

    fn on_resize(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.update(layout, sink);
    }
}

/// Transitional headings that fade in, hold, then fade out while growing.
pub struct HeadingFadeEffect {
    targets: Vec<TargetId>,
    phases: FadeScalePhases,
    gate: GateState,
}

impl HeadingFadeEffect {
    pub fn new(phases: FadeScalePhases, gate: CapabilityGate, targets: Vec<TargetId>) -> Self {
        Self {
            targets,
            phases,
            gate: GateState::new(gate),
        }
    }

    fn update(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        let viewport = layout.viewport();
        match self.gate.update(&viewport) {
            GateTransition::Active => {}
            GateTransition::Deactivated => {
                for target in &self.targets {
                    sink.apply(target, &Style::faded(VisualOutput::REST));
                }
                return;
            }
            GateTransition::Inactive => return,
        }
        for target in &self.targets {
            if let Some(rect) = layout.rect(target) {
                let out = self.phases.evaluate(rect.top, viewport.height);
                sink.apply(target, &Style::faded(out));
            }
        }
    }
}

impl Effect for HeadingFadeEffect {
    fn name(&self) -> &'static str {
        "heading-fade"
    }

    fn on_mount(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.update(layout, sink);
    }

    fn on_scroll(&mut self, _event: &ScrollEvent, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.update(layout, sink);
    }

    fn on_resize(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.update(layout, sink);
    }
}

/// A split line of text: the block whose position is measured and the two
/// halves that move apart.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitTargets {
    pub block: TargetId,
    pub left: TargetId,
    pub right: TargetId,
}

pub struct SplitTextEffect {
    targets: Vec<SplitTargets>,
    split: SplitSeparation,
    gate: GateState,
}

impl SplitTextEffect {
    pub fn new(split: SplitSeparation, gate: CapabilityGate, targets: Vec<SplitTargets>) -> Self {
        Self {
            targets,
            split,
            gate: GateState::new(gate),
        }
    }

    fn update(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        let viewport = layout.viewport();
        match self.gate.update(&viewport) {
            GateTransition::Active => {}
            GateTransition::Deactivated => {
                for t in &self.targets {
                    sink.apply(&t.left, &Style::translate_x(0.0));
                    sink.apply(&t.right, &Style::translate_x(0.0));
                }
                return;
            }
            GateTransition::Inactive => return,
        }
        for t in &self.targets {
            if let Some(rect) = layout.rect(&t.block) {
                let out = self.split.evaluate(rect.center_y(), viewport.height);
                sink.apply(&t.left, &Style::translate_x(out.left));
                sink.apply(&t.right, &Style::translate_x(out.right));
            }
        }
    }
}

impl Effect for SplitTextEffect {
    fn name(&self) -> &'static str {
        "split-text"
    }

    fn on_mount(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.update(layout, sink);
    }

    fn on_scroll(&mut self, _event: &ScrollEvent, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.update(layout, sink);
    }

    fn on_resize(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.update(layout, sink);
    }
}

/// Adds a class to each section the first time enough of it is visible.
pub struct SectionRevealEffect {
    sections: Vec<(TargetId, VisibilityLatch)>,
    class_name: String,
}

impl SectionRevealEffect {
    pub fn new(config: &SectionRevealConfig, targets: Vec<TargetId>) -> Result<Self, ConfigError> {
        let sections = targets
            .into_iter()
            .map(|t| VisibilityLatch::new(config.threshold).map(|latch| (t, latch)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            sections,
            class_name: config.class_name.clone(),
        })
    }

    pub fn revealed_count(&self) -> usize {
        self.sections.iter().filter(|(_, l)| l.is_revealed()).count()
    }

    fn update(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        let viewport_height = layout.viewport().height;
        for (target, latch) in &mut self.sections {
            if latch.is_revealed() {
                continue;
            }
            let Some(rect) = layout.rect(target) else {
                continue;
            };
            if latch.observe(visible_fraction(&rect, viewport_height)) {
                sink.add_class(target, &self.class_name);
            }
        }
    }
}

impl Effect for SectionRevealEffect {
    fn name(&self) -> &'static str {
        "section-reveal"
    }

    fn on_mount(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.update(layout, sink);
    }

    fn on_scroll(&mut self, _event: &ScrollEvent, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.update(layout, sink);
    }

    fn on_resize(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.update(layout, sink);
    }
}

fn query_or_skip(layout: &dyn Layout, selector: &str, effect: &str) -> Vec<TargetId> {
    let targets = layout.query(selector);
    if targets.is_empty() {
        log::debug!("No elements match '{}'; {} not started", selector, effect);
    }
    targets
}

/// Validate `config` and start every effect whose elements are present.
///
/// Returns the handles of the started effects, in mount order.
pub fn mount_page(
    config: &EngineConfig,
    driver: &mut AnimationDriver,
    layout: &dyn Layout,
    sink: &mut dyn StyleSink,
) -> Result<Vec<TaskHandle>, ConfigError> {
    config.validate()?;
    let gate = &config.capability_gate;
    let mut effects: Vec<Box<dyn Effect>> = Vec::new();

    for track in query_or_skip(layout, &config.marquee.track_selector, "marquee") {
        effects.push(Box::new(MarqueeEffect::new(&config.marquee, track)?));
    }

    let columns = query_or_skip(layout, &config.parallax.column_selector, "parallax");
    if !columns.is_empty() {
        effects.push(Box::new(ParallaxEffect::new(
            &config.parallax,
            gate.clone(),
            columns,
            driver.scroll_offset(),
        )?));
    }

    let titles = query_or_skip(layout, &config.title_slide.selector, "title slide");
    if !titles.is_empty() {
        let slide = SlideReveal::new(&config.title_slide)?;
        effects.push(Box::new(TitleSlideEffect::new(slide, gate.clone(), titles)));
    }

    let headings = query_or_skip(layout, &config.heading_fade.selector, "heading fade");
    if !headings.is_empty() {
        let phases = FadeScalePhases::from_config(&config.heading_fade)?;
        effects.push(Box::new(HeadingFadeEffect::new(phases, gate.clone(), headings)));
    }

    let splits = split_targets(layout, &config.split_text);
    if !splits.is_empty() {
        let split = SplitSeparation::new(&config.split_text)?;
        effects.push(Box::new(SplitTextEffect::new(split, gate.clone(), splits)));
    }

    let sections = query_or_skip(layout, &config.section_reveal.selector, "section reveal");
    if !sections.is_empty() {
        effects.push(Box::new(SectionRevealEffect::new(&config.section_reveal, sections)?));
    }

    let handles: Vec<TaskHandle> = effects
        .into_iter()
        .map(|effect| driver.spawn(effect, layout, sink))
        .collect();
    log::info!("Mounted {} scroll effects", handles.len());
    Ok(handles)
}

/// Pair each split block with the halves at the same index.
fn split_targets(layout: &dyn Layout, config: &SplitTextConfig) -> Vec<SplitTargets> {
    let blocks = query_or_skip(layout, &config.block_selector, "split text");
    let lefts = layout.query(&config.left_selector);
    let rights = layout.query(&config.right_selector);
    blocks
        .into_iter()
        .zip(lefts)
        .zip(rights)
        .map(|((block, left), right)| SplitTargets { block, left, right })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ElementGeometry, StaticLayout};
    use crate::style::RecordingSink;

    fn desktop() -> Viewport {
        Viewport {
            width: 1280.0,
            height: 800.0,
            can_hover: true,
        }
    }

    fn page() -> StaticLayout {
        let mut layout = StaticLayout::new(desktop());
        layout.insert(
            ".software-track",
            ElementGeometry {
                scroll_width: 1000.0,
                ..ElementGeometry::default()
            },
        );
        for _ in 0..2 {
            layout.insert(
                ".gallery-column",
                ElementGeometry {
                    scroll_height: 2400.0,
                    ..ElementGeometry::default()
                },
            );
        }
        layout.insert(
            ".section-title",
            ElementGeometry {
                top: 1067.0,
                height: 80.0,
                ..ElementGeometry::default()
            },
        );
        layout.insert(
            ".scroll-section",
            ElementGeometry {
                top: 900.0,
                height: 1000.0,
                ..ElementGeometry::default()
            },
        );
        layout
    }

    #[test]
    fn test_mount_skips_missing_elements() {
        let layout = page();
        let mut sink = RecordingSink::new();
        let mut driver = AnimationDriver::new(0.0);
        let handles = mount_page(&EngineConfig::default(), &mut driver, &layout, &mut sink).unwrap();
        let names: Vec<&str> = handles.iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["marquee", "parallax", "title-slide", "section-reveal"]);
    }

    #[test]
    fn test_mount_rejects_invalid_config() {
        let layout = page();
        let mut sink = RecordingSink::new();
        let mut driver = AnimationDriver::new(0.0);
        let mut config = EngineConfig::default();
        config.heading_fade.solid_point = 0.95;
        assert!(mount_page(&config, &mut driver, &layout, &mut sink).is_err());
        assert_eq!(driver.task_count(), 0);
    }

    #[test]
    fn test_marquee_writes_each_frame() {
        let layout = page();
        let mut sink = RecordingSink::new();
        let mut driver = AnimationDriver::new(0.0);
        let track = TargetId::new(".software-track", 0);
        let effect = MarqueeEffect::new(&MarqueeConfig::default(), track.clone()).unwrap();
        driver.spawn(Box::new(effect), &layout, &mut sink);
        assert_eq!(sink.last_transform(&track), Some("translateX(0px)"));
        for i in 0..3 {
            driver.frame(i as f64 * 16.0, &layout, &mut sink);
        }
        assert_eq!(sink.last_transform(&track), Some("translateX(-3px)"));
    }

    #[test]
    fn test_unmeasured_marquee_writes_nothing() {
        let mut layout = StaticLayout::new(desktop());
        let track = layout.insert(".software-track", ElementGeometry::default());
        let mut sink = RecordingSink::new();
        let mut driver = AnimationDriver::new(0.0);
        let effect = MarqueeEffect::new(&MarqueeConfig::default(), track.clone()).unwrap();
        driver.spawn(Box::new(effect), &layout, &mut sink);
        sink.take();
        driver.frame(0.0, &layout, &mut sink);
        assert!(sink.writes().is_empty());

        // A later resize with a real width starts it.
        layout.element_mut(&track).unwrap().scroll_width = 600.0;
        driver.resize(&layout, &mut sink);
        driver.frame(16.0, &layout, &mut sink);
        assert_eq!(sink.last_transform(&track), Some("translateX(-1px)"));
    }

    #[test]
    fn test_parallax_waits_for_content() {
        let mut layout = page();
        layout.set_loaded(false);
        let mut sink = RecordingSink::new();
        let mut driver = AnimationDriver::new(0.0);
        let columns = layout.query(".gallery-column");
        let effect = ParallaxEffect::new(
            &ParallaxConfig::default(),
            CapabilityGate::default(),
            columns.clone(),
            0.0,
        )
        .unwrap();
        driver.spawn(Box::new(effect), &layout, &mut sink);
        driver.scroll_to(1000.0, &layout, &mut sink);
        driver.frame(0.0, &layout, &mut sink);
        assert_eq!(sink.last_transform(&columns[0]), None);

        layout.set_loaded(true);
        driver.content_loaded(&layout, &mut sink);
        driver.frame(16.0, &layout, &mut sink);
        // Smoothed scroll is 100 after one frame; -0.4 * 100 = -40.
        assert_eq!(sink.last_transform(&columns[0]), Some("translateY(-40px)"));
    }

    #[test]
    fn test_parallax_disabled_on_narrow_viewport() {
        let mut layout = page();
        layout.set_viewport(Viewport {
            width: 500.0,
            ..desktop()
        });
        let mut sink = RecordingSink::new();
        let mut driver = AnimationDriver::new(0.0);
        let columns = layout.query(".gallery-column");
        let effect = ParallaxEffect::new(
            &ParallaxConfig::default(),
            CapabilityGate::default(),
            columns.clone(),
            0.0,
        )
        .unwrap();
        driver.spawn(Box::new(effect), &layout, &mut sink);
        // Rest style written once on mount.
        assert_eq!(sink.take().len(), 2);
        driver.scroll_to(1000.0, &layout, &mut sink);
        driver.frame(0.0, &layout, &mut sink);
        assert!(sink.writes().is_empty());

        layout.set_viewport(desktop());
        driver.resize(&layout, &mut sink);
        driver.frame(16.0, &layout, &mut sink);
        assert!(sink.last_transform(&columns[1]).is_some());
    }

    #[test]
    fn test_title_slide_follows_scroll() {
        let mut layout = page();
        let mut sink = RecordingSink::new();
        let mut driver = AnimationDriver::new(0.0);
        let titles = layout.query(".section-title");
        let slide = SlideReveal::new(&Default::default()).unwrap();
        let effect = TitleSlideEffect::new(slide, CapabilityGate::default(), titles.clone());
        driver.spawn(Box::new(effect), &layout, &mut sink);
        assert_eq!(sink.last_transform(&titles[0]), Some("translateX(-150px)"));

        // Title top 1067 - 800 = 267 from the viewport top.
        layout.set_scroll_offset(800.0);
        driver.scroll_to(800.0, &layout, &mut sink);
        let transform = sink.last_transform(&titles[0]).unwrap().to_string();
        assert!(transform.starts_with("translateX(-80.1"), "{}", transform);
    }

    #[test]
    fn test_heading_fade_and_split() {
        let mut layout = StaticLayout::new(desktop());
        let heading = layout.insert(
            ".transition-heading",
            ElementGeometry {
                top: 600.0,
                height: 100.0,
                ..ElementGeometry::default()
            },
        );
        layout.insert(
            ".split-text",
            ElementGeometry {
                top: 150.0,
                height: 100.0,
                ..ElementGeometry::default()
            },
        );
        let left = layout.insert(".split-left", ElementGeometry::default());
        let right = layout.insert(".split-right", ElementGeometry::default());

        let mut sink = RecordingSink::new();
        let mut driver = AnimationDriver::new(0.0);
        let handles =
            mount_page(&EngineConfig::default(), &mut driver, &layout, &mut sink).unwrap();
        assert_eq!(handles.len(), 2);

        // 600 / 800 = 0.75: halfway through the fade-in.
        let opacity: f32 = sink.last_opacity(&heading).unwrap().parse().unwrap();
        assert!((opacity - 0.5).abs() < 1e-4);
        // Block center 200, viewport center 400: half of max separation.
        assert_eq!(sink.last_transform(&left), Some("translateX(-50px)"));
        assert_eq!(sink.last_transform(&right), Some("translateX(50px)"));
    }

    #[test]
    fn test_section_reveal_latches() {
        let mut layout = page();
        let mut sink = RecordingSink::new();
        let mut driver = AnimationDriver::new(0.0);
        let sections = layout.query(".scroll-section");
        let effect =
            SectionRevealEffect::new(&SectionRevealConfig::default(), sections.clone()).unwrap();
        driver.spawn(Box::new(effect), &layout, &mut sink);
        assert!(!sink.has_class(&sections[0], "in-view"));

        // 100px visible of 1000: not enough.
        layout.set_scroll_offset(200.0);
        driver.scroll_to(200.0, &layout, &mut sink);
        assert!(!sink.has_class(&sections[0], "in-view"));

        // 300px visible: revealed.
        layout.set_scroll_offset(400.0);
        driver.scroll_to(400.0, &layout, &mut sink);
        assert!(sink.has_class(&sections[0], "in-view"));

        layout.set_scroll_offset(0.0);
        driver.scroll_to(0.0, &layout, &mut sink);
        let class_writes = sink
            .writes()
            .iter()
            .filter(|w| matches!(w, crate::style::StyleWrite::Class { .. }))
            .count();
        assert_eq!(class_writes, 1);
    }
}
