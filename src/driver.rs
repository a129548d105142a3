//! Frame-driven scheduling of effects.
//!
//! The host calls [`AnimationDriver::frame`] once per display refresh and
//! forwards scroll, resize and load events as they arrive. Events only move
//! targets inside each effect; visible output on animated effects changes in
//! `on_frame`, so bursts of events still render smoothly.
//!
//! Every effect owns its state outright. The only thing effects share is the
//! scroll offset, which the driver hands out read-only.

use std::cell::Cell;
use std::rc::Rc;

use crate::layout::Layout;
use crate::scroll_signal::ScrollSignal;
use crate::style::StyleSink;

/// One scroll event as seen by effects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollEvent {
    pub offset: f32,
    /// Change since the previous event; consumed by exactly one dispatch.
    pub delta: f32,
}

/// Per-frame inputs.
pub struct FrameContext<'a> {
    /// Host timestamp; only used for ordering.
    pub timestamp_ms: f64,
    pub frame: u64,
    pub scroll_offset: f32,
    pub layout: &'a dyn Layout,
}

/// A continuously running visual effect.
pub trait Effect {
    fn name(&self) -> &'static str;

    /// Called once when the effect is spawned, to write its initial state.
    fn on_mount(&mut self, _layout: &dyn Layout, _sink: &mut dyn StyleSink) {}

    fn on_scroll(&mut self, _event: &ScrollEvent, _layout: &dyn Layout, _sink: &mut dyn StyleSink) {}

    fn on_resize(&mut self, _layout: &dyn Layout, _sink: &mut dyn StyleSink) {}

    /// Late content (images) finished loading; extents are now final.
    fn on_content_loaded(&mut self, _layout: &dyn Layout, _sink: &mut dyn StyleSink) {}

    fn on_frame(&mut self, _frame: &FrameContext<'_>, _sink: &mut dyn StyleSink) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// Handle to a spawned effect. Cancelling stops it before the next dispatch.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    id: TaskId,
    name: &'static str,
    cancelled: Rc<Cell<bool>>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

struct Task {
    id: TaskId,
    effect: Box<dyn Effect>,
    cancelled: Rc<Cell<bool>>,
}

pub struct AnimationDriver {
    scroll: ScrollSignal,
    tasks: Vec<Task>,
    next_id: u64,
    frame: u64,
    last_timestamp: f64,
}

impl AnimationDriver {
    pub fn new(initial_scroll_offset: f32) -> Self {
        Self {
            scroll: ScrollSignal::new(initial_scroll_offset),
            tasks: Vec::new(),
            next_id: 0,
            frame: 0,
            last_timestamp: f64::NEG_INFINITY,
        }
    }

    /// Mount an effect and start running it from the next frame.
    pub fn spawn(
        &mut self,
        mut effect: Box<dyn Effect>,
        layout: &dyn Layout,
        sink: &mut dyn StyleSink,
    ) -> TaskHandle {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let name = effect.name();
        effect.on_mount(layout, sink);
        log::debug!("Started effect '{}' ({:?})", name, id);

        let cancelled = Rc::new(Cell::new(false));
        self.tasks.push(Task {
            id,
            effect,
            cancelled: cancelled.clone(),
        });
        TaskHandle {
            id,
            name,
            cancelled,
        }
    }

    /// Forward a scroll container offset change.
    pub fn scroll_to(&mut self, offset: f32, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        let delta = self.scroll.observe(offset);
        let event = ScrollEvent { offset, delta };
        self.prune();
        for task in &mut self.tasks {
            task.effect.on_scroll(&event, layout, sink);
        }
    }

    pub fn resize(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.prune();
        for task in &mut self.tasks {
            task.effect.on_resize(layout, sink);
        }
    }

    pub fn content_loaded(&mut self, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        self.prune();
        for task in &mut self.tasks {
            task.effect.on_content_loaded(layout, sink);
        }
    }

    /// Run every live effect once. Timestamps that go backwards are ignored.
    pub fn frame(&mut self, timestamp_ms: f64, layout: &dyn Layout, sink: &mut dyn StyleSink) {
        if timestamp_ms < self.last_timestamp {
            log::trace!(
                "Dropping out-of-order frame at {} (last {})",
                timestamp_ms,
                self.last_timestamp
            );
            return;
        }
        self.last_timestamp = timestamp_ms;
        self.prune();

        let ctx = FrameContext {
            timestamp_ms,
            frame: self.frame,
            scroll_offset: self.scroll.offset(),
            layout,
        };
        for task in &mut self.tasks {
            task.effect.on_frame(&ctx, sink);
        }
        self.frame += 1;
    }

    /// Cancel every effect, e.g. when the owning view is torn down.
    pub fn cancel_all(&mut self) {
        for task in &self.tasks {
            task.cancelled.set(true);
        }
        self.prune();
    }

    pub fn task_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.cancelled.get()).count()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll.offset()
    }

    fn prune(&mut self) {
        self.tasks.retain(|task| {
            let keep = !task.cancelled.get();
            if !keep {
                log::debug!("Stopped effect '{}' ({:?})", task.effect.name(), task.id);
            }
            keep
        });
    }
}
