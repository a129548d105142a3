//! Scroll offset tracking for the page's scroll container.

/// Last two observed offsets of a scroll container.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollState {
    pub previous_offset: f32,
    pub current_offset: f32,
}

/// Turns raw scroll offsets into per-event deltas.
///
/// Each delta is handed out exactly once: observing an offset consumes the
/// difference from the previous one and makes it the new baseline.
#[derive(Clone, Debug, Default)]
pub struct ScrollSignal {
    state: ScrollState,
}

impl ScrollSignal {
    /// Start tracking from an initial offset (the container may already be
    /// scrolled when the page mounts).
    pub fn new(initial_offset: f32) -> Self {
        Self {
            state: ScrollState {
                previous_offset: initial_offset,
                current_offset: initial_offset,
            },
        }
    }

    /// Record a new offset and return the delta since the last observation.
    /// Positive deltas mean the content moved up (scrolling down).
    pub fn observe(&mut self, offset: f32) -> f32 {
        self.state.previous_offset = self.state.current_offset;
        self.state.current_offset = offset;
        self.state.current_offset - self.state.previous_offset
    }

    pub fn offset(&self) -> f32 {
        self.state.current_offset
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }
}
