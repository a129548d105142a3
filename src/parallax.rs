//! Parallax image columns.
//!
//! All columns follow one smoothed copy of the container's scroll offset,
//! each scaled by its own signed speed ratio and looped over half of its
//! (duplicated) content height.

use crate::config::{ConfigError, ParallaxConfig};
use crate::looping_track::fold_into_band;
use crate::smoother::SmoothedValue;

/// Offset of a column for a given smoothed scroll value, in
/// `(-half_height, 0]`. None while the column has no usable height.
pub fn column_offset(scroll_y: f32, speed_ratio: f32, half_height: f32) -> Option<f32> {
    if !(half_height > 0.0) {
        return None;
    }
    Some(fold_into_band(scroll_y * speed_ratio, half_height))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnState {
    pub speed_ratio: f32,
    /// Zero until measured after the column's images loaded.
    pub content_half_height: f32,
}

impl ColumnState {
    pub fn offset(&self, scroll_y: f32) -> Option<f32> {
        column_offset(scroll_y, self.speed_ratio, self.content_half_height)
    }
}

pub struct ParallaxField {
    scroll: SmoothedValue,
    columns: Vec<ColumnState>,
    offsets: Vec<Option<f32>>,
}

impl ParallaxField {
    pub fn new(config: &ParallaxConfig, column_count: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        let columns = (0..column_count)
            .map(|i| ColumnState {
                speed_ratio: config.ratio_for(i),
                content_half_height: 0.0,
            })
            .collect();
        Ok(Self {
            // The scroll offset is an absolute quantity, so it must not decay.
            scroll: SmoothedValue::new(config.blend_factor, 1.0)?,
            columns,
            offsets: vec![None; column_count],
        })
    }

    /// Start from the container's current offset without easing in from zero.
    pub fn snap_scroll(&mut self, offset: f32) {
        self.scroll.snap(offset);
    }

    pub fn set_scroll_target(&mut self, offset: f32) {
        self.scroll.set_target(offset);
    }

    /// Record a column's full content height. Returns false (and leaves the
    /// column static) for an unusable measurement.
    pub fn measure_column(&mut self, index: usize, content_height: f32) -> bool {
        let Some(column) = self.columns.get_mut(index) else {
            return false;
        };
        let half_height = content_height / 2.0;
        if half_height > 0.0 && half_height.is_finite() {
            column.content_half_height = half_height;
            true
        } else {
            log::debug!(
                "Parallax column {} measured with height {}; leaving static",
                index,
                content_height
            );
            column.content_half_height = 0.0;
            false
        }
    }

    /// True once every column has a usable height.
    pub fn is_ready(&self) -> bool {
        !self.columns.is_empty() && self.columns.iter().all(|c| c.content_half_height > 0.0)
    }

    /// Advance the shared scroll value one frame and recompute column offsets.
    pub fn tick(&mut self) -> &[Option<f32>] {
        let scroll_y = self.scroll.tick();
        for (slot, column) in self.offsets.iter_mut().zip(&self.columns) {
            *slot = column.offset(scroll_y);
        }
        &self.offsets
    }

    pub fn smoothed_scroll(&self) -> f32 {
        self.scroll.current
    }

    pub fn columns(&self) -> &[ColumnState] {
        &self.columns
    }

    pub fn offsets(&self) -> &[Option<f32>] {
        &self.offsets
    }
}
