//! Corridor heightfield
//!
//! The corridor is a row of vertical bars of fixed width. Each bar stores the
//! screen-space y of its ceiling edge and of its floor edge; everything above
//! the ceiling or below the floor is solid rock.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One column of the corridor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// y of the ceiling edge (solid above)
    pub ceiling: f32,
    /// y of the floor edge (solid below)
    pub floor: f32,
}

impl Bar {
    pub fn new(ceiling: f32, floor: f32) -> Self {
        Self { ceiling, floor }
    }

    #[inline]
    pub fn is_solid(&self, y: f32) -> bool {
        y < self.ceiling || y > self.floor
    }
}

/// Immutable per-run heightfield
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Terrain {
    bar_width: f32,
    bars: Vec<Bar>,
}

impl Terrain {
    /// Build a terrain. Fails on an empty bar list or a non-positive width.
    pub fn new(bar_width: f32, bars: Vec<Bar>) -> Result<Self, ConfigError> {
        if bars.is_empty() {
            return Err(ConfigError::EmptyTerrain);
        }
        if !(bar_width > 0.0) {
            return Err(ConfigError::BarWidth(bar_width));
        }
        Ok(Self { bar_width, bars })
    }

    /// Flat corridor with the same ceiling and floor everywhere
    pub fn flat(bar_width: f32, len: usize, ceiling: f32, floor: f32) -> Result<Self, ConfigError> {
        Self::new(bar_width, vec![Bar::new(ceiling, floor); len])
    }

    pub fn bar_width(&self) -> f32 {
        self.bar_width
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Horizontal extent covered by bars, `[0, len * bar_width)`
    pub fn span(&self) -> (f32, f32) {
        (0.0, self.bars.len() as f32 * self.bar_width)
    }

    /// Whether `x` lies inside the generated span
    #[inline]
    pub fn contains_x(&self, x: f32) -> bool {
        let (start, end) = self.span();
        x >= start && x < end
    }

    /// Bar index for `x`, clamped to the first/last bar outside the span
    #[inline]
    pub fn bar_index(&self, x: f32) -> usize {
        let raw = (x / self.bar_width).floor();
        if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(self.bars.len() - 1)
        }
    }

    #[inline]
    pub fn bar_at(&self, x: f32) -> Bar {
        self.bars[self.bar_index(x)]
    }

    pub fn ceiling_at(&self, x: f32) -> f32 {
        self.bar_at(x).ceiling
    }

    pub fn floor_at(&self, x: f32) -> f32 {
        self.bar_at(x).floor
    }

    /// Vertical midpoint of the corridor at `x` (spawn height)
    pub fn y_center(&self, x: f32) -> f32 {
        let bar = self.bar_at(x);
        (bar.ceiling + bar.floor) / 2.0
    }

    /// Point-in-solid query
    #[inline]
    pub fn is_solid(&self, p: Vec2) -> bool {
        self.bar_at(p.x).is_solid(p.y)
    }

    /// Bars overlapped by the horizontal interval `[min_x, max_x]`
    pub fn bars_between(&self, min_x: f32, max_x: f32) -> &[Bar] {
        let lo = self.bar_index(min_x.min(max_x));
        let hi = self.bar_index(min_x.max(max_x));
        &self.bars[lo..=hi]
    }
}
