//! Collision tests for axis-aligned boxes
//!
//! Two flavours: box against the corridor heightfield and box against box.
//! Both are pure predicates; the stepper decides what a hit means.

use glam::Vec2;

use super::entity::Body;
use super::terrain::Terrain;

/// Result of a box-vs-box check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    /// Whether the boxes intersect
    pub hit: bool,
    /// Penetration along each axis (zero on a miss)
    pub depth: Vec2,
}

impl Overlap {
    pub fn miss() -> Self {
        Self {
            hit: false,
            depth: Vec2::ZERO,
        }
    }
}

/// Box-vs-box overlap. Boxes that only touch along an edge do not collide.
pub fn box_overlap(a: &Body, b: &Body) -> Overlap {
    let reach = a.half_extent + b.half_extent;
    let gap = (a.pos - b.pos).abs();
    if gap.x < reach.x && gap.y < reach.y {
        Overlap {
            hit: true,
            depth: reach - gap,
        }
    } else {
        Overlap::miss()
    }
}

#[inline]
pub fn bodies_collide(a: &Body, b: &Body) -> bool {
    box_overlap(a, b).hit
}

/// Point-vs-terrain
#[inline]
pub fn point_hits_terrain(terrain: &Terrain, p: Vec2) -> bool {
    terrain.is_solid(p)
}

/// Box-vs-terrain: any bar under the box's horizontal extent whose ceiling
/// dips below the box top or whose floor rises above the box bottom.
pub fn body_hits_terrain(terrain: &Terrain, body: &Body) -> bool {
    let min = body.min();
    let max = body.max();
    terrain
        .bars_between(min.x, max.x)
        .iter()
        .any(|bar| min.y < bar.ceiling || max.y > bar.floor)
}
