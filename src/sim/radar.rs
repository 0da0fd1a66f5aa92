//! Radars: deterministic sensors that turn geometry into bounded features
//!
//! - [`RayRadar`]: marches a ray through the terrain, refined to sub-step accuracy
//! - [`ObjectRadar`]: angular histogram of the nearest visible object per slice
//! - [`ObjectAttributeRadar`]: object radar that also reports attributes of the
//!   nearest object in each slice
//! - [`BinaryRadar`]: one-hot bearing of a single contact point
//!
//! None of them keep state between reads.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::Locatable;
use super::terrain::Terrain;
use crate::error::ConfigError;
use crate::{bucket_index, screen_angle};

/// Result of a single ray read
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayReading {
    /// First contact point, or the last sample when nothing was hit
    pub point: Vec2,
    /// Steps taken over `max_steps`, 1.0 when nothing was hit
    pub distance: f32,
}

impl RayReading {
    pub fn hit(&self) -> bool {
        self.distance < 1.0
    }
}

/// Directional ray caster against the terrain
#[derive(Debug, Clone, PartialEq)]
pub struct RayRadar {
    direction: f32,
    max_steps: u32,
    /// Advance per step; its x component is the configured step size
    step: Vec2,
    /// One horizontal unit along the ray, used to back off after a hit
    sub_step: Vec2,
    sub_fraction: f32,
    sub_steps: u32,
}

impl RayRadar {
    /// `direction` is counter-clockwise from `+x` (screen y points down).
    /// A negative `x_step` casts the ray backwards.
    pub fn new(direction: f32, max_steps: u32, x_step: f32) -> Result<Self, ConfigError> {
        if max_steps == 0 {
            return Err(ConfigError::ZeroSteps { sensor: "ray radar" });
        }
        if !(x_step.abs() > 0.0) || !x_step.is_finite() {
            return Err(ConfigError::StepSize {
                sensor: "ray radar",
                value: x_step,
            });
        }
        let unit = Vec2::new(direction.cos(), -direction.sin());
        if unit.x.abs() < 1e-6 {
            return Err(ConfigError::VerticalRay(direction));
        }
        let step = Vec2::new(x_step, x_step * unit.y / unit.x);
        let x_len = x_step.abs();
        Ok(Self {
            direction,
            max_steps,
            step,
            sub_step: step / x_len,
            sub_fraction: 1.0 / x_len,
            sub_steps: (x_len as u32).saturating_sub(1),
        })
    }

    pub fn direction(&self) -> f32 {
        self.direction
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Per-step displacement
    pub fn step(&self) -> Vec2 {
        self.step
    }

    /// Whether the ray travels towards `+x`
    pub fn faces_forward(&self) -> bool {
        self.step.x > 0.0
    }

    pub fn read(&self, origin: Vec2, terrain: &Terrain) -> RayReading {
        let mut p = origin;
        for n in 1..=self.max_steps {
            p += self.step;
            if terrain.is_solid(p) {
                let mut steps = n as f32;
                for _ in 0..self.sub_steps {
                    if !terrain.is_solid(p - self.sub_step) {
                        break;
                    }
                    p -= self.sub_step;
                    steps -= self.sub_fraction;
                }
                return RayReading {
                    point: p,
                    distance: steps / self.max_steps as f32,
                };
            }
        }
        RayReading {
            point: p,
            distance: 1.0,
        }
    }
}

/// Direction an agent looks towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

/// Field of view of an angular radar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    /// Full circle
    Full,
    /// Only the half plane in front of the agent
    Half(Facing),
}

/// Angular histogram of nearby objects, occlusion-checked against terrain
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRadar {
    buckets: usize,
    x_step: f32,
    max_num_steps: u32,
    max_dist: f32,
    field: Field,
    slice: f32,
}

impl ObjectRadar {
    pub fn new(
        buckets: usize,
        x_step: f32,
        max_num_steps: u32,
        max_dist: f32,
        field: Field,
    ) -> Result<Self, ConfigError> {
        if buckets == 0 {
            return Err(ConfigError::ZeroBuckets {
                sensor: "object radar",
            });
        }
        if !(x_step > 0.0) {
            return Err(ConfigError::StepSize {
                sensor: "object radar",
                value: x_step,
            });
        }
        if max_num_steps == 0 {
            return Err(ConfigError::ZeroSteps {
                sensor: "object radar",
            });
        }
        if !(max_dist > 0.0) {
            return Err(ConfigError::MaxDist {
                sensor: "object radar",
                value: max_dist,
            });
        }
        let span = match field {
            Field::Full => TAU,
            Field::Half(_) => PI,
        };
        Ok(Self {
            buckets,
            x_step,
            max_num_steps,
            max_dist,
            field,
            slice: span / buckets as f32,
        })
    }

    pub fn buckets(&self) -> usize {
        self.buckets
    }

    pub fn max_dist(&self) -> f32 {
        self.max_dist
    }

    pub fn field(&self) -> Field {
        self.field
    }

    /// Normalized distance per bucket, 1.0 where nothing is visible
    pub fn read<'a, T, I>(&self, origin: Vec2, objects: I, terrain: &Terrain) -> Vec<f32>
    where
        T: Locatable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut dists: Vec<f32> = vec![1.0; self.buckets];
        self.scan(origin, objects, terrain, |bucket, dist, _| {
            dists[bucket] = dists[bucket].min(dist);
        });
        dists
    }

    /// Visit every visible object in range with its bucket and normalized distance
    fn scan<'a, T, I, F>(&self, origin: Vec2, objects: I, terrain: &Terrain, mut visit: F)
    where
        T: Locatable + 'a,
        I: IntoIterator<Item = &'a T>,
        F: FnMut(usize, f32, &'a T),
    {
        for object in objects {
            let diff = object.position() - origin;
            if let Field::Half(facing) = self.field {
                if diff.x * facing.sign() < 0.0 {
                    continue;
                }
            }
            let dist = diff.length();
            if dist > self.max_dist {
                continue;
            }
            if !self.line_of_sight(origin, diff, terrain) {
                continue;
            }
            visit(self.bucket_of(diff), dist / self.max_dist, object);
        }
    }

    /// Coarse line-of-sight check: `min(|dx| / x_step, max_num_steps)` samples
    fn line_of_sight(&self, origin: Vec2, diff: Vec2, terrain: &Terrain) -> bool {
        let num_steps = ((diff.x.abs() / self.x_step) as u32).min(self.max_num_steps);
        if num_steps == 0 {
            return true;
        }
        let step = diff / num_steps as f32;
        let mut p = origin;
        for _ in 0..num_steps {
            p += step;
            if terrain.is_solid(p) {
                return false;
            }
        }
        true
    }

    /// Bucket index for a displacement
    pub fn bucket_of(&self, diff: Vec2) -> usize {
        let angle = match self.field {
            Field::Full => PI + screen_angle(diff.x, diff.y),
            Field::Half(facing) => FRAC_PI_2 + screen_angle(facing.sign() * diff.x, diff.y),
        };
        bucket_index(angle, self.slice, self.buckets)
    }
}

/// Object radar plus attributes of the nearest object per bucket
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeReading {
    pub dists: Vec<f32>,
    /// One bucket-aligned vector per attribute, 0.0 for empty buckets
    pub attributes: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAttributeRadar {
    radar: ObjectRadar,
}

impl ObjectAttributeRadar {
    pub fn new(radar: ObjectRadar) -> Self {
        Self { radar }
    }

    pub fn radar(&self) -> &ObjectRadar {
        &self.radar
    }

    /// Feature count for `num_attributes` attributes (distances included)
    pub fn feature_len(&self, num_attributes: usize) -> usize {
        self.radar.buckets * (1 + num_attributes)
    }

    pub fn read<'a, T, I, F>(
        &self,
        origin: Vec2,
        objects: I,
        terrain: &Terrain,
        attributes: &[F],
    ) -> AttributeReading
    where
        T: Locatable + 'a,
        I: IntoIterator<Item = &'a T>,
        F: Fn(&T) -> f32,
    {
        let buckets = self.radar.buckets;
        let mut dists: Vec<f32> = vec![1.0; buckets];
        let mut nearest: Vec<Option<&'a T>> = vec![None; buckets];
        self.radar.scan(origin, objects, terrain, |bucket, dist, object| {
            if nearest[bucket].is_none() || dist < dists[bucket] {
                dists[bucket] = dist;
                nearest[bucket] = Some(object);
            }
        });

        let attributes = attributes
            .iter()
            .map(|attribute| {
                nearest
                    .iter()
                    .map(|hit| hit.map_or(0.0, |object| attribute(object)))
                    .collect()
            })
            .collect();

        AttributeReading { dists, attributes }
    }
}

/// One-hot bearing of a single contact point
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryRadar {
    buckets: usize,
    bottom_half: bool,
    slice: f32,
}

impl BinaryRadar {
    pub fn new(buckets: usize, bottom_half: bool) -> Result<Self, ConfigError> {
        if buckets == 0 {
            return Err(ConfigError::ZeroBuckets {
                sensor: "binary radar",
            });
        }
        let span = if bottom_half { PI } else { TAU };
        Ok(Self {
            buckets,
            bottom_half,
            slice: span / buckets as f32,
        })
    }

    pub fn buckets(&self) -> usize {
        self.buckets
    }

    pub fn read(&self, origin: Vec2, contact: Option<Vec2>) -> Vec<f32> {
        let mut contacts = vec![0.0; self.buckets];
        let Some(point) = contact else {
            return contacts;
        };
        let diff = point - origin;
        if self.bottom_half {
            // Screen y grows downwards, so below the origin is a positive angle here
            let angle = diff.y.atan2(diff.x);
            if angle >= 0.0 {
                contacts[bucket_index(angle, self.slice, self.buckets)] = 1.0;
            }
        } else {
            let angle = PI + screen_angle(diff.x, diff.y);
            contacts[bucket_index(angle, self.slice, self.buckets)] = 1.0;
        }
        contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::terrain::Bar;
    use proptest::prelude::*;

    fn open_terrain() -> Terrain {
        Terrain::flat(10.0, 1000, -100_000.0, 100_000.0).unwrap()
    }

    /// Open corridor with a floor at y = 100
    fn floor_terrain() -> Terrain {
        Terrain::flat(10.0, 200, -1_000.0, 100.0).unwrap()
    }

    #[test]
    fn test_ray_config_errors() {
        assert!(matches!(RayRadar::new(0.0, 0, 1.0), Err(ConfigError::ZeroSteps { .. })));
        assert!(matches!(RayRadar::new(0.0, 10, 0.0), Err(ConfigError::StepSize { .. })));
        assert!(matches!(
            RayRadar::new(FRAC_PI_2, 10, 1.0),
            Err(ConfigError::VerticalRay(_))
        ));
    }

    #[test]
    fn test_ray_refines_hit_to_sub_step() {
        // 45° downwards, 4 px steps: samples at y = 6.5, 10.5, ..., floor edge at 100
        let terrain = floor_terrain();
        let radar = RayRadar::new(-PI / 4.0, 50, 4.0).unwrap();
        let reading = radar.read(Vec2::new(50.0, 2.5), &terrain);
        assert!(reading.hit());
        // First solid sample is y = 102.5 (step 25); backing off twice lands on y = 100.5
        assert!((reading.point.y - 100.5).abs() < 1e-3);
        assert!((reading.distance - 24.5 / 50.0).abs() < 1e-5);
    }

    #[test]
    fn test_ray_backwards() {
        // Wall on the left: bar 0 is solid rock
        let mut bars = vec![Bar::new(-1_000.0, 1_000.0); 20];
        bars[0] = Bar::new(1_000.0, -1_000.0);
        let terrain = Terrain::new(10.0, bars).unwrap();
        let radar = RayRadar::new(0.0, 100, -2.0).unwrap();
        assert!(!radar.faces_forward());
        let reading = radar.read(Vec2::new(50.0, 0.0), &terrain);
        assert!(reading.hit());
        assert!((reading.point.x - 9.0).abs() < 1e-4);
        assert!((reading.distance - 20.5 / 100.0).abs() < 1e-5);
    }

    #[test]
    fn test_object_radar_nearest_per_bucket() {
        let terrain = open_terrain();
        let radar = ObjectRadar::new(4, 10.0, 100, 100.0, Field::Full).unwrap();
        let origin = Vec2::new(500.0, 0.0);
        // Both straight ahead; angle π lands in bucket 2
        let objects = [Vec2::new(550.0, 0.0), Vec2::new(520.0, 0.0)];
        let dists = radar.read(origin, &objects, &terrain);
        assert_eq!(dists, vec![1.0, 1.0, 0.2, 1.0]);
    }

    #[test]
    fn test_object_radar_half_plane_skips_behind() {
        let terrain = open_terrain();
        let radar = ObjectRadar::new(4, 10.0, 100, 100.0, Field::Half(Facing::Left)).unwrap();
        let origin = Vec2::new(500.0, 0.0);
        let dists = radar.read(origin, &[Vec2::new(550.0, 0.0)], &terrain);
        assert_eq!(dists, vec![1.0; 4]);

        // Straight ahead to the left is the middle of the half plane
        let dists = radar.read(origin, &[Vec2::new(450.0, 0.0)], &terrain);
        assert_eq!(dists, vec![1.0, 1.0, 0.5, 1.0]);
    }

    #[test]
    fn test_object_radar_occlusion() {
        // Pillar of rock at x in [520, 530)
        let mut bars = vec![Bar::new(-1_000.0, 1_000.0); 100];
        bars[52] = Bar::new(1_000.0, -1_000.0);
        let terrain = Terrain::new(10.0, bars).unwrap();
        let radar = ObjectRadar::new(8, 5.0, 100, 200.0, Field::Full).unwrap();
        let origin = Vec2::new(500.0, 0.0);
        let hidden = [Vec2::new(560.0, 0.0)];
        assert_eq!(radar.read(origin, &hidden, &terrain), vec![1.0; 8]);

        // A visible object behind the agent still registers
        let both = [Vec2::new(560.0, 0.0), Vec2::new(440.0, 0.0)];
        let dists = radar.read(origin, &both, &terrain);
        assert_eq!(dists.iter().filter(|d| **d < 1.0).count(), 1);
        assert!((dists[bucket_for(&radar, Vec2::new(-60.0, 0.0))] - 0.3).abs() < 1e-6);
    }

    fn bucket_for(radar: &ObjectRadar, diff: Vec2) -> usize {
        radar.bucket_of(diff)
    }

    #[test]
    fn test_bucket_boundary_angle_clamped() {
        // Straight left with y = -0.0 gives atan2(0, -x) = π, i.e. angle 2π
        let radar = ObjectRadar::new(8, 10.0, 10, 100.0, Field::Full).unwrap();
        assert_eq!(radar.bucket_of(Vec2::new(-10.0, -0.0)), 7);
        assert_eq!(radar.bucket_of(Vec2::new(-10.0, 0.0)), 0);

        // Straight up in a left-facing half field is angle π
        let half = ObjectRadar::new(4, 10.0, 10, 100.0, Field::Half(Facing::Left)).unwrap();
        assert_eq!(half.bucket_of(Vec2::new(-0.0, -10.0)), 3);
    }

    #[test]
    fn test_attribute_radar_reports_nearest_object() {
        #[derive(Debug)]
        struct Blip {
            pos: Vec2,
            tag: f32,
        }
        impl Locatable for Blip {
            fn position(&self) -> Vec2 {
                self.pos
            }
        }

        let terrain = open_terrain();
        let radar = ObjectAttributeRadar::new(
            ObjectRadar::new(4, 10.0, 100, 100.0, Field::Full).unwrap(),
        );
        let origin = Vec2::new(500.0, 0.0);
        let objects = [
            Blip {
                pos: Vec2::new(520.0, 0.0),
                tag: 1.0,
            },
            Blip {
                pos: Vec2::new(560.0, 0.0),
                tag: 2.0,
            },
        ];
        let tag = |b: &Blip| b.tag;
        let double = |b: &Blip| b.tag * 2.0;
        let attrs: [&dyn Fn(&Blip) -> f32; 2] = [&tag, &double];
        let reading = radar.read(origin, &objects, &terrain, &attrs);
        assert_eq!(reading.dists, vec![1.0, 1.0, 0.2, 1.0]);
        assert_eq!(reading.attributes[0], vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(reading.attributes[1], vec![0.0, 0.0, 2.0, 0.0]);
        assert_eq!(radar.feature_len(2), 12);
    }

    #[test]
    fn test_binary_radar() {
        let radar = BinaryRadar::new(4, true).unwrap();
        let origin = Vec2::ZERO;
        assert_eq!(radar.read(origin, None), vec![0.0; 4]);
        // Directly below
        assert_eq!(radar.read(origin, Some(Vec2::new(0.0, 10.0))), vec![0.0, 0.0, 1.0, 0.0]);
        // Above is ignored in bottom-half mode
        assert_eq!(radar.read(origin, Some(Vec2::new(0.0, -10.0))), vec![0.0; 4]);

        let full = BinaryRadar::new(4, false).unwrap();
        let reading = full.read(origin, Some(Vec2::new(10.0, 0.0)));
        assert_eq!(reading.iter().sum::<f32>(), 1.0);
        assert_eq!(reading[2], 1.0);
    }

    proptest! {
        #[test]
        fn prop_open_ray_travels_full_length(
            max_steps in 1u32..300,
            x_step in 1u32..8,
            direction in -1.2f32..1.2,
            backwards in any::<bool>(),
        ) {
            let terrain = open_terrain();
            let x_step = if backwards { -(x_step as f32) } else { x_step as f32 };
            let radar = RayRadar::new(direction, max_steps, x_step).unwrap();
            let origin = Vec2::new(5_000.0, 0.0);
            let reading = radar.read(origin, &terrain);
            prop_assert_eq!(reading.distance, 1.0);
            let expected = origin + radar.step() * max_steps as f32;
            let tolerance = 1e-4 * (expected - origin).length() + 1e-2;
            prop_assert!((reading.point - expected).length() < tolerance);
            prop_assert_eq!((reading.point.x - origin.x).abs(), max_steps as f32 * x_step.abs());
        }

        #[test]
        fn prop_far_objects_leave_buckets_empty(
            dx in -400.0f32..400.0,
            dy in -400.0f32..400.0,
        ) {
            let terrain = open_terrain();
            let radar = ObjectRadar::new(8, 10.0, 50, 100.0, Field::Full).unwrap();
            let origin = Vec2::new(5_000.0, 0.0);
            let object = origin + Vec2::new(dx, dy);
            let dists = radar.read(origin, &[object], &terrain);
            let dist = Vec2::new(dx, dy).length();
            if dist > 100.0 {
                prop_assert!(dists.iter().all(|d| *d == 1.0));
            } else if dist < 99.0 {
                prop_assert_eq!(dists.iter().filter(|d| **d < 1.0).count(), 1);
            }
        }

        #[test]
        fn prop_obstacle_never_shortens_reading(
            dx in 30.0f32..90.0,
            dy in -40.0f32..40.0,
        ) {
            let origin = Vec2::new(500.0, 0.0);
            let radar = ObjectRadar::new(8, 5.0, 100, 200.0, Field::Full).unwrap();
            let object = [origin + Vec2::new(dx, dy)];

            let open = Terrain::flat(10.0, 100, -1_000.0, 1_000.0).unwrap();
            let mut bars = vec![Bar::new(-1_000.0, 1_000.0); 100];
            bars[51] = Bar::new(1_000.0, -1_000.0);
            let blocked = Terrain::new(10.0, bars).unwrap();

            let clear = radar.read(origin, &object, &open);
            let shadowed = radar.read(origin, &object, &blocked);
            for (c, s) in clear.iter().zip(&shadowed) {
                prop_assert!(*s >= *c);
            }
        }
    }
}
