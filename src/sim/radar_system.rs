//! Sensor bundles: every radar one agent role carries, and the layout of
//! the feature vector they produce together
//!
//! Copter features:
//! `[vel_up, vel_down, rays.., contact.., objects.., attributes.., vel_left, vel_right]`
//!
//! Enemy features:
//! `[vel_up, vel_down, vel_left, rays.., contact.., objects.., attributes..]`

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{Body, Role};
use super::radar::{BinaryRadar, ObjectAttributeRadar, ObjectRadar, RayRadar, RayReading};
use super::terrain::Terrain;
use crate::config::{ObjectRadarConfig, RayFanConfig, SensorBundleConfig};
use crate::error::ConfigError;

/// What an object radar looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectTarget {
    /// Living active enemies other than the observer
    Enemies,
    /// Copter shots in flight
    Shots,
    /// The living copter
    Copter,
}

/// Per-object scalar reported by an attribute radar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectAttribute {
    /// Sign of the object's horizontal velocity relative to the observer
    RelativeVelocityXSign,
    /// Sign of the object's vertical velocity relative to the observer
    RelativeVelocityYSign,
    /// 1.0 when the object is closing in on the observer, 0.0 otherwise
    Closing,
}

impl ObjectAttribute {
    fn eval(self, observer: &Body, object: &Body) -> f32 {
        let rel_vel = object.vel - observer.vel;
        match self {
            ObjectAttribute::RelativeVelocityXSign => sign(rel_vel.x),
            ObjectAttribute::RelativeVelocityYSign => sign(rel_vel.y),
            ObjectAttribute::Closing => {
                let rel_pos = object.pos - observer.pos;
                if rel_pos.dot(rel_vel) < 0.0 { 1.0 } else { 0.0 }
            }
        }
    }
}

#[inline]
fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Everything a bundle may look at, already filtered for one observer
#[derive(Debug, Clone, Default)]
pub struct Surroundings<'a> {
    pub enemies: Vec<&'a Body>,
    pub shots: Vec<&'a Body>,
    pub copter: Option<&'a Body>,
}

impl<'a> Surroundings<'a> {
    fn targets(&self, target: ObjectTarget) -> &[&'a Body] {
        match target {
            ObjectTarget::Enemies => &self.enemies,
            ObjectTarget::Shots => &self.shots,
            ObjectTarget::Copter => self.copter.as_slice(),
        }
    }
}

/// One bundle read
#[derive(Debug, Clone, PartialEq)]
pub struct Perception {
    pub features: Vec<f32>,
    /// Ray readings, front rays first
    pub rays: Vec<RayReading>,
}

#[derive(Debug, Clone)]
struct AttributeSensor {
    target: ObjectTarget,
    radar: ObjectAttributeRadar,
    attributes: Vec<ObjectAttribute>,
}

/// Radars carried by one agent role
#[derive(Debug, Clone)]
pub struct SensorBundle {
    role: Role,
    front: Vec<RayRadar>,
    back: Vec<RayRadar>,
    contact: Option<BinaryRadar>,
    objects: Vec<(ObjectTarget, ObjectRadar)>,
    attributes: Option<AttributeSensor>,
}

fn build_fan(fan: &RayFanConfig) -> Result<Vec<RayRadar>, ConfigError> {
    fan.directions()
        .into_iter()
        .map(|direction| RayRadar::new(direction, fan.max_steps, fan.x_step))
        .collect()
}

fn build_object_radar(cfg: &ObjectRadarConfig) -> Result<ObjectRadar, ConfigError> {
    ObjectRadar::new(cfg.buckets, cfg.x_step, cfg.max_num_steps, cfg.max_dist, cfg.field)
}

impl SensorBundle {
    pub fn new(role: Role, config: &SensorBundleConfig) -> Result<Self, ConfigError> {
        let front = build_fan(&config.front)?;
        let back = match &config.back {
            Some(fan) => build_fan(fan)?,
            None => Vec::new(),
        };
        let contact = match &config.contact {
            Some(cfg) => Some(BinaryRadar::new(cfg.buckets, cfg.bottom_half)?),
            None => None,
        };
        let objects = config
            .objects
            .iter()
            .map(|cfg| Ok((cfg.target, build_object_radar(cfg)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let attributes = match &config.attributes {
            Some(cfg) => Some(AttributeSensor {
                target: cfg.radar.target,
                radar: ObjectAttributeRadar::new(build_object_radar(&cfg.radar)?),
                attributes: cfg.attributes.clone(),
            }),
            None => None,
        };
        Ok(Self {
            role,
            front,
            back,
            contact,
            objects,
            attributes,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn front_rays(&self) -> &[RayRadar] {
        &self.front
    }

    pub fn back_rays(&self) -> &[RayRadar] {
        &self.back
    }

    fn velocity_len(&self) -> usize {
        match self.role {
            Role::Copter => 4,
            Role::Enemy => 3,
        }
    }

    /// Total feature vector length
    pub fn feature_len(&self) -> usize {
        let mut len = self.velocity_len() + self.front.len() + self.back.len();
        len += self.contact.as_ref().map_or(0, BinaryRadar::buckets);
        len += self.objects.iter().map(|(_, radar)| radar.buckets()).sum::<usize>();
        if let Some(sensor) = &self.attributes {
            len += sensor.radar.feature_len(sensor.attributes.len());
        }
        len
    }

    /// Read every radar for `observer` and assemble its feature vector
    pub fn sense(
        &self,
        observer: &Body,
        max_velocity: Vec2,
        terrain: &Terrain,
        surroundings: &Surroundings<'_>,
    ) -> Perception {
        let origin = observer.pos;
        let mut features = Vec::with_capacity(self.feature_len());

        let (up, down) = split(observer.vel.y, max_velocity.y);
        let (left, right) = split(observer.vel.x, max_velocity.x);
        features.push(up);
        features.push(down);
        if self.role == Role::Enemy {
            features.push(-observer.vel.x / max_velocity.x);
        }

        let rays: Vec<RayReading> = self
            .front
            .iter()
            .chain(&self.back)
            .map(|radar| radar.read(origin, terrain))
            .collect();
        features.extend(rays.iter().map(|reading| reading.distance));

        if let Some(contact) = &self.contact {
            let closest = rays
                .iter()
                .filter(|reading| reading.hit())
                .min_by(|a, b| a.distance.total_cmp(&b.distance))
                .map(|reading| reading.point);
            features.extend(contact.read(origin, closest));
        }

        for (target, radar) in &self.objects {
            let candidates = surroundings.targets(*target);
            features.extend(radar.read(origin, candidates.iter().copied(), terrain));
        }

        if let Some(sensor) = &self.attributes {
            let candidates = surroundings.targets(sensor.target);
            let funcs: Vec<_> = sensor
                .attributes
                .iter()
                .map(|attribute| move |object: &Body| attribute.eval(observer, object))
                .collect();
            let reading = sensor
                .radar
                .read(origin, candidates.iter().copied(), terrain, &funcs);
            features.extend(reading.dists);
            for values in reading.attributes {
                features.extend(values);
            }
        }

        if self.role == Role::Copter {
            features.push(left);
            features.push(right);
        }

        debug_assert_eq!(features.len(), self.feature_len());
        Perception { features, rays }
    }
}

/// Split a signed speed into (negative part, positive part), both normalised
#[inline]
fn split(v: f32, max: f32) -> (f32, f32) {
    if v <= 0.0 { (-v / max, 0.0) } else { (0.0, v / max) }
}
