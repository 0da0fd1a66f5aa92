//! Run configuration
//!
//! One [`SimConfig`] value describes a whole run: physics tuning, the enemy
//! activation window, both sensor bundles and the end conditions. Every field
//! has a default, so a JSON file only needs to list what it overrides.

use std::f32::consts::PI;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::sim::entity::Role;
use crate::sim::radar::{Facing, Field};
use crate::sim::radar_system::{ObjectAttribute, ObjectTarget, SensorBundle};
use crate::sim::termination::EndConditions;

/// Forces, sizes and speeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Tick duration
    pub dt: f32,
    pub gravity: Vec2,
    /// Copter force while the rotor is on
    pub thrust: Vec2,
    /// Enemy force while the rotor is on
    pub enemy_thrust: Vec2,
    /// Enemy force while moving left
    pub enemy_left_force: Vec2,
    /// Downward velocity added by an enemy dive
    pub dive_impulse: f32,
    /// Per-tick velocity factor for exploded bodies
    pub exploded_damping: f32,
    /// Velocity factor applied to an enemy touching the copter
    pub collision_friction: f32,
    /// Backwards kick the copter gets for each shot
    pub recoil: f32,
    /// Shot speed relative to the copter
    pub shot_speed: f32,
    pub shot_size: f32,
    /// Shots older than this are removed
    pub shot_max_ticks: u32,
    pub copter_size: f32,
    pub enemy_size: f32,
    pub copter_start_speed: f32,
    /// Velocity normalisation for the copter's features
    pub copter_max_velocity: Vec2,
    /// Velocity normalisation for the enemies' features
    pub enemy_max_velocity: Vec2,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            dt: SIM_DT,
            gravity: Vec2::new(0.0, GRAVITY),
            thrust: Vec2::new(0.0, THRUST),
            enemy_thrust: Vec2::new(0.0, THRUST),
            enemy_left_force: Vec2::new(-4.0, 0.0),
            dive_impulse: 8.0,
            exploded_damping: EXPLODED_DAMPING,
            collision_friction: 0.5,
            recoil: 2.0,
            shot_speed: 20.0,
            shot_size: 4.0,
            shot_max_ticks: 400,
            copter_size: CRAFT_SIZE,
            enemy_size: CRAFT_SIZE,
            copter_start_speed: COPTER_START_SPEED,
            copter_max_velocity: Vec2::new(20.0, 20.0),
            enemy_max_velocity: Vec2::new(10.0, 20.0),
        }
    }
}

fn check(field: &'static str, rule: &'static str, value: f32, ok: bool) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, rule, value })
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    check(field, "positive and finite", value, value > 0.0 && value.is_finite())
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    check(field, "non-negative and finite", value, value >= 0.0 && value.is_finite())
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    check(field, "finite", value, value.is_finite())
}

fn unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    check(field, "within [0, 1]", value, (0.0..=1.0).contains(&value))
}

impl PhysicsConfig {
    /// Sizes and feature normalisers must be positive; a zero or negative
    /// value would invert boxes or divide by zero in the sensors
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("physics.copter_size", self.copter_size)?;
        positive("physics.enemy_size", self.enemy_size)?;
        positive("physics.shot_size", self.shot_size)?;
        positive("physics.copter_max_velocity.x", self.copter_max_velocity.x)?;
        positive("physics.copter_max_velocity.y", self.copter_max_velocity.y)?;
        positive("physics.enemy_max_velocity.x", self.enemy_max_velocity.x)?;
        positive("physics.enemy_max_velocity.y", self.enemy_max_velocity.y)?;
        unit("physics.exploded_damping", self.exploded_damping)?;
        unit("physics.collision_friction", self.collision_friction)?;
        for (field, v) in [
            ("physics.gravity", self.gravity),
            ("physics.thrust", self.thrust),
            ("physics.enemy_thrust", self.enemy_thrust),
            ("physics.enemy_left_force", self.enemy_left_force),
        ] {
            finite(field, v.x)?;
            finite(field, v.y)?;
        }
        finite("physics.dive_impulse", self.dive_impulse)?;
        finite("physics.recoil", self.recoil)?;
        finite("physics.shot_speed", self.shot_speed)?;
        finite("physics.copter_start_speed", self.copter_start_speed)?;
        Ok(())
    }
}

/// Sliding activation window for enemies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Pending enemies closer than this ahead of the copter become active
    pub intro_distance: f32,
    /// Active enemies further than this behind the copter are retired
    pub passed_distance: f32,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            intro_distance: ENEMY_INTRO_DIST,
            passed_distance: ENEMY_PASSED_DIST,
        }
    }
}

impl RosterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("roster.intro_distance", self.intro_distance)?;
        non_negative("roster.passed_distance", self.passed_distance)
    }
}

/// Evenly spread fan of rays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayFanConfig {
    /// First ray direction (radians, counter-clockwise from +x)
    pub from: f32,
    /// Last ray direction
    pub to: f32,
    pub count: usize,
    pub max_steps: u32,
    /// Horizontal advance per step; negative casts towards -x
    pub x_step: f32,
}

impl RayFanConfig {
    /// `count` directions spaced evenly over `[from, to]`
    pub fn directions(&self) -> Vec<f32> {
        match self.count {
            0 => Vec::new(),
            1 => vec![self.from],
            n => {
                let spacing = (self.to - self.from) / (n - 1) as f32;
                (0..n).map(|i| self.from + spacing * i as f32).collect()
            }
        }
    }
}

/// Angular object radar settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRadarConfig {
    pub target: ObjectTarget,
    pub buckets: usize,
    pub x_step: f32,
    pub max_num_steps: u32,
    pub max_dist: f32,
    pub field: Field,
}

/// Attribute-augmented object radar settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRadarConfig {
    pub radar: ObjectRadarConfig,
    pub attributes: Vec<ObjectAttribute>,
}

/// One-hot contact radar settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryRadarConfig {
    pub buckets: usize,
    pub bottom_half: bool,
}

/// Everything one agent role senses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorBundleConfig {
    pub front: RayFanConfig,
    #[serde(default)]
    pub back: Option<RayFanConfig>,
    #[serde(default)]
    pub contact: Option<BinaryRadarConfig>,
    #[serde(default)]
    pub objects: Vec<ObjectRadarConfig>,
    #[serde(default)]
    pub attributes: Option<AttributeRadarConfig>,
}

fn object_radar(target: ObjectTarget, field: Field) -> ObjectRadarConfig {
    ObjectRadarConfig {
        target,
        buckets: 8,
        x_step: 10.0,
        max_num_steps: 50,
        max_dist: 500.0,
        field,
    }
}

impl SensorBundleConfig {
    /// Forward-looking bundle for the copter (travels towards +x)
    pub fn copter() -> Self {
        Self {
            front: RayFanConfig {
                from: -3.0 * PI / 7.0,
                to: 3.0 * PI / 7.0,
                count: 15,
                max_steps: 50,
                x_step: 4.0,
            },
            back: Some(RayFanConfig {
                from: -PI / 4.0,
                to: PI / 4.0,
                count: 2,
                max_steps: 25,
                x_step: -4.0,
            }),
            contact: None,
            objects: vec![object_radar(ObjectTarget::Enemies, Field::Full)],
            attributes: None,
        }
    }

    /// Mirrored bundle for enemies (travel towards -x)
    pub fn enemy() -> Self {
        Self {
            front: RayFanConfig {
                from: -3.0 * PI / 7.0,
                to: 3.0 * PI / 7.0,
                count: 15,
                max_steps: 50,
                x_step: -4.0,
            },
            back: Some(RayFanConfig {
                from: -PI / 4.0,
                to: PI / 4.0,
                count: 2,
                max_steps: 25,
                x_step: 4.0,
            }),
            contact: None,
            objects: vec![
                object_radar(ObjectTarget::Shots, Field::Half(Facing::Left)),
                object_radar(ObjectTarget::Enemies, Field::Full),
                object_radar(ObjectTarget::Copter, Field::Half(Facing::Left)),
            ],
            attributes: None,
        }
    }
}

/// Complete configuration of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub physics: PhysicsConfig,
    pub roster: RosterConfig,
    pub copter_sensors: SensorBundleConfig,
    pub enemy_sensors: SensorBundleConfig,
    pub end: EndConditions,
    /// Minimum ticks between two sputter events of one agent
    pub sputter_interval: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            roster: RosterConfig::default(),
            copter_sensors: SensorBundleConfig::copter(),
            enemy_sensors: SensorBundleConfig::enemy(),
            end: EndConditions::default(),
            sputter_interval: SPUTTER_INTERVAL,
        }
    }
}

impl SimConfig {
    /// Parse a (possibly partial) JSON config and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Fail fast on anything that would make a run meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.physics.dt > 0.0) || !self.physics.dt.is_finite() {
            return Err(ConfigError::Timestep(self.physics.dt));
        }
        self.physics.validate()?;
        self.roster.validate()?;
        SensorBundle::new(Role::Copter, &self.copter_sensors)?;
        SensorBundle::new(Role::Enemy, &self.enemy_sensors)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimConfig::default();
        config.validate().unwrap();
        assert_eq!(config.physics.dt, 0.25);
        assert_eq!(config.copter_sensors.front.directions().len(), 15);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimConfig::from_json(
            r#"{ "roster": { "intro_distance": 300.0 }, "end": { "max_ticks": 50 } }"#,
        )
        .unwrap();
        assert_eq!(config.roster.intro_distance, 300.0);
        assert_eq!(config.roster.passed_distance, ENEMY_PASSED_DIST);
        assert_eq!(config.end.max_ticks, Some(50));
        assert_eq!(config.physics, PhysicsConfig::default());
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            SimConfig::from_json(r#"{ "physics": { "dt": 0.0 } }"#),
            Err(ConfigError::Timestep(_))
        ));
        assert!(matches!(
            SimConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_zero_step_sensor_rejected() {
        let mut config = SimConfig::default();
        config.enemy_sensors.objects[0].x_step = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::StepSize { .. })));

        let mut config = SimConfig::default();
        config.copter_sensors.front.x_step = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::StepSize { .. })));
    }

    #[test]
    fn test_fan_directions() {
        let fan = RayFanConfig {
            from: -1.0,
            to: 1.0,
            count: 3,
            max_steps: 10,
            x_step: 1.0,
        };
        assert_eq!(fan.directions(), vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_bad_sizes_rejected() {
        assert!(matches!(
            SimConfig::from_json(r#"{ "physics": { "copter_size": -20.0 } }"#),
            Err(ConfigError::InvalidValue {
                field: "physics.copter_size",
                ..
            })
        ));

        let mut config = SimConfig::default();
        config.physics.shot_size = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));

        let mut config = SimConfig::default();
        config.physics.enemy_size = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_zero_max_velocity_rejected() {
        assert!(matches!(
            SimConfig::from_json(r#"{ "physics": { "copter_max_velocity": [0.0, 0.0] } }"#),
            Err(ConfigError::InvalidValue {
                field: "physics.copter_max_velocity.x",
                ..
            })
        ));

        let mut config = SimConfig::default();
        config.physics.enemy_max_velocity.y = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "physics.enemy_max_velocity.y",
                ..
            })
        ));
    }

    #[test]
    fn test_damping_and_forces_checked() {
        let mut config = SimConfig::default();
        config.physics.exploded_damping = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "physics.exploded_damping",
                ..
            })
        ));

        let mut config = SimConfig::default();
        config.physics.gravity.y = f32::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "physics.gravity",
                ..
            })
        ));

        let mut config = SimConfig::default();
        config.roster.intro_distance = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "roster.intro_distance",
                ..
            })
        ));
    }
}
