//! Seeded level generation
//!
//! Corridors are a random walk of the corridor centre and gap, one bar at a
//! time. Enemies are dropped at random x positions with a minimum spacing and
//! vertically centred in the corridor. The same seed always gives the same
//! level.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::terrain::{Bar, Terrain};

/// Rejection sampling gives up after this many tries
const MAX_PLACEMENT_ATTEMPTS: usize = 1_000;

/// Corridor shape parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub bar_width: f32,
    /// Number of bars
    pub bars: usize,
    /// Screen height; the corridor stays inside [0, height]
    pub height: f32,
    /// Corridor gap at the start
    pub start_gap: f32,
    pub min_gap: f32,
    /// Largest change of the centre line between neighbouring bars
    pub max_drift: f32,
    /// Largest change of the gap between neighbouring bars
    pub max_squeeze: f32,
    /// Bars at the start that stay straight so the copter can settle
    pub runway: usize,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            bar_width: 10.0,
            bars: 500,
            height: 600.0,
            start_gap: 400.0,
            min_gap: 150.0,
            max_drift: 6.0,
            max_squeeze: 3.0,
            runway: 30,
        }
    }
}

impl LevelConfig {
    /// Corridor long enough to cover `length` pixels
    pub fn with_length(length: f32) -> Self {
        let defaults = Self::default();
        let bars = (length / defaults.bar_width).ceil().max(1.0) as usize;
        Self { bars, ..defaults }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bars == 0 {
            return Err(ConfigError::EmptyTerrain);
        }
        if self.bar_width <= 0.0 || self.bar_width.is_nan() {
            return Err(ConfigError::BarWidth(self.bar_width));
        }
        if !(self.min_gap > 0.0 && self.min_gap <= self.start_gap && self.start_gap <= self.height) {
            return Err(ConfigError::Level("gaps must satisfy 0 < min_gap <= start_gap <= height"));
        }
        if self.max_drift < 0.0 || self.max_squeeze < 0.0 {
            return Err(ConfigError::Level("drift and squeeze must be non-negative"));
        }
        Ok(())
    }
}

/// Random-walk corridor for `seed`
pub fn generate_terrain(seed: u64, config: &LevelConfig) -> Result<Terrain, ConfigError> {
    config.validate()?;
    let mut rng = Pcg32::seed_from_u64(seed);

    let mut center = config.height / 2.0;
    let mut gap = config.start_gap;
    let mut bars = Vec::with_capacity(config.bars);
    for i in 0..config.bars {
        if i >= config.runway {
            if config.max_squeeze > 0.0 {
                gap += rng.random_range(-config.max_squeeze..=config.max_squeeze);
            }
            gap = gap.clamp(config.min_gap, config.start_gap);
            if config.max_drift > 0.0 {
                center += rng.random_range(-config.max_drift..=config.max_drift);
            }
            // Keep the whole gap on screen
            center = center.clamp(gap / 2.0, config.height - gap / 2.0);
        }
        bars.push(Bar::new(center - gap / 2.0, center + gap / 2.0));
    }

    log::debug!(
        "Generated level (seed {}): {} bars, final gap {:.1}",
        seed,
        bars.len(),
        gap
    );
    Terrain::new(config.bar_width, bars)
}

/// `count` enemy positions in `[min_x, max_x)`, sorted by x, at least
/// `spacing` apart and centred in the corridor
pub fn enemy_positions(
    seed: u64,
    terrain: &Terrain,
    count: usize,
    min_x: f32,
    max_x: f32,
    spacing: f32,
) -> Result<Vec<Vec2>, ConfigError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let placement_error = ConfigError::EnemyPlacement {
        count,
        spacing,
        min_x,
        max_x,
    };
    if !(max_x > min_x) {
        return Err(placement_error);
    }

    let mut rng = Pcg32::seed_from_u64(seed);
    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        let mut xs: Vec<f32> = (0..count).map(|_| rng.random_range(min_x..max_x)).collect();
        xs.sort_by(f32::total_cmp);
        if xs.windows(2).all(|pair| pair[1] - pair[0] >= spacing) {
            return Ok(xs
                .into_iter()
                .map(|x| Vec2::new(x, terrain.y_center(x)))
                .collect());
        }
    }
    Err(placement_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_level() {
        let config = LevelConfig::default();
        let a = generate_terrain(7, &config).unwrap();
        let b = generate_terrain(7, &config).unwrap();
        let c = generate_terrain(8, &config).unwrap();
        assert_eq!(a.bars(), b.bars());
        assert_ne!(a.bars(), c.bars());
    }

    #[test]
    fn test_corridor_stays_on_screen() {
        let config = LevelConfig::default();
        for seed in 0..20 {
            let terrain = generate_terrain(seed, &config).unwrap();
            assert_eq!(terrain.bars().len(), config.bars);
            for bar in terrain.bars() {
                let gap = bar.floor - bar.ceiling;
                assert!(bar.ceiling >= -1e-3);
                assert!(bar.floor <= config.height + 1e-3);
                assert!(gap >= config.min_gap - 1e-3);
                assert!(gap <= config.start_gap + 1e-3);
            }
        }
    }

    #[test]
    fn test_runway_is_straight() {
        let config = LevelConfig::default();
        let terrain = generate_terrain(3, &config).unwrap();
        let first = terrain.bars()[0];
        assert!(terrain.bars()[..config.runway].iter().all(|bar| *bar == first));
        assert_eq!(first.ceiling, 100.0);
        assert_eq!(first.floor, 500.0);
    }

    #[test]
    fn test_invalid_level_config() {
        let config = LevelConfig {
            min_gap: 500.0,
            ..Default::default()
        };
        assert!(matches!(generate_terrain(0, &config), Err(ConfigError::Level(_))));
        let config = LevelConfig {
            bars: 0,
            ..Default::default()
        };
        assert!(matches!(generate_terrain(0, &config), Err(ConfigError::EmptyTerrain)));
    }

    #[test]
    fn test_enemy_positions_spaced_and_centred() {
        let terrain = generate_terrain(1, &LevelConfig::with_length(3_000.0)).unwrap();
        let positions = enemy_positions(11, &terrain, 5, 500.0, 2_500.0, 20.0).unwrap();
        assert_eq!(positions.len(), 5);
        for pair in positions.windows(2) {
            assert!(pair[1].x - pair[0].x >= 20.0);
        }
        for p in &positions {
            assert!(p.x >= 500.0 && p.x < 2_500.0);
            assert_eq!(p.y, terrain.y_center(p.x));
        }
        assert_eq!(positions, enemy_positions(11, &terrain, 5, 500.0, 2_500.0, 20.0).unwrap());
    }

    #[test]
    fn test_enemy_positions_impossible_spacing() {
        let terrain = generate_terrain(1, &LevelConfig::default()).unwrap();
        let result = enemy_positions(0, &terrain, 10, 0.0, 50.0, 20.0);
        assert!(matches!(result, Err(ConfigError::EnemyPlacement { count: 10, .. })));
        assert!(enemy_positions(0, &terrain, 0, 0.0, 0.0, 20.0).unwrap().is_empty());
    }
}
