//! Copter Sim headless runner
//!
//! Usage: `copter-sim [seed] [config.json]`
//!
//! Generates a level from the seed, flies a reflex pilot through it against a
//! roster of hovering enemies, logs the fitness and prints the final snapshot
//! as JSON.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Copter Sim (native) starting...");

    if let Err(e) = native::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No browser front end; the library is usable from wasm directly
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::error::Error;
    use std::ops::Range;
    use std::sync::Arc;

    use copter_sim::config::SensorBundleConfig;
    use copter_sim::level::{LevelConfig, enemy_positions, generate_terrain};
    use copter_sim::sim::{Controller, FnController, HiddenState, Role, SimState, run_headless};
    use copter_sim::SimConfig;

    /// Tick cap when the config sets none, so a lucky pilot still lands
    const DEFAULT_MAX_TICKS: u64 = 20_000;
    const ENEMY_COUNT: usize = 5;
    const COPTER_START_X: f32 = 200.0;

    /// Thrusts when the floor is closer than the ceiling, shoots at close enemies
    struct ReflexPilot {
        input_len: usize,
        front_rays: Range<usize>,
        enemies: Range<usize>,
    }

    impl ReflexPilot {
        fn new(sensors: &SensorBundleConfig, input_len: usize) -> Self {
            let front_start = 2;
            let front_end = front_start + sensors.front.count;
            let rays_end = front_end + sensors.back.as_ref().map_or(0, |back| back.count);
            let enemies_start = rays_end + sensors.contact.as_ref().map_or(0, |c| c.buckets);
            let enemies_len = sensors.objects.first().map_or(0, |radar| radar.buckets);
            Self {
                input_len,
                front_rays: front_start..front_end,
                enemies: enemies_start..enemies_start + enemies_len,
            }
        }
    }

    fn min(values: &[f32]) -> f32 {
        values.iter().copied().fold(1.0, f32::min)
    }

    impl Controller for ReflexPilot {
        fn kind(&self) -> &'static str {
            "reflex"
        }

        fn input_len(&self) -> usize {
            self.input_len
        }

        fn output_len(&self) -> usize {
            Role::Copter.action_len()
        }

        fn evaluate(&self, features: &[f32], state: &HiddenState) -> (Vec<f32>, HiddenState) {
            let rays = &features[self.front_rays.clone()];
            let (below, above) = rays.split_at(rays.len() / 2);
            let falling = features[1];
            let thrust = min(below) < min(above) || falling > 0.5;
            let shoot = min(&features[self.enemies.clone()]) < 0.3;
            let actions = vec![
                if thrust { 1.0 } else { 0.0 },
                if shoot { 1.0 } else { 0.0 },
            ];
            (actions, state.clone())
        }
    }

    pub fn run() -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args().skip(1);
        let seed: u64 = match args.next() {
            Some(arg) => arg.parse()?,
            None => 42,
        };
        let mut config = match args.next() {
            Some(path) => SimConfig::load(path)?,
            None => SimConfig::default(),
        };
        config.end.max_ticks.get_or_insert(DEFAULT_MAX_TICKS);
        log::info!("Seed {}, end conditions {:?}", seed, config.end);

        let level = LevelConfig::default();
        let terrain = generate_terrain(seed, &level)?;
        let (_, end_x) = terrain.span();
        let positions = enemy_positions(
            seed.wrapping_add(1),
            &terrain,
            ENEMY_COUNT,
            COPTER_START_X * 3.0,
            end_x - COPTER_START_X,
            config.physics.enemy_size,
        )?;

        let copter_sensors = config.copter_sensors.clone();
        let mut state = SimState::centered(config, terrain, COPTER_START_X)?;

        let pilot = ReflexPilot::new(&copter_sensors, state.feature_len(Role::Copter));
        let control = state.learned(Role::Copter, Arc::new(pilot))?;
        state.set_copter_control(control)?;

        // Enemies hold altitude and drift towards the copter
        let hover: Arc<dyn Controller> = Arc::new(FnController::new(
            state.feature_len(Role::Enemy),
            Role::Enemy.action_len(),
            |f: &[f32]| vec![if f[1] > 0.2 { 1.0 } else { 0.0 }, 1.0, 0.0],
        ));
        for pos in positions {
            let control = state.learned(Role::Enemy, hover.clone())?;
            state.add_enemy(pos, control)?;
        }

        let fitness = run_headless(&mut state)?;
        log::info!(
            "Fitness {} after {} ticks ({} shots fired, {} hit, {} enemies exploded)",
            fitness.as_f64(),
            state.ticks,
            state.stats.shots_fired,
            state.stats.shots_hit,
            state.stats.enemies_exploded
        );

        println!("{}", serde_json::to_string_pretty(&state.snapshot())?);
        Ok(())
    }
}
