use crate::clock::{Cadence, Clock, ClockSnapshot};
use crate::command::{BulkSetup, Command};
use crate::config::Config;
use crate::density::DensityField;
use crate::environment::Environment;
use crate::fish::{Fish, FishContext, FishOutcome};
use crate::plant::{Plant, PlantContext, PlantOutcome};
use crate::population::{Arena, FishId, PlantId, Population};
use crate::stats::{Counts, History, Sample, TickReport};
use crate::world::{Vec2, World};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;

/// Simulation engine.
///
/// Owns the clock, the environment, the population and the random number
/// generator. A frame driver calls [`Engine::advance`] once per frame; control
/// surfaces call the command methods or [`Engine::execute`].
pub struct Engine {
    cfg: Config,
    world: World,
    clock: Clock,
    env: Environment,
    density: DensityField,
    population: Population,
    consumption: Cadence,
    history: History,
    last_report: TickReport,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create an engine with an empty river.
    ///
    /// The generator is seeded from `cfg.seed` when set, from the OS otherwise.
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;

        let rng = match cfg.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng().context("failed to seed rng from the OS")?,
        };

        let world = World::new(cfg.world.width, cfg.world.height);
        let density = DensityField::new(&world, cfg.world.density_cell_size);
        let clock = Clock::new(cfg.clock.speed, cfg.clock.unit)
            .with_max_frame_delta(cfg.clock.max_frame_delta);
        let env = Environment::new(&cfg.river);

        Ok(Self {
            cfg,
            world,
            clock,
            env,
            density,
            population: Population::new(),
            consumption: Cadence::new(),
            history: History::new(),
            last_report: TickReport::default(),
            rng,
        })
    }

    /// Run one frame of `raw_dt` seconds.
    ///
    /// Does nothing unless the clock is running. Returns whether a tick was performed.
    pub fn advance(&mut self, raw_dt: f64) -> Result<bool> {
        let Some(dt) = self.clock.advance(raw_dt) else {
            return Ok(false);
        };

        self.perform_step(dt).context("failed to perform step")?;

        let day = self.clock.days();
        if self.history.last_day().is_none_or(|last| day > last) {
            let sample = self.sample();
            log::debug!("{sample:?}");
            self.history.record(sample);
        }

        Ok(true)
    }

    fn perform_step(&mut self, dt: f64) -> Result<()> {
        // Charge consumption of the current plants at each second boundary.
        let periods = self.consumption.tick(dt);
        if periods > 0 {
            self.population.apply_consumption(&mut self.env, periods);
        }

        self.density.rebuild(
            self.population
                .plants()
                .iter()
                .map(|plant| (plant.position, plant.biomass)),
        );

        // Both sweeps read the start-of-tick snapshot; nothing is committed until both finish.
        let plant_outcomes = self.sweep_plants(dt).context("failed to update plants")?;
        let fish_outcomes = self.sweep_fish(dt).context("failed to update fish")?;

        let mut report = TickReport::default();
        self.population.commit_plants(plant_outcomes, &self.cfg.plant, &mut report);
        self.population.commit_fish(fish_outcomes, &self.cfg.fish, &mut self.rng, &mut report);

        if report.plant_births + report.fish_births > 0
            || report.total_plant_deaths() + report.fish_deaths > 0
        {
            log::debug!(
                "tick {}: {:+} hyacinths, {:+} fish",
                self.clock.ticks(),
                report.plant_births as i64 - report.total_plant_deaths() as i64,
                report.fish_births as i64 - report.fish_deaths as i64,
            );
        }
        self.last_report = report;

        Ok(())
    }

    fn sweep_plants(&mut self, dt: f64) -> Result<Vec<PlantOutcome>> {
        let ctx = PlantContext {
            world: &self.world,
            cfg: &self.cfg.plant,
            pixels_per_flow_unit: self.cfg.world.pixels_per_flow_unit,
            env: &self.env,
            density: &self.density,
            plants: self.population.plants(),
            dt,
        };

        let mut claimed = Vec::new();
        let mut outcomes = Vec::with_capacity(ctx.plants.len());
        for plant in ctx.plants {
            let outcome = plant
                .update(&ctx, &mut claimed, &mut self.rng)
                .with_context(|| format!("failed to update {}", plant.id()))?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn sweep_fish(&mut self, dt: f64) -> Result<Vec<FishOutcome>> {
        let ctx = FishContext {
            world: &self.world,
            cfg: &self.cfg.fish,
            plant_cfg: &self.cfg.plant,
            pixels_per_flow_unit: self.cfg.world.pixels_per_flow_unit,
            env: &self.env,
            plants: self.population.plants(),
            dt,
        };

        let mut outcomes = Vec::with_capacity(self.population.fish().len());
        for fish in self.population.fish() {
            let outcome = fish
                .update(&ctx, &mut self.rng)
                .with_context(|| format!("failed to update {}", fish.id()))?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Execute a control command.
    pub fn execute(&mut self, command: Command) {
        match command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Toggle => self.toggle(),
            Command::Reset => self.reset(),
            Command::SetSpeed(speed) => self.set_speed(speed),
            Command::SetFlow { direction, rate } => self.set_flow(direction, rate),
            Command::SetTemperature(temperature) => self.set_temperature(temperature),
            Command::SetSunlight(sunlight) => self.set_sunlight(sunlight),
            Command::SetNutrients(nutrients) => self.set_nutrients(nutrients),
            Command::SetPollution(pollution) => self.set_pollution(pollution),
            Command::SetDissolvedOxygen(baseline) => self.set_dissolved_oxygen(baseline),
            Command::AddPlant { position } => {
                self.add_plant(position);
            }
            Command::AddFish {
                position,
                reproduce_rate,
            } => {
                self.add_fish(position, reproduce_rate);
            }
            Command::BulkSetup(setup) => self.bulk_setup(&setup),
            Command::SetFishReproduceRate(rate) => self.set_fish_reproduce_rate(rate),
        }
    }

    pub fn play(&mut self) {
        self.clock.play();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn toggle(&mut self) {
        self.clock.toggle();
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.clock.set_speed(speed);
    }

    /// Stop the clock and return the river to its configured baseline.
    ///
    /// Both populations and the history are cleared; the speed multiplier is kept.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.population.clear();
        self.env = Environment::new(&self.cfg.river);
        self.density.clear();
        self.consumption = Cadence::new();
        self.history.clear();
        self.last_report = TickReport::default();
        log::info!("simulation reset");
    }

    pub fn subscribe_clock<F>(&mut self, listener: F)
    where
        F: FnMut(&ClockSnapshot) + 'static,
    {
        self.clock.subscribe(listener);
    }

    pub fn set_flow(&mut self, direction: f64, rate: f64) {
        self.env.set_flow(direction, rate);
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.env.set_temperature(temperature);
    }

    pub fn set_sunlight(&mut self, sunlight: f64) {
        self.env.set_sunlight(sunlight);
    }

    pub fn set_nutrients(&mut self, nutrients: f64) {
        self.env.set_nutrients(nutrients);
    }

    pub fn set_pollution(&mut self, pollution: f64) {
        self.env.set_pollution(pollution);
    }

    pub fn set_dissolved_oxygen(&mut self, baseline: f64) {
        self.env.set_dissolved_oxygen(baseline);
    }

    /// Replace both populations with freshly seeded agents.
    ///
    /// Each agent is placed at a random position at least `min_spacing` away from
    /// every agent of its species, falling back to the last attempt once
    /// `max_attempts` are exhausted.
    pub fn bulk_setup(&mut self, setup: &BulkSetup) {
        self.population.clear();

        let mut taken = Vec::with_capacity(setup.n_plants);
        for _ in 0..setup.n_plants {
            let pos = self.place(&taken, setup.min_spacing, setup.max_attempts);
            taken.push(pos);
            self.population.spawn_plant(pos, &self.cfg.plant, &mut self.rng);
        }

        let mut taken = Vec::with_capacity(setup.n_fish);
        for _ in 0..setup.n_fish {
            let pos = self.place(&taken, setup.min_spacing, setup.max_attempts);
            taken.push(pos);
            self.population.spawn_fish(
                pos,
                setup.fish_reproduce_rate,
                &self.cfg.fish,
                &mut self.rng,
            );
        }

        self.env.update_dissolved_oxygen(self.population.oxygen_impact());
        log::info!("seeded {} hyacinths and {} fish", setup.n_plants, setup.n_fish);
    }

    /// Add one plant, at a random free position when `position` is `None`.
    pub fn add_plant(&mut self, position: Option<Vec2>) -> PlantId {
        let pos = match position {
            Some(pos) => self.world.wrap(pos),
            None => {
                let taken: Vec<_> = self
                    .population
                    .plants()
                    .iter()
                    .map(|plant| plant.position)
                    .collect();
                self.place(
                    &taken,
                    self.cfg.setup.min_spacing,
                    self.cfg.setup.max_attempts,
                )
            }
        };
        let id = self.population.spawn_plant(pos, &self.cfg.plant, &mut self.rng);
        self.env.update_dissolved_oxygen(self.population.oxygen_impact());
        id
    }

    /// Add one fish, at a random free position when `position` is `None`.
    pub fn add_fish(&mut self, position: Option<Vec2>, reproduce_rate: f64) -> FishId {
        let pos = match position {
            Some(pos) => self.world.wrap(pos),
            None => {
                let taken: Vec<_> = self
                    .population
                    .fish()
                    .iter()
                    .map(|fish| fish.position)
                    .collect();
                self.place(
                    &taken,
                    self.cfg.setup.min_spacing,
                    self.cfg.setup.max_attempts,
                )
            }
        };
        self.population.spawn_fish(pos, reproduce_rate, &self.cfg.fish, &mut self.rng)
    }

    pub fn set_fish_reproduce_rate(&mut self, rate: f64) {
        self.population.set_fish_reproduce_rate(rate);
    }

    fn place(&mut self, taken: &[Vec2], min_spacing: f64, max_attempts: usize) -> Vec2 {
        let mut pos = self.world.random_position(&mut self.rng);
        for _ in 1..max_attempts {
            if taken
                .iter()
                .all(|&other| self.world.distance(other, pos) >= min_spacing)
            {
                break;
            }
            pos = self.world.random_position(&mut self.rng);
        }
        pos
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn clock(&self) -> ClockSnapshot {
        self.clock.snapshot()
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn density(&self) -> &DensityField {
        &self.density
    }

    pub fn plants(&self) -> &Arena<Plant> {
        self.population.plants()
    }

    pub fn fish(&self) -> &Arena<Fish> {
        self.population.fish()
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Mutable access to the agents, for scenario setup by control surfaces.
    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    pub fn counts(&self) -> Counts {
        Counts {
            plants: self.population.plants().len(),
            fish: self.population.fish().len(),
            total_biomass: self.population.total_biomass(),
            fish_touching: self
                .population
                .fish()
                .iter()
                .filter(|fish| fish.touching_hyacinth)
                .count(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Births and deaths of the last performed tick.
    pub fn last_report(&self) -> &TickReport {
        &self.last_report
    }

    fn sample(&self) -> Sample {
        Sample {
            day: self.clock.days(),
            ticks: self.clock.ticks(),
            n_plants: self.population.plants().len(),
            n_fish: self.population.fish().len(),
            total_biomass: self.population.total_biomass(),
            dissolved_oxygen: self.env.current_dissolved_oxygen(),
            nutrients: self.env.total_nutrients(),
            pollution: self.env.pollution_level(),
        }
    }
}
