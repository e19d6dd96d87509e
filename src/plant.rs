//! Hyacinth growth, reproduction, movement and death.

use crate::clock::Cadence;
use crate::config::PlantConfig;
use crate::density::DensityField;
use crate::environment::Environment;
use crate::population::{Agent, Arena, PlantId};
use crate::world::{Vec2, World};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::Bernoulli;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;

/// Optimal growth temperature (°C).
pub const OPTIMAL_TEMPERATURE: f64 = 30.0;
/// Half-width of the temperature band in which plants grow well (°C).
pub const TEMPERATURE_BAND: f64 = 5.0;
/// Temperature factor outside the band.
pub const OFF_BAND_FACTOR: f64 = 0.1;

/// Candidate directions for daughter placement: cardinal then diagonal.
const DIRECTIONS: [(f64, f64); 8] = [
    (1.0, 0.0),
    (0.0, 1.0),
    (-1.0, 0.0),
    (0.0, -1.0),
    (FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    (-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    (-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
    (FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
];

/// Why a plant died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Starved,
    Overgrown,
    Senescent,
    Pollution,
    Darkness,
    Flood,
    Anoxia,
    Exhausted,
    Background,
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starved => "starved",
            Self::Overgrown => "overgrown",
            Self::Senescent => "senescent",
            Self::Pollution => "pollution",
            Self::Darkness => "darkness",
            Self::Flood => "flood",
            Self::Anoxia => "anoxia",
            Self::Exhausted => "exhausted",
            Self::Background => "background",
        };
        f.write_str(name)
    }
}

/// Floating hyacinth mat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    id: PlantId,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Flow drag coefficient (0-1).
    pub resistance: f64,
    /// Biomass (kg).
    pub biomass: f64,
    /// Nutrient uptake rate (kg per day).
    pub nur: f64,
    /// Pollutant absorption rate (mg/L per day).
    pub pol: f64,
    /// Biomass gained per growth tick at the last growth tick (kg).
    pub growth_rate: f64,
    pub parent: Option<PlantId>,
    pub daughters: BTreeSet<PlantId>,
    pub current_daughters: u32,
    pub future_daughters: u32,
    /// Biomass gained since the last reproduction (kg).
    pub biomass_gained: f64,
    /// Value of `biomass_gained` above which the plant reproduces (kg).
    pub reproduction_threshold: f64,
    /// Dissolved oxygen consumed by this plant (mg/L).
    pub dissolved_oxygen_impact: f64,
    /// Age (days).
    pub age: f64,
    growth_cadence: Cadence,
}

impl Agent for Plant {
    type Id = PlantId;

    fn id(&self) -> PlantId {
        self.id
    }
}

/// Traits of a daughter chosen by its parent, turned into a [`Plant`] once it has an id.
#[derive(Debug, Clone, PartialEq)]
pub struct Offspring {
    pub position: Vec2,
    pub resistance: f64,
    pub nur: f64,
    pub pol: f64,
    pub future_daughters: u32,
    pub reproduction_threshold: f64,
    growth_offset: f64,
}

/// Read-only view of the world handed to every plant update of a tick.
pub struct PlantContext<'a> {
    pub world: &'a World,
    pub cfg: &'a PlantConfig,
    pub pixels_per_flow_unit: f64,
    pub env: &'a Environment,
    pub density: &'a DensityField,
    /// Plants as they stood at the start of the tick.
    pub plants: &'a Arena<Plant>,
    /// Speed-scaled time step (days).
    pub dt: f64,
}

/// Result of one plant update, committed by the population after the sweep.
#[derive(Debug, Clone)]
pub struct PlantOutcome {
    pub plant: Plant,
    pub offspring: Option<Offspring>,
    pub death: Option<DeathCause>,
}

impl Plant {
    /// Create a plant with randomly drawn traits.
    pub fn new<R: Rng + ?Sized>(
        id: PlantId,
        position: Vec2,
        cfg: &PlantConfig,
        rng: &mut R,
    ) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            resistance: draw(rng, cfg.resistance_range),
            biomass: cfg.initial_biomass,
            nur: draw(rng, cfg.nur_range),
            pol: draw(rng, cfg.pol_range),
            growth_rate: 0.0,
            parent: None,
            daughters: BTreeSet::new(),
            current_daughters: 0,
            future_daughters: draw_count(rng, cfg.daughters_range),
            biomass_gained: 0.0,
            reproduction_threshold: draw(rng, cfg.reproduction_threshold_range),
            dissolved_oxygen_impact: cfg.initial_biomass * cfg.oxygen_impact_per_kg,
            age: 0.0,
            growth_cadence: Cadence::with_offset(rng.random()),
        }
    }

    /// Create the daughter of `parent` described by `offspring`.
    pub fn from_offspring(
        id: PlantId,
        parent: PlantId,
        offspring: Offspring,
        cfg: &PlantConfig,
    ) -> Self {
        Self {
            id,
            position: offspring.position,
            velocity: Vec2::ZERO,
            resistance: offspring.resistance,
            biomass: cfg.initial_biomass,
            nur: offspring.nur,
            pol: offspring.pol,
            growth_rate: 0.0,
            parent: Some(parent),
            daughters: BTreeSet::new(),
            current_daughters: 0,
            future_daughters: offspring.future_daughters,
            biomass_gained: 0.0,
            reproduction_threshold: offspring.reproduction_threshold,
            dissolved_oxygen_impact: cfg.initial_biomass * cfg.oxygen_impact_per_kg,
            age: 0.0,
            growth_cadence: Cadence::with_offset(offspring.growth_offset),
        }
    }

    pub fn id(&self) -> PlantId {
        self.id
    }

    pub fn radius(&self, cfg: &PlantConfig) -> f64 {
        cfg.radius(self.biomass)
    }

    /// Run one tick for this plant against the start-of-tick snapshot in `ctx`.
    ///
    /// `claimed` holds the positions of daughters placed earlier in the same tick.
    pub fn update<R: Rng + ?Sized>(
        &self,
        ctx: &PlantContext,
        claimed: &mut Vec<Vec2>,
        rng: &mut R,
    ) -> Result<PlantOutcome> {
        let mut plant = self.clone();
        plant.age += ctx.dt;

        let periods = plant.growth_cadence.tick(ctx.dt);
        plant.grow(ctx.env, ctx.cfg, periods);

        let offspring = plant.try_reproduce(ctx, claimed, rng);

        plant.drift(ctx);

        let death = plant
            .evaluate_death(ctx, rng)
            .context("failed to evaluate death")?;

        Ok(PlantOutcome {
            plant,
            offspring,
            death,
        })
    }

    /// Apply `periods` growth ticks.
    ///
    /// The growth rate is refreshed every tick, but biomass is only gained while the
    /// river still holds nutrients.
    pub fn grow(&mut self, env: &Environment, cfg: &PlantConfig, periods: u32) {
        for _ in 0..periods {
            self.growth_rate = growth_rate(env.temperature(), env.sunlight(), self.nur, cfg);
            if env.total_nutrients() > 0.0 {
                let gained = self.growth_rate * Cadence::PERIOD;
                self.biomass = (self.biomass + gained).min(cfg.max_biomass);
                self.biomass_gained += gained;
            }
            self.dissolved_oxygen_impact = self.biomass * cfg.oxygen_impact_per_kg;
        }
    }

    pub fn wants_to_reproduce(&self, cfg: &PlantConfig) -> bool {
        self.biomass_gained > self.reproduction_threshold
            && self.current_daughters < self.future_daughters
            && self.biomass < cfg.max_biomass
    }

    /// Whether the plant has spent its daughter budget and cannot grow further.
    pub fn is_exhausted(&self, cfg: &PlantConfig) -> bool {
        self.current_daughters >= self.future_daughters && self.biomass >= cfg.max_biomass
    }

    fn try_reproduce<R: Rng + ?Sized>(
        &mut self,
        ctx: &PlantContext,
        claimed: &mut Vec<Vec2>,
        rng: &mut R,
    ) -> Option<Offspring> {
        let cfg = ctx.cfg;
        if !self.wants_to_reproduce(cfg) {
            return None;
        }

        // No room: keep the accumulated biomass and retry on the next tick.
        let position = self.find_daughter_position(ctx, claimed, rng)?;
        claimed.push(position);

        self.current_daughters += 1;
        self.biomass_gained = 0.0;
        self.reproduction_threshold = draw(rng, cfg.reproduction_threshold_range);

        let jitter = cfg.resistance_jitter;
        let resistance = (self.resistance + draw(rng, [-jitter, jitter])).clamp(0.0, 1.0);

        Some(Offspring {
            position,
            resistance,
            nur: draw(rng, cfg.nur_range),
            pol: draw(rng, cfg.pol_range),
            future_daughters: draw_count(rng, cfg.daughters_range),
            reproduction_threshold: draw(rng, cfg.reproduction_threshold_range),
            growth_offset: rng.random(),
        })
    }

    fn find_daughter_position<R: Rng + ?Sized>(
        &self,
        ctx: &PlantContext,
        claimed: &[Vec2],
        rng: &mut R,
    ) -> Option<Vec2> {
        let world = ctx.world;
        let spacing = ctx.cfg.min_spacing;
        let offset = 2.0 * self.radius(ctx.cfg);

        let mut directions = DIRECTIONS;
        directions.shuffle(rng);

        directions.into_iter().find_map(|(dx, dy)| {
            let candidate = world.wrap(self.position + Vec2::new(dx, dy) * offset);
            let clear = ctx
                .plants
                .iter()
                .map(|other| other.position)
                .chain(claimed.iter().copied())
                .all(|pos| world.distance(pos, candidate) >= spacing);
            clear.then_some(candidate)
        })
    }

    fn drift(&mut self, ctx: &PlantContext) {
        let cfg = ctx.cfg;

        let mut accel =
            ctx.env.flow_vector() * (ctx.pixels_per_flow_unit * (1.0 - self.resistance));
        accel += self.repulsion(ctx);
        if let Some(pull) = self.tether_pull(ctx) {
            accel += pull;
        }

        self.velocity += accel * ctx.dt;
        self.velocity = (self.velocity * cfg.damping.powf(ctx.dt)).capped(cfg.max_speed);
        self.position = ctx.world.wrap(self.position + self.velocity * ctx.dt);
    }

    /// Soft push away from every plant closer than the comfort radius.
    fn repulsion(&self, ctx: &PlantContext) -> Vec2 {
        let radius = ctx.cfg.repulsion_radius;
        if radius <= 0.0 {
            return Vec2::ZERO;
        }

        let mut force = Vec2::ZERO;
        for other in ctx.plants.iter() {
            if other.id == self.id {
                continue;
            }
            let away = ctx.world.delta(other.position, self.position);
            let dist = away.length();
            if dist >= radius || dist <= f64::EPSILON {
                continue;
            }
            let closeness = 1.0 - dist / radius;
            force += away * (ctx.cfg.repulsion_strength * closeness * closeness / dist);
        }
        force
    }

    /// Pull toward a living parent once the tether distance is exceeded.
    fn tether_pull(&self, ctx: &PlantContext) -> Option<Vec2> {
        let parent = ctx.plants.get(self.parent?)?;
        let to_parent = ctx.world.delta(self.position, parent.position);
        let dist = to_parent.length();
        let excess = dist - ctx.cfg.tether_distance;
        if excess <= 0.0 {
            return None;
        }
        Some(to_parent.normalized() * (ctx.cfg.tether_strength * excess))
    }

    fn evaluate_death<R: Rng + ?Sized>(
        &self,
        ctx: &PlantContext,
        rng: &mut R,
    ) -> Result<Option<DeathCause>> {
        if let Some(cause) = self.lethal_cause(ctx.env, ctx.cfg) {
            return Ok(Some(cause));
        }

        let local_density = ctx.density.at(self.position);
        let prob = self.mortality_probability(ctx.env, local_density, ctx.cfg, ctx.dt);
        let dist = Bernoulli::new(prob).context("failed to build mortality distribution")?;
        Ok(dist.sample(rng).then_some(DeathCause::Background))
    }

    /// Deterministic death conditions.
    pub fn lethal_cause(&self, env: &Environment, cfg: &PlantConfig) -> Option<DeathCause> {
        if self.biomass <= cfg.min_biomass {
            Some(DeathCause::Starved)
        } else if self.biomass > cfg.max_biomass {
            Some(DeathCause::Overgrown)
        } else if self.age > cfg.max_age {
            Some(DeathCause::Senescent)
        } else if env.pollution_level() >= cfg.lethal_pollution {
            Some(DeathCause::Pollution)
        } else if env.sunlight() <= 0.0 {
            Some(DeathCause::Darkness)
        } else if env.flow_rate() >= cfg.lethal_flow {
            Some(DeathCause::Flood)
        } else if env.current_dissolved_oxygen() <= cfg.lethal_oxygen {
            Some(DeathCause::Anoxia)
        } else if self.is_exhausted(cfg) {
            Some(DeathCause::Exhausted)
        } else {
            None
        }
    }

    /// Probability of a background death during a step of `dt` days.
    pub fn mortality_probability(
        &self,
        env: &Environment,
        local_density: f64,
        cfg: &PlantConfig,
        dt: f64,
    ) -> f64 {
        let mut daily = cfg.base_daily_mortality;
        if self.nur < cfg.low_nur {
            daily *= 2.0;
        }
        if env.sunlight() < cfg.low_sunlight {
            daily *= 2.0;
        }
        if env.pollution_level() > cfg.high_pollution {
            daily *= 2.0;
        }
        if env.flow_rate() > cfg.high_flow {
            daily *= 2.0;
        }

        if local_density < cfg.density_floor {
            daily *= cfg.isolation_factor;
        } else if local_density > cfg.density_ceiling {
            daily *= cfg.crowding_factor;
        }

        let prob = daily * dt.max(0.0);
        if prob.is_nan() { 0.0 } else { prob.clamp(0.0, 1.0) }
    }
}

/// Temperature contribution to growth: peaked at 30 °C inside the 25-35 °C band.
pub fn temperature_factor(temperature: f64) -> f64 {
    let deviation = (temperature - OPTIMAL_TEMPERATURE).abs();
    if deviation <= TEMPERATURE_BAND {
        1.0 - deviation / (2.0 * TEMPERATURE_BAND)
    } else {
        OFF_BAND_FACTOR
    }
}

/// Biomass gained per growth tick (kg).
pub fn growth_rate(temperature: f64, sunlight: f64, nur: f64, cfg: &PlantConfig) -> f64 {
    let max_nur = cfg.nur_range[1];
    let uptake = if max_nur > 0.0 {
        (nur / max_nur).clamp(0.0, 1.0)
    } else {
        0.0
    };
    cfg.base_growth * temperature_factor(temperature) * sunlight.clamp(0.0, 1.0) * uptake
}

fn draw<R: Rng + ?Sized>(rng: &mut R, [low, high]: [f64; 2]) -> f64 {
    if high > low {
        rng.random_range(low..=high)
    } else {
        low
    }
}

fn draw_count<R: Rng + ?Sized>(rng: &mut R, [low, high]: [u32; 2]) -> u32 {
    if high > low {
        rng.random_range(low..=high)
    } else {
        low
    }
}
