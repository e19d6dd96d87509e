//! Fish movement, reproduction and oxygen-driven mortality.

use crate::clock::Cadence;
use crate::config::{FishConfig, PlantConfig};
use crate::environment::Environment;
use crate::plant::Plant;
use crate::population::{Agent, Arena, FishId};
use crate::world::{Vec2, World};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::Bernoulli;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fish {
    id: FishId,
    pub position: Vec2,
    /// Swimming velocity, excluding flow drift.
    pub velocity: Vec2,
    /// Flow drag coefficient (0-1).
    pub resistance: f64,
    /// Reproduction probability per second (0-1).
    pub reproduce_rate: f64,
    pub target: Option<Vec2>,
    /// Fraction of the maximum speed used to reach the current target.
    pub speed_factor: f64,
    /// Seconds left before a new target is picked.
    pub movement_timer: f64,
    /// Facing angle (radians).
    pub heading: f64,
    pub touching_hyacinth: bool,
    check_cadence: Cadence,
}

impl Agent for Fish {
    type Id = FishId;

    fn id(&self) -> FishId {
        self.id
    }
}

/// Read-only view of the world handed to every fish update of a tick.
pub struct FishContext<'a> {
    pub world: &'a World,
    pub cfg: &'a FishConfig,
    pub plant_cfg: &'a PlantConfig,
    pub pixels_per_flow_unit: f64,
    pub env: &'a Environment,
    /// Plants as they stood at the start of the tick.
    pub plants: &'a Arena<Plant>,
    pub dt: f64,
}

#[derive(Debug, Clone)]
pub struct FishOutcome {
    pub fish: Fish,
    /// Number of successful reproduction trials.
    pub offspring: u32,
    pub died: bool,
}

impl Fish {
    pub fn new<R: Rng + ?Sized>(
        id: FishId,
        position: Vec2,
        reproduce_rate: f64,
        cfg: &FishConfig,
        rng: &mut R,
    ) -> Self {
        let [low, high] = cfg.resistance_range;
        let resistance = if high > low {
            rng.random_range(low..=high)
        } else {
            low
        };
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            resistance,
            reproduce_rate: clamp_rate(reproduce_rate),
            target: None,
            speed_factor: cfg.speed_factor_range[1],
            movement_timer: 0.0,
            heading: 0.0,
            touching_hyacinth: false,
            check_cadence: Cadence::with_offset(rng.random()),
        }
    }

    /// Spawn a child at the parent's position with the parent's traits.
    pub fn offspring<R: Rng + ?Sized>(
        id: FishId,
        parent: &Fish,
        cfg: &FishConfig,
        rng: &mut R,
    ) -> Self {
        let mut child = Self::new(id, parent.position, parent.reproduce_rate, cfg, rng);
        child.resistance = parent.resistance;
        child.heading = parent.heading;
        child
    }

    pub fn id(&self) -> FishId {
        self.id
    }

    pub fn set_reproduce_rate(&mut self, rate: f64) {
        self.reproduce_rate = clamp_rate(rate);
    }

    pub fn update<R: Rng + ?Sized>(&self, ctx: &FishContext, rng: &mut R) -> Result<FishOutcome> {
        let mut fish = self.clone();

        let periods = fish.check_cadence.tick(ctx.dt);
        let mut offspring = 0;
        if periods > 0 {
            let prob_death = death_probability(
                &ctx.cfg.mortality_curve,
                ctx.env.current_dissolved_oxygen(),
            );
            let death_dist =
                Bernoulli::new(prob_death).context("failed to build mortality distribution")?;
            let birth_dist = Bernoulli::new(fish.reproduce_rate)
                .context("failed to build reproduction distribution")?;

            for _ in 0..periods {
                if death_dist.sample(rng) {
                    return Ok(FishOutcome {
                        fish,
                        offspring,
                        died: true,
                    });
                }
                if birth_dist.sample(rng) {
                    offspring += 1;
                }
            }
        }

        fish.swim(ctx, rng);
        fish.touching_hyacinth = fish.touches_plant(ctx);

        Ok(FishOutcome {
            fish,
            offspring,
            died: false,
        })
    }

    fn swim<R: Rng + ?Sized>(&mut self, ctx: &FishContext, rng: &mut R) {
        let cfg = ctx.cfg;
        let world = ctx.world;

        self.movement_timer -= ctx.dt;
        let to_target = self.target.map(|target| world.delta(self.position, target));
        let arrived = to_target.is_none_or(|delta| delta.length() < cfg.arrival_distance);

        if arrived || self.movement_timer <= 0.0 {
            self.retarget(world, cfg, rng);
        } else if let Some(to_target) = to_target {
            let approach = (to_target.length() / cfg.slowdown_radius).min(1.0);
            let desired = to_target.normalized() * (self.speed_factor * cfg.max_speed * approach);
            let steer = (desired - self.velocity).capped(cfg.acceleration * ctx.dt);
            self.velocity = (self.velocity + steer).capped(cfg.max_speed);
        }

        let drift = ctx.env.flow_vector() * (ctx.pixels_per_flow_unit * (1.0 - self.resistance));
        let total = self.velocity + drift;
        self.position = world.wrap(self.position + total * ctx.dt);
        if total.length() > cfg.min_heading_speed {
            self.heading = total.angle();
        }
    }

    fn retarget<R: Rng + ?Sized>(&mut self, world: &World, cfg: &FishConfig, rng: &mut R) {
        self.target = Some(world.random_position(rng));

        let [low, high] = cfg.speed_factor_range;
        self.speed_factor = if high > low {
            rng.random_range(low..=high)
        } else {
            low
        };

        let [low, high] = cfg.retarget_range;
        self.movement_timer = if high > low {
            rng.random_range(low..=high)
        } else {
            low
        };
    }

    fn touches_plant(&self, ctx: &FishContext) -> bool {
        ctx.plants.iter().any(|plant| {
            let reach = ctx.cfg.radius + plant.radius(ctx.plant_cfg);
            ctx.world.distance(self.position, plant.position) < reach
        })
    }
}

/// Death probability per check at the given dissolved oxygen level (mg/L).
///
/// Linear between the knots of `curve`, constant beyond its ends.
pub fn death_probability(curve: &[[f64; 2]], oxygen: f64) -> f64 {
    let Some(&[first_oxygen, first_prob]) = curve.first() else {
        return 0.0;
    };
    if oxygen.is_nan() || oxygen <= first_oxygen {
        return first_prob.clamp(0.0, 1.0);
    }

    for pair in curve.windows(2) {
        let [oxygen_a, prob_a] = pair[0];
        let [oxygen_b, prob_b] = pair[1];
        if oxygen <= oxygen_b {
            let frac = (oxygen - oxygen_a) / (oxygen_b - oxygen_a);
            return (prob_a + frac * (prob_b - prob_a)).clamp(0.0, 1.0);
        }
    }

    curve.last().map_or(0.0, |&[_, prob]| prob.clamp(0.0, 1.0))
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}
