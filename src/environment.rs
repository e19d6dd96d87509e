//! River conditions shared by every agent.
//!
//! Agents only ever read the environment. It is mutated by configuration
//! commands and by the population's aggregate consumption; every mutation
//! clamps its input so the stored state stays in range.

use crate::config::RiverConfig;
use crate::world::Vec2;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

pub const MAX_FLOW_RATE: f64 = 10.0;
pub const MIN_TEMPERATURE: f64 = -5.0;
pub const MAX_TEMPERATURE: f64 = 45.0;
pub const MAX_POLLUTION: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    flow_direction: f64,
    flow_rate: f64,
    temperature: f64,
    sunlight: f64,
    total_nutrients: f64,
    pollution_level: f64,
    initial_dissolved_oxygen: f64,
    current_dissolved_oxygen: f64,
    max_dissolved_oxygen: f64,
    oxygen_per_pollution: f64,
    plant_oxygen_impact: f64,
}

impl Environment {
    pub fn new(river: &RiverConfig) -> Self {
        let mut env = Self {
            flow_direction: 0.0,
            flow_rate: 0.0,
            temperature: 0.0,
            sunlight: 0.0,
            total_nutrients: 0.0,
            pollution_level: 0.0,
            initial_dissolved_oxygen: 0.0,
            current_dissolved_oxygen: 0.0,
            max_dissolved_oxygen: river.max_dissolved_oxygen.max(0.0),
            oxygen_per_pollution: river.oxygen_per_pollution.max(0.0),
            plant_oxygen_impact: 0.0,
        };
        env.set_flow(river.flow_direction, river.flow_rate);
        env.set_temperature(river.temperature);
        env.set_sunlight(river.sunlight);
        env.set_nutrients(river.nutrients);
        env.set_pollution(river.pollution);
        env.set_dissolved_oxygen(river.dissolved_oxygen);
        env
    }

    pub fn flow_direction(&self) -> f64 {
        self.flow_direction
    }

    pub fn flow_rate(&self) -> f64 {
        self.flow_rate
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn sunlight(&self) -> f64 {
        self.sunlight
    }

    pub fn total_nutrients(&self) -> f64 {
        self.total_nutrients
    }

    pub fn pollution_level(&self) -> f64 {
        self.pollution_level
    }

    pub fn initial_dissolved_oxygen(&self) -> f64 {
        self.initial_dissolved_oxygen
    }

    pub fn current_dissolved_oxygen(&self) -> f64 {
        self.current_dissolved_oxygen
    }

    pub fn max_dissolved_oxygen(&self) -> f64 {
        self.max_dissolved_oxygen
    }

    /// Flow drift in flow units per second, before agent resistance.
    pub fn flow_vector(&self) -> Vec2 {
        Vec2::from_angle(self.flow_direction) * self.flow_rate
    }

    pub fn set_flow(&mut self, direction: f64, rate: f64) {
        self.flow_direction = if direction.is_finite() {
            direction.rem_euclid(TAU)
        } else {
            0.0
        };
        self.flow_rate = clamp(rate, 0.0, MAX_FLOW_RATE);
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = clamp(temperature, MIN_TEMPERATURE, MAX_TEMPERATURE);
    }

    pub fn set_sunlight(&mut self, sunlight: f64) {
        self.sunlight = clamp(sunlight, 0.0, 1.0);
    }

    pub fn set_nutrients(&mut self, nutrients: f64) {
        self.total_nutrients = clamp(nutrients, 0.0, f64::MAX);
    }

    /// Set the pollution level. Dissolved oxygen is refreshed keeping the last plant impact.
    pub fn set_pollution(&mut self, pollution: f64) {
        self.pollution_level = clamp(pollution, 0.0, MAX_POLLUTION);
        self.refresh_dissolved_oxygen();
    }

    /// Set the dissolved oxygen baseline.
    ///
    /// The current level is refreshed keeping the last plant impact.
    pub fn set_dissolved_oxygen(&mut self, baseline: f64) {
        self.initial_dissolved_oxygen = clamp(baseline, 0.0, self.max_dissolved_oxygen);
        self.refresh_dissolved_oxygen();
    }

    /// Remove consumed nutrients and absorbed pollutants from the river stocks.
    pub fn consume(&mut self, nutrients: f64, pollutants: f64) {
        self.total_nutrients = clamp(self.total_nutrients - nutrients.max(0.0), 0.0, f64::MAX);
        let pollution = self.pollution_level - pollutants.max(0.0);
        self.pollution_level = clamp(pollution, 0.0, MAX_POLLUTION);
    }

    /// Dissolved oxygen lost to the current pollution level.
    pub fn pollution_oxygen_impact(&self) -> f64 {
        self.pollution_level * self.oxygen_per_pollution
    }

    /// Dissolved oxygen lost to plants at the last recomputation.
    pub fn plant_oxygen_impact(&self) -> f64 {
        self.plant_oxygen_impact
    }

    /// Recompute the current level from the baseline minus plant and pollution impacts.
    pub fn update_dissolved_oxygen(&mut self, plant_impact: f64) {
        self.plant_oxygen_impact = clamp(plant_impact, 0.0, f64::MAX);
        self.refresh_dissolved_oxygen();
    }

    fn refresh_dissolved_oxygen(&mut self) {
        let level = self.initial_dissolved_oxygen
            - self.plant_oxygen_impact
            - self.pollution_oxygen_impact();
        self.current_dissolved_oxygen = clamp(level, 0.0, self.max_dissolved_oxygen);
    }
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}
