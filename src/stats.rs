use crate::plant::DeathCause;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Births and deaths committed during one tick.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub plant_births: usize,
    pub plant_deaths: BTreeMap<DeathCause, usize>,
    pub fish_births: usize,
    pub fish_deaths: usize,
    /// Surviving fish in contact with a plant.
    pub fish_touching: usize,
}

impl TickReport {
    pub fn record_plant_death(&mut self, cause: DeathCause) {
        *self.plant_deaths.entry(cause).or_default() += 1;
    }

    pub fn total_plant_deaths(&self) -> usize {
        self.plant_deaths.values().sum()
    }
}

/// Aggregate population counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Counts {
    pub plants: usize,
    pub fish: usize,
    /// Summed plant biomass (kg).
    pub total_biomass: f64,
    pub fish_touching: usize,
}

/// State of the river recorded at a day boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub day: u64,
    pub ticks: u64,
    pub n_plants: usize,
    pub n_fish: usize,
    pub total_biomass: f64,
    pub dissolved_oxygen: f64,
    pub nutrients: f64,
    pub pollution: f64,
}

/// One [`Sample`] per simulated day, oldest first.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    samples: Vec<Sample>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn last_day(&self) -> Option<u64> {
        self.samples.last().map(|sample| sample.day)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn summary(&self) -> Summary {
        let mut n_plants = Accumulator::new();
        let mut n_fish = Accumulator::new();
        let mut dissolved_oxygen = Accumulator::new();
        for sample in &self.samples {
            n_plants.add(sample.n_plants as f64);
            n_fish.add(sample.n_fish as f64);
            dissolved_oxygen.add(sample.dissolved_oxygen);
        }
        Summary {
            n_samples: self.samples.len(),
            n_plants: n_plants.report(),
            n_fish: n_fish.report(),
            dissolved_oxygen: dissolved_oxygen.report(),
        }
    }
}

/// Mean and spread of the recorded history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub n_samples: usize,
    pub n_plants: AccumulatorReport,
    pub n_fish: AccumulatorReport,
    pub dissolved_oxygen: AccumulatorReport,
}

/// Running mean and variance (Welford).
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}
