//! Commands a control surface can issue to the engine.

use crate::config::SetupConfig;
use crate::world::Vec2;

/// Parameters of a bulk population seeding.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkSetup {
    pub n_plants: usize,
    pub n_fish: usize,
    pub fish_reproduce_rate: f64,
    /// Minimum distance between two seeded agents of the same species.
    pub min_spacing: f64,
    /// Placement attempts per agent before the last attempt is accepted.
    pub max_attempts: usize,
}

impl From<&SetupConfig> for BulkSetup {
    fn from(setup: &SetupConfig) -> Self {
        Self {
            n_plants: setup.n_plants,
            n_fish: setup.n_fish,
            fish_reproduce_rate: setup.fish_reproduce_rate,
            min_spacing: setup.min_spacing,
            max_attempts: setup.max_attempts,
        }
    }
}

/// A single control action, executed with [`Engine::execute`](crate::engine::Engine::execute).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Toggle,
    Reset,
    SetSpeed(f64),
    SetFlow { direction: f64, rate: f64 },
    SetTemperature(f64),
    SetSunlight(f64),
    SetNutrients(f64),
    SetPollution(f64),
    SetDissolvedOxygen(f64),
    /// Add one plant, at a random free position when none is given.
    AddPlant { position: Option<Vec2> },
    /// Add one fish, at a random free position when none is given.
    AddFish {
        position: Option<Vec2>,
        reproduce_rate: f64,
    },
    BulkSetup(BulkSetup),
    SetFishReproduceRate(f64),
}
