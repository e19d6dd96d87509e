//! Simulation of a river ecosystem of floating hyacinth mats and fish.
//!
//! The [`Engine`] owns every piece of state. A frame driver calls
//! [`Engine::advance`] once per frame; each running frame consumes nutrients and
//! pollutants, rebuilds the [`DensityField`], updates every plant and then every
//! fish against the start-of-tick snapshot, and commits births and deaths as one
//! batch.

pub mod clock;
pub mod command;
pub mod config;
pub mod density;
pub mod engine;
pub mod environment;
pub mod fish;
pub mod plant;
pub mod population;
pub mod stats;
pub mod world;

pub use clock::{CalendarUnit, Clock, ClockSnapshot, ClockState};
pub use command::{BulkSetup, Command};
pub use config::Config;
pub use density::DensityField;
pub use engine::Engine;
pub use environment::Environment;
pub use fish::Fish;
pub use plant::{DeathCause, Plant};
pub use population::{Arena, FishId, PlantId, Population};
pub use stats::{Counts, History, Sample, Summary, TickReport};
pub use world::{Vec2, World};
