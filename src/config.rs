use crate::clock::{CalendarUnit, MAX_FRAME_DELTA};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// Every section falls back to its defaults, so an empty file is a valid configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Seed of the random number generator (drawn from the OS when absent).
    pub seed: Option<u64>,

    pub world: WorldConfig,
    pub clock: ClockConfig,
    pub river: RiverConfig,
    pub plant: PlantConfig,
    pub fish: FishConfig,
    pub setup: SetupConfig,
}

/// Geometry of the simulated river section.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    /// Edge length of a density field cell.
    pub density_cell_size: f64,
    /// Drift speed (pixels per second) produced by one unit of flow rate.
    pub pixels_per_flow_unit: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            density_cell_size: 50.0,
            pixels_per_flow_unit: 20.0,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClockConfig {
    /// Initial speed multiplier.
    pub speed: f64,
    /// Label shown for the whole-second counter.
    pub unit: CalendarUnit,
    /// Longest raw frame accepted per advance (seconds), before speed scaling.
    pub max_frame_delta: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            unit: CalendarUnit::Day,
            max_frame_delta: MAX_FRAME_DELTA,
        }
    }
}

/// Baseline river conditions.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiverConfig {
    /// Flow direction (radians).
    pub flow_direction: f64,
    /// Flow rate (speed units per second).
    pub flow_rate: f64,
    /// Water temperature (°C).
    pub temperature: f64,
    /// Sunlight intensity (0-1).
    pub sunlight: f64,
    /// Nutrient stock (kg).
    pub nutrients: f64,
    /// Pollution level (mg/L).
    pub pollution: f64,
    /// Baseline dissolved oxygen (mg/L).
    pub dissolved_oxygen: f64,
    /// Ceiling of dissolved oxygen (mg/L).
    pub max_dissolved_oxygen: f64,
    /// Dissolved oxygen lost per unit of pollution (mg/L).
    pub oxygen_per_pollution: f64,
}

impl Default for RiverConfig {
    fn default() -> Self {
        Self {
            flow_direction: 0.0,
            flow_rate: 0.5,
            temperature: 28.0,
            sunlight: 0.8,
            nutrients: 500.0,
            pollution: 1.0,
            dissolved_oxygen: 8.0,
            max_dissolved_oxygen: 14.0,
            oxygen_per_pollution: 0.2,
        }
    }
}

/// Hyacinth growth, reproduction, movement and mortality constants.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlantConfig {
    /// Biomass of a newly created plant (kg).
    pub initial_biomass: f64,
    /// Biomass at or below which a plant is dead (kg).
    pub min_biomass: f64,
    /// Biomass cap (kg).
    pub max_biomass: f64,
    /// Maximum age (days).
    pub max_age: f64,
    /// Biomass gained per growth tick under optimal conditions (kg).
    pub base_growth: f64,

    pub nur_range: [f64; 2],
    pub pol_range: [f64; 2],
    pub resistance_range: [f64; 2],
    /// Maximum deviation of a daughter's resistance from its parent's.
    pub resistance_jitter: f64,
    /// Inclusive bounds of the daughter budget.
    pub daughters_range: [u32; 2],
    /// Bounds of the accumulated biomass that triggers reproduction (kg).
    pub reproduction_threshold_range: [f64; 2],
    /// Minimum distance between a new daughter and any other plant.
    pub min_spacing: f64,

    /// Radius of a plant is `base_radius + radius_per_kg * biomass`.
    pub base_radius: f64,
    pub radius_per_kg: f64,

    pub repulsion_radius: f64,
    pub repulsion_strength: f64,
    pub tether_distance: f64,
    pub tether_strength: f64,
    /// Fraction of velocity retained after one second.
    pub damping: f64,
    pub max_speed: f64,

    /// Dissolved oxygen consumed per kg of biomass (mg/L).
    pub oxygen_impact_per_kg: f64,

    pub lethal_pollution: f64,
    pub lethal_flow: f64,
    pub lethal_oxygen: f64,

    pub base_daily_mortality: f64,
    pub low_nur: f64,
    pub low_sunlight: f64,
    pub high_pollution: f64,
    pub high_flow: f64,
    /// Local density below which a plant counts as isolated (kg per cell).
    pub density_floor: f64,
    /// Local density above which a plant counts as overcrowded (kg per cell).
    pub density_ceiling: f64,
    pub isolation_factor: f64,
    pub crowding_factor: f64,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            initial_biomass: 0.2,
            min_biomass: 0.05,
            max_biomass: 5.0,
            max_age: 120.0,
            base_growth: 0.08,

            nur_range: [0.01, 0.05],
            pol_range: [0.005, 0.02],
            resistance_range: [0.3, 0.9],
            resistance_jitter: 0.05,
            daughters_range: [2, 6],
            reproduction_threshold_range: [0.6, 1.0],
            min_spacing: 12.0,

            base_radius: 6.0,
            radius_per_kg: 3.0,

            repulsion_radius: 30.0,
            repulsion_strength: 40.0,
            tether_distance: 40.0,
            tether_strength: 0.5,
            damping: 0.3,
            max_speed: 30.0,

            oxygen_impact_per_kg: 0.02,

            lethal_pollution: 5.0,
            lethal_flow: 3.0,
            lethal_oxygen: 0.0,

            base_daily_mortality: 0.01,
            low_nur: 0.02,
            low_sunlight: 0.3,
            high_pollution: 2.5,
            high_flow: 1.5,
            density_floor: 0.5,
            density_ceiling: 8.0,
            isolation_factor: 3.0,
            crowding_factor: 2.0,
        }
    }
}

impl PlantConfig {
    /// Collision radius of a plant with the given biomass.
    pub fn radius(&self, biomass: f64) -> f64 {
        self.base_radius + self.radius_per_kg * biomass
    }
}

/// Fish movement, reproduction and mortality constants.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FishConfig {
    pub radius: f64,
    pub max_speed: f64,
    /// Steering acceleration (pixels per second squared).
    pub acceleration: f64,
    /// Distance at which a target counts as reached.
    pub arrival_distance: f64,
    /// Distance below which a fish slows down toward its target.
    pub slowdown_radius: f64,
    /// Bounds of the re-target countdown (seconds).
    pub retarget_range: [f64; 2],
    /// Bounds of the speed factor drawn on each target acquisition.
    pub speed_factor_range: [f64; 2],
    pub resistance_range: [f64; 2],
    /// Minimum total speed for the heading to follow the velocity.
    pub min_heading_speed: f64,
    /// Death probability per check as `[dissolved oxygen, probability]` knots,
    /// interpolated linearly and held constant beyond the first and last knot.
    pub mortality_curve: Vec<[f64; 2]>,
}

impl Default for FishConfig {
    fn default() -> Self {
        Self {
            radius: 8.0,
            max_speed: 60.0,
            acceleration: 40.0,
            arrival_distance: 5.0,
            slowdown_radius: 40.0,
            retarget_range: [3.0, 8.0],
            speed_factor_range: [0.5, 1.0],
            resistance_range: [0.2, 0.6],
            min_heading_speed: 0.5,
            mortality_curve: vec![
                [1.0, 1.0],
                [2.0, 0.5],
                [3.0, 0.2],
                [4.0, 0.05],
                [6.0, 0.0],
            ],
        }
    }
}

/// Bulk seeding performed by the driver at the start of a session.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetupConfig {
    pub n_plants: usize,
    pub n_fish: usize,
    /// Reproduction probability per second of the seeded fish.
    pub fish_reproduce_rate: f64,
    /// Minimum distance between two seeded agents of the same species.
    pub min_spacing: f64,
    /// Placement attempts per agent before the last attempt is accepted.
    pub max_attempts: usize,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            n_plants: 20,
            n_fish: 10,
            fish_reproduce_rate: 0.02,
            min_spacing: 30.0,
            max_attempts: 100,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded.
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_world().context("invalid world section")?;
        self.validate_clock().context("invalid clock section")?;
        self.validate_river().context("invalid river section")?;
        self.validate_plant().context("invalid plant section")?;
        self.validate_fish().context("invalid fish section")?;
        self.validate_setup().context("invalid setup section")?;
        Ok(())
    }

    fn validate_world(&self) -> Result<()> {
        let world = &self.world;
        check_num(world.width, 1.0..=100_000.0).context("invalid width")?;
        check_num(world.height, 1.0..=100_000.0).context("invalid height")?;
        check_num(world.density_cell_size, 1.0..=world.width.min(world.height))
            .context("invalid density cell size")?;
        check_num(world.pixels_per_flow_unit, 0.0..=1_000.0)
            .context("invalid pixels per flow unit")?;
        Ok(())
    }

    fn validate_clock(&self) -> Result<()> {
        check_num(self.clock.speed, 0.1..=20.0).context("invalid speed")?;
        check_num(self.clock.max_frame_delta, 1e-3..=60.0)
            .context("invalid maximum frame delta")?;
        Ok(())
    }

    fn validate_river(&self) -> Result<()> {
        let river = &self.river;
        check_num(river.flow_rate, 0.0..=10.0).context("invalid flow rate")?;
        check_num(river.temperature, -5.0..=45.0).context("invalid temperature")?;
        check_num(river.sunlight, 0.0..=1.0).context("invalid sunlight")?;
        check_num(river.nutrients, 0.0..=1e9).context("invalid nutrients")?;
        check_num(river.pollution, 0.0..=100.0).context("invalid pollution")?;
        check_num(river.max_dissolved_oxygen, 0.0..=50.0)
            .context("invalid maximum dissolved oxygen")?;
        check_num(river.dissolved_oxygen, 0.0..=river.max_dissolved_oxygen)
            .context("invalid dissolved oxygen")?;
        check_num(river.oxygen_per_pollution, 0.0..=10.0)
            .context("invalid oxygen per pollution")?;
        Ok(())
    }

    fn validate_plant(&self) -> Result<()> {
        let plant = &self.plant;
        check_num(plant.min_biomass, 0.0..plant.max_biomass).context("invalid minimum biomass")?;
        check_num(plant.initial_biomass, plant.min_biomass..plant.max_biomass)
            .context("invalid initial biomass")?;
        check_num(plant.max_age, 0.0..=1e6).context("invalid maximum age")?;
        check_num(plant.base_growth, 0.0..=plant.max_biomass).context("invalid base growth")?;

        check_range(plant.nur_range, 0.0..=1.0).context("invalid nutrient uptake range")?;
        check_num(plant.nur_range[1], 1e-9..=1.0).context("invalid maximum nutrient uptake")?;
        check_range(plant.pol_range, 0.0..=1.0).context("invalid pollutant absorption range")?;
        check_range(plant.resistance_range, 0.0..=1.0).context("invalid resistance range")?;
        check_num(plant.resistance_jitter, 0.0..=1.0).context("invalid resistance jitter")?;
        check_range(plant.daughters_range, 0..=100).context("invalid daughters range")?;
        check_range(plant.reproduction_threshold_range, 0.0..=plant.max_biomass)
            .context("invalid reproduction threshold range")?;
        check_num(plant.min_spacing, 0.0..=self.world.width.min(self.world.height))
            .context("invalid minimum spacing")?;

        check_num(plant.base_radius, 0.0..=1_000.0).context("invalid base radius")?;
        check_num(plant.radius_per_kg, 0.0..=1_000.0).context("invalid radius per kg")?;
        // Daughters are placed at twice the parent radius and must clear the parent itself.
        let offset = 2.0 * plant.radius(plant.initial_biomass);
        check_num(plant.min_spacing, 0.0..offset)
            .context("minimum spacing must stay below the daughter offset")?;
        check_num(plant.repulsion_radius, 0.0..=1_000.0).context("invalid repulsion radius")?;
        check_num(plant.repulsion_strength, 0.0..=1e4).context("invalid repulsion strength")?;
        check_num(plant.tether_distance, 0.0..=1_000.0).context("invalid tether distance")?;
        check_num(plant.tether_strength, 0.0..=1e4).context("invalid tether strength")?;
        check_num(plant.damping, 0.0..=1.0).context("invalid damping")?;
        check_num(plant.max_speed, 0.0..=1e4).context("invalid maximum speed")?;
        check_num(plant.oxygen_impact_per_kg, 0.0..=10.0).context("invalid oxygen impact")?;

        check_num(plant.lethal_pollution, 0.0..=100.0).context("invalid lethal pollution")?;
        check_num(plant.lethal_flow, 0.0..=100.0).context("invalid lethal flow")?;
        check_num(plant.lethal_oxygen, 0.0..=50.0).context("invalid lethal oxygen")?;

        check_num(plant.base_daily_mortality, 0.0..=1.0).context("invalid base mortality")?;
        check_num(plant.density_floor, 0.0..=plant.density_ceiling)
            .context("invalid density floor")?;
        check_num(plant.isolation_factor, 1.0..=100.0).context("invalid isolation factor")?;
        check_num(plant.crowding_factor, 1.0..=100.0).context("invalid crowding factor")?;
        Ok(())
    }

    fn validate_fish(&self) -> Result<()> {
        let fish = &self.fish;
        check_num(fish.radius, 0.0..=1_000.0).context("invalid radius")?;
        check_num(fish.max_speed, 0.0..=1e4).context("invalid maximum speed")?;
        check_num(fish.acceleration, 0.0..=1e5).context("invalid acceleration")?;
        check_num(fish.arrival_distance, 0.0..=1_000.0).context("invalid arrival distance")?;
        check_num(fish.slowdown_radius, 1e-9..=1_000.0).context("invalid slowdown radius")?;
        check_range(fish.retarget_range, 0.0..=1e4).context("invalid retarget range")?;
        check_range(fish.speed_factor_range, 0.0..=1.0).context("invalid speed factor range")?;
        check_range(fish.resistance_range, 0.0..=1.0).context("invalid resistance range")?;
        check_num(fish.min_heading_speed, 0.0..=1e4).context("invalid minimum heading speed")?;
        check_curve(&fish.mortality_curve).context("invalid mortality curve")?;
        Ok(())
    }

    fn validate_setup(&self) -> Result<()> {
        let setup = &self.setup;
        check_num(setup.n_plants, 0..=100_000).context("invalid number of plants")?;
        check_num(setup.n_fish, 0..=100_000).context("invalid number of fish")?;
        check_num(setup.fish_reproduce_rate, 0.0..=1.0)
            .context("invalid fish reproduction rate")?;
        check_num(setup.min_spacing, 0.0..=self.world.width.min(self.world.height))
            .context("invalid minimum spacing")?;
        check_num(setup.max_attempts, 1..=10_000).context("invalid maximum attempts")?;
        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_range<T, R>(pair: [T; 2], range: R) -> Result<()>
where
    T: PartialOrd + Debug + Copy,
    R: RangeBounds<T> + Debug + Clone,
{
    let [low, high] = pair;
    if low > high {
        bail!("lower bound {low:?} must not exceed upper bound {high:?}");
    }
    check_num(low, range.clone()).context("invalid lower bound")?;
    check_num(high, range).context("invalid upper bound")?;
    Ok(())
}

fn check_curve(curve: &[[f64; 2]]) -> Result<()> {
    if curve.is_empty() {
        bail!("curve must have at least one knot");
    }
    for (i_knot, &[oxygen, prob]) in curve.iter().enumerate() {
        check_num(oxygen, 0.0..=50.0).with_context(|| format!("invalid oxygen of knot {i_knot}"))?;
        check_num(prob, 0.0..=1.0)
            .with_context(|| format!("invalid probability of knot {i_knot}"))?;
    }
    // Oxygen strictly increasing, probability non-increasing.
    for (i_knot, pair) in curve.windows(2).enumerate() {
        let [[oxygen_a, prob_a], [oxygen_b, prob_b]] = [pair[0], pair[1]];
        if oxygen_b <= oxygen_a {
            bail!("knot {} oxygen must exceed knot {i_knot} oxygen", i_knot + 1);
        }
        if prob_b > prob_a {
            bail!("knot {} probability must not exceed knot {i_knot} probability", i_knot + 1);
        }
    }
    Ok(())
}
