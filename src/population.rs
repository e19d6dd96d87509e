//! Agent collections and the per-tick commit of agent updates.

use crate::config::{FishConfig, PlantConfig};
use crate::environment::Environment;
use crate::fish::{Fish, FishOutcome};
use crate::plant::{Plant, PlantOutcome};
use crate::stats::TickReport;
use crate::world::Vec2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Debug},
    hash::Hash,
};

/// Stable identity of a plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlantId(u64);

/// Stable identity of a fish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FishId(u64);

impl PlantId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl FishId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hyacinth-{}", self.0)
    }
}

impl fmt::Display for FishId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fish-{}", self.0)
    }
}

/// An agent stored in an [`Arena`].
pub trait Agent {
    type Id: Copy + Eq + Hash + Debug;

    fn id(&self) -> Self::Id;
}

/// Dense agent storage addressed by id.
///
/// Lookup, insertion and removal by id are O(1); iteration follows insertion
/// order except where `remove` swaps the last agent into the freed slot.
#[derive(Debug, Clone)]
pub struct Arena<T: Agent> {
    items: Vec<T>,
    slots: HashMap<T::Id, usize>,
}

impl<T: Agent> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Agent> Arena<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            slots: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.slots.get(&id).map(|&index| &self.items[index])
    }

    pub fn get_mut(&mut self, id: T::Id) -> Option<&mut T> {
        self.slots.get(&id).map(|&index| &mut self.items[index])
    }

    /// Insert an agent, replacing the stored agent with the same id if any.
    pub fn insert(&mut self, item: T) {
        let id = item.id();
        match self.slots.get(&id) {
            Some(&index) => self.items[index] = item,
            None => {
                self.slots.insert(id, self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn remove(&mut self, id: T::Id) -> Option<T> {
        let index = self.slots.remove(&id)?;
        let removed = self.items.swap_remove(index);
        if let Some(moved) = self.items.get(index) {
            self.slots.insert(moved.id(), index);
        }
        Some(removed)
    }

    /// Remove every agent whose id is in `dead`, preserving the order of the rest.
    pub fn remove_many(&mut self, dead: &HashSet<T::Id>) -> usize {
        if dead.is_empty() {
            return 0;
        }
        let before = self.items.len();
        self.items.retain(|item| !dead.contains(&item.id()));
        self.slots.clear();
        for (index, item) in self.items.iter().enumerate() {
            self.slots.insert(item.id(), index);
        }
        before - self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.slots.clear();
    }
}

impl<'a, T: Agent> IntoIterator for &'a Arena<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Owner of the plant and fish collections.
#[derive(Debug, Clone, Default)]
pub struct Population {
    plants: Arena<Plant>,
    fish: Arena<Fish>,
    next_id: u64,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plants(&self) -> &Arena<Plant> {
        &self.plants
    }

    pub fn fish(&self) -> &Arena<Fish> {
        &self.fish
    }

    pub fn plant_mut(&mut self, id: PlantId) -> Option<&mut Plant> {
        self.plants.get_mut(id)
    }

    pub fn fish_mut(&mut self, id: FishId) -> Option<&mut Fish> {
        self.fish.get_mut(id)
    }

    pub fn spawn_plant<R: Rng + ?Sized>(
        &mut self,
        position: Vec2,
        cfg: &PlantConfig,
        rng: &mut R,
    ) -> PlantId {
        let id = self.next_plant_id();
        self.plants.insert(Plant::new(id, position, cfg, rng));
        id
    }

    pub fn spawn_fish<R: Rng + ?Sized>(
        &mut self,
        position: Vec2,
        reproduce_rate: f64,
        cfg: &FishConfig,
        rng: &mut R,
    ) -> FishId {
        let id = self.next_fish_id();
        self.fish.insert(Fish::new(id, position, reproduce_rate, cfg, rng));
        id
    }

    /// Apply the outcomes of a full plant sweep.
    ///
    /// Daughters are linked to their parents before dead plants are removed, so a
    /// daughter born in the same tick its parent dies ends up orphaned.
    pub fn commit_plants(
        &mut self,
        outcomes: Vec<PlantOutcome>,
        cfg: &PlantConfig,
        report: &mut TickReport,
    ) {
        let mut births = Vec::new();
        let mut dead = HashSet::new();

        for PlantOutcome {
            mut plant,
            offspring,
            death,
        } in outcomes
        {
            if let Some(offspring) = offspring {
                let child_id = self.next_plant_id();
                plant.daughters.insert(child_id);
                log::trace!("{} budded {child_id}", plant.id());
                births.push(Plant::from_offspring(child_id, plant.id(), offspring, cfg));
            }
            if let Some(cause) = death {
                log::trace!("{} died ({cause})", plant.id());
                dead.insert(plant.id());
                report.record_plant_death(cause);
            }
            self.plants.insert(plant);
        }

        report.plant_births += births.len();
        for child in births {
            self.plants.insert(child);
        }

        self.remove_plants(&dead);
    }

    /// Remove the given plants and clear every reference to them held by survivors.
    pub fn remove_plants(&mut self, dead: &HashSet<PlantId>) -> usize {
        let removed = self.plants.remove_many(dead);
        if removed == 0 {
            return 0;
        }

        for plant in self.plants.iter_mut() {
            if plant.parent.is_some_and(|parent| dead.contains(&parent)) {
                plant.parent = None;
            }
            let before = plant.daughters.len();
            plant.daughters.retain(|daughter| !dead.contains(daughter));
            let lost = (before - plant.daughters.len()) as u32;
            plant.current_daughters = plant.current_daughters.saturating_sub(lost);
        }
        removed
    }

    /// Apply the outcomes of a full fish sweep.
    pub fn commit_fish<R: Rng + ?Sized>(
        &mut self,
        outcomes: Vec<FishOutcome>,
        cfg: &FishConfig,
        rng: &mut R,
        report: &mut TickReport,
    ) {
        let mut births = Vec::new();
        let mut dead = HashSet::new();

        for FishOutcome {
            fish,
            offspring,
            died,
        } in outcomes
        {
            for _ in 0..offspring {
                let child_id = self.next_fish_id();
                log::trace!("{} spawned {child_id}", fish.id());
                births.push(Fish::offspring(child_id, &fish, cfg, rng));
            }
            if fish.touching_hyacinth && !died {
                report.fish_touching += 1;
            }
            if died {
                log::trace!("{} died", fish.id());
                dead.insert(fish.id());
            }
            self.fish.insert(fish);
        }

        report.fish_births += births.len();
        for child in births {
            self.fish.insert(child);
        }

        report.fish_deaths += self.fish.remove_many(&dead);
    }

    pub fn set_fish_reproduce_rate(&mut self, rate: f64) {
        for fish in self.fish.iter_mut() {
            fish.set_reproduce_rate(rate);
        }
    }

    /// Nutrients and pollutants removed per second by all live plants.
    pub fn consumption(&self) -> (f64, f64) {
        self.plants
            .iter()
            .fold((0.0, 0.0), |(nur, pol), plant| (nur + plant.nur, pol + plant.pol))
    }

    /// Summed dissolved oxygen impact of all live plants (mg/L).
    pub fn oxygen_impact(&self) -> f64 {
        self.plants
            .iter()
            .map(|plant| plant.dissolved_oxygen_impact)
            .sum()
    }

    pub fn total_biomass(&self) -> f64 {
        self.plants.iter().map(|plant| plant.biomass).sum()
    }

    /// Charge `periods` seconds of consumption to the environment and refresh its oxygen level.
    pub fn apply_consumption(&self, env: &mut Environment, periods: u32) {
        let (nur, pol) = self.consumption();
        let periods = f64::from(periods);
        env.consume(nur * periods, pol * periods);
        env.update_dissolved_oxygen(self.oxygen_impact());
    }

    pub fn clear(&mut self) {
        self.plants.clear();
        self.fish.clear();
    }

    fn next_plant_id(&mut self) -> PlantId {
        self.next_id += 1;
        PlantId(self.next_id)
    }

    fn next_fish_id(&mut self) -> FishId {
        self.next_id += 1;
        FishId(self.next_id)
    }
}
