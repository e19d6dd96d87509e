use hyacinth_river::{
    BulkSetup, ClockState, Command, Config, DeathCause, Engine, Environment, PlantId, Vec2,
};
use std::collections::HashSet;
use std::f64::consts::FRAC_1_SQRT_2;

const FRAME: f64 = 1.0 / 60.0;

fn seeded_config(seed: u64) -> Config {
    Config {
        seed: Some(seed),
        ..Config::default()
    }
}

/// Plants that neither grow nor die at random, so a single tick is fully predictable.
fn still_config(seed: u64) -> Config {
    let mut cfg = seeded_config(seed);
    cfg.plant.base_growth = 0.0;
    cfg.plant.base_daily_mortality = 0.0;
    cfg
}

fn setup(n_plants: usize, n_fish: usize, min_spacing: f64) -> BulkSetup {
    BulkSetup {
        n_plants,
        n_fish,
        fish_reproduce_rate: 0.05,
        min_spacing,
        max_attempts: 1_000,
    }
}

/// Make `id` reproduce on the next tick it gets.
fn prime(engine: &mut Engine, id: PlantId) {
    let plant = engine
        .population_mut()
        .plant_mut(id)
        .expect("plant is alive");
    plant.biomass_gained = 5.0;
}

fn first_daughter(engine: &Engine, parent_id: PlantId) -> PlantId {
    let parent = engine.plants().get(parent_id).expect("parent is alive");
    *parent.daughters.first().expect("parent has a daughter")
}

#[test]
fn bulk_setup_respects_spacing() {
    let mut engine = Engine::new(seeded_config(1)).expect("valid config");
    engine.bulk_setup(&setup(5, 3, 40.0));

    let world = *engine.world();
    let plants: Vec<_> = engine.plants().iter().map(|plant| plant.position).collect();
    let fish: Vec<_> = engine.fish().iter().map(|fish| fish.position).collect();
    assert_eq!(plants.len(), 5);
    assert_eq!(fish.len(), 3);

    for group in [&plants, &fish] {
        for (i, &a) in group.iter().enumerate() {
            for &b in &group[i + 1..] {
                assert!(world.distance(a, b) >= 40.0);
            }
        }
    }

    let cfg = engine.config().plant.clone();
    for plant in engine.plants() {
        assert_eq!(plant.biomass, cfg.initial_biomass);
        assert_eq!(plant.current_daughters, 0);
        assert_eq!(plant.parent, None);
    }

    // A second setup replaces the agents instead of adding to them.
    engine.bulk_setup(&setup(2, 1, 40.0));
    assert_eq!(engine.counts().plants, 2);
    assert_eq!(engine.counts().fish, 1);
}

#[test]
fn bulk_setup_lowers_dissolved_oxygen() {
    let mut engine = Engine::new(seeded_config(2)).expect("valid config");
    let before = engine.environment().current_dissolved_oxygen();

    engine.bulk_setup(&setup(50, 0, 10.0));
    let impact = engine.population().oxygen_impact();
    assert!(impact > 0.0);
    assert!((before - engine.environment().current_dissolved_oxygen() - impact).abs() < 1e-9);
}

#[test]
fn paused_engine_does_not_change() {
    let mut engine = Engine::new(seeded_config(3)).expect("valid config");
    engine.bulk_setup(&setup(15, 8, 30.0));
    engine.play();
    for _ in 0..30 {
        engine.advance(FRAME).expect("step succeeds");
    }
    engine.pause();

    let plants = engine.plants().as_slice().to_vec();
    let fish = engine.fish().as_slice().to_vec();
    let env = engine.environment().clone();
    let clock = engine.clock();

    for _ in 0..100 {
        assert!(!engine.advance(FRAME).expect("paused step succeeds"));
    }

    assert_eq!(engine.plants().as_slice(), plants.as_slice());
    assert_eq!(engine.fish().as_slice(), fish.as_slice());
    assert_eq!(engine.environment(), &env);
    assert_eq!(engine.clock(), clock);
    assert_eq!(engine.clock().state, ClockState::Paused);
}

#[test]
fn lethal_pollution_clears_every_plant_in_one_tick() {
    let mut engine = Engine::new(seeded_config(4)).expect("valid config");
    engine.bulk_setup(&setup(12, 0, 30.0));
    engine.set_pollution(100.0);
    engine.play();

    engine.advance(FRAME).expect("step succeeds");

    assert!(engine.plants().is_empty());
    let report = engine.last_report();
    assert_eq!(report.plant_deaths.get(&DeathCause::Pollution), Some(&12));
    assert_eq!(report.total_plant_deaths(), 12);
}

#[test]
fn reset_restores_baseline_and_keeps_speed() {
    let cfg = seeded_config(5);
    let baseline = Environment::new(&cfg.river);
    let mut engine = Engine::new(cfg).expect("valid config");

    engine.bulk_setup(&setup(10, 10, 30.0));
    engine.set_speed(3.0);
    engine.set_temperature(35.0);
    engine.play();
    for _ in 0..90 {
        engine.advance(FRAME).expect("step succeeds");
    }
    assert!(engine.clock().days > 0);
    assert!(!engine.history().samples().is_empty());

    engine.reset();

    let clock = engine.clock();
    assert_eq!(clock.state, ClockState::Stopped);
    assert_eq!(clock.elapsed, 0.0);
    assert_eq!(clock.ticks, 0);
    assert_eq!(clock.days, 0);
    assert_eq!(clock.speed, 3.0);
    assert!(engine.plants().is_empty());
    assert!(engine.fish().is_empty());
    assert!(engine.history().samples().is_empty());
    assert_eq!(engine.environment(), &baseline);
}

#[test]
fn primed_plant_buds_a_linked_daughter() {
    let mut engine = Engine::new(still_config(6)).expect("valid config");
    let parent_id = engine.add_plant(Some(Vec2::new(400.0, 300.0)));
    prime(&mut engine, parent_id);
    engine.play();

    engine.advance(FRAME).expect("step succeeds");

    assert_eq!(engine.plants().len(), 2);
    assert_eq!(engine.last_report().plant_births, 1);

    let parent = engine.plants().get(parent_id).expect("parent survives");
    assert_eq!(parent.current_daughters, 1);
    assert_eq!(parent.daughters.len(), 1);
    assert_eq!(parent.biomass_gained, 0.0);

    let daughter_id = *parent.daughters.first().expect("one daughter");
    let daughter = engine.plants().get(daughter_id).expect("daughter exists");
    assert_eq!(daughter.parent, Some(parent_id));
    assert_eq!(daughter.biomass, engine.config().plant.initial_biomass);
    assert_eq!(daughter.age, 0.0);

    let gap = engine.world().distance(parent.position, daughter.position);
    assert!(gap > 10.0 && gap < 16.0, "daughter placed {gap} away");
}

#[test]
fn boxed_in_plant_keeps_its_budget() {
    let cfg = still_config(7);
    let offset = 2.0 * cfg.plant.radius(cfg.plant.initial_biomass);
    let mut engine = Engine::new(cfg).expect("valid config");

    let center = Vec2::new(400.0, 300.0);
    let parent_id = engine.add_plant(Some(center));
    for (dx, dy) in [
        (1.0, 0.0),
        (0.0, 1.0),
        (-1.0, 0.0),
        (0.0, -1.0),
        (FRAC_1_SQRT_2, FRAC_1_SQRT_2),
        (-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
        (-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
        (FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
    ] {
        engine.add_plant(Some(center + Vec2::new(dx, dy) * offset));
    }
    prime(&mut engine, parent_id);
    engine.play();

    engine.advance(FRAME).expect("step succeeds");

    assert_eq!(engine.plants().len(), 9);
    assert_eq!(engine.last_report().plant_births, 0);
    let parent = engine.plants().get(parent_id).expect("parent survives");
    assert_eq!(parent.current_daughters, 0);
    assert!(parent.daughters.is_empty());
    assert_eq!(parent.biomass_gained, 5.0);
}

#[test]
fn removing_plants_clears_references() {
    let mut engine = Engine::new(still_config(8)).expect("valid config");
    let parent_id = engine.add_plant(Some(Vec2::new(200.0, 200.0)));
    engine.play();

    prime(&mut engine, parent_id);
    engine.advance(FRAME).expect("step succeeds");
    let first = first_daughter(&engine, parent_id);

    // Losing a daughter frees a slot of the budget.
    engine.population_mut().remove_plants(&HashSet::from([first]));
    let parent = engine.plants().get(parent_id).expect("parent");
    assert!(parent.daughters.is_empty());
    assert_eq!(parent.current_daughters, 0);

    prime(&mut engine, parent_id);
    engine.advance(FRAME).expect("step succeeds");
    let second = first_daughter(&engine, parent_id);
    assert_ne!(first, second);

    // Losing the parent orphans the daughter.
    let removed = engine.population_mut().remove_plants(&HashSet::from([parent_id]));
    assert_eq!(removed, 1);
    let daughter = engine.plants().get(second).expect("daughter survives");
    assert_eq!(daughter.parent, None);
}

#[test]
fn long_run_keeps_lineage_consistent() {
    let mut cfg = seeded_config(9);
    cfg.river.temperature = 30.0;
    cfg.river.sunlight = 1.0;
    cfg.plant.base_growth = 0.2;
    let plant_cfg = cfg.plant.clone();
    let max_oxygen = cfg.river.max_dissolved_oxygen;

    let mut engine = Engine::new(cfg).expect("valid config");
    engine.bulk_setup(&setup(30, 10, 30.0));
    engine.play();

    let mut births = 0;
    while engine.clock().days < 8 {
        engine.advance(0.1).expect("step succeeds");
        births += engine.last_report().plant_births;

        let plants = engine.plants();
        for plant in plants {
            assert!(plant.biomass > plant_cfg.min_biomass);
            assert!(plant.biomass <= plant_cfg.max_biomass);
            assert!(plant.current_daughters <= plant.future_daughters);
            assert_eq!(plant.current_daughters as usize, plant.daughters.len());
            if let Some(parent) = plant.parent {
                assert!(plants.contains(parent));
            }
            for &daughter in &plant.daughters {
                assert!(plants.contains(daughter));
            }
        }

        let env = engine.environment();
        assert!((0.0..=max_oxygen).contains(&env.current_dissolved_oxygen()));
        assert!(env.total_nutrients() >= 0.0);
        assert!(env.pollution_level() >= 0.0);
    }

    assert!(births > 0);
}

#[test]
fn commands_drive_the_engine() {
    let mut engine = Engine::new(seeded_config(10)).expect("valid config");

    engine.execute(Command::BulkSetup(setup(4, 2, 30.0)));
    engine.execute(Command::AddPlant { position: None });
    engine.execute(Command::AddFish {
        position: Some(Vec2::new(-10.0, 610.0)),
        reproduce_rate: 0.3,
    });
    assert_eq!(engine.counts().plants, 5);
    assert_eq!(engine.counts().fish, 3);
    assert!(engine
        .fish()
        .iter()
        .any(|fish| fish.position == Vec2::new(790.0, 10.0)));

    engine.execute(Command::SetSpeed(50.0));
    engine.execute(Command::SetTemperature(100.0));
    engine.execute(Command::SetFlow {
        direction: 1.0,
        rate: 2.0,
    });
    engine.execute(Command::SetFishReproduceRate(0.0));
    assert_eq!(engine.clock().speed, 20.0);
    assert_eq!(engine.environment().temperature(), 45.0);
    assert_eq!(engine.environment().flow_rate(), 2.0);
    assert!(engine.fish().iter().all(|fish| fish.reproduce_rate == 0.0));

    engine.execute(Command::Toggle);
    assert_eq!(engine.clock().state, ClockState::Running);
    assert!(engine.advance(FRAME).expect("step succeeds"));
    engine.execute(Command::Toggle);
    assert_eq!(engine.clock().state, ClockState::Paused);

    engine.execute(Command::Reset);
    assert_eq!(engine.clock().state, ClockState::Stopped);
    assert_eq!(engine.counts().plants, 0);
}

#[test]
fn history_records_one_sample_per_day() {
    let mut engine = Engine::new(seeded_config(11)).expect("valid config");
    engine.bulk_setup(&setup(5, 5, 30.0));
    engine.play();

    for _ in 0..6 {
        engine.advance(0.5).expect("step succeeds");
    }

    let days: Vec<_> = engine.history().samples().iter().map(|s| s.day).collect();
    assert_eq!(days, [0, 1, 2, 3]);

    let last = engine.history().last().expect("samples recorded");
    assert_eq!(last.ticks, 6);
    assert_eq!(last.n_plants, engine.counts().plants);

    let summary = engine.history().summary();
    assert_eq!(summary.n_samples, 4);
    assert!(summary.dissolved_oxygen.mean.is_finite());
}

#[test]
fn oversized_and_non_finite_frames_are_bounded() {
    let mut cfg = seeded_config(12);
    cfg.clock.max_frame_delta = 0.5;
    let mut engine = Engine::new(cfg).expect("valid config");
    engine.bulk_setup(&setup(5, 3, 30.0));
    engine.set_speed(20.0);
    engine.play();

    assert!(engine.advance(f64::INFINITY).expect("step succeeds"));
    assert!(engine.advance(f64::NAN).expect("step succeeds"));
    assert_eq!(engine.clock().elapsed, 0.0);

    assert!(engine.advance(1e12).expect("step succeeds"));
    assert_eq!(engine.clock().elapsed, 10.0);
    assert_eq!(engine.clock().days, 10);
}
