use hyacinth_river::{CalendarUnit, Config};

#[test]
fn empty_file_yields_defaults() {
    let cfg = Config::from_toml("").expect("empty config is valid");
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.seed, None);
}

#[test]
fn sections_override_defaults() {
    let contents = String::new()
        + "seed = 42\n"
        + "\n"
        + "[clock]\n"
        + "speed = 2.5\n"
        + "unit = \"week\"\n"
        + "\n"
        + "[river]\n"
        + "temperature = 31.0\n"
        + "\n"
        + "[fish]\n"
        + "mortality_curve = [ [ 0.5, 0.9,], [ 3.0, 0.0,],]\n";

    let cfg = Config::from_toml(&contents).expect("config is valid");
    assert_eq!(cfg.seed, Some(42));
    assert_eq!(cfg.clock.speed, 2.5);
    assert_eq!(cfg.clock.unit, CalendarUnit::Week);
    assert_eq!(cfg.river.temperature, 31.0);
    assert_eq!(cfg.river.sunlight, 0.8);
    assert_eq!(cfg.fish.mortality_curve, vec![[0.5, 0.9], [3.0, 0.0]]);
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(Config::from_toml("[river]\nsalinity = 3.0\n").is_err());
    assert!(Config::from_toml("[lake]\n").is_err());
}

#[test]
fn out_of_range_values_are_rejected() {
    assert!(Config::from_toml("[clock]\nspeed = 0.0\n").is_err());
    assert!(Config::from_toml("[clock]\nspeed = 21.0\n").is_err());
    assert!(Config::from_toml("[river]\nsunlight = 1.5\n").is_err());
    assert!(Config::from_toml("[river]\ndissolved_oxygen = 20.0\n").is_err());
    assert!(Config::from_toml("[plant]\nnur_range = [ 0.05, 0.01,]\n").is_err());
    assert!(Config::from_toml("[plant]\ndaughters_range = [ 2, 500,]\n").is_err());
    assert!(Config::from_toml("[setup]\nmax_attempts = 0\n").is_err());
    assert!(Config::from_toml("[world]\ndensity_cell_size = 0.0\n").is_err());
}

#[test]
fn mortality_curve_must_be_ordered() {
    assert!(Config::from_toml("[fish]\nmortality_curve = []\n").is_err());
    let unordered = "[fish]\nmortality_curve = [ [ 2.0, 0.5,], [ 1.0, 0.2,],]\n";
    assert!(Config::from_toml(unordered).is_err());
    let increasing = "[fish]\nmortality_curve = [ [ 1.0, 0.2,], [ 2.0, 0.5,],]\n";
    assert!(Config::from_toml(increasing).is_err());
    assert!(Config::from_toml("[fish]\nmortality_curve = [ [ 1.0, 1.5,],]\n").is_err());
}

#[test]
fn error_chain_names_the_offending_section() {
    let error = Config::from_toml("[plant]\ndamping = 2.0\n").expect_err("damping is out of range");
    let chain = format!("{error:#}");
    assert!(chain.contains("invalid plant section"), "{chain}");
    assert!(chain.contains("invalid damping"), "{chain}");
}

#[test]
fn spacing_must_leave_room_for_daughters() {
    let crowded = "[plant]\nbase_radius = 5.0\nradius_per_kg = 0.0\n";
    let error = Config::from_toml(crowded).expect_err("spacing 12 exceeds offset 10");
    let chain = format!("{error:#}");
    assert!(chain.contains("daughter offset"), "{chain}");

    let roomy = "[plant]\nbase_radius = 5.0\nradius_per_kg = 0.0\nmin_spacing = 9.0\n";
    assert!(Config::from_toml(roomy).is_ok());
}
