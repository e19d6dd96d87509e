use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use hyacinth_river::{BulkSetup, Config, Engine};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// TOML configuration file (defaults are used when absent).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Seed the river and run it headless.
    Run {
        /// Number of simulated days to run.
        #[arg(long, default_value_t = 30)]
        days: u64,

        /// Frames per second of the simulated driver.
        #[arg(long, default_value_t = 60.0)]
        fps: f64,

        /// Speed multiplier (overrides the configuration).
        #[arg(long)]
        speed: Option<f64>,
    },

    /// Load and validate the configuration.
    Validate,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let cfg = load_config(args.config.as_deref()).context("failed to load config")?;

    match args.command {
        Command::Run { days, fps, speed } => run_simulation(cfg, days, fps, speed)?,
        Command::Validate => log::info!("{cfg:#?}"),
    }

    Ok(())
}

fn load_config(file: Option<&Path>) -> Result<Config> {
    match file {
        Some(file) => Config::from_file(file),
        None => {
            let cfg = Config::default();
            cfg.validate().context("failed to validate default config")?;
            Ok(cfg)
        }
    }
}

fn run_simulation(cfg: Config, days: u64, fps: f64, speed: Option<f64>) -> Result<()> {
    if !(fps > 0.0 && fps <= 1_000.0) {
        bail!("frames per second must be in the range (0, 1000], but is {fps}");
    }

    let setup = BulkSetup::from(&cfg.setup);
    let mut engine = Engine::new(cfg).context("failed to construct engine")?;
    if let Some(speed) = speed {
        engine.set_speed(speed);
    }

    engine.bulk_setup(&setup);
    engine.play();

    let frame = 1.0 / fps;
    let mut last_day = 0;
    while engine.clock().days < days {
        engine.advance(frame).context("failed to advance engine")?;

        let clock = engine.clock();
        if clock.days == last_day {
            continue;
        }
        last_day = clock.days;

        let counts = engine.counts();
        let env = engine.environment();
        log::info!(
            "{} {:4}: {:5} hyacinths ({:8.2} kg), {:5} fish, DO {:5.2} mg/L, nutrients {:8.2} kg, pollution {:5.2} mg/L",
            clock.unit,
            clock.days,
            counts.plants,
            counts.total_biomass,
            counts.fish,
            env.current_dissolved_oxygen(),
            env.total_nutrients(),
            env.pollution_level(),
        );

        if counts.plants == 0 && counts.fish == 0 {
            log::warn!("both populations are extinct");
            break;
        }
    }

    let summary = engine.history().summary();
    log::info!("{summary:#?}");

    Ok(())
}
