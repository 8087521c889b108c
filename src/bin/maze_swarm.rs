//! Headless maze swarm runner.
//!
//! Usage: maze-swarm [CONFIG_JSON] [TRIALS]
//! Log level follows RUST_LOG-style filters via MAZE_SWARM_LOG (default "info").

use anyhow::{bail, Context, Result};
use mazeswarm_core::{setup_logging, Simulation, SimulationConfig, TrialBatch};
use std::sync::atomic::AtomicBool;
use tracing::info;

const DEFAULT_MAX_TICKS: u64 = 10_000;

fn main() -> Result<()> {
    setup_logging(std::env::var("MAZE_SWARM_LOG").ok());

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SimulationConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => SimulationConfig::default(),
    };
    let trials: u64 = match args.next() {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("TRIALS must be a number, got {:?}", raw))?,
        None => 1,
    };
    if trials == 0 {
        bail!("TRIALS must be at least 1");
    }
    let max_ticks = config.max_ticks.unwrap_or(DEFAULT_MAX_TICKS);

    if trials > 1 {
        let first_seed = config.seed.unwrap_or(0);
        let summary = TrialBatch::new(config, max_ticks)?.run(first_seed, trials)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let mut sim = Simulation::from_config(&config).context("building simulation")?;
    let outcome = sim.run(Some(max_ticks), &AtomicBool::new(false));

    for drone in sim.swarm().drones() {
        info!(
            "🛸 Drone {} at {} (subgroup {}, goal found: {}, path {})",
            drone.id(),
            drone.position(),
            drone.subgroup(),
            drone.goal_found(),
            drone.path().len()
        );
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
