use crate::core::config::SimulationConfig;
use crate::core::error::SwarmResult;
use crate::swarm::{Simulation, StopReason};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use tracing::info;

/// Outcome of one seeded run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialSummary {
    pub seed: u64,
    pub ticks: u64,
    pub converged: bool,
    pub reason: StopReason,
    /// Drones with `goal_found` when the run stopped
    pub informed_drones: usize,
    pub subgroups: usize,
}

/// Aggregate over a batch of trials
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub trials: Vec<TrialSummary>,
    pub converged: usize,
    /// Mean ticks over converged trials only
    pub mean_ticks_to_converge: Option<f64>,
}

impl BatchSummary {
    pub fn convergence_rate(&self) -> f64 {
        if self.trials.is_empty() {
            0.0
        } else {
            self.converged as f64 / self.trials.len() as f64
        }
    }
}

/// Runs independent seeded simulations side by side.
///
/// Every trial is its own single-threaded simulation; only whole trials are
/// spread over the rayon pool.
pub struct TrialBatch {
    base: SimulationConfig,
    max_ticks: u64,
}

impl TrialBatch {
    /// `max_ticks` bounds each trial; the config's own bound is ignored.
    pub fn new(base: SimulationConfig, max_ticks: u64) -> SwarmResult<Self> {
        base.validate()?;
        Ok(TrialBatch { base, max_ticks })
    }

    pub fn run_seed(&self, seed: u64) -> SwarmResult<TrialSummary> {
        let mut config = self.base.clone();
        config.seed = Some(seed);
        let mut sim = Simulation::from_config(&config)?.without_trace();
        let outcome = sim.run(Some(self.max_ticks), &AtomicBool::new(false));

        let swarm = sim.swarm();
        Ok(TrialSummary {
            seed,
            ticks: outcome.ticks,
            converged: outcome.reason == StopReason::Converged,
            reason: outcome.reason,
            informed_drones: swarm.drones().iter().filter(|d| d.goal_found()).count(),
            subgroups: swarm.registry().len(),
        })
    }

    /// Run seeds `first_seed .. first_seed + count` in parallel.
    pub fn run(&self, first_seed: u64, count: u64) -> SwarmResult<BatchSummary> {
        info!("📊 Running {} maze swarm trials (max {} ticks each)...", count, self.max_ticks);

        let trials: Vec<TrialSummary> = (first_seed..first_seed + count)
            .into_par_iter()
            .map(|seed| self.run_seed(seed))
            .collect::<SwarmResult<Vec<_>>>()?;

        for t in &trials {
            if t.converged {
                info!("✅ [seed {}] converged after {} ticks", t.seed, t.ticks);
            } else {
                info!(
                    "❌ [seed {}] {:?} after {} ticks, {} drones informed",
                    t.seed, t.reason, t.ticks, t.informed_drones
                );
            }
        }

        let converged: Vec<u64> = trials.iter().filter(|t| t.converged).map(|t| t.ticks).collect();
        let mean_ticks_to_converge = if converged.is_empty() {
            None
        } else {
            Some(converged.iter().sum::<u64>() as f64 / converged.len() as f64)
        };

        let summary = BatchSummary {
            converged: converged.len(),
            trials,
            mean_ticks_to_converge,
        };
        info!(
            "📈 Batch complete. converged: {:.2} ({}/{})",
            summary.convergence_rate(),
            summary.converged,
            summary.trials.len()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MazeConfig;
    use crate::swarm::Position;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            drone_count: 1,
            maze: MazeConfig {
                width: 12,
                height: 8,
                obstacle_divisor: 0,
            },
            goal: Some(Position::new(7, 11)),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn lone_drone_on_open_maze_always_converges() {
        // Alone on an open grid the drone jumps straight to the goal, unless
        // it spawned on it, in which case it stalls there and is done too.
        let batch = TrialBatch::new(small_config(), 50).unwrap();
        let summary = batch.run(0, 16).unwrap();
        assert_eq!(summary.trials.len(), 16);
        assert_eq!(summary.converged, 16);
        assert_eq!(summary.convergence_rate(), 1.0);
        assert_eq!(summary.mean_ticks_to_converge, Some(1.0));
        let seeds: Vec<u64> = summary.trials.iter().map(|t| t.seed).collect();
        assert_eq!(seeds, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn trials_are_reproducible_per_seed() {
        let mut cfg = small_config();
        cfg.drone_count = 4;
        cfg.maze.obstacle_divisor = 5;
        let batch = TrialBatch::new(cfg, 200).unwrap();
        assert_eq!(batch.run_seed(9).unwrap(), batch.run_seed(9).unwrap());
    }

    #[test]
    fn invalid_base_config_rejected() {
        let mut cfg = small_config();
        cfg.drone_count = 0;
        assert!(TrialBatch::new(cfg, 10).is_err());
    }

    #[test]
    fn empty_batch() {
        let batch = TrialBatch::new(small_config(), 10).unwrap();
        let summary = batch.run(0, 0).unwrap();
        assert!(summary.trials.is_empty());
        assert_eq!(summary.convergence_rate(), 0.0);
        assert_eq!(summary.mean_ticks_to_converge, None);
    }
}
