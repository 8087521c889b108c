use super::coordinator::{CoordinationReport, SubgroupCoordinator};
use super::flocking::FlockingModel;
use super::grid::{GridEnvironment, Position};
use super::Swarm;
use crate::core::agent::{MoveOutcome, UpdateReport};
use crate::core::config::SimulationConfig;
use crate::core::error::{SwarmError, SwarmResult};
use crate::{EventKind, SwarmEvent, TraceBuffer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationState {
    Running,
    /// Every drone has found the goal. Terminal.
    Converged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickResult {
    pub tick: u64,
    pub any_goal_found: bool,
    pub all_goal_found: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Converged,
    TickLimit,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Total ticks executed by the simulation so far
    pub ticks: u64,
    pub state: SimulationState,
    pub reason: StopReason,
}

/// Tick scheduler for one maze swarm.
///
/// Each tick: every drone updates in id order (later drones see earlier
/// drones' moves), then the subgroup coordinator runs, then convergence is
/// checked.
pub struct Simulation {
    grid: GridEnvironment,
    swarm: Swarm,
    flocking: FlockingModel,
    coordinator: SubgroupCoordinator,
    goal: Position,
    state: SimulationState,
    tick: u64,
    trace: Option<TraceBuffer>,
}

impl Simulation {
    /// Assemble a simulation from externally supplied pieces.
    pub fn new(
        grid: GridEnvironment,
        goal: Position,
        swarm: Swarm,
        config: &SimulationConfig,
    ) -> SwarmResult<Self> {
        // The grid and goal come from the caller; `config.maze` and
        // `config.goal` only describe generated mazes.
        config.validate_behaviour()?;
        if !grid.is_open(goal) {
            return Err(SwarmError::GoalBlocked(goal));
        }
        if swarm.is_empty() {
            return Err(SwarmError::InvalidConfig("swarm has no drones".to_string()));
        }

        Ok(Simulation {
            grid,
            swarm,
            flocking: FlockingModel::new(config.flocking.clone()),
            coordinator: SubgroupCoordinator::new(config.coordination.clone()),
            goal,
            state: SimulationState::Running,
            tick: 0,
            trace: Some(TraceBuffer::new()),
        })
    }

    /// Random maze and random drone starts, seeded from `config.seed` when set.
    pub fn from_config(config: &SimulationConfig) -> SwarmResult<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::from_config_with_rng(config, &mut rng)
    }

    pub fn from_config_with_rng<R: Rng + ?Sized>(
        config: &SimulationConfig,
        rng: &mut R,
    ) -> SwarmResult<Self> {
        config.validate()?;
        let goal = config.goal_position();
        let maze = &config.maze;
        let grid = GridEnvironment::random(maze.height, maze.width, maze.obstacle_count(), &[goal], rng);
        let swarm = Swarm::spawn(config.drone_count, goal, &grid, rng)?;

        info!(
            "🗺️ [Scheduler] {}x{} maze, {} open cells, goal {}",
            grid.height(),
            grid.width(),
            grid.open_cell_count(),
            goal
        );
        Self::new(grid, goal, swarm, config)
    }

    /// Stop recording events (batch trials don't need them).
    pub fn without_trace(mut self) -> Self {
        self.trace = None;
        self
    }

    pub fn grid(&self) -> &GridEnvironment {
        &self.grid
    }

    pub fn swarm(&self) -> &Swarm {
        &self.swarm
    }

    pub fn goal(&self) -> Position {
        self.goal
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn trace(&self) -> Option<&TraceBuffer> {
        self.trace.as_ref()
    }

    fn result(&self) -> TickResult {
        TickResult {
            tick: self.tick,
            any_goal_found: self.swarm.any_goal_found(),
            all_goal_found: self.swarm.all_goal_found(),
        }
    }

    /// Advance one tick.  A converged simulation is left untouched.
    pub fn run_tick(&mut self) -> TickResult {
        if self.state == SimulationState::Converged {
            return self.result();
        }
        self.tick += 1;
        let tick = self.tick;

        // 1. Drone updates in id order
        let flocking = &self.flocking;
        let grid = &self.grid;
        let mut reports: Vec<(u32, UpdateReport)> = Vec::with_capacity(self.swarm.len());
        self.swarm.update_each(|drone, view| {
            let report = drone.update(&view, flocking, grid);
            reports.push((drone.id(), report));
        });

        // 2. Subgroup coordination
        let coordination = self.coordinator.coordinate(&mut self.swarm);

        // 3. Termination
        let result = self.result();
        if result.all_goal_found {
            self.state = SimulationState::Converged;
            info!(
                "✅ [Scheduler] All {} drones found the goal after {} ticks",
                self.swarm.len(),
                tick
            );
        } else if tick % 100 == 0 {
            debug!(
                "⏱️ [Scheduler] Tick {}: {} subgroups, any goal found: {}",
                tick,
                self.swarm.registry().len(),
                result.any_goal_found
            );
        }

        if let Some(trace) = &self.trace {
            record_tick(trace, tick, &reports, &coordination, self.state);
        }

        result
    }

    /// Tick until convergence, `max_ticks` total ticks, or `stop` is raised.
    /// `stop` is only checked between ticks.
    pub fn run(&mut self, max_ticks: Option<u64>, stop: &AtomicBool) -> RunOutcome {
        let started = Instant::now();
        let reason = loop {
            if self.state == SimulationState::Converged {
                break StopReason::Converged;
            }
            if stop.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            if max_ticks.is_some_and(|limit| self.tick >= limit) {
                break StopReason::TickLimit;
            }
            self.run_tick();
        };

        info!(
            "🏁 [Scheduler] Stopped after {} ticks ({:?}) in {:?}",
            self.tick,
            reason,
            started.elapsed()
        );
        RunOutcome {
            ticks: self.tick,
            state: self.state,
            reason,
        }
    }
}

fn record_tick(
    trace: &TraceBuffer,
    tick: u64,
    reports: &[(u32, UpdateReport)],
    coordination: &CoordinationReport,
    state: SimulationState,
) {
    for (drone, report) in reports {
        let kind = match report.outcome {
            MoveOutcome::Moved(to) => EventKind::Moved { to },
            MoveOutcome::Backtracked(to) => EventKind::Backtracked { to },
            MoveOutcome::Stalled => EventKind::Stalled,
        };
        trace.add(SwarmEvent::new(tick, Some(*drone), kind));
        if report.reached_goal {
            trace.add(SwarmEvent::new(tick, Some(*drone), EventKind::GoalReached));
        }
    }
    for (drone, subgroup) in &coordination.splits {
        trace.add(SwarmEvent::new(tick, Some(*drone), EventKind::Split { subgroup: *subgroup }));
    }
    if let Some((source, goal)) = coordination.source {
        for drone in &coordination.reassigned {
            trace.add(SwarmEvent::new(tick, Some(*drone), EventKind::GoalShared { from: source, goal }));
        }
    }
    if state == SimulationState::Converged {
        trace.add(SwarmEvent::new(tick, None, EventKind::Converged));
    }
}
