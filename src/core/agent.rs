use crate::core::error::{SwarmError, SwarmResult};
use crate::swarm::flocking::{FlockingModel, Steering};
use crate::swarm::grid::{GridEnvironment, Position};
use crate::swarm::SwarmView;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, trace};

pub type DroneId = u32;
pub type SubgroupId = u32;

/// Display color; the simulation never looks at it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Rgb(rng.gen(), rng.gen(), rng.gen())
    }
}

/// What a drone did with its turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    Moved(Position),
    Backtracked(Position),
    /// Proposed cell rejected and nothing left on the path to fall back to
    Stalled,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateReport {
    pub outcome: MoveOutcome,
    pub steering: Steering,
    /// True only on the tick the goal flag flipped
    pub reached_goal: bool,
}

/// A maze-exploring drone.
///
/// `Drone` owns its own trail: `visited` for membership tests and `path`
/// as a backtracking stack whose top is always the current position.
/// Cross-agent fields (`subgroup`, `goal`) are only rewritten by the
/// subgroup coordinator.
#[derive(Clone, Debug)]
pub struct Drone {
    id: DroneId,
    position: Position,
    visited: HashSet<Position>,
    path: Vec<Position>,
    goal: Position,
    goal_found: bool,
    stagnation_count: u32,
    subgroup: SubgroupId,
    color: Rgb,
}

impl Drone {
    /// Place a new drone at `start` in subgroup 0.
    ///
    /// Rejects a start cell that is blocked or out of bounds; callers that
    /// pick random starts retry (see [`crate::Swarm::spawn`]).
    pub fn new(
        id: DroneId,
        start: Position,
        goal: Position,
        grid: &GridEnvironment,
    ) -> SwarmResult<Self> {
        if !grid.is_open(start) {
            return Err(SwarmError::InvalidStart {
                id,
                position: start,
            });
        }
        let mut visited = HashSet::new();
        visited.insert(start);
        Ok(Drone {
            id,
            position: start,
            visited,
            path: vec![start],
            goal,
            goal_found: false,
            stagnation_count: 0,
            subgroup: 0,
            color: Rgb(255, 255, 255),
        })
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn id(&self) -> DroneId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn goal(&self) -> Position {
        self.goal
    }

    pub fn goal_found(&self) -> bool {
        self.goal_found
    }

    pub fn subgroup(&self) -> SubgroupId {
        self.subgroup
    }

    pub fn stagnation_count(&self) -> u32 {
        self.stagnation_count
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Backtracking stack, most recent last.
    pub fn path(&self) -> &[Position] {
        &self.path
    }

    pub fn has_visited(&self, pos: Position) -> bool {
        self.visited.contains(&pos)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// One tick of movement: steer, commit or backtrack, check the goal,
    /// count the tick.
    pub fn update(
        &mut self,
        peers: &SwarmView<'_>,
        model: &FlockingModel,
        grid: &GridEnvironment,
    ) -> UpdateReport {
        let peer_positions = peers.positions();
        let steering = model.steer(self.position, self.goal, &peer_positions);
        let proposed = steering.target;

        let outcome = if grid.is_open(proposed) && !self.visited.contains(&proposed) {
            self.position = proposed;
            self.visited.insert(proposed);
            self.path.push(proposed);
            debug!("🛸 [Drone {}] moved to {}", self.id, proposed);
            MoveOutcome::Moved(proposed)
        } else if self.path.len() > 1 {
            self.path.pop();
            // len > 1 before the pop, so a top remains
            if let Some(&previous) = self.path.last() {
                self.position = previous;
            }
            debug!("↩️ [Drone {}] backtracked to {}", self.id, self.position);
            MoveOutcome::Backtracked(self.position)
        } else {
            trace!("⏸️ [Drone {}] stalled at {}", self.id, self.position);
            MoveOutcome::Stalled
        };

        let mut reached_goal = false;
        if self.position == self.goal && !self.goal_found {
            self.goal_found = true;
            reached_goal = true;
            debug!("🎯 [Drone {}] reached goal {}", self.id, self.goal);
        }

        self.stagnation_count += 1;

        UpdateReport {
            outcome,
            steering,
            reached_goal,
        }
    }

    pub(crate) fn assign_subgroup(&mut self, subgroup: SubgroupId) {
        self.subgroup = subgroup;
        self.stagnation_count = 0;
    }

    pub(crate) fn assign_goal(&mut self, goal: Position) {
        self.goal = goal;
    }

    #[cfg(test)]
    pub(crate) fn mark_goal_found(&mut self) {
        self.goal_found = true;
    }

    #[cfg(test)]
    pub(crate) fn set_stagnation(&mut self, ticks: u32) {
        self.stagnation_count = ticks;
    }
}
