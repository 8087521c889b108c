//! Swarm Engine
//!
//! Roster of drones exploring a grid maze, the flocking model they steer
//! with, the subgroup coordinator that splits and informs them, and the
//! tick scheduler that drives it all.

pub mod coordinator;
pub mod flocking;
pub mod grid;
pub mod scheduler;
#[cfg(feature = "python")]
pub mod py_api;

use crate::core::agent::{Drone, DroneId, Rgb, SubgroupId};
use crate::core::error::{SwarmError, SwarmResult};
use rand::Rng;
use tracing::{info, trace};

pub use coordinator::{CoordinationReport, SubgroupCoordinator, SubgroupRegistry};
pub use flocking::{FlockingModel, Steering, Vector2};
pub use grid::{Cell, GridEnvironment, Position};
pub use scheduler::{RunOutcome, Simulation, SimulationState, StopReason, TickResult};

/// Read-only view of every drone except the one being updated.
///
/// Drones earlier in the roster have already moved this tick; later ones
/// still show their previous position.
#[derive(Clone, Copy, Debug)]
pub struct SwarmView<'a> {
    before: &'a [Drone],
    after: &'a [Drone],
}

impl<'a> SwarmView<'a> {
    pub fn empty() -> Self {
        SwarmView {
            before: &[],
            after: &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Drone> + 'a {
        let (before, after) = (self.before, self.after);
        before.iter().chain(after.iter())
    }

    pub fn positions(&self) -> Vec<Position> {
        self.iter().map(Drone::position).collect()
    }

    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All drones, kept in ascending id order.
#[derive(Clone, Debug, Default)]
pub struct Swarm {
    drones: Vec<Drone>,
}

impl Swarm {
    pub fn new(mut drones: Vec<Drone>) -> Self {
        drones.sort_by_key(Drone::id);
        Swarm { drones }
    }

    /// Spawn `count` drones (ids `1..=count`) on random open cells.
    ///
    /// Blocked draws are rejected by [`Drone::new`] and redrawn. A grid with
    /// no open cell at all is an error rather than an endless retry.
    pub fn spawn<R: Rng + ?Sized>(
        count: u32,
        goal: Position,
        grid: &GridEnvironment,
        rng: &mut R,
    ) -> SwarmResult<Self> {
        if grid.open_cell_count() == 0 {
            return Err(SwarmError::NoOpenCells);
        }

        let mut drones = Vec::with_capacity(count as usize);
        for id in 1..=count {
            let drone = loop {
                let start = Position::new(
                    rng.gen_range(0..grid.height()) as i32,
                    rng.gen_range(0..grid.width()) as i32,
                );
                match Drone::new(id, start, goal, grid) {
                    Ok(drone) => break drone,
                    Err(SwarmError::InvalidStart { .. }) => {
                        trace!("🎲 [Swarm] start {} rejected for drone {}, redrawing", start, id);
                    }
                    Err(e) => return Err(e),
                }
            };
            drones.push(drone.with_color(Rgb::random(rng)));
        }

        info!("🌐 [Swarm] Spawned {} drones heading for {}", count, goal);
        Ok(Swarm { drones })
    }

    pub fn drones(&self) -> &[Drone] {
        &self.drones
    }

    pub(crate) fn drones_mut(&mut self) -> &mut [Drone] {
        &mut self.drones
    }

    pub fn get(&self, id: DroneId) -> Option<&Drone> {
        self.drones.iter().find(|d| d.id() == id)
    }

    pub fn len(&self) -> usize {
        self.drones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drones.is_empty()
    }

    /// Visit drones in id order, each with a view of everyone else as they
    /// stand at that moment.
    pub fn update_each<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Drone, SwarmView<'_>),
    {
        for i in 0..self.drones.len() {
            let (before, rest) = self.drones.split_at_mut(i);
            let (current, after) = rest.split_at_mut(1);
            let view = SwarmView {
                before: &*before,
                after: &*after,
            };
            f(&mut current[0], view);
        }
    }

    pub fn max_subgroup(&self) -> Option<SubgroupId> {
        self.drones.iter().map(Drone::subgroup).max()
    }

    pub fn any_goal_found(&self) -> bool {
        self.drones.iter().any(Drone::goal_found)
    }

    pub fn all_goal_found(&self) -> bool {
        self.drones.iter().all(Drone::goal_found)
    }

    pub fn registry(&self) -> SubgroupRegistry {
        SubgroupRegistry::from_drones(&self.drones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn spawn_lands_on_open_cells() {
        let mut rng = StdRng::seed_from_u64(3);
        let goal = Position::new(9, 9);
        let grid = GridEnvironment::random(10, 10, 60, &[goal], &mut rng);
        let swarm = Swarm::spawn(20, goal, &grid, &mut rng).unwrap();
        assert_eq!(swarm.len(), 20);
        for (i, d) in swarm.drones().iter().enumerate() {
            assert_eq!(d.id(), i as u32 + 1);
            assert!(grid.is_open(d.position()));
            assert_eq!(d.subgroup(), 0);
            assert_eq!(d.goal(), goal);
        }
    }

    #[test]
    fn spawn_on_fully_blocked_grid_fails() {
        let mut rng = StdRng::seed_from_u64(3);
        let grid = GridEnvironment::from_obstacles(&[vec![true, true]]).unwrap();
        let err = Swarm::spawn(1, Position::new(0, 0), &grid, &mut rng).unwrap_err();
        assert!(matches!(err, SwarmError::NoOpenCells));
    }

    #[test]
    fn seeded_spawn_is_reproducible() {
        let grid = GridEnvironment::open(30, 30);
        let goal = Position::new(29, 29);
        let a = Swarm::spawn(5, goal, &grid, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = Swarm::spawn(5, goal, &grid, &mut StdRng::seed_from_u64(99)).unwrap();
        let pa: Vec<_> = a.drones().iter().map(|d| (d.position(), d.color())).collect();
        let pb: Vec<_> = b.drones().iter().map(|d| (d.position(), d.color())).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn view_excludes_the_current_drone() {
        let grid = GridEnvironment::open(5, 5);
        let goal = Position::new(4, 4);
        let drones = (1..=3)
            .map(|i| Drone::new(i, Position::new(0, i as i32), goal, &grid).unwrap())
            .collect();
        let mut swarm = Swarm::new(drones);
        let mut seen = Vec::new();
        swarm.update_each(|drone, view| {
            assert_eq!(view.len(), 2);
            assert!(view.iter().all(|p| p.id() != drone.id()));
            seen.push(drone.id());
        });
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn roster_sorted_by_id() {
        let grid = GridEnvironment::open(2, 2);
        let goal = Position::new(1, 1);
        let swarm = Swarm::new(vec![
            Drone::new(5, Position::new(0, 0), goal, &grid).unwrap(),
            Drone::new(2, Position::new(0, 1), goal, &grid).unwrap(),
        ]);
        let ids: Vec<_> = swarm.drones().iter().map(Drone::id).collect();
        assert_eq!(ids, vec![2, 5]);
        assert!(swarm.get(5).is_some());
        assert!(swarm.get(3).is_none());
        assert_eq!(swarm.max_subgroup(), Some(0));
    }
}
