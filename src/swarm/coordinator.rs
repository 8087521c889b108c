//! Subgroup Coordinator
//!
//! Stagnation-driven splitting and goal broadcast between subgroups.
//! This is the only code allowed to rewrite another drone's subgroup or goal.

use crate::core::agent::{Drone, DroneId, SubgroupId};
use crate::core::config::CoordinationConfig;
use crate::swarm::grid::Position;
use crate::swarm::Swarm;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Subgroup id → "some member has found the goal".
/// Derived from drone state on demand, never stored between ticks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubgroupRegistry {
    subgroups: BTreeMap<SubgroupId, bool>,
}

impl SubgroupRegistry {
    pub fn from_drones(drones: &[Drone]) -> Self {
        let mut subgroups = BTreeMap::new();
        for drone in drones {
            let informed = subgroups.entry(drone.subgroup()).or_insert(false);
            *informed |= drone.goal_found();
        }
        SubgroupRegistry { subgroups }
    }

    pub fn is_informed(&self, subgroup: SubgroupId) -> bool {
        self.subgroups.get(&subgroup).copied().unwrap_or(false)
    }

    pub fn informed(&self) -> BTreeSet<SubgroupId> {
        self.subgroups
            .iter()
            .filter(|(_, informed)| **informed)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subgroups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subgroups.is_empty()
    }
}

/// What one coordination pass changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationReport {
    /// (drone, new subgroup) in the order the splits happened
    pub splits: Vec<(DroneId, SubgroupId)>,
    pub informed_subgroups: Vec<SubgroupId>,
    /// Informed drone whose goal was broadcast, and that goal
    pub source: Option<(DroneId, Position)>,
    /// Drones whose goal actually changed
    pub reassigned: Vec<DroneId>,
}

#[derive(Clone, Debug)]
pub struct SubgroupCoordinator {
    split_threshold: u32,
}

impl SubgroupCoordinator {
    pub fn new(config: CoordinationConfig) -> Self {
        SubgroupCoordinator {
            split_threshold: config.split_threshold,
        }
    }

    pub fn split_threshold(&self) -> u32 {
        self.split_threshold
    }

    /// Split pass followed by goal propagation.
    pub fn coordinate(&self, swarm: &mut Swarm) -> CoordinationReport {
        let drones = swarm.drones_mut();
        let splits = self.split_stagnant(drones);
        let mut report = self.propagate_goal(drones);
        report.splits = splits;
        report
    }

    /// Every drone at or past the stagnation threshold moves to a fresh
    /// subgroup above the current swarm-wide maximum.  Drones are handled in
    /// roster order, so simultaneous splits get consecutive ids.
    pub fn split_stagnant(&self, drones: &mut [Drone]) -> Vec<(DroneId, SubgroupId)> {
        let mut splits = Vec::new();
        let mut max_id = drones.iter().map(Drone::subgroup).max().unwrap_or(0);

        for drone in drones.iter_mut() {
            if drone.stagnation_count() < self.split_threshold {
                continue;
            }
            max_id += 1;
            drone.assign_subgroup(max_id);
            debug!("🔀 [Coordinator] Drone {} split into subgroup {}", drone.id(), max_id);
            splits.push((drone.id(), max_id));
        }
        splits
    }

    /// Hand the goal of the lowest-id informed drone to every drone whose
    /// subgroup has not found the goal.  No informed subgroup: no change.
    pub fn propagate_goal(&self, drones: &mut [Drone]) -> CoordinationReport {
        let registry = SubgroupRegistry::from_drones(drones);
        let informed = registry.informed();

        let source = drones
            .iter()
            .filter(|d| informed.contains(&d.subgroup()))
            .min_by_key(|d| d.id())
            .map(|d| (d.id(), d.goal()));

        let mut reassigned = Vec::new();
        if let Some((source_id, goal)) = source {
            for drone in drones.iter_mut() {
                if informed.contains(&drone.subgroup()) {
                    continue;
                }
                if drone.goal() != goal {
                    drone.assign_goal(goal);
                    reassigned.push(drone.id());
                }
            }
            if !reassigned.is_empty() {
                info!(
                    "📡 [Coordinator] Drone {} shared goal {} with {} drones",
                    source_id,
                    goal,
                    reassigned.len()
                );
            }
        }

        CoordinationReport {
            splits: Vec::new(),
            informed_subgroups: informed.into_iter().collect(),
            source,
            reassigned,
        }
    }
}
