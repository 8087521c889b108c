//! MazeSwarm Core - Flocking drone swarm for grid maze exploration
//!
//! Drones steer with cohesion, alignment and separation, fall back on
//! their own path when blocked, and share goal discoveries between
//! stagnation-split subgroups.  Rendering and windowing live outside this
//! crate; it exposes read accessors, an event trace and (with the `python`
//! feature) bindings for an external renderer.

pub mod core;
pub mod swarm;
pub mod utils;

use crate::core::agent::DroneId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Re-export key types
pub use crate::core::agent::{Drone, MoveOutcome, Rgb, SubgroupId, UpdateReport};
pub use crate::core::config::{CoordinationConfig, FlockingConfig, MazeConfig, SimulationConfig};
pub use crate::core::error::{SwarmError, SwarmResult};
pub use swarm::{
    GridEnvironment, Position, RunOutcome, Simulation, SimulationState, StopReason, Swarm,
    SwarmView, TickResult,
};
pub use utils::benchmark::{BatchSummary, TrialBatch, TrialSummary};

/// Something that happened during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    Moved { to: Position },
    Backtracked { to: Position },
    Stalled,
    GoalReached,
    Split { subgroup: SubgroupId },
    GoalShared { from: DroneId, goal: Position },
    Converged,
}

/// A single entry in the swarm's event trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmEvent {
    pub tick: u64,
    /// `None` for swarm-wide events
    pub drone: Option<DroneId>,
    pub kind: EventKind,
}

impl SwarmEvent {
    pub fn new(tick: u64, drone: Option<DroneId>, kind: EventKind) -> Self {
        SwarmEvent { tick, drone, kind }
    }
}

/// A thread-safe, shareable event trace.
///
/// `TraceBuffer` uses `Arc<RwLock>` so a renderer thread can read events
/// while the driver keeps ticking; `fork` is an O(1) shallow handle copy.
#[derive(Clone, Debug, Default)]
pub struct TraceBuffer {
    inner: Arc<RwLock<Vec<SwarmEvent>>>,
}

impl TraceBuffer {
    pub fn new() -> Self {
        TraceBuffer {
            inner: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn add(&self, event: SwarmEvent) {
        let mut data = self.inner.write();
        data.push(event);
    }

    pub fn len(&self) -> usize {
        let data = self.inner.read();
        data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates a shallow copy sharing the same storage
    pub fn fork(&self) -> Self {
        TraceBuffer {
            inner: self.inner.clone(),
        }
    }

    pub fn to_json(&self) -> String {
        let data = self.inner.read();
        serde_json::to_string(&*data).unwrap_or("[]".to_string())
    }

    pub fn last(&self) -> Option<SwarmEvent> {
        let data = self.inner.read();
        data.last().copied()
    }

    pub fn events_for(&self, drone: DroneId) -> Vec<SwarmEvent> {
        let data = self.inner.read();
        data.iter().filter(|e| e.drone == Some(drone)).copied().collect()
    }

    /// Events recorded at or after `tick`, for incremental readers.
    pub fn since(&self, tick: u64) -> Vec<SwarmEvent> {
        let data = self.inner.read();
        data.iter().filter(|e| e.tick >= tick).copied().collect()
    }

    pub fn get_raw(&self) -> Vec<SwarmEvent> {
        let data = self.inner.read();
        data.clone()
    }
}

/// Initialize tracing for the library.
pub fn setup_logging(level: Option<String>) {
    let filter = level.unwrap_or_else(|| "info".to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Python module initialization
#[cfg(feature = "python")]
#[pyo3::pymodule]
fn mazeswarm_core(
    _py: pyo3::Python,
    m: &pyo3::Bound<'_, pyo3::types::PyModule>,
) -> pyo3::PyResult<()> {
    use pyo3::prelude::*;

    m.add_class::<swarm::py_api::PyMazeSwarm>()?;
    m.add_function(wrap_pyfunction!(swarm::py_api::py_setup_logging, m)?)?;
    Ok(())
}
