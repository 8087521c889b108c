use super::scheduler::Simulation;
use crate::core::config::SimulationConfig;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

fn to_py_err(e: crate::SwarmError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Handle for an external (pygame-style) renderer.
#[pyclass]
pub struct PyMazeSwarm {
    engine: Simulation,
}

#[pymethods]
impl PyMazeSwarm {
    #[new]
    #[pyo3(signature = (config_json=None))]
    pub fn new(config_json: Option<String>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => SimulationConfig::from_json_str(&json).map_err(to_py_err)?,
            None => SimulationConfig::default(),
        };
        let engine = Simulation::from_config(&config).map_err(to_py_err)?;
        Ok(Self { engine })
    }

    /// Advance one tick, returning (any_goal_found, all_goal_found)
    pub fn tick(&mut self) -> (bool, bool) {
        let r = self.engine.run_tick();
        (r.any_goal_found, r.all_goal_found)
    }

    pub fn positions(&self) -> Vec<(i32, i32)> {
        self.engine
            .swarm()
            .drones()
            .iter()
            .map(|d| (d.position().row, d.position().col))
            .collect()
    }

    pub fn colors(&self) -> Vec<(u8, u8, u8)> {
        self.engine
            .swarm()
            .drones()
            .iter()
            .map(|d| {
                let c = d.color();
                (c.0, c.1, c.2)
            })
            .collect()
    }

    pub fn subgroups(&self) -> Vec<u32> {
        self.engine.swarm().drones().iter().map(|d| d.subgroup()).collect()
    }

    /// Row-major obstacle map, `True` = blocked
    pub fn obstacles(&self) -> Vec<Vec<bool>> {
        self.engine.grid().to_obstacles()
    }

    pub fn goal(&self) -> (i32, i32) {
        let g = self.engine.goal();
        (g.row, g.col)
    }

    /// Events recorded since `tick` as a JSON array
    pub fn events_since(&self, tick: u64) -> String {
        self.engine
            .trace()
            .map(|t| serde_json::to_string(&t.since(tick)).unwrap_or_else(|_| "[]".to_string()))
            .unwrap_or_else(|| "[]".to_string())
    }

    /// Macro-state snapshot for dashboards
    pub fn state(&self) -> PyResult<PyObject> {
        Python::with_gil(|py| {
            let dict = PyDict::new_bound(py);
            let swarm = self.engine.swarm();

            dict.set_item("tick", self.engine.tick_count())?;
            dict.set_item("converged", self.engine.state() == super::SimulationState::Converged)?;
            dict.set_item("drones", swarm.len())?;
            dict.set_item(
                "informed_drones",
                swarm.drones().iter().filter(|d| d.goal_found()).count(),
            )?;
            dict.set_item("subgroups", swarm.registry().len())?;

            Ok(dict.into_py(py))
        })
    }
}

/// Initialize tracing from Python.
#[pyfunction]
#[pyo3(name = "setup_logging", signature = (level=None))]
pub fn py_setup_logging(level: Option<String>) {
    crate::setup_logging(level);
}
