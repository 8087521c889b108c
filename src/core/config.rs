use crate::core::error::{SwarmError, SwarmResult};
use crate::swarm::grid::Position;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Flocking radii (in cells) and separation strength
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockingConfig {
    pub cohesion_radius: f64,
    /// Must not exceed `cohesion_radius`: alignment only looks at cohesion neighbors.
    pub alignment_radius: f64,
    pub separation_radius: f64,
    /// Magnitude the summed separation vector is normalized to
    pub separation_force: f64,
}

impl Default for FlockingConfig {
    fn default() -> Self {
        FlockingConfig {
            cohesion_radius: 60.0,
            alignment_radius: 50.0,
            separation_radius: 30.0,
            separation_force: 1.0,
        }
    }
}

/// Subgroup split/merge settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Ticks without a subgroup change before a drone splits off
    pub split_threshold: u32,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        CoordinationConfig {
            split_threshold: 100,
        }
    }
}

/// Random maze settings used by [`crate::Simulation::from_config`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MazeConfig {
    pub width: usize,
    pub height: usize,
    /// `width * height / obstacle_divisor` obstacles are scattered (0 = none)
    pub obstacle_divisor: usize,
}

impl MazeConfig {
    pub fn obstacle_count(&self) -> usize {
        if self.obstacle_divisor == 0 {
            0
        } else {
            self.width * self.height / self.obstacle_divisor
        }
    }
}

impl Default for MazeConfig {
    fn default() -> Self {
        MazeConfig {
            width: 80,
            height: 50,
            obstacle_divisor: 6,
        }
    }
}

/// Main hyperparameters for a maze swarm run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub flocking: FlockingConfig,
    pub coordination: CoordinationConfig,
    pub maze: MazeConfig,
    pub drone_count: u32,
    /// Defaults to the bottom-right cell of the maze
    pub goal: Option<Position>,
    /// Fixed seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
    /// Caller-side tick bound; the scheduler itself has none
    pub max_ticks: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            flocking: FlockingConfig::default(),
            coordination: CoordinationConfig::default(),
            maze: MazeConfig::default(),
            drone_count: 5,
            goal: None,
            seed: None,
            max_ticks: None,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> SwarmResult<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> SwarmResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Goal cell, falling back to the bottom-right corner of the maze.
    pub fn goal_position(&self) -> Position {
        self.goal.unwrap_or_else(|| {
            Position::new(
                self.maze.height.saturating_sub(1) as i32,
                self.maze.width.saturating_sub(1) as i32,
            )
        })
    }

    /// Full check: swarm behaviour plus the generated maze, drone count and goal.
    pub fn validate(&self) -> SwarmResult<()> {
        self.validate_behaviour()?;
        if self.maze.width == 0 || self.maze.height == 0 {
            return Err(SwarmError::InvalidConfig(format!(
                "maze must have cells, got {}x{}",
                self.maze.height, self.maze.width
            )));
        }
        if self.drone_count == 0 {
            return Err(SwarmError::InvalidConfig(
                "drone_count must be at least 1".to_string(),
            ));
        }
        let goal = self.goal_position();
        if goal.row < 0
            || goal.col < 0
            || goal.row as usize >= self.maze.height
            || goal.col as usize >= self.maze.width
        {
            return Err(SwarmError::InvalidConfig(format!(
                "goal {} lies outside the {}x{} maze",
                goal, self.maze.height, self.maze.width
            )));
        }
        Ok(())
    }

    /// Flocking and coordination settings only, for callers that bring their
    /// own grid and drones.
    pub fn validate_behaviour(&self) -> SwarmResult<()> {
        let f = &self.flocking;
        for (name, radius) in [
            ("cohesion_radius", f.cohesion_radius),
            ("alignment_radius", f.alignment_radius),
            ("separation_radius", f.separation_radius),
        ] {
            if !radius.is_finite() || radius < 0.0 {
                return Err(SwarmError::InvalidConfig(format!(
                    "{} must be finite and non-negative, got {}",
                    name, radius
                )));
            }
        }
        if f.alignment_radius > f.cohesion_radius {
            return Err(SwarmError::InvalidConfig(format!(
                "alignment_radius ({}) exceeds cohesion_radius ({})",
                f.alignment_radius, f.cohesion_radius
            )));
        }
        if !f.separation_force.is_finite() || f.separation_force <= 0.0 {
            return Err(SwarmError::InvalidConfig(format!(
                "separation_force must be positive, got {}",
                f.separation_force
            )));
        }
        if self.coordination.split_threshold == 0 {
            return Err(SwarmError::InvalidConfig(
                "split_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = SimulationConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.goal_position(), Position::new(49, 79));
        assert_eq!(cfg.maze.obstacle_count(), 80 * 50 / 6);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = SimulationConfig::from_json_str(
            r#"{ "drone_count": 3, "seed": 42, "flocking": { "separation_force": 2.0 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.drone_count, 3);
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.flocking.separation_force, 2.0);
        assert_eq!(cfg.flocking.cohesion_radius, 60.0);
        assert_eq!(cfg.coordination.split_threshold, 100);
    }

    #[test]
    fn json_roundtrip_preserves_goal() {
        let cfg = SimulationConfig {
            goal: Some(Position::new(3, 4)),
            ..SimulationConfig::default()
        };
        let back = SimulationConfig::from_json_str(&cfg.to_json()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn alignment_wider_than_cohesion_rejected() {
        let mut cfg = SimulationConfig::default();
        cfg.flocking.alignment_radius = 70.0;
        assert!(matches!(cfg.validate(), Err(SwarmError::InvalidConfig(_))));
    }

    #[test]
    fn bad_values_rejected() {
        let mut cfg = SimulationConfig::default();
        cfg.coordination.split_threshold = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = SimulationConfig::default();
        cfg.flocking.separation_force = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = SimulationConfig::default();
        cfg.goal = Some(Position::new(50, 0));
        assert!(cfg.validate().is_err());

        let mut cfg = SimulationConfig::default();
        cfg.drone_count = 0;
        assert!(cfg.validate().is_err());
        assert!(cfg.validate_behaviour().is_ok());

        assert!(matches!(
            SimulationConfig::from_json_str("{ not json"),
            Err(SwarmError::Json(_))
        ));
    }
}
