//! Error types for the maze swarm.

use crate::swarm::grid::Position;
use thiserror::Error;

pub type SwarmResult<T> = Result<T, SwarmError>;

#[derive(Debug, Error)]
pub enum SwarmError {
    /// A drone was placed on a blocked or out-of-bounds cell.
    #[error("drone {id} cannot start at {position}: cell is blocked or out of bounds")]
    InvalidStart { id: u32, position: Position },

    #[error("grid has no open cell to spawn a drone on")]
    NoOpenCells,

    #[error("goal {0} is blocked or out of bounds")]
    GoalBlocked(Position),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("malformed grid: {0}")]
    MalformedGrid(String),

    #[error("config io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
}
