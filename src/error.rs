use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceError {
    #[error("map has no rows")]
    EmptyMap,

    #[error("map row {row} has width {found}, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("unknown tile {tile:?} at ({row}, {column})")]
    UnknownTile {
        tile: char,
        row: usize,
        column: usize,
    },

    #[error("instance has no agents")]
    NoAgents,

    #[error("agent {agent} has id {id}, agents must be numbered in order")]
    AgentIdMismatch { agent: usize, id: usize },

    #[error("agent {agent} starts outside the map at {position:?}")]
    OutOfBounds {
        agent: usize,
        position: (usize, usize),
    },

    #[error("agent {agent} starts on a blocked tile at {position:?}")]
    Blocked {
        agent: usize,
        position: (usize, usize),
    },

    #[error("agents {other} and {agent} both start at {position:?}")]
    SharedStart {
        agent: usize,
        other: usize,
        position: (usize, usize),
    },
}
