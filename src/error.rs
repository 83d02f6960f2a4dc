use polars::error::PolarsError;
use thiserror::Error;

use crate::environment::Phase;

/// Everything that can go wrong inside the simulation or the learner.
///
/// All of these are contract violations except [`CleanupError::InsufficientData`],
/// which callers avoid by checking the buffer size before sampling.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("replay buffer holds {available} transitions, {requested} requested")]
    InsufficientData { requested: usize, available: usize },

    #[error("position ({row}, {col}) is outside the {height}x{width} grid")]
    InvalidPosition {
        row: i64,
        col: i64,
        height: usize,
        width: usize,
    },

    #[error("no agent holds a role, per-capita rewards are undefined")]
    DegenerateRoleAssignment,

    #[error("cannot step the environment while it is {0:?}")]
    EpisodeNotReady(Phase),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Tensor(#[from] candle_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type Result<T, E = CleanupError> = std::result::Result<T, E>;
