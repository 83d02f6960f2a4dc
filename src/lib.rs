//! Cleanup gridworld coupled to a centralized utility learner.
//!
//! Agents in [`environment::CleanupEnv`] choose between cleaning waste and
//! picking apples. Cleaning is paid with a reward derived from the utility
//! estimate of [`agent::CentralizedAgent`], which in turn learns from the
//! apples the world produces.

pub mod agent;
pub mod config;
pub mod device;
pub mod environment;
pub mod error;
pub mod experience;
pub mod greedy;
pub mod grid;
pub mod mlp;
pub mod replay;
pub mod report;
pub mod spawn;
pub mod state;
pub mod trainer;

pub use agent::{CentralizedAgent, UtilityEstimator};
pub use config::{CleanupConfig, DriverConfig, LearnerConfig};
pub use environment::{CleanupEnv, Phase, StepInfo, StepOutcome};
pub use error::{CleanupError, Result};
pub use state::AggregateState;
pub use trainer::Trainer;
