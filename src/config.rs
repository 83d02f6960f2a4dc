//! Tunable constants for the world, the learner and the training driver.

use std::path::PathBuf;

use crate::error::{CleanupError, Result};

pub const GRID_HEIGHT: usize = 25;
pub const GRID_WIDTH: usize = 18;
pub const NUM_AGENTS: usize = 10;

pub const THRESHOLD_DEPLETION: f64 = 0.4;
pub const THRESHOLD_RESTORATION: f64 = 0.0;
pub const WASTE_SPAWN_PROBABILITY: f64 = 0.5;
pub const APPLE_RESPAWN_PROBABILITY: f64 = 0.05;

pub const APPLE_REWARD: f32 = 1.0;
pub const DIRT_MULTIPLIER: f32 = 10.0;

pub const EPSILON_START: f64 = 1.0;
pub const EPSILON_DECAY: f64 = 0.9999;
pub const EPSILON_FLOOR: f64 = 0.05;
pub const EPISODE_HORIZON: u32 = 1000;

pub const BUFFER_CAPACITY: usize = 8000;
pub const BATCH_SIZE: usize = 32;
pub const LEARNING_RATE: f64 = 1e-4;
pub const GAMMA: f32 = 0.99;

pub const NUM_EPOCHS: usize = 200;
pub const MAX_STEPS_PER_EPOCH: usize = 1000;
pub const NOTABLE_EPISODE_REWARD: u64 = 2000;

/// Geometry, spawn dynamics and role selection of the cleanup world.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub height: usize,
    pub width: usize,
    pub num_agents: usize,

    /// Waste density at or above which nothing spawns.
    pub threshold_depletion: f64,
    /// Waste density at or below which apples spawn at the full rate.
    pub threshold_restoration: f64,
    pub waste_spawn_probability: f64,
    pub apple_respawn_probability: f64,

    pub apple_reward: f32,
    /// Scale applied to the utility difference to get the dirt reward.
    pub dirt_multiplier: f32,

    pub epsilon_start: f64,
    pub epsilon_decay: f64,
    /// Lower bound on the exploration rate used when picking roles.
    pub epsilon_floor: f64,
    /// Step count at which an episode is flagged done.
    pub episode_horizon: u32,

    pub seed: u64,
}

impl CleanupConfig {
    /// Last column (exclusive) of the waste zone.
    pub fn dirt_end(&self) -> usize {
        (self.width as f64 / 3.0).round() as usize
    }

    /// First column of the apple zone.
    pub fn apple_start(&self) -> usize {
        (2.0 * self.width as f64 / 3.0).round() as usize
    }

    pub fn potential_waste_area(&self) -> usize {
        self.dirt_end() * self.height
    }

    pub fn validate(&self) -> Result<()> {
        if self.height == 0 || self.width == 0 {
            return Err(CleanupError::InvalidConfig(format!(
                "grid must be non-empty, got {}x{}",
                self.height, self.width
            )));
        }
        if self.num_agents == 0 {
            return Err(CleanupError::DegenerateRoleAssignment);
        }
        if self.threshold_depletion <= self.threshold_restoration {
            return Err(CleanupError::InvalidConfig(format!(
                "depletion threshold {} must exceed restoration threshold {}",
                self.threshold_depletion, self.threshold_restoration
            )));
        }
        Ok(())
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            height: GRID_HEIGHT,
            width: GRID_WIDTH,
            num_agents: NUM_AGENTS,
            threshold_depletion: THRESHOLD_DEPLETION,
            threshold_restoration: THRESHOLD_RESTORATION,
            waste_spawn_probability: WASTE_SPAWN_PROBABILITY,
            apple_respawn_probability: APPLE_RESPAWN_PROBABILITY,
            apple_reward: APPLE_REWARD,
            dirt_multiplier: DIRT_MULTIPLIER,
            epsilon_start: EPSILON_START,
            epsilon_decay: EPSILON_DECAY,
            epsilon_floor: EPSILON_FLOOR,
            episode_horizon: EPISODE_HORIZON,
            seed: 0x5EED_C1EA_0000_0001,
        }
    }
}

/// Hyperparameters of the centralized utility learner.
#[derive(Debug, Clone)]
pub struct LearnerConfig {
    pub buffer_capacity: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub gamma: f32,
    pub seed: u64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: BUFFER_CAPACITY,
            batch_size: BATCH_SIZE,
            learning_rate: LEARNING_RATE,
            gamma: GAMMA,
            seed: 0x5EED_C1EA_0000_0002,
        }
    }
}

/// Episode loop limits and where the driver writes its logs.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub num_epochs: usize,
    pub max_steps_per_epoch: usize,
    /// Episodes whose cumulative apple reward exceeds this are logged in detail.
    pub notable_reward: u64,
    pub log_path: PathBuf,
    pub notable_log_path: PathBuf,
    /// Directory for per-episode CSV histories; `None` disables them.
    pub csv_dir: Option<PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            num_epochs: NUM_EPOCHS,
            max_steps_per_epoch: MAX_STEPS_PER_EPOCH,
            notable_reward: NOTABLE_EPISODE_REWARD,
            log_path: PathBuf::from("log_greedy.txt"),
            notable_log_path: PathBuf::from("good_log_greedy.txt"),
            csv_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_zones_split_the_grid_in_thirds() {
        let cfg = CleanupConfig::default();
        assert_eq!(cfg.dirt_end(), 6);
        assert_eq!(cfg.apple_start(), 12);
        assert_eq!(cfg.potential_waste_area(), 150);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn small_grid_zones() {
        let cfg = CleanupConfig {
            height: 6,
            width: 5,
            ..CleanupConfig::default()
        };
        assert_eq!(cfg.dirt_end(), 2);
        assert_eq!(cfg.apple_start(), 3);
        assert_eq!(cfg.potential_waste_area(), 12);
    }

    #[test]
    fn empty_roster_is_rejected() {
        let cfg = CleanupConfig {
            num_agents: 0,
            ..CleanupConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(CleanupError::DegenerateRoleAssignment)
        ));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let cfg = CleanupConfig {
            threshold_depletion: 0.0,
            threshold_restoration: 0.2,
            ..CleanupConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(CleanupError::InvalidConfig(_))));
    }
}
