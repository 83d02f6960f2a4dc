use crate::config::CleanupConfig;

/// Per-step spawn chances, derived from how polluted the river is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnProbabilities {
    pub apple: f64,
    pub waste: f64,
}

impl SpawnProbabilities {
    /// The configured base rates, before the current density is applied.
    pub fn defaults(config: &CleanupConfig) -> Self {
        Self {
            apple: config.apple_respawn_probability,
            waste: config.waste_spawn_probability,
        }
    }

    /// Spawn chances for a river holding `num_dirt` waste cells.
    ///
    /// At or above the depletion density nothing spawns at all. Below it waste
    /// spawns at its base rate while the apple rate falls linearly from the
    /// base rate at the restoration density to zero at depletion.
    pub fn compute(num_dirt: usize, config: &CleanupConfig) -> Self {
        let area = config.potential_waste_area();
        let waste_density = if area > 0 {
            num_dirt as f64 / area as f64
        } else {
            0.0
        };

        if waste_density >= config.threshold_depletion {
            return Self {
                apple: 0.0,
                waste: 0.0,
            };
        }

        let apple = if waste_density <= config.threshold_restoration {
            config.apple_respawn_probability
        } else {
            (1.0 - (waste_density - config.threshold_restoration)
                / (config.threshold_depletion - config.threshold_restoration))
                * config.apple_respawn_probability
        };
        Self {
            apple,
            waste: config.waste_spawn_probability,
        }
    }
}
