use std::collections::HashSet;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, trace};

use crate::{
    agent::UtilityEstimator,
    config::CleanupConfig,
    error::{CleanupError, Result},
    greedy::{GreedyAgent, RoleCounts, choose_role},
    grid::{Cell, Grid, Position},
    spawn::SpawnProbabilities,
    state::AggregateState,
};

/// Lifecycle of the environment. `reset` always leads back to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Ready,
    Running,
    Done,
}

/// Snapshot of the world handed back by `reset` and every `step`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    pub apples: usize,
    pub dirt: usize,
    /// Agents in the waste-zone columns, the middle columns and the
    /// apple-zone columns.
    pub bands: [usize; 3],
    pub pickers: usize,
    pub cleaners: usize,
    /// Agent positions indexed by agent id.
    pub positions: Vec<Position>,
}

impl StepInfo {
    pub fn aggregate(&self) -> AggregateState {
        AggregateState::new(self.apples, self.dirt)
    }

    /// Apples per unit of dirt, or the raw apple count on a clean river.
    pub fn apple_dirt_ratio(&self) -> f64 {
        if self.dirt == 0 {
            self.apples as f64
        } else {
            self.apples as f64 / self.dirt as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Reward each agent collected this step, indexed by agent id.
    pub rewards: Vec<f32>,
    /// Apples eaten since the last reset.
    pub total_apple_consumed: u64,
    /// Apple reward collected by all agents this step.
    pub step_apple_reward: f32,
    pub done: bool,
    pub wastes_cleared: usize,
    pub apples_spawned: usize,
    pub waste_spawned: bool,
    pub info: StepInfo,
}

/// The cleanup gridworld.
///
/// Waste is striped across the left third of the map, apples grow in the
/// right third only while the river is clean enough, and greedy agents pick
/// between cleaning and harvesting every step by comparing the apple reward
/// against a dirt reward derived from a utility estimate.
pub struct CleanupEnv {
    config: CleanupConfig,
    grid: Grid,
    agents: Vec<GreedyAgent>,
    phase: Phase,
    timestamp: u32,

    num_dirt: usize,
    num_apples: usize,
    spawn: SpawnProbabilities,

    dirt_reward: f32,
    total_apple_consumed: u64,
    step_apple_consumed: f32,
    epsilon: f64,

    rng: StdRng,
}

impl CleanupEnv {
    pub fn new(config: CleanupConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            grid: Grid::new(config.height, config.width),
            agents: Vec::with_capacity(config.num_agents),
            phase: Phase::Uninitialized,
            timestamp: 0,
            num_dirt: 0,
            num_apples: 0,
            spawn: SpawnProbabilities::defaults(&config),
            dirt_reward: 0.0,
            total_apple_consumed: 0,
            step_apple_consumed: 0.0,
            epsilon: config.epsilon_start,
            rng: StdRng::seed_from_u64(config.seed),
            config,
        })
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn agents(&self) -> &[GreedyAgent] {
        &self.agents
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn num_dirt(&self) -> usize {
        self.num_dirt
    }

    pub fn num_apples(&self) -> usize {
        self.num_apples
    }

    pub fn spawn_probabilities(&self) -> SpawnProbabilities {
        self.spawn
    }

    pub fn dirt_reward(&self) -> f32 {
        self.dirt_reward
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn aggregate(&self) -> AggregateState {
        AggregateState::new(self.num_apples, self.num_dirt)
    }

    /// Starts a new episode.
    ///
    /// Epsilon keeps decaying across episodes and is left alone here.
    pub fn reset(&mut self, estimator: &dyn UtilityEstimator) -> Result<StepInfo> {
        self.timestamp = 0;
        self.grid.clear();
        self.num_apples = 0;
        self.num_dirt = 0;
        let dirt_end = self.config.dirt_end();
        for row in (0..self.config.height).step_by(2) {
            for col in 0..dirt_end {
                self.grid.set(Position::new(row, col), Cell::Waste);
                self.num_dirt += 1;
            }
        }

        self.spawn = SpawnProbabilities::compute(self.num_dirt, &self.config);
        self.setup_agents()?;

        self.total_apple_consumed = 0;
        self.step_apple_consumed = 0.0;
        self.dirt_reward = self.shaped_dirt_reward(estimator)?;
        self.phase = Phase::Ready;

        debug!(
            dirt = self.num_dirt,
            dirt_reward = self.dirt_reward,
            "environment reset"
        );
        Ok(self.info())
    }

    fn setup_agents(&mut self) -> Result<()> {
        let (height, width) = (self.config.height, self.config.width);
        let dirt_end = self.config.dirt_end();
        self.agents.clear();
        for id in 0..self.config.num_agents {
            let mut row = self.rng.random_range(0..height);
            let mut col = self.rng.random_range(0..width);
            // Even rows of the waste zone start out dirty.
            while row % 2 == 0 && col < dirt_end {
                row = self.rng.random_range(0..height);
                col = self.rng.random_range(0..width);
            }
            let spawn_point = Position::checked(row as i64, col as i64, height, width)?;
            self.agents.push(GreedyAgent::new(id, spawn_point));
        }
        Ok(())
    }

    /// Moves agent `id` to `(row, col)`, e.g. to set up a scenario after `reset`.
    pub fn place_agent(&mut self, id: usize, row: i64, col: i64) -> Result<()> {
        let pos = Position::checked(row, col, self.config.height, self.config.width)?;
        let agent = self.agents.get_mut(id).ok_or_else(|| {
            CleanupError::InvalidConfig(format!("no agent with id {id}"))
        })?;
        agent.pos = pos;
        Ok(())
    }

    /// Utility gained by removing one more unit of dirt, scaled.
    fn shaped_dirt_reward(&self, estimator: &dyn UtilityEstimator) -> Result<f32> {
        let now = self.aggregate();
        let u_t = estimator.estimate(now)?;
        let u_tp = estimator.estimate(now.with_one_less_dirt())?;
        Ok((u_tp - u_t) * self.config.dirt_multiplier)
    }

    fn role_counts(&self) -> Result<RoleCounts> {
        let counts = RoleCounts::tally(&self.agents);
        if counts.pickers == 0 && counts.cleaners == 0 {
            return Err(CleanupError::DegenerateRoleAssignment);
        }
        Ok(counts)
    }

    /// Advances the world by one step.
    ///
    /// Agents act one at a time in id order. Before each agent picks a role
    /// the dirt reward is re-queried from the live counters, so later agents
    /// see waste that earlier agents already removed this step but never a
    /// retrained estimate.
    pub fn step(&mut self, estimator: &dyn UtilityEstimator) -> Result<StepOutcome> {
        if matches!(self.phase, Phase::Uninitialized | Phase::Done) {
            return Err(CleanupError::EpisodeNotReady(self.phase));
        }
        self.phase = Phase::Running;
        self.timestamp += 1;
        self.step_apple_consumed = 0.0;

        let (height, width) = (self.config.height, self.config.width);
        let mut occupied: HashSet<Position> = HashSet::with_capacity(self.agents.len());
        let mut rewards = vec![0.0; self.agents.len()];
        let mut wastes_cleared = 0;

        for idx in 0..self.agents.len() {
            self.dirt_reward = self.shaped_dirt_reward(estimator)?;
            let counts = self.role_counts()?;
            let draw = self.rng.random::<f64>();
            let role = choose_role(
                self.dirt_reward,
                self.config.apple_reward,
                counts,
                self.epsilon,
                self.config.epsilon_floor,
                draw,
            );
            self.agents[idx].role = role;

            let action = self.agents[idx].greedy_action(&self.grid);
            let current = self.agents[idx].pos;
            let destination = action.apply(current, height, width);
            // A cell claimed earlier this step blocks the move.
            let resolved = if occupied.contains(&destination) {
                current
            } else {
                destination
            };
            self.agents[idx].pos = resolved;
            occupied.insert(resolved);

            if self.grid.get(resolved) == Cell::Waste {
                wastes_cleared += 1;
            }
            let reward = self.collect(resolved);
            rewards[idx] = reward;
            self.agents[idx].reward += reward;
            trace!(agent = idx, ?role, ?action, ?resolved, reward, "agent moved");
        }

        self.spawn = SpawnProbabilities::compute(self.num_dirt, &self.config);
        let (apples_spawned, waste_spawned) = self.spawn_apples_and_waste(&occupied);
        self.epsilon *= self.config.epsilon_decay;
        self.dirt_reward = self.shaped_dirt_reward(estimator)?;

        let done = self.timestamp >= self.config.episode_horizon;
        if done {
            self.phase = Phase::Done;
        }
        debug!(
            step = self.timestamp,
            apples = self.num_apples,
            dirt = self.num_dirt,
            dirt_reward = self.dirt_reward,
            "environment stepped"
        );

        Ok(StepOutcome {
            rewards,
            total_apple_consumed: self.total_apple_consumed,
            step_apple_reward: self.step_apple_consumed,
            done,
            wastes_cleared,
            apples_spawned,
            waste_spawned,
            info: self.info(),
        })
    }

    /// Consumes whatever lies at `pos` and returns its reward.
    fn collect(&mut self, pos: Position) -> f32 {
        match self.grid.get(pos) {
            Cell::Waste => {
                self.grid.set(pos, Cell::Empty);
                self.num_dirt -= 1;
                self.dirt_reward
            }
            Cell::Apple => {
                self.grid.set(pos, Cell::Empty);
                self.num_apples -= 1;
                self.total_apple_consumed += 1;
                self.step_apple_consumed += self.config.apple_reward;
                self.config.apple_reward
            }
            Cell::Empty => 0.0,
        }
    }

    /// Grows apples anywhere in the apple zone and at most one waste cell.
    fn spawn_apples_and_waste(&mut self, occupied: &HashSet<Position>) -> (usize, bool) {
        let (height, width) = (self.config.height, self.config.width);
        let mut apples_spawned = 0;
        for row in 0..height {
            for col in self.config.apple_start()..width {
                let pos = Position::new(row, col);
                let roll = self.rng.random::<f64>();
                if roll < self.spawn.apple
                    && !occupied.contains(&pos)
                    && self.grid.get(pos) == Cell::Empty
                {
                    self.grid.set(pos, Cell::Apple);
                    self.num_apples += 1;
                    apples_spawned += 1;
                }
            }
        }

        if self.num_dirt >= self.config.potential_waste_area() {
            return (apples_spawned, false);
        }
        let dirt_end = self.config.dirt_end();
        let mut dirt_spawn = Position::new(
            self.rng.random_range(0..height),
            self.rng.random_range(0..dirt_end),
        );
        while self.grid.get(dirt_spawn) == Cell::Waste {
            dirt_spawn = Position::new(
                self.rng.random_range(0..height),
                self.rng.random_range(0..dirt_end),
            );
        }
        let roll = self.rng.random::<f64>();
        if roll < self.spawn.waste && !occupied.contains(&dirt_spawn) {
            self.grid.set(dirt_spawn, Cell::Waste);
            self.num_dirt += 1;
            return (apples_spawned, true);
        }
        (apples_spawned, false)
    }

    pub fn info(&self) -> StepInfo {
        let dirt_end = self.config.dirt_end();
        let apple_start = self.config.apple_start();
        let mut bands = [0; 3];
        for agent in &self.agents {
            let band = if agent.pos.col < dirt_end {
                0
            } else if agent.pos.col >= apple_start {
                2
            } else {
                1
            };
            bands[band] += 1;
        }
        let counts = RoleCounts::tally(&self.agents);
        StepInfo {
            apples: self.num_apples,
            dirt: self.num_dirt,
            bands,
            pickers: counts.pickers,
            cleaners: counts.cleaners,
            positions: self.agents.iter().map(|a| a.pos).collect(),
        }
    }
}
