use candle_core::{Device, Tensor};
use candle_nn::{Optimizer, loss};
use rand::{SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::{
    config::LearnerConfig,
    error::{CleanupError, Result},
    experience::Transition,
    mlp::UtilityNetwork,
    replay::ReplayBuffer,
    state::AggregateState,
};

/// Read-only access to a utility estimate.
///
/// The world only ever asks for estimates; training stays with whoever owns
/// the learner.
pub trait UtilityEstimator {
    fn estimate(&self, state: AggregateState) -> Result<f32>;
}

/// Centralized learner for the long-run utility of an aggregate world state.
///
/// Trained online with one-step TD targets from its replay buffer. The same
/// parameters produce the prediction and the bootstrap target.
pub struct CentralizedAgent {
    u_network: UtilityNetwork,
    memory: ReplayBuffer,
    config: LearnerConfig,
    rng: StdRng,
    train_steps: usize,
}

impl CentralizedAgent {
    pub fn new(config: LearnerConfig, device: &Device) -> Result<Self> {
        if config.batch_size == 0 || config.batch_size > config.buffer_capacity {
            return Err(CleanupError::InvalidConfig(format!(
                "batch size {} must be in 1..={}",
                config.batch_size, config.buffer_capacity
            )));
        }
        Ok(Self {
            u_network: UtilityNetwork::new(config.learning_rate, device)?,
            memory: ReplayBuffer::new(config.buffer_capacity),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            train_steps: 0,
        })
    }

    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    pub fn network(&self) -> &UtilityNetwork {
        &self.u_network
    }

    pub fn train_steps(&self) -> usize {
        self.train_steps
    }

    /// Stores the transition and, once a full batch is buffered, trains on a
    /// freshly sampled batch before returning. Returns the loss if it trained.
    pub fn observe(
        &mut self,
        reward: f32,
        state: AggregateState,
        next_state: AggregateState,
    ) -> Result<Option<f32>> {
        self.memory.add(Transition {
            reward,
            state,
            next_state,
        });

        if self.memory.len() < self.config.batch_size {
            return Ok(None);
        }
        let batch = self.memory.sample(&mut self.rng, self.config.batch_size)?;
        self.train(&batch).map(Some)
    }

    /// One semi-gradient TD(0) step: regress `U(s)` onto `r + gamma * U(s')`.
    pub fn train(&mut self, batch: &[Transition]) -> Result<f32> {
        if batch.is_empty() {
            return Err(CleanupError::InsufficientData {
                requested: 1,
                available: 0,
            });
        }
        let n = batch.len();
        let mut states = Vec::with_capacity(n);
        let mut next_states = Vec::with_capacity(n);
        let mut rewards = Vec::with_capacity(n);
        for transition in batch {
            states.push(transition.state);
            next_states.push(transition.next_state);
            rewards.push(transition.reward);
        }

        let state_tensor = self.u_network.input_tensor(&states)?;
        let next_state_tensor = self.u_network.input_tensor(&next_states)?;
        let reward_tensor = Tensor::from_vec(rewards, (n, 1), self.u_network.device())?;

        let u_values = self.u_network.output(&state_tensor)?;
        // The bootstrap term is a constant: no gradient through U(s').
        let next_u_values = self.u_network.output(&next_state_tensor)?.detach();
        let u_targets = (reward_tensor + (next_u_values * f64::from(self.config.gamma))?)?;
        let u_loss = loss::mse(&u_values, &u_targets)?;

        let grads = u_loss.backward()?;
        self.u_network.optimiser.step(&grads)?;
        self.train_steps += 1;

        let loss_value = u_loss.to_scalar::<f32>()?;
        debug!(step = self.train_steps, loss = loss_value, "trained utility network");
        Ok(loss_value)
    }
}

impl UtilityEstimator for CentralizedAgent {
    fn estimate(&self, state: AggregateState) -> Result<f32> {
        self.u_network.evaluate(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learner(batch_size: usize) -> CentralizedAgent {
        let config = LearnerConfig {
            batch_size,
            seed: 7,
            ..LearnerConfig::default()
        };
        CentralizedAgent::new(config, &Device::Cpu).unwrap()
    }

    #[test]
    fn observe_trains_only_once_a_batch_is_buffered() {
        let mut agent = learner(4);
        let s = AggregateState::new(1, 3);
        let s2 = AggregateState::new(1, 2);
        for _ in 0..3 {
            assert!(agent.observe(0.0, s, s2).unwrap().is_none());
        }
        assert_eq!(agent.train_steps(), 0);
        let loss = agent.observe(1.0, s, s2).unwrap();
        assert!(loss.is_some_and(f32::is_finite));
        assert_eq!(agent.train_steps(), 1);
        assert_eq!(agent.memory().len(), 4);
    }

    #[test]
    fn zero_reward_fixed_point_moves_toward_discounted_self() {
        let mut agent = learner(32);
        let state = AggregateState::new(1, 1);
        let before = agent.estimate(state).unwrap();
        let batch = vec![
            Transition {
                reward: 0.0,
                state,
                next_state: state,
            };
            32
        ];

        let loss = agent.train(&batch).unwrap();
        assert!(loss.is_finite());
        let expected_loss = (0.01 * before).powi(2);
        assert!((loss - expected_loss).abs() <= 1e-4 + expected_loss * 1e-2);

        let after = agent.estimate(state).unwrap();
        let target = 0.99 * before;
        // Adam's first step moves each parameter by about the learning rate.
        assert!((after - before) * (target - before) >= 0.0);
        assert!((after - before).abs() < 0.1);
    }

    #[test]
    fn bootstrap_target_carries_no_gradient() {
        let mut agent = learner(32);
        let lr = LearnerConfig::default().learning_rate as f32;
        // No apples in s, so dU(s)/dW0[:, 0] is zero. Only a gradient flowing
        // through U(s') (which has 3 apples) could move that column.
        let state = AggregateState::new(0, 5);
        let next_state = AggregateState::new(3, 0);
        let batch = vec![
            Transition {
                reward: 1.0,
                state,
                next_state,
            };
            32
        ];

        let network = agent.network();
        let target = 1.0 + 0.99 * network.evaluate(next_state).unwrap();
        let prediction = network
            .output(&network.input_tensor(&[state]).unwrap())
            .unwrap();
        let target = Tensor::from_vec(vec![target], (1, 1), network.device()).unwrap();
        let semi_loss = loss::mse(&prediction, &target).unwrap();
        let grads = semi_loss.backward().unwrap();
        let w0 = network.layers[0].weight();
        let expected_grad = grads.get(w0).unwrap().to_vec2::<f32>().unwrap();
        let before = w0.to_vec2::<f32>().unwrap();

        agent.train(&batch).unwrap();
        let after = agent.network().layers[0].weight().to_vec2::<f32>().unwrap();

        for ((row_before, row_after), row_grad) in before.iter().zip(&after).zip(&expected_grad) {
            assert_eq!(row_grad[0], 0.0);
            assert_eq!(row_before[0], row_after[0]);
            // First Adam step: every parameter moves by about -lr * sign(grad).
            if row_grad[1].abs() > 1e-6 {
                let step = row_after[1] - row_before[1];
                assert!(
                    (step + lr * row_grad[1].signum()).abs() < 1e-5,
                    "step {step} for grad {}",
                    row_grad[1]
                );
            }
        }
    }

    #[test]
    fn estimate_does_not_change_parameters() {
        let agent = learner(32);
        let state = AggregateState::new(4, 9);
        let a = agent.estimate(state).unwrap();
        let b = agent.estimate(state.with_one_less_dirt()).unwrap();
        assert_eq!(a, agent.estimate(state).unwrap());
        assert_eq!(b, agent.estimate(state.with_one_less_dirt()).unwrap());
    }

    #[test]
    fn empty_batch_is_rejected() {
        let mut agent = learner(32);
        assert!(matches!(
            agent.train(&[]),
            Err(CleanupError::InsufficientData { .. })
        ));
    }

    #[test]
    fn oversized_batch_is_rejected_at_construction() {
        let config = LearnerConfig {
            buffer_capacity: 8,
            batch_size: 16,
            ..LearnerConfig::default()
        };
        assert!(matches!(
            CentralizedAgent::new(config, &Device::Cpu),
            Err(CleanupError::InvalidConfig(_))
        ));
    }
}
