use std::collections::VecDeque;

use rand::{Rng, seq::index};

use crate::{
    error::{CleanupError, Result},
    experience::Transition,
};

/// Fixed-capacity FIFO of transitions. Once full, every push drops the oldest.
#[derive(Debug)]
pub struct ReplayBuffer {
    capacity: usize,
    transitions: VecDeque<Transition>,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            transitions: VecDeque::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.transitions.len() >= self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// Draws `batch_size` distinct transitions uniformly from the whole buffer.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, batch_size: usize) -> Result<Vec<Transition>> {
        let available = self.transitions.len();
        if available < batch_size {
            return Err(CleanupError::InsufficientData {
                requested: batch_size,
                available,
            });
        }
        Ok(index::sample(rng, available, batch_size)
            .into_iter()
            .map(|i| self.transitions[i])
            .collect())
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }
}
