use crate::state::AggregateState;

/// One observed step of the world as the learner stores it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub reward: f32,
    pub state: AggregateState,
    pub next_state: AggregateState,
}
