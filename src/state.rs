/// Whole-world summary the learner sees: how many apples and how much dirt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateState {
    pub apples: f32,
    pub dirt: f32,
}

impl AggregateState {
    pub const DIM: usize = 2;

    pub fn new(apples: usize, dirt: usize) -> Self {
        Self {
            apples: apples as f32,
            dirt: dirt as f32,
        }
    }

    /// The same state with one unit of dirt removed. May go negative.
    pub fn with_one_less_dirt(self) -> Self {
        Self {
            dirt: self.dirt - 1.0,
            ..self
        }
    }

    pub fn to_array(self) -> [f32; Self::DIM] {
        [self.apples, self.dirt]
    }
}
