//! Heuristic agents: role choice, nearest-target search and the greedy move.

use crate::grid::{Cell, Grid, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Heads for the nearest apple.
    Picker,
    /// Heads for the nearest waste.
    Cleaner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Right,
    Down,
    Left,
}

impl Action {
    /// Destination of this move from `pos`, clamped to the grid.
    pub fn apply(self, pos: Position, height: usize, width: usize) -> Position {
        match self {
            Action::Up => Position::new(pos.row.saturating_sub(1), pos.col),
            Action::Right => Position::new(pos.row, (pos.col + 1).min(width - 1)),
            Action::Down => Position::new((pos.row + 1).min(height - 1), pos.col),
            Action::Left => Position::new(pos.row, pos.col.saturating_sub(1)),
        }
    }
}

/// An agent that follows the greedy heuristic. Holds no learning state.
#[derive(Debug, Clone)]
pub struct GreedyAgent {
    pub id: usize,
    pub pos: Position,
    pub role: Role,
    pub reward: f32,
}

impl GreedyAgent {
    pub fn new(id: usize, pos: Position) -> Self {
        Self {
            id,
            pos,
            role: Role::Cleaner,
            reward: 0.0,
        }
    }

    /// Nearest cell of the given kind and its Manhattan distance.
    ///
    /// Scans row-major and keeps the last candidate that is at most as far as
    /// the best so far, so equally near cells resolve to the later one.
    pub fn nearest(&self, grid: &Grid, kind: Cell) -> Option<(Position, usize)> {
        let mut best: Option<(Position, usize)> = None;
        for (pos, cell) in grid.iter() {
            if cell != kind {
                continue;
            }
            let distance = self.pos.manhattan(&pos);
            if best.is_none_or(|(_, min)| distance <= min) {
                best = Some((pos, distance));
            }
        }
        best
    }

    pub fn nearest_apple(&self, grid: &Grid) -> Option<(Position, usize)> {
        self.nearest(grid, Cell::Apple)
    }

    pub fn nearest_waste(&self, grid: &Grid) -> Option<(Position, usize)> {
        self.nearest(grid, Cell::Waste)
    }

    /// Target for the current role, then the greedy move toward it.
    pub fn greedy_action(&self, grid: &Grid) -> Action {
        let target = match self.role {
            Role::Picker => self.nearest_apple(grid),
            Role::Cleaner => self.nearest_waste(grid),
        };
        greedy_action(self.pos, target.map(|(pos, _)| pos))
    }
}

/// Column first when already on the target's row, otherwise row first.
///
/// With no target the agent heads up, as if the target sat above row 0.
pub fn greedy_action(pos: Position, target: Option<Position>) -> Action {
    let Some(target) = target else {
        return Action::Up;
    };
    if pos.row == target.row {
        if target.col < pos.col {
            return Action::Left;
        }
        return Action::Right;
    }
    if target.row < pos.row {
        return Action::Up;
    }
    Action::Down
}

/// How many agents currently hold each role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleCounts {
    pub pickers: usize,
    pub cleaners: usize,
}

impl RoleCounts {
    pub fn tally<'a>(agents: impl IntoIterator<Item = &'a GreedyAgent>) -> Self {
        let mut counts = Self::default();
        for agent in agents {
            match agent.role {
                Role::Picker => counts.pickers += 1,
                Role::Cleaner => counts.cleaners += 1,
            }
        }
        counts
    }
}

/// Reward divided among `holders` agents; undivided when nobody holds the role.
fn per_capita(reward: f32, holders: usize) -> f32 {
    if holders == 0 {
        reward
    } else {
        reward / holders as f32
    }
}

/// Epsilon-greedy role choice on per-capita rewards.
///
/// `draw` is a uniform sample in `[0, 1)`. Above `max(epsilon, floor)` the
/// role with the strictly larger per-capita reward wins, ties going to
/// picking. Otherwise the draw itself splits the exploration band in half to
/// pick a role uniformly.
pub fn choose_role(
    dirt_reward: f32,
    apple_reward: f32,
    counts: RoleCounts,
    epsilon: f64,
    floor: f64,
    draw: f64,
) -> Role {
    let threshold = epsilon.max(floor);
    if draw > threshold {
        let dirt_share = per_capita(dirt_reward, counts.cleaners);
        let apple_share = per_capita(apple_reward, counts.pickers);
        if dirt_share > apple_share {
            Role::Cleaner
        } else {
            Role::Picker
        }
    } else if draw < threshold / 2.0 {
        Role::Picker
    } else {
        Role::Cleaner
    }
}
