use crate::error::{CleanupError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Waste,
    Empty,
    Apple,
}

/// A cell coordinate, always inside the grid it was validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Validates signed coordinates against a `height x width` grid.
    pub fn checked(row: i64, col: i64, height: usize, width: usize) -> Result<Self> {
        let in_bounds = row >= 0 && col >= 0 && (row as usize) < height && (col as usize) < width;
        if !in_bounds {
            return Err(CleanupError::InvalidPosition {
                row,
                col,
                height,
                width,
            });
        }
        Ok(Self::new(row as usize, col as usize))
    }

    pub fn manhattan(&self, other: &Position) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

/// Row-major `height x width` map of cells.
#[derive(Debug, Clone)]
pub struct Grid {
    height: usize,
    width: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            cells: vec![Cell::Empty; height * width],
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, pos: Position) -> Cell {
        self.cells[pos.row * self.width + pos.col]
    }

    /// Only the environment writes cells, so the running counts stay exact.
    pub(crate) fn set(&mut self, pos: Position, cell: Cell) {
        self.cells[pos.row * self.width + pos.col] = cell;
    }

    pub(crate) fn clear(&mut self) {
        self.cells.fill(Cell::Empty);
    }

    /// Cells in row-major scan order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, &cell)| (Position::new(i / self.width, i % self.width), cell))
    }

    /// Counts matching cells by scanning the whole grid.
    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_rejects_out_of_bounds() {
        assert!(Position::checked(0, 0, 3, 4).is_ok());
        assert!(Position::checked(2, 3, 3, 4).is_ok());
        assert!(matches!(
            Position::checked(3, 0, 3, 4),
            Err(CleanupError::InvalidPosition { row: 3, .. })
        ));
        assert!(Position::checked(0, -1, 3, 4).is_err());
        assert!(Position::checked(-1, 2, 3, 4).is_err());
    }

    #[test]
    fn iteration_is_row_major() {
        let grid = Grid::new(2, 3);
        assert_eq!((grid.height(), grid.width()), (2, 3));
        let order: Vec<Position> = grid.iter().map(|(p, _)| p).collect();
        assert_eq!(order[0], Position::new(0, 0));
        assert_eq!(order[2], Position::new(0, 2));
        assert_eq!(order[3], Position::new(1, 0));
        assert_eq!(order.len(), 6);
    }

    #[test]
    fn count_scans_cells() {
        let mut grid = Grid::new(3, 3);
        grid.set(Position::new(1, 1), Cell::Apple);
        grid.set(Position::new(0, 2), Cell::Waste);
        grid.set(Position::new(2, 0), Cell::Waste);
        assert_eq!(grid.count(Cell::Apple), 1);
        assert_eq!(grid.count(Cell::Waste), 2);
        assert_eq!(grid.count(Cell::Empty), 6);
        grid.clear();
        assert_eq!(grid.count(Cell::Empty), 9);
    }
}
