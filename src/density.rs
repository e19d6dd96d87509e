//! Coarse grid of summed plant biomass, rebuilt every tick.

use crate::world::{Vec2, World};

#[derive(Debug, Clone, PartialEq)]
pub struct DensityField {
    cell_size: f64,
    n_cols: usize,
    n_rows: usize,
    cells: Vec<f64>,
}

impl DensityField {
    pub fn new(world: &World, cell_size: f64) -> Self {
        let cell_size = cell_size.max(1.0);
        let n_cols = ((world.width / cell_size).ceil() as usize).max(1);
        let n_rows = ((world.height / cell_size).ceil() as usize).max(1);
        Self {
            cell_size,
            n_cols,
            n_rows,
            cells: vec![0.0; n_cols * n_rows],
        }
    }

    /// Replace the contents with the biomass of the given `(position, biomass)` pairs.
    pub fn rebuild<I>(&mut self, plants: I)
    where
        I: IntoIterator<Item = (Vec2, f64)>,
    {
        self.cells.fill(0.0);
        for (pos, biomass) in plants {
            let (col, row) = self.cell_of(pos);
            self.cells[row * self.n_cols + col] += biomass;
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(0.0);
    }

    /// Grid coordinate `(column, row)` of the cell containing `pos`.
    pub fn cell_of(&self, pos: Vec2) -> (usize, usize) {
        let col = ((pos.x / self.cell_size).floor().max(0.0) as usize).min(self.n_cols - 1);
        let row = ((pos.y / self.cell_size).floor().max(0.0) as usize).min(self.n_rows - 1);
        (col, row)
    }

    /// Summed biomass of the cell containing `pos` (kg).
    pub fn at(&self, pos: Vec2) -> f64 {
        let (col, row) = self.cell_of(pos);
        self.cells[row * self.n_cols + col]
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<f64> {
        if col < self.n_cols && row < self.n_rows {
            Some(self.cells[row * self.n_cols + col])
        } else {
            None
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.n_cols, self.n_rows)
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }
}
