//! Cell connectivity for region growing and distance propagation

use std::f64::consts::SQRT_2;

const ROOK: [(isize, isize, f64); 4] = [(-1, 0, 1.0), (0, -1, 1.0), (0, 1, 1.0), (1, 0, 1.0)];

const QUEEN: [(isize, isize, f64); 8] = [
    (-1, -1, SQRT_2),
    (-1, 0, 1.0),
    (-1, 1, SQRT_2),
    (0, -1, 1.0),
    (0, 1, 1.0),
    (1, -1, SQRT_2),
    (1, 0, 1.0),
    (1, 1, SQRT_2),
];

/// Which neighbours of a cell are adjacent to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Edge-sharing neighbours only
    Four,
    /// Edge and corner neighbours
    Eight,
}

impl Connectivity {
    /// `(d_row, d_col, step_length_in_cells)` for every neighbour
    pub fn offsets(&self) -> &'static [(isize, isize, f64)] {
        match self {
            Connectivity::Four => &ROOK,
            Connectivity::Eight => &QUEEN,
        }
    }

    /// In-bounds neighbours of `(row, col)` in a `rows x cols` grid
    pub fn neighbors(
        &self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> impl Iterator<Item = (usize, usize, f64)> {
        self.offsets().iter().filter_map(move |&(dr, dc, dist)| {
            let nr = row as isize + dr;
            let nc = col as isize + dc;
            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                None
            } else {
                Some((nr as usize, nc as usize, dist))
            }
        })
    }
}
