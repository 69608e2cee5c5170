//! Bounded flood extent from a channel
//!
//! Accumulated cost-distance from the stream cells across a decimal-slope
//! surface, using Dijkstra's algorithm with 8-connectivity. Crossing between
//! two cells costs their mean slope times the step length in map units, so
//! the accumulated value approximates height above the channel. Cells whose
//! accumulated cost would exceed the flood depth are never reached.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hgvc_core::raster::{Connectivity, Raster};
use hgvc_core::{Error, Result};
use ndarray::Array2;

/// Priority-queue entry, ordered for a min-heap
#[derive(Debug, Clone, PartialEq)]
struct State {
    cost: f64,
    row: usize,
    col: usize,
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}

/// Flood outward from `sources` up to `max_cost`.
///
/// # Arguments
/// * `sources` - Stream cells as `(row, col)`; they get height 0
/// * `cost` - Decimal slope. NaN or negative cells are barriers; a source
///   with no slope value borrows its neighbour's cost
/// * `max_cost` - Flood depth; accumulated costs above it are unreached
///
/// # Returns
/// Heights above the channel for reached cells, NaN elsewhere.
pub fn flood_extent(
    sources: &[(usize, usize)],
    cost: &Raster<f64>,
    max_cost: f64,
) -> Result<Raster<f64>> {
    let (rows, cols) = cost.shape();
    let cs = cost.cell_size();

    if !(max_cost >= 0.0) {
        return Err(Error::InvalidParameter {
            name: "max_cost",
            value: max_cost.to_string(),
            reason: "flood depth must be a non-negative number".into(),
        });
    }

    let mut dist = vec![f64::INFINITY; rows * cols];
    let mut heap = BinaryHeap::new();

    for &(r, c) in sources {
        if r < rows && c < cols {
            dist[r * cols + c] = 0.0;
            heap.push(State { cost: 0.0, row: r, col: c });
        }
    }

    if heap.is_empty() {
        return Err(Error::Algorithm("No source cells inside the cost surface".into()));
    }

    while let Some(State { cost: acc, row, col }) = heap.pop() {
        if acc > dist[row * cols + col] {
            continue;
        }

        let here = cost.value(row, col).filter(|v| *v >= 0.0);

        for (nr, nc, step) in Connectivity::Eight.neighbors(row, col, rows, cols) {
            let there = match cost.value(nr, nc) {
                Some(v) if v >= 0.0 => v,
                _ => continue,
            };

            let mean = match here {
                Some(h) => (h + there) / 2.0,
                None => there,
            };
            let next = acc + mean * step * cs;

            if next <= max_cost && next < dist[nr * cols + nc] {
                dist[nr * cols + nc] = next;
                heap.push(State { cost: next, row: nr, col: nc });
            }
        }
    }

    for d in &mut dist {
        if d.is_infinite() {
            *d = f64::NAN;
        }
    }

    let mut output = cost.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), dist)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
