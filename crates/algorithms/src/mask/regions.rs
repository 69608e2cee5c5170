//! Connected-component labelling of masks

use super::Mask;
use hgvc_core::raster::{Connectivity, Raster};

/// One 4-connected region of a mask
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Label in the label raster, starting at 1
    pub label: i32,
    pub cells: usize,
    /// Planimetric area in map units
    pub area: f64,
}

/// Label the 4-connected regions of a mask.
///
/// Labels are assigned in row-major order of each region's first cell;
/// unselected cells are 0 in the label raster.
pub fn label_regions(mask: &Mask) -> (Raster<i32>, Vec<Region>) {
    let (rows, cols) = mask.shape();
    let cell_area = mask.cell_area();
    let mut labels = mask.with_same_meta::<i32>(rows, cols);
    labels.set_nodata(Some(0));
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for r0 in 0..rows {
        for c0 in 0..cols {
            if mask.data()[(r0, c0)] == 0 || labels.data()[(r0, c0)] != 0 {
                continue;
            }

            let label = regions.len() as i32 + 1;
            let mut cells = 0usize;
            stack.push((r0, c0));
            labels.data_mut()[(r0, c0)] = label;

            while let Some((r, c)) = stack.pop() {
                cells += 1;
                for (nr, nc, _) in Connectivity::Four.neighbors(r, c, rows, cols) {
                    if mask.data()[(nr, nc)] != 0 && labels.data()[(nr, nc)] == 0 {
                        labels.data_mut()[(nr, nc)] = label;
                        stack.push((nr, nc));
                    }
                }
            }

            regions.push(Region {
                label,
                cells,
                area: cells as f64 * cell_area,
            });
        }
    }

    (labels, regions)
}
