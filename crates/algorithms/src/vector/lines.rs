//! Polyline helpers: rasterization and end extension

use crate::mask::Mask;
use geo::Centroid;
use geo_types::{Coord, LineString};
use hgvc_core::raster::{Raster, RasterElement};

/// Cells crossed by a polyline on the grid of `template`.
///
/// Each segment is sampled at a quarter of the cell size; vertices outside
/// the grid are allowed and only the in-grid part is marked.
pub fn rasterize_line<T: RasterElement>(line: &LineString<f64>, template: &Raster<T>) -> Mask {
    let mut mask = template.with_same_meta::<u8>(template.rows(), template.cols());
    let step = template.cell_size() / 4.0;

    let mut mark = |x: f64, y: f64| {
        if let Some((r, c)) = template.geo_to_cell(x, y) {
            mask.data_mut()[(r, c)] = 1;
        }
    };

    if line.0.len() == 1 {
        mark(line.0[0].x, line.0[0].y);
    }

    for seg in line.lines() {
        let (dx, dy) = (seg.end.x - seg.start.x, seg.end.y - seg.start.y);
        let len = (dx * dx + dy * dy).sqrt();
        let n = if step > 0.0 { (len / step).ceil() as usize } else { 0 };
        for i in 0..=n {
            let t = if n == 0 { 0.0 } else { i as f64 / n as f64 };
            mark(seg.start.x + t * dx, seg.start.y + t * dy);
        }
    }

    mask
}

/// Extend both ends of a polyline by `distance`.
///
/// Each end moves away from the line's centroid along the
/// centroid-to-endpoint direction; when an endpoint sits on the centroid the
/// direction of its end segment is used instead.
pub fn extend_line_ends(line: &LineString<f64>, distance: f64) -> LineString<f64> {
    let coords = &line.0;
    if coords.len() < 2 {
        return line.clone();
    }
    let centre = match line.centroid() {
        Some(p) => p.0,
        None => return line.clone(),
    };

    let push_out = |end: Coord<f64>, inner: Coord<f64>| -> Coord<f64> {
        let mut d = end - centre;
        let mut len = d.x.hypot(d.y);
        if len < 1e-12 {
            d = end - inner;
            len = d.x.hypot(d.y);
        }
        if len < 1e-12 {
            return end;
        }
        end + d * (distance / len)
    };

    let n = coords.len();
    let head = push_out(coords[0], coords[1]);
    let tail = push_out(coords[n - 1], coords[n - 2]);

    let mut out = Vec::with_capacity(n + 2);
    out.push(head);
    out.extend_from_slice(coords);
    out.push(tail);
    LineString::new(out)
}
