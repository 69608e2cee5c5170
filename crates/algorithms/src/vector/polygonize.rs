//! Mask to polygon conversion by cell-edge tracing
//!
//! Every boundary side of a selected cell becomes a directed edge with the
//! cell on its left (in map orientation), so exterior rings come out
//! counter-clockwise and holes clockwise. Where two selected cells touch only
//! at a corner the tracer turns left, keeping them in separate rings, which
//! matches 4-connected region semantics.

use std::collections::HashMap;

use crate::mask::{label_regions, Mask};
use geo::Area;
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use hgvc_core::Result;

type Vertex = (i64, i64);

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    to: Vertex,
    cell: (usize, usize),
}

impl Edge {
    fn dir(&self) -> (i64, i64) {
        (self.to.0 - self.from.0, self.to.1 - self.from.1)
    }
}

/// Edges around the selected cells; vertices are `(col, row)` grid corners
fn boundary_edges(mask: &Mask) -> Vec<Edge> {
    let (rows, cols) = mask.shape();
    let on = |r: i64, c: i64| -> bool {
        r >= 0
            && c >= 0
            && (r as usize) < rows
            && (c as usize) < cols
            && mask.data()[(r as usize, c as usize)] != 0
    };

    let mut edges = Vec::new();
    for ((row, col), &m) in mask.data().indexed_iter() {
        if m == 0 {
            continue;
        }
        let (r, c) = (row as i64, col as i64);
        let cell = (row, col);
        let (tl, tr, br, bl) = ((c, r), (c + 1, r), (c + 1, r + 1), (c, r + 1));
        if !on(r + 1, c) {
            edges.push(Edge { from: bl, to: br, cell });
        }
        if !on(r, c + 1) {
            edges.push(Edge { from: br, to: tr, cell });
        }
        if !on(r - 1, c) {
            edges.push(Edge { from: tr, to: tl, cell });
        }
        if !on(r, c - 1) {
            edges.push(Edge { from: tl, to: bl, cell });
        }
    }
    edges
}

/// Left-turn measure in map orientation (rows grow southward)
fn turn(prev: (i64, i64), next: (i64, i64)) -> i64 {
    prev.1 * next.0 - prev.0 * next.1
}

/// Trace closed rings; each is returned with the cell left of its first edge
fn trace_rings(edges: &[Edge]) -> Vec<(Vec<Vertex>, (usize, usize))> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        let mut ring = Vec::new();
        let mut current = first;
        loop {
            used[current] = true;
            let e = edges[current];
            ring.push(e.from);

            let candidates = match outgoing.get(&e.to) {
                Some(c) => c,
                None => break,
            };
            let next = candidates
                .iter()
                .copied()
                .max_by_key(|&i| turn(e.dir(), edges[i].dir()));
            match next {
                Some(n) if n == first || used[n] => break,
                Some(n) => current = n,
                None => break,
            }
        }
        rings.push((simplify_collinear(ring), edges[first].cell));
    }
    rings
}

/// Drop vertices where the ring runs straight on
fn simplify_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    if n < 4 {
        return ring;
    }
    (0..n)
        .filter(|&i| {
            let a = ring[(i + n - 1) % n];
            let b = ring[i];
            let c = ring[(i + 1) % n];
            turn((b.0 - a.0, b.1 - a.1), (c.0 - b.0, c.1 - b.1)) != 0
        })
        .map(|i| ring[i])
        .collect()
}

/// Convert the selected cells of a mask to polygons in map coordinates.
///
/// One polygon per exterior ring, with the holes of its 4-connected region.
/// An empty mask gives an empty multipolygon.
pub fn polygonize(mask: &Mask) -> Result<MultiPolygon<f64>> {
    let gt = *mask.transform();
    let (labels, regions) = label_regions(mask);
    let edges = boundary_edges(mask);

    let to_map = |ring: &[Vertex]| -> LineString<f64> {
        let mut coords: Vec<Coord<f64>> = ring
            .iter()
            .map(|&(c, r)| {
                let (x, y) = gt.fractional_to_geo(c as f64, r as f64);
                Coord { x, y }
            })
            .collect();
        if let Some(&start) = coords.first() {
            coords.push(start);
        }
        LineString::new(coords)
    };

    let mut exteriors: Vec<Vec<(f64, LineString<f64>)>> = vec![Vec::new(); regions.len()];
    let mut holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); regions.len()];

    for (ring, cell) in trace_rings(&edges) {
        let line = to_map(&ring);
        let signed = Polygon::new(line.clone(), vec![]).signed_area();
        let region = (labels.data()[cell] - 1) as usize;
        if signed > 0.0 {
            exteriors[region].push((signed, line));
        } else {
            holes[region].push(line);
        }
    }

    let mut polygons = Vec::new();
    for (mut rings, region_holes) in exteriors.into_iter().zip(holes) {
        rings.sort_by(|a, b| b.0.total_cmp(&a.0));
        let mut rings = rings.into_iter();
        if let Some((_, outer)) = rings.next() {
            polygons.push(Polygon::new(outer, region_holes));
        }
        polygons.extend(rings.map(|(_, ring)| Polygon::new(ring, vec![])));
    }

    Ok(MultiPolygon(polygons))
}
