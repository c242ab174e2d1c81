//! Boundary tracing: turn every region of one label into closed polygon
//! loops on the grid lattice.
//!
//! Directed unit edges are emitted wherever a labeled cell borders anything
//! else (or the grid edge), oriented so the region interior stays on a
//! consistent side. A simply-connected region traces to a single loop; a
//! region with holes yields one loop per boundary, and even-odd fill makes
//! the holes render correctly.

use std::collections::HashMap;

type Vertex = (i32, i32);

/// Defensive bound: abandon a trace that fails to close within this many
/// vertices instead of spinning on malformed input.
const MAX_LOOP_VERTICES: usize = 100_000;

/// Trace all boundary loops of the regions holding `label`. Returned loops
/// are in lattice units, without the duplicated closing vertex, so a plain
/// `w x h` rectangle yields one loop of `2*(w+h)` vertices.
pub fn trace_contours(
    labels: &[u16],
    width: usize,
    height: usize,
    label: u16,
) -> Vec<Vec<[i32; 2]>> {
    let is_label = |x: i32, y: i32| -> bool {
        if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
            return false;
        }
        labels[y as usize * width + x as usize] == label
    };

    // Directed boundary edges in raster order, with a per-vertex index of
    // outgoing edges. Insertion order makes loop emission deterministic.
    let mut edges: Vec<(Vertex, Vertex)> = Vec::new();
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    let mut add_edge = |from: Vertex, to: Vertex| {
        outgoing.entry(from).or_default().push(edges.len());
        edges.push((from, to));
    };

    for y in 0..height as i32 {
        for x in 0..width as i32 {
            if !is_label(x, y) {
                continue;
            }
            if !is_label(x, y - 1) {
                add_edge((x, y), (x + 1, y));
            }
            if !is_label(x + 1, y) {
                add_edge((x + 1, y), (x + 1, y + 1));
            }
            if !is_label(x, y + 1) {
                add_edge((x + 1, y + 1), (x, y + 1));
            }
            if !is_label(x - 1, y) {
                add_edge((x, y + 1), (x, y));
            }
        }
    }

    let mut used = vec![false; edges.len()];
    let mut loops = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        let (start, mut current) = edges[first];
        let mut prev = start;
        used[first] = true;
        let mut points = vec![[start.0, start.1], [current.0, current.1]];

        while current != start {
            let Some(candidates) = outgoing.get(&current) else {
                break;
            };
            // Sharpest available left turn relative to the incoming
            // direction; straight beats right, and remaining ties fall to
            // the lowest edge index.
            let in_dx = current.0 - prev.0;
            let in_dy = current.1 - prev.1;
            let mut best = None;
            let mut best_score = i32::MAX;
            for &cand in candidates {
                if used[cand] {
                    continue;
                }
                let to = edges[cand].1;
                let out_dx = to.0 - current.0;
                let out_dy = to.1 - current.1;
                let cross = in_dx * out_dy - in_dy * out_dx;
                let dot = in_dx * out_dx + in_dy * out_dy;
                let turn_class = if cross > 0 {
                    0
                } else if cross == 0 {
                    1
                } else {
                    2
                };
                let score = turn_class * 1000 + (1000 - dot);
                if score < best_score {
                    best_score = score;
                    best = Some(cand);
                }
            }
            let Some(next) = best else {
                break;
            };
            used[next] = true;
            let to = edges[next].1;
            points.push([to.0, to.1]);
            prev = current;
            current = to;
            if points.len() > MAX_LOOP_VERTICES {
                break;
            }
        }

        // Unclosed partials are dropped, not propagated.
        if current == start && points.len() >= 5 {
            points.pop();
            loops.push(points);
        }
    }

    loops
}

/// Serialize loops to SVG path commands, scaled from lattice units to raster
/// pixels.
pub fn contours_to_path_data(loops: &[Vec<[i32; 2]>], cell_size: u32) -> String {
    let mut parts = Vec::new();
    for points in loops {
        if points.is_empty() {
            continue;
        }
        let scale = cell_size as f32;
        parts.push(format!(
            "M {:.2} {:.2}",
            points[0][0] as f32 * scale,
            points[0][1] as f32 * scale
        ));
        for p in &points[1..] {
            parts.push(format!(
                "L {:.2} {:.2}",
                p[0] as f32 * scale,
                p[1] as f32 * scale
            ));
        }
        parts.push("Z".to_string());
    }
    parts.join(" ")
}
