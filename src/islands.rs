//! Connected-component passes over the label grid: speckle cleanup first,
//! then stable island identification for targeted re-coloring.

use std::collections::{HashMap, VecDeque};

const DIRS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Merge 4-connected same-label components smaller than `min_size` into the
/// neighboring label with the most shared boundary cells (ties to the lowest
/// label index). Components with no neighbor at all are left alone.
///
/// The grid is scanned once in raster order; a relabeled component can
/// become the merge target of a later one, and that cascade is intentional.
pub fn island_cleanup(labels: &mut [u16], width: usize, height: usize, min_size: usize) {
    if min_size <= 1 {
        return;
    }

    let mut visited = vec![false; width * height];
    let mut queue = VecDeque::new();

    for start in 0..labels.len() {
        if visited[start] {
            continue;
        }
        let label = labels[start];

        visited[start] = true;
        queue.push_back(start);
        let mut component = Vec::new();
        let mut neighbor_counts: HashMap<u16, u32> = HashMap::new();

        while let Some(idx) = queue.pop_front() {
            component.push(idx);
            let x = (idx % width) as i32;
            let y = (idx / width) as i32;
            for (dx, dy) in DIRS {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                    continue;
                }
                let nidx = ny as usize * width + nx as usize;
                if labels[nidx] == label {
                    if !visited[nidx] {
                        visited[nidx] = true;
                        queue.push_back(nidx);
                    }
                } else {
                    *neighbor_counts.entry(labels[nidx]).or_insert(0) += 1;
                }
            }
        }

        if component.len() < min_size && !neighbor_counts.is_empty() {
            let mut best_label = u16::MAX;
            let mut best_count = 0u32;
            for (&nl, &count) in &neighbor_counts {
                if count > best_count || (count == best_count && nl < best_label) {
                    best_count = count;
                    best_label = nl;
                }
            }
            for idx in component {
                labels[idx] = best_label;
            }
        }
    }
}

/// Island-id grid produced by [`identify_islands`], plus the mapping from
/// group index to the islands belonging to it.
#[derive(Debug, Clone)]
pub struct IslandMap {
    /// Same dimensions as the label grid; every cell holds a non-zero id.
    pub ids: Vec<u32>,
    pub islands_by_group: HashMap<u16, Vec<u32>>,
    pub count: u32,
}

/// Assign a dense island id (starting at 1) to every 4-connected same-label
/// component, in raster discovery order. Re-running on an unchanged grid
/// yields identical ids.
pub fn identify_islands(labels: &[u16], width: usize, height: usize) -> IslandMap {
    let mut ids = vec![0u32; width * height];
    let mut visited = vec![false; width * height];
    let mut islands_by_group: HashMap<u16, Vec<u32>> = HashMap::new();
    let mut queue = VecDeque::new();
    let mut next_id = 1u32;

    for start in 0..labels.len() {
        if visited[start] {
            continue;
        }
        let label = labels[start];

        visited[start] = true;
        ids[start] = next_id;
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            let x = (idx % width) as i32;
            let y = (idx / width) as i32;
            for (dx, dy) in DIRS {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                    continue;
                }
                let nidx = ny as usize * width + nx as usize;
                if !visited[nidx] && labels[nidx] == label {
                    visited[nidx] = true;
                    ids[nidx] = next_id;
                    queue.push_back(nidx);
                }
            }
        }

        islands_by_group.entry(label).or_default().push(next_id);
        next_id += 1;
    }

    IslandMap {
        ids,
        islands_by_group,
        count: next_id - 1,
    }
}
