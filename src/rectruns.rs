//! Axis-aligned run-length encoding of the label grid.

use serde::{Deserialize, Serialize};

/// One horizontal run of same-label cells, in raster pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectRun {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub fill: String,
    /// Island id of the run's first cell, when island tagging is requested.
    pub island_id: Option<u32>,
}

/// Scan each row left to right and merge consecutive same-label cells into
/// one rectangle. Cells labeled `skip_index` (the background) are omitted;
/// the emitter renders that label once as a full-canvas rectangle instead.
pub fn encode_runs(
    labels: &[u16],
    width: usize,
    height: usize,
    cell_size: u32,
    skip_index: u16,
    fills: &[String],
    island_ids: Option<&[u32]>,
) -> Vec<RectRun> {
    let mut runs = Vec::new();
    for y in 0..height {
        let mut x = 0;
        while x < width {
            let label = labels[y * width + x];
            if label == skip_index {
                x += 1;
                continue;
            }
            let mut end = x + 1;
            while end < width && labels[y * width + end] == label {
                end += 1;
            }
            runs.push(RectRun {
                x: x as u32 * cell_size,
                y: y as u32 * cell_size,
                width: (end - x) as u32 * cell_size,
                height: cell_size,
                fill: fills[label as usize].clone(),
                island_id: island_ids.map(|ids| ids[y * width + x]),
            });
            x = end;
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fills(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("#00000{}", i)).collect()
    }

    #[test]
    fn test_runs_merge_consecutive_cells() {
        #[rustfmt::skip]
        let grid = vec![
            0, 1, 1, 0,
            1, 1, 1, 1,
        ];
        let runs = encode_runs(&grid, 4, 2, 10, 0, &fills(2), None);
        assert_eq!(runs.len(), 2);
        assert_eq!(
            runs[0],
            RectRun {
                x: 10,
                y: 0,
                width: 20,
                height: 10,
                fill: "#000001".to_string(),
                island_id: None,
            }
        );
        assert_eq!((runs[1].x, runs[1].width), (0, 40));
    }

    #[test]
    fn test_skip_index_suppresses_background_runs() {
        let grid = vec![1, 1, 1, 1];
        let runs = encode_runs(&grid, 4, 1, 2, 1, &fills(2), None);
        assert!(runs.is_empty());
    }

    #[test]
    fn test_island_ids_come_from_first_cell() {
        let grid = vec![0, 1, 1];
        let ids = vec![1, 2, 2];
        let runs = encode_runs(&grid, 3, 1, 1, 0, &fills(2), Some(&ids));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].island_id, Some(2));
    }
}
