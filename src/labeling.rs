//! Grid classification: downsample the raster into a coarse grid and label
//! each cell with its nearest group representative.

use crate::color::{delta_e, rgb_to_oklab};
use crate::error::PipelineError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Representative color of one non-empty group, as passed to classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRep {
    pub id: String,
    pub hex: String,
    pub lab: [f32; 3],
}

/// One group index per grid cell, `ceil(width/cell) x ceil(height/cell)`.
#[derive(Debug, Clone)]
pub struct LabelGrid {
    pub labels: Vec<u16>,
    pub width: usize,
    pub height: usize,
    /// Cell count per representative index, from the classification pass.
    pub area_by_group: Vec<u64>,
}

/// Label every grid cell with the index of the nearest representative (by
/// OKLab distance) of the pixel closest to the cell's center. Ties go to the
/// lowest group index.
pub fn classify_grid(
    pixels: &[u8],
    width: u32,
    height: u32,
    cell_size: u32,
    reps: &[GroupRep],
) -> Result<LabelGrid, PipelineError> {
    if reps.is_empty() {
        return Err(PipelineError::NoGroupRepresentatives);
    }
    if width == 0 || height == 0 {
        return Err(PipelineError::ZeroAreaImage { width, height });
    }
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(PipelineError::BufferSizeMismatch {
            expected,
            actual: pixels.len(),
        });
    }
    if cell_size < 1 {
        return Err(PipelineError::ParameterOutOfRange {
            name: "cell_size",
            min: 1,
            value: cell_size,
        });
    }

    let grid_w = width.div_ceil(cell_size) as usize;
    let grid_h = height.div_ceil(cell_size) as usize;
    let rep_labs: Vec<[f32; 3]> = reps.iter().map(|r| r.lab).collect();

    let labels: Vec<u16> = (0..grid_h)
        .into_par_iter()
        .flat_map_iter(|gy| {
            let py = (gy as u32 * cell_size + cell_size / 2).min(height - 1);
            let rep_labs = &rep_labs;
            (0..grid_w).map(move |gx| {
                let px = (gx as u32 * cell_size + cell_size / 2).min(width - 1);
                let idx = ((py * width + px) * 4) as usize;
                let lab = rgb_to_oklab([pixels[idx], pixels[idx + 1], pixels[idx + 2]]);
                let mut best = 0usize;
                let mut best_dist = f32::INFINITY;
                for (i, rep) in rep_labs.iter().enumerate() {
                    let d = delta_e(lab, *rep);
                    if d < best_dist {
                        best_dist = d;
                        best = i;
                    }
                }
                best as u16
            })
        })
        .collect();

    let mut area_by_group = vec![0u64; reps.len()];
    for &label in &labels {
        area_by_group[label as usize] += 1;
    }

    Ok(LabelGrid {
        labels,
        width: grid_w,
        height: grid_h,
        area_by_group,
    })
}
