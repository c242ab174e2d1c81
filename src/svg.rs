//! SVG document assembly for both vectorization techniques.

use crate::contours::{contours_to_path_data, trace_contours};
use crate::rectruns::RectRun;
use std::collections::BTreeSet;

fn document_open(width: u32, height: u32) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = width,
        h = height
    )
}

fn background_rect(fill: &str) -> String {
    format!("<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>", fill)
}

/// Serialize rectangle runs into a complete document: background first, then
/// one `<rect>` per run, tagged with its island id when one was recorded.
pub fn rect_runs_to_svg(runs: &[RectRun], width: u32, height: u32, background_hex: &str) -> String {
    let mut parts = vec![document_open(width, height), background_rect(background_hex)];
    for run in runs {
        match run.island_id {
            Some(id) => parts.push(format!(
                "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" data-island-id=\"{}\"/>",
                run.x, run.y, run.width, run.height, run.fill, id
            )),
            None => parts.push(format!(
                "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\"/>",
                run.x, run.y, run.width, run.height, run.fill
            )),
        }
    }
    parts.push("</svg>".to_string());
    parts.concat()
}

/// Trace and serialize every non-background label into one even-odd `<path>`
/// over a full-canvas background rectangle.
#[allow(clippy::too_many_arguments)]
pub fn contours_to_svg(
    labels: &[u16],
    grid_width: usize,
    grid_height: usize,
    cell_size: u32,
    fills: &[String],
    background_index: u16,
    width_px: u32,
    height_px: u32,
) -> String {
    let mut parts = vec![
        document_open(width_px, height_px),
        background_rect(&fills[background_index as usize]),
    ];

    let present: BTreeSet<u16> = labels.iter().copied().collect();
    for label in present {
        if label == background_index {
            continue;
        }
        let loops = trace_contours(labels, grid_width, grid_height, label);
        if loops.is_empty() {
            continue;
        }
        parts.push(format!(
            "<path d=\"{}\" fill=\"{}\" fill-rule=\"evenodd\"/>",
            contours_to_path_data(&loops, cell_size),
            fills[label as usize]
        ));
    }

    parts.push("</svg>".to_string());
    parts.concat()
}
