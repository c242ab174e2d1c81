//! Pipeline orchestration: the three externally-triggered stages
//! (extraction, grouping, generation) behind validated, deterministic,
//! synchronous entry points.
//!
//! Each stage is independently invocable and idempotent; callers that need
//! responsiveness run a stage on a worker thread and discard stale results
//! themselves. Nothing here blocks on I/O or shares mutable state.

use crate::color::hex_to_oklab;
use crate::error::PipelineError;
use crate::grouping::{auto_group, Group};
use crate::islands::{identify_islands, island_cleanup};
use crate::labeling::{classify_grid, GroupRep};
use crate::rectruns::encode_runs;
use crate::sampler::{sample, Chip, SampleMode, SampleOutcome};
use crate::svg::{contours_to_svg, rect_runs_to_svg};
use image::{imageops::FilterType, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractParams {
    pub step: u32,
    pub max_colors: usize,
    pub mode: SampleMode,
}

impl Default for ExtractParams {
    fn default() -> Self {
        Self {
            step: 2,
            max_colors: 16,
            mode: SampleMode::Frequency,
        }
    }
}

/// Geometry generator selection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technique {
    Contours,
    RectRuns,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateParams {
    /// Downsampling factor: one grid cell per `cell_size` raster pixels.
    pub cell_size: u32,
    /// Connected regions smaller than this many cells are merged away.
    pub min_island_size: usize,
    pub technique: Technique,
    /// Cap on the working raster's longest side before classification.
    pub max_dimension: Option<u32>,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            cell_size: 4,
            min_island_size: 4,
            technique: Technique::Contours,
            max_dimension: None,
        }
    }
}

/// Group definition as supplied by the caller for generation. Groups with no
/// member chips are skipped by classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSpec {
    pub id: String,
    pub chip_ids: Vec<String>,
    pub rep_hex: String,
}

impl From<&Group> for GroupSpec {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id.clone(),
            chip_ids: group.chip_ids.clone(),
            rep_hex: group.rep_hex.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfStats {
    pub classify_ms: u64,
    pub cleanup_ms: u64,
    pub trace_ms: u64,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResult {
    pub svg: String,
    /// Output canvas size: grid dimensions times cell size, which can differ
    /// from the input raster due to downsampling.
    pub width: u32,
    pub height: u32,
    pub background_hex: String,
    /// Post-cleanup cell area per supplied group id, for UI statistics.
    pub area_by_group: HashMap<String, u64>,
    pub perf: PerfStats,
}

/// Stage 1: reduce the raster to a bounded chip palette.
pub fn extract(
    pixels: &[u8],
    width: u32,
    height: u32,
    params: &ExtractParams,
) -> Result<SampleOutcome, PipelineError> {
    log::info!(
        "Sampling colors: {}x{}, step {}, up to {} chips",
        width,
        height,
        params.step,
        params.max_colors
    );
    let outcome = sample(
        pixels,
        width,
        height,
        params.step,
        params.max_colors,
        params.mode,
    )?;
    log::info!(
        "Extracted {} chips from {} samples",
        outcome.chips.len(),
        outcome.total_samples
    );
    Ok(outcome)
}

/// Stage 2: cluster chips into perceptually similar groups.
pub fn group_chips(chips: &[Chip], similarity_pct: f32) -> Result<Vec<Group>, PipelineError> {
    if !similarity_pct.is_finite() || !(0.0..=100.0).contains(&similarity_pct) {
        return Err(PipelineError::InvalidSimilarity(similarity_pct));
    }
    log::info!(
        "Auto-grouping {} chips at {}% similarity",
        chips.len(),
        similarity_pct
    );
    let groups = auto_group(chips, similarity_pct);
    log::info!("Formed {} groups", groups.len());
    Ok(groups)
}

/// Stage 3: classify, clean, identify islands, and emit the SVG document.
pub fn generate(
    pixels: &[u8],
    width: u32,
    height: u32,
    groups: &[GroupSpec],
    params: &GenerateParams,
) -> Result<GenerateResult, PipelineError> {
    let total_start = Instant::now();

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
    if params.cell_size < 1 {
        return Err(PipelineError::ParameterOutOfRange {
            name: "cell_size",
            min: 1,
            value: params.cell_size,
        });
    }
    if let Some(max_dim) = params.max_dimension {
        if max_dim < 1 {
            return Err(PipelineError::ParameterOutOfRange {
                name: "max_dimension",
                min: 1,
                value: max_dim,
            });
        }
    }

    // Empty groups are a valid palette-level state; they just cannot label
    // cells.
    let reps: Vec<GroupRep> = groups
        .iter()
        .filter(|g| !g.chip_ids.is_empty())
        .map(|g| {
            let lab = hex_to_oklab(&g.rep_hex)
                .ok_or_else(|| PipelineError::BadHexColor(g.rep_hex.clone()))?;
            Ok(GroupRep {
                id: g.id.clone(),
                hex: g.rep_hex.clone(),
                lab,
            })
        })
        .collect::<Result<_, PipelineError>>()?;
    if reps.is_empty() {
        return Err(PipelineError::NoGroupRepresentatives);
    }

    let (working, work_w, work_h) = cap_resolution(pixels, width, height, params.max_dimension);

    log::info!(
        "Classifying {}x{} raster into cells of {} px against {} groups",
        work_w,
        work_h,
        params.cell_size,
        reps.len()
    );
    let classify_start = Instant::now();
    let mut grid = classify_grid(&working, work_w, work_h, params.cell_size, &reps)?;
    let classify_ms = classify_start.elapsed().as_millis() as u64;

    let cleanup_start = Instant::now();
    island_cleanup(
        &mut grid.labels,
        grid.width,
        grid.height,
        params.min_island_size,
    );
    let cleanup_ms = cleanup_start.elapsed().as_millis() as u64;

    // Re-count areas after cleanup; the largest label becomes the background
    // and is rendered only as the base rectangle.
    let mut area_by_index = vec![0u64; reps.len()];
    for &label in &grid.labels {
        area_by_index[label as usize] += 1;
    }
    let mut background_index = 0u16;
    let mut max_area = 0u64;
    for (i, &area) in area_by_index.iter().enumerate() {
        if area > max_area {
            max_area = area;
            background_index = i as u16;
        }
    }
    let background_hex = reps[background_index as usize].hex.clone();

    let islands = identify_islands(&grid.labels, grid.width, grid.height);
    log::info!(
        "Cleanup left {} islands across {} groups",
        islands.count,
        islands.islands_by_group.len()
    );

    let fills: Vec<String> = reps.iter().map(|r| r.hex.clone()).collect();
    let content_w = grid.width as u32 * params.cell_size;
    let content_h = grid.height as u32 * params.cell_size;

    let trace_start = Instant::now();
    let svg = match params.technique {
        Technique::RectRuns => {
            let runs = encode_runs(
                &grid.labels,
                grid.width,
                grid.height,
                params.cell_size,
                background_index,
                &fills,
                Some(&islands.ids),
            );
            rect_runs_to_svg(&runs, content_w, content_h, &background_hex)
        }
        Technique::Contours => contours_to_svg(
            &grid.labels,
            grid.width,
            grid.height,
            params.cell_size,
            &fills,
            background_index,
            content_w,
            content_h,
        ),
    };
    let trace_ms = trace_start.elapsed().as_millis() as u64;

    let mut area_by_group: HashMap<String, u64> =
        groups.iter().map(|g| (g.id.clone(), 0)).collect();
    for (i, rep) in reps.iter().enumerate() {
        area_by_group.insert(rep.id.clone(), area_by_index[i]);
    }

    let total_ms = total_start.elapsed().as_millis() as u64;
    log::info!(
        "Emitted {} byte SVG in {}ms (classify {}ms, cleanup {}ms, trace {}ms)",
        svg.len(),
        total_ms,
        classify_ms,
        cleanup_ms,
        trace_ms
    );

    Ok(GenerateResult {
        svg,
        width: content_w,
        height: content_h,
        background_hex,
        area_by_group,
        perf: PerfStats {
            classify_ms,
            cleanup_ms,
            trace_ms,
            total_ms,
        },
    })
}

/// Nearest-neighbor downscale so the longest side fits `max_dimension`.
/// Returns the input untouched when no cap applies.
fn cap_resolution(
    pixels: &[u8],
    width: u32,
    height: u32,
    max_dimension: Option<u32>,
) -> (Vec<u8>, u32, u32) {
    let longest = width.max(height);
    let Some(max_dim) = max_dimension.filter(|&m| m < longest) else {
        return (pixels.to_vec(), width, height);
    };

    let ratio = max_dim as f32 / longest as f32;
    let out_w = ((width as f32 * ratio).round() as u32).max(1);
    let out_h = ((height as f32 * ratio).round() as u32).max(1);

    // Length was validated by the caller, so the rebuild cannot fail.
    let img = RgbaImage::from_raw(width, height, pixels.to_vec())
        .unwrap_or_else(|| RgbaImage::new(width, height));
    let resized = image::imageops::resize(&img, out_w, out_h, FilterType::Nearest);
    (resized.into_raw(), out_w, out_h)
}

/// Decode an encoded image (PNG, JPEG, ...) into the raw RGBA buffer the
/// pipeline consumes.
pub fn decode_rgba(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), PipelineError> {
    let img = image::load_from_memory(bytes)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((rgba.into_raw(), width, height))
}

pub fn extract_from_bytes(
    bytes: &[u8],
    params: &ExtractParams,
) -> Result<SampleOutcome, PipelineError> {
    let (pixels, width, height) = decode_rgba(bytes)?;
    extract(&pixels, width, height, params)
}

pub fn generate_from_bytes(
    bytes: &[u8],
    groups: &[GroupSpec],
    params: &GenerateParams,
) -> Result<GenerateResult, PipelineError> {
    let (pixels, width, height) = decode_rgba(bytes)?;
    generate(&pixels, width, height, groups, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x4 image: red 2x2 quadrant top-left, blue 2x2 quadrant top-right,
    /// bottom half fully transparent.
    fn quadrant_image() -> Vec<u8> {
        let mut pixels = vec![0u8; 4 * 4 * 4];
        for y in 0..2 {
            for x in 0..4 {
                let idx = (y * 4 + x) * 4;
                let rgb: [u8; 3] = if x < 2 { [255, 0, 0] } else { [0, 0, 255] };
                pixels[idx..idx + 3].copy_from_slice(&rgb);
                pixels[idx + 3] = 255;
            }
        }
        pixels
    }

    fn quadrant_groups() -> Vec<GroupSpec> {
        let outcome = extract(
            &quadrant_image(),
            4,
            4,
            &ExtractParams {
                step: 1,
                max_colors: 8,
                mode: SampleMode::Frequency,
            },
        )
        .unwrap();
        assert_eq!(outcome.chips.len(), 2);
        assert!(outcome.chips.iter().all(|c| (c.share - 0.5).abs() < 1e-6));
        let groups = group_chips(&outcome.chips, 0.0).unwrap();
        assert_eq!(groups.len(), 2);
        groups.iter().map(GroupSpec::from).collect()
    }

    #[test]
    fn test_end_to_end_rect_runs() {
        let specs = quadrant_groups();
        let result = generate(
            &quadrant_image(),
            4,
            4,
            &specs,
            &GenerateParams {
                cell_size: 1,
                min_island_size: 1,
                technique: Technique::RectRuns,
                max_dimension: None,
            },
        )
        .unwrap();

        assert_eq!((result.width, result.height), (4, 4));
        // Transparent cells classify to blue (nearest to black), so blue is
        // the background; the red quadrant spans two grid rows and thus two
        // runs on top of the full-canvas background rect.
        assert_eq!(result.background_hex, "#0000FF");
        assert_eq!(result.svg.matches("<rect").count(), 3);
        assert_eq!(result.svg.matches("fill=\"#FF0000\"").count(), 2);
        assert!(result.svg.contains("data-island-id"));
        let areas: Vec<u64> = result.area_by_group.values().copied().collect();
        assert_eq!(areas.iter().sum::<u64>(), 16);
    }

    #[test]
    fn test_end_to_end_contours() {
        let specs = quadrant_groups();
        let result = generate(
            &quadrant_image(),
            4,
            4,
            &specs,
            &GenerateParams {
                cell_size: 1,
                min_island_size: 1,
                technique: Technique::Contours,
                max_dimension: None,
            },
        )
        .unwrap();
        // One even-odd path for the red quadrant over the blue background.
        assert_eq!(result.svg.matches("<path").count(), 1);
        assert!(result.svg.contains("fill=\"#FF0000\""));
        assert!(result
            .svg
            .contains("<rect width=\"100%\" height=\"100%\" fill=\"#0000FF\"/>"));
    }

    #[test]
    fn test_generate_is_deterministic() {
        let specs = quadrant_groups();
        let params = GenerateParams {
            cell_size: 1,
            min_island_size: 1,
            technique: Technique::RectRuns,
            max_dimension: None,
        };
        let a = generate(&quadrant_image(), 4, 4, &specs, &params).unwrap();
        let b = generate(&quadrant_image(), 4, 4, &specs, &params).unwrap();
        assert_eq!(a.svg, b.svg);
    }

    #[test]
    fn test_fully_transparent_image_is_degenerate() {
        let pixels = vec![0u8; 10 * 10 * 4];
        let outcome = extract(&pixels, 10, 10, &ExtractParams::default()).unwrap();
        assert!(outcome.chips.is_empty());
        assert_eq!(outcome.total_samples, 0);
        // Grouping an empty chip list is fine and returns nothing.
        let groups = group_chips(&outcome.chips, 50.0).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_generate_rejects_all_empty_groups() {
        let pixels = quadrant_image();
        let specs = vec![GroupSpec {
            id: "g_1".to_string(),
            chip_ids: Vec::new(),
            rep_hex: "#FF0000".to_string(),
        }];
        let err = generate(&pixels, 4, 4, &specs, &GenerateParams::default()).unwrap_err();
        assert!(matches!(err, PipelineError::NoGroupRepresentatives));
    }

    #[test]
    fn test_generate_rejects_bad_rep_hex() {
        let pixels = quadrant_image();
        let specs = vec![GroupSpec {
            id: "g_1".to_string(),
            chip_ids: vec!["c_0".to_string()],
            rep_hex: "#XYZ".to_string(),
        }];
        let err = generate(&pixels, 4, 4, &specs, &GenerateParams::default()).unwrap_err();
        assert!(matches!(err, PipelineError::BadHexColor(_)));
    }

    #[test]
    fn test_invalid_similarity_rejected() {
        assert!(group_chips(&[], -1.0).is_err());
        assert!(group_chips(&[], 101.0).is_err());
        assert!(group_chips(&[], f32::NAN).is_err());
    }

    #[test]
    fn test_max_dimension_caps_output_canvas() {
        // 8x4 solid image capped to a longest side of 4 -> 4x2 working
        // raster.
        let mut pixels = Vec::new();
        for _ in 0..32 {
            pixels.extend_from_slice(&[10, 200, 50, 255]);
        }
        let specs = vec![GroupSpec {
            id: "g_1".to_string(),
            chip_ids: vec!["c_0".to_string()],
            rep_hex: "#0AC832".to_string(),
        }];
        let result = generate(
            &pixels,
            8,
            4,
            &specs,
            &GenerateParams {
                cell_size: 1,
                min_island_size: 1,
                technique: Technique::RectRuns,
                max_dimension: Some(4),
            },
        )
        .unwrap();
        assert_eq!((result.width, result.height), (4, 2));
    }
}
