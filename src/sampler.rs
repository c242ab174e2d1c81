//! Palette extraction: reduce a raster to a bounded set of representative
//! colors ("chips") with frequency statistics.

use crate::color::{rgb_to_hex, rgb_to_oklab};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pixels with alpha below this are treated as fully transparent and excluded
/// from both the tally and the total sample count.
pub const ALPHA_CUTOFF: u8 = 8;

/// OKLab distance at which two colors are considered clearly different; the
/// diverse-mode distance term is normalized against this cap.
const DISTINCT_DELTA: f32 = 0.25;

/// Initial weight of the diversity term in diverse mode. Decays linearly to
/// zero as the selection fills, so late picks favor prevalence.
const DIVERSITY_WEIGHT_START: f32 = 0.8;

/// How chips are selected from the frequency tally.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    /// Top `max_colors` by exact-hex occurrence count.
    Frequency,
    /// Greedy blend of frequency and minimum perceptual distance to the
    /// colors already selected.
    Diverse,
}

/// One extracted palette entry. Immutable for a given extraction run; a new
/// extraction invalidates all prior chip ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chip {
    pub id: String,
    pub hex: String,
    pub count: u64,
    /// Count divided by the sum of the selected chips' counts, 0..1.
    pub share: f32,
    pub lab: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleOutcome {
    pub chips: Vec<Chip>,
    pub total_samples: u64,
}

/// Walk the raster on a grid with stride `step` in both axes and tally exact
/// RGB occurrences, then select up to `max_colors` chips.
///
/// A zero-sample image (e.g. fully transparent) returns an empty chip list
/// and a total of zero; callers must treat that as "nothing to extract".
pub fn sample(
    pixels: &[u8],
    width: u32,
    height: u32,
    step: u32,
    max_colors: usize,
    mode: SampleMode,
) -> Result<SampleOutcome, PipelineError> {
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
    if step < 1 {
        return Err(PipelineError::ParameterOutOfRange {
            name: "step",
            min: 1,
            value: step,
        });
    }
    if max_colors < 1 {
        return Err(PipelineError::ParameterOutOfRange {
            name: "max_colors",
            min: 1,
            value: max_colors as u32,
        });
    }

    let mut tally: HashMap<[u8; 3], u64> = HashMap::new();
    let mut total: u64 = 0;
    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let idx = ((y * width + x) * 4) as usize;
            if pixels[idx + 3] >= ALPHA_CUTOFF {
                let rgb = [pixels[idx], pixels[idx + 1], pixels[idx + 2]];
                *tally.entry(rgb).or_insert(0) += 1;
                total += 1;
            }
            x += step;
        }
        y += step;
    }

    if total == 0 {
        return Ok(SampleOutcome {
            chips: Vec::new(),
            total_samples: 0,
        });
    }

    // Frequency ranking with a deterministic tie-break on the raw bytes.
    let mut ranked: Vec<([u8; 3], u64)> = tally.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let selected: Vec<usize> = match mode {
        SampleMode::Frequency => (0..ranked.len().min(max_colors)).collect(),
        SampleMode::Diverse => select_diverse(&ranked, max_colors),
    };

    let selected_sum: u64 = selected.iter().map(|&i| ranked[i].1).sum();
    let chips = selected
        .iter()
        .enumerate()
        .map(|(n, &i)| {
            let (rgb, count) = ranked[i];
            Chip {
                id: format!("c_{}", n),
                hex: rgb_to_hex(rgb),
                count,
                share: count as f32 / selected_sum as f32,
                lab: rgb_to_oklab(rgb),
            }
        })
        .collect();

    Ok(SampleOutcome {
        chips,
        total_samples: total,
    })
}

/// Greedy diverse selection over the frequency-ranked list. The most frequent
/// color is always kept; each following slot maximizes a blend of normalized
/// frequency and normalized minimum distance to the colors picked so far.
fn select_diverse(ranked: &[([u8; 3], u64)], max_colors: usize) -> Vec<usize> {
    let limit = ranked.len().min(max_colors);
    if limit == 0 {
        return Vec::new();
    }

    let labs: Vec<[f32; 3]> = ranked.iter().map(|(rgb, _)| rgb_to_oklab(*rgb)).collect();
    let top_count = ranked[0].1 as f32;

    let mut picked = vec![false; ranked.len()];
    let mut selected = vec![0usize];
    picked[0] = true;

    while selected.len() < limit {
        let t = if limit > 1 {
            (selected.len() - 1) as f32 / (limit - 1) as f32
        } else {
            0.0
        };
        let diversity_weight = DIVERSITY_WEIGHT_START * (1.0 - t);

        let mut best_idx = None;
        let mut best_score = f32::NEG_INFINITY;
        for (i, &(_, count)) in ranked.iter().enumerate() {
            if picked[i] {
                continue;
            }
            let freq_norm = count as f32 / top_count;
            let min_dist = selected
                .iter()
                .map(|&s| crate::color::delta_e(labs[i], labs[s]))
                .fold(f32::INFINITY, f32::min);
            let dist_norm = (min_dist / DISTINCT_DELTA).min(1.0);
            let score = diversity_weight * dist_norm + (1.0 - diversity_weight) * freq_norm;
            // Strict comparison: ties go to the earliest ranked index.
            if score > best_score {
                best_score = score;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(i) => {
                picked[i] = true;
                selected.push(i);
            }
            None => break,
        }
    }

    selected.sort_unstable();
    selected
}
