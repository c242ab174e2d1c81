use anyhow::{bail, Context, Result};
use clap::Parser;
use flatvec::{
    extract, generate, group_chips, Chip, ExtractParams, GenerateParams, Group, GroupSpec,
    SampleMode, Technique,
};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Convert raster images into flat-color SVG graphics.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path (single input only). Defaults to the input with .svg
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output directory for multiple inputs
    #[arg(short = 'd', long)]
    out_dir: Option<PathBuf>,

    /// Sampling stride in pixels (1 samples every pixel)
    #[arg(long, default_value_t = 2)]
    step: u32,

    /// Maximum number of palette chips to extract
    #[arg(short = 'k', long, default_value_t = 16)]
    max_colors: usize,

    /// Chip selection mode: frequency or diverse
    #[arg(long, default_value = "frequency")]
    mode: String,

    /// Similarity percentage (0-100) for auto-grouping
    #[arg(long, default_value_t = 40.0)]
    similarity: f32,

    /// Grid cell size in pixels
    #[arg(long, default_value_t = 4)]
    cell_size: u32,

    /// Minimum island size in cells; smaller regions merge into a neighbor
    #[arg(long, default_value_t = 4)]
    min_island: usize,

    /// Vectorization technique: contours or rect-runs
    #[arg(long, default_value = "contours")]
    technique: String,

    /// Cap on the working raster's longest side before generation
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Write the extracted chips and groups as JSON to this path
    #[arg(long)]
    dump_palette: Option<PathBuf>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaletteDump<'a> {
    total_samples: u64,
    chips: &'a [Chip],
    groups: &'a [Group],
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mode = match args.mode.as_str() {
        "frequency" => SampleMode::Frequency,
        "diverse" => SampleMode::Diverse,
        other => bail!("unknown mode {other:?}, expected frequency or diverse"),
    };
    let technique = match args.technique.as_str() {
        "contours" => Technique::Contours,
        "rect-runs" | "rect_runs" => Technique::RectRuns,
        other => bail!("unknown technique {other:?}, expected contours or rect-runs"),
    };
    if args.output.is_some() && args.inputs.len() > 1 {
        bail!("--output only applies to a single input; use --out-dir instead");
    }

    let extract_params = ExtractParams {
        step: args.step,
        max_colors: args.max_colors,
        mode,
    };
    let generate_params = GenerateParams {
        cell_size: args.cell_size,
        min_island_size: args.min_island,
        technique,
        max_dimension: args.max_dimension,
    };

    for input in &args.inputs {
        let bytes =
            fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
        let (pixels, width, height) =
            flatvec::decode_rgba(&bytes).with_context(|| format!("{}", input.display()))?;

        let outcome = extract(&pixels, width, height, &extract_params)?;
        if outcome.chips.is_empty() {
            println!("Skipped {} (no opaque pixels to sample)", input.display());
            continue;
        }
        let groups = group_chips(&outcome.chips, args.similarity)?;
        let specs: Vec<GroupSpec> = groups.iter().map(GroupSpec::from).collect();
        let result = generate(&pixels, width, height, &specs, &generate_params)?;

        let out_path = if let Some(out) = &args.output {
            out.clone()
        } else if let Some(dir) = &args.out_dir {
            let stem = input.file_stem().unwrap_or_default().to_string_lossy();
            dir.join(format!("{stem}.svg"))
        } else {
            input.with_extension("svg")
        };

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, &result.svg)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        println!(
            "Saved → {} ({}x{}, {} chips, {} groups, background {})",
            out_path.display(),
            result.width,
            result.height,
            outcome.chips.len(),
            groups.len(),
            result.background_hex
        );

        if let Some(palette_path) = &args.dump_palette {
            let dump = PaletteDump {
                total_samples: outcome.total_samples,
                chips: &outcome.chips,
                groups: &groups,
            };
            let json = serde_json::to_string_pretty(&dump)?;
            fs::write(palette_path, json)
                .with_context(|| format!("failed to write {}", palette_path.display()))?;
        }
    }

    Ok(())
}
