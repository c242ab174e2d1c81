//! flatvec: convert a raster image into a small, editable color palette and
//! re-render it as a flat-color SVG.
//!
//! The pipeline runs in three caller-triggered stages:
//! 1. extraction — sample the raster into frequency-counted color chips,
//! 2. grouping — cluster chips into perceptually similar groups (OKLab
//!    distance, adaptive threshold),
//! 3. generation — label a coarse grid against the group palette, clean up
//!    speckle islands, identify stable regions, and emit SVG geometry as
//!    either traced contours or rectangle runs.
//!
//! Everything is synchronous and deterministic; an interactive shell is
//! expected to run the stages off its UI thread and may edit the group
//! assignments between stages.

pub mod color;
pub mod contours;
pub mod error;
pub mod grouping;
pub mod islands;
pub mod labeling;
pub mod pipeline;
pub mod rectruns;
pub mod sampler;
pub mod svg;

pub use error::PipelineError;
pub use grouping::{auto_group, Group};
pub use pipeline::{
    decode_rgba, extract, extract_from_bytes, generate, generate_from_bytes, group_chips,
    ExtractParams, GenerateParams, GenerateResult, GroupSpec, PerfStats, Technique,
};
pub use sampler::{sample, Chip, SampleMode, SampleOutcome};
