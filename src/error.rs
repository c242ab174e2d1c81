use thiserror::Error;

/// Errors surfaced by the pipeline before any heavy work begins.
///
/// Degenerate-but-valid inputs (all-transparent image, single uniform
/// region, empty chip list) are not errors and produce minimal output
/// instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("image has zero area ({width}x{height})")]
    ZeroAreaImage { width: u32, height: u32 },

    #[error("pixel buffer length {actual} does not match width*height*4 = {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("{name} must be at least {min}, got {value}")]
    ParameterOutOfRange {
        name: &'static str,
        min: u32,
        value: u32,
    },

    #[error("similarity percentage must be a finite value in 0..=100, got {0}")]
    InvalidSimilarity(f32),

    #[error("cannot classify against an empty group representative list")]
    NoGroupRepresentatives,

    #[error("malformed hex color {0:?}")]
    BadHexColor(String),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}
