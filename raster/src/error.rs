use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("expected {expected} values for grid, got {actual}")]
    Dimensions { expected: usize, actual: usize },

    #[error("band {0} is not on the stack's grid")]
    GridMismatch(String),

    #[error("duplicate band {0}")]
    DuplicateBand(String),

    #[error("no band named {0}")]
    MissingBand(String),

    #[error("stack has no bands")]
    EmptyStack,

    #[error("band {0} has no defined pixels in region")]
    EmptyBand(String),

    #[error("histogram needs at least one bucket")]
    InvalidBuckets,

    #[error("region covers {pixels} pixels, more than the {max} allowed")]
    TooManyPixels { pixels: u64, max: u64 },
}
