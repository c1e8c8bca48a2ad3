use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForestError {
    #[error("no training rows")]
    Empty,

    #[error("no predictor variables")]
    NoVariables,

    #[error("{rows} rows but {targets} targets")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("row {row} has {actual} values, expected {expected}")]
    Width {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("non-finite {column} in row {row}")]
    NonFinite { row: usize, column: String },

    #[error("invalid parameter: {0}")]
    Params(&'static str),
}
