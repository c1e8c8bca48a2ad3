use forest::ForestError;
use nasadem::NasademError;
use raster::RasterError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Raster(#[from] RasterError),

    #[error("{0}")]
    Forest(#[from] ForestError),

    #[error("{0}")]
    Nasadem(#[from] NasademError),

    #[error("layer {layer}: collection {collection} is empty after filtering")]
    EmptyCollection { layer: String, collection: String },

    #[error("layer {layer} has no defined pixels in region")]
    EmptyLayer { layer: String },

    #[error("no valid pixels to sample")]
    EmptySample,

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("test set is empty")]
    EmptyTestSet,

    #[error("unknown collection {0}")]
    UnknownCollection(String),

    #[error("no band or column named {0}")]
    MissingBand(String),

    #[error("undefined {column} in row {row}")]
    UndefinedValue { column: String, row: usize },

    #[error("sample table has no random column")]
    MissingRandomColumn,

    #[error("invalid split threshold {0}")]
    InvalidThreshold(f64),

    #[error("no HGT tiles in {0}")]
    NoTiles(PathBuf),

    #[error("invalid evaluation target {0}, expected train or test")]
    InvalidEvalTarget(String),

    #[error("catalog: {0}")]
    Catalog(String),
}
