//! Coastal land surface temperature regression.
//!
//! The workflow acquires rain, land surface temperature (LST),
//! population and elevation over a region, stacks them masked by
//! population, samples pixels, splits them into train and test sets by
//! a random key, fits a random forest predicting LST from the other
//! layers, and evaluates it.
//!
//! All randomness derives from [`Config::seed`], so a run is
//! reproducible.

mod acquire;
mod collection;
mod config;
mod error;
mod evaluate;
mod features;
mod model;
mod pipeline;
mod sample;
pub mod source;

pub use crate::{
    acquire::{
        acquire, acquire_true_color, Composite, DateRange, LayerSpec, Layers, PropertyFilter,
        TrueColor, TrueColorSpec, CHIRPS_DAILY, MODIS_LST_8DAY, MODIS_SR_DAILY, NASADEM,
        SENTINEL2_SR, WORLDPOP,
    },
    collection::{Image, ImageCollection},
    config::Config,
    error::WorkflowError,
    evaluate::{evaluate, linear_fit, mae, rmse, EvalTarget, Evaluation, LinearFit, Metrics},
    features::assemble,
    model::LstModel,
    pipeline::{run, Report, Summary},
    sample::{sample, SampleRow, SampleTable},
};
pub use forest::{Explanation, ForestParams};
pub use raster;
