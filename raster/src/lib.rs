//! Rasters clipped to a region of interest.
//!
//! Every band lives on a [`Grid`] derived from a [`Region`]'s bounding
//! box. Pixels outside the region, and pixels without data, are
//! undefined (`NaN`) and skipped by every reduction.

mod band;
mod error;
mod grid;
mod histogram;
mod reducer;
mod region;
mod stack;
mod stats;

pub use crate::{
    band::Band,
    error::RasterError,
    grid::{Grid, METERS_PER_DEGREE},
    histogram::Histogram,
    reducer::{Accumulator, Reducer},
    region::{Region, COASTAL_ZHEJIANG},
    stack::Stack,
    stats::{reduce_region, RegionLimits, RegionStats},
};
pub use geo;
