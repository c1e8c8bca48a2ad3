use crate::{Band, RasterError, Reducer, Region};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named reduction outputs, keyed `<band>_<reducer>`.
pub type RegionStats = BTreeMap<String, f64>;

/// Bounds on how many pixels a regional reduction may visit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionLimits {
    pub max_pixels: u64,

    /// Coarsen the sampling stride instead of failing when the region
    /// holds more than `max_pixels` pixels.
    pub best_effort: bool,
}

impl Default for RegionLimits {
    fn default() -> Self {
        Self {
            max_pixels: 1_000_000_000,
            best_effort: true,
        }
    }
}

/// Reduces `band`'s defined pixels inside `region` with each of
/// `reducers`.
///
/// Reducers with no defined input are omitted from the output.
pub fn reduce_region(
    band: &Band,
    region: &Region,
    reducers: &[Reducer],
    limits: RegionLimits,
) -> Result<RegionStats, RasterError> {
    let grid = band.grid();
    let pixels = (0..grid.len())
        .filter(|&index| region.contains(grid.center_of(index)))
        .count() as u64;

    let mut stride: u64 = 1;
    while pixels / (stride * stride) > limits.max_pixels.max(1) {
        if !limits.best_effort {
            return Err(RasterError::TooManyPixels {
                pixels,
                max: limits.max_pixels,
            });
        }
        stride *= 2;
    }
    if stride > 1 {
        info!(
            "{}: {pixels} pixels exceed max of {}, reducing every {stride} pixels",
            band.name(),
            limits.max_pixels
        );
    }

    #[allow(clippy::cast_possible_truncation)]
    let values = band.values_in(region, stride as usize);
    Ok(reducers
        .iter()
        .filter_map(|reducer| {
            reducer
                .reduce(values.iter().copied())
                .map(|value| (format!("{}_{}", band.name(), reducer.name()), value))
        })
        .collect())
}
