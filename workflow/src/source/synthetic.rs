//! Deterministic stand-in data for every layer the workflow reads.
//!
//! Fields are smooth sums of seeded sinusoids over a coastline: land
//! to the west, sea to the east. The temperature target blends a
//! known function of rain, elevation and population with independent
//! per-pixel noise; `correlation` sets the blend.

use crate::{
    acquire::{LayerSpec, Layers, TrueColorSpec},
    source::LayerSource,
    Image, ImageCollection, WorkflowError,
};
use chrono::{Datelike, Duration, NaiveDate};
use geo::geometry::Coord;
use rand::{rngs::StdRng, Rng, SeedableRng};
use raster::{Band, Grid, Region};
use std::f64::consts::TAU;

const RAIN_GRID_DEG: f64 = 0.05;
const LST_SCALE_M: f64 = 1000.0;
const TRUE_COLOR_SCALE_M: f64 = 1000.0;

/// Seeded sum of plane waves, normalised to roughly [-1, 1].
#[derive(Debug, Clone)]
struct Wave {
    terms: Vec<(f64, f64, f64, f64)>,
}

impl Wave {
    fn new(rng: &mut StdRng, terms: usize) -> Self {
        let terms = (0..terms)
            .map(|_| {
                (
                    rng.gen_range(0.5..3.0),
                    rng.gen_range(0.5..3.0),
                    rng.gen_range(0.0..TAU),
                    rng.gen_range(0.3..1.0),
                )
            })
            .collect();
        Self { terms }
    }

    fn at(&self, Coord { x, y }: Coord<f64>) -> f64 {
        let total: f64 = self.terms.iter().map(|t| t.3).sum();
        self.terms
            .iter()
            .map(|(kx, ky, phase, amp)| amp * (kx * x + ky * y + phase).sin())
            .sum::<f64>()
            / total
    }
}

/// Synthetic collections under the ids and band names of a [`Layers`]
/// configuration.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    layers: Layers,
    region: Region,
    scale_m: f64,
    seed: u64,
    correlation: f64,
}

impl SyntheticSource {
    /// Returns a source generating data over `region`, with
    /// population and elevation at `scale_m` meters.
    pub fn new(layers: Layers, region: Region, scale_m: f64) -> Self {
        Self {
            layers,
            region,
            scale_m,
            seed: 0,
            correlation: 1.0,
        }
    }

    #[must_use]
    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// How strongly temperature follows the other layers, clamped to
    /// [0, 1].
    #[must_use]
    pub fn correlation(self, correlation: f64) -> Self {
        Self {
            correlation: correlation.clamp(0.0, 1.0),
            ..self
        }
    }

    fn fields(&self) -> Fields {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let bounds = self.region.bounds();
        Fields {
            rain: Wave::new(&mut rng, 3),
            elevation: Wave::new(&mut rng, 4),
            pop: Wave::new(&mut rng, 5),
            // Coast runs north-south at 70% of the region's width.
            coast_x: bounds.min().x + 0.7 * bounds.width(),
            coast_amp: 0.05 * bounds.width(),
            noise_seed: rng.gen(),
            correlation: self.correlation,
        }
    }

    fn grid(&self, scale_m: f64) -> Result<Grid, WorkflowError> {
        Ok(Grid::for_region(&self.region, scale_m)?)
    }

    fn rain(&self, spec: &LayerSpec) -> Result<ImageCollection, WorkflowError> {
        let fields = self.fields();
        let bounds = self.region.bounds();
        let grid = Grid::new(
            bounds.min().x,
            bounds.max().y,
            RAIN_GRID_DEG,
            RAIN_GRID_DEG,
            cells(bounds.width()),
            cells(bounds.height()),
        )?;
        let images: Vec<Image> = days(spec, 1)
            .map(|day| {
                // Wet summers; the factor averages 1 over a year.
                let season = 1.0 + 0.5 * (TAU * f64::from(day.ordinal()) / 365.0 - 1.6).sin();
                let band = Band::from_fn(spec.band.as_str(), grid, |c| {
                    Some(fields.annual_rain(c) / 365.0 * season)
                });
                Image::new(day.format("%Y%m%d").to_string(), Some(day), vec![band])
            })
            .collect::<Result<_, _>>()?;
        Ok(ImageCollection::new(spec.collection.as_str(), images))
    }

    fn lst(&self, spec: &LayerSpec) -> Result<ImageCollection, WorkflowError> {
        let fields = self.fields();
        let grid = self.grid(LST_SCALE_M)?;
        let noise = fields.noise(&grid);
        let celsius: Vec<f64> = (0..grid.len())
            .map(|i| fields.lst(grid.center_of(i), noise[i]))
            .collect();
        let images: Vec<Image> = days(spec, 8)
            .map(|day| -> Result<Image, WorkflowError> {
                // Seasonal swing that averages out over a year.
                let season = 6.0 * (TAU * (f64::from(day.ordinal()) - 100.0) / 365.0).sin();
                let raw = celsius
                    .iter()
                    .map(|t| (t + season + 273.15) / 0.02)
                    .collect();
                let band = Band::new(spec.band.as_str(), grid, raw)?;
                Image::new(day.format("%Y_%m_%d").to_string(), Some(day), vec![band])
            })
            .collect::<Result<_, _>>()?;
        Ok(ImageCollection::new(spec.collection.as_str(), images))
    }

    fn pop(&self, spec: &LayerSpec) -> Result<ImageCollection, WorkflowError> {
        let fields = self.fields();
        let grid = self.grid(self.scale_m)?;
        let images: Vec<Image> = (2019..=2021)
            .map(|year| {
                let growth = 1.0 + 0.02 * f64::from(year - 2019);
                let band = Band::from_fn(spec.band.as_str(), grid, |c| {
                    fields.population(c).map(|pop| pop * growth)
                });
                let date = NaiveDate::from_ymd_opt(year, 1, 1);
                Image::new(format!("CHN_{year}"), date, vec![band])
            })
            .collect::<Result<_, _>>()?;
        Ok(ImageCollection::new(spec.collection.as_str(), images))
    }

    fn elevation(&self, spec: &LayerSpec) -> Result<ImageCollection, WorkflowError> {
        let fields = self.fields();
        let grid = self.grid(self.scale_m)?;
        let band = Band::from_fn(spec.band.as_str(), grid, |c| Some(fields.elevation(c)));
        Ok(ImageCollection::new(
            spec.collection.as_str(),
            vec![Image::new(spec.collection.as_str(), None, vec![band])?],
        ))
    }

    /// Reflectance composites where land is green-brown and sea dark
    /// blue; every third image is cloudy.
    fn true_color(&self, spec: &TrueColorSpec) -> Result<ImageCollection, WorkflowError> {
        let fields = self.fields();
        let grid = self.grid(TRUE_COLOR_SCALE_M)?;
        let range = spec.max - spec.min;
        let images: Vec<Image> = (0..9)
            .map(|i: u32| -> Result<Image, WorkflowError> {
                let cloud = if i % 3 == 0 { 60.0 } else { 2.0 };
                let bright: f64 = if cloud > 10.0 { 0.9 } else { 0.0 };
                let color = |channel: usize, c: Coord<f64>| {
                    let land = [0.12, 0.15, 0.08];
                    let sea = [0.03, 0.05, 0.10];
                    let base = if fields.is_land(c) { land } else { sea };
                    Some(spec.min + range * (base[channel] + bright).min(1.0))
                };
                let bands = spec
                    .bands
                    .iter()
                    .enumerate()
                    .map(|(channel, name)| Band::from_fn(name.as_str(), grid, |c| color(channel, c)))
                    .collect();
                let day = NaiveDate::from_ymd_opt(2022, 6, 1 + 3 * i);
                Ok(Image::new(format!("{}_{i}", spec.collection), day, bands)?
                    .with_property("CLOUDY_PIXEL_PERCENTAGE", cloud))
            })
            .collect::<Result<_, _>>()?;
        Ok(ImageCollection::new(spec.collection.as_str(), images))
    }
}

impl LayerSource for SyntheticSource {
    fn collection(&self, id: &str) -> Result<ImageCollection, WorkflowError> {
        let Layers {
            rain,
            lst,
            pop,
            elevation,
            true_color,
        } = &self.layers;
        if id == rain.collection {
            self.rain(rain)
        } else if id == lst.collection {
            self.lst(lst)
        } else if id == pop.collection {
            self.pop(pop)
        } else if id == elevation.collection {
            self.elevation(elevation)
        } else if let Some(spec) = true_color.iter().find(|spec| spec.collection == id) {
            self.true_color(spec)
        } else {
            Err(WorkflowError::UnknownCollection(id.to_string()))
        }
    }
}

struct Fields {
    rain: Wave,
    elevation: Wave,
    pop: Wave,
    coast_x: f64,
    coast_amp: f64,
    noise_seed: u64,
    correlation: f64,
}

impl Fields {
    fn is_land(&self, c: Coord<f64>) -> bool {
        c.x < self.coast_x + self.coast_amp * (3.0 * c.y).sin()
    }

    /// Millimeters per year.
    fn annual_rain(&self, c: Coord<f64>) -> f64 {
        1600.0 + 500.0 * self.rain.at(c)
    }

    /// Meters, zero at sea.
    fn elevation(&self, c: Coord<f64>) -> f64 {
        if self.is_land(c) {
            (900.0 * (self.elevation.at(c) + 0.4)).max(1.0)
        } else {
            0.0
        }
    }

    /// People per pixel; undefined at sea and zero on empty land.
    fn population(&self, c: Coord<f64>) -> Option<f64> {
        if !self.is_land(c) {
            return None;
        }
        // Empty where the field dips below -0.5.
        let density = ((self.pop.at(c) + 0.5) / 1.5).max(0.0);
        Some(250.0 * density * density)
    }

    /// Degrees Celsius.
    fn lst(&self, c: Coord<f64>, noise: f64) -> f64 {
        let signal = 28.0 - 0.0065 * self.elevation(c)
            + 0.002 * (self.annual_rain(c) - 1600.0)
            + 0.01 * self.population(c).unwrap_or(0.0);
        self.correlation * signal + (1.0 - self.correlation) * noise
    }

    /// Independent uniform noise in [20, 40) per pixel of `grid`.
    fn noise(&self, grid: &Grid) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.noise_seed);
        (0..grid.len()).map(|_| rng.gen_range(20.0..40.0)).collect()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cells(extent: f64) -> usize {
    ((extent / RAIN_GRID_DEG).ceil() as usize).max(1)
}

/// Every `step` days of `spec`'s date window, or of 2022 when it has
/// none.
fn days(spec: &LayerSpec, step: i64) -> impl Iterator<Item = NaiveDate> {
    let (start, end) = spec.dates.map_or_else(
        || {
            (
                NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            )
        },
        |dates| (dates.start, dates.end),
    );
    std::iter::successors(Some(start), move |day| day.checked_add_signed(Duration::days(step)))
        .take_while(move |day| *day < end)
}
