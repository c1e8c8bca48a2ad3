use crate::WorkflowError;
use chrono::NaiveDate;
use geo::geometry::Rect;
use log::debug;
use raster::{Accumulator, Band, Grid, Reducer, Region};
use rayon::prelude::*;
use std::{collections::BTreeMap, time::Instant};

/// One acquisition: a set of bands captured together.
#[derive(Debug, Clone)]
pub struct Image {
    id: String,
    date: Option<NaiveDate>,
    footprint: Rect<f64>,
    bands: Vec<Band>,
    properties: BTreeMap<String, f64>,
}

impl Image {
    /// Returns an image whose footprint is the extent of its first
    /// band.
    pub fn new<S: Into<String>>(
        id: S,
        date: Option<NaiveDate>,
        bands: Vec<Band>,
    ) -> Result<Self, WorkflowError> {
        let id = id.into();
        let footprint = bands
            .first()
            .ok_or_else(|| WorkflowError::Catalog(format!("image {id} has no bands")))?
            .grid()
            .bounds();
        Ok(Self {
            id,
            date,
            footprint,
            bands,
            properties: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn with_property<S: Into<String>>(mut self, name: S, value: f64) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }

    pub fn band(&self, name: &str) -> Result<&Band, WorkflowError> {
        self.bands
            .iter()
            .find(|band| band.name() == name)
            .ok_or_else(|| WorkflowError::MissingBand(format!("{}/{name}", self.id)))
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(Band::name).collect()
    }
}

/// An ordered set of images from one dataset.
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    id: String,
    images: Vec<Image>,
}

impl ImageCollection {
    pub fn new<S: Into<String>>(id: S, images: Vec<Image>) -> Self {
        Self {
            id: id.into(),
            images,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Keeps images whose footprint overlaps `region`.
    #[must_use]
    pub fn filter_bounds(mut self, region: &Region) -> Self {
        self.images.retain(|image| region.overlaps(&image.footprint));
        self
    }

    /// Keeps dated images in `[start, end)`.
    #[must_use]
    pub fn filter_date(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.images
            .retain(|image| image.date.is_some_and(|date| start <= date && date < end));
        self
    }

    /// Keeps images whose `property` is less than `value`. Images
    /// without the property are dropped.
    #[must_use]
    pub fn filter_lt(mut self, property: &str, value: f64) -> Self {
        self.images
            .retain(|image| image.property(property).is_some_and(|p| p < value));
        self
    }

    /// Sorts by acquisition date; undated images sort first when
    /// ascending.
    #[must_use]
    pub fn sort_by_time(mut self, ascending: bool) -> Self {
        if ascending {
            self.images.sort_by_key(|image| image.date);
        } else {
            self.images.sort_by_key(|image| std::cmp::Reverse(image.date));
        }
        self
    }

    pub fn first(&self) -> Option<&Image> {
        self.images.first()
    }

    /// Reduces `band` across every image, per pixel of `grid`.
    ///
    /// The output is named `<band>_<reducer>`. Pixels no image covers
    /// are undefined.
    pub fn reduce(&self, reducer: Reducer, band: &str, grid: &Grid) -> Result<Band, WorkflowError> {
        let bands = self
            .images
            .iter()
            .map(|image| image.band(band))
            .collect::<Result<Vec<_>, _>>()?;
        let name = format!("{band}_{}", reducer.name());

        let now = Instant::now();
        // Reducing on a shared native grid and resampling afterwards is
        // equivalent to resampling each image first.
        let native = bands.first().map(|b| *b.grid());
        let reduced = match native {
            Some(native) if bands.iter().all(|b| *b.grid() == native) => {
                let mut accs = vec![reducer.accumulator(); native.len()];
                accs.par_iter_mut()
                    .enumerate()
                    .for_each(|(index, acc)| push_all(acc, &bands, |b| b.values()[index]));
                let values = accs.iter().map(finish).collect();
                Band::new(name, native, values)?.resample(grid)
            }
            _ => {
                let mut accs = vec![reducer.accumulator(); grid.len()];
                accs.par_iter_mut().enumerate().for_each(|(index, acc)| {
                    let center = grid.center_of(index);
                    push_all(acc, &bands, |b| b.sample(center).unwrap_or(f64::NAN));
                });
                let values = accs.iter().map(finish).collect();
                Band::new(name, *grid, values)?
            }
        };
        let duration = now.elapsed();
        debug!(
            "{}: reduced {} images of {band} with {reducer}, {duration:?}",
            self.id,
            bands.len()
        );
        Ok(reduced)
    }
}

fn push_all<F: Fn(&Band) -> f64>(acc: &mut Accumulator, bands: &[&Band], value: F) {
    for &band in bands {
        acc.push(value(band));
    }
}

fn finish(acc: &Accumulator) -> f64 {
    // A count of zero is still undefined coverage.
    if acc.count() == 0 {
        f64::NAN
    } else {
        acc.finish().unwrap_or(f64::NAN)
    }
}
