use crate::{Grid, RasterError, Region};
use geo::geometry::Coord;

/// A named single-band raster.
///
/// Undefined (masked) pixels hold `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    name: String,
    grid: Grid,
    values: Box<[f64]>,
}

impl Band {
    pub fn new<S: Into<String>>(name: S, grid: Grid, values: Vec<f64>) -> Result<Self, RasterError> {
        if values.len() != grid.len() {
            return Err(RasterError::Dimensions {
                expected: grid.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            grid,
            values: values.into_boxed_slice(),
        })
    }

    /// Returns a band with every pixel set to `value`.
    pub fn filled<S: Into<String>>(name: S, grid: Grid, value: f64) -> Self {
        Self {
            name: name.into(),
            grid,
            values: vec![value; grid.len()].into_boxed_slice(),
        }
    }

    /// Returns a band whose pixels are `f(pixel center)`, undefined
    /// where `f` returns `None`.
    pub fn from_fn<S, F>(name: S, grid: Grid, mut f: F) -> Self
    where
        S: Into<String>,
        F: FnMut(Coord<f64>) -> Option<f64>,
    {
        let values = (0..grid.len())
            .map(|index| f(grid.center_of(index)).unwrap_or(f64::NAN))
            .collect();
        Self {
            name: name.into(),
            grid,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Raw pixel values, `NaN` where undefined.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the value at linear `index` if defined.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().filter(|v| !v.is_nan())
    }

    /// Returns the value of the pixel containing `coord` if defined.
    pub fn sample(&self, coord: Coord<f64>) -> Option<f64> {
        self.grid
            .locate(coord)
            .and_then(|xy| self.get(self.grid.index(xy)))
    }

    pub fn is_defined(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Number of defined pixels.
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    /// Returns (min, max) over defined pixels.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((min, max)) => Some((f64::min(min, v), f64::max(max, v))),
            })
    }

    #[must_use]
    pub fn rename<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Applies `f` to every defined pixel.
    #[must_use]
    pub fn map<F: Fn(f64) -> f64>(mut self, f: F) -> Self {
        for value in self.values.iter_mut().filter(|v| !v.is_nan()) {
            *value = f(*value);
        }
        self
    }

    /// Returns `value * multiply + add` for every defined pixel.
    #[must_use]
    pub fn scale_offset(self, multiply: f64, add: f64) -> Self {
        self.map(|value| value.mul_add(multiply, add))
    }

    /// Masks every pixel whose center lies outside `region`.
    #[must_use]
    pub fn clip(mut self, region: &Region) -> Self {
        let grid = self.grid;
        for (index, value) in self.values.iter_mut().enumerate() {
            if !region.contains(grid.center_of(index)) {
                *value = f64::NAN;
            }
        }
        self
    }

    /// Masks every pixel where `mask` is undefined or zero.
    pub fn update_mask(mut self, mask: &Band) -> Result<Self, RasterError> {
        if mask.grid != self.grid {
            return Err(RasterError::GridMismatch(mask.name.clone()));
        }
        for (value, keep) in self.values.iter_mut().zip(mask.values.iter()) {
            if keep.is_nan() || *keep == 0.0 {
                *value = f64::NAN;
            }
        }
        Ok(self)
    }

    /// Nearest-neighbor resample onto `grid`.
    pub fn resample(&self, grid: &Grid) -> Self {
        if *grid == self.grid {
            return self.clone();
        }
        Self::from_fn(self.name.clone(), *grid, |center| self.sample(center))
    }

    /// Returns defined values for pixels inside `region`, taking every
    /// `stride`th column and row.
    pub fn values_in(&self, region: &Region, stride: usize) -> Vec<f64> {
        let stride = stride.max(1);
        let mut out = Vec::new();
        for row in (0..self.grid.rows()).step_by(stride) {
            for col in (0..self.grid.cols()).step_by(stride) {
                let index = self.grid.index((col, row));
                let value = self.values[index];
                if !value.is_nan() && region.contains(self.grid.center_of(index)) {
                    out.push(value);
                }
            }
        }
        out
    }
}
