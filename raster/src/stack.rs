use crate::{reduce_region, Band, Grid, RasterError, Reducer, Region, RegionLimits, RegionStats};

/// Bands sharing a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    grid: Grid,
    bands: Vec<Band>,
}

impl Stack {
    pub fn new(bands: Vec<Band>) -> Result<Self, RasterError> {
        let grid = *bands.first().ok_or(RasterError::EmptyStack)?.grid();
        for (i, band) in bands.iter().enumerate() {
            if *band.grid() != grid {
                return Err(RasterError::GridMismatch(band.name().to_string()));
            }
            if bands[..i].iter().any(|other| other.name() == band.name()) {
                return Err(RasterError::DuplicateBand(band.name().to_string()));
            }
        }
        Ok(Self { grid, bands })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<String> {
        self.bands.iter().map(|b| b.name().to_string()).collect()
    }

    pub fn band(&self, name: &str) -> Result<&Band, RasterError> {
        self.bands
            .iter()
            .find(|b| b.name() == name)
            .ok_or_else(|| RasterError::MissingBand(name.to_string()))
    }

    /// Masks every band where `mask` is undefined or zero.
    pub fn update_mask(self, mask: &Band) -> Result<Self, RasterError> {
        let grid = self.grid;
        let bands = self
            .bands
            .into_iter()
            .map(|band| band.update_mask(mask))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { grid, bands })
    }

    /// Returns true if every band is defined at `index`.
    pub fn is_valid(&self, index: usize) -> bool {
        self.bands.iter().all(|band| band.is_defined(index))
    }

    /// Linear indices of pixels where every band is defined.
    pub fn valid_indices(&self) -> Vec<usize> {
        (0..self.grid.len())
            .filter(|&index| self.is_valid(index))
            .collect()
    }

    /// Band values at `index`, in band order.
    pub fn pixel(&self, index: usize) -> Vec<f64> {
        self.bands
            .iter()
            .map(|band| band.values()[index])
            .collect()
    }

    /// Reduces every band over `region`, merging the named outputs.
    pub fn reduce_region(
        &self,
        region: &Region,
        reducers: &[Reducer],
        limits: RegionLimits,
    ) -> Result<RegionStats, RasterError> {
        let mut stats = RegionStats::new();
        for band in &self.bands {
            stats.extend(reduce_region(band, region, reducers, limits)?);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::{Band, Grid, RasterError, Stack};

    fn grid() -> Grid {
        Grid::new(0.0, 2.0, 1.0, 1.0, 2, 2).unwrap()
    }

    #[test]
    fn test_new_validates() {
        assert_eq!(Stack::new(vec![]), Err(RasterError::EmptyStack));
        let a = Band::filled("a", grid(), 1.0);
        let other = Band::filled("b", Grid::new(0.0, 2.0, 0.5, 0.5, 4, 4).unwrap(), 1.0);
        assert_eq!(
            Stack::new(vec![a.clone(), other]),
            Err(RasterError::GridMismatch("b".to_string()))
        );
        assert_eq!(
            Stack::new(vec![a.clone(), a]),
            Err(RasterError::DuplicateBand("a".to_string()))
        );
    }

    #[test]
    fn test_valid_pixels() {
        let a = Band::new("a", grid(), vec![1.0, f64::NAN, 3.0, 4.0]).unwrap();
        let b = Band::new("b", grid(), vec![5.0, 6.0, 7.0, f64::NAN]).unwrap();
        let mask = Band::new("m", grid(), vec![1.0, 1.0, 0.0, 1.0]).unwrap();
        let stack = Stack::new(vec![a, b]).unwrap();
        assert_eq!(stack.valid_indices(), vec![0, 2]);
        let stack = stack.update_mask(&mask).unwrap();
        assert_eq!(stack.valid_indices(), vec![0]);
        assert_eq!(stack.pixel(0), vec![1.0, 5.0]);
        assert_eq!(stack.band_names(), vec!["a", "b"]);
        assert!(stack.band("c").is_err());
    }
}
