use crate::{RasterError, Region};
use geo::geometry::{Coord, Rect};
use num_traits::ToPrimitive;

/// Meters per degree of latitude.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// A north-up lattice of pixels.
///
/// Pixel `(col, row)` spans `[west + col * dx, west + (col + 1) * dx)`
/// in longitude and `(north - (row + 1) * dy, north - row * dy]` in
/// latitude. Rows run north to south.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    west: f64,
    north: f64,
    dx: f64,
    dy: f64,
    cols: usize,
    rows: usize,
}

impl Grid {
    pub fn new(
        west: f64,
        north: f64,
        dx: f64,
        dy: f64,
        cols: usize,
        rows: usize,
    ) -> Result<Self, RasterError> {
        if !(dx.is_finite() && dx > 0.0 && dy.is_finite() && dy > 0.0) {
            return Err(RasterError::InvalidGrid(format!(
                "pixel size ({dx}, {dy}) must be positive"
            )));
        }
        if cols == 0 || rows == 0 {
            return Err(RasterError::InvalidGrid(format!(
                "dimensions ({cols}, {rows}) must be non-zero"
            )));
        }
        if !(west.is_finite() && north.is_finite()) {
            return Err(RasterError::InvalidGrid(format!(
                "origin ({west}, {north}) must be finite"
            )));
        }
        Ok(Self {
            west,
            north,
            dx,
            dy,
            cols,
            rows,
        })
    }

    /// Returns a grid covering `region`'s bounding box with pixels
    /// roughly `scale_m` meters on a side at the region's center
    /// latitude.
    pub fn for_region(region: &Region, scale_m: f64) -> Result<Self, RasterError> {
        if !(scale_m.is_finite() && scale_m > 0.0) {
            return Err(RasterError::InvalidGrid(format!(
                "scale {scale_m} must be positive"
            )));
        }
        let bounds = region.bounds();
        let center_lat = bounds.center().y;
        let dy = scale_m / METERS_PER_DEGREE;
        let dx = scale_m / (METERS_PER_DEGREE * center_lat.to_radians().cos().max(1e-6));
        let mk_err = || RasterError::InvalidGrid(format!("scale {scale_m} is too fine"));
        let cols = (bounds.width() / dx).ceil().to_usize().ok_or_else(mk_err)?;
        let rows = (bounds.height() / dy).ceil().to_usize().ok_or_else(mk_err)?;
        Self::new(
            bounds.min().x,
            bounds.max().y,
            dx,
            dy,
            cols.max(1),
            rows.max(1),
        )
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Pixel width in degrees.
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Pixel height in degrees.
    pub fn dy(&self) -> f64 {
        self.dy
    }

    /// Returns the number of pixels.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    /// Returns the area covered by this grid.
    #[allow(clippy::cast_precision_loss)]
    pub fn bounds(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.west,
                y: self.north - self.rows as f64 * self.dy,
            },
            Coord {
                x: self.west + self.cols as f64 * self.dx,
                y: self.north,
            },
        )
    }

    /// Returns the center of pixel `(col, row)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn center(&self, (col, row): (usize, usize)) -> Coord<f64> {
        Coord {
            x: self.west + (col as f64 + 0.5) * self.dx,
            y: self.north - (row as f64 + 0.5) * self.dy,
        }
    }

    /// Returns the center of the pixel at linear `index`.
    pub fn center_of(&self, index: usize) -> Coord<f64> {
        self.center(self.position(index))
    }

    /// Returns the pixel containing `coord`, if any.
    pub fn locate(&self, coord: Coord<f64>) -> Option<(usize, usize)> {
        let col = ((coord.x - self.west) / self.dx).floor();
        let row = ((self.north - coord.y) / self.dy).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col.to_usize()?, row.to_usize()?);
        (col < self.cols && row < self.rows).then_some((col, row))
    }

    pub fn index(&self, (col, row): (usize, usize)) -> usize {
        row * self.cols + col
    }

    pub fn position(&self, index: usize) -> (usize, usize) {
        (index % self.cols, index / self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::{Coord, Grid, RasterError, Region, METERS_PER_DEGREE};
    use approx::assert_relative_eq;

    #[test]
    fn test_for_region() {
        let region = Region::coastal_zhejiang();
        let grid = Grid::for_region(&region, 1000.0).unwrap();
        assert_relative_eq!(grid.dy(), 1000.0 / METERS_PER_DEGREE);
        assert!(grid.dx() > grid.dy());
        // 2.5 degrees of latitude at ~1km.
        assert_eq!(grid.rows(), 279);
        let bounds = grid.bounds();
        assert!(bounds.min().x <= 120.75 && bounds.max().x >= 122.25);
        assert!(bounds.min().y <= 27.75 && bounds.max().y >= 30.25);
        assert!(matches!(
            Grid::for_region(&region, 0.0),
            Err(RasterError::InvalidGrid(_))
        ));
    }

    #[test]
    fn test_locate_center_roundtrip() {
        let grid = Grid::new(10.0, 20.0, 0.5, 0.25, 4, 3).unwrap();
        for index in 0..grid.len() {
            let center = grid.center_of(index);
            assert_eq!(grid.locate(center), Some(grid.position(index)));
        }
        assert_eq!(grid.center((0, 0)), Coord { x: 10.25, y: 19.875 });
        assert_eq!(grid.locate(Coord { x: 9.9, y: 19.9 }), None);
        assert_eq!(grid.locate(Coord { x: 12.1, y: 19.9 }), None);
        assert_eq!(grid.locate(Coord { x: 10.1, y: 19.2 }), None);
    }
}
