use crate::RasterError;
use geo::{
    geometry::{Coord, LineString, Polygon, Rect},
    Area, BoundingRect, Intersects,
};

/// Vertices of the coastal Zhejiang study area as (lon, lat).
pub const COASTAL_ZHEJIANG: [(f64, f64); 4] = [
    (120.75, 27.75),
    (122.25, 27.75),
    (122.25, 30.25),
    (120.75, 30.25),
];

/// Area of interest in WGS84 (lon, lat) degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    polygon: Polygon<f64>,
    bounds: Rect<f64>,
}

impl Region {
    /// Returns a region bounded by `vertices`.
    ///
    /// The ring is closed if the last vertex does not repeat the
    /// first.
    pub fn new(vertices: &[(f64, f64)]) -> Result<Self, RasterError> {
        for &(lon, lat) in vertices {
            if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
                return Err(RasterError::InvalidRegion(format!(
                    "({lon}, {lat}) is outside WGS84 range"
                )));
            }
        }

        let mut distinct: Vec<(f64, f64)> = Vec::with_capacity(vertices.len());
        for vertex in vertices {
            if !distinct.contains(vertex) {
                distinct.push(*vertex);
            }
        }
        if distinct.len() < 3 {
            return Err(RasterError::InvalidRegion(format!(
                "need at least 3 distinct vertices, got {}",
                distinct.len()
            )));
        }

        // `Polygon::new` closes the exterior ring.
        let polygon = Polygon::new(LineString::from(vertices.to_vec()), vec![]);
        let bounds = polygon
            .bounding_rect()
            .ok_or_else(|| RasterError::InvalidRegion("empty polygon".to_string()))?;
        if polygon.unsigned_area() <= 0.0 {
            return Err(RasterError::InvalidRegion("polygon has no area".to_string()));
        }
        Ok(Self { polygon, bounds })
    }

    /// The coastal Zhejiang, China study area.
    pub fn coastal_zhejiang() -> Self {
        let polygon = Polygon::new(LineString::from(COASTAL_ZHEJIANG.to_vec()), vec![]);
        let bounds = Rect::new(
            Coord { x: 120.75, y: 27.75 },
            Coord { x: 122.25, y: 30.25 },
        );
        Self { polygon, bounds }
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Returns the region's bounding box.
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Returns true if `coord` is inside or on the boundary of this
    /// region.
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        self.bounds.intersects(&coord) && self.polygon.intersects(&coord)
    }

    /// Returns true if `rect` overlaps this region.
    pub fn overlaps(&self, rect: &Rect<f64>) -> bool {
        self.bounds.intersects(rect) && self.polygon.intersects(rect)
    }

    /// Returns the closed exterior ring as (lon, lat) pairs.
    pub fn ring(&self) -> Vec<(f64, f64)> {
        self.polygon
            .exterior()
            .coords()
            .map(|coord| (coord.x, coord.y))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Coord, RasterError, Rect, Region, COASTAL_ZHEJIANG};

    #[test]
    fn test_closes_ring() {
        let region = Region::new(&COASTAL_ZHEJIANG).unwrap();
        let ring = region.ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(region, Region::coastal_zhejiang());
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(matches!(
            Region::new(&[(0.0, 0.0), (181.0, 0.0), (0.0, 1.0)]),
            Err(RasterError::InvalidRegion(_))
        ));
        assert!(matches!(
            Region::new(&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]),
            Err(RasterError::InvalidRegion(_))
        ));
        assert!(matches!(
            Region::new(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]),
            Err(RasterError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_contains() {
        let triangle = Region::new(&[(0.0, 0.0), (2.0, 0.0), (0.0, 2.0)]).unwrap();
        assert!(triangle.contains(Coord { x: 0.5, y: 0.5 }));
        assert!(triangle.contains(Coord { x: 1.0, y: 0.0 }));
        assert!(!triangle.contains(Coord { x: 1.5, y: 1.5 }));
        assert!(!triangle.contains(Coord { x: -0.1, y: 0.5 }));
        assert!(triangle.overlaps(&Rect::new(
            Coord { x: 1.0, y: 0.5 },
            Coord { x: 3.0, y: 3.0 }
        )));
        assert!(!triangle.overlaps(&Rect::new(
            Coord { x: 1.5, y: 1.5 },
            Coord { x: 3.0, y: 3.0 }
        )));
    }
}
