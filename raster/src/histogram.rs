use crate::{Band, RasterError, Region};
use serde::Serialize;

/// Equal-width frequency counts of a band's defined pixels within a
/// region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub name: String,

    /// Lower edge of the first bucket.
    pub min: f64,

    pub bucket_width: f64,

    pub counts: Vec<u64>,
}

impl Histogram {
    /// Buckets `band` over `region` into at most `max_buckets`
    /// buckets spanning the observed [min, max].
    pub fn compute(band: &Band, region: &Region, max_buckets: usize) -> Result<Self, RasterError> {
        if max_buckets == 0 {
            return Err(RasterError::InvalidBuckets);
        }
        let values = band.values_in(region, 1);
        let (min, max) = values
            .iter()
            .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .ok_or_else(|| RasterError::EmptyBand(band.name().to_string()))?;

        if max == min {
            return Ok(Self {
                name: band.name().to_string(),
                min,
                bucket_width: 1.0,
                counts: vec![values.len() as u64],
            });
        }

        #[allow(clippy::cast_precision_loss)]
        let bucket_width = (max - min) / max_buckets as f64;
        let mut counts = vec![0_u64; max_buckets];
        for value in values {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let bucket = ((value - min) / bucket_width).floor() as usize;
            counts[bucket.min(max_buckets - 1)] += 1;
        }
        Ok(Self {
            name: band.name().to_string(),
            min,
            bucket_width,
            counts,
        })
    }

    /// Total number of pixels counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Returns (lower edge, count) per bucket.
    #[allow(clippy::cast_precision_loss)]
    pub fn buckets(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| (self.min + i as f64 * self.bucket_width, count))
    }
}

#[cfg(test)]
mod tests {
    use super::{Histogram, RasterError};
    use crate::{Band, Grid, Region};

    fn grid() -> Grid {
        Grid::new(0.0, 10.0, 1.0, 1.0, 10, 10).unwrap()
    }

    #[test]
    fn test_counts_sum_to_pixels_in_region() {
        let band = Band::from_fn("elevation", grid(), |c| {
            (c.x < 9.0).then_some(c.x * c.y)
        });
        let triangle = Region::new(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)]).unwrap();
        let expected = band.values_in(&triangle, 1).len() as u64;
        for buckets in [1, 7, 50, 100] {
            let histogram = Histogram::compute(&band, &triangle, buckets).unwrap();
            assert_eq!(histogram.counts.len(), buckets);
            assert_eq!(histogram.total(), expected);
        }
    }

    #[test]
    fn test_constant_band() {
        let region = Region::new(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]).unwrap();
        let histogram = Histogram::compute(&Band::filled("rain", grid(), 3.0), &region, 100).unwrap();
        assert_eq!(histogram.counts, vec![100]);
        assert_eq!(histogram.buckets().next(), Some((3.0, 100)));
    }

    #[test]
    fn test_errors() {
        let region = Region::new(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]).unwrap();
        let empty = Band::filled("rain", grid(), f64::NAN);
        assert_eq!(
            Histogram::compute(&empty, &region, 10),
            Err(RasterError::EmptyBand("rain".to_string()))
        );
        assert_eq!(
            Histogram::compute(&Band::filled("rain", grid(), 1.0), &region, 0),
            Err(RasterError::InvalidBuckets)
        );
    }
}
