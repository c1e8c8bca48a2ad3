use crate::WorkflowError;
use geo::geometry::Coord;
use log::info;
use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};
use raster::{Region, Stack};

/// One sampled pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    /// Pixel center.
    pub coord: Coord<f64>,
    /// Band values in column order.
    pub values: Vec<f64>,
    /// Uniform split key in [0, 1), once attached.
    pub random: Option<f64>,
}

/// Sampled pixels with one column per band.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleTable {
    columns: Vec<String>,
    rows: Vec<SampleRow>,
}

impl SampleTable {
    pub fn new(columns: Vec<String>, rows: Vec<SampleRow>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[SampleRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, WorkflowError> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| WorkflowError::MissingBand(name.to_string()))
    }

    /// Values of column `name`, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<f64>, WorkflowError> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row.values[index]).collect())
    }

    /// Attaches a uniform [0, 1) key to every row.
    #[must_use]
    pub fn random_column(mut self, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        for row in &mut self.rows {
            row.random = Some(rng.gen());
        }
        self
    }

    /// Partitions rows into (`random <= threshold`, `random >
    /// threshold`).
    pub fn split(&self, threshold: f64) -> Result<(Self, Self), WorkflowError> {
        if threshold.is_nan() {
            return Err(WorkflowError::InvalidThreshold(threshold));
        }
        let mut train = Vec::new();
        let mut test = Vec::new();
        for row in &self.rows {
            let random = row.random.ok_or(WorkflowError::MissingRandomColumn)?;
            if random <= threshold {
                train.push(row.clone());
            } else {
                test.push(row.clone());
            }
        }
        Ok((
            Self::new(self.columns.clone(), train),
            Self::new(self.columns.clone(), test),
        ))
    }
}

/// Draws up to `num_pixels` distinct valid pixels of `stack` whose
/// centers lie in `region`.
pub fn sample(
    stack: &Stack,
    region: &Region,
    num_pixels: usize,
    seed: u64,
) -> Result<SampleTable, WorkflowError> {
    let grid = stack.grid();
    let candidates: Vec<usize> = stack
        .valid_indices()
        .into_iter()
        .filter(|&index| region.contains(grid.center_of(index)))
        .collect();
    if candidates.is_empty() || num_pixels == 0 {
        return Err(WorkflowError::EmptySample);
    }

    let amount = num_pixels.min(candidates.len());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, candidates.len(), amount).into_vec();
    picked.sort_unstable();

    let rows = picked
        .into_iter()
        .map(|i| {
            let index = candidates[i];
            SampleRow {
                coord: grid.center_of(index),
                values: stack.pixel(index),
                random: None,
            }
        })
        .collect();
    info!(
        "sampled {amount} of {} valid pixels",
        candidates.len()
    );
    Ok(SampleTable::new(stack.band_names(), rows))
}

#[cfg(test)]
mod tests {
    use super::{sample, SampleRow, SampleTable};
    use crate::WorkflowError;
    use geo::geometry::Coord;
    use raster::{Band, Grid, Region, Stack};

    fn stack() -> Stack {
        let grid = Grid::new(0.0, 10.0, 1.0, 1.0, 10, 10).unwrap();
        let a = Band::from_fn("a", grid, |c| Some(c.x));
        // Odd columns masked.
        let b = Band::from_fn("b", grid, |c| ((c.x as usize) % 2 == 0).then_some(c.y));
        Stack::new(vec![a, b]).unwrap()
    }

    fn region() -> Region {
        Region::new(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]).unwrap()
    }

    #[test]
    fn test_sample_valid_without_replacement() {
        let table = sample(&stack(), &region(), 30, 1).unwrap();
        assert_eq!(table.len(), 30);
        assert_eq!(table.columns(), ["a", "b"]);
        let mut coords: Vec<(i64, i64)> = table
            .rows()
            .iter()
            .map(|row| ((row.coord.x * 2.0) as i64, (row.coord.y * 2.0) as i64))
            .collect();
        coords.sort_unstable();
        coords.dedup();
        assert_eq!(coords.len(), 30);
        assert!(table.column("b").unwrap().iter().all(|v| !v.is_nan()));

        // Asking for more than exists returns every valid pixel.
        assert_eq!(sample(&stack(), &region(), 10_000, 1).unwrap().len(), 50);
    }

    #[test]
    fn test_same_seed_same_split() {
        let split = |seed| {
            sample(&stack(), &region(), 40, seed)
                .unwrap()
                .random_column(seed + 1)
                .split(0.8)
                .unwrap()
        };
        assert_eq!(split(7), split(7));
        assert_ne!(split(7), split(8));
    }

    #[test]
    fn test_split_partitions() {
        let table = sample(&stack(), &region(), 50, 3).unwrap().random_column(4);
        let (train, test) = table.split(0.8).unwrap();
        assert_eq!(train.len() + test.len(), table.len());
        assert!(train.rows().iter().all(|r| r.random.unwrap() <= 0.8));
        assert!(test.rows().iter().all(|r| r.random.unwrap() > 0.8));
        for row in train.rows() {
            assert!(!test.rows().contains(row));
        }
        for row in table.rows() {
            let random = row.random.unwrap();
            assert!((0.0..1.0).contains(&random));
        }
    }

    #[test]
    fn test_errors() {
        let rows = vec![SampleRow {
            coord: Coord { x: 0.0, y: 0.0 },
            values: vec![1.0],
            random: None,
        }];
        let table = SampleTable::new(vec!["a".to_string()], rows);
        assert!(matches!(
            table.split(0.8),
            Err(WorkflowError::MissingRandomColumn)
        ));
        assert!(matches!(
            table.column("z"),
            Err(WorkflowError::MissingBand(_))
        ));

        let elsewhere = Region::new(&[(20.0, 20.0), (21.0, 20.0), (21.0, 21.0)]).unwrap();
        assert!(matches!(
            sample(&stack(), &elsewhere, 10, 0),
            Err(WorkflowError::EmptySample)
        ));
    }
}
