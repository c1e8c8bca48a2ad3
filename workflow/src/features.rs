use crate::WorkflowError;
use log::info;
use raster::{Band, Stack};

/// Stacks `layers` in order and masks every band where the `mask`
/// layer is undefined or zero.
pub fn assemble(layers: Vec<Band>, mask: &str) -> Result<Stack, WorkflowError> {
    let stack = Stack::new(layers)?;
    let mask = stack.band(mask)?.clone();
    let stack = stack.update_mask(&mask)?;
    info!(
        "assembled {:?}, {} valid pixels of {}",
        stack.band_names(),
        stack.valid_indices().len(),
        stack.grid().len()
    );
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::assemble;
    use crate::WorkflowError;
    use raster::{Band, Grid, RasterError};

    fn grid() -> Grid {
        Grid::new(0.0, 2.0, 1.0, 1.0, 2, 2).unwrap()
    }

    #[test]
    fn test_masked_by_population() {
        let rain = Band::new("rain", grid(), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let lst = Band::new("LST", grid(), vec![20.0, f64::NAN, 22.0, 23.0]).unwrap();
        let pop = Band::new("pop", grid(), vec![5.0, 5.0, 0.0, f64::NAN]).unwrap();
        let stack = assemble(vec![rain, lst, pop], "pop").unwrap();
        assert_eq!(stack.band_names(), vec!["rain", "LST", "pop"]);
        assert_eq!(stack.valid_indices(), vec![0]);
        assert_eq!(stack.band("rain").unwrap().get(2), None);
    }

    #[test]
    fn test_mismatched_grids() {
        let rain = Band::filled("rain", grid(), 1.0);
        let pop = Band::filled("pop", Grid::new(0.0, 2.0, 0.5, 0.5, 4, 4).unwrap(), 1.0);
        assert!(matches!(
            assemble(vec![rain, pop], "pop"),
            Err(WorkflowError::Raster(RasterError::GridMismatch(_)))
        ));
        let rain = Band::filled("rain", grid(), 1.0);
        assert!(matches!(
            assemble(vec![rain], "pop"),
            Err(WorkflowError::Raster(RasterError::MissingBand(_)))
        ));
    }
}
