use crate::{SampleTable, WorkflowError};
use forest::{Dataset, Explanation, ForestParams, RandomForest};
use log::{debug, info};
use raster::{Band, Stack};
use rayon::prelude::*;
use std::time::Instant;

/// A random forest predicting one table column from others.
#[derive(Debug, Clone)]
pub struct LstModel {
    target: String,
    predictors: Vec<String>,
    forest: RandomForest,
}

impl LstModel {
    /// Fits a forest predicting `target` from `predictors` over every
    /// row of `table`.
    pub fn train(
        table: &SampleTable,
        target: &str,
        predictors: &[String],
        params: &ForestParams,
    ) -> Result<Self, WorkflowError> {
        if table.is_empty() {
            return Err(WorkflowError::EmptyTrainingSet);
        }
        let target_index = table.column_index(target)?;
        let rows = predictor_rows(table, predictors)?;
        let targets = table
            .rows()
            .iter()
            .enumerate()
            .map(|(row, sample)| defined(sample.values[target_index], target, row))
            .collect::<Result<Vec<_>, _>>()?;

        let dataset = Dataset::new(predictors.to_vec(), rows, targets)?;
        let forest = RandomForest::fit(&dataset, params)?;
        info!(
            "trained {} trees predicting {target} from {predictors:?} on {} rows",
            forest.n_trees(),
            dataset.n_rows()
        );
        Ok(Self {
            target: target.to_string(),
            predictors: predictors.to_vec(),
            forest,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn predictors(&self) -> &[String] {
        &self.predictors
    }

    pub fn explain(&self) -> Explanation {
        self.forest.explain()
    }

    /// Predicts every row of `table`.
    pub fn classify_table(&self, table: &SampleTable) -> Result<Vec<f64>, WorkflowError> {
        let rows = predictor_rows(table, &self.predictors)?;
        Ok(self.forest.predict_batch(&rows)?)
    }

    /// Predicts every pixel of `stack` where the predictor bands are
    /// defined into a band named `output`. Other bands, the target
    /// included, may be undefined there.
    pub fn classify_stack(&self, stack: &Stack, output: &str) -> Result<Band, WorkflowError> {
        let bands = self
            .predictors
            .iter()
            .map(|name| stack.band(name))
            .collect::<Result<Vec<_>, _>>()?;
        let grid = *stack.grid();

        let now = Instant::now();
        let values = (0..grid.len())
            .into_par_iter()
            .map(|index| {
                if !bands.iter().all(|band| band.is_defined(index)) {
                    return Ok(f64::NAN);
                }
                let features: Vec<f64> = bands.iter().map(|band| band.values()[index]).collect();
                self.forest.predict(&features)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let duration = now.elapsed();
        debug!("classified {} pixels, {duration:?}", grid.len());

        Ok(Band::new(output, grid, values)?)
    }
}

fn defined(value: f64, column: &str, row: usize) -> Result<f64, WorkflowError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(WorkflowError::UndefinedValue {
            column: column.to_string(),
            row,
        })
    }
}

fn predictor_rows(table: &SampleTable, predictors: &[String]) -> Result<Vec<Vec<f64>>, WorkflowError> {
    let indices = predictors
        .iter()
        .map(|name| table.column_index(name))
        .collect::<Result<Vec<_>, _>>()?;
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(row, sample)| {
            indices
                .iter()
                .zip(predictors)
                .map(|(&i, name)| defined(sample.values[i], name, row))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::LstModel;
    use crate::{SampleRow, SampleTable, WorkflowError};
    use forest::ForestParams;
    use geo::geometry::Coord;
    use raster::{Band, Grid, Stack};

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn table() -> SampleTable {
        let rows = (0..60)
            .map(|i| {
                let x = f64::from(i);
                SampleRow {
                    coord: Coord { x, y: 0.0 },
                    // rain, LST, elevation
                    values: vec![x, 30.0 - 0.1 * x, 100.0],
                    random: None,
                }
            })
            .collect();
        SampleTable::new(names(&["rain", "LST", "elevation"]), rows)
    }

    #[test]
    fn test_train_and_classify() {
        let params = ForestParams::new(10).seed(5);
        let model =
            LstModel::train(&table(), "LST", &names(&["rain", "elevation"]), &params).unwrap();
        assert_eq!(model.explain().n_trees, 10);
        let predicted = model.classify_table(&table()).unwrap();
        assert_eq!(predicted.len(), 60);
        assert!((predicted[30] - 27.0).abs() < 1.0);

        let grid = Grid::new(0.0, 1.0, 1.0, 1.0, 3, 1).unwrap();
        let rain = Band::new("rain", grid, vec![10.0, f64::NAN, 50.0]).unwrap();
        let elevation = Band::filled("elevation", grid, 100.0);
        let stack = Stack::new(vec![rain, elevation]).unwrap();
        let band = model.classify_stack(&stack, "LST_Prediction").unwrap();
        assert_eq!(band.name(), "LST_Prediction");
        assert_eq!(band.get(1), None);
        assert!((band.get(0).unwrap() - 29.0).abs() < 1.0);
    }

    #[test]
    fn test_predicts_over_target_gaps() {
        let params = ForestParams::new(10).seed(5);
        let predictors = names(&["rain"]);
        let model = LstModel::train(&table(), "LST", &predictors, &params).unwrap();
        assert_eq!(model.predictors(), predictors.as_slice());

        let grid = Grid::new(0.0, 1.0, 1.0, 1.0, 3, 1).unwrap();
        let rain = Band::new("rain", grid, vec![10.0, 20.0, f64::NAN]).unwrap();
        let lst = Band::new("LST", grid, vec![29.0, f64::NAN, 25.0]).unwrap();
        let stack = Stack::new(vec![rain, lst]).unwrap();
        assert!(!stack.is_valid(1));

        let band = model.classify_stack(&stack, "LST_Prediction").unwrap();
        assert!((band.get(1).unwrap() - 28.0).abs() < 1.0);
        assert_eq!(band.get(2), None);
        assert_eq!(band.defined_count(), 2);
    }

    #[test]
    fn test_no_predictors() {
        assert!(matches!(
            LstModel::train(&table(), "LST", &[], &ForestParams::new(5)),
            Err(WorkflowError::Forest(forest::ForestError::NoVariables))
        ));
    }

    #[test]
    fn test_undefined_and_missing() {
        let params = ForestParams::new(2);
        let mut rows = table().rows().to_vec();
        rows[7].values[2] = f64::NAN;
        let broken = SampleTable::new(names(&["rain", "LST", "elevation"]), rows);
        assert!(matches!(
            LstModel::train(&broken, "LST", &names(&["rain", "elevation"]), &params),
            Err(WorkflowError::UndefinedValue { column, row: 7 }) if column == "elevation"
        ));
        assert!(matches!(
            LstModel::train(&table(), "LST", &names(&["pop"]), &params),
            Err(WorkflowError::MissingBand(_))
        ));
        let empty = SampleTable::new(names(&["rain", "LST"]), vec![]);
        assert!(matches!(
            LstModel::train(&empty, "LST", &names(&["rain"]), &params),
            Err(WorkflowError::EmptyTrainingSet)
        ));
    }
}
