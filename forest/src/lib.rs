//! Random-forest regression with reproducible, seeded training.
//!
//! Each tree is grown on a bootstrap sample of the training rows and
//! considers a random subset of the variables at every split. Trees
//! are trained in parallel; tree `i` draws from an RNG seeded with
//! `seed + i`, so results don't depend on thread scheduling.

mod dataset;
mod error;
mod tree;

pub use crate::{dataset::Dataset, error::ForestError};
use crate::tree::{RegressionTree, TreeParams};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Instant};

/// Training options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,

    /// Variables tried at each split. Defaults to the floor of the
    /// square root of the number of variables.
    pub variables_per_split: Option<usize>,

    /// Smallest number of rows a leaf may hold.
    pub min_leaf_population: usize,

    /// Fraction of the training rows drawn, with replacement, for each
    /// tree.
    pub bag_fraction: f64,

    /// Maximum leaves per tree, unlimited if `None`.
    pub max_nodes: Option<usize>,

    #[serde(skip)]
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 50,
            variables_per_split: None,
            min_leaf_population: 1,
            bag_fraction: 0.5,
            max_nodes: None,
            seed: 0,
        }
    }
}

impl ForestParams {
    pub fn new(n_trees: usize) -> Self {
        Self {
            n_trees,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    #[must_use]
    pub fn variables_per_split(self, variables_per_split: usize) -> Self {
        Self {
            variables_per_split: Some(variables_per_split),
            ..self
        }
    }

    #[must_use]
    pub fn min_leaf_population(self, min_leaf_population: usize) -> Self {
        Self {
            min_leaf_population,
            ..self
        }
    }

    #[must_use]
    pub fn bag_fraction(self, bag_fraction: f64) -> Self {
        Self {
            bag_fraction,
            ..self
        }
    }

    #[must_use]
    pub fn max_nodes(self, max_nodes: usize) -> Self {
        Self {
            max_nodes: Some(max_nodes),
            ..self
        }
    }

    fn tree_params(&self, n_features: usize) -> Result<TreeParams, ForestError> {
        if self.n_trees == 0 {
            return Err(ForestError::Params("n_trees must be at least 1"));
        }
        if self.min_leaf_population == 0 {
            return Err(ForestError::Params("min_leaf_population must be at least 1"));
        }
        if !(self.bag_fraction > 0.0 && self.bag_fraction <= 1.0) {
            return Err(ForestError::Params("bag_fraction must be in (0, 1]"));
        }
        if self.max_nodes == Some(0) {
            return Err(ForestError::Params("max_nodes must be at least 1"));
        }
        let variables_per_split = match self.variables_per_split {
            Some(0) => return Err(ForestError::Params("variables_per_split must be at least 1")),
            Some(k) => k.min(n_features),
            None => sqrt_floor(n_features).max(1).min(n_features),
        };
        Ok(TreeParams {
            variables_per_split,
            min_leaf_population: self.min_leaf_population,
            max_leaves: self.max_nodes,
        })
    }
}

fn sqrt_floor(n: usize) -> usize {
    let mut root = 0;
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}

/// A trained regression forest.
#[derive(Debug, Clone)]
pub struct RandomForest {
    names: Vec<String>,
    trees: Vec<RegressionTree>,
    importance: Vec<f64>,
    oob_rmse: Option<f64>,
    params: ForestParams,
}

/// Summary of a trained forest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub n_trees: usize,
    pub variables: Vec<String>,
    /// Share of the total squared-error reduction per variable.
    pub importance: BTreeMap<String, f64>,
    pub out_of_bag_rmse: Option<f64>,
    pub params: ForestParams,
}

impl RandomForest {
    /// Trains a forest on `data`.
    pub fn fit(data: &Dataset, params: &ForestParams) -> Result<Self, ForestError> {
        let tree_params = params.tree_params(data.n_features())?;
        let n_rows = data.n_rows();
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let bag_size = ((params.bag_fraction * n_rows as f64).ceil() as usize).clamp(1, n_rows);

        let now = Instant::now();
        let grown: Vec<(RegressionTree, Vec<bool>)> = (0..params.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let mut in_bag = vec![false; n_rows];
                let sample: Vec<usize> = (0..bag_size)
                    .map(|_| {
                        let row = rng.gen_range(0..n_rows);
                        in_bag[row] = true;
                        row
                    })
                    .collect();
                let tree = RegressionTree::fit(data, &sample, &tree_params, &mut rng);
                (tree, in_bag)
            })
            .collect();
        let duration = now.elapsed();
        debug!(
            "fit {} trees on {n_rows} rows x {} variables, bag size {bag_size}, {duration:?}",
            params.n_trees,
            data.n_features()
        );

        let oob_rmse = out_of_bag_rmse(data, &grown);
        let mut importance = vec![0.0; data.n_features()];
        for (tree, _) in &grown {
            for (total, gain) in importance.iter_mut().zip(tree.importance()) {
                *total += gain;
            }
        }
        let total: f64 = importance.iter().sum();
        if total > 0.0 {
            for value in &mut importance {
                *value /= total;
            }
        }

        Ok(Self {
            names: data.names().to_vec(),
            trees: grown.into_iter().map(|(tree, _)| tree).collect(),
            importance,
            oob_rmse,
            params: *params,
        })
    }

    /// Returns the mean of every tree's prediction for `features`.
    pub fn predict(&self, features: &[f64]) -> Result<f64, ForestError> {
        if features.len() != self.names.len() {
            return Err(ForestError::Width {
                row: 0,
                expected: self.names.len(),
                actual: features.len(),
            });
        }
        if let Some(column) = features.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::NonFinite {
                row: 0,
                column: self.names[column].clone(),
            });
        }
        Ok(self.predict_unchecked(features))
    }

    /// Predicts every row in parallel, preserving order.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ForestError> {
        rows.par_iter()
            .enumerate()
            .map(|(row, features)| {
                self.predict(features).map_err(|err| match err {
                    ForestError::Width {
                        expected, actual, ..
                    } => ForestError::Width {
                        row,
                        expected,
                        actual,
                    },
                    ForestError::NonFinite { column, .. } => {
                        ForestError::NonFinite { row, column }
                    }
                    other => other,
                })
            })
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn predict_unchecked(&self, features: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict(features)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn explain(&self) -> Explanation {
        Explanation {
            n_trees: self.trees.len(),
            variables: self.names.clone(),
            importance: self
                .names
                .iter()
                .cloned()
                .zip(self.importance.iter().copied())
                .collect(),
            out_of_bag_rmse: self.oob_rmse,
            params: self.params,
        }
    }
}

/// RMSE over rows left out of at least one tree's bag, each predicted
/// by only the trees that did not see it.
#[allow(clippy::cast_precision_loss)]
fn out_of_bag_rmse(data: &Dataset, grown: &[(RegressionTree, Vec<bool>)]) -> Option<f64> {
    let mut sum_sq = 0.0;
    let mut n = 0_usize;
    for row in 0..data.n_rows() {
        let features = data.row(row);
        let (total, count) = grown
            .iter()
            .filter(|(_, in_bag)| !in_bag[row])
            .fold((0.0, 0_usize), |(total, count), (tree, _)| {
                (total + tree.predict(features), count + 1)
            });
        if count > 0 {
            let err = total / count as f64 - data.target(row);
            sum_sq += err * err;
            n += 1;
        }
    }
    (n > 0).then(|| (sum_sq / n as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::{sqrt_floor, Dataset, ForestError, ForestParams, RandomForest};
    use approx::assert_abs_diff_eq;

    fn linear(n: usize) -> Dataset {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..n {
            let x = (i % 20) as f64;
            let y = (i / 20) as f64;
            rows.push(vec![x, y, 0.0]);
            targets.push(2.0 * x + y);
        }
        Dataset::new(
            vec!["rain".to_string(), "elevation".to_string(), "pop".to_string()],
            rows,
            targets,
        )
        .unwrap()
    }

    #[test]
    fn test_same_seed_same_forest() {
        let data = linear(200);
        let params = ForestParams::new(10).seed(42);
        let a = RandomForest::fit(&data, &params).unwrap();
        let b = RandomForest::fit(&data, &params).unwrap();
        let probe = [[3.5, 4.0, 0.0], [17.0, 1.0, 0.0], [0.0, 9.0, 0.0]];
        for features in probe {
            assert_eq!(a.predict(&features), b.predict(&features));
        }
        assert_eq!(a.explain(), b.explain());
    }

    #[test]
    fn test_fits_linear_function() {
        let data = linear(200);
        let forest = RandomForest::fit(&data, &ForestParams::default().seed(1)).unwrap();
        assert_eq!(forest.n_trees(), 50);
        let predicted = forest.predict(&[10.0, 5.0, 0.0]).unwrap();
        assert_abs_diff_eq!(predicted, 25.0, epsilon = 3.0);

        let explanation = forest.explain();
        assert!(explanation.out_of_bag_rmse.is_some());
        assert!(explanation.importance["rain"] > explanation.importance["elevation"]);
        assert_eq!(explanation.importance["pop"], 0.0);
        let total: f64 = explanation.importance.values().sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_predict_batch_matches_predict() {
        let data = linear(100);
        let forest = RandomForest::fit(&data, &ForestParams::new(5)).unwrap();
        let rows: Vec<Vec<f64>> = (0..10).map(|i| data.row(i * 7).to_vec()).collect();
        let batch = forest.predict_batch(&rows).unwrap();
        for (features, predicted) in rows.iter().zip(batch) {
            assert_eq!(forest.predict(features).unwrap(), predicted);
        }
        assert_eq!(
            forest.predict_batch(&[vec![1.0, 2.0, 3.0], vec![1.0]]),
            Err(ForestError::Width {
                row: 1,
                expected: 3,
                actual: 1
            })
        );
        assert_eq!(
            forest.predict(&[1.0, f64::NAN, 3.0]),
            Err(ForestError::NonFinite {
                row: 0,
                column: "elevation".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_params() {
        let data = linear(20);
        for params in [
            ForestParams::new(0),
            ForestParams::default().bag_fraction(0.0),
            ForestParams::default().bag_fraction(1.5),
            ForestParams::default().min_leaf_population(0),
            ForestParams::default().variables_per_split(0),
            ForestParams::default().max_nodes(0),
        ] {
            assert!(matches!(
                RandomForest::fit(&data, &params),
                Err(ForestError::Params(_))
            ));
        }
    }

    #[test]
    fn test_sqrt_floor() {
        assert_eq!(sqrt_floor(0), 0);
        assert_eq!(sqrt_floor(3), 1);
        assert_eq!(sqrt_floor(4), 2);
        assert_eq!(sqrt_floor(15), 3);
    }
}
