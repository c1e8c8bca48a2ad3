use crate::{LstModel, SampleTable, WorkflowError};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Root-mean-squared error over (actual, predicted) pairs.
#[allow(clippy::cast_precision_loss)]
pub fn rmse(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    let sum_sq: f64 = pairs.iter().map(|(a, p)| (a - p) * (a - p)).sum();
    Some((sum_sq / pairs.len() as f64).sqrt())
}

/// Mean absolute error over (actual, predicted) pairs.
#[allow(clippy::cast_precision_loss)]
pub fn mae(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    let sum: f64 = pairs.iter().map(|(a, p)| (a - p).abs()).sum();
    Some(sum / pairs.len() as f64)
}

/// Least-squares line through (x, y) points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }
}

/// Fits `y = slope * x + intercept`. Returns `None` for fewer than two
/// points or when every x is equal.
#[allow(clippy::cast_precision_loss)]
pub fn linear_fit(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in points {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy == 0.0 {
        1.0
    } else {
        (sxy * sxy) / (sxx * syy)
    };
    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

/// Which sample rows the reported RMSE and MAE are computed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalTarget {
    /// The rows the model was fit on. Underestimates generalization
    /// error.
    #[default]
    Train,
    /// Held-out rows.
    Test,
}

impl fmt::Display for EvalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Train => f.write_str("train"),
            Self::Test => f.write_str("test"),
        }
    }
}

impl FromStr for EvalTarget {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "train" | "training" => Ok(Self::Train),
            "test" | "testing" => Ok(Self::Test),
            _ => Err(WorkflowError::InvalidEvalTarget(s.to_string())),
        }
    }
}

/// Error metrics over one set of rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub set: EvalTarget,
    pub rows: usize,
    pub rmse: f64,
    pub mae: f64,
}

impl Metrics {
    fn compute(set: EvalTarget, pairs: &[(f64, f64)]) -> Option<Self> {
        Some(Self {
            set,
            rows: pairs.len(),
            rmse: rmse(pairs)?,
            mae: mae(pairs)?,
        })
    }
}

/// Model accuracy on both partitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// The set reported as the headline metrics.
    pub target: EvalTarget,
    pub train: Metrics,
    /// `None` when the test partition is empty.
    pub test: Option<Metrics>,
    /// Test (actual, predicted) pairs.
    pub scatter: Vec<(f64, f64)>,
    /// Trendline through `scatter`.
    pub trendline: Option<LinearFit>,
}

impl Evaluation {
    /// Metrics for [`Evaluation::target`].
    pub fn selected(&self) -> Option<&Metrics> {
        match self.target {
            EvalTarget::Train => Some(&self.train),
            EvalTarget::Test => self.test.as_ref(),
        }
    }
}

/// Scores `model` on both partitions.
pub fn evaluate(
    model: &LstModel,
    train: &SampleTable,
    test: &SampleTable,
    target: EvalTarget,
) -> Result<Evaluation, WorkflowError> {
    if target == EvalTarget::Train {
        warn!("reporting metrics on the training set, which underestimates generalization error");
    }
    let train_pairs = pairs(model, train)?;
    let test_pairs = pairs(model, test)?;
    let train_metrics =
        Metrics::compute(EvalTarget::Train, &train_pairs).ok_or(WorkflowError::EmptyTrainingSet)?;
    let test_metrics = Metrics::compute(EvalTarget::Test, &test_pairs);
    if target == EvalTarget::Test && test_metrics.is_none() {
        return Err(WorkflowError::EmptyTestSet);
    }
    Ok(Evaluation {
        target,
        train: train_metrics,
        test: test_metrics,
        trendline: linear_fit(&test_pairs),
        scatter: test_pairs,
    })
}

fn pairs(model: &LstModel, table: &SampleTable) -> Result<Vec<(f64, f64)>, WorkflowError> {
    let actual = table.column(model.target())?;
    let predicted = model.classify_table(table)?;
    Ok(actual.into_iter().zip(predicted).collect())
}
