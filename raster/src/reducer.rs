use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// An aggregation applied across images (per pixel) or across pixels
/// (per region).
///
/// Undefined (`NaN`) inputs are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Sum,
    Mean,
    Min,
    Max,
    /// Population standard deviation.
    StdDev,
    Count,
    Median,
    First,
}

impl Reducer {
    /// Name used as suffix for reduced outputs (`<band>_<name>`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::StdDev => "stdDev",
            Self::Count => "count",
            Self::Median => "median",
            Self::First => "first",
        }
    }

    /// Returns an empty accumulator for this reducer.
    pub fn accumulator(self) -> Accumulator {
        Accumulator {
            reducer: self,
            n: 0,
            sum: 0.0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            first: None,
            values: Vec::new(),
        }
    }

    /// Reduces `values`, returning `None` when no value is defined.
    ///
    /// [`Reducer::Count`] always returns a value.
    pub fn reduce<I: IntoIterator<Item = f64>>(self, values: I) -> Option<f64> {
        let mut acc = self.accumulator();
        for value in values {
            acc.push(value);
        }
        acc.finish()
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Reducer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "stdDev" | "std_dev" => Ok(Self::StdDev),
            "count" => Ok(Self::Count),
            "median" => Ok(Self::Median),
            "first" => Ok(Self::First),
            other => Err(format!("unknown reducer {other}")),
        }
    }
}

/// Streaming state for one [`Reducer`].
#[derive(Debug, Clone)]
pub struct Accumulator {
    reducer: Reducer,
    n: usize,
    sum: f64,
    // Welford running mean and sum of squared deviations.
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    first: Option<f64>,
    // Only populated for `Median`.
    values: Vec<f64>,
}

impl Accumulator {
    pub fn push(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.n += 1;
        self.sum += value;
        #[allow(clippy::cast_precision_loss)]
        let n = self.n as f64;
        let delta = value - self.mean;
        self.mean += delta / n;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.first.get_or_insert(value);
        if self.reducer == Reducer::Median {
            self.values.push(value);
        }
    }

    /// Number of defined values pushed so far.
    pub fn count(&self) -> usize {
        self.n
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn finish(&self) -> Option<f64> {
        if self.reducer == Reducer::Count {
            return Some(self.n as f64);
        }
        if self.n == 0 {
            return None;
        }
        let value = match self.reducer {
            Reducer::Sum => self.sum,
            Reducer::Mean => self.mean,
            Reducer::Min => self.min,
            Reducer::Max => self.max,
            Reducer::StdDev => (self.m2 / self.n as f64).sqrt(),
            Reducer::Count => self.n as f64,
            Reducer::First => self.first?,
            Reducer::Median => {
                let mut sorted = self.values.clone();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
        };
        Some(value)
    }
}
