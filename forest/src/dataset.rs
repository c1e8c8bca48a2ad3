use crate::ForestError;

/// Training rows with one regression target each.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl Dataset {
    /// Returns a dataset after checking that every row has one value
    /// per variable name and that all values are finite.
    pub fn new(
        names: Vec<String>,
        rows: Vec<Vec<f64>>,
        targets: Vec<f64>,
    ) -> Result<Self, ForestError> {
        if names.is_empty() {
            return Err(ForestError::NoVariables);
        }
        if rows.is_empty() {
            return Err(ForestError::Empty);
        }
        if rows.len() != targets.len() {
            return Err(ForestError::LengthMismatch {
                rows: rows.len(),
                targets: targets.len(),
            });
        }
        for (row, values) in rows.iter().enumerate() {
            if values.len() != names.len() {
                return Err(ForestError::Width {
                    row,
                    expected: names.len(),
                    actual: values.len(),
                });
            }
            if let Some(column) = values.iter().position(|v| !v.is_finite()) {
                return Err(ForestError::NonFinite {
                    row,
                    column: names[column].clone(),
                });
            }
            if !targets[row].is_finite() {
                return Err(ForestError::NonFinite {
                    row,
                    column: "target".to_string(),
                });
            }
        }
        Ok(Self {
            names,
            rows,
            targets,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn value(&self, index: usize, feature: usize) -> f64 {
        self.rows[index][feature]
    }

    pub fn target(&self, index: usize) -> f64 {
        self.targets[index]
    }

}
