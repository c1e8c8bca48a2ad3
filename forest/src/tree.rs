use crate::Dataset;
use rand::{rngs::StdRng, seq::SliceRandom};

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub variables_per_split: usize,
    pub min_leaf_population: usize,
    pub max_leaves: Option<usize>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A regression tree stored as a flat arena; node 0 is the root.
#[derive(Debug, Clone)]
pub(crate) struct RegressionTree {
    nodes: Vec<Node>,
    /// Total squared-error reduction credited to each feature.
    importance: Vec<f64>,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Grows a tree on `sample`, a list of row indices into `data`
    /// which may contain repeats.
    pub fn fit(data: &Dataset, sample: &[usize], params: &TreeParams, rng: &mut StdRng) -> Self {
        let mut indices = sample.to_vec();
        let mut nodes = vec![Node::Leaf {
            value: mean_target(data, &indices),
        }];
        let mut importance = vec![0.0; data.n_features()];
        let mut features: Vec<usize> = (0..data.n_features()).collect();
        let mut leaves = 1;

        // (node, start, end) ranges of `indices` still to be split.
        let mut pending = vec![(0, 0, indices.len())];
        while let Some((node, start, end)) = pending.pop() {
            if params.max_leaves.is_some_and(|max| leaves >= max) {
                break;
            }
            let rows = &mut indices[start..end];
            if rows.len() < 2 * params.min_leaf_population || is_pure(data, rows) {
                continue;
            }

            // Fall back to the remaining variables when none of the
            // drawn ones can split this node.
            features.shuffle(rng);
            let (drawn, rest) = features.split_at(params.variables_per_split);
            let Some(split) = best_split(data, rows, drawn, params.min_leaf_population)
                .or_else(|| best_split(data, rows, rest, params.min_leaf_population))
            else {
                continue;
            };

            let mid = partition(rows, |row| data.value(row, split.feature) <= split.threshold);
            if mid == 0 || mid == rows.len() {
                continue;
            }

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf {
                value: mean_target(data, &rows[..mid]),
            });
            nodes.push(Node::Leaf {
                value: mean_target(data, &rows[mid..]),
            });
            nodes[node] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            importance[split.feature] += split.gain;
            leaves += 1;

            pending.push((right, start + mid, end));
            pending.push((left, start, start + mid));
        }

        Self { nodes, importance }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut node = &self.nodes[0];
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        &self.nodes[*left]
                    } else {
                        &self.nodes[*right]
                    };
                }
            }
        }
    }

    pub fn importance(&self) -> &[f64] {
        &self.importance
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_target(data: &Dataset, rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&row| data.target(row)).sum::<f64>() / rows.len() as f64
}

fn is_pure(data: &Dataset, rows: &[usize]) -> bool {
    let first = data.target(rows[0]);
    rows.iter().all(|&row| data.target(row) == first)
}

/// Finds the threshold with the largest reduction in squared error
/// among `candidates`, leaving at least `min_leaf` rows on each side.
#[allow(clippy::cast_precision_loss)]
fn best_split(
    data: &Dataset,
    rows: &[usize],
    candidates: &[usize],
    min_leaf: usize,
) -> Option<Split> {
    let n = rows.len();
    let total: f64 = rows.iter().map(|&row| data.target(row)).sum();
    let baseline = total * total / n as f64;

    let mut best: Option<Split> = None;
    let mut order = rows.to_vec();
    for &feature in candidates {
        order.sort_unstable_by(|&a, &b| data.value(a, feature).total_cmp(&data.value(b, feature)));

        let mut left_sum = 0.0;
        for i in 0..n - 1 {
            left_sum += data.target(order[i]);
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let lo = data.value(order[i], feature);
            let hi = data.value(order[i + 1], feature);
            if lo == hi {
                continue;
            }
            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64
                - baseline;
            if gain > 0.0 && best.as_ref().map_or(true, |b| gain > b.gain) {
                let mut threshold = lo + (hi - lo) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(Split {
                    feature,
                    threshold,
                    gain,
                });
            }
        }
    }
    best
}

/// Moves rows for which `goes_left` holds to the front, returning how
/// many there are.
fn partition<F: Fn(usize) -> bool>(rows: &mut [usize], goes_left: F) -> usize {
    let mut mid = 0;
    for i in 0..rows.len() {
        if goes_left(rows[i]) {
            rows.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::{partition, RegressionTree, TreeParams};
    use crate::Dataset;
    use rand::{rngs::StdRng, SeedableRng};

    fn step_data() -> Dataset {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i), 0.0]).collect();
        let targets = (0..20).map(|i| if i < 10 { 1.0 } else { 5.0 }).collect();
        Dataset::new(vec!["x".to_string(), "noise".to_string()], rows, targets).unwrap()
    }

    #[test]
    fn test_learns_step() {
        let data = step_data();
        let sample: Vec<usize> = (0..data.n_rows()).collect();
        let params = TreeParams {
            variables_per_split: 2,
            min_leaf_population: 1,
            max_leaves: None,
        };
        let tree = RegressionTree::fit(&data, &sample, &params, &mut StdRng::seed_from_u64(7));
        assert_eq!(tree.predict(&[3.0, 0.0]), 1.0);
        assert_eq!(tree.predict(&[15.0, 0.0]), 5.0);
        assert_eq!(tree.n_leaves(), 2);
        assert!(tree.importance()[0] > 0.0);
        assert_eq!(tree.importance()[1], 0.0);
    }

    #[test]
    fn test_max_leaves() {
        let rows: Vec<Vec<f64>> = (0..32).map(|i| vec![f64::from(i)]).collect();
        let targets = (0..32).map(f64::from).collect();
        let data = Dataset::new(vec!["x".to_string()], rows, targets).unwrap();
        let sample: Vec<usize> = (0..data.n_rows()).collect();
        let params = TreeParams {
            variables_per_split: 1,
            min_leaf_population: 1,
            max_leaves: Some(4),
        };
        let tree = RegressionTree::fit(&data, &sample, &params, &mut StdRng::seed_from_u64(7));
        assert_eq!(tree.n_leaves(), 4);
    }

    #[test]
    fn test_partition() {
        let mut rows = vec![5, 1, 4, 2, 3];
        let mid = partition(&mut rows, |row| row <= 2);
        assert_eq!(mid, 2);
        assert!(rows[..mid].iter().all(|&row| row <= 2));
        assert!(rows[mid..].iter().all(|&row| row > 2));
    }
}
