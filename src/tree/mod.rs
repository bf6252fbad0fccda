//! CART classification trees grown on the weighted Gini criterion.
//!
//! - `DecisionTreeClassifier`: a single tree
//!
//! Trees split on `x[feature] <= threshold`, with thresholds halfway between consecutive
//! distinct training values. Leaves store weighted class proportions, so the same tree
//! serves `predict` and `predict_proba`. Rows labelled with the unknown sentinel are left
//! out of training.
//!
//! # Example
//! ```rust
//! use geochange::{Classifier, DecisionTreeClassifier};
//! use ndarray::array;
//!
//! let x = array![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 1.0]];
//! let y = array![0, 0, 1, 1, 2, 2];
//!
//! let mut tree = DecisionTreeClassifier::new().max_depth(3);
//! tree.fit(&x, &y).unwrap();
//! assert_eq!(tree.predict(&x).unwrap(), y);
//! ```

mod decision_tree;

pub use decision_tree::{DecisionTreeClassifier, MaxFeatures};
pub(crate) use decision_tree::{Tree, TreeParams, check_width};

use ndarray::Axis;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::schema::UNKNOWN_LABEL;
use crate::{Labels, Matrix};

/// Weighting of classes in the split criterion and in leaf proportions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassWeight {
    /// Every sample counts once.
    #[default]
    Uniform,
    /// Each class weighs `n_samples / (n_classes * class_count)`, so every class carries
    /// the same total weight.
    Balanced,
}

/// Per-class weights in class-index order, from the number of training rows per class.
pub fn class_weights(counts: &[usize], mode: ClassWeight) -> Vec<f64> {
    match mode {
        ClassWeight::Uniform => vec![1.0; counts.len()],
        ClassWeight::Balanced => {
            let n_samples: usize = counts.iter().sum();
            let n_classes = counts.iter().filter(|&&c| c > 0).count();
            counts
                .iter()
                .map(|&c| {
                    if c == 0 {
                        0.0
                    } else {
                        n_samples as f64 / (n_classes * c) as f64
                    }
                })
                .collect()
        }
    }
}

/// Training labels mapped to class indices.
pub(crate) struct Targets {
    pub classes: Vec<i64>,
    /// Class index per row of `x`; meaningless for rows outside `rows`.
    pub indices: Vec<usize>,
    /// Rows with a known label.
    pub rows: Vec<usize>,
}

impl Targets {
    pub fn new(x: &Matrix, y: &Labels) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(Error::Shape("number of samples in X and y must match".to_string()));
        }
        if x.ncols() == 0 {
            return Err(Error::Shape("X has no feature columns".to_string()));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::Numerical(
                "X contains non-finite values, standardise it first".to_string(),
            ));
        }

        let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] != UNKNOWN_LABEL).collect();
        let skipped = y.len() - rows.len();
        if skipped > 0 {
            warn!(skipped, "rows with an unknown label left out of training");
        }
        if rows.is_empty() {
            return Err(Error::Shape("no rows with a known label".to_string()));
        }

        let mut classes: Vec<i64> = rows.iter().map(|&i| y[i]).collect();
        classes.sort_unstable();
        classes.dedup();

        let indices = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or(0))
            .collect();
        Ok(Self {
            classes,
            indices,
            rows,
        })
    }

    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.classes.len()];
        for &i in &self.rows {
            counts[self.indices[i]] += 1;
        }
        counts
    }
}

/// Most probable class per row; ties go to the earlier class.
pub(crate) fn argmax_labels(proba: &Matrix, classes: &[i64]) -> Labels {
    proba
        .axis_iter(Axis(0))
        .map(|row| {
            let best = row
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (k, &p)| {
                    if p > best.1 { (k, p) } else { best }
                });
            classes[best.0]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn balanced_weights_equalise_class_totals() {
        let weights = class_weights(&[9, 3], ClassWeight::Balanced);
        assert_abs_diff_eq!(weights[0], 12.0 / 18.0, epsilon = 1e-12);
        assert_abs_diff_eq!(weights[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(weights[0] * 9.0, weights[1] * 3.0, epsilon = 1e-12);

        assert_eq!(class_weights(&[9, 3], ClassWeight::Uniform), vec![1.0, 1.0]);
    }

    #[test]
    fn targets_skip_unknown_rows() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let targets = Targets::new(&x, &array![5, UNKNOWN_LABEL, 1, 5]).unwrap();
        assert_eq!(targets.classes, vec![1, 5]);
        assert_eq!(targets.rows, vec![0, 2, 3]);
        assert_eq!(targets.counts(), vec![1, 2]);
        assert_eq!(targets.indices[3], 1);
    }

    #[test]
    fn targets_reject_bad_input() {
        assert!(Targets::new(&array![[1.0], [2.0]], &array![0]).is_err());
        assert!(Targets::new(&array![[f64::NAN], [2.0]], &array![0, 1]).is_err());
        assert!(Targets::new(&array![[1.0]], &array![UNKNOWN_LABEL]).is_err());
    }
}
