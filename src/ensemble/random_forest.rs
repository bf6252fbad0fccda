use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::linear_model::Classifier;
use crate::tree::{
    ClassWeight, MaxFeatures, Targets, Tree, TreeParams, argmax_labels, check_width, class_weights,
};
use crate::{Labels, Matrix};

/// Random forest classifier.
///
/// Every tree is grown on a bootstrap sample of the known-label rows, drawing
/// `max_features` candidate features at each split. Bootstrap multiplicities are folded
/// into the sample weights together with the class weights, and `predict_proba` averages
/// the trees' leaf proportions. One `seed` fixes the whole forest.
#[derive(Clone, Debug)]
pub struct RandomForestClassifier {
    pub classes: Option<Vec<i64>>,
    trees: Vec<Tree>,
    n_estimators: usize,
    params: TreeParams,
    bootstrap: bool,
    class_weight: ClassWeight,
    seed: u64,
}

impl RandomForestClassifier {
    pub fn new() -> Self {
        Self {
            classes: None,
            trees: Vec::new(),
            n_estimators: 100,
            params: TreeParams {
                max_features: MaxFeatures::Sqrt,
                ..TreeParams::default()
            },
            bootstrap: true,
            class_weight: ClassWeight::Uniform,
            seed: 42,
        }
    }

    pub fn n_estimators(mut self, n_estimators: usize) -> Self {
        if n_estimators == 0 {
            panic!("n_estimators must be positive");
        }
        self.n_estimators = n_estimators;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.params.max_depth = Some(max_depth);
        self
    }

    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        if min_samples_split < 2 {
            panic!("min_samples_split must be at least 2, got {}", min_samples_split);
        }
        self.params.min_samples_split = min_samples_split;
        self
    }

    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        if min_samples_leaf == 0 {
            panic!("min_samples_leaf must be positive");
        }
        self.params.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn max_features(mut self, max_features: MaxFeatures) -> Self {
        self.params.max_features = max_features;
        self
    }

    pub fn bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the trees' class proportions, one column per entry of `classes`.
    pub fn predict_proba(&self, x: &Matrix) -> Result<Matrix> {
        let classes = self.classes.as_ref().ok_or(Error::NotFitted("RandomForestClassifier"))?;
        check_width(x, self.trees.first().map(Tree::n_features).unwrap_or(0))?;

        let mut proba = Matrix::zeros((x.nrows(), classes.len()));
        for tree in &self.trees {
            tree.accumulate(x, &mut proba);
        }
        proba /= self.trees.len() as f64;
        Ok(proba)
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, x: &Matrix, y: &Labels) -> Result<()> {
        let targets = Targets::new(x, y)?;
        let class_weight = class_weights(&targets.counts(), self.class_weight);
        let n = targets.rows.len();
        let mut master = StdRng::seed_from_u64(self.seed);

        let mut trees = Vec::with_capacity(self.n_estimators);
        for t in 0..self.n_estimators {
            let mut rng = StdRng::seed_from_u64(master.next_u64());

            let mut draws = vec![0usize; x.nrows()];
            if self.bootstrap {
                for _ in 0..n {
                    draws[targets.rows[rng.gen_range(0..n)]] += 1;
                }
            } else {
                targets.rows.iter().for_each(|&i| draws[i] = 1);
            }

            let weights: Vec<f64> = draws
                .iter()
                .zip(&targets.indices)
                .map(|(&d, &k)| d as f64 * class_weight[k])
                .collect();
            let rows: Vec<usize> = targets
                .rows
                .iter()
                .copied()
                .filter(|&i| weights[i] > 0.0)
                .collect();

            let tree = Tree::grow(
                x,
                &targets.indices,
                &weights,
                rows,
                targets.classes.len(),
                &self.params,
                &mut rng,
            );
            debug!(tree = t, depth = tree.depth(), leaves = tree.n_leaves(), "grew tree");
            trees.push(tree);
        }

        info!(
            trees = trees.len(),
            classes = targets.classes.len(),
            samples = n,
            class_weight = ?self.class_weight,
            "trained RandomForestClassifier"
        );
        self.classes = Some(targets.classes);
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Labels> {
        let proba = self.predict_proba(x)?;
        let classes = self.classes.as_ref().ok_or(Error::NotFitted("RandomForestClassifier"))?;
        Ok(argmax_labels(&proba, classes))
    }
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array, array};
    use ndarray_rand::RandomExt;
    use ndarray_rand::rand_distr::Normal;

    fn blobs(offset: f64) -> (Matrix, Labels) {
        let noise = Array::random((90, 4), Normal::new(0.0, 0.3).unwrap());
        let mut x = noise + offset;
        let mut y = Labels::zeros(90);
        for i in 0..90 {
            let class = i % 3;
            x[[i, class]] += 3.0;
            y[i] = class as i64;
        }
        (x, y)
    }

    #[test]
    fn test_forest_separates_blobs() {
        let (x, y) = blobs(0.0);
        let mut forest = RandomForestClassifier::new().n_estimators(20).max_depth(6);
        forest.fit(&x, &y).unwrap();

        assert_eq!(forest.n_trees(), 20);
        assert!(forest.score(&x, &y).unwrap() > 0.95);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = blobs(0.0);
        let fit = |seed| {
            let mut forest = RandomForestClassifier::new().n_estimators(10).seed(seed);
            forest.fit(&x, &y).unwrap();
            forest.predict_proba(&x).unwrap()
        };

        assert_eq!(fit(7), fit(7));
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = blobs(1.0);
        let mut forest = RandomForestClassifier::new().n_estimators(5);
        forest.fit(&x, &y).unwrap();

        let proba = forest.predict_proba(&x).unwrap();
        for row in proba.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_balanced_class_weight() {
        let x = Matrix::zeros((12, 2));
        let y = Labels::from_iter((0..12).map(|i| if i < 9 { 4 } else { 7 }));
        let forest = |weight| {
            let mut forest = RandomForestClassifier::new()
                .n_estimators(3)
                .bootstrap(false)
                .max_depth(0)
                .class_weight(weight);
            forest.fit(&x, &y).unwrap();
            forest.predict_proba(&array![[0.0, 0.0]]).unwrap()
        };

        let uniform = forest(ClassWeight::Uniform);
        assert_abs_diff_eq!(uniform[[0, 0]], 0.75, epsilon = 1e-12);

        let balanced = forest(ClassWeight::Balanced);
        assert_abs_diff_eq!(balanced[[0, 0]], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(balanced[[0, 1]], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_balanced_forest_recovers_minority_class() {
        // 40 rows of class 0 against 8 of class 1
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            rows.push([i as f64 * 0.1, 0.0]);
            labels.push(0);
        }
        for i in 0..8 {
            rows.push([10.0 + i as f64 * 0.1, 1.0]);
            labels.push(1);
        }
        let x = Matrix::from_shape_fn((rows.len(), 2), |(i, j)| rows[i][j]);
        let y = Labels::from(labels);

        let mut forest = RandomForestClassifier::new()
            .n_estimators(15)
            .max_depth(20)
            .class_weight(ClassWeight::Balanced);
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.predict(&array![[10.4, 1.0], [1.0, 0.0]]).unwrap(), array![1, 0]);
    }

    #[test]
    fn test_predict_without_fit() {
        let forest = RandomForestClassifier::new();
        assert!(matches!(
            forest.predict(&array![[1.0]]),
            Err(Error::NotFitted(_))
        ));
    }

    #[test]
    fn test_invalid_n_estimators() {
        std::panic::catch_unwind(|| {
            RandomForestClassifier::new().n_estimators(0);
        })
        .expect_err("Should panic on zero estimators");
    }
}
