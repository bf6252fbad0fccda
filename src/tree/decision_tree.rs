use ndarray::ArrayView1;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use tracing::info;

use super::{ClassWeight, Targets, argmax_labels, class_weights};
use crate::error::{Error, Result};
use crate::linear_model::Classifier;
use crate::{Labels, Matrix};

const IMPURITY_EPSILON: f64 = 1e-12;

/// Number of candidate features drawn at every split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaxFeatures {
    All,
    /// `floor(sqrt(n_features))`, at least 1.
    Sqrt,
    Count(usize),
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => ((n_features as f64).sqrt() as usize).max(1),
            MaxFeatures::Count(k) => k.clamp(1, n_features),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }
}

#[derive(Clone, Debug)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Weighted class proportions, in class-index order.
        distribution: Vec<f64>,
    },
}

struct Candidate {
    feature: usize,
    threshold: f64,
    /// Weighted Gini impurity of both children, `sum(w_child * gini_child)`.
    impurity: f64,
}

/// A fitted tree over class indices. Nodes live in one vector; the root is node 0.
#[derive(Clone, Debug)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
    n_features: usize,
    depth: usize,
}

impl Tree {
    /// Grows a tree on `rows` of `x`. `targets` and `weights` are indexed by row of `x`;
    /// every row in `rows` must carry a positive weight.
    pub fn grow(
        x: &Matrix,
        targets: &[usize],
        weights: &[f64],
        rows: Vec<usize>,
        n_classes: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = x.ncols();
        let n_candidates = params.max_features.resolve(n_features);
        let mut nodes = vec![Node::Leaf {
            distribution: Vec::new(),
        }];
        let mut stack = vec![(0, rows, 0)];
        let mut depth = 0;

        while let Some((id, rows, level)) = stack.pop() {
            depth = depth.max(level);
            let mut totals = vec![0.0; n_classes];
            for &i in &rows {
                totals[targets[i]] += weights[i];
            }
            let weight: f64 = totals.iter().sum();
            let impurity = weight * gini(&totals, weight);

            let splittable = params.max_depth.is_none_or(|d| level < d)
                && rows.len() >= params.min_samples_split
                && rows.len() >= 2 * params.min_samples_leaf
                && impurity > IMPURITY_EPSILON;
            let split = if splittable {
                let features = index::sample(rng, n_features, n_features).into_vec();
                let search = SplitSearch {
                    features: &features,
                    n_candidates,
                    min_samples_leaf: params.min_samples_leaf,
                };
                search
                    .best(x, targets, weights, &rows, &totals)
                    .filter(|c| c.impurity < impurity - IMPURITY_EPSILON)
            } else {
                None
            };

            match split {
                Some(c) => {
                    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
                        rows.into_iter().partition(|&i| x[[i, c.feature]] <= c.threshold);
                    let left = nodes.len();
                    nodes.push(Node::Leaf {
                        distribution: Vec::new(),
                    });
                    nodes.push(Node::Leaf {
                        distribution: Vec::new(),
                    });
                    nodes[id] = Node::Split {
                        feature: c.feature,
                        threshold: c.threshold,
                        left,
                        right: left + 1,
                    };
                    stack.push((left + 1, right_rows, level + 1));
                    stack.push((left, left_rows, level + 1));
                }
                None => {
                    let distribution = totals
                        .iter()
                        .map(|t| if weight > 0.0 { t / weight } else { 0.0 })
                        .collect();
                    nodes[id] = Node::Leaf { distribution };
                }
            }
        }

        Self {
            nodes,
            n_features,
            depth,
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Class proportions of the leaf `row` falls into.
    pub fn distribution(&self, row: ArrayView1<f64>) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => id = if row[*feature] <= *threshold { *left } else { *right },
                Node::Leaf { distribution } => return distribution,
            }
        }
    }

    /// Adds this tree's leaf proportions for every row of `x` into `proba`.
    pub fn accumulate(&self, x: &Matrix, proba: &mut Matrix) {
        for (row, mut out) in x.rows().into_iter().zip(proba.rows_mut()) {
            out.iter_mut()
                .zip(self.distribution(row))
                .for_each(|(o, p)| *o += p);
        }
    }
}

fn gini(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

/// Features in random order; the search stops once `n_candidates` of them vary over the
/// node's rows, so constant features never use up the draw.
struct SplitSearch<'a> {
    features: &'a [usize],
    n_candidates: usize,
    min_samples_leaf: usize,
}

impl SplitSearch<'_> {
    fn best(
        &self,
        x: &Matrix,
        targets: &[usize],
        weights: &[f64],
        rows: &[usize],
        totals: &[f64],
    ) -> Option<Candidate> {
        let total_weight: f64 = totals.iter().sum();
        let mut order = rows.to_vec();
        let mut best: Option<Candidate> = None;
        let mut visited = 0;

        for &feature in self.features {
            if visited == self.n_candidates {
                break;
            }
            order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));
            let (first, last) = (order[0], order[order.len() - 1]);
            if x[[first, feature]] == x[[last, feature]] {
                continue;
            }
            visited += 1;

            let mut left = vec![0.0; totals.len()];
            let mut left_weight = 0.0;
            for (n, pair) in order.windows(2).enumerate() {
                let (i, next) = (pair[0], pair[1]);
                left[targets[i]] += weights[i];
                left_weight += weights[i];

                let n_left = n + 1;
                let (value, next_value) = (x[[i, feature]], x[[next, feature]]);
                if value == next_value
                    || n_left < self.min_samples_leaf
                    || order.len() - n_left < self.min_samples_leaf
                {
                    continue;
                }

                // w * gini = w - sum(c^2) / w
                let right_weight = total_weight - left_weight;
                let left_sq: f64 = left.iter().map(|l| l * l).sum();
                let right_sq: f64 =
                    totals.iter().zip(&left).map(|(t, l)| (t - l).powi(2)).sum();
                let impurity = (left_weight - left_sq / left_weight)
                    + (right_weight - right_sq / right_weight);

                if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                    let midpoint = 0.5 * (value + next_value);
                    let threshold = if midpoint < next_value { midpoint } else { value };
                    best = Some(Candidate {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }
}

/// Single CART classification tree.
#[derive(Clone, Debug)]
pub struct DecisionTreeClassifier {
    pub classes: Option<Vec<i64>>,
    tree: Option<Tree>,
    params: TreeParams,
    class_weight: ClassWeight,
    seed: u64,
}

impl DecisionTreeClassifier {
    pub fn new() -> Self {
        Self {
            classes: None,
            tree: None,
            params: TreeParams::default(),
            class_weight: ClassWeight::Uniform,
            seed: 42,
        }
    }

    /// A depth of 0 is a single leaf.
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

    pub fn class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Seeds the feature draws; only matters when `max_features` is not `All`.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(Tree::depth)
    }

    pub fn n_leaves(&self) -> Option<usize> {
        self.tree.as_ref().map(Tree::n_leaves)
    }

    /// Class probabilities, one column per entry of `classes`.
    pub fn predict_proba(&self, x: &Matrix) -> Result<Matrix> {
        let tree = self.tree.as_ref().ok_or(Error::NotFitted("DecisionTreeClassifier"))?;
        let classes = self.classes.as_ref().ok_or(Error::NotFitted("DecisionTreeClassifier"))?;
        check_width(x, tree.n_features())?;

        let mut proba = Matrix::zeros((x.nrows(), classes.len()));
        tree.accumulate(x, &mut proba);
        Ok(proba)
    }
}

pub(crate) fn check_width(x: &Matrix, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(Error::Shape(format!(
            "number of features in X ({}) doesn't match training data ({})",
            x.ncols(),
            n_features
        )));
    }
    Ok(())
}

impl Classifier for DecisionTreeClassifier {
    fn fit(&mut self, x: &Matrix, y: &Labels) -> Result<()> {
        let targets = Targets::new(x, y)?;
        let class_weight = class_weights(&targets.counts(), self.class_weight);
        let weights: Vec<f64> = targets.indices.iter().map(|&k| class_weight[k]).collect();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let tree = Tree::grow(
            x,
            &targets.indices,
            &weights,
            targets.rows.clone(),
            targets.classes.len(),
            &self.params,
            &mut rng,
        );

        info!(
            classes = targets.classes.len(),
            samples = targets.rows.len(),
            depth = tree.depth(),
            leaves = tree.n_leaves(),
            "trained DecisionTreeClassifier"
        );
        self.classes = Some(targets.classes);
        self.tree = Some(tree);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Labels> {
        let proba = self.predict_proba(x)?;
        let classes = self.classes.as_ref().ok_or(Error::NotFitted("DecisionTreeClassifier"))?;
        Ok(argmax_labels(&proba, classes))
    }
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new()
    }
}
