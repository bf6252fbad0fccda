use ndarray::Axis;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use super::Classifier;
use crate::error::{Error, Result};
use crate::schema::UNKNOWN_LABEL;
use crate::{Labels, Matrix, Vector};

/// One-vs-rest linear SVM trained by stochastic sub-gradient descent on the L2-regularised
/// hinge loss. Rows labelled [`UNKNOWN_LABEL`] are ignored during `fit`.
#[derive(Clone, Debug)]
pub struct LinearSVC {
    pub classes: Option<Vec<i64>>,
    /// One weight row per class, in `classes` order.
    pub coefficients: Option<Matrix>,
    pub intercepts: Option<Vector>,
    c: f64,
    learning_rate: f64,
    max_epochs: usize,
    tolerance: f64,
    seed: u64,
}

impl LinearSVC {
    pub fn new() -> Self {
        Self {
            classes: None,
            coefficients: None,
            intercepts: None,
            c: 1.0,
            learning_rate: 0.01,
            max_epochs: 50,
            tolerance: 1e-4,
            seed: 42,
        }
    }

    pub fn c(mut self, c: f64) -> Self {
        if c <= 0.0 {
            panic!("C must be positive, got {}", c);
        }
        self.c = c;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        if learning_rate <= 0.0 {
            panic!("learning_rate must be positive, got {}", learning_rate);
        }
        self.learning_rate = learning_rate;
        self
    }

    pub fn max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn decision_function(&self, x: &Matrix) -> Result<Matrix> {
        let coefficients = self.coefficients.as_ref().ok_or(Error::NotFitted("LinearSVC"))?;
        let intercepts = self.intercepts.as_ref().ok_or(Error::NotFitted("LinearSVC"))?;

        if x.ncols() != coefficients.ncols() {
            return Err(Error::Shape(format!(
                "number of features in X ({}) doesn't match training data ({})",
                x.ncols(),
                coefficients.ncols()
            )));
        }

        Ok(x.dot(&coefficients.t()) + &intercepts.view().insert_axis(Axis(0)))
    }

    fn training_rows(&self, x: &Matrix, y: &Labels) -> Result<Vec<usize>> {
        if x.nrows() != y.len() {
            return Err(Error::Shape("number of samples in X and y must match".to_string()));
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
        Ok(rows)
    }

    fn hinge_loss(
        &self,
        x: &Matrix,
        y: &Labels,
        rows: &[usize],
        weights: &Matrix,
        bias: &Vector,
        classes: &[i64],
    ) -> f64 {
        let mut loss = 0.0;
        for &i in rows {
            let xi = x.row(i);
            for (k, &class) in classes.iter().enumerate() {
                let target = if y[i] == class { 1.0 } else { -1.0 };
                let margin = target * (weights.row(k).dot(&xi) + bias[k]);
                loss += (1.0 - margin).max(0.0);
            }
        }
        let penalty = 0.5 * weights.iter().map(|w| w * w).sum::<f64>();
        penalty + self.c * loss
    }
}

impl Classifier for LinearSVC {
    fn fit(&mut self, x: &Matrix, y: &Labels) -> Result<()> {
        let rows = self.training_rows(x, y)?;

        let mut classes: Vec<i64> = rows.iter().map(|&i| y[i]).collect();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(Error::Shape(format!(
                "LinearSVC needs at least 2 classes, found {}",
                classes.len()
            )));
        }

        let n_samples = rows.len() as f64;
        let lambda = 1.0 / (self.c * n_samples);
        let mut weights = Matrix::zeros((classes.len(), x.ncols()));
        let mut bias = Vector::zeros(classes.len());
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut order = rows.clone();
        let mut step = 0_usize;
        let mut prev_loss = f64::INFINITY;

        for epoch in 0..self.max_epochs {
            order.shuffle(&mut rng);
            for &i in &order {
                step += 1;
                let eta = self.learning_rate / (1.0 + self.learning_rate * lambda * step as f64);
                let xi = x.row(i);
                for (k, &class) in classes.iter().enumerate() {
                    let target = if y[i] == class { 1.0 } else { -1.0 };
                    let margin = target * (weights.row(k).dot(&xi) + bias[k]);
                    let mut w = weights.row_mut(k);
                    w *= 1.0 - eta * lambda;
                    if margin < 1.0 {
                        w.scaled_add(eta * target, &xi);
                        bias[k] += eta * target;
                    }
                }
            }

            let loss = self.hinge_loss(x, y, &rows, &weights, &bias, &classes);
            if loss.is_nan() || loss.is_infinite() {
                return Err(Error::Numerical("sub-gradient descent diverged".to_string()));
            }
            debug!(epoch, loss, "LinearSVC epoch");
            if (prev_loss - loss).abs() <= self.tolerance * prev_loss.abs().max(1.0) {
                break;
            }
            prev_loss = loss;
        }

        info!(classes = classes.len(), samples = rows.len(), c = self.c, "trained LinearSVC");
        self.classes = Some(classes);
        self.coefficients = Some(weights);
        self.intercepts = Some(bias);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Labels> {
        let scores = self.decision_function(x)?;
        let classes = self.classes.as_ref().ok_or(Error::NotFitted("LinearSVC"))?;

        let predictions = scores
            .axis_iter(Axis(0))
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (k, &s)| {
                        if s > best.1 { (k, s) } else { best }
                    });
                classes[best.0]
            })
            .collect();
        Ok(predictions)
    }
}

impl Default for LinearSVC {
    fn default() -> Self {
        Self::new()
    }
}
