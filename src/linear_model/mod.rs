//! Classifiers consuming encoded feature matrices.
//!
//! [`Classifier`] is the fit/predict boundary the pipeline hands matrices across; any model
//! that maps a feature matrix to integer change-type codes can sit behind it.
//!
//! - `LinearSVC`: one-vs-rest linear support vector machine
//!
//! # Example
//! ```rust
//! use geochange::{Classifier, LinearSVC};
//! use ndarray::array;
//!
//! let x = array![[0.0, 0.1], [0.2, 0.0], [5.0, 5.1], [5.2, 4.9], [-5.0, 5.0], [-5.1, 4.8]];
//! let y = array![0, 0, 1, 1, 2, 2];
//!
//! let mut model = LinearSVC::new().learning_rate(0.1).max_epochs(200);
//! model.fit(&x, &y).unwrap();
//! let predictions = model.predict(&x).unwrap();
//! assert_eq!(predictions.len(), 6);
//! ```

mod svm;

pub use svm::LinearSVC;

use crate::error::Result;
use crate::metrics::accuracy_score;
use crate::{Labels, Matrix};

pub trait Classifier {
    fn fit(&mut self, x: &Matrix, y: &Labels) -> Result<()>;

    fn predict(&self, x: &Matrix) -> Result<Labels>;

    /// Mean accuracy on `(x, y)`.
    fn score(&self, x: &Matrix, y: &Labels) -> Result<f64> {
        let predictions = self.predict(x)?;
        accuracy_score(y, &predictions)
    }
}
