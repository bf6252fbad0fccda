use ndarray::Array2;

use crate::Labels;
use crate::error::{Error, Result};

pub fn accuracy_score(y_true: &Labels, y_pred: &Labels) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(Error::Shape("y_true and y_pred must have the same length".to_string()));
    }
    if y_true.is_empty() {
        return Err(Error::Shape("cannot score an empty label vector".to_string()));
    }

    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Counts with true classes on rows and predicted classes on columns, both in `classes`
/// order. Labels outside `classes` are not counted.
pub fn confusion_matrix(
    y_true: &Labels,
    y_pred: &Labels,
    classes: &[i64],
) -> Result<Array2<usize>> {
    if y_true.len() != y_pred.len() {
        return Err(Error::Shape("y_true and y_pred must have the same length".to_string()));
    }

    let mut counts = Array2::zeros((classes.len(), classes.len()));
    for (t, p) in y_true.iter().zip(y_pred) {
        let row = classes.iter().position(|c| c == t);
        let col = classes.iter().position(|c| c == p);
        if let (Some(row), Some(col)) = (row, col) {
            counts[[row, col]] += 1;
        }
    }
    Ok(counts)
}
