use std::cmp::Ordering;

use tracing::debug;

use crate::error::{Error, Result};
use crate::{Matrix, Vector};

const MAX_SWEEPS: usize = 100;
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Eigendecomposition of a real symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues in descending order and the matching unit eigenvectors as columns.
/// Each eigenvector is signed so that its largest-magnitude component is positive.
pub fn symmetric_eigen(matrix: &Matrix) -> Result<(Vector, Matrix)> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(Error::Shape(
            "matrix must be square for eigenvalue decomposition".to_string(),
        ));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(Error::Numerical("matrix has non-finite entries".to_string()));
    }
    let scale = matrix.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);
    for i in 0..n {
        for j in (i + 1)..n {
            if (matrix[[i, j]] - matrix[[j, i]]).abs() > SYMMETRY_TOLERANCE * scale {
                return Err(Error::Numerical("matrix is not symmetric".to_string()));
            }
        }
    }

    let mut a = matrix.clone();
    let mut v = Matrix::eye(n);
    let total = a.iter().map(|x| x * x).sum::<f64>();
    let mut converged = n < 2;

    for sweep in 0..MAX_SWEEPS {
        let off = off_diagonal_norm(&a);
        if off <= f64::EPSILON * f64::EPSILON * total || off == 0.0 {
            debug!(sweep, "jacobi converged");
            converged = true;
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                rotate(&mut a, &mut v, p, q);
            }
        }
    }

    if !converged && off_diagonal_norm(&a) > 1e-20 * total {
        return Err(Error::Numerical(format!(
            "jacobi eigen solver did not converge in {MAX_SWEEPS} sweeps"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].partial_cmp(&a[[i, i]]).unwrap_or(Ordering::Equal));

    let eigenvalues: Vector = order.iter().map(|&i| a[[i, i]]).collect();
    let mut eigenvectors = Matrix::zeros((n, n));
    for (target, &source) in order.iter().enumerate() {
        let mut column = v.column(source).to_owned();
        let pivot = column
            .iter()
            .copied()
            .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
        if pivot < 0.0 {
            column.mapv_inplace(|x| -x);
        }
        eigenvectors.column_mut(target).assign(&column);
    }

    Ok((eigenvalues, eigenvectors))
}

fn off_diagonal_norm(a: &Matrix) -> f64 {
    let n = a.nrows();
    let mut sum = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                sum += a[[i, j]] * a[[i, j]];
            }
        }
    }
    sum
}

/// Applies the rotation in the (p, q) plane that zeroes `a[p][q]`, accumulating it in `v`.
fn rotate(a: &mut Matrix, v: &mut Matrix, p: usize, q: usize) {
    let apq = a[[p, q]];
    if apq == 0.0 {
        return;
    }
    let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
    let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
    let c = 1.0 / (t * t + 1.0).sqrt();
    let s = t * c;

    let n = a.nrows();
    for k in 0..n {
        let akp = a[[k, p]];
        let akq = a[[k, q]];
        a[[k, p]] = c * akp - s * akq;
        a[[k, q]] = s * akp + c * akq;
    }
    for k in 0..n {
        let apk = a[[p, k]];
        let aqk = a[[q, k]];
        a[[p, k]] = c * apk - s * aqk;
        a[[q, k]] = s * apk + c * aqk;
    }
    for k in 0..n {
        let vkp = v[[k, p]];
        let vkq = v[[k, q]];
        v[[k, p]] = c * vkp - s * vkq;
        v[[k, q]] = s * vkp + c * vkq;
    }
}
