use ndarray::{Axis, s};
use tracing::{debug, info};

use super::eigen::symmetric_eigen;
use crate::error::{Error, Result};
use crate::preprocessing::StandardScaler;
use crate::{Matrix, Vector};

/// Everything derived from one standardisation pass over a matrix.
#[derive(Clone, Debug)]
pub struct PcaBasis {
    /// Per-column means used for standardisation.
    pub mean: Vector,
    /// Per-column standard deviations used for standardisation.
    pub scale: Vector,
    /// Covariance of the standardised columns.
    pub covariance: Matrix,
    /// Eigenvalues of `covariance`, descending.
    pub eigenvalues: Vector,
    /// Eigenvectors as columns, in `eigenvalues` order.
    pub eigenvectors: Matrix,
}

impl PcaBasis {
    pub fn fit(x: &Matrix) -> Result<Self> {
        if x.nrows() < 2 || x.ncols() == 0 {
            return Err(Error::Shape(format!(
                "PCA needs at least two samples and one feature, got {}x{}",
                x.nrows(),
                x.ncols()
            )));
        }

        let mut scaler = StandardScaler::new();
        let standardized = scaler.fit_transform(x)?;
        let covariance = covariance(&standardized);
        let (eigenvalues, eigenvectors) = symmetric_eigen(&covariance)?;

        let (mean, scale) = match (scaler.mean, scaler.scale) {
            (Some(mean), Some(scale)) => (mean, scale),
            _ => return Err(Error::NotFitted("StandardScaler")),
        };

        debug!(features = x.ncols(), leading = eigenvalues[0], "fitted PCA basis");
        Ok(Self {
            mean,
            scale,
            covariance,
            eigenvalues,
            eigenvectors,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Share of the total variance carried by each component, descending.
    pub fn explained_variance_ratio(&self) -> Vector {
        let total = self.eigenvalues.sum();
        if total > 0.0 {
            &self.eigenvalues / total
        } else {
            Vector::zeros(self.eigenvalues.len())
        }
    }

    /// Standardises `x` with this basis' statistics and projects it onto the top `k` eigenvectors.
    pub fn project(&self, x: &Matrix, k: usize) -> Result<Matrix> {
        check_components(k, self.n_features())?;
        if x.ncols() != self.n_features() {
            return Err(Error::Shape(format!(
                "number of features in X ({}) doesn't match the basis ({})",
                x.ncols(),
                self.n_features()
            )));
        }

        let scaler = StandardScaler {
            mean: Some(self.mean.clone()),
            scale: Some(self.scale.clone()),
        };
        let standardized = scaler.transform(x)?;
        Ok(standardized.dot(&self.eigenvectors.slice(s![.., ..k])))
    }
}

/// Principal component analysis with a retained basis.
///
/// `fit` derives the basis from training data; `transform` reuses it, so training and
/// inference matrices land in the same reduced space.
#[derive(Clone, Debug, Default)]
pub struct PCA {
    pub basis: Option<PcaBasis>,
    n_components: Option<usize>,
}

impl PCA {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = Some(n_components);
        self
    }

    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        let k = self.n_components.unwrap_or(x.ncols());
        check_components(k, x.ncols())?;

        let basis = PcaBasis::fit(x)?;
        let ratio = basis.explained_variance_ratio();
        info!(
            components = k,
            features = x.ncols(),
            explained = ratio.slice(s![..k]).sum(),
            "fitted PCA"
        );
        self.basis = Some(basis);
        Ok(())
    }

    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let basis = self.basis.as_ref().ok_or(Error::NotFitted("PCA"))?;
        basis.project(x, self.components(basis))
    }

    pub fn fit_transform(&mut self, x: &Matrix) -> Result<Matrix> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Explained-variance ratio of the retained components.
    pub fn explained_variance_ratio(&self) -> Option<Vector> {
        self.basis.as_ref().map(|basis| {
            let k = self.components(basis);
            basis.explained_variance_ratio().slice(s![..k]).to_owned()
        })
    }

    fn components(&self, basis: &PcaBasis) -> usize {
        self.n_components.unwrap_or(basis.n_features())
    }
}

/// Standardises `x`, derives a fresh basis from it and projects it onto `k` components.
///
/// The basis is discarded; use [`PCA`] when other matrices must share the same space.
pub fn reduce(x: &Matrix, k: usize) -> Result<Matrix> {
    check_components(k, x.ncols())?;
    PcaBasis::fit(x)?.project(x, k)
}

fn check_components(requested: usize, available: usize) -> Result<()> {
    if requested == 0 || requested > available {
        return Err(Error::Dimension {
            requested,
            available,
        });
    }
    Ok(())
}

/// Sample covariance (denominator `n - 1`) of the columns of `x`.
fn covariance(x: &Matrix) -> Matrix {
    let n_samples = x.nrows() as f64;
    let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Vector::zeros(x.ncols()));
    let centered = x - &mean.view().insert_axis(Axis(0));
    centered.t().dot(&centered) / (n_samples - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_rand::RandomExt;
    use ndarray_rand::rand_distr::Uniform;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn random_matrix(rows: usize, cols: usize, seed: u64) -> Matrix {
        let mut rng = StdRng::seed_from_u64(seed);
        Matrix::random_using((rows, cols), Uniform::new(-5.0, 5.0), &mut rng)
    }

    #[test]
    fn test_pca_basic() {
        let x = array![
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 7.0],
            [7.0, 8.0, 8.0],
            [10.0, 11.0, 12.0]
        ];

        let mut pca = PCA::new().n_components(2);
        let transformed = pca.fit_transform(&x).unwrap();

        assert_eq!(transformed.shape(), &[4, 2]);
        let basis = pca.basis.as_ref().unwrap();
        assert_eq!(basis.eigenvectors.shape(), &[3, 3]);
        assert_eq!(basis.covariance.shape(), &[3, 3]);
        assert_eq!(pca.explained_variance_ratio().unwrap().len(), 2);
    }

    #[test]
    fn full_rank_projection_preserves_total_variance() {
        let x = random_matrix(40, 6, 11);
        let basis = PcaBasis::fit(&x).unwrap();
        let projected = basis.project(&x, 6).unwrap();

        let standardized = StandardScaler::new().fit_transform(&x).unwrap();
        let column_variance = standardized.var_axis(Axis(0), 1.0).sum();
        assert_abs_diff_eq!(basis.eigenvalues.sum(), column_variance, epsilon = 1e-9);
        assert_abs_diff_eq!(projected.var_axis(Axis(0), 1.0).sum(), column_variance, epsilon = 1e-9);
    }

    #[test]
    fn perfectly_correlated_columns_collapse_to_one_component() {
        let a = array![1.0, 2.0, 4.0, 7.0, 11.0];
        let mut x = Matrix::zeros((5, 2));
        x.column_mut(0).assign(&a);
        x.column_mut(1).assign(&(&a * 2.0));

        let mut pca = PCA::new().n_components(1);
        let reduced = pca.fit_transform(&x).unwrap();
        assert_eq!(reduced.shape(), &[5, 1]);

        let basis = pca.basis.as_ref().unwrap();
        let ratio = basis.explained_variance_ratio();
        assert_abs_diff_eq!(ratio[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(basis.eigenvalues[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn components_are_ordered_by_variance() {
        let x = random_matrix(30, 5, 3);
        let projected = reduce(&x, 5).unwrap();
        let variances = projected.var_axis(Axis(0), 1.0);
        for w in variances.windows(2) {
            assert!(w[0] + 1e-9 >= w[1]);
        }
    }

    #[test]
    fn zero_variance_columns_are_harmless() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
        let reduced = reduce(&x, 2).unwrap();
        assert!(reduced.iter().all(|v| v.is_finite()));
        assert_abs_diff_eq!(reduced.column(1).to_owned(), array![0.0, 0.0, 0.0], epsilon = 1e-12);
    }

    #[test]
    fn too_many_components_always_fails() {
        for (rows, cols) in [(3, 1), (5, 2), (10, 7), (2, 30)] {
            let x = random_matrix(rows, cols, 1);
            for k in [0, cols + 1, cols + 10] {
                let err = reduce(&x, k).unwrap_err();
                assert!(matches!(err, Error::Dimension { requested, available } if requested == k && available == cols));
                assert!(PCA::new().n_components(k).fit(&x).is_err());
            }
        }
    }

    #[test]
    fn dimension_errors_come_before_shape_errors() {
        let x = Matrix::zeros((1, 2));
        assert!(matches!(reduce(&x, 3), Err(Error::Dimension { .. })));
        assert!(matches!(reduce(&x, 1), Err(Error::Shape(_))));
    }

    #[test]
    fn transform_reuses_the_training_basis() {
        let train = random_matrix(25, 4, 5);
        let test = random_matrix(8, 4, 6);

        let mut pca = PCA::new().n_components(3);
        pca.fit(&train).unwrap();
        let a = pca.transform(&test).unwrap();
        let b = pca.basis.as_ref().unwrap().project(&test, 3).unwrap();
        assert_eq!(a, b);
        // Recomputing a basis from the test matrix generally gives a different space.
        assert_ne!(a, reduce(&test, 3).unwrap());
    }

    #[test]
    fn test_pca_transform_without_fit() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let pca = PCA::new();

        assert!(matches!(pca.transform(&x), Err(Error::NotFitted(_))));
    }

    #[test]
    fn test_pca_dimension_mismatch() {
        let x_train = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.5], [2.0, 1.0, 0.0]];
        let x_test = array![[1.0, 2.0], [3.0, 4.0]];

        let mut pca = PCA::new();
        pca.fit(&x_train).unwrap();

        assert!(pca.transform(&x_test).is_err());
    }
}
