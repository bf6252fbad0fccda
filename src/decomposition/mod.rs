//! Dimensionality reduction by principal component analysis.
//!
//! Columns are standardised to zero mean and unit variance (non-finite results become 0),
//! the covariance of the standardised data is decomposed with a symmetric Jacobi eigen
//! solver, and data is projected onto the eigenvectors with the largest eigenvalues.
//!
//! - [`PCA`]: fit on one matrix, transform any matrix of the same width with that basis
//! - [`reduce`]: one-shot reduction that derives the basis from its own input
//!
//! # Examples
//!
//! ## Shared basis for training and inference
//! ```rust
//! use geochange::PCA;
//! use ndarray::array;
//!
//! let train = array![
//!     [1.0, 2.0, 3.0],
//!     [4.0, 5.0, 7.0],
//!     [7.0, 8.0, 8.0],
//!     [10.0, 11.0, 12.0]
//! ];
//! let test = array![[2.0, 3.0, 3.5]];
//!
//! let mut pca = PCA::new().n_components(2);
//! let reduced_train = pca.fit_transform(&train).unwrap();
//! let reduced_test = pca.transform(&test).unwrap();
//! assert_eq!(reduced_train.ncols(), reduced_test.ncols());
//! ```
//!
//! ## One-shot reduction
//! ```rust
//! use geochange::decomposition::reduce;
//! use ndarray::array;
//!
//! let x = array![[1.0, 2.0], [2.0, 4.1], [3.0, 5.9]];
//! assert_eq!(reduce(&x, 1).unwrap().shape(), &[3, 1]);
//! assert!(reduce(&x, 3).is_err());
//! ```

mod eigen;
mod pca;

pub use eigen::symmetric_eigen;
pub use pca::{PCA, PcaBasis, reduce};
