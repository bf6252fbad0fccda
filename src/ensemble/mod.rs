//! Ensembles of decision trees.
//!
//! - `RandomForestClassifier`: bagged trees with per-split feature subsampling

mod random_forest;

pub use random_forest::RandomForestClassifier;
