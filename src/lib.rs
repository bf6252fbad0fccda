//! Feature encoding for geospatial change-detection records.
//!
//! Raw polygon records (multi-valued categorical tags, per-epoch construction status and
//! dates, imagery statistics) are turned into a fixed-width numeric matrix that classical
//! classifiers can consume:
//!
//! 1. [`VocabularyExtractor`] scans a training [`Corpus`] once and freezes a [`Schema`].
//! 2. [`FeatureAssembler`] encodes any corpus against that schema into a [`FeatureMatrix`]
//!    (plus integer labels for training data).
//! 3. [`PCA`] optionally reduces the matrix before it is handed to a [`Classifier`]:
//!    a [`RandomForestClassifier`] or a [`LinearSVC`].
//!
//! # Example
//! ```rust
//! use geochange::{Corpus, Record, VocabularyExtractor, FeatureAssembler};
//! use geo::polygon;
//!
//! let record = Record {
//!     change_type: Some("Road".to_string()),
//!     urban_type: Some("Sparse Urban".to_string()),
//!     geography_type: Some("Dense Forest".to_string()),
//!     change_status: std::array::from_fn(|_| Some("Construction Started".to_string())),
//!     dates: std::array::from_fn(|i| Some(format!("0{}/01/2020", i + 1))),
//!     imagery: vec![0.5; geochange::IMAGERY_FEATURES],
//!     geometry: Some(polygon![(x: 0.0, y: 0.0), (x: 0.001, y: 0.0), (x: 0.001, y: 0.001)].into()),
//! };
//! let corpus = Corpus::with_default_imagery(vec![record]);
//!
//! let schema = VocabularyExtractor::new().extract(&corpus).unwrap();
//! let dataset = FeatureAssembler::new(&schema).assemble_labeled(&corpus.records).unwrap();
//! assert_eq!(dataset.features.n_features(), 30 + 2 + 4 + 1 + 1 + 5);
//! assert_eq!(dataset.labels[0], 1);
//! ```

pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod config;
pub mod dataset;
pub mod decomposition;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod io;
pub mod linear_model;
pub mod metrics;
pub mod preprocessing;
pub mod record;
pub mod schema;
pub mod tree;

pub use config::PipelineConfig;
pub use dataset::{FeatureMatrix, LabeledDataset};
pub use decomposition::{PCA, PcaBasis};
pub use ensemble::RandomForestClassifier;
pub use error::{Error, Result};
pub use features::{CategoricalEncoder, FeatureAssembler, GeometryFeaturizer, TemporalFeaturizer};
pub use linear_model::{Classifier, LinearSVC};
pub use preprocessing::StandardScaler;
pub use record::{Corpus, EPOCHS, IMAGERY_FEATURES, Record};
pub use schema::{ChangeType, Schema, TagMatching, TagTokenizer, VocabularyExtractor};
pub use tree::{ClassWeight, DecisionTreeClassifier};

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;
pub type Labels = Array1<i64>;
