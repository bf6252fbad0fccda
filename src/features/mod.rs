//! Per-record featurizers and the assembler that concatenates them.
//!
//! - `GeometryFeaturizer`: projected area and exterior vertex count of a polygon
//! - `TemporalFeaturizer`: day deltas between consecutive survey epochs
//! - `CategoricalEncoder`: multi-label and per-epoch one-hot indicator blocks
//! - `FeatureAssembler`: one fixed-layout matrix per record batch
//!
//! # Examples
//!
//! ## Geometry features
//! ```rust
//! use geochange::features::{GeometryFeaturizer, Planar};
//! use geo::polygon;
//!
//! let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
//! let features = GeometryFeaturizer::with_projection(Planar).featurize_polygon(&square).unwrap();
//! assert_eq!(features.area, 1.0);
//! assert_eq!(features.vertex_count, 5);
//! ```
//!
//! ## Temporal features
//! ```rust
//! use geochange::TemporalFeaturizer;
//!
//! let dates = ["01/01/2020", "15/01/2020", "bad", "01/03/2020", "01/04/2020"]
//!     .map(|d| Some(d.to_string()));
//! let deltas = TemporalFeaturizer::new().deltas(&dates);
//! assert_eq!(deltas[0], 14.0);
//! assert!(deltas[1].is_nan());
//! ```

mod assembler;
mod categorical;
mod geometry;
mod temporal;

pub use assembler::FeatureAssembler;
pub use categorical::CategoricalEncoder;
pub use geometry::{
    EqualAreaCylindrical, GeometryError, GeometryFeatures, GeometryFeaturizer, MetricProjection,
    Planar,
};
pub use temporal::{TemporalFeaturizer, parse_date};
