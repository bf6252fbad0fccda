//! Error types shared by every stage of the pipeline.
//!
//! Schema-building and per-record encoding failures are fatal to the whole batch, so each
//! variant carries enough context (column name, record index) to locate the offending input.

use thiserror::Error;

use crate::features::GeometryError;

#[derive(Error, Debug)]
pub enum Error {
    /// The corpus cannot yield a usable vocabulary or column layout.
    #[error("schema error in column `{column}`: {reason}")]
    Schema { column: String, reason: String },

    /// A record lacks (or carries an unusable value for) a required attribute.
    #[error("record {record}: cannot encode `{attribute}`: {reason}")]
    Encoding {
        record: usize,
        attribute: String,
        reason: String,
    },

    #[error("record {record}: {source}")]
    Geometry {
        record: usize,
        #[source]
        source: GeometryError,
    },

    /// Requested PCA dimensionality outside `1..=available`.
    #[error("cannot reduce to {requested} components: input has {available} columns")]
    Dimension { requested: usize, available: usize },

    #[error("shape error: {0}")]
    Shape(String),

    #[error("numerical error: {0}")]
    Numerical(String),

    #[error("{0} not fitted, call fit() first")]
    NotFitted(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn schema(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Schema {
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn encoding(
        record: usize,
        attribute: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Encoding {
            record,
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }
}
