//! Reading corpora and writing pipeline outputs.
//!
//! - [`read_corpus`]: GeoJSON `FeatureCollection` to [`Corpus`](crate::Corpus)
//! - [`write_schema`] / [`read_schema`]: the frozen [`Schema`] as JSON
//! - [`write_feature_matrix`]: encoded features as CSV
//! - [`write_submission`]: predictions as an `Id,change_type` table

mod geojson;
mod table;

pub use geojson::{EpochColumns, parse_corpus, read_corpus};
pub use table::{
    write_feature_matrix, write_feature_matrix_to, write_submission, write_submission_to,
};

use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::schema::Schema;

pub fn write_schema(path: impl AsRef<Path>, schema: &Schema) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, serde_json::to_string_pretty(schema)?)?;
    info!(path = %path.display(), features = schema.n_features(), "saved schema");
    Ok(())
}

/// Loads a schema, validating it the same way [`Schema::new`] does.
pub fn read_schema(path: impl AsRef<Path>) -> Result<Schema> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tests::sample_schema;

    #[test]
    fn schema_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        let schema = sample_schema();

        write_schema(&path, &schema).unwrap();
        let loaded = read_schema(&path).unwrap();
        assert_eq!(loaded.layout().names(), schema.layout().names());
    }

    #[test]
    fn invalid_schema_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, r#"{"imagery_columns": []}"#).unwrap();
        assert!(read_schema(&path).is_err());
    }
}
