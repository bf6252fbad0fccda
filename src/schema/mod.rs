//! Category vocabularies and the immutable [`Schema`] shared by every encoding call.
//!
//! A schema is built once from a training corpus by [`VocabularyExtractor`] and then passed by
//! reference to the encoders. Inference batches never contribute vocabulary terms, so every
//! matrix produced against one schema has the same columns in the same positions.
//!
//! # Example
//! ```rust
//! use geochange::schema::{Schema, TagMatching, TagTokenizer};
//! use geochange::record::default_imagery_columns;
//!
//! let schema = Schema::new(
//!     default_imagery_columns(),
//!     vec!["Dense Urban".into(), "N,A".into()],
//!     vec!["Farms".into()],
//!     vec!["Land Cleared".into(), "Prior Construction".into()],
//!     TagTokenizer::default(),
//!     TagMatching::Token,
//! )
//! .unwrap();
//!
//! let layout = schema.layout();
//! assert_eq!(layout.n_features(), 30 + 2 + 4 + 2 + 1 + 2 * 5);
//! assert_eq!(layout.names()[36], "urban_dense_urban");
//! ```

mod extract;
mod labels;
mod layout;
mod tokenize;

pub use extract::VocabularyExtractor;
pub use labels::{ChangeType, UNKNOWN_LABEL, encode_label};
pub use layout::{Block, FeatureLayout};
pub use tokenize::{DELIMITER, NOT_APPLICABLE, TagTokenizer};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::{GEOGRAPHY_TYPE, IMAGERY_FEATURES, IMAGERY_PREFIX, STATUS_PREFIX, URBAN_TYPE};

/// How a multi-valued attribute string is tested against a vocabulary term.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMatching {
    /// The term is one of the tokens produced by the schema's tokenizer.
    #[default]
    Token,
    /// The raw string contains the term anywhere. A term that is a substring of another
    /// term ("Commercial" in "Non-Commercial") yields false positives.
    Substring,
}

/// Ordered set of distinct terms.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    terms: Vec<String>,
}

impl Vocabulary {
    /// Collects distinct terms in first-seen order.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let terms = terms
            .into_iter()
            .map(Into::into)
            .filter(|term: &String| seen.insert(term.clone()))
            .collect();
        Self { terms }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    pub fn position(&self, term: &str) -> Option<usize> {
        self.terms.iter().position(|t| t == term)
    }

    fn validate(&self, column: &str) -> Result<()> {
        if self.terms.is_empty() {
            return Err(Error::schema(column, "vocabulary is empty"));
        }
        let mut seen = HashSet::new();
        for term in &self.terms {
            if term.trim().is_empty() {
                return Err(Error::schema(column, "vocabulary contains an empty term"));
            }
            if !seen.insert(term.as_str()) {
                return Err(Error::schema(
                    column,
                    format!("vocabulary lists `{term}` more than once"),
                ));
            }
        }
        Ok(())
    }

    /// Distinct terms must also yield distinct column names.
    fn validate_slugs(&self, column: &str) -> Result<()> {
        let mut seen = HashMap::new();
        for term in &self.terms {
            if let Some(other) = seen.insert(layout::slug(term), term) {
                return Err(Error::schema(
                    column,
                    format!("`{other}` and `{term}` map to the same feature column"),
                ));
            }
        }
        Ok(())
    }
}

/// Immutable bundle of every vocabulary plus the encoding rules that depend on them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaRepr", into = "SchemaRepr")]
pub struct Schema {
    imagery_columns: Vec<String>,
    urban: Vocabulary,
    geography: Vocabulary,
    status: Vocabulary,
    tokenizer: TagTokenizer,
    tag_matching: TagMatching,
}

impl Schema {
    pub fn new(
        imagery_columns: Vec<String>,
        urban: Vec<String>,
        geography: Vec<String>,
        status: Vec<String>,
        tokenizer: TagTokenizer,
        tag_matching: TagMatching,
    ) -> Result<Self> {
        let schema = Self {
            imagery_columns,
            urban: Vocabulary { terms: urban },
            geography: Vocabulary { terms: geography },
            status: Vocabulary { terms: status },
            tokenizer,
            tag_matching,
        };
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&self) -> Result<()> {
        if self.imagery_columns.len() != IMAGERY_FEATURES {
            return Err(Error::schema(
                IMAGERY_PREFIX,
                format!(
                    "expected {IMAGERY_FEATURES} imagery columns, found {}",
                    self.imagery_columns.len()
                ),
            ));
        }
        Vocabulary {
            terms: self.imagery_columns.clone(),
        }
        .validate(IMAGERY_PREFIX)?;
        for (vocabulary, column) in [
            (&self.urban, URBAN_TYPE),
            (&self.geography, GEOGRAPHY_TYPE),
            (&self.status, STATUS_PREFIX),
        ] {
            vocabulary.validate(column)?;
            vocabulary.validate_slugs(column)?;
        }
        if self.tokenizer.protected().iter().any(|t| t.trim().is_empty()) {
            return Err(Error::schema(URBAN_TYPE, "protected tags must not be empty"));
        }
        Ok(())
    }

    pub fn imagery_columns(&self) -> &[String] {
        &self.imagery_columns
    }

    pub fn urban(&self) -> &Vocabulary {
        &self.urban
    }

    pub fn geography(&self) -> &Vocabulary {
        &self.geography
    }

    pub fn status(&self) -> &Vocabulary {
        &self.status
    }

    pub fn tokenizer(&self) -> &TagTokenizer {
        &self.tokenizer
    }

    pub fn tag_matching(&self) -> TagMatching {
        self.tag_matching
    }

    /// Fixed change-type mapping, in code order.
    pub fn labels(&self) -> impl Iterator<Item = (&'static str, i64)> {
        ChangeType::ALL.iter().map(|c| (c.label(), c.code()))
    }

    /// Integer class for a label; anything outside the fixed mapping is [`UNKNOWN_LABEL`].
    pub fn label_code(&self, label: Option<&str>) -> i64 {
        encode_label(label)
    }

    pub fn layout(&self) -> FeatureLayout {
        FeatureLayout::new(self)
    }

    pub fn n_features(&self) -> usize {
        self.layout().n_features()
    }
}

#[derive(Serialize, Deserialize)]
struct SchemaRepr {
    imagery_columns: Vec<String>,
    urban_type: Vocabulary,
    geography_type: Vocabulary,
    change_status: Vocabulary,
    #[serde(default)]
    protected_tags: TagTokenizer,
    #[serde(default)]
    tag_matching: TagMatching,
    #[serde(default)]
    change_type: Vec<(String, i64)>,
}

impl TryFrom<SchemaRepr> for Schema {
    type Error = Error;

    fn try_from(repr: SchemaRepr) -> Result<Self> {
        for (label, code) in &repr.change_type {
            if encode_label(Some(label)) != *code {
                return Err(Error::schema(
                    crate::record::CHANGE_TYPE,
                    format!(
                        "label `{label}` must map to {}, not {code}",
                        encode_label(Some(label))
                    ),
                ));
            }
        }
        Schema::new(
            repr.imagery_columns,
            repr.urban_type.terms,
            repr.geography_type.terms,
            repr.change_status.terms,
            repr.protected_tags,
            repr.tag_matching,
        )
    }
}

impl From<Schema> for SchemaRepr {
    fn from(schema: Schema) -> Self {
        let change_type = schema
            .labels()
            .map(|(label, code)| (label.to_string(), code))
            .collect();
        SchemaRepr {
            imagery_columns: schema.imagery_columns,
            urban_type: schema.urban,
            geography_type: schema.geography,
            change_status: schema.status,
            protected_tags: schema.tokenizer,
            tag_matching: schema.tag_matching,
            change_type,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::record::default_imagery_columns;

    pub(crate) fn sample_schema() -> Schema {
        Schema::new(
            default_imagery_columns(),
            vec!["Sparse Urban".into(), "Industrial".into()],
            vec!["Farms".into()],
            vec!["Prior Construction".into(), "Construction Done".into()],
            TagTokenizer::default(),
            TagMatching::Token,
        )
        .unwrap()
    }

    #[test]
    fn vocabulary_keeps_first_seen_order() {
        let vocab = Vocabulary::from_terms(["b", "a", "b", "c", "a"]);
        assert_eq!(vocab.terms(), &["b", "a", "c"]);
        assert_eq!(vocab.position("c"), Some(2));
        assert_eq!(vocab.position("z"), None);
    }

    #[test]
    fn rejects_duplicate_terms() {
        let result = Schema::new(
            default_imagery_columns(),
            vec!["Farms".into(), "Farms".into()],
            vec!["Hills".into()],
            vec!["Land Cleared".into()],
            TagTokenizer::default(),
            TagMatching::Token,
        );
        assert!(matches!(result, Err(Error::Schema { ref column, .. }) if column == URBAN_TYPE));
    }

    #[test]
    fn rejects_terms_sharing_a_column_name() {
        let result = Schema::new(
            default_imagery_columns(),
            vec!["Dense Urban".into(), "dense_urban".into()],
            vec!["Hills".into()],
            vec!["Land Cleared".into()],
            TagTokenizer::default(),
            TagMatching::Token,
        );
        assert!(matches!(result, Err(Error::Schema { ref column, .. }) if column == URBAN_TYPE));

        let result = Schema::new(
            default_imagery_columns(),
            vec!["Dense Urban".into()],
            vec!["Hills".into()],
            vec!["Land Cleared".into(), "land cleared".into()],
            TagTokenizer::default(),
            TagMatching::Token,
        );
        assert!(matches!(result, Err(Error::Schema { ref column, .. }) if column == STATUS_PREFIX));
    }

    #[test]
    fn rejects_empty_vocabulary() {
        let result = Schema::new(
            default_imagery_columns(),
            vec!["Farms".into()],
            vec!["Hills".into()],
            Vec::new(),
            TagTokenizer::default(),
            TagMatching::Token,
        );
        assert!(matches!(result, Err(Error::Schema { ref column, .. }) if column == STATUS_PREFIX));
    }

    #[test]
    fn rejects_wrong_imagery_width() {
        let result = Schema::new(
            vec!["img_0".into()],
            vec!["Farms".into()],
            vec!["Hills".into()],
            vec!["Land Cleared".into()],
            TagTokenizer::default(),
            TagMatching::Token,
        );
        assert!(result.is_err());
    }

    #[test]
    fn json_round_trip_preserves_order() {
        let schema = sample_schema();
        let json = serde_json::to_string(&schema).unwrap();
        let restored: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, schema);
        assert_eq!(restored.layout().names(), schema.layout().names());
    }

    #[test]
    fn deserialisation_validates() {
        let mut value = serde_json::to_value(sample_schema()).unwrap();
        value["urban_type"] = serde_json::json!(["Farms", "Farms"]);
        assert!(serde_json::from_value::<Schema>(value).is_err());

        let mut value = serde_json::to_value(sample_schema()).unwrap();
        value["change_type"] = serde_json::json!([["Road", 4]]);
        assert!(serde_json::from_value::<Schema>(value).is_err());
    }
}
