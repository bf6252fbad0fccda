use tracing::{debug, info, warn};

use super::{Schema, TagMatching, TagTokenizer, UNKNOWN_LABEL, Vocabulary, encode_label};
use crate::error::{Error, Result};
use crate::record::{Corpus, GEOGRAPHY_TYPE, Record, STATUS_PREFIX, URBAN_TYPE};

/// Discovers the category vocabularies of a training corpus.
///
/// Terms are kept in first-seen order (records in corpus order, tokens left to right,
/// status epochs in chronological order), so extracting twice from the same corpus yields
/// an equal schema.
#[derive(Clone, Debug, Default)]
pub struct VocabularyExtractor {
    tokenizer: TagTokenizer,
    tag_matching: TagMatching,
}

impl VocabularyExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokenizer(mut self, tokenizer: TagTokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn tag_matching(mut self, tag_matching: TagMatching) -> Self {
        self.tag_matching = tag_matching;
        self
    }

    pub fn extract(&self, corpus: &Corpus) -> Result<Schema> {
        if corpus.is_empty() {
            return Err(Error::schema("<corpus>", "training corpus has no records"));
        }

        let urban = self.tag_vocabulary(corpus, URBAN_TYPE, |r| r.urban_type.as_deref())?;
        let geography =
            self.tag_vocabulary(corpus, GEOGRAPHY_TYPE, |r| r.geography_type.as_deref())?;
        let status = status_vocabulary(corpus)?;

        let unknown = corpus
            .records
            .iter()
            .filter(|r| encode_label(r.change_type.as_deref()) == UNKNOWN_LABEL)
            .count();
        if unknown > 0 {
            warn!(
                unknown,
                code = UNKNOWN_LABEL,
                "training records with a missing or unrecognised change_type"
            );
        }

        info!(
            records = corpus.len(),
            urban = urban.len(),
            geography = geography.len(),
            status = status.len(),
            "extracted vocabularies"
        );

        Schema::new(
            corpus.imagery_columns.clone(),
            urban.terms,
            geography.terms,
            status.terms,
            self.tokenizer.clone(),
            self.tag_matching,
        )
    }

    fn tag_vocabulary<'a>(
        &self,
        corpus: &'a Corpus,
        column: &str,
        field: impl Fn(&'a Record) -> Option<&'a str>,
    ) -> Result<Vocabulary> {
        let values: Vec<&str> = corpus.records.iter().filter_map(field).collect();
        if values.is_empty() {
            return Err(Error::schema(
                column,
                "column is absent or holds no string values",
            ));
        }

        let vocab = Vocabulary::from_terms(values.iter().flat_map(|v| self.tokenizer.tokenize(v)));
        if vocab.is_empty() {
            return Err(Error::schema(column, "no tags found in any record"));
        }

        debug!(column, terms = ?vocab.terms(), "tag vocabulary");
        Ok(vocab)
    }
}

fn status_vocabulary(corpus: &Corpus) -> Result<Vocabulary> {
    let vocab = Vocabulary::from_terms(
        corpus
            .records
            .iter()
            .flat_map(|r| r.change_status.iter().flatten())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty()),
    );
    if vocab.is_empty() {
        return Err(Error::schema(
            STATUS_PREFIX,
            "status columns are absent or hold no values",
        ));
    }
    debug!(terms = ?vocab.terms(), "status vocabulary");
    Ok(vocab)
}
