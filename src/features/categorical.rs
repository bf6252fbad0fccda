use ndarray::ArrayViewMut1;

use crate::error::{Error, Result};
use crate::record::{EPOCHS, GEOGRAPHY_TYPE, Record, STATUS_PREFIX, URBAN_TYPE, epoch_attribute};
use crate::schema::{Schema, TagMatching, Vocabulary};

/// Expands categorical attributes into 0/1 indicator blocks using a schema's vocabularies.
#[derive(Clone, Copy, Debug)]
pub struct CategoricalEncoder<'a> {
    schema: &'a Schema,
}

impl<'a> CategoricalEncoder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Width of the urban, geography and status blocks together.
    pub fn width(&self) -> usize {
        self.schema.urban().len()
            + self.schema.geography().len()
            + self.schema.status().len() * EPOCHS
    }

    /// Writes the urban, geography and status indicators of `record` into `out`, which must
    /// be exactly [`width`](Self::width) long.
    pub fn encode_into(
        &self,
        index: usize,
        record: &Record,
        mut out: ArrayViewMut1<f64>,
    ) -> Result<()> {
        if out.len() != self.width() {
            return Err(Error::Shape(format!(
                "indicator buffer has {} slots, schema needs {}",
                out.len(),
                self.width()
            )));
        }

        let urban = required(index, URBAN_TYPE, record.urban_type.as_deref())?;
        let geography = required(index, GEOGRAPHY_TYPE, record.geography_type.as_deref())?;

        let mut offset = 0;
        for (raw, vocab) in [(urban, self.schema.urban()), (geography, self.schema.geography())] {
            for (slot, hit) in self.tag_indicators(raw, vocab).into_iter().enumerate() {
                out[offset + slot] = indicator(hit);
            }
            offset += vocab.len();
        }

        let status = self.schema.status();
        for epoch in 0..EPOCHS {
            let attribute = || epoch_attribute(STATUS_PREFIX, epoch);
            let value = record.change_status[epoch]
                .as_deref()
                .ok_or_else(|| Error::encoding(index, attribute(), "attribute is missing"))?
                .trim();
            for (slot, term) in status.iter().enumerate() {
                out[offset + slot] = indicator(term == value);
            }
            offset += status.len();
        }

        Ok(())
    }

    /// Indicators for one multi-valued attribute, in vocabulary order.
    pub fn tag_indicators(&self, raw: &str, vocab: &Vocabulary) -> Vec<bool> {
        match self.schema.tag_matching() {
            TagMatching::Token => {
                let tokens = self.schema.tokenizer().tokenize(raw);
                vocab.iter().map(|term| tokens.iter().any(|t| t == term)).collect()
            }
            TagMatching::Substring => vocab.iter().map(|term| raw.contains(term)).collect(),
        }
    }
}

fn required<'r>(index: usize, attribute: &str, value: Option<&'r str>) -> Result<&'r str> {
    value.ok_or_else(|| Error::encoding(index, attribute, "attribute is missing"))
}

fn indicator(hit: bool) -> f64 {
    if hit { 1.0 } else { 0.0 }
}
