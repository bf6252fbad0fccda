use ndarray::{Axis, s};
use tracing::{debug, info, warn};

use super::categorical::CategoricalEncoder;
use super::geometry::{EqualAreaCylindrical, GeometryFeaturizer, MetricProjection};
use super::temporal::TemporalFeaturizer;
use crate::dataset::{FeatureMatrix, LabeledDataset};
use crate::error::{Error, Result};
use crate::record::{IMAGERY_FEATURES, IMAGERY_PREFIX, Record};
use crate::schema::{Block, FeatureLayout, Schema, UNKNOWN_LABEL};
use crate::{Labels, Matrix};

/// Concatenates every feature block of a record batch into one matrix.
///
/// Column order is fixed by the schema's [`FeatureLayout`]: imagery, geometry (area, vertex
/// count), temporal deltas, urban indicators, geography indicators, status indicators.
pub struct FeatureAssembler<'a, P = EqualAreaCylindrical> {
    schema: &'a Schema,
    layout: FeatureLayout,
    geometry: GeometryFeaturizer<P>,
    temporal: TemporalFeaturizer,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self::with_projection(schema, EqualAreaCylindrical::new())
    }
}

impl<'a, P: MetricProjection> FeatureAssembler<'a, P> {
    pub fn with_projection(schema: &'a Schema, projection: P) -> Self {
        Self {
            schema,
            layout: schema.layout(),
            geometry: GeometryFeaturizer::with_projection(projection),
            temporal: TemporalFeaturizer::new(),
        }
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// Encodes every record; the first failing record aborts the batch.
    pub fn assemble(&self, records: &[Record]) -> Result<FeatureMatrix> {
        let encoder = CategoricalEncoder::new(self.schema);
        let imagery = self.layout.range(Block::Imagery);
        let geometry = self.layout.range(Block::Geometry);
        let temporal = self.layout.range(Block::Temporal);
        let categorical =
            self.layout.range(Block::Urban).start..self.layout.range(Block::Status).end;

        let mut data = Matrix::zeros((records.len(), self.layout.n_features()));
        let mut unparseable_dates = 0;

        let rows = records.iter().zip(data.axis_iter_mut(Axis(0)));
        for (index, (record, mut row)) in rows.enumerate() {
            if record.imagery.len() != IMAGERY_FEATURES {
                return Err(Error::encoding(
                    index,
                    IMAGERY_PREFIX,
                    format!(
                        "expected {IMAGERY_FEATURES} imagery values, found {}",
                        record.imagery.len()
                    ),
                ));
            }
            row.slice_mut(s![imagery.clone()])
                .iter_mut()
                .zip(&record.imagery)
                .for_each(|(slot, value)| *slot = *value);

            let shape = self
                .geometry
                .featurize(record.geometry.as_ref())
                .map_err(|source| Error::Geometry { record: index, source })?;
            row[geometry.start] = shape.area;
            row[geometry.start + 1] = shape.vertex_count as f64;

            let deltas = self.temporal.deltas(&record.dates);
            row.slice_mut(s![temporal.clone()])
                .iter_mut()
                .zip(deltas)
                .for_each(|(slot, delta)| *slot = delta);
            unparseable_dates += self.temporal.unparseable(&record.dates);

            encoder.encode_into(index, record, row.slice_mut(s![categorical.clone()]))?;
        }

        if unparseable_dates > 0 {
            warn!(unparseable_dates, "dates could not be parsed, their deltas are NaN");
        }
        info!(rows = data.nrows(), columns = data.ncols(), "assembled feature matrix");

        FeatureMatrix::new(data, self.layout.names().to_vec())
    }

    /// Like [`assemble`](Self::assemble), also mapping each record's change type to its code.
    pub fn assemble_labeled(&self, records: &[Record]) -> Result<LabeledDataset> {
        let features = self.assemble(records)?;
        let labels: Labels = records
            .iter()
            .map(|r| self.schema.label_code(r.change_type.as_deref()))
            .collect();

        let unknown = labels.iter().filter(|&&l| l == UNKNOWN_LABEL).count();
        debug!(unknown, "labels mapped to the unknown sentinel");

        LabeledDataset::new(features, labels)
    }
}
