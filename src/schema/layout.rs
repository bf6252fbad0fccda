use std::ops::Range;

use super::Schema;
use crate::record::EPOCHS;

/// Column blocks of a feature matrix, in matrix order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Block {
    Imagery,
    Geometry,
    Temporal,
    Urban,
    Geography,
    Status,
}

impl Block {
    pub const ORDER: [Block; 6] = [
        Block::Imagery,
        Block::Geometry,
        Block::Temporal,
        Block::Urban,
        Block::Geography,
        Block::Status,
    ];
}

pub const GEOMETRY_COLUMNS: [&str; 2] = ["area_m2", "vertex_count"];

/// Names and block boundaries of every column a schema produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureLayout {
    names: Vec<String>,
    blocks: Vec<(Block, Range<usize>)>,
}

impl FeatureLayout {
    pub(crate) fn new(schema: &Schema) -> Self {
        let mut names = Vec::new();
        let mut blocks = Vec::with_capacity(Block::ORDER.len());

        for block in Block::ORDER {
            let start = names.len();
            match block {
                Block::Imagery => names.extend(schema.imagery_columns().iter().cloned()),
                Block::Geometry => names.extend(GEOMETRY_COLUMNS.iter().map(|n| n.to_string())),
                Block::Temporal => {
                    names.extend((0..EPOCHS - 1).map(|e| format!("delta_days_t{}_t{}", e, e + 1)))
                }
                Block::Urban => {
                    names.extend(schema.urban().iter().map(|t| format!("urban_{}", slug(t))))
                }
                Block::Geography => {
                    names.extend(schema.geography().iter().map(|t| format!("geo_{}", slug(t))))
                }
                Block::Status => {
                    for epoch in 0..EPOCHS {
                        names.extend(
                            schema
                                .status()
                                .iter()
                                .map(|s| format!("status_t{}_{}", epoch, slug(s))),
                        );
                    }
                }
            }
            blocks.push((block, start..names.len()));
        }

        Self { names, blocks }
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn range(&self, block: Block) -> Range<usize> {
        self.blocks
            .iter()
            .find(|(b, _)| *b == block)
            .map(|(_, range)| range.clone())
            .unwrap_or(0..0)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Column-name form of a vocabulary term.
pub(crate) fn slug(term: &str) -> String {
    term.replace(' ', "_").to_lowercase()
}
