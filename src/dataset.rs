use std::ops::Range;

use ndarray::{Axis, s};

use crate::error::{Error, Result};
use crate::schema::UNKNOWN_LABEL;
use crate::{Labels, Matrix};

/// Row-major feature matrix with one name per column.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    pub data: Matrix,
    pub columns: Vec<String>,
}

impl FeatureMatrix {
    pub fn new(data: Matrix, columns: Vec<String>) -> Result<Self> {
        if data.ncols() != columns.len() {
            return Err(Error::Shape(format!(
                "matrix has {} columns but {} names were given",
                data.ncols(),
                columns.len()
            )));
        }
        Ok(Self { data, columns })
    }

    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }

    /// Copies a contiguous block of columns, e.g. one [`Block`](crate::schema::Block).
    pub fn select_columns(&self, range: Range<usize>) -> Result<Self> {
        if range.start > range.end || range.end > self.n_features() {
            return Err(Error::Shape(format!(
                "column range {:?} outside 0..{}",
                range,
                self.n_features()
            )));
        }
        Self::new(
            self.data.slice(s![.., range.clone()]).to_owned(),
            self.columns[range].to_vec(),
        )
    }

    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            data: self.data.select(Axis(0), rows),
            columns: self.columns.clone(),
        }
    }
}

/// Feature matrix paired with integer class labels.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledDataset {
    pub features: FeatureMatrix,
    pub labels: Labels,
}

impl LabeledDataset {
    pub fn new(features: FeatureMatrix, labels: Labels) -> Result<Self> {
        if features.n_samples() != labels.len() {
            return Err(Error::Shape(
                "numbers of samples in features and labels must match".to_string(),
            ));
        }

        Ok(Self { features, labels })
    }

    pub fn n_samples(&self) -> usize {
        self.features.n_samples()
    }

    pub fn n_features(&self) -> usize {
        self.features.n_features()
    }

    /// Rows whose label is not the unknown sentinel.
    pub fn known_labels(&self) -> Self {
        let rows: Vec<usize> = self
            .labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label != UNKNOWN_LABEL)
            .map(|(i, _)| i)
            .collect();
        Self {
            features: self.features.select_rows(&rows),
            labels: self.labels.select(Axis(0), &rows),
        }
    }

    /// Splits off the last `test_size` fraction of rows, preserving order.
    pub fn train_test_split(&self, test_size: f64) -> Result<(Self, Self)> {
        if test_size <= 0.0 || test_size >= 1.0 {
            return Err(Error::Config("test_size must be between 0 and 1".to_string()));
        }

        let n_samples = self.n_samples();
        let n_test = (n_samples as f64 * test_size).round() as usize;
        let n_train = n_samples - n_test;

        let train = Self::new(
            FeatureMatrix::new(
                self.features.data.slice(s![..n_train, ..]).to_owned(),
                self.features.columns.clone(),
            )?,
            self.labels.slice(s![..n_train]).to_owned(),
        )?;
        let test = Self::new(
            FeatureMatrix::new(
                self.features.data.slice(s![n_train.., ..]).to_owned(),
                self.features.columns.clone(),
            )?,
            self.labels.slice(s![n_train..]).to_owned(),
        )?;

        Ok((train, test))
    }
}
