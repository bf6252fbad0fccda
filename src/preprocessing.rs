use ndarray::{Axis, Zip};

use crate::error::{Error, Result};
use crate::{Matrix, Vector};

/// Zero-mean, unit-variance column scaling.
///
/// Means and (population) standard deviations ignore NaN entries. After scaling, any
/// non-finite value, from a NaN input or a zero-variance column, is replaced with 0.
#[derive(Clone, Debug, Default)]
pub struct StandardScaler {
    pub mean: Option<Vector>,
    pub scale: Option<Vector>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, data: &Matrix) -> Result<()> {
        if data.nrows() == 0 {
            return Err(Error::Shape("cannot fit a scaler on zero rows".to_string()));
        }

        let (mean, scale) = column_moments(data);
        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    pub fn transform(&self, data: &Matrix) -> Result<Matrix> {
        let mean = self.mean.as_ref().ok_or(Error::NotFitted("StandardScaler"))?;
        let scale = self.scale.as_ref().ok_or(Error::NotFitted("StandardScaler"))?;

        if data.ncols() != mean.len() {
            return Err(Error::Shape(format!(
                "number of features in X ({}) doesn't match training data ({})",
                data.ncols(),
                mean.len()
            )));
        }

        let mut result = data.clone();
        for mut row in result.axis_iter_mut(Axis(0)) {
            Zip::from(&mut row).and(mean).and(scale).for_each(|v, &m, &s| {
                let z = (*v - m) / s;
                *v = if z.is_finite() { z } else { 0.0 };
            });
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, data: &Matrix) -> Result<Matrix> {
        self.fit(data)?;
        self.transform(data)
    }
}

/// NaN-ignoring per-column mean and population standard deviation.
fn column_moments(data: &Matrix) -> (Vector, Vector) {
    let n_features = data.ncols();
    let mut mean = Vector::zeros(n_features);
    let mut std = Vector::zeros(n_features);

    for (j, column) in data.axis_iter(Axis(1)).enumerate() {
        let finite: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
        if finite.is_empty() {
            mean[j] = f64::NAN;
            std[j] = f64::NAN;
            continue;
        }
        let n = finite.len() as f64;
        let m = finite.iter().sum::<f64>() / n;
        let var = finite.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n;
        mean[j] = m;
        std[j] = var.sqrt();
    }

    (mean, std)
}
