use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::Labels;
use crate::dataset::FeatureMatrix;
use crate::error::{Error, Result};
use crate::record::CHANGE_TYPE;

/// Writes a feature matrix as CSV with a header of column names. When `labels` is given a
/// trailing `change_type` column carries the integer codes. Missing values are left empty.
pub fn write_feature_matrix(
    path: impl AsRef<Path>,
    features: &FeatureMatrix,
    labels: Option<&Labels>,
) -> Result<()> {
    let path = path.as_ref();
    write_feature_matrix_to(std::fs::File::create(path)?, features, labels)?;
    info!(path = %path.display(), rows = features.n_samples(), "wrote feature matrix");
    Ok(())
}

pub fn write_feature_matrix_to<W: Write>(
    writer: W,
    features: &FeatureMatrix,
    labels: Option<&Labels>,
) -> Result<()> {
    if let Some(labels) = labels {
        if labels.len() != features.n_samples() {
            return Err(Error::Shape(format!(
                "{} labels for {} rows",
                labels.len(),
                features.n_samples()
            )));
        }
    }

    let mut wtr = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = features.columns.iter().map(String::as_str).collect();
    if labels.is_some() {
        header.push(CHANGE_TYPE);
    }
    wtr.write_record(&header)?;

    for (i, row) in features.data.rows().into_iter().enumerate() {
        let mut record: Vec<String> = row
            .iter()
            .map(|v| if v.is_nan() { String::new() } else { v.to_string() })
            .collect();
        if let Some(labels) = labels {
            record.push(labels[i].to_string());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes predictions as an `Id,change_type` table, ids counting rows from 0.
pub fn write_submission(path: impl AsRef<Path>, predictions: &Labels) -> Result<()> {
    let path = path.as_ref();
    write_submission_to(std::fs::File::create(path)?, predictions)?;
    info!(path = %path.display(), rows = predictions.len(), "wrote submission");
    Ok(())
}

pub fn write_submission_to<W: Write>(writer: W, predictions: &Labels) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Id", CHANGE_TYPE])?;
    for (id, label) in predictions.iter().enumerate() {
        wtr.write_record([id.to_string(), label.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn feature_matrix_has_named_header() {
        let features = FeatureMatrix::new(
            array![[1.5, f64::NAN], [0.0, 2.0]],
            vec!["img_00".to_string(), "delta_days_t0_t1".to_string()],
        )
        .unwrap();
        let mut out = Vec::new();
        write_feature_matrix_to(&mut out, &features, Some(&array![2, -1])).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "img_00,delta_days_t0_t1,change_type\n1.5,,2\n0,2,-1\n"
        );
    }

    #[test]
    fn label_count_must_match_rows() {
        let features = FeatureMatrix::new(array![[1.0]], vec!["a".to_string()]).unwrap();
        let err = write_feature_matrix_to(Vec::new(), &features, Some(&array![1, 2]));
        assert!(matches!(err, Err(Error::Shape(_))));
    }

    #[test]
    fn submission_rows_are_numbered() {
        let mut out = Vec::new();
        write_submission_to(&mut out, &array![3, 0, 5]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Id,change_type\n0,3\n1,0\n2,5\n"
        );
    }

    #[test]
    fn submission_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submission.csv");
        write_submission(&path, &array![1, 2]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Id,change_type\n"));
        assert_eq!(text.lines().count(), 3);
    }
}
