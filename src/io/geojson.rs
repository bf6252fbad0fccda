use std::collections::BTreeSet;
use std::path::Path;

use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::features::GeometryError;
use crate::record::{
    CHANGE_TYPE, Corpus, DATE_PREFIX, EPOCHS, GEOGRAPHY_TYPE, IMAGERY_FEATURES, IMAGERY_PREFIX,
    Record, STATUS_PREFIX, URBAN_TYPE,
};

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

/// The five epoch-indexed columns sharing a prefix, in chronological order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EpochColumns {
    columns: [String; EPOCHS],
}

impl EpochColumns {
    /// Selects every key starting with `prefix`. Each must end in an integer epoch index;
    /// indices are ordered numerically and must be exactly [`EPOCHS`] contiguous values.
    pub fn resolve<'a, I>(prefix: &str, keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut indexed = Vec::new();
        for key in keys.into_iter().filter(|k| k.starts_with(prefix)) {
            let index = trailing_index(key).ok_or_else(|| {
                Error::schema(key, format!("`{prefix}` column does not end in an epoch index"))
            })?;
            indexed.push((index, key.to_string()));
        }
        indexed.sort();

        if indexed.len() != EPOCHS {
            return Err(Error::schema(
                prefix,
                format!("expected {EPOCHS} epoch columns, found {}", indexed.len()),
            ));
        }
        for pair in indexed.windows(2) {
            if pair[1].0 != pair[0].0 + 1 {
                return Err(Error::schema(
                    pair[1].1.as_str(),
                    format!("epoch index {} does not follow {}", pair[1].0, pair[0].0),
                ));
            }
        }

        Ok(Self {
            columns: std::array::from_fn(|e| indexed[e].1.clone()),
        })
    }

    pub fn columns(&self) -> &[String; EPOCHS] {
        &self.columns
    }
}

fn trailing_index(key: &str) -> Option<usize> {
    let stem = key.trim_end_matches(|c: char| c.is_ascii_digit());
    key[stem.len()..].parse().ok()
}

/// Reads a GeoJSON `FeatureCollection` from `path`. See [`parse_corpus`].
pub fn read_corpus(path: impl AsRef<Path>, imagery: Option<&[String]>) -> Result<Corpus> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let corpus = parse_corpus(&text, imagery)?;
    info!(path = %path.display(), records = corpus.len(), "loaded corpus");
    Ok(corpus)
}

/// Parses a GeoJSON `FeatureCollection` into a [`Corpus`].
///
/// With `imagery` set (inference), those columns are read in that order. Without it
/// (training), every `img_*` property is used, sorted by name.
pub fn parse_corpus(text: &str, imagery: Option<&[String]>) -> Result<Corpus> {
    let collection: FeatureCollection = serde_json::from_str(text)?;
    if collection.kind != "FeatureCollection" {
        return Err(Error::schema(
            "type",
            format!("expected a FeatureCollection, found `{}`", collection.kind),
        ));
    }

    let empty = Map::new();
    let keys: BTreeSet<&str> = collection
        .features
        .iter()
        .flat_map(|f| f.properties.as_ref().unwrap_or(&empty).keys())
        .map(String::as_str)
        .collect();

    let status = EpochColumns::resolve(STATUS_PREFIX, keys.iter().copied())?;
    let dates = EpochColumns::resolve(DATE_PREFIX, keys.iter().copied())?;
    let imagery_columns = match imagery {
        Some(columns) => {
            if let Some(missing) = columns.iter().find(|c| !keys.contains(c.as_str())) {
                return Err(Error::schema(
                    missing.as_str(),
                    "imagery column is absent from the corpus",
                ));
            }
            columns.to_vec()
        }
        None => {
            let columns: Vec<String> = keys
                .iter()
                .filter(|k| k.starts_with(IMAGERY_PREFIX))
                .map(|k| k.to_string())
                .collect();
            if columns.len() != IMAGERY_FEATURES {
                return Err(Error::schema(
                    IMAGERY_PREFIX,
                    format!("expected {IMAGERY_FEATURES} imagery columns, found {}", columns.len()),
                ));
            }
            columns
        }
    };
    debug!(status = ?status.columns(), dates = ?dates.columns(), "resolved epoch columns");

    let records = collection
        .features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let properties = feature.properties.as_ref().unwrap_or(&empty);
            let geometry = feature
                .geometry
                .as_ref()
                .map(convert_geometry)
                .transpose()
                .map_err(|source| Error::Geometry {
                    record: index,
                    source,
                })?;
            let imagery = imagery_columns
                .iter()
                .map(|column| imagery_value(index, column, properties.get(column)))
                .collect::<Result<Vec<_>>>()?;

            Ok(Record {
                change_type: text_property(properties, CHANGE_TYPE),
                urban_type: text_property(properties, URBAN_TYPE),
                geography_type: text_property(properties, GEOGRAPHY_TYPE),
                change_status: std::array::from_fn(|e| {
                    text_property(properties, &status.columns()[e])
                }),
                dates: std::array::from_fn(|e| text_property(properties, &dates.columns()[e])),
                imagery,
                geometry,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Corpus::new(imagery_columns, records))
}

fn text_property(properties: &Map<String, Value>, key: &str) -> Option<String> {
    match properties.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn imagery_value(record: usize, column: &str, value: Option<&Value>) -> Result<f64> {
    match value {
        None | Some(Value::Null) => Ok(f64::NAN),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| Error::encoding(record, column, "number is not representable as f64")),
        Some(other) => Err(Error::encoding(
            record,
            column,
            format!("expected a number, found {other}"),
        )),
    }
}

fn convert_geometry(raw: &RawGeometry) -> std::result::Result<Geometry<f64>, GeometryError> {
    let c = &raw.coordinates;
    match raw.kind.as_str() {
        "Point" => Ok(Geometry::Point(Point::from(coord(c)?))),
        "LineString" => Ok(Geometry::LineString(line_string(c)?)),
        "Polygon" => Ok(Geometry::Polygon(polygon(c)?)),
        "MultiPolygon" => Ok(Geometry::MultiPolygon(MultiPolygon::new(
            array(c)?.iter().map(polygon).collect::<std::result::Result<_, _>>()?,
        ))),
        other => Err(GeometryError::Unsupported(other.to_string())),
    }
}

fn array(value: &Value) -> std::result::Result<&Vec<Value>, GeometryError> {
    value
        .as_array()
        .ok_or_else(|| GeometryError::Malformed(format!("expected an array, found {value}")))
}

fn coord(value: &Value) -> std::result::Result<Coord<f64>, GeometryError> {
    let position = array(value)?;
    match position.as_slice() {
        [x, y, ..] => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => Ok(Coord { x, y }),
            _ => Err(GeometryError::Malformed(format!("non-numeric position {value}"))),
        },
        _ => Err(GeometryError::Malformed(format!(
            "position needs 2 values, found {}",
            position.len()
        ))),
    }
}

fn line_string(value: &Value) -> std::result::Result<LineString<f64>, GeometryError> {
    array(value)?
        .iter()
        .map(coord)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(value: &Value) -> std::result::Result<Polygon<f64>, GeometryError> {
    let mut rings = array(value)?
        .iter()
        .map(line_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if rings.is_empty() {
        return Err(GeometryError::Malformed("polygon has no rings".to_string()));
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(change_type: Option<&str>, geometry: Value) -> Value {
        let mut properties = json!({
            "urban_type": "Sparse Urban,N,A",
            "geography_type": "Farms",
        });
        let map = properties.as_object_mut().unwrap();
        if let Some(label) = change_type {
            map.insert(CHANGE_TYPE.into(), json!(label));
        }
        for e in 0..EPOCHS {
            map.insert(format!("change_status_date{e}"), json!("Construction Started"));
            map.insert(format!("date{e}"), json!(format!("0{}-01-2020", e + 1)));
        }
        for i in 0..IMAGERY_FEATURES {
            map.insert(format!("img_{i:02}"), json!(i as f64 / 10.0));
        }
        json!({ "type": "Feature", "properties": properties, "geometry": geometry })
    }

    fn square() -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [0.001, 0.0], [0.001, 0.001], [0.0, 0.001], [0.0, 0.0]]]
        })
    }

    fn collection(features: Vec<Value>) -> String {
        json!({ "type": "FeatureCollection", "features": features }).to_string()
    }

    #[test]
    fn epoch_columns_sort_numerically() {
        let keys = ["date10", "date8", "date12", "date9", "date11", "urban_type"];
        let columns = EpochColumns::resolve("date", keys).unwrap();
        assert_eq!(columns.columns(), &["date8", "date9", "date10", "date11", "date12"]);
    }

    #[test]
    fn epoch_columns_must_be_five_contiguous_indices() {
        let gap = ["date0", "date1", "date2", "date3", "date5"];
        assert!(matches!(EpochColumns::resolve("date", gap), Err(Error::Schema { .. })));

        let short = ["date0", "date1", "date2", "date3"];
        assert!(matches!(EpochColumns::resolve("date", short), Err(Error::Schema { .. })));

        let unindexed = ["date0", "date1", "date2", "date3", "date4", "date_final"];
        let err = EpochColumns::resolve("date", unindexed).unwrap_err();
        assert!(err.to_string().contains("date_final"));
    }

    #[test]
    fn parses_properties_and_geometry() {
        let text = collection(vec![feature(Some("Road"), square()), feature(None, Value::Null)]);
        let corpus = parse_corpus(&text, None).unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.imagery_columns[0], "img_00");
        let first = &corpus.records[0];
        assert_eq!(first.change_type.as_deref(), Some("Road"));
        assert_eq!(first.urban_type.as_deref(), Some("Sparse Urban,N,A"));
        assert_eq!(first.dates[4].as_deref(), Some("05-01-2020"));
        assert_eq!(first.imagery.len(), IMAGERY_FEATURES);
        assert!(matches!(first.geometry, Some(Geometry::Polygon(_))));
        assert_eq!(corpus.records[1].change_type, None);
        assert_eq!(corpus.records[1].geometry, None);
    }

    #[test]
    fn inference_reuses_training_imagery_order() {
        let text = collection(vec![feature(None, square())]);
        let mut columns = crate::record::default_imagery_columns();
        columns.reverse();
        let corpus = parse_corpus(&text, Some(&columns)).unwrap();
        assert_eq!(corpus.records[0].imagery[0], 2.9);

        columns[0] = "img_missing".to_string();
        assert!(matches!(parse_corpus(&text, Some(&columns)), Err(Error::Schema { .. })));
    }

    #[test]
    fn null_imagery_becomes_nan_and_text_is_rejected() {
        let mut with_null = feature(None, square());
        with_null["properties"]["img_03"] = Value::Null;
        let corpus = parse_corpus(&collection(vec![with_null]), None).unwrap();
        assert!(corpus.records[0].imagery[3].is_nan());

        let mut with_text = feature(None, square());
        with_text["properties"]["img_03"] = json!("bright");
        let err = parse_corpus(&collection(vec![feature(None, square()), with_text]), None)
            .unwrap_err();
        assert!(matches!(err, Error::Encoding { record: 1, .. }));
    }

    #[test]
    fn unsupported_geometry_reports_record() {
        let multi_point = json!({ "type": "MultiPoint", "coordinates": [[0.0, 0.0]] });
        let text = collection(vec![feature(None, square()), feature(None, multi_point)]);
        let err = parse_corpus(&text, None).unwrap_err();
        assert!(matches!(
            err,
            Error::Geometry {
                record: 1,
                source: GeometryError::Unsupported(_)
            }
        ));

        let broken = json!({ "type": "Polygon", "coordinates": [[[0.0], [1.0, 1.0]]] });
        let err = parse_corpus(&collection(vec![feature(None, broken)]), None).unwrap_err();
        assert!(matches!(
            err,
            Error::Geometry {
                record: 0,
                source: GeometryError::Malformed(_)
            }
        ));
    }

    #[test]
    fn multipolygon_is_converted() {
        let multi = json!({
            "type": "MultiPolygon",
            "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]]
        });
        let corpus = parse_corpus(&collection(vec![feature(None, multi)]), None).unwrap();
        match &corpus.records[0].geometry {
            Some(Geometry::MultiPolygon(m)) => assert_eq!(m.0.len(), 1),
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn rejects_other_documents() {
        let text = json!({ "type": "Feature", "features": [] }).to_string();
        assert!(matches!(parse_corpus(&text, None), Err(Error::Schema { .. })));
        assert!(matches!(parse_corpus("not json", None), Err(Error::Json(_))));
    }
}
