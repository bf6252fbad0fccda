use geochange::io::{read_corpus, read_schema, write_schema, write_submission};
use geochange::config::ModelKind;
use geochange::schema::Block;
use geochange::{
    Classifier, FeatureAssembler, IMAGERY_FEATURES, LinearSVC, PCA, PipelineConfig, StandardScaler,
    TagMatching,
};
use serde_json::{Value, json};
use std::path::Path;

const LABELS: [&str; 3] = ["Demolition", "Road", "Residential"];

fn feature(label: &str, class: usize, jitter: f64, urban: &str) -> Value {
    let mut properties = json!({
        "change_type": label,
        "urban_type": urban,
        "geography_type": "Farms,Barren Land",
    });
    let map = properties.as_object_mut().unwrap();
    let statuses = [
        "Greenland",
        "Land Cleared",
        "Construction Started",
        "Construction Done",
        "Operational",
    ];
    for (e, status) in statuses.iter().enumerate() {
        map.insert(format!("change_status_date{e}"), json!(status));
        map.insert(format!("date{e}"), json!(format!("{:02}/0{}/2019", 10 + class, e + 1)));
    }
    // each class lights up its own block of ten imagery columns
    for i in 0..IMAGERY_FEATURES {
        let value = if i / 10 == class % 3 { 10.0 + jitter } else { jitter };
        map.insert(format!("img_{i:02}"), json!(value));
    }
    let (x, y, d) = (10.0, 20.0, 0.001 * (1.0 + class as f64));
    let ring = json!([[x, y], [x + d, y], [x + d, y + d], [x, y + d], [x, y]]);
    json!({
        "type": "Feature",
        "properties": properties,
        "geometry": { "type": "Polygon", "coordinates": [ring] }
    })
}

fn write_collection(path: &Path, features: Vec<Value>) {
    let text = json!({ "type": "FeatureCollection", "features": features }).to_string();
    std::fs::write(path, text).unwrap();
}

fn training_features() -> Vec<Value> {
    let mut features = Vec::new();
    for (class, label) in LABELS.iter().enumerate() {
        for j in 0..4 {
            features.push(feature(label, class, 0.1 * j as f64, "Sparse Urban,N,A"));
        }
    }
    features.push(feature("Bridge", 0, 0.0, "Dense Urban"));
    features
}

#[test]
fn train_and_predict_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let train_path = dir.path().join("train.geojson");
    let test_path = dir.path().join("test.geojson");
    let schema_path = dir.path().join("schema.json");
    let submission_path = dir.path().join("submission.csv");

    write_collection(&train_path, training_features());
    write_collection(
        &test_path,
        vec![feature("", 1, 0.05, "Sparse Urban"), feature("", 2, 0.05, "Rural")],
    );

    let config = PipelineConfig::default();
    let train = read_corpus(&train_path, None).unwrap();
    let schema = config.extractor().extract(&train).unwrap();
    assert_eq!(schema.urban().terms(), &["Sparse Urban", "N,A", "Dense Urban"]);
    assert_eq!(schema.geography().terms(), &["Farms", "Barren Land"]);
    assert_eq!(schema.n_features(), 30 + 2 + 4 + 3 + 2 + 5 * 5);

    write_schema(&schema_path, &schema).unwrap();
    let schema = read_schema(&schema_path).unwrap();

    let assembler = FeatureAssembler::new(&schema);
    let dataset = assembler.assemble_labeled(&train.records).unwrap();
    assert_eq!(dataset.labels[12], -1);
    let dataset = dataset.known_labels();
    assert_eq!(dataset.n_samples(), 12);

    let test = read_corpus(&test_path, Some(schema.imagery_columns())).unwrap();
    let test_features = assembler.assemble(&test.records).unwrap();
    assert_eq!(test_features.columns, dataset.features.columns);

    // an unseen tag sets no urban indicator
    let urban = schema.layout().range(Block::Urban);
    let rural_row = test_features.data.row(1);
    assert!(rural_row.slice(ndarray::s![urban]).iter().all(|&v| v == 0.0));

    let imagery = schema.layout().range(Block::Imagery);
    let mut pca = PCA::new().n_components(3);
    let x_train = pca
        .fit_transform(&dataset.features.select_columns(imagery.clone()).unwrap().data)
        .unwrap();
    let x_test = pca
        .transform(&test_features.select_columns(imagery).unwrap().data)
        .unwrap();
    assert_eq!(x_train.ncols(), 3);
    assert_eq!(x_test.ncols(), 3);

    let mut scaler = StandardScaler::new();
    let x_train = scaler.fit_transform(&x_train).unwrap();
    let x_test = scaler.transform(&x_test).unwrap();

    let mut model = LinearSVC::new().learning_rate(0.1).max_epochs(200);
    model.fit(&x_train, &dataset.labels).unwrap();
    assert!(model.score(&x_train, &dataset.labels).unwrap() >= 0.75);

    let predictions = model.predict(&x_test).unwrap();
    assert!(predictions.iter().all(|p| (0..3).contains(p)));

    write_submission(&submission_path, &predictions).unwrap();
    let text = std::fs::read_to_string(&submission_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Id,change_type"));
    assert_eq!(lines.count(), 2);
}

#[test]
fn default_model_is_a_balanced_random_forest_on_the_full_matrix() {
    let dir = tempfile::tempdir().unwrap();
    let train_path = dir.path().join("train.geojson");
    let test_path = dir.path().join("test.geojson");
    write_collection(&train_path, training_features());
    write_collection(
        &test_path,
        vec![feature("", 1, 0.05, "Sparse Urban"), feature("", 2, 0.05, "Rural")],
    );

    let config = PipelineConfig::default();
    assert_eq!(config.model, ModelKind::RandomForest);

    let train = read_corpus(&train_path, None).unwrap();
    let schema = config.extractor().extract(&train).unwrap();
    let assembler = FeatureAssembler::new(&schema);
    let dataset = assembler.assemble_labeled(&train.records).unwrap().known_labels();
    let test = read_corpus(&test_path, Some(schema.imagery_columns())).unwrap();
    let x_test = assembler.assemble(&test.records).unwrap().data;
    assert_eq!(x_test.ncols(), schema.n_features());

    let mut model = config.model(1.0);
    model.fit(&dataset.features.data, &dataset.labels).unwrap();
    assert_eq!(model.score(&dataset.features.data, &dataset.labels).unwrap(), 1.0);
    assert_eq!(model.predict(&x_test).unwrap().to_vec(), vec![1, 2]);

    let fit_forest = || {
        let mut forest = config.random_forest();
        forest.fit(&dataset.features.data, &dataset.labels).unwrap();
        forest.predict_proba(&x_test).unwrap()
    };
    assert_eq!(fit_forest(), fit_forest());
}

#[test]
fn substring_matching_is_configurable() {
    let config = PipelineConfig::from_json(r#"{"tag_matching": "substring"}"#).unwrap();
    assert_eq!(config.tag_matching, TagMatching::Substring);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.geojson");
    write_collection(&path, vec![feature("Road", 1, 0.0, "Urban Slum,N,A")]);

    let corpus = read_corpus(&path, None).unwrap();
    let token = PipelineConfig::default().extractor().extract(&corpus).unwrap();
    let substring = config.extractor().extract(&corpus).unwrap();
    assert_eq!(token.urban().terms(), substring.urban().terms());
    assert_eq!(substring.tag_matching(), TagMatching::Substring);
}

#[test]
fn missing_epoch_column_is_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.geojson");
    let mut broken = feature("Road", 1, 0.0, "Sparse Urban");
    broken["properties"].as_object_mut().unwrap().remove("date4");
    write_collection(&path, vec![broken]);

    let err = read_corpus(&path, None).unwrap_err();
    assert!(matches!(err, geochange::Error::Schema { .. }));
}

#[test]
fn inference_batch_with_a_null_status_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let train_path = dir.path().join("train.geojson");
    let test_path = dir.path().join("test.geojson");
    write_collection(&train_path, training_features());
    let mut incomplete = feature("", 1, 0.0, "Sparse Urban");
    incomplete["properties"]["change_status_date3"] = Value::Null;
    write_collection(&test_path, vec![feature("", 0, 0.0, "Sparse Urban"), incomplete]);

    let train = read_corpus(&train_path, None).unwrap();
    let schema = PipelineConfig::default().extractor().extract(&train).unwrap();
    let test = read_corpus(&test_path, Some(schema.imagery_columns())).unwrap();

    let err = FeatureAssembler::new(&schema).assemble(&test.records).unwrap_err();
    assert!(matches!(
        err,
        geochange::Error::Encoding { record: 1, ref attribute, .. } if attribute == "change_status[3]"
    ));
}
