use geo::polygon;
use geochange::metrics::confusion_matrix;
use geochange::schema::Block;
use geochange::{
    ChangeType, Classifier, Corpus, FeatureAssembler, LinearSVC, PCA, Record, StandardScaler,
    VocabularyExtractor, EPOCHS, IMAGERY_FEATURES,
};

fn record(change_type: ChangeType, i: usize) -> Record {
    let class = change_type.code() as usize;
    let jitter = (i % 7) as f64 * 0.05;
    let side = 0.0005 * (1.0 + class as f64);
    Record {
        change_type: Some(change_type.label().to_string()),
        urban_type: Some(if class % 2 == 0 { "Sparse Urban,N,A" } else { "Dense Urban" }.to_string()),
        geography_type: Some("Farms,River".to_string()),
        change_status: std::array::from_fn(|e| {
            Some(if e < class { "Land Cleared" } else { "Construction Started" }.to_string())
        }),
        dates: std::array::from_fn(|e| Some(format!("{:02}/0{}/2020", 1 + class + i % 3, e + 1))),
        imagery: (0..IMAGERY_FEATURES)
            .map(|j| if j % 3 == class % 3 { 5.0 + jitter } else { jitter })
            .collect(),
        geometry: Some(
            polygon![(x: 0.0, y: 0.0), (x: side, y: 0.0), (x: side, y: side), (x: 0.0, y: side)]
                .into(),
        ),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== PCA + Linear SVM Example ===\n");

    let classes = [ChangeType::Demolition, ChangeType::Road, ChangeType::Residential];
    let records: Vec<Record> = (0..60).map(|i| record(classes[i % 3], i)).collect();
    let corpus = Corpus::with_default_imagery(records);

    let schema = VocabularyExtractor::new().extract(&corpus)?;
    println!("Urban vocabulary:     {:?}", schema.urban().terms());
    println!("Geography vocabulary: {:?}", schema.geography().terms());
    println!("Status vocabulary:    {:?}", schema.status().terms());
    println!("Features: {} ({} status epochs)\n", schema.n_features(), EPOCHS);

    let dataset = FeatureAssembler::new(&schema).assemble_labeled(&corpus.records)?;
    let (train, test) = dataset.train_test_split(0.25)?;
    let imagery = schema.layout().range(Block::Imagery);

    println!("{:<6} {:>10} {:>12} {:>12}", "k", "Explained", "Train Acc", "Test Acc");
    println!("{}", "-".repeat(44));

    for k in [2, 3, 15, 30] {
        let mut pca = PCA::new().n_components(k);
        let x_train = pca.fit_transform(&train.features.select_columns(imagery.clone())?.data)?;
        let x_test = pca.transform(&test.features.select_columns(imagery.clone())?.data)?;
        let explained = pca.explained_variance_ratio().map(|r| r.sum()).unwrap_or(0.0);

        let mut scaler = StandardScaler::new();
        let x_train = scaler.fit_transform(&x_train)?;
        let x_test = scaler.transform(&x_test)?;

        let mut svm = LinearSVC::new().c(1.0).learning_rate(0.05).max_epochs(100);
        svm.fit(&x_train, &train.labels)?;
        let train_score = svm.score(&x_train, &train.labels)?;
        let test_score = svm.score(&x_test, &test.labels)?;

        println!("{:<6} {:>10.4} {:>12.4} {:>12.4}", k, explained, train_score, test_score);

        if k == 2 {
            let codes: Vec<i64> = classes.iter().map(|c| c.code()).collect();
            let counts = confusion_matrix(&test.labels, &svm.predict(&x_test)?, &codes)?;
            println!("\nConfusion matrix at k = 2 (rows: true, columns: predicted):\n{counts}\n");
        }
    }

    Ok(())
}
