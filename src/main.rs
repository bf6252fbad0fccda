//! Command-line front end for the change-detection feature pipeline.
//!
//! ```text
//! geochange schema  train.geojson -o schema.json
//! geochange encode  train.geojson -o features.csv [--schema schema.json] [--labels]
//! geochange pca     train.geojson [--config pipeline.json]
//! geochange predict train.geojson test.geojson -o submission.csv [--components 15] [--c 1.0]
//! ```
//!
//! `predict` trains the model selected by the configuration's `model` key: a random forest on
//! the full matrix unless `--components` asks for PCA first, or a linear SVM.
//!
//! Logs go to stderr and respect `RUST_LOG` (default `info`); reports go to stdout.

use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use geochange::config::PcaColumns;
use geochange::decomposition::PcaBasis;
use geochange::io::{read_corpus, read_schema, write_feature_matrix, write_schema, write_submission};
use geochange::schema::Block;
use geochange::{
    Classifier, FeatureAssembler, LabeledDataset, Matrix, PCA, PipelineConfig, Schema,
    StandardScaler,
};
use ndarray::{Axis, concatenate, s};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pipeline configuration (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract category vocabularies from a training corpus and save the schema
    Schema(SchemaArgs),
    /// Encode a corpus into a feature CSV
    Encode(EncodeArgs),
    /// Report explained variance and linear SVM training accuracy per PCA dimensionality
    Pca(PcaArgs),
    /// Train on one corpus, predict another and write a submission table
    Predict(PredictArgs),
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Training corpus (GeoJSON FeatureCollection)
    train: PathBuf,
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct EncodeArgs {
    corpus: PathBuf,
    #[arg(short, long)]
    output: PathBuf,
    /// Encode against a saved schema instead of extracting one from `corpus`
    #[arg(long)]
    schema: Option<PathBuf>,
    /// Append the integer change_type column
    #[arg(long)]
    labels: bool,
}

#[derive(Debug, Args)]
struct PcaArgs {
    train: PathBuf,
}

#[derive(Debug, Args)]
struct PredictArgs {
    train: PathBuf,
    test: PathBuf,
    #[arg(short, long)]
    output: PathBuf,
    /// Reduce the configured PCA columns to this many components before training
    #[arg(long)]
    components: Option<usize>,
    /// Linear SVM regularisation strength; defaults to the first configured value
    #[arg(long)]
    c: Option<f64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Command::Schema(args) => schema(&config, &args),
        Command::Encode(args) => encode(&config, &args),
        Command::Pca(args) => pca(&config, &args),
        Command::Predict(args) => predict(&config, &args),
    }
}

fn schema(config: &PipelineConfig, args: &SchemaArgs) -> Result<()> {
    let (schema, _) = training_schema(config, &args.train)?;
    write_schema(&args.output, &schema)
        .with_context(|| format!("writing schema to {}", args.output.display()))?;
    Ok(())
}

fn encode(config: &PipelineConfig, args: &EncodeArgs) -> Result<()> {
    let (schema, corpus) = match &args.schema {
        Some(path) => {
            let schema = read_schema(path)
                .with_context(|| format!("reading schema from {}", path.display()))?;
            let corpus = read_corpus(&args.corpus, Some(schema.imagery_columns()))
                .with_context(|| format!("reading corpus {}", args.corpus.display()))?;
            (schema, corpus)
        }
        None => training_schema(config, &args.corpus)?,
    };

    let assembler = FeatureAssembler::new(&schema);
    if args.labels {
        let dataset = assembler.assemble_labeled(&corpus.records)?;
        write_feature_matrix(&args.output, &dataset.features, Some(&dataset.labels))?;
    } else {
        let features = assembler.assemble(&corpus.records)?;
        write_feature_matrix(&args.output, &features, None)?;
    }
    Ok(())
}

fn pca(config: &PipelineConfig, args: &PcaArgs) -> Result<()> {
    let (schema, corpus) = training_schema(config, &args.train)?;
    let dataset = FeatureAssembler::new(&schema)
        .assemble_labeled(&corpus.records)?
        .known_labels();
    if dataset.n_samples() == 0 {
        bail!("no training records carry a known change_type");
    }

    let columns = pca_columns(&schema, config.pca.columns);
    let x = &dataset.features.data;
    let basis = PcaBasis::fit(&x.slice(s![.., columns.clone()]).to_owned())?;
    let ratio = basis.explained_variance_ratio();

    println!("{:>4} {:>10} {:>8} {:>9}", "k", "explained", "C", "accuracy");
    for &k in &config.pca.components {
        let reduced = basis
            .project(&x.slice(s![.., columns.clone()]).to_owned(), k)
            .with_context(|| format!("reducing to {k} components"))?;
        let x_k = splice(x, columns.clone(), &reduced)?;
        let x_k = StandardScaler::new().fit_transform(&x_k)?;
        let explained = ratio.slice(s![..k]).sum();

        for &c in &config.svm.c {
            let mut model = config.linear_svc(c);
            model.fit(&x_k, &dataset.labels)?;
            let accuracy = model.score(&x_k, &dataset.labels)?;
            println!("{k:>4} {explained:>10.4} {c:>8} {accuracy:>9.4}");
        }
    }
    Ok(())
}

fn predict(config: &PipelineConfig, args: &PredictArgs) -> Result<()> {
    let (schema, train) = training_schema(config, &args.train)?;
    let test = read_corpus(&args.test, Some(schema.imagery_columns()))
        .with_context(|| format!("reading test corpus {}", args.test.display()))?;

    let assembler = FeatureAssembler::new(&schema);
    let dataset: LabeledDataset = assembler.assemble_labeled(&train.records)?.known_labels();
    if dataset.n_samples() == 0 {
        bail!("no training records carry a known change_type");
    }
    let test_features = assembler.assemble(&test.records)?;

    let (mut x_train, mut x_test) = (dataset.features.data, test_features.data);
    if let Some(k) = args.components {
        let columns = pca_columns(&schema, config.pca.columns);
        let mut pca = PCA::new().n_components(k);
        let reduced = pca.fit_transform(&x_train.slice(s![.., columns.clone()]).to_owned())?;
        let reduced_test = pca.transform(&x_test.slice(s![.., columns.clone()]).to_owned())?;
        x_train = splice(&x_train, columns.clone(), &reduced)?;
        x_test = splice(&x_test, columns, &reduced_test)?;
    }

    let mut scaler = StandardScaler::new();
    let x_train = scaler.fit_transform(&x_train)?;
    let x_test = scaler.transform(&x_test)?;

    let c = args.c.or_else(|| config.svm.c.first().copied()).unwrap_or(1.0);
    if c <= 0.0 {
        bail!("C must be positive, got {c}");
    }
    let mut model = config.model(c);
    model.fit(&x_train, &dataset.labels)?;
    info!(model = ?config.model, accuracy = model.score(&x_train, &dataset.labels)?, "training accuracy");

    let predictions = model.predict(&x_test)?;
    write_submission(&args.output, &predictions)
        .with_context(|| format!("writing submission to {}", args.output.display()))?;
    Ok(())
}

fn training_schema(config: &PipelineConfig, path: &Path) -> Result<(Schema, geochange::Corpus)> {
    let corpus = read_corpus(path, None)
        .with_context(|| format!("reading training corpus {}", path.display()))?;
    let schema = config.extractor().extract(&corpus)?;
    Ok((schema, corpus))
}

fn pca_columns(schema: &Schema, columns: PcaColumns) -> Range<usize> {
    let layout = schema.layout();
    match columns {
        PcaColumns::Imagery => layout.range(Block::Imagery),
        PcaColumns::All => 0..layout.n_features(),
    }
}

/// Replaces `columns` of `x` with `reduced`, keeping the other columns in place.
fn splice(x: &Matrix, columns: Range<usize>, reduced: &Matrix) -> Result<Matrix> {
    let before = x.slice(s![.., ..columns.start]);
    let after = x.slice(s![.., columns.end..]);
    Ok(concatenate(Axis(1), &[before, reduced.view(), after])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geochange::record::default_imagery_columns;
    use geochange::{TagMatching, TagTokenizer};
    use ndarray::array;

    #[test]
    fn splice_replaces_inner_columns() {
        let x = array![[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]];
        let reduced = array![[-1.0], [-2.0]];

        let spliced = splice(&x, 1..3, &reduced).unwrap();
        assert_eq!(spliced, array![[1.0, -1.0, 4.0], [5.0, -2.0, 8.0]]);
    }

    #[test]
    fn splice_at_the_edges() {
        let x = array![[1.0, 2.0, 3.0]];
        assert_eq!(splice(&x, 0..2, &array![[9.0]]).unwrap(), array![[9.0, 3.0]]);
        assert_eq!(splice(&x, 0..3, &array![[7.0, 8.0]]).unwrap(), array![[7.0, 8.0]]);
    }

    #[test]
    fn splice_rejects_mismatched_rows() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(splice(&x, 0..1, &array![[0.0]]).is_err());
    }

    #[test]
    fn pca_columns_follow_layout() {
        let schema = Schema::new(
            default_imagery_columns(),
            vec!["Sparse Urban".into()],
            vec!["Farms".into()],
            vec!["Land Cleared".into()],
            TagTokenizer::default(),
            TagMatching::Token,
        )
        .unwrap();
        assert_eq!(pca_columns(&schema, PcaColumns::Imagery), 0..30);
        assert_eq!(pca_columns(&schema, PcaColumns::All), 0..schema.n_features());
        assert_eq!(schema.n_features(), 30 + 2 + 4 + 1 + 1 + 5);
    }
}
