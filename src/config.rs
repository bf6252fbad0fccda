use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ensemble::RandomForestClassifier;
use crate::linear_model::{Classifier, LinearSVC};
use crate::schema::{NOT_APPLICABLE, TagMatching, TagTokenizer, VocabularyExtractor};
use crate::tree::ClassWeight;

/// Settings for the encoding and experiment pipeline. Every field has a default, so an
/// empty JSON object is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub tag_matching: TagMatching,
    pub protected_tags: Vec<String>,
    pub model: ModelKind,
    pub pca: PcaConfig,
    pub forest: ForestConfig,
    pub svm: SvmConfig,
}

/// Classifier used by `predict`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    RandomForest,
    LinearSvc,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PcaConfig {
    /// Reduced dimensionalities to evaluate.
    pub components: Vec<usize>,
    pub columns: PcaColumns,
}

/// Which feature columns PCA is applied to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PcaColumns {
    #[default]
    Imagery,
    All,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForestConfig {
    pub n_estimators: usize,
    /// `null` grows trees until their leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub class_weight: ClassWeight,
    pub seed: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SvmConfig {
    /// Regularisation strengths to evaluate.
    pub c: Vec<f64>,
    pub max_epochs: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tag_matching: TagMatching::default(),
            protected_tags: vec![NOT_APPLICABLE.to_string()],
            model: ModelKind::default(),
            pca: PcaConfig::default(),
            forest: ForestConfig::default(),
            svm: SvmConfig::default(),
        }
    }
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            components: vec![2, 3, 15, 30],
            columns: PcaColumns::default(),
        }
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(20),
            min_samples_leaf: 1,
            class_weight: ClassWeight::Balanced,
            seed: 42,
        }
    }
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            c: vec![0.1, 1.0, 10.0],
            max_epochs: 50,
            learning_rate: 0.01,
            seed: 42,
        }
    }
}

impl PipelineConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.protected_tags.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::Config("protected_tags must not contain empty tags".to_string()));
        }
        if self.pca.components.is_empty() {
            return Err(Error::Config("pca.components must list at least one k".to_string()));
        }
        if self.pca.components.contains(&0) {
            return Err(Error::Config("pca.components must be positive".to_string()));
        }
        if self.forest.n_estimators == 0 {
            return Err(Error::Config("forest.n_estimators must be positive".to_string()));
        }
        if self.forest.max_depth == Some(0) {
            return Err(Error::Config("forest.max_depth must be positive or null".to_string()));
        }
        if self.forest.min_samples_leaf == 0 {
            return Err(Error::Config("forest.min_samples_leaf must be positive".to_string()));
        }
        if self.svm.c.is_empty() || self.svm.c.iter().any(|&c| c <= 0.0 || !c.is_finite()) {
            return Err(Error::Config("svm.c must list positive values".to_string()));
        }
        if self.svm.learning_rate <= 0.0 || !self.svm.learning_rate.is_finite() {
            return Err(Error::Config("svm.learning_rate must be positive".to_string()));
        }
        if self.svm.max_epochs == 0 {
            return Err(Error::Config("svm.max_epochs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn tokenizer(&self) -> TagTokenizer {
        TagTokenizer::new(self.protected_tags.clone())
    }

    pub fn extractor(&self) -> VocabularyExtractor {
        VocabularyExtractor::new()
            .tokenizer(self.tokenizer())
            .tag_matching(self.tag_matching)
    }

    /// A linear SVM configured from `svm`, with regularisation strength `c`.
    pub fn linear_svc(&self, c: f64) -> LinearSVC {
        LinearSVC::new()
            .c(c)
            .learning_rate(self.svm.learning_rate)
            .max_epochs(self.svm.max_epochs)
            .seed(self.svm.seed)
    }

    pub fn random_forest(&self) -> RandomForestClassifier {
        let forest = RandomForestClassifier::new()
            .n_estimators(self.forest.n_estimators)
            .min_samples_leaf(self.forest.min_samples_leaf)
            .class_weight(self.forest.class_weight)
            .seed(self.forest.seed);
        match self.forest.max_depth {
            Some(depth) => forest.max_depth(depth),
            None => forest,
        }
    }

    /// The classifier selected by `model`. `c` only applies to the linear SVM.
    pub fn model(&self, c: f64) -> Box<dyn Classifier> {
        match self.model {
            ModelKind::RandomForest => Box::new(self.random_forest()),
            ModelKind::LinearSvc => Box::new(self.linear_svc(c)),
        }
    }
}
