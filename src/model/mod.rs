//! Model module - feature encoding, classifiers, evaluation and explanation

mod dataset;
mod forest;
mod logistic;
mod metrics;
mod tree;

pub use dataset::{train_test_split_indices, FeatureMatrix, Split};
pub use forest::{ForestConfig, RandomForest};
pub use logistic::{LogisticConfig, LogisticRegression};
pub use metrics::{ClassMetrics, ClassificationReport, ConfusionMatrix, Evaluation};
pub use tree::{DecisionTree, TreeConfig, TreeNode};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Need at least {required} rows, found {found}")]
    InsufficientData { required: usize, found: usize },
    #[error("Test ratio must be strictly between 0 and 1, got {0}")]
    InvalidRatio(f64),
    #[error("Feature '{feature}' has a non-finite value at row {row}")]
    NonFinite { feature: String, row: usize },
    #[error("Labels must be 0 or 1, found {0}")]
    InvalidLabel(f64),
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Model has not been fitted yet")]
    NotFitted,
    #[error("Training diverged: {0}")]
    Diverged(&'static str),
}

/// Random-forest importance of one input feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Pair importances with feature names, most important first.
pub fn rank_importances(names: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranking: Vec<FeatureImportance> = names
        .iter()
        .zip(importances)
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranking
}

/// Settings for the split and both classifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub test_ratio: f64,
    pub seed: u64,
    pub logistic: LogisticConfig,
    pub forest: ForestConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            logistic: LogisticConfig::default(),
            forest: ForestConfig::default(),
        }
    }
}

/// Everything the modeling stage reports.
#[derive(Debug, Clone, Serialize)]
pub struct ModelingReport {
    pub features: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub logistic: Evaluation,
    pub random_forest: Evaluation,
    pub feature_importances: Vec<FeatureImportance>,
}

/// Split, fit both classifiers on the training partition, score them on the
/// evaluation partition and rank forest importances.
pub fn train_and_evaluate(
    matrix: &FeatureMatrix,
    config: &ModelConfig,
) -> Result<ModelingReport, ModelError> {
    let split = matrix.train_test_split(config.test_ratio, config.seed)?;
    info!(
        train = split.train.n_samples(),
        test = split.test.n_samples(),
        features = matrix.n_features(),
        "Data split"
    );

    let actual = split.test.labels.to_vec();

    let mut logistic = LogisticRegression::new(config.logistic.clone());
    logistic.fit(&split.train.features, &split.train.labels)?;
    let predicted = logistic.predict(&split.test.features)?;
    let logistic_eval = Evaluation::new("Logistic Regression", &actual, &predicted.to_vec())?;
    info!(
        accuracy = logistic_eval.accuracy,
        iterations = logistic.iterations(),
        "Logistic regression evaluated"
    );

    let mut forest = RandomForest::new(config.forest.clone());
    forest.fit(&split.train.features, &split.train.labels)?;
    let predicted = forest.predict(&split.test.features)?;
    let forest_eval = Evaluation::new("Random Forest", &actual, &predicted.to_vec())?;
    info!(
        accuracy = forest_eval.accuracy,
        trees = forest.n_trees(),
        "Random forest evaluated"
    );

    Ok(ModelingReport {
        features: matrix.feature_names.clone(),
        train_rows: split.train.n_samples(),
        test_rows: split.test.n_samples(),
        logistic: logistic_eval,
        random_forest: forest_eval,
        feature_importances: rank_importances(&matrix.feature_names, forest.feature_importances()),
    })
}
