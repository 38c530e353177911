//! Run configuration shared by every pipeline stage

use crate::data::schema::PENALTY_THRESHOLD;
use crate::model::{ForestConfig, LogisticConfig, ModelConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything one pipeline run needs, passed explicitly to each stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Fraction of rows held out for evaluation
    pub test_ratio: f64,
    pub seed: u64,
    /// Gradient-descent iteration cap for logistic regression
    pub max_iter: usize,
    pub n_trees: usize,
    /// Rates strictly above this are flagged for a penalty
    pub penalty_threshold: f64,
    pub render_charts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("hrrp_data.csv"),
            output_dir: PathBuf::from("hrrp_output"),
            test_ratio: 0.2,
            seed: 42,
            max_iter: 1000,
            n_trees: 100,
            penalty_threshold: PENALTY_THRESHOLD,
            render_charts: true,
        }
    }
}

impl PipelineConfig {
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            test_ratio: self.test_ratio,
            seed: self.seed,
            logistic: LogisticConfig {
                max_iter: self.max_iter,
                ..Default::default()
            },
            forest: ForestConfig {
                n_trees: self.n_trees,
                seed: self.seed,
                ..Default::default()
            },
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join("report.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_carries_run_settings() {
        let config = PipelineConfig {
            seed: 7,
            max_iter: 50,
            n_trees: 12,
            ..Default::default()
        };
        let model = config.model_config();
        assert_eq!(model.seed, 7);
        assert_eq!(model.forest.seed, 7);
        assert_eq!(model.forest.n_trees, 12);
        assert_eq!(model.logistic.max_iter, 50);
        assert_eq!(model.test_ratio, 0.2);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"input": "data/hrrp.csv", "n_trees": 10}"#).unwrap();
        assert_eq!(config.input, PathBuf::from("data/hrrp.csv"));
        assert_eq!(config.n_trees, 10);
        assert_eq!(config.seed, 42);
        assert!(config.render_charts);
    }
}
