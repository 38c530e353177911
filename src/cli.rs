//! Command-line interface definitions and argument parsing

use crate::config::PipelineConfig;
use crate::data::schema::PENALTY_THRESHOLD;
use clap::Parser;
use std::path::PathBuf;

/// Hospital readmission analysis: cleaning, EDA charts and baseline classifiers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "hrrp_data.csv")]
    pub input: PathBuf,

    /// Directory for charts and report.json
    #[arg(short, long, default_value = "hrrp_output")]
    pub output_dir: PathBuf,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value = "0.2")]
    pub test_ratio: f64,

    /// Seed for the split and the random forest
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Maximum iterations for logistic regression
    #[arg(long, default_value = "1000")]
    pub max_iter: usize,

    /// Number of trees in the random forest
    #[arg(long, default_value = "100")]
    pub n_trees: usize,

    /// Readmission rate above which a hospital is flagged for a penalty
    #[arg(long, default_value_t = PENALTY_THRESHOLD)]
    pub penalty_threshold: f64,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Print the report as JSON on stdout and disable logging
    #[arg(long)]
    pub json: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate ranges and build the run configuration
    pub fn into_config(self) -> crate::Result<PipelineConfig> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            anyhow::bail!("--test-ratio must be between 0 and 1, got {}", self.test_ratio);
        }
        if self.n_trees == 0 {
            anyhow::bail!("--n-trees must be at least 1");
        }
        if self.max_iter == 0 {
            anyhow::bail!("--max-iter must be at least 1");
        }

        Ok(PipelineConfig {
            input: self.input,
            output_dir: self.output_dir,
            test_ratio: self.test_ratio,
            seed: self.seed,
            max_iter: self.max_iter,
            n_trees: self.n_trees,
            penalty_threshold: self.penalty_threshold,
            render_charts: !self.no_charts,
        })
    }
}
