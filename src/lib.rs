//! Readmit Insight: exploratory analysis and baseline modeling of hospital
//! readmissions.
//!
//! The pipeline loads a CSV with hospital, patient and readmission columns,
//! removes incomplete and duplicate rows, encodes hospital size, derives the
//! discharge year and the HRRP penalty flag, summarizes the data, renders
//! charts and compares logistic regression with a random forest.

pub mod charts;
pub mod cli;
pub mod config;
pub mod data;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use cli::Args;
pub use config::PipelineConfig;
pub use data::{CleanTable, DataCleaner, DataLoader, RecordTable};
pub use model::{train_and_evaluate, FeatureMatrix, ModelingReport};
pub use report::PipelineReport;
pub use stats::Analysis;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
