//! End-to-end run: load, clean, analyze, model, draw, report

use crate::charts::StaticChartRenderer;
use crate::config::PipelineConfig;
use crate::data::{DataCleaner, DataLoader};
use crate::model::{train_and_evaluate, FeatureMatrix};
use crate::report::PipelineReport;
use crate::stats::{Analysis, StatsCalculator};
use anyhow::Context;
use tracing::info;

/// Input rows shown before cleaning.
const PREVIEW_ROWS: usize = 5;

/// Run every stage in order. The first failing stage aborts the run.
pub fn run(config: &PipelineConfig) -> crate::Result<PipelineReport> {
    info!(input = %config.input.display(), "Starting pipeline");

    let raw = DataLoader::new()
        .load_csv(&config.input)
        .with_context(|| format!("Failed to load {}", config.input.display()))?;
    let columns = raw.column_names();
    let preview = raw.head(PREVIEW_ROWS);
    let raw_summary = StatsCalculator::describe_raw(&raw);
    let missing_counts = raw.missing_counts();

    let (clean, cleaning) = DataCleaner::clean(&raw).context("Failed to clean data")?;
    let clean = clean.with_penalty_threshold(config.penalty_threshold);

    let analysis = Analysis::compute(&clean).context("Failed to analyze data")?;
    info!(
        rows = clean.len(),
        penalized = analysis.penalty_total,
        "Exploratory analysis complete"
    );

    let matrix = FeatureMatrix::from_clean(&clean).context("Failed to build feature matrix")?;
    let modeling =
        train_and_evaluate(&matrix, &config.model_config()).context("Failed to train models")?;

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let charts = if config.render_charts {
        StaticChartRenderer::new(&config.output_dir)
            .render_all(&clean, &analysis, &modeling.feature_importances)
            .context("Failed to render charts")?
    } else {
        Vec::new()
    };

    let report = PipelineReport {
        input: config.input.clone(),
        columns,
        raw_rows: raw.len(),
        preview,
        raw_summary,
        missing_counts,
        cleaning,
        analysis,
        modeling,
        charts,
    };

    let report_path = config.report_path();
    report
        .write_json(&report_path)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    info!(path = %report_path.display(), "Report written");

    Ok(report)
}
