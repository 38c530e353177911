//! Pipeline report: console tables and the JSON summary written next to the charts

use crate::data::{CleaningSummary, MissingCount};
use crate::model::{Evaluation, ModelingReport};
use crate::stats::{Analysis, ColumnSummary};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Every statistic one run computed.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub input: PathBuf,
    pub columns: Vec<String>,
    pub raw_rows: usize,
    /// First rows of the input, cells as read
    pub preview: Vec<Vec<Option<String>>>,
    /// Numeric columns of the input before cleaning
    pub raw_summary: Vec<ColumnSummary>,
    pub missing_counts: Vec<MissingCount>,
    pub cleaning: CleaningSummary,
    pub analysis: Analysis,
    pub modeling: ModelingReport,
    pub charts: Vec<PathBuf>,
}

impl PipelineReport {
    /// Serialize the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> crate::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Print every table to stdout
    pub fn print_console(&self) {
        println!("\n=== Dataset ===");
        println!("Input: {}", self.input.display());
        println!("Rows: {}", self.raw_rows);
        println!("Columns: {}", self.columns.join(", "));
        self.print_preview();
        print_summary("Input Summary Statistics", &self.raw_summary);

        println!("\nMissing values:");
        for m in &self.missing_counts {
            println!("  {:<20} {:>6}", m.column, m.missing);
        }

        let c = &self.cleaning;
        println!("\n=== Cleaning ===");
        println!("  Input rows:                {:>6}", c.input_rows);
        println!("  Dropped (missing values):  {:>6}", c.dropped_missing);
        println!("  Dropped (duplicates):      {:>6}", c.dropped_duplicates);
        println!("  Dropped (unknown size):    {:>6}", c.dropped_unmapped_size);
        println!("  Clean rows:                {:>6}", c.output_rows);

        print_summary("Summary Statistics", &self.analysis.summary);
        self.print_groups();
        self.print_penalties();
        self.print_models();

        if !self.charts.is_empty() {
            println!("\nCharts:");
            for path in &self.charts {
                println!("  {}", path.display());
            }
        }
    }

    fn print_preview(&self) {
        println!("\nFirst {} rows:", self.preview.len());
        println!("  {}", self.columns.join(" | "));
        for row in &self.preview {
            let cells: Vec<&str> = row.iter().map(|c| c.as_deref().unwrap_or("NaN")).collect();
            println!("  {}", cells.join(" | "));
        }
    }

    fn print_groups(&self) {
        let a = &self.analysis;
        println!("\nMean readmission rate by hospital size:");
        for g in &a.rate_by_hospital_size {
            println!("  {:<12} {:.4} (n={})", g.group, g.mean, g.count);
        }
        if let Some(cmp) = &a.size_comparison {
            println!(
                "  Welch t-test Large vs Small: p = {:.4}{}",
                cmp.p_value,
                if cmp.is_significant { " (significant)" } else { "" }
            );
        }

        println!("\nMean readmission rate by condition:");
        for g in &a.rate_by_condition {
            println!("  {:<12} {:.4} (n={})", g.group, g.mean, g.count);
        }
    }

    fn print_penalties(&self) {
        let a = &self.analysis;
        println!("\n=== HRRP Penalty Impact ===");
        println!("  {:<14} {:>9} {:>6}", "hospital_size", "penalties", "rows");
        for p in &a.penalty_impact {
            println!(
                "  {:<14} {:>9} {:>6}",
                format!("{} ({})", p.hospital_size, p.label),
                p.penalties,
                p.rows
            );
        }
        println!("  Total penalized: {}", a.penalty_total);
    }

    fn print_models(&self) {
        let m = &self.modeling;
        println!("\n=== Modeling ===");
        println!(
            "Train rows: {}, test rows: {}, features: {}",
            m.train_rows,
            m.test_rows,
            m.features.len()
        );

        for eval in [&m.logistic, &m.random_forest] {
            print_evaluation(eval);
        }

        println!("\nFeature importances (random forest):");
        for f in &m.feature_importances {
            println!("  {:<28} {:.4}", f.feature, f.importance);
        }
    }
}

fn print_summary(title: &str, summary: &[ColumnSummary]) {
    println!("\n=== {} ===", title);
    println!(
        "  {:<20} {:>7} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    for s in summary {
        println!(
            "  {:<20} {:>7} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            s.column, s.count, s.mean, s.std, s.min, s.p25, s.median, s.p75, s.max
        );
    }
}

fn print_evaluation(eval: &Evaluation) {
    println!("\n{} Accuracy: {:.4}", eval.model, eval.accuracy);
    println!("{}", eval.report);
    println!("Confusion matrix:");
    println!("{}", eval.confusion);
}
