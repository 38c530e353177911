//! Stats module - Descriptive statistics and grouped aggregates

pub mod aggregates;
mod calculator;

pub use aggregates::{GroupMean, PenaltyImpact, SizeComparison, TrendPoint};
pub use calculator::{ColumnSummary, CorrelationMatrix, StatsCalculator, SIGNIFICANCE_THRESHOLD};

use crate::data::schema::{AGE, HOSPITAL_SIZE, READMISSION_RATE};
use crate::data::CleanTable;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
}

/// Columns shown together in the hospital-characteristics pair plot.
pub const HOSPITAL_PAIR_COLUMNS: [&str; 3] = [HOSPITAL_SIZE, AGE, READMISSION_RATE];

/// Every read-only result computed over the cleaned table.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub summary: Vec<ColumnSummary>,
    pub correlation: CorrelationMatrix,
    pub hospital_correlation: CorrelationMatrix,
    pub regional_trends: Vec<TrendPoint>,
    pub rate_by_hospital_size: Vec<GroupMean>,
    pub rate_by_condition: Vec<GroupMean>,
    pub size_comparison: Option<SizeComparison>,
    pub penalty_impact: Vec<PenaltyImpact>,
    pub penalty_total: usize,
}

impl Analysis {
    pub fn compute(table: &CleanTable) -> Result<Self, AnalysisError> {
        let summary = StatsCalculator::describe(table)?;
        let correlation =
            StatsCalculator::correlation_matrix(table, &table.numeric_column_names())?;

        let pair_columns: Vec<String> = HOSPITAL_PAIR_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect();
        let hospital_correlation = StatsCalculator::correlation_matrix(table, &pair_columns)?;

        let penalty_total = table.penalties().iter().map(|&p| usize::from(p)).sum();
        debug!(rows = table.len(), penalty_total, "Analysis computed");

        Ok(Self {
            summary,
            correlation,
            hospital_correlation,
            regional_trends: aggregates::regional_trends(table),
            rate_by_hospital_size: aggregates::rate_by_hospital_size(table),
            rate_by_condition: aggregates::rate_by_condition(table),
            size_comparison: aggregates::compare_hospital_sizes(table),
            penalty_impact: aggregates::penalty_by_size(table),
            penalty_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_column_is_an_error() {
        let table = CleanTable::new(vec![], vec![], vec![]);
        let result = StatsCalculator::correlation_matrix(
            &table,
            &["readmission_rate".to_string(), "bed_count".to_string()],
        );
        match result {
            Err(AnalysisError::UnknownColumn(name)) => assert_eq!(name, "bed_count"),
            other => panic!("expected unknown column, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_table_analysis() {
        let table = CleanTable::new(vec![], vec![], vec![]);
        let analysis = Analysis::compute(&table).unwrap();
        assert_eq!(analysis.penalty_total, 0);
        assert!(analysis.regional_trends.is_empty());
        assert!(analysis.size_comparison.is_none());
        assert!(analysis.summary.iter().all(|s| s.count == 0));
    }
}
