//! Statistics Calculator Module
//! Handles statistical computations including descriptive stats, correlations and t-tests.

use crate::data::{CleanTable, RecordTable};
use crate::stats::AnalysisError;
use rayon::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Significance threshold for t-tests
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.05;

/// Descriptive statistics for a single numeric column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl Default for ColumnSummary {
    fn default() -> Self {
        Self {
            column: String::new(),
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            p25: f64::NAN,
            median: f64::NAN,
            p75: f64::NAN,
            max: f64::NAN,
        }
    }
}

/// Pairwise Pearson correlations with two-sided p-values.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
    pub p_values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Correlation between two named columns.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Look up a numeric column, failing on names the table does not carry.
    pub fn column(table: &CleanTable, name: &str) -> Result<Vec<f64>, AnalysisError> {
        table
            .numeric_column(name)
            .ok_or_else(|| AnalysisError::UnknownColumn(name.to_string()))
    }

    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> ColumnSummary {
        let n = values.len();
        if n == 0 {
            return ColumnSummary::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let (mean, variance) = Self::mean_and_variance(values);

        ColumnSummary {
            column: String::new(),
            count: n,
            mean,
            std: variance.sqrt(),
            min: sorted[0],
            p25: Self::quantile(&sorted, 0.25),
            median: Self::quantile(&sorted, 0.5),
            p75: Self::quantile(&sorted, 0.75),
            max: sorted[n - 1],
        }
    }

    /// Quantile `q` in [0, 1] of sorted values, interpolating linearly between
    /// the closest ranks (NumPy's default method).
    pub fn quantile(sorted: &[f64], q: f64) -> f64 {
        let Some(last) = sorted.len().checked_sub(1) else {
            return f64::NAN;
        };
        let pos = q.clamp(0.0, 1.0) * last as f64;
        let below = pos.floor() as usize;
        let above = (below + 1).min(last);
        let weight = pos - below as f64;
        sorted[below] + (sorted[above] - sorted[below]) * weight
    }

    /// Mean and sample variance (NaN variance below two values).
    fn mean_and_variance(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = if values.len() > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            f64::NAN
        };
        (mean, variance)
    }

    /// Describe the numeric columns of the loaded table, skipping missing cells.
    pub fn describe_raw(table: &RecordTable) -> Vec<ColumnSummary> {
        table
            .numeric_columns()
            .par_iter()
            .map(|(name, values)| ColumnSummary {
                column: name.clone(),
                ..Self::compute_descriptive_stats(values)
            })
            .collect()
    }

    /// Describe every numeric column of the table in parallel.
    pub fn describe(table: &CleanTable) -> Result<Vec<ColumnSummary>, AnalysisError> {
        let columns = table.numeric_column_names();

        // Use rayon for parallel computation
        columns
            .par_iter()
            .map(|name| {
                let values = Self::column(table, name)?;
                let mut summary = Self::compute_descriptive_stats(&values);
                summary.column = name.clone();
                Ok(summary)
            })
            .collect()
    }

    /// Pearson correlation coefficient; NaN when either side is constant.
    pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
        let n = x.len().min(y.len());
        if n < 2 {
            return f64::NAN;
        }

        let mean_x = x[..n].iter().sum::<f64>() / n as f64;
        let mean_y = y[..n].iter().sum::<f64>() / n as f64;

        let mut cov = 0.0;
        let mut var_x = 0.0;
        let mut var_y = 0.0;
        for (a, b) in x[..n].iter().zip(&y[..n]) {
            let dx = a - mean_x;
            let dy = b - mean_y;
            cov += dx * dy;
            var_x += dx * dx;
            var_y += dy * dy;
        }

        if var_x == 0.0 || var_y == 0.0 {
            return f64::NAN;
        }
        (cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0)
    }

    /// Two-sided p-value for a Pearson correlation over `n` pairs.
    pub fn correlation_p_value(r: f64, n: usize) -> f64 {
        if r.is_nan() || n < 3 {
            return f64::NAN;
        }
        if r.abs() >= 1.0 {
            return 0.0;
        }

        let df = (n - 2) as f64;
        Self::two_sided_p(r * (df / (1.0 - r * r)).sqrt(), df)
    }

    /// Correlation matrix over the named columns.
    pub fn correlation_matrix(
        table: &CleanTable,
        columns: &[String],
    ) -> Result<CorrelationMatrix, AnalysisError> {
        let data = columns
            .iter()
            .map(|name| Self::column(table, name))
            .collect::<Result<Vec<_>, _>>()?;
        let n = table.len();
        let k = columns.len();

        let mut values = vec![vec![f64::NAN; k]; k];
        let mut p_values = vec![vec![f64::NAN; k]; k];
        for i in 0..k {
            for j in i..k {
                let r = Self::pearson(&data[i], &data[j]);
                let p = Self::correlation_p_value(r, n);
                values[i][j] = r;
                values[j][i] = r;
                p_values[i][j] = p;
                p_values[j][i] = p;
            }
        }

        Ok(CorrelationMatrix {
            columns: columns.to_vec(),
            values,
            p_values,
        })
    }

    /// Welch's t-test of `a` against `b`: two-sided p-value and whether it is
    /// at or below [`SIGNIFICANCE_THRESHOLD`]. NaN when a side has fewer than
    /// two values; identical constant samples give p = 1.
    pub fn welch_ttest(a: &[f64], b: &[f64]) -> (f64, bool) {
        if a.len() < 2 || b.len() < 2 {
            return (f64::NAN, false);
        }
        let (n_a, n_b) = (a.len() as f64, b.len() as f64);
        let (mean_a, var_a) = Self::mean_and_variance(a);
        let (mean_b, var_b) = Self::mean_and_variance(b);

        let se_a = var_a / n_a;
        let se_b = var_b / n_b;
        if se_a + se_b == 0.0 {
            return (1.0, false);
        }

        let t = (mean_a - mean_b) / (se_a + se_b).sqrt();
        let df = (se_a + se_b).powi(2)
            / (se_a.powi(2) / (n_a - 1.0) + se_b.powi(2) / (n_b - 1.0));

        let p_value = Self::two_sided_p(t, df);
        (p_value, p_value <= SIGNIFICANCE_THRESHOLD)
    }

    fn two_sided_p(t: f64, df: f64) -> f64 {
        match StudentsT::new(0.0, 1.0, df) {
            Ok(dist) => 2.0 * (1.0 - dist.cdf(t.abs())),
            Err(_) => f64::NAN,
        }
    }
}
