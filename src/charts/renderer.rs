//! Static Chart Renderer
//! Writes every exploratory and modeling figure as a PNG with plotters.
//!
//! Figures:
//! 1. Readmission-rate histogram with a KDE curve
//! 2. Correlation heatmap of all numeric columns, annotated
//! 3. Mean readmission rate per region over discharge years
//! 4. Rate box plots by hospital size and by condition type
//! 5. Pair plot of hospital size, age and readmission rate
//! 6. Random-forest feature importances, horizontal bars

use crate::charts::plotter::{series_color, ChartPlotter, CONTROL_COLOR};
use crate::data::schema::READMISSION_RATE;
use crate::data::CleanTable;
use crate::model::FeatureImportance;
use crate::stats::aggregates::rates_by;
use crate::stats::{Analysis, CorrelationMatrix, TrendPoint, HOSPITAL_PAIR_COLUMNS};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const RATE_HISTOGRAM: &str = "readmission_rate_hist.png";
pub const CORRELATION_HEATMAP: &str = "correlation_heatmap.png";
pub const REGIONAL_TRENDS: &str = "regional_trends.png";
pub const RATE_BY_SIZE: &str = "rate_by_hospital_size.png";
pub const HOSPITAL_PAIRPLOT: &str = "hospital_pairplot.png";
pub const RATE_BY_CONDITION: &str = "rate_by_condition.png";
pub const FEATURE_IMPORTANCE: &str = "feature_importance.png";

const FONT: &str = "sans-serif";
const GRID: RGBColor = RGBColor(200, 200, 200);

type DrawResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to draw {chart}: {message}")]
    Drawing { chart: String, message: String },
    #[error("No data to plot for {0}")]
    EmptyData(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders figures into one output directory.
pub struct StaticChartRenderer {
    output_dir: PathBuf,
    size: (u32, u32),
}

impl StaticChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            size: (1000, 600),
        }
    }

    fn run(
        &self,
        file_name: &str,
        draw: impl FnOnce(&Path) -> DrawResult,
    ) -> Result<PathBuf, ChartError> {
        let path = self.output_dir.join(file_name);
        draw(&path).map_err(|e| ChartError::Drawing {
            chart: file_name.to_string(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "Chart written");
        Ok(path)
    }

    /// Draw every figure, returning the written paths in drawing order.
    pub fn render_all(
        &self,
        table: &CleanTable,
        analysis: &Analysis,
        importances: &[FeatureImportance],
    ) -> Result<Vec<PathBuf>, ChartError> {
        std::fs::create_dir_all(&self.output_dir)?;

        let rates: Vec<f64> = table.rows.iter().map(|r| r.readmission_rate).collect();
        let by_size: Vec<(String, Vec<f64>)> = rates_by(table, |r| r.hospital_size)
            .into_iter()
            .map(|(size, values)| (size.label().to_string(), values))
            .collect();
        let by_condition: Vec<(String, Vec<f64>)> = rates_by(table, |r| r.condition_type.clone())
            .into_iter()
            .collect();

        let paths = vec![
            self.rate_histogram(&rates)?,
            self.correlation_heatmap(&analysis.correlation)?,
            self.regional_trends(&analysis.regional_trends)?,
            self.rate_boxplot(
                RATE_BY_SIZE,
                "Readmission Rate by Hospital Size",
                "Hospital Size",
                &by_size,
            )?,
            self.hospital_pairplot(table)?,
            self.rate_boxplot(
                RATE_BY_CONDITION,
                "Readmission Rate by Condition Type",
                "Condition Type",
                &by_condition,
            )?,
            self.feature_importance(importances)?,
        ];

        info!(
            charts = paths.len(),
            dir = %self.output_dir.display(),
            "Charts rendered"
        );
        Ok(paths)
    }

    /// Histogram of readmission rates with a KDE overlay.
    pub fn rate_histogram(&self, rates: &[f64]) -> Result<PathBuf, ChartError> {
        let bins = ChartPlotter::histogram_bins(rates);
        if bins.is_empty() {
            return Err(ChartError::EmptyData(READMISSION_RATE.to_string()));
        }
        let bin_width = bins[0].end - bins[0].start;
        let curve = ChartPlotter::kde_curve(rates, bin_width, 200);
        let size = self.size;

        self.run(RATE_HISTOGRAM, |path| {
            let x_min = curve.first().map_or(bins[0].start, |p| p.0.min(bins[0].start));
            let x_max = curve
                .last()
                .map_or(bins[bins.len() - 1].end, |p| p.0.max(bins[bins.len() - 1].end));
            let y_max = bins
                .iter()
                .map(|b| b.count as f64)
                .chain(curve.iter().map(|p| p.1))
                .fold(1.0, f64::max);

            let root = BitMapBackend::new(path, size).into_drawing_area();
            root.fill(&WHITE)?;

            let mut chart = ChartBuilder::on(&root)
                .caption("Distribution of Readmission Rates", (FONT, 28))
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(60)
                .build_cartesian_2d(x_min..x_max, 0f64..y_max * 1.1)?;

            chart
                .configure_mesh()
                .light_line_style(WHITE)
                .bold_line_style(GRID)
                .x_desc("Readmission Rate")
                .y_desc("Count")
                .axis_desc_style((FONT, 16))
                .draw()?;

            chart.draw_series(bins.iter().map(|b| {
                Rectangle::new(
                    [(b.start, 0.0), (b.end, b.count as f64)],
                    CONTROL_COLOR.mix(0.6).filled(),
                )
            }))?;
            chart.draw_series(bins.iter().map(|b| {
                Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], WHITE.stroke_width(1))
            }))?;

            if !curve.is_empty() {
                chart.draw_series(LineSeries::new(
                    curve.iter().copied(),
                    CONTROL_COLOR.stroke_width(3),
                ))?;
            }

            root.present()?;
            Ok(())
        })
    }

    /// Annotated correlation heatmap; row 0 is drawn at the top.
    pub fn correlation_heatmap(&self, matrix: &CorrelationMatrix) -> Result<PathBuf, ChartError> {
        let n = matrix.columns.len();
        if n == 0 {
            return Err(ChartError::EmptyData("correlation matrix".to_string()));
        }
        let side = self.size.1.max(600) + 100;

        self.run(CORRELATION_HEATMAP, |path| {
            let root = BitMapBackend::new(path, (side + 150, side)).into_drawing_area();
            root.fill(&WHITE)?;

            let top = n as f64 - 0.5;
            let mut chart = ChartBuilder::on(&root)
                .caption("Correlation Matrix", (FONT, 28))
                .margin(15)
                .x_label_area_size(120)
                .y_label_area_size(150)
                .build_cartesian_2d(-0.5f64..top, -0.5f64..top)?;

            let x_names = matrix.columns.clone();
            let y_names: Vec<String> = matrix.columns.iter().rev().cloned().collect();
            chart
                .configure_mesh()
                .disable_mesh()
                .x_labels(n)
                .y_labels(n)
                .x_label_formatter(&|v| category_label(&x_names, *v))
                .y_label_formatter(&|v| category_label(&y_names, *v))
                .x_label_style((FONT, 13).into_font().transform(FontTransform::Rotate90))
                .y_label_style((FONT, 13))
                .draw()?;

            let cells: Vec<(usize, usize, f64)> = (0..n)
                .flat_map(|i| (0..n).map(move |j| (i, j)))
                .map(|(i, j)| (i, j, matrix.values[i][j]))
                .collect();

            chart.draw_series(cells.iter().map(|&(i, j, r)| {
                let x = j as f64;
                let y = (n - 1 - i) as f64;
                Rectangle::new(
                    [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                    ChartPlotter::heat_color(r).filled(),
                )
            }))?;

            let label_style = TextStyle::from((FONT, 14).into_font())
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Center));
            chart.draw_series(cells.iter().map(|&(i, j, r)| {
                let text = if r.is_finite() {
                    format!("{:.2}", r)
                } else {
                    "nan".to_string()
                };
                Text::new(text, (j as f64, (n - 1 - i) as f64), label_style.clone())
            }))?;

            root.present()?;
            Ok(())
        })
    }

    /// One line per region: mean rate against discharge year.
    pub fn regional_trends(&self, trends: &[TrendPoint]) -> Result<PathBuf, ChartError> {
        let mut by_region: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
        for point in trends {
            by_region
                .entry(point.region.as_str())
                .or_default()
                .push((f64::from(point.year), point.mean_rate));
        }

        let years: Vec<f64> = trends.iter().map(|t| f64::from(t.year)).collect();
        let rates: Vec<f64> = trends.iter().map(|t| t.mean_rate).collect();
        let (x_min, x_max) = ChartPlotter::value_range(&years).unwrap_or((0.0, 1.0));
        let (x_min, x_max) = (x_min - 0.5, x_max + 0.5);
        let (y_min, y_max) = ChartPlotter::value_range(&rates)
            .map(|(lo, hi)| ChartPlotter::padded_range(lo, hi, 0.1))
            .unwrap_or((0.0, 1.0));
        let size = self.size;

        self.run(REGIONAL_TRENDS, |path| {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            root.fill(&WHITE)?;

            let mut chart = ChartBuilder::on(&root)
                .caption("Regional Readmission Trends", (FONT, 28))
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(60)
                .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

            chart
                .configure_mesh()
                .light_line_style(WHITE)
                .bold_line_style(GRID)
                .x_desc("Year")
                .y_desc("Mean Readmission Rate")
                .x_label_formatter(&|v| {
                    if (v - v.round()).abs() < 1e-6 {
                        format!("{:.0}", v)
                    } else {
                        String::new()
                    }
                })
                .axis_desc_style((FONT, 16))
                .draw()?;

            for (idx, (region, points)) in by_region.iter().enumerate() {
                let color = series_color(idx);
                chart
                    .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
                    .label(*region)
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
                chart.draw_series(
                    points
                        .iter()
                        .map(|&p| Circle::new(p, 4, color.filled())),
                )?;
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .label_font((FONT, 14))
                .draw()?;

            root.present()?;
            Ok(())
        })
    }

    /// Box plot of readmission rates, one box per group.
    pub fn rate_boxplot(
        &self,
        file_name: &str,
        title: &str,
        x_desc: &str,
        groups: &[(String, Vec<f64>)],
    ) -> Result<PathBuf, ChartError> {
        let boxes: Vec<(String, _)> = groups
            .iter()
            .filter_map(|(name, values)| {
                ChartPlotter::box_summary(values).map(|summary| (name.clone(), summary))
            })
            .collect();

        let all: Vec<f64> = groups.iter().flat_map(|(_, v)| v.iter().copied()).collect();
        let (y_min, y_max) = ChartPlotter::value_range(&all)
            .map(|(lo, hi)| ChartPlotter::padded_range(lo, hi, 0.1))
            .unwrap_or((0.0, 1.0));
        let names: Vec<String> = boxes.iter().map(|(name, _)| name.clone()).collect();
        let k = boxes.len().max(1);
        let size = self.size;

        self.run(file_name, |path| {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            root.fill(&WHITE)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(title, (FONT, 28))
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(60)
                .build_cartesian_2d(-0.5f64..k as f64 - 0.5, y_min..y_max)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .light_line_style(WHITE)
                .bold_line_style(GRID)
                .x_labels(k)
                .x_label_formatter(&|v| category_label(&names, *v))
                .x_desc(x_desc)
                .y_desc("Readmission Rate")
                .axis_desc_style((FONT, 16))
                .draw()?;

            for (idx, (_, summary)) in boxes.iter().enumerate() {
                let color = series_color(idx);
                let x = idx as f64;
                let half = 0.3;

                chart.draw_series(std::iter::once(Rectangle::new(
                    [(x - half, summary.q1), (x + half, summary.q3)],
                    color.mix(0.5).filled(),
                )))?;
                chart.draw_series(std::iter::once(Rectangle::new(
                    [(x - half, summary.q1), (x + half, summary.q3)],
                    color.stroke_width(2),
                )))?;

                let cap = |y: f64| vec![(x - half / 2.0, y), (x + half / 2.0, y)];
                let segments = [
                    vec![(x - half, summary.median), (x + half, summary.median)],
                    vec![(x, summary.q3), (x, summary.upper_whisker)],
                    vec![(x, summary.q1), (x, summary.lower_whisker)],
                    cap(summary.upper_whisker),
                    cap(summary.lower_whisker),
                ];
                chart.draw_series(
                    segments
                        .into_iter()
                        .map(|points| PathElement::new(points, BLACK.stroke_width(2))),
                )?;
                chart.draw_series(
                    summary
                        .outliers
                        .iter()
                        .map(|&v| Circle::new((x, v), 3, color.stroke_width(1))),
                )?;
            }

            root.present()?;
            Ok(())
        })
    }

    /// 3x3 grid: histograms on the diagonal, scatter plots elsewhere.
    pub fn hospital_pairplot(&self, table: &CleanTable) -> Result<PathBuf, ChartError> {
        let columns: Vec<(&str, Vec<f64>)> = HOSPITAL_PAIR_COLUMNS
            .iter()
            .map(|&name| (name, table.numeric_column(name).unwrap_or_default()))
            .collect();
        let ranges: Vec<(f64, f64)> = columns
            .iter()
            .map(|(_, values)| {
                ChartPlotter::value_range(values)
                    .map(|(lo, hi)| ChartPlotter::padded_range(lo, hi, 0.05))
                    .unwrap_or((0.0, 1.0))
            })
            .collect();
        let k = columns.len();

        self.run(HOSPITAL_PAIRPLOT, |path| {
            let root = BitMapBackend::new(path, (900, 900)).into_drawing_area();
            root.fill(&WHITE)?;
            let root = root.titled("Hospital Characteristics", (FONT, 26))?;
            let cells = root.split_evenly((k, k));

            for (cell_idx, area) in cells.iter().enumerate() {
                let (row, col) = (cell_idx / k, cell_idx % k);
                let (x_name, x_values) = &columns[col];
                let (x_min, x_max) = ranges[col];

                if row == col {
                    let bins = ChartPlotter::histogram_bins(x_values);
                    let y_max = bins.iter().map(|b| b.count as f64).fold(1.0, f64::max);
                    let mut chart = ChartBuilder::on(area)
                        .margin(8)
                        .x_label_area_size(30)
                        .y_label_area_size(40)
                        .build_cartesian_2d(x_min..x_max, 0f64..y_max * 1.1)?;
                    chart
                        .configure_mesh()
                        .disable_mesh()
                        .x_labels(4)
                        .y_labels(4)
                        .x_desc(*x_name)
                        .label_style((FONT, 11))
                        .draw()?;
                    chart.draw_series(bins.iter().map(|b| {
                        Rectangle::new(
                            [(b.start, 0.0), (b.end, b.count as f64)],
                            CONTROL_COLOR.mix(0.6).filled(),
                        )
                    }))?;
                } else {
                    let (y_name, y_values) = &columns[row];
                    let (y_min, y_max) = ranges[row];
                    let mut chart = ChartBuilder::on(area)
                        .margin(8)
                        .x_label_area_size(30)
                        .y_label_area_size(40)
                        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
                    chart
                        .configure_mesh()
                        .disable_mesh()
                        .x_labels(4)
                        .y_labels(4)
                        .x_desc(*x_name)
                        .y_desc(*y_name)
                        .label_style((FONT, 11))
                        .draw()?;
                    chart.draw_series(
                        x_values
                            .iter()
                            .zip(y_values.iter())
                            .map(|(&x, &y)| {
                                Circle::new((x, y), 2, CONTROL_COLOR.mix(0.5).filled())
                            }),
                    )?;
                }
            }

            root.present()?;
            Ok(())
        })
    }

    /// Horizontal bars, most important feature on top.
    pub fn feature_importance(&self, ranking: &[FeatureImportance]) -> Result<PathBuf, ChartError> {
        if ranking.is_empty() {
            return Err(ChartError::EmptyData("feature importances".to_string()));
        }
        let k = ranking.len();
        let names: Vec<String> = ranking.iter().rev().map(|f| f.feature.clone()).collect();
        let x_max = ranking
            .iter()
            .map(|f| f.importance)
            .fold(0.0, f64::max)
            .max(1e-3)
            * 1.1;
        let height = (k as u32 * 28 + 120).max(self.size.1);
        let width = self.size.0;

        self.run(FEATURE_IMPORTANCE, |path| {
            let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
            root.fill(&WHITE)?;

            let mut chart = ChartBuilder::on(&root)
                .caption("Random Forest Feature Importance", (FONT, 28))
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(200)
                .build_cartesian_2d(0f64..x_max, -0.5f64..k as f64 - 0.5)?;

            chart
                .configure_mesh()
                .disable_y_mesh()
                .light_line_style(WHITE)
                .bold_line_style(GRID)
                .y_labels(k)
                .y_label_formatter(&|v| category_label(&names, *v))
                .x_desc("Importance")
                .axis_desc_style((FONT, 16))
                .draw()?;

            chart.draw_series(ranking.iter().enumerate().map(|(rank, f)| {
                let y = (k - 1 - rank) as f64;
                Rectangle::new([(0.0, y - 0.35), (f.importance, y + 0.35)], CONTROL_COLOR.filled())
            }))?;

            root.present()?;
            Ok(())
        })
    }
}

/// Category name for an integer tick, empty between ticks.
fn category_label(names: &[String], v: f64) -> String {
    let idx = v.round();
    if (v - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    names.get(idx as usize).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Admission, HospitalSize};
    use crate::model::rank_importances;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn table() -> CleanTable {
        let rows = (0..40)
            .map(|i| Admission {
                hospital_size: if i % 2 == 0 {
                    HospitalSize::Large
                } else {
                    HospitalSize::Small
                },
                readmission_rate: 0.1 + (i % 7) as f64 * 0.03,
                discharge_date: NaiveDate::from_ymd_opt(2020 + (i % 3), 1 + (i % 12) as u32, 1)
                    .unwrap(),
                region: ["North", "South", "West"][i as usize % 3].to_string(),
                condition_type: ["HF", "AMI"][i as usize % 2].to_string(),
                age: 60.0 + i as f64,
                readmission: (i % 3 == 0) as u8,
                extra_numeric: vec![],
                extra_text: vec![],
            })
            .collect();
        CleanTable::new(vec![], vec![], rows)
    }

    #[test]
    fn test_category_label() {
        let names = vec!["Large".to_string(), "Small".to_string()];
        assert_eq!(category_label(&names, 0.0), "Large");
        assert_eq!(category_label(&names, 1.0), "Small");
        assert_eq!(category_label(&names, 0.5), "");
        assert_eq!(category_label(&names, 2.0), "");
        assert_eq!(category_label(&names, -1.0), "");
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        let dir = tempdir().unwrap();
        let renderer = StaticChartRenderer::new(dir.path());
        assert!(matches!(
            renderer.rate_histogram(&[]),
            Err(ChartError::EmptyData(_))
        ));
        assert!(matches!(
            renderer.feature_importance(&[]),
            Err(ChartError::EmptyData(_))
        ));
    }

    #[test]
    #[ignore = "requires a system sans-serif font"]
    fn test_render_all_writes_every_chart() {
        let dir = tempdir().unwrap();
        let table = table();
        let analysis = Analysis::compute(&table).unwrap();
        let names: Vec<String> = vec!["hospital_size".into(), "age".into()];
        let ranking = rank_importances(&names, &[0.3, 0.7]);

        let renderer = StaticChartRenderer::new(dir.path().join("charts"));
        let paths = renderer.render_all(&table, &analysis, &ranking).unwrap();

        assert_eq!(paths.len(), 7);
        for path in &paths {
            assert!(path.exists(), "{} missing", path.display());
        }
        assert!(dir.path().join("charts").join(HOSPITAL_PAIRPLOT).exists());
    }
}
