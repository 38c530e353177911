//! Chart Plotter Module
//! Prepares the numbers behind each figure: bins, density curves, box summaries
//! and color scales. Nothing here touches a drawing backend.

use crate::stats::StatsCalculator;
use plotters::style::RGBColor;

/// Color for the first series (hospital size "Small", the baseline group)
pub const CONTROL_COLOR: RGBColor = RGBColor(52, 152, 219); // Blue

pub const PALETTE: [RGBColor; 10] = [
    RGBColor(231, 76, 60),  // Red
    RGBColor(46, 204, 113), // Green
    RGBColor(155, 89, 182), // Purple
    RGBColor(243, 156, 18), // Orange
    RGBColor(26, 188, 156), // Teal
    RGBColor(233, 30, 99),  // Pink
    RGBColor(0, 188, 212),  // Cyan
    RGBColor(255, 87, 34),  // Deep Orange
    RGBColor(121, 85, 72),  // Brown
    RGBColor(96, 125, 139), // Blue Grey
];

/// Series color by position; index 0 is the control color.
pub fn series_color(index: usize) -> RGBColor {
    if index == 0 {
        CONTROL_COLOR
    } else {
        PALETTE[(index - 1) % PALETTE.len()]
    }
}

/// One histogram bar: `[start, end)` and its count (last bin is closed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Quartiles, whiskers and outliers for one box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Most extreme points within 1.5 IQR of the box
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// Creates the data series the renderer draws.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Finite values only.
    fn finite(values: &[f64]) -> Vec<f64> {
        values.iter().copied().filter(|v| v.is_finite()).collect()
    }

    /// Min and max of the finite values.
    pub fn value_range(values: &[f64]) -> Option<(f64, f64)> {
        values
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Range widened by `fraction` of its span on both sides; a degenerate
    /// range is widened by one unit instead.
    pub fn padded_range(min: f64, max: f64, fraction: f64) -> (f64, f64) {
        let span = max - min;
        if span <= f64::EPSILON {
            return (min - 1.0, max + 1.0);
        }
        (min - span * fraction, max + span * fraction)
    }

    /// Equal-width histogram with Sturges' bin count.
    pub fn histogram_bins(values: &[f64]) -> Vec<HistogramBin> {
        let values = Self::finite(values);
        let Some((min, max)) = Self::value_range(&values) else {
            return Vec::new();
        };

        let n_bins = ((values.len() as f64).log2().ceil() as usize + 1).max(1);
        let (min, max) = if max - min <= f64::EPSILON {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };
        let width = (max - min) / n_bins as f64;

        let mut bins: Vec<HistogramBin> = (0..n_bins)
            .map(|i| HistogramBin {
                start: min + i as f64 * width,
                end: min + (i + 1) as f64 * width,
                count: 0,
            })
            .collect();

        for v in values {
            let idx = (((v - min) / width).floor() as usize).min(n_bins - 1);
            bins[idx].count += 1;
        }
        bins
    }

    /// Gaussian kernel density on `points` evenly spaced x positions,
    /// scaled to histogram counts for a bin of width `bin_width`.
    /// Bandwidth follows Scott's rule.
    pub fn kde_curve(values: &[f64], bin_width: f64, points: usize) -> Vec<(f64, f64)> {
        let values = Self::finite(values);
        let n = values.len();
        if n < 2 || points < 2 {
            return Vec::new();
        }
        let summary = StatsCalculator::compute_descriptive_stats(&values);
        if !(summary.std > 0.0) {
            return Vec::new();
        }

        let bandwidth = summary.std * (n as f64).powf(-0.2);
        let lo = summary.min - 3.0 * bandwidth;
        let hi = summary.max + 3.0 * bandwidth;
        let step = (hi - lo) / (points - 1) as f64;
        let norm = 1.0 / (n as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

        (0..points)
            .map(|i| {
                let x = lo + i as f64 * step;
                let density: f64 = values
                    .iter()
                    .map(|&v| {
                        let z = (x - v) / bandwidth;
                        (-0.5 * z * z).exp()
                    })
                    .sum::<f64>()
                    * norm;
                (x, density * n as f64 * bin_width)
            })
            .collect()
    }

    /// Box-plot summary; `None` for an empty group.
    pub fn box_summary(values: &[f64]) -> Option<BoxSummary> {
        let mut sorted = Self::finite(values);
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let q1 = StatsCalculator::quantile(&sorted, 0.25);
        let median = StatsCalculator::quantile(&sorted, 0.5);
        let q3 = StatsCalculator::quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let lower_fence = q1 - 1.5 * iqr;
        let upper_fence = q3 + 1.5 * iqr;

        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|&v| v >= lower_fence && v <= upper_fence)
            .collect();
        let outliers = sorted
            .iter()
            .copied()
            .filter(|&v| v < lower_fence || v > upper_fence)
            .collect();

        Some(BoxSummary {
            q1,
            median,
            q3,
            lower_whisker: inside.first().copied().unwrap_or(q1),
            upper_whisker: inside.last().copied().unwrap_or(q3),
            outliers,
        })
    }

    /// Diverging blue-white-red scale for a correlation in [-1, 1].
    /// NaN maps to light grey.
    pub fn heat_color(r: f64) -> RGBColor {
        if !r.is_finite() {
            return RGBColor(220, 220, 220);
        }
        let t = r.clamp(-1.0, 1.0);
        let blend = |from: (f64, f64, f64), to: (f64, f64, f64), w: f64| {
            RGBColor(
                (from.0 + (to.0 - from.0) * w).round() as u8,
                (from.1 + (to.1 - from.1) * w).round() as u8,
                (from.2 + (to.2 - from.2) * w).round() as u8,
            )
        };
        let white = (247.0, 247.0, 247.0);
        if t < 0.0 {
            blend(white, (59.0, 76.0, 192.0), -t)
        } else {
            blend(white, (180.0, 4.0, 38.0), t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_counts_every_value() {
        let values: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let bins = ChartPlotter::histogram_bins(&values);

        // Sturges: ceil(log2(100)) + 1 = 8
        assert_eq!(bins.len(), 8);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 100);
        assert_eq!(bins[0].start, 0.0);
        assert!((bins[7].end - 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_constant_and_empty() {
        let bins = ChartPlotter::histogram_bins(&[0.3, 0.3, 0.3, 0.3]);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 4);
        assert!(bins[0].start < 0.3 && bins.last().unwrap().end > 0.3);

        assert!(ChartPlotter::histogram_bins(&[]).is_empty());
        assert!(ChartPlotter::histogram_bins(&[f64::NAN]).is_empty());
    }

    #[test]
    fn test_kde_area_matches_count() {
        let values: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64 / 100.0).collect();
        let bin_width = 0.1;
        let curve = ChartPlotter::kde_curve(&values, bin_width, 400);
        assert_eq!(curve.len(), 400);

        // Integral of the scaled density over x is n * bin_width
        let area: f64 = curve
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
            .sum();
        let expected = values.len() as f64 * bin_width;
        assert!((area - expected).abs() / expected < 0.01, "area {}", area);
        assert!(curve.iter().all(|&(_, y)| y >= 0.0));
    }

    #[test]
    fn test_kde_needs_spread() {
        assert!(ChartPlotter::kde_curve(&[1.0, 1.0, 1.0], 0.1, 50).is_empty());
        assert!(ChartPlotter::kde_curve(&[1.0], 0.1, 50).is_empty());
    }

    #[test]
    fn test_box_summary_with_outlier() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let summary = ChartPlotter::box_summary(&values).unwrap();

        assert!((summary.q1 - 2.25).abs() < 1e-12);
        assert!((summary.median - 3.5).abs() < 1e-12);
        assert!((summary.q3 - 4.75).abs() < 1e-12);
        assert_eq!(summary.lower_whisker, 1.0);
        assert_eq!(summary.upper_whisker, 5.0);
        assert_eq!(summary.outliers, vec![100.0]);

        assert!(ChartPlotter::box_summary(&[]).is_none());
    }

    #[test]
    fn test_heat_color_endpoints() {
        assert_eq!(ChartPlotter::heat_color(0.0), RGBColor(247, 247, 247));
        assert_eq!(ChartPlotter::heat_color(1.0), RGBColor(180, 4, 38));
        assert_eq!(ChartPlotter::heat_color(-1.0), RGBColor(59, 76, 192));
        assert_eq!(ChartPlotter::heat_color(f64::NAN), RGBColor(220, 220, 220));
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(ChartPlotter::padded_range(0.0, 10.0, 0.1), (-1.0, 11.0));
        assert_eq!(ChartPlotter::padded_range(5.0, 5.0, 0.1), (4.0, 6.0));
        assert_eq!(series_color(0), CONTROL_COLOR);
        assert_eq!(series_color(1), PALETTE[0]);
    }
}
