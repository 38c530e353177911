//! Grouped aggregates over cleaned admissions: regional trends, per-category
//! means and HRRP penalty counts.

use crate::data::{Admission, CleanTable, HospitalSize};
use crate::stats::StatsCalculator;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub group: String,
    pub count: usize,
    pub mean: f64,
}

/// Mean readmission rate for one (region, year) cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub region: String,
    pub year: i32,
    pub count: usize,
    pub mean_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PenaltyImpact {
    pub hospital_size: u8,
    pub label: String,
    pub penalties: usize,
    pub rows: usize,
}

/// Readmission rate, Large vs Small hospitals.
#[derive(Debug, Clone, Serialize)]
pub struct SizeComparison {
    pub large: GroupMean,
    pub small: GroupMean,
    pub p_value: f64,
    pub is_significant: bool,
}

/// Mean readmission rate grouped by region and discharge year.
pub fn regional_trends(table: &CleanTable) -> Vec<TrendPoint> {
    let mut cells: BTreeMap<(String, i32), (f64, usize)> = BTreeMap::new();
    for row in &table.rows {
        let cell = cells.entry((row.region.clone(), row.year())).or_default();
        cell.0 += row.readmission_rate;
        cell.1 += 1;
    }

    cells
        .into_iter()
        .map(|((region, year), (sum, count))| TrendPoint {
            region,
            year,
            count,
            mean_rate: sum / count as f64,
        })
        .collect()
}

/// Mean readmission rate grouped by an arbitrary key, sorted by key.
pub fn mean_rate_by<K, F>(table: &CleanTable, key: F) -> Vec<GroupMean>
where
    K: Ord + ToString,
    F: Fn(&Admission) -> K,
{
    let mut groups: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for row in &table.rows {
        let group = groups.entry(key(row)).or_default();
        group.0 += row.readmission_rate;
        group.1 += 1;
    }

    groups
        .into_iter()
        .map(|(k, (sum, count))| GroupMean {
            group: k.to_string(),
            count,
            mean: sum / count as f64,
        })
        .collect()
}

pub fn rate_by_hospital_size(table: &CleanTable) -> Vec<GroupMean> {
    mean_rate_by(table, |r| r.hospital_size)
}

pub fn rate_by_condition(table: &CleanTable) -> Vec<GroupMean> {
    mean_rate_by(table, |r| r.condition_type.clone())
}

/// Raw readmission rates per group, used for distribution charts.
pub fn rates_by<K, F>(table: &CleanTable, key: F) -> BTreeMap<K, Vec<f64>>
where
    K: Ord,
    F: Fn(&Admission) -> K,
{
    let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for row in &table.rows {
        groups.entry(key(row)).or_default().push(row.readmission_rate);
    }
    groups
}

/// Welch t-test of readmission rates between hospital sizes.
///
/// `None` when either size is absent from the table.
pub fn compare_hospital_sizes(table: &CleanTable) -> Option<SizeComparison> {
    let groups = rates_by(table, |r| r.hospital_size);
    let large = groups.get(&HospitalSize::Large)?;
    let small = groups.get(&HospitalSize::Small)?;

    let summarize = |size: HospitalSize, values: &[f64]| GroupMean {
        group: size.to_string(),
        count: values.len(),
        mean: StatsCalculator::compute_descriptive_stats(values).mean,
    };

    let (p_value, is_significant) = StatsCalculator::welch_ttest(large, small);

    Some(SizeComparison {
        large: summarize(HospitalSize::Large, large),
        small: summarize(HospitalSize::Small, small),
        p_value,
        is_significant,
    })
}

/// Sum of penalty flags per encoded hospital size (sizes present only).
pub fn penalty_by_size(table: &CleanTable) -> Vec<PenaltyImpact> {
    let mut groups: BTreeMap<HospitalSize, (usize, usize)> = BTreeMap::new();
    for row in &table.rows {
        let group = groups.entry(row.hospital_size).or_default();
        group.0 += usize::from(row.penalty(table.penalty_threshold));
        group.1 += 1;
    }

    groups
        .into_iter()
        .map(|(size, (penalties, rows))| PenaltyImpact {
            hospital_size: size.code(),
            label: size.to_string(),
            penalties,
            rows,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(size: HospitalSize, rate: f64, year: i32, region: &str, condition: &str) -> Admission {
        Admission {
            hospital_size: size,
            readmission_rate: rate,
            discharge_date: NaiveDate::from_ymd_opt(year, 1, 15).unwrap(),
            region: region.to_string(),
            condition_type: condition.to_string(),
            age: 70.0,
            readmission: 0,
            extra_numeric: vec![],
            extra_text: vec![],
        }
    }

    fn sample_table() -> CleanTable {
        use HospitalSize::*;
        CleanTable::new(
            vec![],
            vec![],
            vec![
                row(Large, 0.10, 2020, "West", "COPD"),
                row(Large, 0.30, 2020, "West", "Pneumonia"),
                row(Small, 0.20, 2021, "West", "COPD"),
                row(Small, 0.25, 2020, "East", "Heart Failure"),
                row(Large, 0.40, 2021, "East", "COPD"),
            ],
        )
    }

    #[test]
    fn test_regional_trends_sorted_by_region_then_year() {
        let trends = regional_trends(&sample_table());
        let keys: Vec<(&str, i32)> = trends.iter().map(|t| (t.region.as_str(), t.year)).collect();
        assert_eq!(keys, vec![("East", 2020), ("East", 2021), ("West", 2020), ("West", 2021)]);

        let west_2020 = &trends[2];
        assert_eq!(west_2020.count, 2);
        assert!((west_2020.mean_rate - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_rate_by_condition() {
        let groups = rate_by_condition(&sample_table());
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].group, "COPD");
        assert_eq!(groups[0].count, 3);
        assert!((groups[0].mean - (0.10 + 0.20 + 0.40) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_penalty_by_size_uses_strict_threshold() {
        let impact = penalty_by_size(&sample_table());
        assert_eq!(impact.len(), 2);

        // Small: 0.20 (not penalized), 0.25 (penalized)
        assert_eq!(impact[0].hospital_size, 0);
        assert_eq!(impact[0].penalties, 1);
        assert_eq!(impact[0].rows, 2);

        // Large: 0.10, 0.30, 0.40
        assert_eq!(impact[1].hospital_size, 1);
        assert_eq!(impact[1].penalties, 2);
    }

    #[test]
    fn test_compare_hospital_sizes_requires_both_groups() {
        let table = sample_table();
        let comparison = compare_hospital_sizes(&table).unwrap();
        assert_eq!(comparison.large.count, 3);
        assert_eq!(comparison.small.count, 2);

        let only_large = CleanTable::new(
            vec![],
            vec![],
            vec![row(HospitalSize::Large, 0.1, 2020, "West", "COPD")],
        );
        assert!(compare_hospital_sizes(&only_large).is_none());
    }
}
