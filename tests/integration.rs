//! Integration tests for Readmit Insight

use readmit_insight::data::schema::{HOSPITAL_SIZE, PENALTY};
use readmit_insight::model::train_test_split_indices;
use readmit_insight::{pipeline, Analysis, DataCleaner, DataLoader, FeatureMatrix, PipelineConfig};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};

const HEADER: &str =
    "hospital_size,readmission_rate,discharge_date,region,condition_type,age,readmission";

/// Ten rows: rows 8 and 9 repeat rows 1 and 4, row 10 has no readmission rate.
const ROWS: [&str; 10] = [
    "Large,0.25,2021-03-15,North,HF,72,1",
    "Small,0.18,2021-06-01,South,AMI,65,0",
    "Large,0.22,2022-01-20,West,PN,80,1",
    "Small,0.15,2022-07-04,North,HF,58,0",
    "Large,0.30,2023-02-11,South,AMI,77,1",
    "Small,0.19,2023-09-30,West,PN,69,0",
    "Large,0.20,2021-11-05,North,AMI,61,0",
    "Large,0.25,2021-03-15,North,HF,72,1",
    "Small,0.15,2022-07-04,North,HF,58,0",
    "Small,,2022-08-08,South,HF,70,1",
];

fn write_csv(path: &Path, rows: &[&str]) {
    let mut file = fs::File::create(path).unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
}

fn create_test_csv() -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    write_csv(file.path(), &ROWS);
    file
}

#[test]
fn test_cleaning_end_to_end() {
    let file = create_test_csv();
    let raw = DataLoader::new().load_csv(file.path()).unwrap();
    assert_eq!(raw.len(), 10);

    let (clean, summary) = DataCleaner::clean(&raw).unwrap();
    assert_eq!(summary.dropped_missing, 1);
    assert_eq!(summary.dropped_duplicates, 2);
    assert_eq!(summary.output_rows, 7);
    assert_eq!(clean.len(), 7);

    // Hospital size is binary after encoding
    let sizes = clean.numeric_column(HOSPITAL_SIZE).unwrap();
    assert!(sizes.iter().all(|&s| s == 0.0 || s == 1.0));

    // 0.25, 0.22 and 0.30 exceed the threshold; 0.20 does not
    let penalties = clean.numeric_column(PENALTY).unwrap();
    let expected = clean.rows.iter().filter(|r| r.readmission_rate > 0.2).count();
    assert_eq!(penalties.iter().sum::<f64>() as usize, expected);
    assert_eq!(expected, 3);

    let analysis = Analysis::compute(&clean).unwrap();
    assert_eq!(analysis.penalty_total, 3);
    assert_eq!(
        analysis
            .penalty_impact
            .iter()
            .map(|p| p.rows)
            .sum::<usize>(),
        7
    );
}

#[test]
fn test_unknown_hospital_size_is_dropped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sizes.csv");
    write_csv(
        &path,
        &[
            "Large,0.25,2021-03-15,North,HF,72,1",
            "Medium,0.18,2021-06-01,South,AMI,65,0",
            "Small,0.15,2022-07-04,North,HF,58,0",
        ],
    );

    let raw = DataLoader::new().load_csv(&path).unwrap();
    let (clean, summary) = DataCleaner::clean(&raw).unwrap();
    assert_eq!(summary.dropped_unmapped_size, 1);
    assert_eq!(clean.len(), 2);
}

#[test]
fn test_feature_matrix_from_csv() {
    let file = create_test_csv();
    let raw = DataLoader::new().load_csv(file.path()).unwrap();
    let (clean, _) = DataCleaner::clean(&raw).unwrap();

    let matrix = FeatureMatrix::from_clean(&clean).unwrap();
    assert_eq!(matrix.n_samples(), 7);
    // 4 base columns, 3 regions, 3 conditions
    assert_eq!(matrix.n_features(), 10);
    assert!(matrix.feature_names.contains(&"region_West".to_string()));
    assert!(matrix.feature_names.contains(&"condition_type_PN".to_string()));
}

#[test]
fn test_split_reproducible() {
    let (train_a, test_a) = train_test_split_indices(500, 0.2, 42).unwrap();
    let (train_b, test_b) = train_test_split_indices(500, 0.2, 42).unwrap();
    assert_eq!(test_a.len(), 100);
    assert_eq!(train_a.len(), 400);
    assert_eq!(test_a, test_b);
    assert_eq!(train_a, train_b);
}

#[test]
fn test_pipeline_writes_report() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("hrrp.csv");
    write_csv(&input, &ROWS);

    let config = PipelineConfig {
        input,
        output_dir: dir.path().join("out"),
        n_trees: 10,
        render_charts: false,
        ..Default::default()
    };
    let report = pipeline::run(&config).unwrap();

    assert_eq!(report.raw_rows, 10);
    assert_eq!(report.preview.len(), 5);
    assert_eq!(report.preview[0][0].as_deref(), Some("Large"));
    assert_eq!(report.preview[0][2].as_deref(), Some("2021-03-15"));

    // Input statistics see all ten rows; one rate is missing
    let raw_rate = &report.raw_summary[0];
    assert_eq!(raw_rate.column, "readmission_rate");
    assert_eq!(raw_rate.count, 9);
    assert_eq!(raw_rate.max, 0.30);
    assert_eq!(report.cleaning.output_rows, 7);
    assert_eq!(report.modeling.test_rows + report.modeling.train_rows, 7);
    assert_eq!(report.modeling.test_rows, 2);
    assert!(report.charts.is_empty());

    let importance_sum: f64 = report
        .modeling
        .feature_importances
        .iter()
        .map(|f| f.importance)
        .sum();
    assert!(report.modeling.feature_importances.iter().all(|f| f.importance >= 0.0));
    assert!(importance_sum.abs() < 1e-9 || (importance_sum - 1.0).abs() < 1e-9);

    let json = fs::read_to_string(config.report_path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["cleaning"]["dropped_duplicates"], 2);
    assert_eq!(value["preview"].as_array().unwrap().len(), 5);
    assert_eq!(value["analysis"]["penalty_total"], 3);
}

#[test]
fn test_pipeline_missing_file() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig {
        input: dir.path().join("absent.csv"),
        output_dir: dir.path().join("out"),
        render_charts: false,
        ..Default::default()
    };

    let err = pipeline::run(&config).unwrap_err();
    assert!(err.to_string().contains("Failed to load"));
}

#[test]
fn test_missing_required_column() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "hospital_size,readmission_rate,discharge_date,condition_type,age,readmission").unwrap();
    writeln!(file, "Large,0.25,2021-03-15,HF,72,1").unwrap();

    let err = DataLoader::new().load_csv(file.path()).unwrap_err();
    assert!(err.to_string().contains("region"));
}
