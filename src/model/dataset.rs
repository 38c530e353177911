//! Feature matrix construction and seeded train/test splitting

use crate::data::CleanTable;
use crate::model::ModelError;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;

/// Numeric features and binary labels, row-aligned.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub feature_names: Vec<String>,
    /// Feature matrix (n_samples x n_features)
    pub features: Array2<f64>,
    /// Labels, 0.0 or 1.0
    pub labels: Array1<f64>,
}

/// Train/test split result
#[derive(Debug, Clone)]
pub struct Split {
    pub train: FeatureMatrix,
    pub test: FeatureMatrix,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl FeatureMatrix {
    /// Validate shapes, finiteness and label values.
    pub fn new(
        feature_names: Vec<String>,
        features: Array2<f64>,
        labels: Array1<f64>,
    ) -> Result<Self, ModelError> {
        if features.ncols() != feature_names.len() {
            return Err(ModelError::DimensionMismatch {
                expected: feature_names.len(),
                got: features.ncols(),
            });
        }
        if features.nrows() != labels.len() {
            return Err(ModelError::DimensionMismatch {
                expected: features.nrows(),
                got: labels.len(),
            });
        }

        for (row, values) in features.outer_iter().enumerate() {
            if let Some(col) = values.iter().position(|v| !v.is_finite()) {
                return Err(ModelError::NonFinite {
                    feature: feature_names[col].clone(),
                    row,
                });
            }
        }
        if let Some(&bad) = labels.iter().find(|&&l| l != 0.0 && l != 1.0) {
            return Err(ModelError::InvalidLabel(bad));
        }

        Ok(Self {
            feature_names,
            features,
            labels,
        })
    }

    /// Encode the cleaned table: every column but the label, categoricals one-hot.
    ///
    /// Layout: hospital_size, readmission_rate, age, year, `region_<level>`,
    /// `condition_type_<level>` (levels sorted), then numeric extras.
    /// Textual extras are identifiers and are not used as features.
    pub fn from_clean(table: &CleanTable) -> Result<Self, ModelError> {
        let regions: Vec<&str> = table
            .rows
            .iter()
            .map(|r| r.region.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let conditions: Vec<&str> = table
            .rows
            .iter()
            .map(|r| r.condition_type.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut feature_names: Vec<String> = ["hospital_size", "readmission_rate", "age", "year"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        feature_names.extend(regions.iter().map(|r| format!("region_{}", r)));
        feature_names.extend(conditions.iter().map(|c| format!("condition_type_{}", c)));
        feature_names.extend(table.extra_numeric_names.iter().cloned());

        let n_features = feature_names.len();
        let mut features = Array2::<f64>::zeros((table.len(), n_features));
        let mut labels = Array1::<f64>::zeros(table.len());

        for (i, row) in table.rows.iter().enumerate() {
            let mut out = features.row_mut(i);
            out[0] = f64::from(row.hospital_size.code());
            out[1] = row.readmission_rate;
            out[2] = row.age;
            out[3] = f64::from(row.year());

            let mut offset = 4;
            if let Some(pos) = regions.iter().position(|r| *r == row.region) {
                out[offset + pos] = 1.0;
            }
            offset += regions.len();
            if let Some(pos) = conditions.iter().position(|c| *c == row.condition_type) {
                out[offset + pos] = 1.0;
            }
            offset += conditions.len();
            for (j, value) in row.extra_numeric.iter().enumerate() {
                out[offset + j] = *value;
            }

            labels[i] = f64::from(row.readmission);
        }

        Self::new(feature_names, features, labels)
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Create a subset by row indices
    pub fn subset(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            feature_names: self.feature_names.clone(),
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }

    /// Seeded random split; see [`train_test_split_indices`].
    pub fn train_test_split(&self, test_ratio: f64, seed: u64) -> Result<Split, ModelError> {
        let (train_indices, test_indices) =
            train_test_split_indices(self.n_samples(), test_ratio, seed)?;

        Ok(Split {
            train: self.subset(&train_indices),
            test: self.subset(&test_indices),
            train_indices,
            test_indices,
        })
    }
}

/// Shuffle `0..n` with a seeded ChaCha8 generator and cut it in two.
///
/// The test partition holds `ceil(test_ratio * n)` rows and comes first in the
/// shuffled order; the rest is training. Both partitions are non-empty.
pub fn train_test_split_indices(
    n: usize,
    test_ratio: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), ModelError> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(ModelError::InvalidRatio(test_ratio));
    }
    if n < 2 {
        return Err(ModelError::InsufficientData {
            required: 2,
            found: n,
        });
    }

    let test_size = ((test_ratio * n as f64).ceil() as usize).clamp(1, n - 1);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let (test, train) = indices.split_at(test_size);
    Ok((train.to_vec(), test.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Admission, HospitalSize};
    use chrono::NaiveDate;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes_and_reproducibility() {
        let (train_a, test_a) = train_test_split_indices(101, 0.2, 42).unwrap();
        let (train_b, test_b) = train_test_split_indices(101, 0.2, 42).unwrap();

        assert_eq!(test_a.len(), 21);
        assert_eq!(train_a.len(), 80);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);

        let all: HashSet<usize> = train_a.iter().chain(test_a.iter()).copied().collect();
        assert_eq!(all.len(), 101);
    }

    #[test]
    fn test_split_depends_on_seed() {
        let (_, test_a) = train_test_split_indices(50, 0.2, 42).unwrap();
        let (_, test_b) = train_test_split_indices(50, 0.2, 7).unwrap();
        assert_ne!(test_a, test_b);
    }

    #[test]
    fn test_split_rejects_bad_input() {
        assert!(matches!(
            train_test_split_indices(1, 0.2, 42),
            Err(ModelError::InsufficientData { found: 1, .. })
        ));
        assert!(matches!(
            train_test_split_indices(10, 1.0, 42),
            Err(ModelError::InvalidRatio(_))
        ));
        assert!(train_test_split_indices(2, 0.2, 42).is_ok());
    }

    #[test]
    fn test_from_clean_one_hot_encodes_categoricals() {
        let row = |size, region: &str, condition: &str, label| Admission {
            hospital_size: size,
            readmission_rate: 0.15,
            discharge_date: NaiveDate::from_ymd_opt(2022, 5, 1).unwrap(),
            region: region.to_string(),
            condition_type: condition.to_string(),
            age: 80.0,
            readmission: label,
            extra_numeric: vec![250.0],
            extra_text: vec!["H9".to_string()],
        };
        let table = CleanTable::new(
            vec!["beds".to_string()],
            vec!["hospital_id".to_string()],
            vec![
                row(HospitalSize::Large, "West", "COPD", 1),
                row(HospitalSize::Small, "East", "COPD", 0),
            ],
        );

        let matrix = FeatureMatrix::from_clean(&table).unwrap();
        assert_eq!(
            matrix.feature_names,
            vec![
                "hospital_size",
                "readmission_rate",
                "age",
                "year",
                "region_East",
                "region_West",
                "condition_type_COPD",
                "beds"
            ]
        );
        assert_eq!(
            matrix.features.row(0).to_vec(),
            vec![1.0, 0.15, 80.0, 2022.0, 0.0, 1.0, 1.0, 250.0]
        );
        assert_eq!(matrix.labels.to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_new_rejects_non_finite() {
        let features = Array2::from_shape_vec((2, 1), vec![1.0, f64::NAN]).unwrap();
        let labels = Array1::from_vec(vec![0.0, 1.0]);
        assert!(matches!(
            FeatureMatrix::new(vec!["x".to_string()], features, labels),
            Err(ModelError::NonFinite { row: 1, .. })
        ));
    }
}
