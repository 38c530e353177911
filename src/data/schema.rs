//! Record Schema Module
//! Typed rows shared by every pipeline stage, raw (nullable) and cleaned.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const HOSPITAL_SIZE: &str = "hospital_size";
pub const READMISSION_RATE: &str = "readmission_rate";
pub const DISCHARGE_DATE: &str = "discharge_date";
pub const REGION: &str = "region";
pub const CONDITION_TYPE: &str = "condition_type";
pub const AGE: &str = "age";
pub const READMISSION: &str = "readmission";

/// Derived columns, available on cleaned tables only.
pub const YEAR: &str = "year";
pub const PENALTY: &str = "penalty";

/// HRRP penalty threshold on the readmission rate (strictly greater than).
pub const PENALTY_THRESHOLD: f64 = 0.2;

/// Columns every input file must provide.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    HOSPITAL_SIZE,
    READMISSION_RATE,
    DISCHARGE_DATE,
    REGION,
    CONDITION_TYPE,
    AGE,
    READMISSION,
];

/// Required columns that must be inferred as numeric.
pub const NUMERIC_COLUMNS: [&str; 3] = [READMISSION_RATE, AGE, READMISSION];

/// One input row exactly as read; every cell may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub hospital_size: Option<String>,
    pub readmission_rate: Option<f64>,
    pub discharge_date: Option<String>,
    pub region: Option<String>,
    pub condition_type: Option<String>,
    pub age: Option<f64>,
    pub readmission: Option<f64>,
    pub extra_numeric: Vec<Option<f64>>,
    pub extra_text: Vec<Option<String>>,
}

/// Hashable identity of a row, used for exact-duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RowKey {
    text: Vec<Option<String>>,
    numbers: Vec<Option<u64>>,
}

fn float_key(value: Option<f64>) -> Option<u64> {
    // -0.0 and 0.0 compare equal, so they must hash equal too
    value.map(|v| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() })
}

fn cell<T: ToString>(value: &Option<T>) -> Option<String> {
    value.as_ref().map(ToString::to_string)
}

impl RawRecord {
    /// Cells as text, in [`RecordTable::column_names`] order.
    pub fn cells(&self) -> Vec<Option<String>> {
        let mut cells = vec![
            self.hospital_size.clone(),
            cell(&self.readmission_rate),
            self.discharge_date.clone(),
            self.region.clone(),
            self.condition_type.clone(),
            cell(&self.age),
            cell(&self.readmission),
        ];
        cells.extend(self.extra_numeric.iter().map(cell));
        cells.extend(self.extra_text.iter().cloned());
        cells
    }

    /// True when no cell of the row is missing.
    pub fn is_complete(&self) -> bool {
        self.hospital_size.is_some()
            && self.readmission_rate.is_some()
            && self.discharge_date.is_some()
            && self.region.is_some()
            && self.condition_type.is_some()
            && self.age.is_some()
            && self.readmission.is_some()
            && self.extra_numeric.iter().all(Option::is_some)
            && self.extra_text.iter().all(Option::is_some)
    }

    pub(crate) fn key(&self) -> RowKey {
        let mut text = vec![
            self.hospital_size.clone(),
            self.discharge_date.clone(),
            self.region.clone(),
            self.condition_type.clone(),
        ];
        text.extend(self.extra_text.iter().cloned());

        let mut numbers = vec![
            float_key(self.readmission_rate),
            float_key(self.age),
            float_key(self.readmission),
        ];
        numbers.extend(self.extra_numeric.iter().map(|v| float_key(*v)));

        RowKey { text, numbers }
    }
}

/// Missing-value count for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

/// The loaded table: schema-validated, not yet cleaned.
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    pub extra_numeric_names: Vec<String>,
    pub extra_text_names: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RecordTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Required columns first, then extras in input order per kind.
    pub fn column_names(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.extra_numeric_names.iter().cloned())
            .chain(self.extra_text_names.iter().cloned())
            .collect()
    }

    /// First `n` rows as text cells.
    pub fn head(&self, n: usize) -> Vec<Vec<Option<String>>> {
        self.records.iter().take(n).map(RawRecord::cells).collect()
    }

    /// Present values of every numeric column, keyed by name.
    pub fn numeric_columns(&self) -> Vec<(String, Vec<f64>)> {
        let present = |f: &dyn Fn(&RawRecord) -> Option<f64>| -> Vec<f64> {
            self.records.iter().filter_map(f).collect()
        };

        let mut columns: Vec<(String, Vec<f64>)> = vec![
            (READMISSION_RATE.to_string(), present(&|r| r.readmission_rate)),
            (AGE.to_string(), present(&|r| r.age)),
            (READMISSION.to_string(), present(&|r| r.readmission)),
        ];
        for (i, name) in self.extra_numeric_names.iter().enumerate() {
            columns.push((
                name.clone(),
                present(&|r| r.extra_numeric.get(i).copied().flatten()),
            ));
        }
        columns
    }

    /// Count missing cells per column.
    pub fn missing_counts(&self) -> Vec<MissingCount> {
        let count = |f: &dyn Fn(&RawRecord) -> bool| self.records.iter().filter(|r| f(r)).count();

        let mut counts = vec![
            (HOSPITAL_SIZE, count(&|r| r.hospital_size.is_none())),
            (READMISSION_RATE, count(&|r| r.readmission_rate.is_none())),
            (DISCHARGE_DATE, count(&|r| r.discharge_date.is_none())),
            (REGION, count(&|r| r.region.is_none())),
            (CONDITION_TYPE, count(&|r| r.condition_type.is_none())),
            (AGE, count(&|r| r.age.is_none())),
            (READMISSION, count(&|r| r.readmission.is_none())),
        ]
        .into_iter()
        .map(|(column, missing)| MissingCount {
            column: column.to_string(),
            missing,
        })
        .collect::<Vec<_>>();

        for (i, name) in self.extra_numeric_names.iter().enumerate() {
            counts.push(MissingCount {
                column: name.clone(),
                missing: count(&|r| r.extra_numeric.get(i).map_or(true, Option::is_none)),
            });
        }
        for (i, name) in self.extra_text_names.iter().enumerate() {
            counts.push(MissingCount {
                column: name.clone(),
                missing: count(&|r| r.extra_text.get(i).map_or(true, Option::is_none)),
            });
        }

        counts
    }
}

/// Two-valued hospital size, encoded 1 = Large, 0 = Small.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HospitalSize {
    Small,
    Large,
}

impl HospitalSize {
    /// Map the raw category; anything other than "Large"/"Small" is unmapped.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Large" => Some(HospitalSize::Large),
            "Small" => Some(HospitalSize::Small),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            HospitalSize::Large => 1,
            HospitalSize::Small => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HospitalSize::Large => "Large",
            HospitalSize::Small => "Small",
        }
    }
}

impl fmt::Display for HospitalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A complete, cleaned discharge event.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub hospital_size: HospitalSize,
    pub readmission_rate: f64,
    pub discharge_date: NaiveDate,
    pub region: String,
    pub condition_type: String,
    pub age: f64,
    pub readmission: u8,
    pub extra_numeric: Vec<f64>,
    pub extra_text: Vec<String>,
}

impl Admission {
    pub fn year(&self) -> i32 {
        self.discharge_date.year()
    }

    /// 1 iff the readmission rate is strictly above `threshold`.
    pub fn penalty(&self, threshold: f64) -> u8 {
        u8::from(self.readmission_rate > threshold)
    }
}

/// Cleaned table: no missing cells, no duplicate rows, sizes encoded.
#[derive(Debug, Clone)]
pub struct CleanTable {
    pub extra_numeric_names: Vec<String>,
    pub extra_text_names: Vec<String>,
    pub rows: Vec<Admission>,
    pub penalty_threshold: f64,
}

impl CleanTable {
    pub fn new(
        extra_numeric_names: Vec<String>,
        extra_text_names: Vec<String>,
        rows: Vec<Admission>,
    ) -> Self {
        Self {
            extra_numeric_names,
            extra_text_names,
            rows,
            penalty_threshold: PENALTY_THRESHOLD,
        }
    }

    pub fn with_penalty_threshold(mut self, threshold: f64) -> Self {
        self.penalty_threshold = threshold;
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Penalty flag for every row, in row order.
    pub fn penalties(&self) -> Vec<u8> {
        self.rows
            .iter()
            .map(|r| r.penalty(self.penalty_threshold))
            .collect()
    }

    /// Names of every numeric column, derived ones included.
    pub fn numeric_column_names(&self) -> Vec<String> {
        [HOSPITAL_SIZE, READMISSION_RATE, AGE, READMISSION, YEAR, PENALTY]
            .iter()
            .map(|c| c.to_string())
            .chain(self.extra_numeric_names.iter().cloned())
            .collect()
    }

    /// Values of a numeric column by name, `None` if there is no such column.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<f64>> {
        let pick = |f: &dyn Fn(&Admission) -> f64| Some(self.rows.iter().map(f).collect());

        match name {
            HOSPITAL_SIZE => pick(&|r| f64::from(r.hospital_size.code())),
            READMISSION_RATE => pick(&|r| r.readmission_rate),
            AGE => pick(&|r| r.age),
            READMISSION => pick(&|r| f64::from(r.readmission)),
            YEAR => pick(&|r| f64::from(r.year())),
            PENALTY => pick(&|r| f64::from(r.penalty(self.penalty_threshold))),
            other => {
                let idx = self.extra_numeric_names.iter().position(|n| n == other)?;
                pick(&|r| r.extra_numeric[idx])
            }
        }
    }
}
