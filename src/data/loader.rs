//! CSV Data Loader Module
//! Handles CSV file loading with Polars and types every cell against the record schema.

use crate::data::schema::{
    RawRecord, RecordTable, AGE, CONDITION_TYPE, DISCHARGE_DATE, HOSPITAL_SIZE, NUMERIC_COLUMNS,
    PENALTY, READMISSION, READMISSION_RATE, REGION, REQUIRED_COLUMNS, YEAR,
};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Cell texts read as missing, the same set pandas uses by default.
const NA_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Missing required column '{0}'")]
    MissingColumn(String),
    #[error("Column '{column}' must be numeric, found {dtype}")]
    NonNumericColumn { column: String, dtype: String },
}

/// Loads admissions CSV files into a schema-validated [`RecordTable`].
pub struct DataLoader {
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Boolean
            | DataType::Null
    )
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 10000,
        }
    }

    /// Load a CSV file using Polars.
    ///
    /// Malformed files are an error; nothing is skipped silently.
    pub fn load_csv(&self, file_path: impl AsRef<Path>) -> Result<RecordTable, LoaderError> {
        let path = file_path.as_ref();
        if !path.exists() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_null_values(Some(NullValues::AllColumns(
                NA_MARKERS.iter().map(|m| (*m).into()).collect(),
            )))
            .finish()?
            .collect()?;

        info!(path = %path.display(), rows = df.height(), columns = df.width(), "CSV loaded");

        Self::from_dataframe(&df)
    }

    /// Validate the schema of an in-memory frame and convert it to typed records.
    pub fn from_dataframe(df: &DataFrame) -> Result<RecordTable, LoaderError> {
        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|req| !columns.iter().any(|c| c == *req))
        {
            return Err(LoaderError::MissingColumn(missing.to_string()));
        }

        for name in NUMERIC_COLUMNS {
            let dtype = df.column(name)?.dtype();
            if !is_numeric(dtype) {
                return Err(LoaderError::NonNumericColumn {
                    column: name.to_string(),
                    dtype: dtype.to_string(),
                });
            }
        }

        let mut extra_numeric_names = Vec::new();
        let mut extra_text_names = Vec::new();
        for name in columns
            .iter()
            .filter(|c| !REQUIRED_COLUMNS.contains(&c.as_str()))
        {
            if [YEAR, PENALTY].contains(&name.as_str()) {
                // Replaced by the derived column; kept as a plain cell so it
                // still counts for missing values and duplicates
                warn!(column = %name, "Input column shadowed by derived column");
                extra_text_names.push(name.clone());
            } else if is_numeric(df.column(name)?.dtype()) {
                extra_numeric_names.push(name.clone());
            } else {
                extra_text_names.push(name.clone());
            }
        }
        debug!(?extra_numeric_names, ?extra_text_names, "Extra columns detected");

        let hospital_size = Self::text_values(df, HOSPITAL_SIZE)?;
        let readmission_rate = Self::numeric_values(df, READMISSION_RATE)?;
        let discharge_date = Self::text_values(df, DISCHARGE_DATE)?;
        let region = Self::text_values(df, REGION)?;
        let condition_type = Self::text_values(df, CONDITION_TYPE)?;
        let age = Self::numeric_values(df, AGE)?;
        let readmission = Self::numeric_values(df, READMISSION)?;

        let extra_numeric = extra_numeric_names
            .iter()
            .map(|name| Self::numeric_values(df, name))
            .collect::<Result<Vec<_>, _>>()?;
        let extra_text = extra_text_names
            .iter()
            .map(|name| Self::text_values(df, name))
            .collect::<Result<Vec<_>, _>>()?;

        let records = (0..df.height())
            .map(|i| RawRecord {
                hospital_size: hospital_size[i].clone(),
                readmission_rate: readmission_rate[i],
                discharge_date: discharge_date[i].clone(),
                region: region[i].clone(),
                condition_type: condition_type[i].clone(),
                age: age[i],
                readmission: readmission[i],
                extra_numeric: extra_numeric.iter().map(|col| col[i]).collect(),
                extra_text: extra_text.iter().map(|col| col[i].clone()).collect(),
            })
            .collect();

        Ok(RecordTable {
            extra_numeric_names,
            extra_text_names,
            records,
        })
    }

    /// Column values verbatim; nulls and empty cells are missing.
    ///
    /// No trimming here: duplicate detection compares cells exactly.
    fn text_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>, LoaderError> {
        let as_text = df.column(column)?.cast(&DataType::String)?;
        let ca = as_text.str()?;

        Ok(ca
            .into_iter()
            .map(|v| v.filter(|s| !s.is_empty()).map(str::to_owned))
            .collect())
    }

    /// Column values as f64; nulls and NaN are missing.
    fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>, LoaderError> {
        let as_f64 = df.column(column)?.cast(&DataType::Float64)?;
        let ca = as_f64.f64()?;

        Ok(ca.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataCleaner;
    use crate::model::FeatureMatrix;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    const HEADER: &str =
        "hospital_id,hospital_size,readmission_rate,discharge_date,region,condition_type,age,beds,readmission";

    #[test]
    fn test_load_csv_types_columns() {
        let file = write_csv(&[
            HEADER,
            "H001,Large,0.15,2020-01-10,Northeast,Heart Failure,72,300,0",
            "H002,Small,0.25,2021-06-02,South,Pneumonia,,80,1",
        ]);

        let table = DataLoader::new().load_csv(file.path()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.extra_numeric_names, vec!["beds".to_string()]);
        assert_eq!(table.extra_text_names, vec!["hospital_id".to_string()]);

        let first = &table.records[0];
        assert_eq!(first.hospital_size.as_deref(), Some("Large"));
        assert_eq!(first.readmission_rate, Some(0.15));
        assert_eq!(first.discharge_date.as_deref(), Some("2020-01-10"));
        assert_eq!(first.extra_numeric, vec![Some(300.0)]);
        assert_eq!(first.extra_text, vec![Some("H001".to_string())]);

        assert_eq!(table.records[1].age, None);
        assert!(!table.records[1].is_complete());
    }

    #[test]
    fn test_missing_counts() {
        let file = write_csv(&[
            HEADER,
            "H001,Large,0.15,2020-01-10,Northeast,Heart Failure,72,300,0",
            "H002,,0.25,2021-06-02,South,Pneumonia,,80,1",
        ]);

        let table = DataLoader::new().load_csv(file.path()).unwrap();
        let counts = table.missing_counts();

        let missing = |name: &str| counts.iter().find(|c| c.column == name).unwrap().missing;
        assert_eq!(missing("hospital_size"), 1);
        assert_eq!(missing("age"), 1);
        assert_eq!(missing("readmission_rate"), 0);
        assert_eq!(missing("beds"), 0);
    }

    #[test]
    fn test_missing_file() {
        let result = DataLoader::new().load_csv("/definitely/not/here.csv");
        assert!(matches!(result, Err(LoaderError::NotFound(_))));
    }

    #[test]
    fn test_missing_required_column() {
        let file = write_csv(&[
            "hospital_size,readmission_rate,discharge_date,condition_type,age,readmission",
            "Large,0.15,2020-01-10,Heart Failure,72,0",
        ]);

        let result = DataLoader::new().load_csv(file.path());
        match result {
            Err(LoaderError::MissingColumn(column)) => assert_eq!(column, "region"),
            other => panic!("expected missing column error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_rate_rejected() {
        let file = write_csv(&[
            "hospital_size,readmission_rate,discharge_date,region,condition_type,age,readmission",
            "Large,high,2020-01-10,West,Heart Failure,72,0",
        ]);

        let result = DataLoader::new().load_csv(file.path());
        assert!(matches!(
            result,
            Err(LoaderError::NonNumericColumn { ref column, .. }) if column == "readmission_rate"
        ));
    }

    #[test]
    fn test_na_markers_load_as_missing() {
        let file = write_csv(&[
            "hospital_size,readmission_rate,discharge_date,region,condition_type,age,readmission",
            "Large,0.15,2020-01-10,West,Heart Failure,72,0",
            "Small,NA,2020-02-10,West,Heart Failure,N/A,1",
            "Small,0.22,2020-03-10,NULL,Heart Failure,64,1",
        ]);

        let table = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.records[1].readmission_rate, None);
        assert_eq!(table.records[1].age, None);
        assert_eq!(table.records[2].region, None);

        let (clean, summary) = DataCleaner::clean(&table).unwrap();
        assert_eq!(summary.dropped_missing, 2);
        assert_eq!(clean.len(), 1);
    }

    #[test]
    fn test_input_year_column_is_replaced_by_derived_year() {
        let file = write_csv(&[
            "hospital_size,readmission_rate,discharge_date,region,condition_type,age,readmission,year,penalty",
            "Large,0.15,2020-01-10,West,Heart Failure,72,0,1999,1",
            "Small,0.25,2021-06-02,South,Pneumonia,65,1,1999,0",
        ]);

        let table = DataLoader::new().load_csv(file.path()).unwrap();
        assert!(table.extra_numeric_names.is_empty());
        assert_eq!(table.extra_text_names, vec!["year".to_string(), "penalty".to_string()]);

        let (clean, _) = DataCleaner::clean(&table).unwrap();
        let names = clean.numeric_column_names();
        assert_eq!(names.iter().filter(|n| *n == "year").count(), 1);
        assert_eq!(names.iter().filter(|n| *n == "penalty").count(), 1);
        assert_eq!(clean.numeric_column("year"), Some(vec![2020.0, 2021.0]));
        assert_eq!(clean.numeric_column("penalty"), Some(vec![0.0, 1.0]));

        let matrix = FeatureMatrix::from_clean(&clean).unwrap();
        assert_eq!(
            matrix.feature_names.iter().filter(|n| *n == "year").count(),
            1
        );
    }

    #[test]
    fn test_text_cells_kept_verbatim() {
        let file = write_csv(&[
            "hospital_size,readmission_rate,discharge_date,region,condition_type,age,readmission",
            "Large,0.15,2020-01-10,West,Heart Failure,72,0",
            " Large,0.15,2020-01-10,West,Heart Failure,72,0",
        ]);

        let table = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(table.records[1].hospital_size.as_deref(), Some(" Large"));

        // Not an exact duplicate, though both map to Large
        let (clean, summary) = DataCleaner::clean(&table).unwrap();
        assert_eq!(summary.dropped_duplicates, 0);
        assert_eq!(clean.len(), 2);
        assert!(clean.rows.iter().all(|r| r.hospital_size.code() == 1));
    }
}
