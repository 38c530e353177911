//! Data Cleaner Module
//! Drops incomplete and duplicate rows, encodes hospital size, parses discharge dates.

use crate::data::schema::{Admission, CleanTable, HospitalSize, RawRecord, RecordTable};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Row {row}: unparseable discharge date '{value}'")]
    InvalidDate { row: usize, value: String },
    #[error("Row {row}: readmission label must be 0 or 1, found {value}")]
    InvalidLabel { row: usize, value: f64 },
}

/// Row accounting for one cleaning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningSummary {
    pub input_rows: usize,
    pub dropped_missing: usize,
    pub dropped_duplicates: usize,
    pub dropped_unmapped_size: usize,
    pub output_rows: usize,
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

/// Handles data cleaning operations.
pub struct DataCleaner;

impl DataCleaner {
    /// Indices of rows with no missing cell.
    pub fn complete_rows(records: &[RawRecord]) -> Vec<usize> {
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_complete())
            .map(|(i, _)| i)
            .collect()
    }

    /// Keep the first occurrence of every distinct row among `indices`.
    pub fn unique_rows(records: &[RawRecord], indices: &[usize]) -> Vec<usize> {
        let mut seen = HashSet::with_capacity(indices.len());
        indices
            .iter()
            .copied()
            .filter(|&i| seen.insert(records[i].key()))
            .collect()
    }

    /// Parse a discharge date; time components are ignored.
    pub fn parse_discharge_date(value: &str) -> Option<NaiveDate> {
        let value = value.trim();

        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .or_else(|| {
                DATETIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                    .map(|dt| dt.date())
            })
            .or_else(|| {
                DateTime::parse_from_rfc3339(value)
                    .ok()
                    .map(|dt| dt.date_naive())
            })
    }

    /// Run the full cleaning pass.
    ///
    /// Order: drop incomplete rows, drop exact duplicates, encode hospital size.
    /// Rows whose size is neither "Large" nor "Small" are dropped and counted.
    pub fn clean(table: &RecordTable) -> Result<(CleanTable, CleaningSummary), CleanError> {
        let records = &table.records;

        let complete = Self::complete_rows(records);
        let unique = Self::unique_rows(records, &complete);

        let mut rows = Vec::with_capacity(unique.len());
        let mut dropped_unmapped_size = 0;

        for i in unique.iter().copied() {
            let record = &records[i];
            // 1-based data row, header excluded
            let row = i + 1;

            let (
                Some(size_label),
                Some(readmission_rate),
                Some(date_text),
                Some(region),
                Some(condition_type),
                Some(age),
                Some(label),
            ) = (
                record.hospital_size.as_deref(),
                record.readmission_rate,
                record.discharge_date.as_deref(),
                record.region.as_ref(),
                record.condition_type.as_ref(),
                record.age,
                record.readmission,
            )
            else {
                continue;
            };

            let Some(hospital_size) = HospitalSize::from_label(size_label) else {
                warn!(row, hospital_size = size_label, "Unmapped hospital size, dropping row");
                dropped_unmapped_size += 1;
                continue;
            };

            let discharge_date =
                Self::parse_discharge_date(date_text).ok_or_else(|| CleanError::InvalidDate {
                    row,
                    value: date_text.to_string(),
                })?;

            let readmission = match label {
                l if l == 0.0 => 0,
                l if l == 1.0 => 1,
                value => return Err(CleanError::InvalidLabel { row, value }),
            };

            rows.push(Admission {
                hospital_size,
                readmission_rate,
                discharge_date,
                region: region.clone(),
                condition_type: condition_type.clone(),
                age,
                readmission,
                extra_numeric: record.extra_numeric.iter().flatten().copied().collect(),
                extra_text: record.extra_text.iter().flatten().cloned().collect(),
            });
        }

        let summary = CleaningSummary {
            input_rows: records.len(),
            dropped_missing: records.len() - complete.len(),
            dropped_duplicates: complete.len() - unique.len(),
            dropped_unmapped_size,
            output_rows: rows.len(),
        };

        info!(
            input = summary.input_rows,
            missing = summary.dropped_missing,
            duplicates = summary.dropped_duplicates,
            unmapped = summary.dropped_unmapped_size,
            output = summary.output_rows,
            "Cleaning complete"
        );

        let clean = CleanTable::new(
            table.extra_numeric_names.clone(),
            table.extra_text_names.clone(),
            rows,
        );

        Ok((clean, summary))
    }
}
