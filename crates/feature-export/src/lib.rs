//! Batch Feature Export
//!
//! Runs raw trip CSVs through the same validator and feature extractor the
//! online service uses, and writes one row of model inputs per trip.

use data_validator::{RawRequest, ValidationErrors, Validator};
use feature_engine::{FeatureError, FeatureExtractor, FEATURE_NAMES};
use serde_json::Value;
use std::io::{Read, Write};
use thiserror::Error;
use tracing::{info, warn};

/// Label column carried through unchanged when present
pub const TARGET_COLUMN: &str = "trip_duration";

/// Columns never written to the output: identifiers, raw timestamps, and
/// aggregates derived from the trip outcome.
pub const EXCLUDED_COLUMNS: [&str; 13] = [
    "id",
    "pickup_datetime",
    "dropoff_datetime",
    "check_trip_duration",
    "pickup_date",
    "avg_speed_h",
    "avg_speed_m",
    "pickup_lat_bin",
    "pickup_long_bin",
    "center_lat_bin",
    "center_long_bin",
    "pickup_dt_bin",
    "pickup_datetime_group",
];

/// Errors raised while exporting a file
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("row {row}: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: ValidationErrors,
    },
    #[error("row {row}: {source}")]
    Feature {
        row: usize,
        #[source]
        source: FeatureError,
    },
}

/// Counts for one exported file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows_read: usize,
    pub rows_written: usize,
    pub rows_skipped: usize,
}

/// Converts raw trip rows into feature rows
pub struct FeatureExporter {
    validator: Validator,
    extractor: FeatureExtractor,
    strict: bool,
}

impl FeatureExporter {
    /// With `strict` set, the first bad row aborts the export instead of
    /// being skipped.
    pub fn new(validator: Validator, strict: bool) -> Self {
        Self {
            validator,
            extractor: FeatureExtractor::new(),
            strict,
        }
    }

    /// Read trips from `input` and write feature rows to `output`
    pub fn export<R: Read, W: Write>(
        &self,
        input: R,
        output: W,
    ) -> Result<ExportSummary, ExportError> {
        let mut reader = csv::Reader::from_reader(input);
        let mut writer = csv::Writer::from_writer(output);

        let headers = reader.headers()?.clone();
        let target_index = headers.iter().position(|h| h == TARGET_COLUMN);
        let ignored = headers
            .iter()
            .filter(|h| EXCLUDED_COLUMNS.contains(h))
            .count();
        info!(
            "Exporting {} feature columns ({} excluded input columns, target {})",
            FEATURE_NAMES.len(),
            ignored,
            if target_index.is_some() { "present" } else { "absent" }
        );

        let mut header_row: Vec<&str> = FEATURE_NAMES.to_vec();
        if target_index.is_some() {
            header_row.push(TARGET_COLUMN);
        }
        writer.write_record(&header_row)?;

        let mut summary = ExportSummary::default();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            // 1-based, header is row 1
            let row = index + 2;
            summary.rows_read += 1;

            let raw = to_raw_request(&headers, &record);
            let trip = match self.validator.validate(&raw) {
                Ok(trip) => trip,
                Err(source) if self.strict => return Err(ExportError::InvalidRow { row, source }),
                Err(source) => {
                    warn!("Skipping row {}: {}", row, source);
                    summary.rows_skipped += 1;
                    continue;
                }
            };
            let features = match self.extractor.extract(&trip) {
                Ok(features) => features,
                Err(source) if self.strict => return Err(ExportError::Feature { row, source }),
                Err(source) => {
                    warn!("Skipping row {}: {}", row, source);
                    summary.rows_skipped += 1;
                    continue;
                }
            };

            let mut out: Vec<String> = features.values().iter().map(|v| v.to_string()).collect();
            if let Some(i) = target_index {
                out.push(record.get(i).unwrap_or_default().to_string());
            }
            writer.write_record(&out)?;
            summary.rows_written += 1;
        }

        writer.flush()?;
        Ok(summary)
    }
}

/// Empty cells count as absent so optional columns fall back to defaults.
fn to_raw_request(headers: &csv::StringRecord, record: &csv::StringRecord) -> RawRequest {
    headers
        .iter()
        .zip(record.iter())
        .filter(|(_, cell)| !cell.trim().is_empty())
        .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "id,vendor_id,pickup_datetime,dropoff_datetime,passenger_count,\
pickup_longitude,pickup_latitude,dropoff_longitude,dropoff_latitude,store_and_fwd_flag,trip_duration";

    fn export(input: &str, strict: bool) -> (Result<ExportSummary, ExportError>, String) {
        let exporter = FeatureExporter::new(Validator::default(), strict);
        let mut out = Vec::new();
        let result = exporter.export(input.as_bytes(), &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_training_rows() {
        let input = format!(
            "{}\n\
id2875421,2,2016-03-14 17:24:55,2016-03-14 17:32:30,1,-73.982155,40.767937,-73.964630,40.765602,N,455\n\
id2377394,1,2016-06-12 00:43:35,2016-06-12 00:54:38,1,-73.980415,40.738564,-73.999481,40.731152,Y,663\n",
            HEADER
        );
        let (result, output) = export(&input, false);
        let summary = result.unwrap();
        assert_eq!(
            summary,
            ExportSummary {
                rows_read: 2,
                rows_written: 2,
                rows_skipped: 0
            }
        );

        let mut reader = csv::Reader::from_reader(output.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), FEATURE_NAMES.len() + 1);
        assert_eq!(headers.get(0), Some(FEATURE_NAMES[0]));
        assert_eq!(headers.get(FEATURE_NAMES.len()), Some(TARGET_COLUMN));
        for excluded in EXCLUDED_COLUMNS {
            assert!(!headers.iter().any(|h| h == excluded));
        }

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows[0].get(FEATURE_NAMES.len()), Some("455"));
        let flag = FEATURE_NAMES
            .iter()
            .position(|n| *n == "store_and_fwd_flag")
            .unwrap();
        assert_eq!(rows[0].get(flag), Some("0"));
        assert_eq!(rows[1].get(flag), Some("1"));
    }

    #[test]
    fn test_test_file_without_target() {
        let input = "id,vendor_id,pickup_datetime,passenger_count,pickup_longitude,pickup_latitude,\
dropoff_longitude,dropoff_latitude,store_and_fwd_flag\n\
id3004672,1,2016-06-30 23:59:58,1,-73.988129,40.732029,-73.990173,40.756680,N\n";
        let (result, output) = export(input, false);
        assert_eq!(result.unwrap().rows_written, 1);

        let header = output.lines().next().unwrap();
        assert_eq!(header, FEATURE_NAMES.join(","));
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let input = format!(
            "{}\n\
id1,3,2016-03-14 17:24:55,,1,-73.98,40.76,-73.96,40.76,N,455\n\
id2,1,2016-03-14 17:24:55,,1,-73.98,40.76,-73.96,40.76,,300\n",
            HEADER
        );
        let (result, output) = export(&input, false);
        let summary = result.unwrap();
        assert_eq!(summary.rows_read, 2);
        assert_eq!(summary.rows_written, 1);
        assert_eq!(summary.rows_skipped, 1);
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn test_strict_mode_aborts() {
        let input = format!(
            "{}\nid1,1,not a date,,1,-73.98,40.76,-73.96,40.76,N,455\n",
            HEADER
        );
        let (result, _) = export(&input, true);
        match result {
            Err(ExportError::InvalidRow { row, source }) => {
                assert_eq!(row, 2);
                assert_eq!(source.fields(), vec!["pickup_datetime"]);
            }
            other => panic!("expected invalid row, got {:?}", other),
        }
    }
}
