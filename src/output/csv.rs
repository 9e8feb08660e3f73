//! CSV output for a run report.
//!
//! One row is generated for each group member.
//!
//! # Columns
//!
//! - `group_id`: Group id (`hash:<hex>`, `meta:<n>`, `phash:<n>`)
//! - `strategy`: `exact`, `tolerance` or `perceptual`
//! - `role`: `keep` or `lose`
//! - `path`: Absolute path to the file
//! - `size`: File size in bytes
//! - `modified`: Last modified time (RFC 3339)
//! - `duration_seconds`: Media duration, empty if unknown

use std::io;

use serde::Serialize;
use thiserror::Error;

use super::report::{DedupeReport, ReportFile};
use crate::duplicates::Strategy;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: &'a str,
    strategy: Strategy,
    role: &'static str,
    path: &'a str,
    size: u64,
    modified: &'a str,
    duration_seconds: Option<f64>,
}

impl<'a> CsvRow<'a> {
    fn new(group_id: &'a str, strategy: Strategy, role: &'static str, file: &'a ReportFile) -> Self {
        Self {
            group_id,
            strategy,
            role,
            path: &file.path,
            size: file.size,
            modified: &file.modified,
            duration_seconds: file.duration_seconds,
        }
    }
}

/// CSV output formatter.
#[derive(Debug, Clone, Copy)]
pub struct CsvOutput<'a> {
    report: &'a DedupeReport,
}

impl<'a> CsvOutput<'a> {
    /// Create a CSV formatter.
    #[must_use]
    pub fn new(report: &'a DedupeReport) -> Self {
        Self { report }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for group in &self.report.groups {
            csv_writer.serialize(CsvRow::new(&group.id, group.strategy, "keep", &group.keep))?;
            for loser in &group.losers {
                csv_writer.serialize(CsvRow::new(&group.id, group.strategy, "lose", loser))?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExitCode;
    use crate::output::report::tests::sample_outcome;

    #[test]
    fn test_csv_rows_and_roles() {
        let report = DedupeReport::new(&sample_outcome(), ExitCode::Success);
        let csv = CsvOutput::new(&report).to_string().unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "group_id,strategy,role,path,size,modified,duration_seconds"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("meta:0,tolerance,keep,"));
        assert!(lines[1].ends_with(",60.0"));
        assert!(lines[2].starts_with("meta:0,tolerance,lose,/v/c.mp4,40,"));
        assert!(lines[2].ends_with(','));
    }

    #[test]
    fn test_csv_quotes_commas() {
        let report = DedupeReport::new(&sample_outcome(), ExitCode::Success);
        let csv = CsvOutput::new(&report).to_string().unwrap();
        assert!(csv.contains("\"/v/a,b.mp4\""));
    }
}
