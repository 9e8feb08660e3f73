//! JSON output for a run report.
//!
//! Provides machine-readable JSON for scripting and audit trails. The
//! schema is the one documented on [`DedupeReport`].
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::duplicates::{DedupeEngine, FinderConfig};
//! use mediadupe::error::ExitCode;
//! use mediadupe::output::{DedupeReport, JsonOutput};
//! use std::path::Path;
//!
//! let outcome = DedupeEngine::new(FinderConfig::default()).find(Path::new(".")).unwrap();
//! let report = DedupeReport::new(&outcome, ExitCode::Success);
//! println!("{}", JsonOutput::new(&report).to_json_pretty().unwrap());
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::report::DedupeReport;

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON formatter over a report.
#[derive(Debug, Clone, Copy)]
pub struct JsonOutput<'a> {
    report: &'a DedupeReport,
}

impl<'a> JsonOutput<'a> {
    /// Create a JSON formatter.
    #[must_use]
    pub fn new(report: &'a DedupeReport) -> Self {
        Self { report }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self.report)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self.report)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write pretty JSON to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write_file(&self, path: &Path) -> Result<(), JsonOutputError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer, true)?;
        writer.flush()?;
        log::info!("Report written to {}", path.display());
        Ok(())
    }
}
