//! Output formatters for run reports.
//!
//! All formats render the same [`DedupeReport`]:
//! - text for people
//! - JSON for automation and audit
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::duplicates::{DedupeEngine, FinderConfig};
//! use mediadupe::error::ExitCode;
//! use mediadupe::output::{DedupeReport, TextOutput};
//! use std::path::Path;
//!
//! let outcome = DedupeEngine::new(FinderConfig::default()).find(Path::new(".")).unwrap();
//! let report = DedupeReport::new(&outcome, ExitCode::Success);
//! print!("{}", TextOutput::new(&report).render());
//! ```

pub mod csv;
pub mod json;
pub mod report;
pub mod text;

pub use csv::{CsvOutput, CsvOutputError};
pub use json::{JsonOutput, JsonOutputError};
pub use report::{DedupeReport, ReportFile, ReportGroup, ReportSummary, StrategyCount};
pub use text::TextOutput;
