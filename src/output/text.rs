//! Human-readable report.

use std::io::{self, Write};

use bytesize::ByteSize;

use super::report::DedupeReport;
use crate::actions::ActionOutcome;

/// Plain-text formatter over a report.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput<'a> {
    report: &'a DedupeReport,
}

impl<'a> TextOutput<'a> {
    /// Create a text formatter.
    #[must_use]
    pub fn new(report: &'a DedupeReport) -> Self {
        Self { report }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let report = self.report;

        for group in &report.groups {
            writeln!(
                w,
                "[{}] {} file(s), {} reclaimable",
                group.id,
                group.losers.len() + 1,
                ByteSize::b(group.reclaimable_bytes)
            )?;
            writeln!(w, "  keep  {} ({})", group.keep.path, ByteSize::b(group.keep.size))?;
            for loser in &group.losers {
                writeln!(w, "  lose  {} ({})", loser.path, ByteSize::b(loser.size))?;
            }
            writeln!(w)?;
        }

        let summary = &report.summary;
        writeln!(
            w,
            "Scanned {} file(s) ({}) in {} mode",
            summary.total_files,
            ByteSize::b(summary.total_size),
            report.mode
        )?;
        if summary.total_groups == 0 {
            writeln!(w, "No duplicate groups found.")?;
        } else {
            writeln!(
                w,
                "{} group(s), {} file(s) to dispose, {} reclaimable",
                summary.total_groups,
                summary.total_losers,
                ByteSize::b(summary.reclaimable_bytes)
            )?;
        }
        if summary.protected_losers > 0 {
            writeln!(
                w,
                "{} file(s) kept because another group keeps them",
                summary.protected_losers
            )?;
        }

        let diagnostics = &report.diagnostics;
        if !diagnostics.failures.is_empty() {
            writeln!(w, "{} file(s) could not be processed:", diagnostics.failures.len())?;
            for failure in &diagnostics.failures {
                writeln!(w, "  {} {}: {}", failure.stage, failure.path.display(), failure.message)?;
            }
        }
        for note in &diagnostics.notes {
            writeln!(w, "note: {}", note)?;
        }

        if let Some(ref disposal) = report.disposal {
            writeln!(w)?;
            for action in &disposal.actions {
                let status = match action.outcome {
                    ActionOutcome::WouldPerform => "would".to_string(),
                    ActionOutcome::Performed => "done".to_string(),
                    ActionOutcome::Declined => "declined".to_string(),
                    ActionOutcome::Skipped => "skipped".to_string(),
                    ActionOutcome::Failed(ref e) => format!("failed: {}", e),
                };
                writeln!(w, "  {} {} [{}]", action.kind, action.path.display(), status)?;
            }
            writeln!(w, "{}", disposal.summary())?;
        }
        Ok(())
    }

    /// Render to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing to a Vec cannot fail.
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
