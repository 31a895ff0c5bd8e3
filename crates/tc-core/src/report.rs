//! Batch results as handed to renderers.

use serde::{Deserialize, Serialize};

use crate::compliance::{ComplianceResult, Verdict, round_hours};
use crate::diagnostic::Diagnostic;

/// Verdicts plus every diagnostic recorded for one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Sorted by (employee id, date).
    pub results: Vec<ComplianceResult>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Verdict counts for a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub shift_days: usize,
    pub compliant: usize,
    pub no_break_taken: usize,
    pub late_break: usize,
    pub diagnostics: usize,
    pub total_worked_hours: f64,
}

impl Summary {
    pub const fn violations(&self) -> usize {
        self.no_break_taken + self.late_break
    }
}

impl Report {
    pub fn new(mut results: Vec<ComplianceResult>, diagnostics: Vec<Diagnostic>) -> Self {
        results.sort_by(|a, b| (&a.employee_id, a.date).cmp(&(&b.employee_id, b.date)));
        Self {
            results,
            diagnostics,
        }
    }

    pub fn violations(&self) -> impl Iterator<Item = &ComplianceResult> {
        self.results.iter().filter(|r| r.verdict.is_violation())
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            shift_days: self.results.len(),
            diagnostics: self.diagnostics.len(),
            ..Summary::default()
        };
        for result in &self.results {
            match result.verdict {
                Verdict::Compliant => summary.compliant += 1,
                Verdict::NoBreakTaken => summary.no_break_taken += 1,
                Verdict::LateBreak => summary.late_break += 1,
            }
            summary.total_worked_hours += result.total_worked_hours;
        }
        summary.total_worked_hours = round_hours(summary.total_worked_hours);
        summary
    }
}
