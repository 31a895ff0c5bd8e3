//! Non-fatal problems found while processing a document.
//!
//! Nothing in the pipeline fails a batch because of bad data. A line, event or
//! interval that cannot be used is dropped and a [`Diagnostic`] is recorded in
//! its place; the caller receives every diagnostic alongside the results.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::EmployeeId;

/// Category of a recorded problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A line matched no known layout, or matched one with invalid values.
    UnparseableLine,
    /// A clock event without employee/date context, or an OUT with nothing open.
    OrphanEvent,
    /// Two opens without an intervening close; the earlier one was discarded.
    OverlappingOpen,
    /// An interval whose end is not after its start.
    NegativeInterval,
    /// A row timestamp that could not be parsed.
    InvalidTimestamp,
}

impl DiagnosticKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnparseableLine => "unparseable_line",
            Self::OrphanEvent => "orphan_event",
            Self::OverlappingOpen => "overlapping_open",
            Self::NegativeInterval => "negative_interval",
            Self::InvalidTimestamp => "invalid_timestamp",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single recorded problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 1-based source line (or row) number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<EmployeeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            line: None,
            employee_id: None,
            date: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    #[must_use]
    pub fn for_employee(mut self, employee_id: &EmployeeId) -> Self {
        self.employee_id = Some(employee_id.clone());
        self
    }

    #[must_use]
    pub const fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {line}: ")?;
        }
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(id) = &self.employee_id {
            write!(f, " (employee {id}")?;
            if let Some(date) = self.date {
                write!(f, ", {date}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Collects diagnostics and mirrors each one to the log as it is recorded.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            kind = %diagnostic.kind,
            line = ?diagnostic.line,
            employee = ?diagnostic.employee_id.as_ref().map(EmployeeId::as_str),
            "{}",
            diagnostic.message
        );
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
