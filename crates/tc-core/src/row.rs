//! Spreadsheet-style row records.
//!
//! Rows already carry employee, timestamp and status as discrete fields, so
//! they skip line classification and context tracking and resolve straight
//! into clocks.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::context::{ResolvedClock, Resolution};
use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::token::Direction;
use crate::types::{Employee, EmployeeId};

static OUT_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bout\b").unwrap());
static IN_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bin\b").unwrap());
static BREAK_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:break|meal|lunch)\b").unwrap());

const TIMESTAMP_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M%p",
    "%m/%d/%Y %I:%M %p",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// One exported spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRecord {
    pub employee_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_name: Option<String>,
    pub timestamp: String,
    /// Free-form status such as `Clock In`, `OUT`, `On Break`, `Break End`.
    pub status: String,
}

/// Parses a row timestamp in any of the layouts exports are known to use.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Maps a status string to a direction and break tag.
pub fn parse_status(status: &str) -> Option<(Direction, bool)> {
    let status = status.trim().to_lowercase();
    let is_break = BREAK_WORD_RE.is_match(&status);

    if OUT_WORD_RE.is_match(&status) {
        Some((Direction::Out, is_break))
    } else if IN_WORD_RE.is_match(&status) {
        Some((Direction::In, is_break))
    } else if status.contains("start") {
        Some((if is_break { Direction::Out } else { Direction::In }, is_break))
    } else if ["end", "return", "back"].iter().any(|w| status.contains(w)) {
        Some((if is_break { Direction::In } else { Direction::Out }, is_break))
    } else if is_break {
        Some((Direction::Out, true))
    } else {
        None
    }
}

/// Resolves rows into clocks. Row numbers are 1-based.
pub fn resolve_rows(rows: &[RowRecord], diagnostics: &mut Diagnostics) -> Resolution {
    let mut resolution = Resolution::default();

    for (idx, row) in rows.iter().enumerate() {
        let line = idx + 1;

        let Ok(employee_id) = EmployeeId::new(row.employee_id.as_str()) else {
            diagnostics.push(
                Diagnostic::new(DiagnosticKind::OrphanEvent, "row has no employee id")
                    .at_line(line),
            );
            continue;
        };

        let Some(timestamp) = parse_timestamp(&row.timestamp) else {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::InvalidTimestamp,
                    format!("unreadable timestamp {:?}", row.timestamp),
                )
                .at_line(line)
                .for_employee(&employee_id),
            );
            continue;
        };

        let Some((direction, is_break)) = parse_status(&row.status) else {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::UnparseableLine,
                    format!("unknown status {:?}", row.status),
                )
                .at_line(line)
                .for_employee(&employee_id)
                .on_date(timestamp.date()),
            );
            continue;
        };

        resolution
            .employees
            .entry(employee_id.clone())
            .or_insert_with(|| {
                Employee::new(employee_id.clone(), row.employee_name.clone().unwrap_or_default())
            });

        resolution.clocks.push(ResolvedClock {
            employee_id,
            date: timestamp.date(),
            time: timestamp.time(),
            direction,
            is_break,
            line,
        });
    }

    resolution
}
