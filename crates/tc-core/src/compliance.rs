//! Meal-break compliance.
//!
//! A shift-day that works more than the violation threshold must contain a
//! break of at least the minimum length that starts before the employee has
//! accumulated the early-break deadline's worth of work.

use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::shift::{Interval, ShiftDay, duration_hours};
use crate::types::EmployeeId;

/// Rule parameters, passed explicitly with every call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Days working more than this many hours are evaluated.
    pub violation_hour_threshold: f64,
    /// A qualifying break starts before this many worked hours.
    pub early_break_deadline_hours: f64,
    /// A qualifying break lasts at least this long.
    pub minimum_break_minutes: i64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            violation_hour_threshold: 6.0,
            early_break_deadline_hours: 5.0,
            minimum_break_minutes: 30,
        }
    }
}

/// A structurally invalid [`RuleConfig`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a finite, non-negative number of hours, got {value}")]
    InvalidHours { field: &'static str, value: f64 },

    #[error("minimum_break_minutes must not be negative, got {value}")]
    NegativeBreakMinutes { value: i64 },

    #[error("minimum_break_minutes is too large, got {value}")]
    BreakMinutesOutOfRange { value: i64 },
}

impl RuleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("violation_hour_threshold", self.violation_hour_threshold),
            ("early_break_deadline_hours", self.early_break_deadline_hours),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidHours { field, value });
            }
        }
        if self.minimum_break_minutes < 0 {
            return Err(ConfigError::NegativeBreakMinutes {
                value: self.minimum_break_minutes,
            });
        }
        if Duration::try_minutes(self.minimum_break_minutes).is_none() {
            return Err(ConfigError::BreakMinutesOutOfRange {
                value: self.minimum_break_minutes,
            });
        }
        Ok(())
    }

    /// Out-of-range minutes saturate; [`Self::validate`] rejects them up front.
    fn minimum_break(&self) -> Duration {
        Duration::try_minutes(self.minimum_break_minutes).unwrap_or(Duration::MAX)
    }
}

/// Outcome of evaluating one shift-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Compliant,
    /// No break, or only breaks too short to count.
    NoBreakTaken,
    /// Breaks were taken, but only after the deadline.
    LateBreak,
}

impl Verdict {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::NoBreakTaken => "no_break_taken",
            Self::LateBreak => "late_break",
        }
    }

    pub const fn is_violation(&self) -> bool {
        !matches!(self, Self::Compliant)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The break a verdict was decided on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub interval: Interval,
    /// Hours worked before the break started.
    #[serde(serialize_with = "serialize_hours")]
    pub worked_before_hours: f64,
}

/// Verdict for one employee on one shift date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub employee_id: EmployeeId,
    #[serde(default)]
    pub employee_name: String,
    pub date: NaiveDate,
    /// Full precision; serialized rounded to two decimals.
    #[serde(serialize_with = "serialize_hours")]
    pub total_worked_hours: f64,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
}

/// Rounds hours to two decimals for reporting.
pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

fn serialize_hours<S: Serializer>(hours: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_hours(*hours))
}

impl ComplianceResult {
    #[must_use]
    pub fn with_employee_name(mut self, name: impl Into<String>) -> Self {
        self.employee_name = name.into();
        self
    }
}

/// Evaluates a shift-day against the rules.
///
/// Non-compliant verdicts carry the earliest break as evidence (none when no
/// break exists); compliant verdicts above the threshold carry the first
/// qualifying break.
///
/// A shift-day knows only the employee id, so `employee_name` is left empty;
/// attach it with [`ComplianceResult::with_employee_name`].
pub fn evaluate(day: &ShiftDay, rules: &RuleConfig) -> ComplianceResult {
    let (verdict, evidence) = judge(day, rules);
    ComplianceResult {
        employee_id: day.employee_id.clone(),
        employee_name: String::new(),
        date: day.date,
        total_worked_hours: day.total_worked_hours,
        verdict,
        evidence,
    }
}

fn judge(day: &ShiftDay, rules: &RuleConfig) -> (Verdict, Option<Evidence>) {
    if day.total_worked_hours <= rules.violation_hour_threshold {
        return (Verdict::Compliant, None);
    }

    let breaks: Vec<Evidence> = day
        .breaks()
        .map(|interval| Evidence {
            interval: *interval,
            worked_before_hours: duration_hours(day.worked_before(interval.start)),
        })
        .collect();

    let Some(earliest) = breaks.first().copied() else {
        return (Verdict::NoBreakTaken, None);
    };

    let is_early = |b: &Evidence| b.worked_before_hours < rules.early_break_deadline_hours;
    let is_long_enough = |b: &Evidence| b.interval.duration() >= rules.minimum_break();

    if let Some(qualifying) = breaks.iter().find(|b| is_early(b) && is_long_enough(b)) {
        return (Verdict::Compliant, Some(*qualifying));
    }

    // Every early break was too short; that outranks any lateness.
    if breaks.iter().any(is_early) {
        (Verdict::NoBreakTaken, Some(earliest))
    } else {
        (Verdict::LateBreak, Some(earliest))
    }
}
