//! Core domain logic for timecard compliance.
//!
//! This crate contains the fundamental types and logic for:
//! - Line classification: recognising headers, dates and clock lines in export text
//! - Context tracking: attaching employee and date to clock lines that omit them
//! - Shift assembly: turning clock events into work and break intervals
//! - Compliance: evaluating each shift-day against the meal-break rule

pub mod compliance;
pub mod context;
pub mod diagnostic;
pub mod event;
mod pipeline;
pub mod report;
pub mod row;
pub mod shift;
pub mod token;
pub mod types;

pub use compliance::{ComplianceResult, ConfigError, Evidence, RuleConfig, Verdict, evaluate};
pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
pub use event::{ClockEvent, EventKind};
pub use pipeline::{process_lines, process_rows};
pub use report::{Report, Summary};
pub use row::RowRecord;
pub use shift::{Interval, IntervalKind, ShiftDay};
pub use token::{Direction, LineError, Token, classify_line};
pub use types::{Employee, EmployeeId, ValidationError};
