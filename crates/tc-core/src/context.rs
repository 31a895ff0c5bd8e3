//! Carried employee/date context.
//!
//! Most export lines omit the employee and date they belong to. The tracker
//! holds the active employee and date for one document and resolves every
//! clock token against them. It also reassembles stacked events whose
//! direction, status and time arrive on separate lines.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};

use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::token::{Direction, Token};
use crate::types::{Employee, EmployeeId};

/// A clock token with its employee and date filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClock {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub direction: Direction,
    pub is_break: bool,
    /// 1-based line the time came from.
    pub line: usize,
}

/// Everything the tracker produced for one document.
#[derive(Debug, Default)]
pub struct Resolution {
    pub clocks: Vec<ResolvedClock>,
    /// First header seen per id; later headers never rename.
    pub employees: BTreeMap<EmployeeId, Employee>,
}

/// A stacked event still being assembled.
#[derive(Debug, Clone)]
struct PendingClock {
    direction: Direction,
    is_break: bool,
    time: Option<NaiveTime>,
    line: usize,
}

/// Carried context for a single document.
#[derive(Debug, Default)]
pub struct ContextTracker {
    employee: Option<EmployeeId>,
    date: Option<NaiveDate>,
    pending: Option<PendingClock>,
    resolution: Resolution,
}

impl ContextTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one token from `line`.
    pub fn accept(&mut self, token: Token, line: usize, diagnostics: &mut Diagnostics) {
        // A date directly after a completed stacked event belongs to that event.
        if let Token::DateMarker(date) = token {
            if let Some(pending) = self.pending.take_if(|p| p.time.is_some()) {
                self.date = Some(date);
                self.emit_pending(pending, diagnostics);
                return;
            }
        }

        match token {
            Token::EmployeeHeader(employee) => {
                self.flush(diagnostics);
                tracing::debug!(employee = %employee.id, line, "employee header");
                self.employee = Some(employee.id.clone());
                self.date = None;
                self.resolution
                    .employees
                    .entry(employee.id.clone())
                    .or_insert(employee);
            }
            Token::DateMarker(date) => {
                self.date = Some(date);
            }
            Token::Clock {
                direction,
                time,
                is_break,
            } => {
                self.flush(diagnostics);
                self.resolve(direction, time, is_break, line, diagnostics);
            }
            Token::DirectionMarker(direction) => {
                self.flush(diagnostics);
                self.pending = Some(PendingClock {
                    direction,
                    is_break: false,
                    time: None,
                    line,
                });
            }
            Token::StatusMarker { is_break } => {
                if let Some(pending) = self.pending.as_mut().filter(|p| p.time.is_none()) {
                    pending.is_break |= is_break;
                }
            }
            Token::TimeMarker(time) => match self.pending.as_mut() {
                Some(pending) if pending.time.is_none() => {
                    pending.time = Some(time);
                    pending.line = line;
                }
                _ => {
                    self.flush(diagnostics);
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::OrphanEvent,
                            "time without a preceding IN/OUT marker",
                        )
                        .at_line(line),
                    );
                }
            },
        }
    }

    /// Flushes any pending stacked event and returns what was resolved.
    pub fn finish(mut self, diagnostics: &mut Diagnostics) -> Resolution {
        self.flush(diagnostics);
        self.resolution
    }

    fn flush(&mut self, diagnostics: &mut Diagnostics) {
        if let Some(pending) = self.pending.take() {
            self.emit_pending(pending, diagnostics);
        }
    }

    fn emit_pending(&mut self, pending: PendingClock, diagnostics: &mut Diagnostics) {
        match pending.time {
            Some(time) => self.resolve(
                pending.direction,
                time,
                pending.is_break,
                pending.line,
                diagnostics,
            ),
            None => diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::OrphanEvent,
                    format!("{} marker without a time", pending.direction),
                )
                .at_line(pending.line),
            ),
        }
    }

    fn resolve(
        &mut self,
        direction: Direction,
        time: NaiveTime,
        is_break: bool,
        line: usize,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(employee_id) = self.employee.clone() else {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::OrphanEvent,
                    format!("{direction} event before any employee header"),
                )
                .at_line(line),
            );
            return;
        };
        let Some(date) = self.date else {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::OrphanEvent,
                    format!("{direction} event with no active date"),
                )
                .at_line(line)
                .for_employee(&employee_id),
            );
            return;
        };

        self.resolution.clocks.push(ResolvedClock {
            employee_id,
            date,
            time,
            direction,
            is_break,
            line,
        });
    }
}

/// Resolves a document's tokens, given with their 1-based line numbers.
pub fn resolve_tokens<I>(tokens: I, diagnostics: &mut Diagnostics) -> Resolution
where
    I: IntoIterator<Item = (usize, Token)>,
{
    let mut tracker = ContextTracker::new();
    for (line, token) in tokens {
        tracker.accept(token, line, diagnostics);
    }
    tracker.finish(diagnostics)
}
