//! Shift assembly.
//!
//! Events are grouped by (employee, shift date), sorted chronologically and
//! walked with a single open interval:
//!
//! - `IN` (clock-in or return from break) opens a work interval; if a break
//!   is open it is closed first.
//! - A break-tagged `OUT` closes the open work interval and opens a break.
//! - A plain `OUT` closes the open work interval.
//!
//! Gaps between a plain `OUT` and the next `IN` are unaccounted time, never a
//! break. A plain `OUT` that sorts first but is listed after the day's last
//! `IN` is an overnight pair missing its date line, reported as a negative
//! interval. Only one interval is open at a time; when two opens collide the
//! most recent one wins.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::event::{ClockEvent, EventKind};
use crate::types::EmployeeId;

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    Work,
    Break,
}

impl fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Work => write!(f, "work"),
            Self::Break => write!(f, "break"),
        }
    }
}

/// A closed span of work or break time. `end` is always after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub kind: IntervalKind,
}

impl Interval {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn minutes(&self) -> i64 {
        self.duration().num_minutes()
    }
}

/// Converts a duration to fractional hours without rounding.
#[expect(
    clippy::cast_precision_loss,
    reason = "shift lengths are far below f64's exact integer range"
)]
pub fn duration_hours(duration: Duration) -> f64 {
    duration.num_seconds() as f64 / SECONDS_PER_HOUR
}

/// All intervals reconstructed for one employee on one shift date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftDay {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    /// Chronological, non-overlapping.
    pub intervals: Vec<Interval>,
    /// Sum of work interval durations, full precision.
    pub total_worked_hours: f64,
}

impl ShiftDay {
    pub fn new(employee_id: EmployeeId, date: NaiveDate, intervals: Vec<Interval>) -> Self {
        let worked: Duration = intervals
            .iter()
            .filter(|i| i.kind == IntervalKind::Work)
            .map(Interval::duration)
            .sum();
        Self {
            employee_id,
            date,
            intervals,
            total_worked_hours: duration_hours(worked),
        }
    }

    pub fn breaks(&self) -> impl Iterator<Item = &Interval> {
        self.intervals
            .iter()
            .filter(|i| i.kind == IntervalKind::Break)
    }

    /// Work time completed strictly before `instant`.
    pub fn worked_before(&self, instant: NaiveDateTime) -> Duration {
        self.intervals
            .iter()
            .filter(|i| i.kind == IntervalKind::Work && i.end <= instant)
            .map(Interval::duration)
            .sum()
    }
}

/// Groups events by (employee, shift date), keeping document order inside
/// each group. Groups come out sorted by key.
pub fn group_events(
    events: Vec<ClockEvent>,
) -> BTreeMap<(EmployeeId, NaiveDate), Vec<ClockEvent>> {
    let mut groups: BTreeMap<(EmployeeId, NaiveDate), Vec<ClockEvent>> = BTreeMap::new();
    for event in events {
        groups
            .entry((event.employee_id.clone(), event.date))
            .or_default()
            .push(event);
    }
    groups
}

#[derive(Debug, Clone, Copy)]
struct OpenInterval {
    start: NaiveDateTime,
    kind: IntervalKind,
    line: usize,
}

/// Walks one group's events and produces its shift-day.
struct Assembler<'a> {
    employee_id: &'a EmployeeId,
    date: NaiveDate,
    open: Option<OpenInterval>,
    /// A leading plain `OUT` with nothing to close, held until the end in
    /// case a later-listed `IN` shows an undated overnight pair.
    early_out: Option<ClockEvent>,
    intervals: Vec<Interval>,
    diagnostics: Diagnostics,
}

impl Assembler<'_> {
    fn diagnostic(&self, kind: DiagnosticKind, line: usize, message: String) -> Diagnostic {
        Diagnostic::new(kind, message)
            .at_line(line)
            .for_employee(self.employee_id)
            .on_date(self.date)
    }

    fn start_interval(&mut self, event: &ClockEvent, kind: IntervalKind) {
        if let Some(previous) = self.open {
            let diagnostic = self.diagnostic(
                DiagnosticKind::OverlappingOpen,
                previous.line,
                format!(
                    "{} opened at {} never closed; superseded by {} at {}",
                    previous.kind,
                    previous.start.format("%H:%M"),
                    event.kind,
                    event.instant.format("%H:%M"),
                ),
            );
            self.diagnostics.push(diagnostic);
        }
        self.open = Some(OpenInterval {
            start: event.instant,
            kind,
            line: event.line,
        });
    }

    fn close_interval(&mut self, open: OpenInterval, event: &ClockEvent) {
        if event.instant <= open.start {
            let diagnostic = self.diagnostic(
                DiagnosticKind::NegativeInterval,
                event.line,
                format!(
                    "{} interval from {} to {} has no positive length",
                    open.kind, open.start, event.instant
                ),
            );
            self.diagnostics.push(diagnostic);
            return;
        }
        self.intervals.push(Interval {
            start: open.start,
            end: event.instant,
            kind: open.kind,
        });
    }

    fn orphan(&mut self, event: &ClockEvent, reason: &str) {
        let diagnostic = self.diagnostic(
            DiagnosticKind::OrphanEvent,
            event.line,
            format!(
                "{} at {} dropped: {reason}",
                event.kind,
                event.instant.format("%H:%M")
            ),
        );
        self.diagnostics.push(diagnostic);
    }

    fn step(&mut self, event: &ClockEvent) {
        match event.kind {
            EventKind::ClockIn | EventKind::BreakIn => {
                if let Some(open) = self.open.take_if(|o| o.kind == IntervalKind::Break) {
                    self.close_interval(open, event);
                }
                self.start_interval(event, IntervalKind::Work);
            }
            EventKind::BreakOut => match self.open {
                Some(open) if open.kind == IntervalKind::Work => {
                    self.open = None;
                    self.close_interval(open, event);
                    self.start_interval(event, IntervalKind::Break);
                }
                Some(_) => self.start_interval(event, IntervalKind::Break),
                None => self.orphan(event, "no open work interval"),
            },
            EventKind::ClockOut => match self.open {
                Some(open) if open.kind == IntervalKind::Work => {
                    self.open = None;
                    self.close_interval(open, event);
                }
                Some(_) => self.orphan(event, "employee is on break"),
                None if self.intervals.is_empty() && self.early_out.is_none() => {
                    self.early_out = Some(event.clone());
                }
                None => self.orphan(event, "no open work interval"),
            },
        }
    }

    fn finish(mut self) -> (ShiftDay, Diagnostics) {
        let open = self.open.take();
        match (self.early_out.take(), open) {
            // Listed IN then OUT, but the OUT sorts first: the shift ran past
            // midnight without a date line.
            (Some(out), Some(open))
                if open.kind == IntervalKind::Work && open.line < out.line =>
            {
                let diagnostic = self.diagnostic(
                    DiagnosticKind::NegativeInterval,
                    out.line,
                    format!(
                        "work interval from {} to {} ends before it starts; \
                         overnight shifts need an explicit date",
                        open.start, out.instant
                    ),
                );
                self.diagnostics.push(diagnostic);
            }
            (out, open) => {
                if let Some(out) = out {
                    self.orphan(&out, "no open work interval");
                }
                if let Some(open) = open {
                    self.never_closed(open);
                }
            }
        }
        let day = ShiftDay::new(self.employee_id.clone(), self.date, self.intervals);
        (day, self.diagnostics)
    }

    fn never_closed(&mut self, open: OpenInterval) {
        let diagnostic = self.diagnostic(
            DiagnosticKind::OrphanEvent,
            open.line,
            format!(
                "{} opened at {} was never closed",
                open.kind,
                open.start.format("%H:%M")
            ),
        );
        self.diagnostics.push(diagnostic);
    }
}

/// Assembles one group's events into a shift-day.
///
/// Events are stably sorted by instant, so simultaneous events keep their
/// document order.
pub fn assemble_shift_day(
    employee_id: &EmployeeId,
    date: NaiveDate,
    mut events: Vec<ClockEvent>,
) -> (ShiftDay, Diagnostics) {
    events.sort_by_key(|e| e.instant);

    let mut assembler = Assembler {
        employee_id,
        date,
        open: None,
        early_out: None,
        intervals: Vec::new(),
        diagnostics: Diagnostics::new(),
    };
    for event in &events {
        assembler.step(event);
    }
    assembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn event(kind: EventKind, instant: NaiveDateTime, line: usize) -> ClockEvent {
        ClockEvent {
            employee_id: EmployeeId::new("1054").unwrap(),
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            instant,
            kind,
            line,
        }
    }

    fn assemble(events: Vec<ClockEvent>) -> (ShiftDay, Vec<Diagnostic>) {
        let (day, diagnostics) = assemble_shift_day(
            &EmployeeId::new("1054").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            events,
        );
        (day, diagnostics.into_vec())
    }

    fn assert_hours(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}h, got {actual}h"
        );
    }

    #[test]
    fn break_splits_work_intervals() {
        let (day, diagnostics) = assemble(vec![
            event(EventKind::ClockIn, at(15, 7, 51), 1),
            event(EventKind::BreakOut, at(15, 8, 38), 2),
            event(EventKind::BreakIn, at(15, 9, 10), 3),
            event(EventKind::ClockOut, at(15, 15, 0), 4),
        ]);

        assert!(diagnostics.is_empty());
        let kinds: Vec<_> = day.intervals.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![IntervalKind::Work, IntervalKind::Break, IntervalKind::Work]
        );
        assert_eq!(day.intervals[1].minutes(), 32);
        assert_hours(day.total_worked_hours, (47.0 + 350.0) / 60.0);
    }

    #[test]
    fn total_is_sum_of_work_intervals() {
        let (day, _) = assemble(vec![
            event(EventKind::ClockIn, at(15, 8, 0), 1),
            event(EventKind::BreakOut, at(15, 11, 0), 2),
            event(EventKind::BreakIn, at(15, 11, 10), 3),
            event(EventKind::ClockOut, at(15, 15, 30), 4),
        ]);

        let work: Duration = day
            .intervals
            .iter()
            .filter(|i| i.kind == IntervalKind::Work)
            .map(Interval::duration)
            .sum();
        assert_hours(day.total_worked_hours, duration_hours(work));
        assert_hours(day.total_worked_hours, 7.0 + 20.0 / 60.0);
    }

    #[test]
    fn events_are_sorted_before_pairing() {
        let (day, diagnostics) = assemble(vec![
            event(EventKind::ClockOut, at(15, 15, 0), 2),
            event(EventKind::ClockIn, at(15, 8, 0), 1),
        ]);

        assert!(diagnostics.is_empty());
        assert_hours(day.total_worked_hours, 7.0);
    }

    #[test]
    fn untagged_gap_is_not_a_break() {
        let (day, _) = assemble(vec![
            event(EventKind::ClockIn, at(15, 8, 0), 1),
            event(EventKind::ClockOut, at(15, 12, 0), 2),
            event(EventKind::ClockIn, at(15, 12, 30), 3),
            event(EventKind::ClockOut, at(15, 15, 0), 4),
        ]);

        assert_eq!(day.breaks().count(), 0);
        assert_hours(day.total_worked_hours, 6.5);
    }

    #[test]
    fn second_open_discards_the_earlier_one() {
        let (day, diagnostics) = assemble(vec![
            event(EventKind::ClockIn, at(15, 8, 0), 1),
            event(EventKind::ClockIn, at(15, 9, 0), 2),
            event(EventKind::ClockOut, at(15, 12, 0), 3),
        ]);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::OverlappingOpen);
        assert_eq!(diagnostics[0].line, Some(1));
        assert_eq!(day.intervals.len(), 1);
        assert_eq!(day.intervals[0].start, at(15, 9, 0));
    }

    #[test]
    fn out_without_open_is_orphaned() {
        let (day, diagnostics) = assemble(vec![
            event(EventKind::ClockOut, at(15, 7, 0), 1),
            event(EventKind::ClockIn, at(15, 8, 0), 2),
            event(EventKind::ClockOut, at(15, 12, 0), 3),
        ]);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::OrphanEvent);
        assert_hours(day.total_worked_hours, 4.0);
    }

    #[test]
    fn clock_out_during_break_is_orphaned() {
        let (day, diagnostics) = assemble(vec![
            event(EventKind::ClockIn, at(15, 8, 0), 1),
            event(EventKind::BreakOut, at(15, 12, 0), 2),
            event(EventKind::ClockOut, at(15, 15, 0), 3),
        ]);

        // The OUT is dropped and the break is left open.
        assert_eq!(diagnostics.len(), 2);
        assert!(
            diagnostics
                .iter()
                .all(|d| d.kind == DiagnosticKind::OrphanEvent)
        );
        assert_eq!(day.breaks().count(), 0);
        assert_hours(day.total_worked_hours, 4.0);
    }

    #[test]
    fn zero_length_interval_is_excluded() {
        let (day, diagnostics) = assemble(vec![
            event(EventKind::ClockIn, at(15, 8, 0), 1),
            event(EventKind::ClockOut, at(15, 8, 0), 2),
        ]);

        assert!(day.intervals.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::NegativeInterval);
    }

    #[test]
    fn undated_overnight_pair_is_negative() {
        let (day, diagnostics) = assemble(vec![
            event(EventKind::ClockIn, at(15, 22, 0), 1),
            event(EventKind::ClockOut, at(15, 6, 0), 2),
        ]);

        assert!(day.intervals.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::NegativeInterval);
        assert_eq!(diagnostics[0].line, Some(2));
    }

    #[test]
    fn overnight_shift_with_explicit_dates() {
        let (day, diagnostics) = assemble(vec![
            event(EventKind::ClockIn, at(15, 22, 0), 1),
            event(EventKind::ClockOut, at(16, 6, 0), 2),
        ]);

        assert!(diagnostics.is_empty());
        assert_hours(day.total_worked_hours, 8.0);
    }

    #[test]
    fn worked_before_counts_only_finished_work() {
        let (day, _) = assemble(vec![
            event(EventKind::ClockIn, at(15, 8, 0), 1),
            event(EventKind::BreakOut, at(15, 14, 0), 2),
            event(EventKind::BreakIn, at(15, 14, 15), 3),
            event(EventKind::ClockOut, at(15, 15, 0), 4),
        ]);

        let lunch = day.breaks().next().unwrap();
        assert_eq!(day.worked_before(lunch.start), Duration::hours(6));
    }

    #[test]
    fn groups_keep_document_order() {
        let mut other = event(EventKind::ClockIn, at(15, 9, 0), 3);
        other.employee_id = EmployeeId::new("0999").unwrap();
        let groups = group_events(vec![
            event(EventKind::ClockOut, at(15, 15, 0), 1),
            event(EventKind::ClockIn, at(15, 8, 0), 2),
            other,
        ]);

        let keys: Vec<_> = groups.keys().map(|(id, _)| id.as_str()).collect();
        assert_eq!(keys, vec!["0999", "1054"]);
        let lines: Vec<_> = groups.values().next_back().unwrap().iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![1, 2]);
    }
}
