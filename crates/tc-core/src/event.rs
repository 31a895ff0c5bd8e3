//! Clock events built from resolved clock tokens.

use std::collections::HashMap;
use std::fmt;

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::context::ResolvedClock;
use crate::token::Direction;
use crate::types::EmployeeId;

/// What a clock event means for the employee's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ClockIn,
    ClockOut,
    /// Leaving for a break.
    BreakOut,
    /// Returning from a break.
    BreakIn,
}

impl EventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClockIn => "clock_in",
            Self::ClockOut => "clock_out",
            Self::BreakOut => "break_out",
            Self::BreakIn => "break_in",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fully-qualified clock event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockEvent {
    pub employee_id: EmployeeId,
    /// The shift-day this event is grouped under.
    ///
    /// Usually the calendar date of `instant`; a close that lands on the day
    /// after its shift started keeps the shift's date.
    pub date: NaiveDate,
    pub instant: NaiveDateTime,
    pub kind: EventKind,
    /// 1-based source line (or row) number.
    pub line: usize,
}

#[derive(Debug, Default)]
struct EmployeeState {
    /// Calendar date of the `BreakOut` still awaiting its return.
    break_started: Option<NaiveDate>,
    /// Date of the most recent `ClockIn` not yet followed by a `ClockOut`.
    open_shift: Option<NaiveDate>,
}

/// Turns resolved clocks into events, one employee state machine at a time.
///
/// Clocks must be fed in document order: whether an `IN` is a return from
/// break depends on what the same employee did before it.
#[derive(Debug, Default)]
pub struct EventStreamBuilder {
    states: HashMap<EmployeeId, EmployeeState>,
    events: Vec<ClockEvent>,
}

impl EventStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clock: ResolvedClock) {
        let state = self.states.entry(clock.employee_id.clone()).or_default();

        // An untagged IN only returns from a break taken the same calendar day;
        // on a later day it starts a new shift.
        let kind = match (clock.direction, clock.is_break) {
            (Direction::Out, true) => EventKind::BreakOut,
            (Direction::Out, false) => EventKind::ClockOut,
            (Direction::In, true) => EventKind::BreakIn,
            (Direction::In, false) if state.break_started == Some(clock.date) => {
                EventKind::BreakIn
            }
            (Direction::In, false) => EventKind::ClockIn,
        };

        let date = match (kind, state.open_shift) {
            (EventKind::ClockIn, _) | (_, None) => clock.date,
            (_, Some(shift)) if shift.checked_add_days(Days::new(1)) == Some(clock.date) => shift,
            (_, Some(_)) => clock.date,
        };

        match kind {
            EventKind::ClockIn => {
                if let Some(started) = state.break_started {
                    tracing::debug!(
                        employee = %clock.employee_id,
                        %started,
                        line = clock.line,
                        "break never returned; starting a new shift"
                    );
                }
                state.break_started = None;
                state.open_shift = Some(clock.date);
            }
            EventKind::ClockOut => {
                state.break_started = None;
                state.open_shift = None;
            }
            EventKind::BreakOut => state.break_started = Some(clock.date),
            EventKind::BreakIn => state.break_started = None,
        }

        self.events.push(ClockEvent {
            employee_id: clock.employee_id,
            date,
            instant: clock.date.and_time(clock.time),
            kind,
            line: clock.line,
        });
    }

    pub fn finish(self) -> Vec<ClockEvent> {
        tracing::debug!(events = self.events.len(), "built event stream");
        self.events
    }
}

/// Builds the event stream for a document's resolved clocks.
pub fn build_events(clocks: impl IntoIterator<Item = ResolvedClock>) -> Vec<ClockEvent> {
    let mut builder = EventStreamBuilder::new();
    for clock in clocks {
        builder.push(clock);
    }
    builder.finish()
}
