//! Line classification.
//!
//! Turns one raw line of an exported timecard into zero or more typed tokens.
//! Classification is a pure function of the line: no state is carried between
//! calls, and a line that fits no known layout is reported as a [`LineError`]
//! instead of aborting anything.
//!
//! Two layout families are recognised:
//!
//! - Combined lines, one event per line:
//!   `IN Mon 7:51am 0.00`, `OUT On Break 8:38am 0.78`, `OUT 01/16/2025 6:00am`
//! - Stacked lines, one field per line:
//!   `IN` / `On Time` / `Mon` / `7:51am` / `01/15/2025`
//!
//! plus employee headers (`1054 - Jane Doe`) and standalone dates.

use std::fmt;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Employee, EmployeeId};

static DATE_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap());

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());

static TIME_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d{1,2}):(\d{2})\s*([ap])\.?m\.?$").unwrap());

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2}):(\d{2})\s*([ap])\.?m\b\.?").unwrap());

static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(in|out)\b\s*(.*)$").unwrap());

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:(?:employee|emp)\s*(?:#|no\.?|id)?\s*:?\s*)?(\d{1,12})\s*[-–:]\s*(\p{L}.*)$")
        .unwrap()
});

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:on\s+time|on\s+break|break|meal(?:\s+break)?|lunch|late|early)$").unwrap()
});

static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:break|meal|lunch)\b").unwrap());

/// Weekday names/abbreviations and bare hour counters carry nothing we use.
static FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?|\d*\.?\d+)$").unwrap()
});

/// Direction keyword of a clock line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }

    fn parse(keyword: &str) -> Self {
        if keyword.eq_ignore_ascii_case("in") {
            Self::In
        } else {
            Self::Out
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed fragment of a timecard line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Starts a new employee's section.
    EmployeeHeader(Employee),
    /// Sets the active date.
    DateMarker(NaiveDate),
    /// A complete clock event on one line.
    Clock {
        direction: Direction,
        time: NaiveTime,
        is_break: bool,
    },
    /// A bare `IN`/`OUT` line starting a stacked event.
    DirectionMarker(Direction),
    /// A bare status phrase (`On Time`, `On Break`, ...).
    StatusMarker { is_break: bool },
    /// A bare time line completing a stacked event.
    TimeMarker(NaiveTime),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmployeeHeader(employee) => write!(f, "{} - {}", employee.id, employee.name),
            Self::DateMarker(date) => write!(f, "{}", date.format("%m/%d/%Y")),
            Self::Clock {
                direction,
                time,
                is_break,
            } => {
                let tag = if *is_break { " On Break" } else { "" };
                write!(f, "{direction}{tag} {}", format_time(*time))
            }
            Self::DirectionMarker(direction) => write!(f, "{direction}"),
            Self::StatusMarker { is_break: true } => write!(f, "On Break"),
            Self::StatusMarker { is_break: false } => write!(f, "On Time"),
            Self::TimeMarker(time) => write!(f, "{}", format_time(*time)),
        }
    }
}

/// Why a line produced no tokens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("no known layout matches")]
    NoMatch,

    #[error("invalid time {text:?}")]
    InvalidTime { text: String },

    #[error("invalid date {text:?}")]
    InvalidDate { text: String },

    #[error("clock line without a readable time: {rest:?}")]
    MissingTime { rest: String },
}

/// Formats a time the way timecard exports print it (`7:51am`).
pub fn format_time(time: NaiveTime) -> String {
    time.format("%-I:%M%P").to_string()
}

/// Classifies one line.
///
/// Blank and filler lines yield `Ok` with no tokens. Lines that look like a
/// known layout but carry out-of-range values (`13:05pm`, `02/30/2025`) are
/// errors, the same as lines that match nothing.
pub fn classify_line(line: &str) -> Result<Vec<Token>, LineError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    if let Some(caps) = DATE_ONLY_RE.captures(line) {
        return Ok(vec![Token::DateMarker(date_from_captures(&caps)?)]);
    }

    if let Some(caps) = TIME_ONLY_RE.captures(line) {
        return Ok(vec![Token::TimeMarker(time_from_captures(&caps)?)]);
    }

    if let Some(caps) = CLOCK_RE.captures(line) {
        let direction = Direction::parse(&caps[1]);
        return classify_clock(direction, &caps[2]);
    }

    if STATUS_RE.is_match(line) {
        return Ok(vec![Token::StatusMarker {
            is_break: BREAK_RE.is_match(line),
        }]);
    }

    if let Some(caps) = HEADER_RE.captures(line) {
        let id = EmployeeId::new(&caps[1]).map_err(|_| LineError::NoMatch)?;
        return Ok(vec![Token::EmployeeHeader(Employee::new(id, &caps[2]))]);
    }

    if FILLER_RE.is_match(line) {
        return Ok(Vec::new());
    }

    Err(LineError::NoMatch)
}

/// Classifies whatever follows the `IN`/`OUT` keyword.
fn classify_clock(direction: Direction, rest: &str) -> Result<Vec<Token>, LineError> {
    let mut tokens = Vec::new();
    let mut remainder = rest.to_string();

    if let Some(caps) = DATE_RE.captures(rest) {
        tokens.push(Token::DateMarker(date_from_captures(&caps)?));
        remainder = DATE_RE.replace(rest, " ").into_owned();
    }

    let is_break = BREAK_RE.is_match(&remainder);

    if let Some(caps) = TIME_RE.captures(&remainder) {
        tokens.push(Token::Clock {
            direction,
            time: time_from_captures(&caps)?,
            is_break,
        });
        return Ok(tokens);
    }

    // No time on the line: either the head of a stacked event or garbage.
    let leftover = remainder.trim();
    if leftover.is_empty() || FILLER_RE.is_match(leftover) {
        tokens.push(Token::DirectionMarker(direction));
        return Ok(tokens);
    }
    if STATUS_RE.is_match(leftover) {
        tokens.push(Token::DirectionMarker(direction));
        tokens.push(Token::StatusMarker { is_break });
        return Ok(tokens);
    }

    Err(LineError::MissingTime {
        rest: rest.trim().to_string(),
    })
}

fn date_from_captures(caps: &Captures<'_>) -> Result<NaiveDate, LineError> {
    let invalid = || LineError::InvalidDate {
        text: caps[0].to_string(),
    };
    let month: u32 = caps[1].parse().map_err(|_| invalid())?;
    let day: u32 = caps[2].parse().map_err(|_| invalid())?;
    let year: i32 = caps[3].parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

fn time_from_captures(caps: &Captures<'_>) -> Result<NaiveTime, LineError> {
    let invalid = || LineError::InvalidTime {
        text: caps[0].trim().to_string(),
    };
    let hour: u32 = caps[1].parse().map_err(|_| invalid())?;
    let minute: u32 = caps[2].parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&hour) {
        return Err(invalid());
    }
    let pm = caps[3].eq_ignore_ascii_case("p");
    let hour = hour % 12 + if pm { 12 } else { 0 };
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}
