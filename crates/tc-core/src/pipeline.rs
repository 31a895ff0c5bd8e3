//! End-to-end processing of one batch.
//!
//! Lines are classified and resolved strictly in document order; once events
//! are grouped by (employee, shift date) every group is independent, so
//! assembly and evaluation fan out over rayon.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::compliance::{ComplianceResult, ConfigError, RuleConfig, evaluate};
use crate::context::{ContextTracker, Resolution};
use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::event::{ClockEvent, build_events};
use crate::report::Report;
use crate::row::{RowRecord, resolve_rows};
use crate::shift::{assemble_shift_day, group_events};
use crate::token::classify_line;
use crate::types::{Employee, EmployeeId};

/// Processes export text, one entry per line.
///
/// Only an invalid rule configuration fails the batch; bad data is reported in
/// [`Report::diagnostics`].
pub fn process_lines<S: AsRef<str>>(
    lines: &[S],
    rules: &RuleConfig,
) -> Result<Report, ConfigError> {
    rules.validate()?;

    let mut diagnostics = Diagnostics::new();
    let mut tracker = ContextTracker::new();

    for (idx, raw) in lines.iter().enumerate() {
        let line = idx + 1;
        match classify_line(raw.as_ref()) {
            Ok(tokens) => {
                for token in tokens {
                    tracker.accept(token, line, &mut diagnostics);
                }
            }
            Err(err) => diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::UnparseableLine,
                    format!("{err}: {:?}", raw.as_ref().trim()),
                )
                .at_line(line),
            ),
        }
    }

    let resolution = tracker.finish(&mut diagnostics);
    tracing::debug!(
        lines = lines.len(),
        clocks = resolution.clocks.len(),
        employees = resolution.employees.len(),
        "resolved document"
    );
    Ok(evaluate_resolution(resolution, diagnostics, rules))
}

/// Processes spreadsheet rows. Row numbers in diagnostics are 1-based.
pub fn process_rows(rows: &[RowRecord], rules: &RuleConfig) -> Result<Report, ConfigError> {
    rules.validate()?;

    let mut diagnostics = Diagnostics::new();
    let resolution = resolve_rows(rows, &mut diagnostics);
    tracing::debug!(
        rows = rows.len(),
        clocks = resolution.clocks.len(),
        "resolved rows"
    );
    Ok(evaluate_resolution(resolution, diagnostics, rules))
}

fn evaluate_resolution(
    resolution: Resolution,
    mut diagnostics: Diagnostics,
    rules: &RuleConfig,
) -> Report {
    let Resolution { clocks, employees } = resolution;
    let groups: Vec<((EmployeeId, NaiveDate), Vec<ClockEvent>)> =
        group_events(build_events(clocks)).into_iter().collect();

    let evaluated: Vec<(ComplianceResult, Diagnostics)> = groups
        .into_par_iter()
        .map(|((employee_id, date), events)| {
            let (day, day_diagnostics) = assemble_shift_day(&employee_id, date, events);
            let result =
                evaluate(&day, rules).with_employee_name(display_name(&employees, &employee_id));
            (result, day_diagnostics)
        })
        .collect();

    let mut results = Vec::with_capacity(evaluated.len());
    for (result, day_diagnostics) in evaluated {
        results.push(result);
        diagnostics.extend(day_diagnostics);
    }

    let report = Report::new(results, diagnostics.into_vec());
    let summary = report.summary();
    tracing::debug!(
        shift_days = summary.shift_days,
        violations = summary.violations(),
        diagnostics = summary.diagnostics,
        "evaluated batch"
    );
    report
}

fn display_name(employees: &BTreeMap<EmployeeId, Employee>, id: &EmployeeId) -> String {
    employees
        .get(id)
        .map(|e| e.name.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::Verdict;

    fn check(lines: &[&str]) -> Report {
        process_lines(lines, &RuleConfig::default()).unwrap()
    }

    fn only_verdict(lines: &[&str]) -> (Verdict, f64) {
        let report = check(lines);
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
        assert_eq!(report.results.len(), 1);
        (report.results[0].verdict, report.results[0].total_worked_hours)
    }

    const HEADER: [&str; 2] = ["1054 - Jane Doe", "01/15/2025"];

    fn day(clocks: &[&'static str]) -> Vec<&'static str> {
        HEADER.iter().chain(clocks).copied().collect()
    }

    #[test]
    fn early_half_hour_break_is_compliant() {
        let (verdict, hours) = only_verdict(&day(&[
            "IN 7:51am",
            "OUT On Break 8:38am",
            "IN 9:10am",
            "OUT 3:00pm",
        ]));
        assert_eq!(verdict, Verdict::Compliant);
        assert!((hours - 397.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn seven_hours_without_break() {
        let (verdict, hours) = only_verdict(&day(&["IN 8:00am", "OUT 3:00pm"]));
        assert_eq!(verdict, Verdict::NoBreakTaken);
        assert!((hours - 7.0).abs() < 1e-9);
    }

    #[test]
    fn break_after_five_hours_is_late() {
        let (verdict, hours) = only_verdict(&day(&[
            "IN 8:00am",
            "OUT On Break 2:00pm",
            "IN 2:15pm",
            "OUT 3:00pm",
        ]));
        assert_eq!(verdict, Verdict::LateBreak);
        assert!((hours - 6.75).abs() < 1e-9);
    }

    #[test]
    fn ten_minute_break_does_not_count() {
        let (verdict, hours) = only_verdict(&day(&[
            "IN 8:00am",
            "OUT On Break 11:00am",
            "IN 11:10am",
            "OUT 3:30pm",
        ]));
        assert_eq!(verdict, Verdict::NoBreakTaken);
        assert!((hours - 440.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_line_does_not_stop_the_day() {
        let report = check(&day(&[
            "IN 8:00am",
            "OUT On Break 11:00am",
            "IN 11:30am",
            "IN 1?:45pm",
            "OUT 3:00pm",
        ]));

        assert_eq!(report.results.len(), 1);
        let result = &report.results[0];
        assert_eq!(result.verdict, Verdict::Compliant);
        assert!((result.total_worked_hours - 6.5).abs() < 1e-9);
        assert_eq!(result.employee_name, "Jane Doe");

        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::UnparseableLine);
        assert_eq!(report.diagnostics[0].line, Some(6));
    }

    #[test]
    fn reprocessing_gives_identical_reports() {
        let lines = day(&[
            "IN 8:00am",
            "OUT On Break 11:00am",
            "garbage",
            "IN 11:10am",
            "OUT 3:30pm",
            "2001 - Omar Haddad",
            "01/15/2025",
            "IN 9:00am",
            "OUT 4:00pm",
        ]);
        assert_eq!(check(&lines), check(&lines));
    }

    #[test]
    fn several_employees_and_days() {
        let report = check(&[
            "2001 - Omar Haddad",
            "01/16/2025",
            "IN 9:00am",
            "OUT 12:00pm",
            "1054 - Jane Doe",
            "01/15/2025",
            "IN 8:00am",
            "OUT 3:00pm",
            "01/16/2025",
            "IN 8:00am",
            "OUT 12:00pm",
        ]);

        let keys: Vec<(&str, String)> = report
            .results
            .iter()
            .map(|r| (r.employee_id.as_str(), r.date.to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("1054", "2025-01-15".to_string()),
                ("1054", "2025-01-16".to_string()),
                ("2001", "2025-01-16".to_string()),
            ]
        );
        assert_eq!(report.results[2].employee_name, "Omar Haddad");
        assert_eq!(report.summary().no_break_taken, 1);
    }

    #[test]
    fn unreturned_break_stays_on_its_own_day() {
        let report = check(&[
            "1054 - Jane Doe",
            "01/15/2025",
            "IN 8:00am",
            "OUT On Break 12:00pm",
            "01/16/2025",
            "IN 8:00am",
            "OUT 3:00pm",
        ]);

        assert_eq!(report.results.len(), 2);
        let first = &report.results[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert!((first.total_worked_hours - 4.0).abs() < 1e-9);

        let second = &report.results[1];
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2025, 1, 16).unwrap());
        assert_eq!(second.verdict, Verdict::NoBreakTaken);
        assert!((second.total_worked_hours - 7.0).abs() < 1e-9);

        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::OrphanEvent);
        assert_eq!(report.diagnostics[0].line, Some(4));
    }

    #[test]
    fn undated_overnight_pair_is_a_negative_interval() {
        let report = check(&day(&["IN 10:00pm", "OUT 6:00am"]));

        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].total_worked_hours.abs() < 1e-9);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::NegativeInterval);
        assert_eq!(report.diagnostics[0].line, Some(4));
    }

    #[test]
    fn overnight_shift_with_explicit_dates() {
        let (verdict, hours) = only_verdict(&[
            "1054 - Jane Doe",
            "IN 01/15/2025 10:00pm",
            "OUT On Break 01/16/2025 1:00am",
            "IN 1:30am",
            "OUT 6:00am",
        ]);
        assert_eq!(verdict, Verdict::Compliant);
        assert!((hours - 7.5).abs() < 1e-9);
    }

    #[test]
    fn stacked_export_layout() {
        let report = check(&[
            "123456 - Jane Doe",
            "IN",
            "On Time",
            "Wed",
            "7:51am",
            "01/15/2025",
            "OUT",
            "On Break",
            "Wed",
            "8:38am",
            "01/15/2025",
            "IN",
            "On Time",
            "9:10am",
            "01/15/2025",
            "OUT",
            "3:00pm",
            "01/15/2025",
            "6.62",
        ]);

        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].verdict, Verdict::Compliant);
    }

    #[test]
    fn rows_follow_the_same_rules() {
        let row = |timestamp: &str, status: &str| RowRecord {
            employee_id: "1054".to_string(),
            employee_name: Some("Jane Doe".to_string()),
            timestamp: timestamp.to_string(),
            status: status.to_string(),
        };
        let report = process_rows(
            &[
                row("2025-01-15 08:00", "Clock In"),
                row("2025-01-15 14:00", "Break Start"),
                row("2025-01-15 14:15", "Break End"),
                row("2025-01-15 15:00", "Clock Out"),
            ],
            &RuleConfig::default(),
        )
        .unwrap();

        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
        assert_eq!(report.results[0].verdict, Verdict::LateBreak);
        assert_eq!(report.results[0].employee_name, "Jane Doe");
    }

    #[test]
    fn invalid_rules_fail_the_batch() {
        let rules = RuleConfig {
            minimum_break_minutes: -5,
            ..RuleConfig::default()
        };
        assert!(matches!(
            process_lines(&["IN 8:00am"], &rules),
            Err(ConfigError::NegativeBreakMinutes { value: -5 })
        ));
    }
}
