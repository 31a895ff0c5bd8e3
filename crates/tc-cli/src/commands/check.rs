//! Check command for evaluating a timecard export.
//!
//! This module implements `tc check` which reconstructs every employee's
//! shift-days from an export and prints a compliance verdict for each.

use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tc_core::token::format_time;
use tc_core::{
    ComplianceResult, Diagnostic, Evidence, Report, RowRecord, RuleConfig, Summary, process_lines,
    process_rows,
};

use crate::Config;

const NAME_WIDTH: usize = 20;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Export to check; `-` reads standard input.
    pub path: PathBuf,

    /// Read JSON Lines row records instead of export text.
    #[arg(long)]
    pub rows: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,

    /// Only list shift-days that violate the rule.
    #[arg(long)]
    pub violations_only: bool,

    /// Worked hours above which a meal break is required.
    #[arg(long, value_name = "HOURS")]
    pub threshold: Option<f64>,

    /// Worked hours by which the meal break must have started.
    #[arg(long, value_name = "HOURS")]
    pub deadline: Option<f64>,

    /// Minimum length of a qualifying meal break.
    #[arg(long, value_name = "MINUTES")]
    pub min_break: Option<i64>,
}

impl CheckArgs {
    /// Configured rules with any command-line overrides applied.
    pub fn rules(&self, config: &Config) -> RuleConfig {
        let mut rules = config.rules;
        if let Some(hours) = self.threshold {
            rules.violation_hour_threshold = hours;
        }
        if let Some(hours) = self.deadline {
            rules.early_break_deadline_hours = hours;
        }
        if let Some(minutes) = self.min_break {
            rules.minimum_break_minutes = minutes;
        }
        rules
    }
}

pub fn run(out: &mut impl Write, args: &CheckArgs, config: &Config) -> Result<Summary> {
    let rules = args.rules(config);
    tracing::debug!(?rules, path = %args.path.display(), "checking export");

    let reader = open_input(&args.path)?;
    let report = if args.rows {
        process_rows(&parse_rows(reader)?, &rules)
    } else {
        process_lines(&read_lines(reader)?, &rules)
    };
    let report = report.context("invalid rule configuration")?;

    if args.json {
        write_json(out, &report, args.violations_only)?;
    } else {
        out.write_all(format_report(&report, args.violations_only)?.as_bytes())?;
    }

    Ok(report.summary())
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn read_lines<R: BufRead>(reader: R) -> Result<Vec<String>> {
    reader
        .lines()
        .collect::<io::Result<Vec<_>>>()
        .context("failed to read input")
}

/// Parses JSON Lines row records. Blank lines are skipped, so row numbers in
/// diagnostics count records rather than physical lines.
fn parse_rows<R: BufRead>(reader: R) -> Result<Vec<RowRecord>> {
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let row: RowRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid row on line {}", idx + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

// ========== JSON Output ==========

#[derive(Serialize)]
struct JsonReport<'a> {
    results: Vec<&'a ComplianceResult>,
    diagnostics: &'a [Diagnostic],
    summary: Summary,
}

fn write_json(out: &mut impl Write, report: &Report, violations_only: bool) -> Result<()> {
    let json = JsonReport {
        results: listed_results(report, violations_only),
        diagnostics: &report.diagnostics,
        summary: report.summary(),
    };
    serde_json::to_writer_pretty(&mut *out, &json)?;
    writeln!(out)?;
    Ok(())
}

// ========== Human-Readable Output ==========

fn listed_results(report: &Report, violations_only: bool) -> Vec<&ComplianceResult> {
    if violations_only {
        report.violations().collect()
    } else {
        report.results.iter().collect()
    }
}

/// Format a report as a table of verdicts followed by diagnostics.
pub fn format_report(report: &Report, violations_only: bool) -> Result<String, fmt::Error> {
    let mut output = String::new();
    let summary = report.summary();

    writeln!(output, "MEAL BREAK COMPLIANCE")?;
    writeln!(output)?;

    let results = listed_results(report, violations_only);
    if results.is_empty() {
        if violations_only && summary.shift_days > 0 {
            writeln!(output, "No violations.")?;
        } else {
            writeln!(output, "No shift-days found.")?;
        }
    } else {
        writeln!(
            output,
            "{:<8}  {:<NAME_WIDTH$}  {:<10}  {:>5}  {:<14}  BREAK",
            "EMPLOYEE", "NAME", "DATE", "HOURS", "VERDICT"
        )?;
        writeln!(
            output,
            "────────  ────────────────────  ──────────  ─────  ──────────────  ─────"
        )?;
        for result in results {
            let evidence = result
                .evidence
                .as_ref()
                .map_or_else(|| "-".to_string(), format_evidence);
            let row = format!(
                "{:<8}  {:<NAME_WIDTH$}  {:<10}  {:>5.2}  {:<14}  {}",
                result.employee_id.as_str(),
                truncate(&result.employee_name, NAME_WIDTH),
                result.date.to_string(),
                result.total_worked_hours,
                result.verdict.as_str(),
                evidence,
            );
            writeln!(output, "{}", row.trim_end())?;
        }
    }

    writeln!(output)?;
    writeln!(
        output,
        "{} shift-days: {} compliant, {} no_break_taken, {} late_break",
        summary.shift_days, summary.compliant, summary.no_break_taken, summary.late_break
    )?;

    if !report.diagnostics.is_empty() {
        writeln!(output)?;
        writeln!(output, "DIAGNOSTICS ({})", report.diagnostics.len())?;
        for diagnostic in &report.diagnostics {
            writeln!(output, "{diagnostic}")?;
        }
    }

    Ok(output)
}

fn format_evidence(evidence: &Evidence) -> String {
    format!(
        "{}-{} ({}m after {:.2}h)",
        format_time(evidence.interval.start.time()),
        format_time(evidence.interval.end.time()),
        evidence.interval.minutes(),
        evidence.worked_before_hours
    )
}

// Truncate by characters, not bytes, to avoid panics on multi-byte UTF-8
fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() > width {
        format!("{}...", name.chars().take(width - 3).collect::<String>())
    } else {
        name.to_string()
    }
}
