//! Config command for printing the effective rules.

use std::io::Write;

use anyhow::{Context, Result};

use crate::Config;

/// Prints the rules as they would be applied, in config-file form.
pub fn run(out: &mut impl Write, config: &Config) -> Result<()> {
    config
        .rules
        .validate()
        .context("invalid rule configuration")?;

    let rules = &config.rules;
    writeln!(out, "[rules]")?;
    writeln!(
        out,
        "violation_hour_threshold = {:?}",
        rules.violation_hour_threshold
    )?;
    writeln!(
        out,
        "early_break_deadline_hours = {:?}",
        rules.early_break_deadline_hours
    )?;
    writeln!(out, "minimum_break_minutes = {}", rules.minimum_break_minutes)?;
    Ok(())
}
