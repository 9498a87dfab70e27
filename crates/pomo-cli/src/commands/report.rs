//! Report command for daily usage over a range of days.
//!
//! Rows run from the most recent day backwards, matching the series order.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use pomo_core::{RangeSummary, Repository, range_summary};

use super::util::format_duration;

pub fn run<W: Write>(
    writer: &mut W,
    repo: &dyn Repository,
    end: NaiveDate,
    days: usize,
    json: bool,
) -> Result<()> {
    let report = range_summary(repo, end, days)
        .with_context(|| format!("failed to build report for {days} days ending {end}"))?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    write_table(writer, &report, end, days)
}

fn write_table<W: Write>(
    writer: &mut W,
    report: &RangeSummary,
    end: NaiveDate,
    days: usize,
) -> Result<()> {
    writeln!(writer, "Report for {days} days ending {end}")?;
    writeln!(writer, "{:<8}{:>10}{:>10}", "Day", "Pomodoro", "Breaks")?;

    for (index, label) in &report.pomodoro.labels {
        let pomodoro = seconds(report.pomodoro.values[*index]);
        let breaks = seconds(report.breaks.values[*index]);
        writeln!(
            writer,
            "{label:<8}{:>10}{:>10}",
            format_duration(pomodoro),
            format_duration(breaks)
        )?;
    }

    let total_pomodoro: f64 = report.pomodoro.values.iter().sum();
    let total_breaks: f64 = report.breaks.values.iter().sum();
    writeln!(
        writer,
        "{:<8}{:>10}{:>10}",
        "Total",
        format_duration(seconds(total_pomodoro)),
        format_duration(seconds(total_breaks))
    )?;
    Ok(())
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}
