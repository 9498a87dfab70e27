//! Status command for showing the most recent interval.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use pomo_core::{Category, Interval, IntervalState, PomoError, Timer};
use serde::Serialize;

use super::util::format_clock;

/// JSON view of an interval with durations in whole seconds.
#[derive(Debug, Serialize)]
struct IntervalJson {
    id: i64,
    category: Category,
    state: IntervalState,
    start_time: DateTime<FixedOffset>,
    planned_secs: u64,
    actual_secs: u64,
}

impl From<&Interval> for IntervalJson {
    fn from(interval: &Interval) -> Self {
        Self {
            id: interval.id,
            category: interval.category,
            state: interval.state,
            start_time: interval.start_time,
            planned_secs: interval.planned_duration.as_secs(),
            actual_secs: interval.actual_duration.as_secs(),
        }
    }
}

pub fn run<W: Write>(writer: &mut W, timer: &Timer, json: bool) -> Result<()> {
    let interval = match timer.last() {
        Ok(interval) => interval,
        Err(PomoError::NoRecords) => {
            if json {
                writeln!(writer, "null")?;
            } else {
                writeln!(writer, "No intervals recorded.")?;
            }
            return Ok(());
        }
        Err(err) => return Err(err).context("failed to load last interval"),
    };

    if json {
        let view = IntervalJson::from(&interval);
        writeln!(writer, "{}", serde_json::to_string_pretty(&view)?)?;
        return Ok(());
    }

    writeln!(writer, "Interval #{}", interval.id)?;
    writeln!(writer, "Category: {}", interval.category)?;
    writeln!(writer, "State:    {}", interval.state)?;
    writeln!(
        writer,
        "Started:  {}",
        interval.start_time.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(
        writer,
        "Elapsed:  {} / {}",
        format_clock(interval.actual_duration),
        format_clock(interval.planned_duration)
    )?;

    Ok(())
}
