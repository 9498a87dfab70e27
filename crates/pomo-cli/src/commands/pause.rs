//! Pause command.

use std::io::Write;

use anyhow::{Context, Result};
use pomo_core::Timer;

use super::util::format_clock;

pub fn run<W: Write>(writer: &mut W, timer: &Timer) -> Result<()> {
    match timer.pause() {
        Ok(interval) => writeln!(
            writer,
            "Paused {} at {} of {}",
            interval.category,
            format_clock(interval.actual_duration),
            format_clock(interval.planned_duration)
        )?,
        Err(err) if err.is_not_running() => writeln!(writer, "Nothing is running.")?,
        Err(err) => return Err(err).context("failed to pause interval"),
    }
    Ok(())
}
