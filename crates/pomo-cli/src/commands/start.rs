//! Start command: runs the current interval in the foreground.
//!
//! The timer ticks on its own task and reports progress as [`TimerEvent`]s;
//! this command only renders them.

use std::io::Write;

use anyhow::{Context, Result};
use pomo_core::{Category, Interval, IntervalState, Timer, TimerEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::util::format_clock;

/// Runs the start command until the interval completes, pauses or is cancelled.
pub async fn run<W: Write>(
    writer: &mut W,
    timer: &Timer,
    cancel: CancellationToken,
) -> Result<Interval> {
    let interval = timer
        .current()
        .context("failed to fetch the current interval")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = tokio::spawn({
        let timer = timer.clone();
        async move {
            let mut tx = tx;
            timer.start(interval, &mut tx, cancel).await
        }
    });

    while let Some(event) = rx.recv().await {
        writeln!(writer, "{}", render_event(&event))?;
    }

    let finished = session
        .await
        .context("timer task failed")?
        .context("interval stopped")?;

    match finished.state {
        IntervalState::Paused => {
            writeln!(writer, "Paused... run `pomo start` to continue")?;
        }
        IntervalState::Running => {
            writeln!(writer, "{} is already running", finished.category)?;
        }
        _ => {}
    }

    Ok(finished)
}

/// Renders one lifecycle event as a line of output.
pub fn render_event(event: &TimerEvent) -> String {
    match event {
        TimerEvent::Started(interval) => {
            let message = if interval.category == Category::Pomodoro {
                "Focus on your task"
            } else {
                "Take a break"
            };
            format!(
                "{}: {message} ({} remaining)",
                interval.category,
                format_clock(interval.remaining())
            )
        }
        TimerEvent::Tick(interval) => format!(
            "{} {} remaining",
            interval.category,
            format_clock(interval.remaining())
        ),
        TimerEvent::Ended(interval) => match interval.state {
            IntervalState::Cancelled => format!(
                "{} cancelled after {}",
                interval.category,
                format_clock(interval.actual_duration)
            ),
            _ => format!("{} finished!", interval.category),
        },
    }
}
