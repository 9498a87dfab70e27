//! Cancel command.

use std::io::Write;

use anyhow::{Context, Result};
use pomo_core::{PomoError, Timer};

use super::util::format_clock;

pub fn run<W: Write>(writer: &mut W, timer: &Timer) -> Result<()> {
    match timer.cancel() {
        Ok(interval) => writeln!(
            writer,
            "Cancelled {} after {}",
            interval.category,
            format_clock(interval.actual_duration)
        )?,
        Err(PomoError::NoRecords | PomoError::AlreadyFinished(_)) => {
            writeln!(writer, "Nothing to cancel.")?;
        }
        Err(err) => return Err(err).context("failed to cancel interval"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use pomo_core::{Category, Interval, IntervalState, MemoryRepository, Repository, TimerConfig};

    #[test]
    fn cancel_paused_session() {
        let repo = Arc::new(MemoryRepository::new());
        let mut paused = Interval::new(Category::ShortBreak, Duration::from_secs(300));
        paused.state = IntervalState::Paused;
        paused.actual_duration = Duration::from_secs(42);
        let id = repo.create(&paused).unwrap();

        let timer = Timer::new(repo.clone(), TimerConfig::default());
        let mut output = Vec::new();
        run(&mut output, &timer).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Cancelled ShortBreak after 00:42\n"
        );
        assert_eq!(repo.by_id(id).unwrap().state, IntervalState::Cancelled);

        let mut output = Vec::new();
        run(&mut output, &timer).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Nothing to cancel.\n");
    }
}
