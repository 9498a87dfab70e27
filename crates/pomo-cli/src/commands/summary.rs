//! Summary command for one day of usage.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use pomo_core::{Repository, daily_summary};

use super::util::format_duration;

pub fn run<W: Write>(writer: &mut W, repo: &dyn Repository, day: NaiveDate) -> Result<()> {
    let summary = daily_summary(repo, day).with_context(|| format!("failed to summarise {day}"))?;

    writeln!(writer, "Summary for {day}")?;
    writeln!(writer, "Pomodoro: {}", format_duration(summary.pomodoro))?;
    writeln!(writer, "Breaks:   {}", format_duration(summary.breaks))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use chrono::{Local, TimeZone};
    use insta::assert_snapshot;
    use pomo_core::{Category, Interval, IntervalState, MemoryRepository};

    fn completed(category: Category, secs: u64, hour: u32) -> Interval {
        Interval {
            id: 0,
            start_time: Local
                .with_ymd_and_hms(2024, 3, 10, hour, 0, 0)
                .unwrap()
                .fixed_offset(),
            planned_duration: Duration::from_secs(secs),
            actual_duration: Duration::from_secs(secs),
            category,
            state: IntervalState::Completed,
        }
    }

    #[test]
    fn summary_totals_focus_and_breaks() {
        let repo = MemoryRepository::new();
        for (category, secs, hour) in [
            (Category::Pomodoro, 1500, 9),
            (Category::ShortBreak, 300, 10),
            (Category::Pomodoro, 1500, 11),
            (Category::Pomodoro, 1500, 12),
            (Category::LongBreak, 900, 13),
        ] {
            repo.create(&completed(category, secs, hour)).unwrap();
        }

        let mut output = Vec::new();
        run(
            &mut output,
            &repo,
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        )
        .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Summary for 2024-03-10
        Pomodoro: 1h 15m
        Breaks:   20m
        ");
    }
}
