//! Daily and multi-day usage summaries computed from stored intervals.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::{Category, CategoryFilter, PomoError, Repository};

/// Time spent on focus and on breaks during one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailySummary {
    pub pomodoro: Duration,
    pub breaks: Duration,
}

/// A named series of per-day totals in seconds.
///
/// `labels` maps each index of `values` to a day label such as `05/Mar`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub name: String,
    pub labels: BTreeMap<usize, String>,
    pub values: Vec<f64>,
}

impl LineSeries {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            labels: BTreeMap::new(),
            values: Vec::new(),
        }
    }

    fn push(&mut self, label: String, value: Duration) {
        self.labels.insert(self.values.len(), label);
        self.values.push(value.as_secs_f64());
    }
}

/// Pomodoro and break series over the same range of days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeSummary {
    pub pomodoro: LineSeries,
    pub breaks: LineSeries,
}

/// Summarises a single day.
pub fn daily_summary<R>(repo: &R, day: NaiveDate) -> Result<DailySummary, PomoError>
where
    R: Repository + ?Sized,
{
    let pomodoro = repo.category_summary(day, CategoryFilter::Only(Category::Pomodoro))?;
    let breaks = repo.category_summary(day, CategoryFilter::Breaks)?;
    Ok(DailySummary { pomodoro, breaks })
}

/// Summarises `n` days, stepping backwards from `start`.
///
/// Index 0 is `start` itself. Any failing day aborts the whole range.
pub fn range_summary<R>(repo: &R, start: NaiveDate, n: usize) -> Result<RangeSummary, PomoError>
where
    R: Repository + ?Sized,
{
    if let Some(last) = n.checked_sub(1) {
        u64::try_from(last)
            .ok()
            .and_then(|offset| start.checked_sub_days(Days::new(offset)))
            .ok_or_else(|| {
                PomoError::InvalidArgument(format!("{n} days before {start} is out of range"))
            })?;
    }

    let mut pomodoro = LineSeries::new("Pomodoro");
    let mut breaks = LineSeries::new("Break");

    let days = std::iter::successors(Some(start), |day| day.pred_opt()).take(n);
    for day in days {
        let summary = daily_summary(repo, day)?;
        let label = day_label(day);
        pomodoro.push(label.clone(), summary.pomodoro);
        breaks.push(label, summary.breaks);
    }

    Ok(RangeSummary { pomodoro, breaks })
}

/// Formats a day as zero-padded day of month and abbreviated month.
pub fn day_label(day: NaiveDate) -> String {
    day.format("%d/%b").to_string()
}
