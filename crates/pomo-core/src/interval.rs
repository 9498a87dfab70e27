//! Interval records and their closed vocabularies.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::PomoError;

/// The kind of session an interval represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl Category {
    /// String representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pomodoro => "Pomodoro",
            Self::ShortBreak => "ShortBreak",
            Self::LongBreak => "LongBreak",
        }
    }

    pub const fn is_break(&self) -> bool {
        matches!(self, Self::ShortBreak | Self::LongBreak)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = PomoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pomodoro" => Ok(Self::Pomodoro),
            "ShortBreak" => Ok(Self::ShortBreak),
            "LongBreak" => Ok(Self::LongBreak),
            _ => Err(PomoError::InvalidState(format!("unknown category: {s}"))),
        }
    }
}

/// Selects which categories a summary covers.
///
/// Breaks are matched by set membership over both break categories rather
/// than by name fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    Only(Category),
    Breaks,
}

impl CategoryFilter {
    pub fn matches(self, category: Category) -> bool {
        match self {
            Self::Only(only) => only == category,
            Self::Breaks => category.is_break(),
        }
    }

    /// The categories selected by this filter.
    pub const fn categories(self) -> &'static [Category] {
        match self {
            Self::Only(Category::Pomodoro) => &[Category::Pomodoro],
            Self::Only(Category::ShortBreak) => &[Category::ShortBreak],
            Self::Only(Category::LongBreak) => &[Category::LongBreak],
            Self::Breaks => &[Category::ShortBreak, Category::LongBreak],
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        Self::Only(category)
    }
}

/// Lifecycle state of an interval.
///
/// The discriminants are the persisted state codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalState {
    NotStarted = 0,
    Running = 1,
    Paused = 2,
    Completed = 3,
    Cancelled = 4,
}

impl IntervalState {
    pub const fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Result<Self, PomoError> {
        match code {
            0 => Ok(Self::NotStarted),
            1 => Ok(Self::Running),
            2 => Ok(Self::Paused),
            3 => Ok(Self::Completed),
            4 => Ok(Self::Cancelled),
            _ => Err(PomoError::InvalidState(format!("unknown state code: {code}"))),
        }
    }

    /// Whether no further transitions are possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for IntervalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// One work or break session and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Assigned by the repository on creation; zero until then.
    pub id: i64,
    /// When the session began, in the writer's local offset.
    pub start_time: DateTime<FixedOffset>,
    pub planned_duration: Duration,
    /// Elapsed time so far. Never exceeds `planned_duration`.
    pub actual_duration: Duration,
    pub category: Category,
    pub state: IntervalState,
}

impl Interval {
    /// Creates an unsaved interval that has not started yet.
    pub fn new(category: Category, planned_duration: Duration) -> Self {
        Self {
            id: 0,
            start_time: Local::now().fixed_offset(),
            planned_duration,
            actual_duration: Duration::ZERO,
            category,
            state: IntervalState::NotStarted,
        }
    }

    /// Time left before natural completion.
    pub fn remaining(&self) -> Duration {
        self.planned_duration.saturating_sub(self.actual_duration)
    }

    /// The calendar date the interval started on, in the offset it was recorded with.
    pub fn local_date(&self) -> NaiveDate {
        self.start_time.date_naive()
    }

    /// Whether the interval has been persisted.
    pub const fn is_saved(&self) -> bool {
        self.id > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrip_all_variants() {
        for category in [
            Category::Pomodoro,
            Category::ShortBreak,
            Category::LongBreak,
        ] {
            let parsed: Category = category.to_string().parse().expect("should parse");
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn unknown_category_errors() {
        let err = "Nap".parse::<Category>().unwrap_err();
        assert!(matches!(err, PomoError::InvalidState(_)));
    }

    #[test]
    fn break_filter_matches_both_breaks_only() {
        assert!(CategoryFilter::Breaks.matches(Category::ShortBreak));
        assert!(CategoryFilter::Breaks.matches(Category::LongBreak));
        assert!(!CategoryFilter::Breaks.matches(Category::Pomodoro));
        assert!(CategoryFilter::from(Category::Pomodoro).matches(Category::Pomodoro));
        assert!(!CategoryFilter::from(Category::Pomodoro).matches(Category::ShortBreak));
    }

    #[test]
    fn state_codes_roundtrip() {
        for state in [
            IntervalState::NotStarted,
            IntervalState::Running,
            IntervalState::Paused,
            IntervalState::Completed,
            IntervalState::Cancelled,
        ] {
            assert_eq!(IntervalState::from_code(state.code()).unwrap(), state);
        }
        assert!(IntervalState::from_code(9).is_err());
    }

    #[test]
    fn new_interval_is_unsaved_and_not_started() {
        let interval = Interval::new(Category::Pomodoro, Duration::from_secs(1500));
        assert!(!interval.is_saved());
        assert_eq!(interval.state, IntervalState::NotStarted);
        assert_eq!(interval.remaining(), Duration::from_secs(1500));
    }
}
