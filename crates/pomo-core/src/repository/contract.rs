//! Behavior every [`Repository`] backend must share.
//!
//! Backends run the whole suite with [`run_all`], passing a constructor for
//! an empty store.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

use super::Repository;
use crate::{Category, CategoryFilter, Interval, IntervalState, PomoError};

/// A date in March 2024.
pub fn day(day_of_month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day_of_month).expect("valid March date")
}

/// A timestamp on `date` at `hour`, recorded with a `offset_hours` UTC offset.
pub fn at(date: NaiveDate, hour: u32, offset_hours: i32) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(offset_hours * 3600).expect("valid offset");
    let naive = date.and_hms_opt(hour, 30, 0).expect("valid hour");
    offset
        .from_local_datetime(&naive)
        .single()
        .expect("fixed offsets are unambiguous")
}

/// Builds an unsaved record with the given timing.
pub fn record(
    category: Category,
    planned_secs: u64,
    actual_secs: u64,
    start_time: DateTime<FixedOffset>,
    state: IntervalState,
) -> Interval {
    Interval {
        id: 0,
        start_time,
        planned_duration: Duration::from_secs(planned_secs),
        actual_duration: Duration::from_secs(actual_secs),
        category,
        state,
    }
}

/// A 25 minute pomodoro started at 09:30 UTC on `date`.
pub fn pomodoro_on(date: NaiveDate, actual_secs: u64) -> Interval {
    record(
        Category::Pomodoro,
        1500,
        actual_secs,
        at(date, 9, 0),
        IntervalState::Completed,
    )
}

/// Runs every contract check, each against a fresh store.
pub fn run_all<R, F>(make: F)
where
    R: Repository,
    F: Fn() -> R,
{
    create_assigns_increasing_ids(&make());
    create_ignores_caller_id(&make());
    update_rejects_zero_id(&make());
    update_missing_record_is_not_found(&make());
    update_changes_only_mutable_fields(&make());
    conditional_update_detects_concurrent_writes(&make());
    rejects_actual_beyond_planned(&make());
    by_id_rejects_zero_and_missing(&make());
    last_distinguishes_empty_store(&make());
    breaks_are_limited_and_most_recent_first(&make());
    category_summary_sums_matching_day_and_category(&make());
    category_summary_uses_recorded_offset_date(&make());
    mixed_history_example(&make());
}

pub fn create_assigns_increasing_ids(repo: &impl Repository) {
    let mut previous = 0;
    for n in 0..5 {
        let id = repo.create(&pomodoro_on(day(1), n * 10)).unwrap();
        assert!(id > previous, "id {id} should exceed {previous}");
        previous = id;
    }
}

pub fn create_ignores_caller_id(repo: &impl Repository) {
    let first = repo.create(&pomodoro_on(day(1), 0)).unwrap();

    let mut forged = pomodoro_on(day(1), 60);
    forged.id = first;
    let second = repo.create(&forged).unwrap();

    assert_ne!(first, second);
    assert_eq!(repo.by_id(first).unwrap().actual_duration, Duration::ZERO);
    assert_eq!(
        repo.by_id(second).unwrap().actual_duration,
        Duration::from_secs(60)
    );
}

pub fn update_rejects_zero_id(repo: &impl Repository) {
    repo.create(&pomodoro_on(day(1), 0)).unwrap();
    let err = repo.update(&pomodoro_on(day(1), 10)).unwrap_err();
    assert!(
        matches!(err, PomoError::InvalidIdentifier(0)),
        "got {err:?}"
    );
}

pub fn update_missing_record_is_not_found(repo: &impl Repository) {
    repo.create(&pomodoro_on(day(1), 0)).unwrap();
    let mut missing = pomodoro_on(day(1), 10);
    missing.id = 42;
    let err = repo.update(&missing).unwrap_err();
    assert!(matches!(err, PomoError::NotFound(42)), "got {err:?}");
}

pub fn update_changes_only_mutable_fields(repo: &impl Repository) {
    let original = record(
        Category::Pomodoro,
        1500,
        0,
        at(day(2), 9, 0),
        IntervalState::Running,
    );
    let id = repo.create(&original).unwrap();

    let mut changed = original.clone();
    changed.id = id;
    changed.actual_duration = Duration::from_secs(120);
    changed.state = IntervalState::Paused;
    changed.start_time = at(day(2), 10, 0);
    changed.planned_duration = Duration::from_secs(3000);
    changed.category = Category::LongBreak;
    repo.update(&changed).unwrap();

    let stored = repo.by_id(id).unwrap();
    assert_eq!(stored.actual_duration, Duration::from_secs(120));
    assert_eq!(stored.state, IntervalState::Paused);
    assert_eq!(stored.start_time, at(day(2), 10, 0));
    assert_eq!(stored.planned_duration, Duration::from_secs(1500));
    assert_eq!(stored.category, Category::Pomodoro);
}

pub fn conditional_update_detects_concurrent_writes(repo: &impl Repository) {
    let id = repo
        .create(&record(
            Category::Pomodoro,
            1500,
            60,
            at(day(2), 9, 0),
            IntervalState::Running,
        ))
        .unwrap();
    let read = repo.by_id(id).unwrap();

    let mut paused = read.clone();
    paused.state = IntervalState::Paused;
    repo.update(&paused).unwrap();

    let mut ticked = read.clone();
    ticked.actual_duration = Duration::from_secs(61);
    assert!(!repo.update_if_unchanged(&ticked, &read).unwrap());
    assert_eq!(repo.by_id(id).unwrap(), paused);

    let mut resumed = paused.clone();
    resumed.state = IntervalState::Running;
    assert!(repo.update_if_unchanged(&resumed, &paused).unwrap());
    assert_eq!(repo.by_id(id).unwrap(), resumed);

    let mut missing = resumed.clone();
    missing.id = id + 100;
    let err = repo.update_if_unchanged(&missing, &resumed).unwrap_err();
    assert!(
        matches!(err, PomoError::NotFound(found) if found == id + 100),
        "got {err:?}"
    );

    missing.id = 0;
    let err = repo.update_if_unchanged(&missing, &resumed).unwrap_err();
    assert!(
        matches!(err, PomoError::InvalidIdentifier(0)),
        "got {err:?}"
    );
}

pub fn rejects_actual_beyond_planned(repo: &impl Repository) {
    let too_long = record(
        Category::ShortBreak,
        300,
        301,
        at(day(1), 9, 0),
        IntervalState::Running,
    );
    let err = repo.create(&too_long).unwrap_err();
    assert!(matches!(err, PomoError::InvalidArgument(_)), "got {err:?}");

    let mut valid = too_long.clone();
    valid.actual_duration = Duration::from_secs(300);
    valid.id = repo.create(&valid).unwrap();
    valid.actual_duration = Duration::from_secs(301);
    let err = repo.update(&valid).unwrap_err();
    assert!(matches!(err, PomoError::InvalidArgument(_)), "got {err:?}");
}

pub fn by_id_rejects_zero_and_missing(repo: &impl Repository) {
    let err = repo.by_id(0).unwrap_err();
    assert!(
        matches!(err, PomoError::InvalidIdentifier(0)),
        "got {err:?}"
    );

    let err = repo.by_id(7).unwrap_err();
    assert!(matches!(err, PomoError::NotFound(7)), "got {err:?}");

    let interval = pomodoro_on(day(3), 1500);
    let id = repo.create(&interval).unwrap();
    let stored = repo.by_id(id).unwrap();
    assert_eq!(stored, Interval { id, ..interval });
}

pub fn last_distinguishes_empty_store(repo: &impl Repository) {
    let err = repo.last().unwrap_err();
    assert!(matches!(err, PomoError::NoRecords), "got {err:?}");

    repo.create(&pomodoro_on(day(1), 0)).unwrap();
    let break_record = record(
        Category::ShortBreak,
        300,
        10,
        at(day(1), 10, 0),
        IntervalState::Running,
    );
    let id = repo.create(&break_record).unwrap();

    let last = repo.last().unwrap();
    assert_eq!(last.id, id);
    assert_eq!(last.category, Category::ShortBreak);
}

pub fn breaks_are_limited_and_most_recent_first(repo: &impl Repository) {
    assert!(repo.breaks(3).unwrap().is_empty());

    let mut break_ids = Vec::new();
    for (hour, category) in [
        (9, Category::ShortBreak),
        (10, Category::Pomodoro),
        (11, Category::LongBreak),
        (12, Category::Pomodoro),
        (13, Category::ShortBreak),
    ] {
        let planned = if category == Category::Pomodoro { 1500 } else { 300 };
        let id = repo
            .create(&record(
                category,
                planned,
                planned,
                at(day(4), hour, 0),
                IntervalState::Completed,
            ))
            .unwrap();
        if category.is_break() {
            break_ids.push(id);
        }
    }
    break_ids.reverse();

    let two = repo.breaks(2).unwrap();
    assert_eq!(
        two.iter().map(|interval| interval.id).collect::<Vec<_>>(),
        break_ids[..2]
    );

    let all = repo.breaks(10).unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|interval| interval.category.is_break()));
    assert_eq!(
        all.iter().map(|interval| interval.id).collect::<Vec<_>>(),
        break_ids
    );

    assert!(repo.breaks(0).unwrap().is_empty());
}

pub fn category_summary_sums_matching_day_and_category(repo: &impl Repository) {
    assert_eq!(
        repo.category_summary(day(5), Category::Pomodoro.into())
            .unwrap(),
        Duration::ZERO
    );

    repo.create(&pomodoro_on(day(5), 1500)).unwrap();
    repo.create(&pomodoro_on(day(5), 600)).unwrap();
    repo.create(&pomodoro_on(day(6), 1500)).unwrap();
    for (category, actual) in [(Category::ShortBreak, 300), (Category::LongBreak, 900)] {
        repo.create(&record(
            category,
            actual,
            actual,
            at(day(5), 14, 0),
            IntervalState::Completed,
        ))
        .unwrap();
    }

    assert_eq!(
        repo.category_summary(day(5), Category::Pomodoro.into())
            .unwrap(),
        Duration::from_secs(2100)
    );
    assert_eq!(
        repo.category_summary(day(5), CategoryFilter::Breaks)
            .unwrap(),
        Duration::from_secs(1200)
    );
    assert_eq!(
        repo.category_summary(day(5), Category::LongBreak.into())
            .unwrap(),
        Duration::from_secs(900)
    );
    assert_eq!(
        repo.category_summary(day(6), CategoryFilter::Breaks)
            .unwrap(),
        Duration::ZERO
    );
}

pub fn category_summary_uses_recorded_offset_date(repo: &impl Repository) {
    // 00:30 at UTC+2 on the 11th is still the 10th in UTC.
    repo.create(&record(
        Category::Pomodoro,
        1500,
        1500,
        at(day(11), 0, 2),
        IntervalState::Completed,
    ))
    .unwrap();

    assert_eq!(
        repo.category_summary(day(11), Category::Pomodoro.into())
            .unwrap(),
        Duration::from_secs(1500)
    );
    assert_eq!(
        repo.category_summary(day(10), Category::Pomodoro.into())
            .unwrap(),
        Duration::ZERO
    );
}

pub fn mixed_history_example(repo: &impl Repository) {
    repo.create(&pomodoro_on(day(20), 1500)).unwrap();
    let break_id = repo
        .create(&record(
            Category::ShortBreak,
            300,
            300,
            at(day(20), 10, 0),
            IntervalState::Completed,
        ))
        .unwrap();
    repo.create(&pomodoro_on(day(21), 1500)).unwrap();

    assert_eq!(
        repo.category_summary(day(20), Category::Pomodoro.into())
            .unwrap(),
        Duration::from_secs(1500)
    );
    let breaks = repo.breaks(5).unwrap();
    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0].id, break_id);
    assert_eq!(breaks[0].category, Category::ShortBreak);
}
