//! Lifecycle and summary behavior on the durable backend.

use std::sync::Arc;
use std::time::Duration;

use pomo_core::{
    Category, Interval, IntervalObserver, IntervalState, Repository, Timer, TimerConfig,
    daily_summary, range_summary,
};
use pomo_db::SqliteRepository;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct EndCounter {
    ends: usize,
}

impl IntervalObserver for EndCounter {
    fn on_start(&mut self, _: &Interval) {}
    fn on_tick(&mut self, _: &Interval) {}
    fn on_end(&mut self, _: &Interval) {
        self.ends += 1;
    }
}

fn config() -> TimerConfig {
    TimerConfig::new(
        Duration::from_secs(3),
        Duration::from_secs(2),
        Duration::from_secs(4),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn completed_session_is_durable() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("pomo.db");

    let done = {
        let repo = Arc::new(SqliteRepository::open(&path).unwrap());
        let timer = Timer::new(repo, config());
        let mut observer = EndCounter::default();
        let done = timer
            .start(
                timer.current().unwrap(),
                &mut observer,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(observer.ends, 1);
        done
    };

    let repo = SqliteRepository::open(&path).unwrap();
    let stored = repo.last().unwrap();
    assert_eq!(stored, done);
    assert_eq!(stored.state, IntervalState::Completed);
    assert_eq!(stored.actual_duration, stored.planned_duration);

    let today = stored.local_date();
    let summary = daily_summary(&repo, today).unwrap();
    assert_eq!(summary.pomodoro, Duration::from_secs(3));
    assert_eq!(summary.breaks, Duration::ZERO);

    let range = range_summary(&repo, today, 7).unwrap();
    assert_eq!(range.pomodoro.values.len(), 7);
    assert_eq!(range.pomodoro.values[0], 3.0);
}

#[tokio::test(start_paused = true)]
async fn pause_from_second_connection_stops_session() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("pomo.db");

    let runner = Timer::new(Arc::new(SqliteRepository::open(&path).unwrap()), config());
    let other = Timer::new(Arc::new(SqliteRepository::open(&path).unwrap()), config());

    let handle = tokio::spawn({
        let runner = runner.clone();
        async move {
            let mut observer = EndCounter::default();
            let result = runner
                .start(
                    runner.current().unwrap(),
                    &mut observer,
                    CancellationToken::new(),
                )
                .await;
            (result, observer.ends)
        }
    });

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let paused = other.pause().unwrap();
    assert_eq!(paused.actual_duration, Duration::from_secs(1));

    let (result, ends) = handle.await.unwrap();
    let stored = result.unwrap();
    assert_eq!(stored.state, IntervalState::Paused);
    assert_eq!(stored.actual_duration, Duration::from_secs(1));
    assert_eq!(ends, 0);

    let current = other.current().unwrap();
    assert_eq!(current.id, stored.id);
    assert_eq!(current.category, Category::Pomodoro);
}

#[tokio::test(start_paused = true)]
async fn cancelled_session_keeps_partial_progress() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let timer = Timer::new(repo.clone(), config());
    let cancel = CancellationToken::new();

    let handle = tokio::spawn({
        let timer = timer.clone();
        let cancel = cancel.clone();
        async move {
            let mut observer = EndCounter::default();
            let result = timer
                .start(timer.current().unwrap(), &mut observer, cancel)
                .await;
            (result, observer.ends)
        }
    });

    tokio::time::sleep(Duration::from_millis(2500)).await;
    cancel.cancel();

    let (result, ends) = handle.await.unwrap();
    let cancelled = result.unwrap();
    assert_eq!(ends, 1);
    assert_eq!(cancelled.state, IntervalState::Cancelled);
    assert_eq!(
        repo.by_id(cancelled.id).unwrap().actual_duration,
        Duration::from_secs(2)
    );

    let next = timer.current().unwrap();
    assert_eq!(next.category, Category::ShortBreak);
    assert!(!next.is_saved());
}
