//! Interval lifecycle: the ticking timer that drives one session.
//!
//! A session moves through
//! `NotStarted -> Running -> (Paused -> Running)* -> Completed | Cancelled`.
//! Every transition is written through the [`Repository`] before observers
//! hear about it.
//!
//! # Concurrency
//!
//! [`Timer::start`] runs the tick loop on the calling task and hands each
//! storage step to the blocking pool, so a database waiting on another
//! process's lock never stalls the runtime. Cancellation is observed between
//! steps; a step already in flight finishes first.
//!
//! Each tick reloads the record by ID, so a pause written by another task or
//! process is seen at the next tick boundary. Ticks, pauses and cancellations
//! write with [`Repository::update_if_unchanged`]: a write based on a stale
//! read is dropped and retried against the fresh record, so a pause that lands
//! between a tick's read and its write is never overwritten. Within one
//! `Timer` (and its clones) these steps are also serialised by a shared gate.
//!
//! Observers run on the ticking task. They must not call back into the
//! timer synchronously; use [`TimerEvent`] over a channel to hand work off.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Category, Interval, IntervalState, PomoError, Repository};

/// Period between progress updates.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Number of recent breaks inspected when choosing between a short and a long break.
const BREAKS_PER_LONG_BREAK: usize = 3;

/// Planned durations per category and the tick period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub pomodoro: Duration,
    pub short_break: Duration,
    pub long_break: Duration,
    pub tick: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            pomodoro: Duration::from_secs(25 * 60),
            short_break: Duration::from_secs(5 * 60),
            long_break: Duration::from_secs(15 * 60),
            tick: DEFAULT_TICK,
        }
    }
}

impl TimerConfig {
    /// Builds a config with the default tick, rejecting zero or fractional-second durations.
    pub fn new(
        pomodoro: Duration,
        short_break: Duration,
        long_break: Duration,
    ) -> Result<Self, PomoError> {
        for (name, duration) in [
            ("pomodoro", pomodoro),
            ("short break", short_break),
            ("long break", long_break),
        ] {
            if duration.is_zero() || duration.subsec_nanos() != 0 {
                return Err(PomoError::InvalidArgument(format!(
                    "{name} duration must be a positive number of seconds, got {duration:?}"
                )));
            }
        }
        Ok(Self {
            pomodoro,
            short_break,
            long_break,
            tick: DEFAULT_TICK,
        })
    }

    /// Replaces the tick period.
    pub fn with_tick(self, tick: Duration) -> Result<Self, PomoError> {
        if tick.is_zero() {
            return Err(PomoError::InvalidArgument(
                "tick period must be positive".to_string(),
            ));
        }
        Ok(Self { tick, ..self })
    }

    pub const fn planned(&self, category: Category) -> Duration {
        match category {
            Category::Pomodoro => self.pomodoro,
            Category::ShortBreak => self.short_break,
            Category::LongBreak => self.long_break,
        }
    }
}

/// Receives lifecycle notifications for one session.
pub trait IntervalObserver: Send {
    /// The session was created or resumed and is about to tick.
    fn on_start(&mut self, interval: &Interval);
    /// Progress was persisted.
    fn on_tick(&mut self, interval: &Interval);
    /// The session completed or was cancelled.
    fn on_end(&mut self, interval: &Interval);
}

/// Lifecycle notification in message form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Started(Interval),
    Tick(Interval),
    Ended(Interval),
}

impl IntervalObserver for UnboundedSender<TimerEvent> {
    fn on_start(&mut self, interval: &Interval) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.send(TimerEvent::Started(interval.clone()));
    }

    fn on_tick(&mut self, interval: &Interval) {
        let _ = self.send(TimerEvent::Tick(interval.clone()));
    }

    fn on_end(&mut self, interval: &Interval) {
        let _ = self.send(TimerEvent::Ended(interval.clone()));
    }
}

/// Observer built from three closures.
pub struct Callbacks<S, T, E> {
    pub on_start: S,
    pub on_tick: T,
    pub on_end: E,
}

impl<S, T, E> IntervalObserver for Callbacks<S, T, E>
where
    S: FnMut(&Interval) + Send,
    T: FnMut(&Interval) + Send,
    E: FnMut(&Interval) + Send,
{
    fn on_start(&mut self, interval: &Interval) {
        (self.on_start)(interval);
    }

    fn on_tick(&mut self, interval: &Interval) {
        (self.on_tick)(interval);
    }

    fn on_end(&mut self, interval: &Interval) {
        (self.on_end)(interval);
    }
}

/// Outcome of one tick.
enum Step {
    Running(Interval),
    Paused(Interval),
    Ended(Interval),
}

/// Drives intervals through their lifecycle against a repository.
#[derive(Clone)]
pub struct Timer {
    repo: Arc<dyn Repository>,
    config: TimerConfig,
    gate: Arc<Mutex<()>>,
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Timer {
    pub fn new(repo: Arc<dyn Repository>, config: TimerConfig) -> Self {
        Self {
            repo,
            config,
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub const fn config(&self) -> &TimerConfig {
        &self.config
    }

    fn lock_gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the most recent session, failing with `NoRecords` if none ever ran.
    pub fn last(&self) -> Result<Interval, PomoError> {
        self.repo.last()
    }

    /// Returns the session to start next.
    ///
    /// An unfinished last record is returned as is. Otherwise a new, unsaved
    /// interval is built whose category follows the pomodoro rotation.
    pub fn current(&self) -> Result<Interval, PomoError> {
        let last = match self.repo.last() {
            Ok(last) if !last.state.is_terminal() => return Ok(last),
            Ok(last) => Some(last),
            Err(PomoError::NoRecords) => None,
            Err(err) => return Err(err),
        };

        let category = self.next_category(last.as_ref())?;
        Ok(Interval::new(category, self.config.planned(category)))
    }

    fn next_category(&self, last: Option<&Interval>) -> Result<Category, PomoError> {
        let Some(last) = last else {
            return Ok(Category::Pomodoro);
        };
        if last.category.is_break() {
            return Ok(Category::Pomodoro);
        }

        let breaks = self.repo.breaks(BREAKS_PER_LONG_BREAK)?;
        if breaks.len() < BREAKS_PER_LONG_BREAK
            || breaks.iter().any(|b| b.category == Category::LongBreak)
        {
            return Ok(Category::ShortBreak);
        }
        Ok(Category::LongBreak)
    }

    /// Starts or resumes `interval` and ticks until it completes, pauses or is cancelled.
    ///
    /// Returns the interval as last persisted. A session that is already
    /// running is returned unchanged without ticking.
    pub async fn start<O>(
        &self,
        interval: Interval,
        observer: &mut O,
        cancel: CancellationToken,
    ) -> Result<Interval, PomoError>
    where
        O: IntervalObserver + ?Sized,
    {
        let interval = match interval.state {
            IntervalState::Running => {
                debug!(id = interval.id, "interval already running");
                return Ok(interval);
            }
            IntervalState::Completed | IntervalState::Cancelled => {
                return Err(PomoError::AlreadyFinished(interval.id));
            }
            IntervalState::NotStarted => self.begin(interval)?,
            IntervalState::Paused => self.resume(interval.id)?,
        };

        observer.on_start(&interval);
        self.run(interval, observer, cancel).await
    }

    fn begin(&self, mut interval: Interval) -> Result<Interval, PomoError> {
        if interval.planned_duration.is_zero() {
            return Err(PomoError::InvalidArgument(
                "planned duration must be positive".to_string(),
            ));
        }
        interval.start_time = Local::now().fixed_offset();
        interval.actual_duration = Duration::ZERO;
        interval.state = IntervalState::Running;

        let _gate = self.lock_gate();
        if interval.is_saved() {
            self.repo.update(&interval)?;
        } else {
            interval.id = self.repo.create(&interval)?;
        }
        info!(
            id = interval.id,
            category = %interval.category,
            planned_secs = interval.planned_duration.as_secs(),
            "interval started"
        );
        Ok(interval)
    }

    fn resume(&self, id: i64) -> Result<Interval, PomoError> {
        let _gate = self.lock_gate();
        loop {
            let stored = self.repo.by_id(id)?;
            if stored.state != IntervalState::Paused {
                return Err(PomoError::InvalidState(format!(
                    "cannot resume interval {id} while {}",
                    stored.state
                )));
            }
            let mut interval = stored.clone();
            interval.state = IntervalState::Running;
            if self.repo.update_if_unchanged(&interval, &stored)? {
                info!(
                    id,
                    elapsed_secs = interval.actual_duration.as_secs(),
                    "interval resumed"
                );
                return Ok(interval);
            }
        }
    }

    /// Runs a storage step on the blocking pool so a busy database never
    /// stalls the async runtime.
    async fn blocking<T, F>(&self, step: F) -> Result<T, PomoError>
    where
        T: Send + 'static,
        F: FnOnce(&Self) -> Result<T, PomoError> + Send + 'static,
    {
        let timer = self.clone();
        tokio::task::spawn_blocking(move || step(&timer))
            .await
            .map_err(PomoError::storage)?
    }

    async fn run<O>(
        &self,
        mut latest: Interval,
        observer: &mut O,
        cancel: CancellationToken,
    ) -> Result<Interval, PomoError>
    where
        O: IntervalObserver + ?Sized,
    {
        let id = latest.id;
        let tick = self.config.tick;
        let mut ticker = time::interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return match self.blocking(move |timer| timer.stop(id)).await {
                        Ok(stopped) => {
                            observer.on_end(&stopped);
                            Ok(stopped)
                        }
                        Err(err) => {
                            warn!(id, error = %err, "failed to record cancellation");
                            latest.state = IntervalState::Cancelled;
                            observer.on_end(&latest);
                            Err(err)
                        }
                    };
                }
                _ = ticker.tick() => {
                    match self.blocking(move |timer| timer.advance(id, tick)).await {
                        Ok(Step::Running(interval)) => {
                            observer.on_tick(&interval);
                            latest = interval;
                        }
                        Ok(Step::Paused(interval)) => return Ok(interval),
                        Ok(Step::Ended(interval)) => {
                            observer.on_end(&interval);
                            return Ok(interval);
                        }
                        Err(err) => {
                            warn!(id, error = %err, "tick failed, stopping timer");
                            return Err(err);
                        }
                    }
                }
            }
        }
    }

    /// Adds one tick of progress to the stored record.
    ///
    /// The write only lands if the record is unchanged since it was read, so
    /// a pause or cancel from another process is never overwritten.
    fn advance(&self, id: i64, step: Duration) -> Result<Step, PomoError> {
        let _gate = self.lock_gate();
        loop {
            let stored = self.repo.by_id(id)?;
            match stored.state {
                IntervalState::Running => {}
                IntervalState::Paused => {
                    info!(id, "interval paused");
                    return Ok(Step::Paused(stored));
                }
                IntervalState::Completed | IntervalState::Cancelled => {
                    info!(id, state = %stored.state, "interval finished elsewhere");
                    return Ok(Step::Ended(stored));
                }
                IntervalState::NotStarted => {
                    return Err(PomoError::InvalidState(format!(
                        "interval {id} is not started while ticking"
                    )));
                }
            }

            let mut interval = stored.clone();
            interval.actual_duration =
                (interval.actual_duration + step).min(interval.planned_duration);
            let completed = interval.actual_duration == interval.planned_duration;
            if completed {
                interval.state = IntervalState::Completed;
            }

            if !self.repo.update_if_unchanged(&interval, &stored)? {
                debug!(id, "interval changed during tick, reloading");
                continue;
            }
            if completed {
                info!(id, category = %interval.category, "interval completed");
                return Ok(Step::Ended(interval));
            }
            debug!(
                id,
                elapsed_secs = interval.actual_duration.as_secs(),
                "tick"
            );
            return Ok(Step::Running(interval));
        }
    }

    /// Records the cancellation of a session this timer is running.
    ///
    /// A session that already finished elsewhere is returned as stored.
    fn stop(&self, id: i64) -> Result<Interval, PomoError> {
        let _gate = self.lock_gate();
        loop {
            let stored = self.repo.by_id(id)?;
            if stored.state.is_terminal() {
                return Ok(stored);
            }
            let mut interval = stored.clone();
            interval.state = IntervalState::Cancelled;
            if self.repo.update_if_unchanged(&interval, &stored)? {
                info!(
                    id,
                    elapsed_secs = interval.actual_duration.as_secs(),
                    "interval cancelled"
                );
                return Ok(interval);
            }
        }
    }

    /// Pauses the running session.
    ///
    /// Fails with [`PomoError::NotRunning`] when nothing is running; callers
    /// treat that as a no-op.
    pub fn pause(&self) -> Result<Interval, PomoError> {
        let _gate = self.lock_gate();
        loop {
            let stored = match self.repo.last() {
                Ok(interval) => interval,
                Err(PomoError::NoRecords) => return Err(PomoError::NotRunning),
                Err(err) => return Err(err),
            };
            if stored.state != IntervalState::Running {
                return Err(PomoError::NotRunning);
            }

            let mut interval = stored.clone();
            interval.state = IntervalState::Paused;
            if self.repo.update_if_unchanged(&interval, &stored)? {
                info!(
                    id = interval.id,
                    elapsed_secs = interval.actual_duration.as_secs(),
                    "pause requested"
                );
                return Ok(interval);
            }
        }
    }

    /// Cancels the unfinished last session.
    ///
    /// A session ticking in another task or process stops at its next tick.
    pub fn cancel(&self) -> Result<Interval, PomoError> {
        let _gate = self.lock_gate();
        loop {
            let stored = self.repo.last()?;
            if stored.state.is_terminal() {
                return Err(PomoError::AlreadyFinished(stored.id));
            }

            let mut interval = stored.clone();
            interval.state = IntervalState::Cancelled;
            if self.repo.update_if_unchanged(&interval, &stored)? {
                info!(id = interval.id, "interval cancelled");
                return Ok(interval);
            }
        }
    }
}
