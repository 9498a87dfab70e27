//! Storage-agnostic persistence for interval records.
//!
//! The timer and the summary functions depend only on [`Repository`]; the
//! transient [`MemoryRepository`] lives here and the durable SQLite backend
//! lives in the `pomo-db` crate.
//!
//! # Invariants
//!
//! Every backend must provide the same observable behavior:
//! - IDs are assigned on [`Repository::create`], strictly increasing, never reused.
//! - Updates address records by ID and only change `start_time`,
//!   `actual_duration` and `state`.
//! - Conditional updates are atomic with respect to every other writer of
//!   the store, including other processes sharing a database file.
//! - "Same day" compares the calendar date of `start_time` in the offset it
//!   was written with.
//!
//! The shared [`contract`] suite (enabled by the `testing` feature) checks
//! these rules against any backend.

#[cfg(any(test, feature = "testing"))]
pub mod contract;
mod memory;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::{CategoryFilter, Interval, PomoError};

pub use memory::MemoryRepository;

/// Persistence contract for interval records.
///
/// Implementations guard their store with a readers-writer discipline and
/// must be safe to share across threads.
pub trait Repository: Send + Sync {
    /// Appends a new record and returns its freshly assigned ID.
    ///
    /// The `id` field of `interval` is ignored.
    fn create(&self, interval: &Interval) -> Result<i64, PomoError>;

    /// Replaces the mutable fields of the record matching `interval.id`.
    fn update(&self, interval: &Interval) -> Result<(), PomoError>;

    /// Like [`update`](Self::update), but only writes while the stored record
    /// still has the `state` and `actual_duration` of `expected`.
    ///
    /// Returns `false`, leaving the record untouched, when another writer
    /// changed it after `expected` was read.
    fn update_if_unchanged(&self, interval: &Interval, expected: &Interval)
    -> Result<bool, PomoError>;

    /// Loads a record by ID.
    fn by_id(&self, id: i64) -> Result<Interval, PomoError>;

    /// Returns the most recently created record.
    fn last(&self) -> Result<Interval, PomoError>;

    /// Returns up to `n` break records, most recent first.
    fn breaks(&self, n: usize) -> Result<Vec<Interval>, PomoError>;

    /// Sums `actual_duration` over records started on `day` whose category matches `filter`.
    fn category_summary(&self, day: NaiveDate, filter: CategoryFilter)
    -> Result<Duration, PomoError>;
}

impl<R: Repository + ?Sized> Repository for Arc<R> {
    fn create(&self, interval: &Interval) -> Result<i64, PomoError> {
        (**self).create(interval)
    }

    fn update(&self, interval: &Interval) -> Result<(), PomoError> {
        (**self).update(interval)
    }

    fn update_if_unchanged(
        &self,
        interval: &Interval,
        expected: &Interval,
    ) -> Result<bool, PomoError> {
        (**self).update_if_unchanged(interval, expected)
    }

    fn by_id(&self, id: i64) -> Result<Interval, PomoError> {
        (**self).by_id(id)
    }

    fn last(&self) -> Result<Interval, PomoError> {
        (**self).last()
    }

    fn breaks(&self, n: usize) -> Result<Vec<Interval>, PomoError> {
        (**self).breaks(n)
    }

    fn category_summary(
        &self,
        day: NaiveDate,
        filter: CategoryFilter,
    ) -> Result<Duration, PomoError> {
        (**self).category_summary(day, filter)
    }
}

/// Rejects IDs that can never address a stored record.
pub fn validate_id(id: i64) -> Result<(), PomoError> {
    if id <= 0 {
        return Err(PomoError::InvalidIdentifier(id));
    }
    Ok(())
}

/// Rejects records whose elapsed time exceeds the plan.
pub fn validate_durations(interval: &Interval) -> Result<(), PomoError> {
    if interval.actual_duration > interval.planned_duration {
        return Err(PomoError::InvalidArgument(format!(
            "actual duration {}s exceeds planned duration {}s",
            interval.actual_duration.as_secs(),
            interval.planned_duration.as_secs()
        )));
    }
    Ok(())
}
