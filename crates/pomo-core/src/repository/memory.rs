//! Transient in-memory backend.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::NaiveDate;

use super::{Repository, validate_durations, validate_id};
use crate::{CategoryFilter, Interval, PomoError};

/// Append-only interval store held in process memory.
///
/// The ID of a record is its 1-based position in the sequence. A single
/// `RwLock` guards the whole sequence: reads run concurrently, writes are
/// exclusive.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    intervals: RwLock<Vec<Interval>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Interval>> {
        self.intervals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Interval>> {
        self.intervals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn position(id: i64) -> Result<usize, PomoError> {
        validate_id(id)?;
        usize::try_from(id - 1).map_err(|_| PomoError::InvalidIdentifier(id))
    }
}

impl Repository for MemoryRepository {
    fn create(&self, interval: &Interval) -> Result<i64, PomoError> {
        validate_durations(interval)?;
        let mut intervals = self.write();

        let id = i64::try_from(intervals.len() + 1)
            .map_err(|_| PomoError::InvalidArgument("interval store is full".to_string()))?;
        let mut record = interval.clone();
        record.id = id;
        intervals.push(record);

        Ok(id)
    }

    fn update(&self, interval: &Interval) -> Result<(), PomoError> {
        let index = Self::position(interval.id)?;
        validate_durations(interval)?;
        let mut intervals = self.write();

        let record = intervals
            .get_mut(index)
            .ok_or(PomoError::NotFound(interval.id))?;
        record.start_time = interval.start_time;
        record.actual_duration = interval.actual_duration;
        record.state = interval.state;

        Ok(())
    }

    fn update_if_unchanged(
        &self,
        interval: &Interval,
        expected: &Interval,
    ) -> Result<bool, PomoError> {
        let index = Self::position(interval.id)?;
        validate_durations(interval)?;
        let mut intervals = self.write();

        let record = intervals
            .get_mut(index)
            .ok_or(PomoError::NotFound(interval.id))?;
        if record.state != expected.state || record.actual_duration != expected.actual_duration {
            return Ok(false);
        }
        record.start_time = interval.start_time;
        record.actual_duration = interval.actual_duration;
        record.state = interval.state;

        Ok(true)
    }

    fn by_id(&self, id: i64) -> Result<Interval, PomoError> {
        let index = Self::position(id)?;
        let intervals = self.read();

        intervals.get(index).cloned().ok_or(PomoError::NotFound(id))
    }

    fn last(&self) -> Result<Interval, PomoError> {
        let intervals = self.read();
        intervals.last().cloned().ok_or(PomoError::NoRecords)
    }

    fn breaks(&self, n: usize) -> Result<Vec<Interval>, PomoError> {
        let intervals = self.read();
        Ok(intervals
            .iter()
            .rev()
            .filter(|interval| interval.category.is_break())
            .take(n)
            .cloned()
            .collect())
    }

    fn category_summary(
        &self,
        day: NaiveDate,
        filter: CategoryFilter,
    ) -> Result<Duration, PomoError> {
        let intervals = self.read();
        Ok(intervals
            .iter()
            .filter(|interval| interval.local_date() == day && filter.matches(interval.category))
            .map(|interval| interval.actual_duration)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::contract;

    #[test]
    fn memory_backend_satisfies_contract() {
        contract::run_all(MemoryRepository::new);
    }

    #[test]
    fn concurrent_creates_assign_unique_ids() {
        let repo = std::sync::Arc::new(MemoryRepository::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                let interval = contract::pomodoro_on(contract::day(1), 0);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| repo.create(&interval).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<i64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids, (1..=200).collect::<Vec<_>>());
    }
}
