//! Storage layer for the pomodoro tracker.
//!
//! Provides a durable [`Repository`] backend using `rusqlite`.
//!
//! # Thread Safety
//!
//! `rusqlite::Connection` is `Send` but not `Sync`, so concurrent readers
//! cannot share it. [`SqliteRepository`] serialises every call behind one
//! `Mutex`, which gives the same ordering guarantees as the readers-writer
//! lock of the in-memory backend: a write is never interleaved with another
//! read or write of the same store. Separate `SqliteRepository` instances
//! (for example in two `pomo` processes) coordinate through SQLite's own
//! file locking, with a busy timeout.
//!
//! # Schema
//!
//! One table, created on open if absent. No migrations are performed.
//!
//! ## Timestamp Format
//!
//! `start_time` is stored as TEXT in RFC 3339 format with the writer's local
//! offset (e.g., `2024-03-11T00:30:00+02:00`). The first ten characters are
//! therefore the calendar date the interval started on, in the timezone it
//! was recorded in, which is what day summaries group by.
//!
//! ## Durations
//!
//! `planned_duration` and `actual_duration` are INTEGER nanosecond counts.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use pomo_core::repository::{validate_durations, validate_id};
use pomo_core::{Category, CategoryFilter, Interval, IntervalState, PomoError, Repository};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use thiserror::Error;
use tracing::debug;

/// How long a connection waits for another process holding the write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str =
    "SELECT id, start_time, planned_duration, actual_duration, category, state FROM interval";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored start time.
    #[error("invalid start time for interval {interval_id}: {timestamp}")]
    TimestampParse {
        interval_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored or supplied duration does not fit the nanosecond column.
    #[error("duration out of range for interval {interval_id}: {value}")]
    DurationRange { interval_id: i64, value: String },
    /// The summed durations of one day cannot be a duration.
    #[error("duration total out of range for {day}: {nanos}ns")]
    TotalRange { day: NaiveDate, nanos: i64 },
}

impl From<DbError> for PomoError {
    fn from(err: DbError) -> Self {
        Self::storage(err)
    }
}

/// Durable interval store on an embedded SQLite database.
///
/// See the [module documentation](self) for thread safety and schema details.
#[derive(Debug)]
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

/// Column values as stored, before decoding into an [`Interval`].
struct IntervalRow {
    id: i64,
    start_time: String,
    planned_duration: i64,
    actual_duration: i64,
    category: String,
    state: i64,
}

impl IntervalRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start_time: row.get(1)?,
            planned_duration: row.get(2)?,
            actual_duration: row.get(3)?,
            category: row.get(4)?,
            state: row.get(5)?,
        })
    }

    fn into_interval(self) -> Result<Interval, PomoError> {
        Ok(Interval {
            id: self.id,
            start_time: parse_timestamp(&self.start_time, self.id)?,
            planned_duration: nanos_to_duration(self.planned_duration, self.id)?,
            actual_duration: nanos_to_duration(self.actual_duration, self.id)?,
            category: self.category.parse()?,
            state: IntervalState::from_code(self.state)?,
        })
    }
}

impl SqliteRepository {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the repository is dropped.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Initializes the schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(conn: Connection) -> Result<Self, DbError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            -- start_time: RFC 3339 with the writer's local offset
            -- planned_duration, actual_duration: nanoseconds
            -- state: 0 not started, 1 running, 2 paused, 3 completed, 4 cancelled
            CREATE TABLE IF NOT EXISTS interval (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_time TEXT NOT NULL,
                planned_duration INTEGER DEFAULT 0,
                actual_duration INTEGER DEFAULT 0,
                category TEXT NOT NULL,
                state INTEGER DEFAULT 1
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Repository for SqliteRepository {
    fn create(&self, interval: &Interval) -> Result<i64, PomoError> {
        validate_durations(interval)?;
        let planned = duration_to_nanos(interval.planned_duration, interval.id)?;
        let actual = duration_to_nanos(interval.actual_duration, interval.id)?;

        let conn = self.conn();
        conn.execute(
            "
            INSERT INTO interval (start_time, planned_duration, actual_duration, category, state)
            VALUES (?, ?, ?, ?, ?)
            ",
            params![
                format_timestamp(interval.start_time),
                planned,
                actual,
                interval.category.as_str(),
                interval.state.code(),
            ],
        )
        .map_err(DbError::from)?;
        let id = conn.last_insert_rowid();
        debug!(id, category = %interval.category, "interval inserted");
        Ok(id)
    }

    fn update(&self, interval: &Interval) -> Result<(), PomoError> {
        validate_id(interval.id)?;
        validate_durations(interval)?;
        let actual = duration_to_nanos(interval.actual_duration, interval.id)?;

        let changed = self
            .conn()
            .execute(
                "UPDATE interval SET start_time = ?, actual_duration = ?, state = ? WHERE id = ?",
                params![
                    format_timestamp(interval.start_time),
                    actual,
                    interval.state.code(),
                    interval.id,
                ],
            )
            .map_err(DbError::from)?;
        if changed == 0 {
            return Err(PomoError::NotFound(interval.id));
        }
        Ok(())
    }

    fn update_if_unchanged(
        &self,
        interval: &Interval,
        expected: &Interval,
    ) -> Result<bool, PomoError> {
        validate_id(interval.id)?;
        validate_durations(interval)?;
        let actual = duration_to_nanos(interval.actual_duration, interval.id)?;
        let expected_actual = duration_to_nanos(expected.actual_duration, interval.id)?;

        let conn = self.conn();
        let changed = conn
            .execute(
                "
                UPDATE interval SET start_time = ?, actual_duration = ?, state = ?
                WHERE id = ? AND state = ? AND actual_duration = ?
                ",
                params![
                    format_timestamp(interval.start_time),
                    actual,
                    interval.state.code(),
                    interval.id,
                    expected.state.code(),
                    expected_actual,
                ],
            )
            .map_err(DbError::from)?;
        if changed > 0 {
            return Ok(true);
        }

        let exists: bool = conn
            .query_row(
                "SELECT EXISTS (SELECT 1 FROM interval WHERE id = ?)",
                [interval.id],
                |row| row.get(0),
            )
            .map_err(DbError::from)?;
        if !exists {
            return Err(PomoError::NotFound(interval.id));
        }
        debug!(id = interval.id, "interval changed by another writer");
        Ok(false)
    }

    fn by_id(&self, id: i64) -> Result<Interval, PomoError> {
        validate_id(id)?;
        let row = self
            .conn()
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?"),
                [id],
                IntervalRow::from_row,
            )
            .optional()
            .map_err(DbError::from)?;
        row.ok_or(PomoError::NotFound(id))?.into_interval()
    }

    fn last(&self) -> Result<Interval, PomoError> {
        let row = self
            .conn()
            .query_row(
                &format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT 1"),
                [],
                IntervalRow::from_row,
            )
            .optional()
            .map_err(DbError::from)?;
        row.ok_or(PomoError::NoRecords)?.into_interval()
    }

    fn breaks(&self, n: usize) -> Result<Vec<Interval>, PomoError> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let rows = {
            let conn = self.conn();
            let mut stmt = conn
                .prepare(&format!(
                    "{SELECT_COLUMNS} WHERE category IN (?, ?) ORDER BY id DESC LIMIT ?"
                ))
                .map_err(DbError::from)?;
            let rows = stmt
                .query_map(
                    params![
                        Category::ShortBreak.as_str(),
                        Category::LongBreak.as_str(),
                        limit
                    ],
                    IntervalRow::from_row,
                )
                .map_err(DbError::from)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)?
        };
        rows.into_iter().map(IntervalRow::into_interval).collect()
    }

    fn category_summary(
        &self,
        day: NaiveDate,
        filter: CategoryFilter,
    ) -> Result<Duration, PomoError> {
        let categories = filter.categories();
        let placeholders = vec!["?"; categories.len()].join(", ");
        let sql = format!(
            "
            SELECT SUM(actual_duration)
            FROM interval
            WHERE substr(start_time, 1, 10) = ?
            AND category IN ({placeholders})
            "
        );
        let date = day.format("%Y-%m-%d").to_string();
        let names = categories.iter().map(|c| c.as_str().to_string());
        let values = std::iter::once(date).chain(names);

        let total: Option<i64> = self
            .conn()
            .query_row(&sql, params_from_iter(values), |row| row.get(0))
            .map_err(DbError::from)?;
        let Some(nanos) = total else {
            return Ok(Duration::ZERO);
        };
        u64::try_from(nanos)
            .map(Duration::from_nanos)
            .map_err(|_| DbError::TotalRange { day, nanos }.into())
    }
}

fn parse_timestamp(timestamp: &str, interval_id: i64) -> Result<DateTime<FixedOffset>, DbError> {
    DateTime::parse_from_rfc3339(timestamp).map_err(|source| DbError::TimestampParse {
        interval_id,
        timestamp: timestamp.to_string(),
        source,
    })
}

fn format_timestamp(timestamp: DateTime<FixedOffset>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

fn duration_to_nanos(duration: Duration, interval_id: i64) -> Result<i64, DbError> {
    i64::try_from(duration.as_nanos()).map_err(|_| DbError::DurationRange {
        interval_id,
        value: format!("{duration:?}"),
    })
}

fn nanos_to_duration(nanos: i64, interval_id: i64) -> Result<Duration, PomoError> {
    u64::try_from(nanos)
        .map(Duration::from_nanos)
        .map_err(|_| {
            DbError::DurationRange {
                interval_id,
                value: format!("{nanos}ns"),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomo_core::repository::contract::{self, at, day, pomodoro_on, record};

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    #[test]
    fn sqlite_backend_satisfies_contract() {
        contract::run_all(|| SqliteRepository::open_in_memory().expect("open in-memory db"));
    }

    #[test]
    fn schema_matches_data_model() {
        let repo = SqliteRepository::open_in_memory().expect("open in-memory db");
        let columns = table_columns(&repo.conn(), "interval");
        assert_eq!(
            columns,
            vec![
                "id",
                "start_time",
                "planned_duration",
                "actual_duration",
                "category",
                "state",
            ]
        );
    }

    #[test]
    fn stores_durations_as_nanoseconds_and_local_offset() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let id = repo
            .create(&record(
                Category::ShortBreak,
                300,
                2,
                at(day(11), 0, 2),
                IntervalState::Running,
            ))
            .unwrap();

        let (start_time, planned, actual): (String, i64, i64) = repo
            .conn()
            .query_row(
                "SELECT start_time, planned_duration, actual_duration FROM interval WHERE id = ?",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        let (category, state): (String, i64) = repo
            .conn()
            .query_row(
                "SELECT category, state FROM interval WHERE id = ?",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(start_time, "2024-03-11T00:30:00+02:00");
        assert_eq!(planned, 300_000_000_000);
        assert_eq!(actual, 2_000_000_000);
        assert_eq!(category, "ShortBreak");
        assert_eq!(state, 1);
    }

    #[test]
    fn records_survive_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("pomo.db");

        let id = {
            let repo = SqliteRepository::open(&path).unwrap();
            repo.create(&pomodoro_on(day(1), 1500)).unwrap()
        };

        let repo = SqliteRepository::open(&path).unwrap();
        let mut expected = pomodoro_on(day(1), 1500);
        expected.id = id;
        assert_eq!(repo.by_id(id).unwrap(), expected);
        assert_eq!(repo.last().unwrap().id, id);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let first = repo.create(&pomodoro_on(day(1), 0)).unwrap();
        repo.conn()
            .execute("DELETE FROM interval WHERE id = ?", [first])
            .unwrap();
        let second = repo.create(&pomodoro_on(day(1), 0)).unwrap();
        assert!(second > first);
    }

    #[test]
    fn corrupt_rows_surface_errors() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let id = repo.create(&pomodoro_on(day(1), 0)).unwrap();

        repo.conn()
            .execute("UPDATE interval SET state = 9 WHERE id = ?", [id])
            .unwrap();
        assert!(matches!(repo.by_id(id), Err(PomoError::InvalidState(_))));

        repo.conn()
            .execute(
                "UPDATE interval SET state = 3, start_time = 'yesterday' WHERE id = ?",
                [id],
            )
            .unwrap();
        assert!(matches!(repo.last(), Err(PomoError::Storage(_))));
    }

    #[test]
    fn corrupt_total_names_the_day() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let id = repo.create(&pomodoro_on(day(1), 0)).unwrap();
        repo.conn()
            .execute(
                "UPDATE interval SET actual_duration = -5 WHERE id = ?",
                [id],
            )
            .unwrap();

        let err = repo
            .category_summary(day(1), CategoryFilter::Only(Category::Pomodoro))
            .unwrap_err();
        let source = std::error::Error::source(&err).unwrap().to_string();
        assert_eq!(source, "duration total out of range for 2024-03-01: -5ns");
    }

    #[test]
    fn conditional_update_sees_writes_from_other_connections() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("pomo.db");
        let runner = SqliteRepository::open(&path).unwrap();
        let other = SqliteRepository::open(&path).unwrap();

        let id = runner
            .create(&record(
                Category::Pomodoro,
                1500,
                60,
                at(day(4), 9, 0),
                IntervalState::Running,
            ))
            .unwrap();
        let read = runner.by_id(id).unwrap();

        let mut paused = other.by_id(id).unwrap();
        paused.state = IntervalState::Paused;
        other.update(&paused).unwrap();

        let mut ticked = read.clone();
        ticked.actual_duration = Duration::from_secs(61);
        assert!(!runner.update_if_unchanged(&ticked, &read).unwrap());
        assert_eq!(runner.by_id(id).unwrap(), paused);
    }
}
