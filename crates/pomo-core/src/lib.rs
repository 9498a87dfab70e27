//! Core domain logic for the pomodoro tracker.
//!
//! This crate contains:
//! - Intervals: the record of one work or break session
//! - Repository: storage-agnostic persistence, with an in-memory backend
//! - Summary: per-day and per-range usage aggregation
//! - Timer: the lifecycle that ticks a session to completion

mod error;
mod interval;
pub mod repository;
pub mod summary;
pub mod timer;

pub use error::{PomoError, StorageSource};
pub use interval::{Category, CategoryFilter, Interval, IntervalState};
pub use repository::{MemoryRepository, Repository};
pub use summary::{DailySummary, LineSeries, RangeSummary, daily_summary, range_summary};
pub use timer::{Callbacks, IntervalObserver, Timer, TimerConfig, TimerEvent};
