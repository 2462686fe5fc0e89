mod config;
pub mod migrations;
pub mod sqlite;

pub use config::{
    BreakConfig, BurnoutConfig, EngineConfig, HabitConfig, SlotScoringConfig, SummaryConfig,
    WindDownConfig,
};
pub use sqlite::SqliteStore;

use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;

use crate::breaks::BreakPreference;
use crate::burnout::BurnoutAnalysisRecord;
use crate::error::Result;
use crate::habits::HabitEntry;
use crate::interval::{Interval, IntervalKind};
use crate::polls::{PollVote, SchedulingPoll};
use crate::summary::DailySummaryRecord;
use crate::wind_down::WindDownSettings;

/// Returns `$CADENCE_DATA_DIR` if set, otherwise `~/.config/cadence/`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("CADENCE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("cadence"),
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Interval store adapter.
///
/// Every calculator reads its inputs and writes its derived records through
/// this trait, so the engine never depends on a concrete backend. Reads of
/// missing rows return `Ok(None)` or an empty vector; only backend failures
/// are errors.
pub trait IntervalStore {
    /// Intervals owned by `owner_id` whose start lies in `[from, to)`,
    /// restricted to `kinds`, ordered by start time.
    fn intervals_starting_between(
        &self,
        owner_id: &str,
        kinds: &[IntervalKind],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Interval>>;

    /// All intervals owned by `owner_id` starting at or after `from`,
    /// ordered by start time.
    fn intervals_starting_from(&self, owner_id: &str, from: DateTime<Utc>) -> Result<Vec<Interval>>;

    fn insert_interval(&self, interval: &Interval) -> Result<()>;

    fn break_preference(&self, owner_id: &str) -> Result<Option<BreakPreference>>;

    fn wind_down_settings(&self, owner_id: &str) -> Result<Option<WindDownSettings>>;

    /// Entries for `habit_id` dated within `[from, to]`, most recent first.
    fn habit_entries_between(
        &self,
        habit_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HabitEntry>>;

    fn insert_poll(&self, poll: &SchedulingPoll) -> Result<()>;

    fn poll(&self, poll_id: &str) -> Result<Option<SchedulingPoll>>;

    /// Insert or replace the vote keyed by `(poll_id, voter_id)`.
    fn upsert_vote(&self, vote: &PollVote) -> Result<()>;

    fn votes(&self, poll_id: &str) -> Result<Vec<PollVote>>;

    /// Insert or replace the analysis keyed by `(owner_id, date)`.
    fn upsert_burnout_analysis(&self, record: &BurnoutAnalysisRecord) -> Result<()>;

    /// Analyses for `owner_id` dated on or after `from`, most recent first.
    fn burnout_analyses(&self, owner_id: &str, from: NaiveDate) -> Result<Vec<BurnoutAnalysisRecord>>;

    /// Insert or replace the summary keyed by `(owner_id, date)`.
    fn upsert_daily_summary(&self, record: &DailySummaryRecord) -> Result<()>;

    fn daily_summary(&self, owner_id: &str, date: NaiveDate) -> Result<Option<DailySummaryRecord>>;
}
