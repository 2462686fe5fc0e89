pub mod breaks;
pub mod burnout;
pub mod config;
pub mod event;
pub mod habit;
pub mod poll;
pub mod slots;
pub mod summary;
pub mod wind_down;

use cadence_core::interval::local_date;
use cadence_core::{EngineConfig, SqliteStore};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Options shared by every subcommand.
pub struct Context {
    pub owner: String,
    pub now: DateTime<Utc>,
}

impl Context {
    /// Today's date in the configured local offset.
    pub fn today(&self, config: &EngineConfig) -> NaiveDate {
        local_date(self.now, config.offset())
    }
}

/// Open the store and load the config from the data directory.
pub fn open() -> Result<(SqliteStore, EngineConfig), Box<dyn std::error::Error>> {
    let store = SqliteStore::open()?;
    let config = EngineConfig::load()?;
    Ok((store, config))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// clap value parser for RFC 3339 timestamps.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 timestamp (e.g. 2026-03-02T09:00:00Z): {e}"))
}

/// clap value parser for `YYYY-MM-DD` dates.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

/// clap value parser for `HH:MM` times.
pub fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("expected HH:MM: {e}"))
}

/// clap value parser for a `START/END` pair of RFC 3339 timestamps.
pub fn parse_span(s: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
    let (start, end) = s
        .split_once('/')
        .ok_or_else(|| format!("expected START/END, got '{s}'"))?;
    Ok((parse_datetime(start)?, parse_datetime(end)?))
}
