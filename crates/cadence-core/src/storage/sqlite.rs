//! SQLite implementation of the interval store.
//!
//! Timestamps are stored as RFC 3339 UTC text at second precision, so
//! string order is chronological order and range queries can compare
//! columns directly. List-valued fields are stored as JSON text.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;

use super::{data_dir, migrations, IntervalStore};
use crate::breaks::BreakPreference;
use crate::burnout::{BurnoutAnalysisRecord, RiskLevel};
use crate::error::{DatabaseError, Result};
use crate::habits::HabitEntry;
use crate::interval::{Interval, IntervalKind};
use crate::polls::{PollVote, SchedulingPoll};
use crate::summary::DailySummaryRecord;
use crate::wind_down::WindDownSettings;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

const INTERVAL_COLUMNS: &str =
    "id, owner_id, kind, title, start_time, end_time, location, tags, priority, protected";

// === Helper Functions ===

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn get_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn get_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn get_json<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

/// Build an Interval from a row selected with `INTERVAL_COLUMNS`.
fn row_to_interval(row: &Row) -> rusqlite::Result<Interval> {
    let kind: String = row.get(2)?;
    Ok(Interval {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind: IntervalKind::parse(&kind),
        title: row.get(3)?,
        start_time: get_timestamp(row, 4)?,
        end_time: get_timestamp(row, 5)?,
        location: row.get(6)?,
        tags: get_json(row, 7)?,
        priority: row.get(8)?,
        protected: row.get(9)?,
    })
}

fn row_to_burnout(row: &Row) -> rusqlite::Result<BurnoutAnalysisRecord> {
    let level: String = row.get(3)?;
    Ok(BurnoutAnalysisRecord {
        owner_id: row.get(0)?,
        date: get_date(row, 1)?,
        risk_score: row.get(2)?,
        risk_level: RiskLevel::parse(&level),
        factors: get_json(row, 4)?,
        recommendations: get_json(row, 5)?,
    })
}

fn row_to_poll(row: &Row) -> rusqlite::Result<SchedulingPoll> {
    Ok(SchedulingPoll {
        id: row.get(0)?,
        organizer_id: row.get(1)?,
        title: row.get(2)?,
        time_slots: get_json(row, 3)?,
        duration_minutes: row.get(4)?,
        created_at: get_timestamp(row, 5)?,
    })
}

/// SQLite-backed [`IntervalStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the store at `<data dir>/cadence.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("cadence.db"))
    }

    /// Open the store at an explicit path, creating it if needed.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Insert or replace the owner's break preference.
    pub fn set_break_preference(&self, pref: &BreakPreference) -> Result<()> {
        self.conn.execute(
            "INSERT INTO break_preferences (owner_id, interval_minutes, duration_minutes)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(owner_id) DO UPDATE SET
                interval_minutes = excluded.interval_minutes,
                duration_minutes = excluded.duration_minutes",
            params![pref.owner_id, pref.interval_minutes, pref.duration_minutes],
        )?;
        Ok(())
    }

    /// Insert or replace the owner's wind-down settings.
    pub fn set_wind_down_settings(&self, settings: &WindDownSettings) -> Result<()> {
        self.conn.execute(
            "INSERT INTO wind_down_settings (owner_id, sleep_time, wind_down_duration_minutes, is_active)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(owner_id) DO UPDATE SET
                sleep_time = excluded.sleep_time,
                wind_down_duration_minutes = excluded.wind_down_duration_minutes,
                is_active = excluded.is_active",
            params![
                settings.owner_id,
                settings.sleep_time.format(TIME_FORMAT).to_string(),
                settings.wind_down_duration_minutes,
                settings.is_active,
            ],
        )?;
        Ok(())
    }

    /// Record a habit entry. Re-logging the same day overwrites it.
    pub fn log_habit_entry(&self, entry: &HabitEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO habit_entries (habit_id, date, completed, notes)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(habit_id, date) DO UPDATE SET
                completed = excluded.completed,
                notes = excluded.notes",
            params![entry.habit_id, format_date(&entry.date), entry.completed, entry.notes],
        )?;
        Ok(())
    }

    /// Polls, newest first, optionally restricted to one organizer.
    pub fn list_polls(&self, organizer_id: Option<&str>) -> Result<Vec<SchedulingPoll>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, organizer_id, title, time_slots, duration_minutes, created_at
             FROM polls
             WHERE ?1 IS NULL OR organizer_id = ?1
             ORDER BY created_at DESC, id",
        )?;
        let polls = stmt
            .query_map(params![organizer_id], row_to_poll)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(polls)
    }

    /// Fetch one interval by id.
    pub fn interval(&self, id: &str) -> Result<Option<Interval>> {
        let interval = self
            .conn
            .query_row(
                &format!("SELECT {INTERVAL_COLUMNS} FROM intervals WHERE id = ?1"),
                params![id],
                row_to_interval,
            )
            .optional()?;
        Ok(interval)
    }
}

impl IntervalStore for SqliteStore {
    fn intervals_starting_between(
        &self,
        owner_id: &str,
        kinds: &[IntervalKind],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Interval>> {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (0..kinds.len()).map(|i| format!("?{}", i + 4)).collect();
        let query = format!(
            "SELECT {INTERVAL_COLUMNS} FROM intervals
             WHERE owner_id = ?1 AND start_time >= ?2 AND start_time < ?3 AND kind IN ({})
             ORDER BY start_time, id",
            placeholders.join(", ")
        );

        let mut values = vec![
            owner_id.to_string(),
            format_timestamp(&from),
            format_timestamp(&to),
        ];
        values.extend(kinds.iter().map(|k| k.as_str().to_string()));

        let mut stmt = self.conn.prepare(&query)?;
        let intervals = stmt
            .query_map(params_from_iter(values.iter()), row_to_interval)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(intervals)
    }

    fn intervals_starting_from(&self, owner_id: &str, from: DateTime<Utc>) -> Result<Vec<Interval>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INTERVAL_COLUMNS} FROM intervals
             WHERE owner_id = ?1 AND start_time >= ?2
             ORDER BY start_time, id"
        ))?;
        let intervals = stmt
            .query_map(params![owner_id, format_timestamp(&from)], row_to_interval)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(intervals)
    }

    fn insert_interval(&self, interval: &Interval) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO intervals ({INTERVAL_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                interval.id,
                interval.owner_id,
                interval.kind.as_str(),
                interval.title,
                format_timestamp(&interval.start_time),
                format_timestamp(&interval.end_time),
                interval.location,
                serde_json::to_string(&interval.tags)?,
                interval.priority,
                interval.protected,
            ],
        )?;
        Ok(())
    }

    fn break_preference(&self, owner_id: &str) -> Result<Option<BreakPreference>> {
        let pref = self
            .conn
            .query_row(
                "SELECT owner_id, interval_minutes, duration_minutes
                 FROM break_preferences WHERE owner_id = ?1",
                params![owner_id],
                |row| {
                    Ok(BreakPreference {
                        owner_id: row.get(0)?,
                        interval_minutes: row.get(1)?,
                        duration_minutes: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(pref)
    }

    fn wind_down_settings(&self, owner_id: &str) -> Result<Option<WindDownSettings>> {
        let settings = self
            .conn
            .query_row(
                "SELECT owner_id, sleep_time, wind_down_duration_minutes, is_active
                 FROM wind_down_settings WHERE owner_id = ?1",
                params![owner_id],
                |row| {
                    let raw: String = row.get(1)?;
                    let sleep_time = NaiveTime::parse_from_str(&raw, TIME_FORMAT)
                        .map_err(|e| conversion_error(1, e))?;
                    Ok(WindDownSettings {
                        owner_id: row.get(0)?,
                        sleep_time,
                        wind_down_duration_minutes: row.get(2)?,
                        is_active: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(settings)
    }

    fn habit_entries_between(
        &self,
        habit_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HabitEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT habit_id, date, completed, notes FROM habit_entries
             WHERE habit_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date DESC",
        )?;
        let entries = stmt
            .query_map(params![habit_id, format_date(&from), format_date(&to)], |row| {
                Ok(HabitEntry {
                    habit_id: row.get(0)?,
                    date: get_date(row, 1)?,
                    completed: row.get(2)?,
                    notes: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn insert_poll(&self, poll: &SchedulingPoll) -> Result<()> {
        self.conn.execute(
            "INSERT INTO polls (id, organizer_id, title, time_slots, duration_minutes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                poll.id,
                poll.organizer_id,
                poll.title,
                serde_json::to_string(&poll.time_slots)?,
                poll.duration_minutes,
                format_timestamp(&poll.created_at),
            ],
        )?;
        Ok(())
    }

    fn poll(&self, poll_id: &str) -> Result<Option<SchedulingPoll>> {
        let poll = self
            .conn
            .query_row(
                "SELECT id, organizer_id, title, time_slots, duration_minutes, created_at
                 FROM polls WHERE id = ?1",
                params![poll_id],
                row_to_poll,
            )
            .optional()?;
        Ok(poll)
    }

    fn upsert_vote(&self, vote: &PollVote) -> Result<()> {
        self.conn.execute(
            "INSERT INTO poll_votes (poll_id, voter_id, preferred_slots, voted_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(poll_id, voter_id) DO UPDATE SET
                preferred_slots = excluded.preferred_slots,
                voted_at = excluded.voted_at",
            params![
                vote.poll_id,
                vote.voter_id,
                serde_json::to_string(&vote.preferred_slots)?,
                format_timestamp(&vote.voted_at),
            ],
        )?;
        Ok(())
    }

    fn votes(&self, poll_id: &str) -> Result<Vec<PollVote>> {
        let mut stmt = self.conn.prepare(
            "SELECT poll_id, voter_id, preferred_slots, voted_at FROM poll_votes
             WHERE poll_id = ?1 ORDER BY voter_id",
        )?;
        let votes = stmt
            .query_map(params![poll_id], |row| {
                Ok(PollVote {
                    poll_id: row.get(0)?,
                    voter_id: row.get(1)?,
                    preferred_slots: get_json(row, 2)?,
                    voted_at: get_timestamp(row, 3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(votes)
    }

    fn upsert_burnout_analysis(&self, record: &BurnoutAnalysisRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO burnout_analyses
                (owner_id, date, risk_score, risk_level, factors, recommendations)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(owner_id, date) DO UPDATE SET
                risk_score = excluded.risk_score,
                risk_level = excluded.risk_level,
                factors = excluded.factors,
                recommendations = excluded.recommendations",
            params![
                record.owner_id,
                format_date(&record.date),
                record.risk_score,
                record.risk_level.as_str(),
                serde_json::to_string(&record.factors)?,
                serde_json::to_string(&record.recommendations)?,
            ],
        )?;
        Ok(())
    }

    fn burnout_analyses(&self, owner_id: &str, from: NaiveDate) -> Result<Vec<BurnoutAnalysisRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT owner_id, date, risk_score, risk_level, factors, recommendations
             FROM burnout_analyses
             WHERE owner_id = ?1 AND date >= ?2
             ORDER BY date DESC",
        )?;
        let records = stmt
            .query_map(params![owner_id, format_date(&from)], row_to_burnout)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn upsert_daily_summary(&self, record: &DailySummaryRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO daily_summaries (owner_id, date, content, stats)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(owner_id, date) DO UPDATE SET
                content = excluded.content,
                stats = excluded.stats",
            params![
                record.owner_id,
                format_date(&record.date),
                record.content,
                serde_json::to_string(&record.stats)?,
            ],
        )?;
        Ok(())
    }

    fn daily_summary(&self, owner_id: &str, date: NaiveDate) -> Result<Option<DailySummaryRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT owner_id, date, content, stats FROM daily_summaries
                 WHERE owner_id = ?1 AND date = ?2",
                params![owner_id, format_date(&date)],
                |row| {
                    Ok(DailySummaryRecord {
                        owner_id: row.get(0)?,
                        date: get_date(row, 1)?,
                        content: row.get(2)?,
                        stats: get_json(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::SummaryStats;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn count(store: &SqliteStore, table: &str) -> i64 {
        store
            .conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn interval_round_trip() {
        let store = SqliteStore::open_memory().unwrap();
        let interval = Interval::new("u1", IntervalKind::Task, "Report", at(9, 0), at(10, 0))
            .unwrap()
            .with_location("Office")
            .with_tags(["work", "q1"])
            .with_priority(4)
            .protected();
        store.insert_interval(&interval).unwrap();

        assert_eq!(store.interval(&interval.id).unwrap(), Some(interval));
        assert_eq!(store.interval("missing").unwrap(), None);
    }

    #[test]
    fn range_query_is_half_open_and_filters_kind_and_owner() {
        let store = SqliteStore::open_memory().unwrap();
        let inside = Interval::new("u1", IntervalKind::Event, "a", at(9, 0), at(10, 0)).unwrap();
        let at_end = Interval::new("u1", IntervalKind::Event, "b", at(12, 0), at(13, 0)).unwrap();
        let task = Interval::new("u1", IntervalKind::Task, "c", at(9, 30), at(9, 30)).unwrap();
        let other = Interval::new("u2", IntervalKind::Event, "d", at(9, 0), at(10, 0)).unwrap();
        for i in [&inside, &at_end, &task, &other] {
            store.insert_interval(i).unwrap();
        }

        let events = store
            .intervals_starting_between("u1", &[IntervalKind::Event], at(9, 0), at(12, 0))
            .unwrap();
        assert_eq!(events, vec![inside.clone()]);

        let both = store
            .intervals_starting_between("u1", &[IntervalKind::Event, IntervalKind::Task], at(0, 0), at(23, 0))
            .unwrap();
        let titles: Vec<_> = both.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c", "b"]);

        assert!(store
            .intervals_starting_between("u1", &[], at(0, 0), at(23, 0))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn preferences_upsert_in_place() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(store.break_preference("u1").unwrap(), None);

        store.set_break_preference(&BreakPreference::new("u1", 90, 15).unwrap()).unwrap();
        store.set_break_preference(&BreakPreference::new("u1", 50, 10).unwrap()).unwrap();

        let pref = store.break_preference("u1").unwrap().unwrap();
        assert_eq!(pref.interval_minutes, 50);
        assert_eq!(count(&store, "break_preferences"), 1);
    }

    #[test]
    fn wind_down_settings_round_trip() {
        let store = SqliteStore::open_memory().unwrap();
        let settings =
            WindDownSettings::new("u1", NaiveTime::from_hms_opt(22, 30, 0).unwrap(), 45).unwrap();
        store.set_wind_down_settings(&settings).unwrap();
        assert_eq!(store.wind_down_settings("u1").unwrap(), Some(settings));
    }

    #[test]
    fn habit_entry_same_day_overwrites() {
        let store = SqliteStore::open_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        store.log_habit_entry(&HabitEntry::new("h1", date, false)).unwrap();
        store.log_habit_entry(&HabitEntry::new("h1", date, true)).unwrap();

        let entries = store.habit_entries_between("h1", date, date).unwrap();
        assert_eq!(entries, vec![HabitEntry::new("h1", date, true)]);
    }

    #[test]
    fn derived_records_upsert_to_one_row() {
        let store = SqliteStore::open_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        let analysis = BurnoutAnalysisRecord {
            owner_id: "u1".into(),
            date,
            risk_score: 0.4,
            risk_level: RiskLevel::Medium,
            factors: vec![],
            recommendations: vec![],
        };
        store.upsert_burnout_analysis(&analysis).unwrap();
        store.upsert_burnout_analysis(&analysis).unwrap();
        assert_eq!(count(&store, "burnout_analyses"), 1);

        let summary = DailySummaryRecord {
            owner_id: "u1".into(),
            date,
            content: "hello".into(),
            stats: SummaryStats::default(),
        };
        store.upsert_daily_summary(&summary).unwrap();
        store.upsert_daily_summary(&summary).unwrap();
        assert_eq!(count(&store, "daily_summaries"), 1);
        assert_eq!(store.daily_summary("u1", date).unwrap(), Some(summary));

        let vote = PollVote {
            poll_id: "p1".into(),
            voter_id: "v1".into(),
            preferred_slots: vec![1, 2],
            voted_at: at(9, 0),
        };
        store.upsert_vote(&vote).unwrap();
        store.upsert_vote(&vote).unwrap();
        assert_eq!(store.votes("p1").unwrap(), vec![vote]);
    }

    #[test]
    fn list_polls_filters_by_organizer() {
        let store = SqliteStore::open_memory().unwrap();
        for (id, organizer, hour) in [("p1", "alice", 8), ("p2", "bob", 9)] {
            store
                .insert_poll(&SchedulingPoll {
                    id: id.into(),
                    organizer_id: organizer.into(),
                    title: "Sync".into(),
                    time_slots: vec![],
                    duration_minutes: 30,
                    created_at: at(hour, 0),
                })
                .unwrap();
        }

        assert_eq!(store.list_polls(None).unwrap().len(), 2);
        let alice = store.list_polls(Some("alice")).unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].id, "p1");
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cadence.db");
        {
            let store = SqliteStore::open_at(&path).unwrap();
            store
                .log_habit_entry(&HabitEntry::new("h1", NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), true))
                .unwrap();
        }
        let reopened = SqliteStore::open_at(&path).unwrap();
        assert_eq!(count(&reopened, "habit_entries"), 1);
    }
}
