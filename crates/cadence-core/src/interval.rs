//! Time-boxed records shared by every calculator.
//!
//! An [`Interval`] is the one primitive the engine reasons about: calendar
//! events, task due-windows, inserted breaks and travel blocks all share
//! the same shape and differ only by [`IntervalKind`].

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// What an interval represents on the owner's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    Event,
    Task,
    Break,
    Travel,
}

impl IntervalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalKind::Event => "event",
            IntervalKind::Task => "task",
            IntervalKind::Break => "break",
            IntervalKind::Travel => "travel",
        }
    }

    /// Parse from the stored representation. Unknown values read as events.
    pub fn parse(value: &str) -> Self {
        match value {
            "task" => IntervalKind::Task,
            "break" => IntervalKind::Break,
            "travel" => IntervalKind::Travel,
            "event" => IntervalKind::Event,
            other => {
                tracing::warn!(kind = other, "unknown interval kind, reading as event");
                IntervalKind::Event
            }
        }
    }

    pub const ALL: [IntervalKind; 4] = [
        IntervalKind::Event,
        IntervalKind::Task,
        IntervalKind::Break,
        IntervalKind::Travel,
    ];
}

/// A time-boxed record owned by one user. `start_time <= end_time` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub id: String,
    pub owner_id: String,
    pub kind: IntervalKind,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Task priority, higher is more important.
    #[serde(default)]
    pub priority: Option<i32>,
    /// Exempt from wind-down enforcement.
    #[serde(default)]
    pub protected: bool,
}

impl Interval {
    /// Create a new interval with a fresh id.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidTimeRange`] if `end_time` precedes
    /// `start_time`.
    pub fn new(
        owner_id: impl Into<String>,
        kind: IntervalKind,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if end_time < start_time {
            return Err(ValidationError::InvalidTimeRange {
                start: start_time,
                end: end_time,
            });
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            kind,
            title: title.into(),
            start_time,
            end_time,
            location: None,
            tags: Vec::new(),
            priority: None,
            protected: false,
        })
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    /// Get duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Check if this interval overlaps with a time range
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    /// Case-insensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Start of `date` and start of the following day in local time, as UTC instants.
pub fn local_day_bounds(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(date, offset);
    (start, start + Duration::days(1))
}

/// The calendar date of `instant` in local time.
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    // Fixed offsets have no gaps or folds, so the mapping is always single.
    offset
        .from_local_datetime(&date.and_time(chrono::NaiveTime::MIN))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    #[test]
    fn new_rejects_inverted_range() {
        let err = Interval::new("u1", IntervalKind::Event, "x", at(11, 0), at(10, 0)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTimeRange { .. }));
    }

    #[test]
    fn zero_length_interval_is_allowed() {
        let i = Interval::new("u1", IntervalKind::Task, "due", at(10, 0), at(10, 0)).unwrap();
        assert_eq!(i.duration_minutes(), 0);
    }

    #[test]
    fn overlap_is_half_open() {
        let i = Interval::new("u1", IntervalKind::Event, "x", at(10, 0), at(11, 0)).unwrap();
        assert!(i.overlaps(at(10, 30), at(12, 0)));
        assert!(!i.overlaps(at(11, 0), at(12, 0)));
        assert!(!i.overlaps(at(9, 0), at(10, 0)));
    }

    #[test]
    fn kind_round_trips_through_storage_string() {
        for kind in IntervalKind::ALL {
            assert_eq!(IntervalKind::parse(kind.as_str()), kind);
        }
    }

    #[test]
    fn unknown_stored_kind_reads_as_event() {
        assert_eq!(IntervalKind::parse("meeting"), IntervalKind::Event);
        assert_eq!(IntervalKind::parse(""), IntervalKind::Event);
    }

    #[test]
    fn tags_match_case_insensitively() {
        let i = Interval::new("u1", IntervalKind::Event, "x", at(10, 0), at(11, 0))
            .unwrap()
            .with_tags(["Work"]);
        assert!(i.has_tag("work"));
        assert!(!i.has_tag("personal"));
    }

    #[test]
    fn local_day_bounds_shift_by_offset() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let (start, end) = local_day_bounds(date, offset);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 1, 22, 0, 0).unwrap());
        assert_eq!(end - start, Duration::days(1));
        assert_eq!(local_date(start, offset), date);
    }
}
