//! Smart break scheduling.
//!
//! Walks a day's work intervals in start order and inserts a recovery
//! break whenever the time since the last break runs past the owner's
//! break interval.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::interval::{local_day_bounds, Interval, IntervalKind};
use crate::storage::{BreakConfig, EngineConfig, IntervalStore};

/// Title given to inserted break intervals.
pub const BREAK_TITLE: &str = "Break";

/// Upper bound for both the break interval and the break length.
pub const MAX_CADENCE_MINUTES: i64 = 24 * 60;

/// Kinds that count as work when walking a day.
const WORK_KINDS: [IntervalKind; 3] = [IntervalKind::Event, IntervalKind::Task, IntervalKind::Travel];

/// Per-user break cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakPreference {
    pub owner_id: String,
    /// Work minutes allowed before a break is due
    pub interval_minutes: i64,
    /// Length of each inserted break
    pub duration_minutes: i64,
}

impl BreakPreference {
    /// # Errors
    /// Returns a validation error unless both values lie in
    /// `1..=MAX_CADENCE_MINUTES`.
    pub fn new(
        owner_id: impl Into<String>,
        interval_minutes: i64,
        duration_minutes: i64,
    ) -> Result<Self, ValidationError> {
        for (field, value) in [("interval_minutes", interval_minutes), ("duration_minutes", duration_minutes)] {
            if !(1..=MAX_CADENCE_MINUTES).contains(&value) {
                return Err(ValidationError::invalid(
                    field,
                    format!("must be between 1 and {MAX_CADENCE_MINUTES}"),
                ));
            }
        }
        Ok(Self {
            owner_id: owner_id.into(),
            interval_minutes,
            duration_minutes,
        })
    }

    /// The configured global default for an owner with no stored preference.
    pub fn from_defaults(owner_id: impl Into<String>, defaults: &BreakConfig) -> Self {
        Self {
            owner_id: owner_id.into(),
            interval_minutes: defaults.interval_minutes,
            duration_minutes: defaults.duration_minutes,
        }
    }
}

/// Inserts breaks into a day's schedule.
pub struct BreakScheduler {
    defaults: BreakConfig,
    offset: FixedOffset,
}

impl BreakScheduler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            defaults: config.breaks.clone(),
            offset: config.offset(),
        }
    }

    /// Compute the breaks a day needs without persisting them.
    ///
    /// `events` must be the day's work intervals; they are sorted by start
    /// here. The marker `last_break_end` starts at the first event's start
    /// and only ever moves forward: to a break end, an event end, or the
    /// start of an event that follows an idle gap at least as long as a
    /// break.
    pub fn plan_breaks(&self, events: &[Interval], preference: &BreakPreference) -> Vec<Interval> {
        let mut sorted: Vec<&Interval> = events.iter().collect();
        sorted.sort_by_key(|e| e.start_time);

        let Some(first) = sorted.first() else {
            return Vec::new();
        };

        let (Some(interval), Some(duration)) = (
            Duration::try_minutes(preference.interval_minutes),
            Duration::try_minutes(preference.duration_minutes),
        ) else {
            tracing::warn!(
                owner_id = %preference.owner_id,
                interval_minutes = preference.interval_minutes,
                duration_minutes = preference.duration_minutes,
                "break preference out of range, no breaks planned"
            );
            return Vec::new();
        };
        let mut last_break_end: DateTime<Utc> = first.start_time;
        let mut breaks = Vec::new();

        for event in sorted {
            if event.start_time - last_break_end >= duration {
                last_break_end = event.start_time;
            }

            let elapsed = event.end_time - last_break_end;
            if elapsed > interval {
                let Some((start, end)) = last_break_end
                    .checked_add_signed(interval)
                    .and_then(|start| Some((start, start.checked_add_signed(duration)?)))
                else {
                    break;
                };
                // start <= end by construction, so this cannot fail
                if let Ok(brk) =
                    Interval::new(&preference.owner_id, IntervalKind::Break, BREAK_TITLE, start, end)
                {
                    breaks.push(brk.with_tags(["auto"]));
                }
                last_break_end = end;
            }
            last_break_end = last_break_end.max(event.end_time);
        }

        breaks
    }

    /// Plan and persist breaks for `owner_id` on the local `date`.
    ///
    /// Falls back to the configured default cadence when the owner has no
    /// stored preference.
    pub fn schedule_smart_breaks<S: IntervalStore + ?Sized>(
        &self,
        store: &S,
        owner_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Interval>> {
        let (day_start, day_end) = local_day_bounds(date, self.offset);
        let events = store.intervals_starting_between(owner_id, &WORK_KINDS, day_start, day_end)?;

        let preference = match store.break_preference(owner_id)? {
            Some(pref) => pref,
            None => {
                tracing::debug!(owner_id, "no break preference stored, using defaults");
                BreakPreference::from_defaults(owner_id, &self.defaults)
            }
        };

        let breaks = self.plan_breaks(&events, &preference);
        for brk in &breaks {
            store.insert_interval(brk)?;
        }

        tracing::info!(
            owner_id,
            %date,
            events = events.len(),
            breaks = breaks.len(),
            "scheduled smart breaks"
        );
        Ok(breaks)
    }
}
