//! Pre-sleep wind-down enforcement.
//!
//! Flags events that start inside the protected window before the owner's
//! sleep time and proposes an earlier start for each. Advisory only: the
//! flagged events are never modified.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::interval::{local_date, Interval, IntervalKind};
use crate::storage::{EngineConfig, IntervalStore, WindDownConfig};

/// Longest wind-down window and reschedule lead, in minutes.
const MAX_SPAN_MINUTES: i64 = 24 * 60;

/// Rationale attached to every reschedule suggestion.
pub const RESCHEDULE_REASON: &str = "Moved earlier to protect your wind-down time before sleep";

/// Per-user wind-down settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindDownSettings {
    pub owner_id: String,
    /// Local time of day the owner goes to sleep
    pub sleep_time: NaiveTime,
    pub wind_down_duration_minutes: i64,
    pub is_active: bool,
}

impl WindDownSettings {
    /// # Errors
    /// Returns a validation error if the duration is negative or longer than a day.
    pub fn new(
        owner_id: impl Into<String>,
        sleep_time: NaiveTime,
        wind_down_duration_minutes: i64,
    ) -> Result<Self, ValidationError> {
        if !(0..=MAX_SPAN_MINUTES).contains(&wind_down_duration_minutes) {
            return Err(ValidationError::invalid(
                "wind_down_duration_minutes",
                "must be between 0 and 1440",
            ));
        }
        Ok(Self {
            owner_id: owner_id.into(),
            sleep_time,
            wind_down_duration_minutes,
            is_active: true,
        })
    }
}

/// A proposed new start time for an event inside the wind-down window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleSuggestion {
    pub event_id: String,
    pub title: String,
    pub original_start: DateTime<Utc>,
    pub suggested_start: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindDownReport {
    pub violations: Vec<Interval>,
    pub suggestions: Vec<RescheduleSuggestion>,
}

/// The protected window for one night, as UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindDownWindow {
    pub start: DateTime<Utc>,
    pub sleep: DateTime<Utc>,
}

impl WindDownWindow {
    /// Inclusive at both ends.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.sleep
    }
}

pub struct WindDownEnforcer {
    config: WindDownConfig,
    offset: FixedOffset,
}

impl WindDownEnforcer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.wind_down.clone(),
            offset: config.offset(),
        }
    }

    /// Window for the local `date`: sleep time anchored to that date, minus
    /// the wind-down duration. Stored durations outside a day are clamped.
    pub fn window(&self, settings: &WindDownSettings, date: NaiveDate) -> WindDownWindow {
        let local_sleep = date.and_time(settings.sleep_time);
        let sleep = self
            .offset
            .from_local_datetime(&local_sleep)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| local_sleep.and_utc());
        WindDownWindow {
            start: sleep - clamped_minutes(settings.wind_down_duration_minutes),
            sleep,
        }
    }

    /// Flag unprotected events starting inside `window`.
    pub fn evaluate(&self, window: &WindDownWindow, events: &[Interval]) -> WindDownReport {
        let lead = clamped_minutes(self.config.reschedule_lead_minutes);
        let mut report = WindDownReport::default();

        for event in events {
            if event.protected || !window.contains(event.start_time) {
                continue;
            }
            report.suggestions.push(RescheduleSuggestion {
                event_id: event.id.clone(),
                title: event.title.clone(),
                original_start: event.start_time,
                suggested_start: window.start - lead,
                reason: RESCHEDULE_REASON.to_string(),
            });
            report.violations.push(event.clone());
        }

        report
    }

    /// Check tonight's wind-down window for `owner_id`.
    ///
    /// Missing or inactive settings yield an empty report.
    pub fn enforce_wind_down_rules<S: IntervalStore + ?Sized>(
        &self,
        store: &S,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<WindDownReport> {
        let settings = match store.wind_down_settings(owner_id)? {
            Some(s) if s.is_active => s,
            _ => {
                tracing::debug!(owner_id, "wind-down inactive or not configured");
                return Ok(WindDownReport::default());
            }
        };

        let window = self.window(&settings, local_date(now, self.offset));
        // Stored timestamps have second precision; widen by one second so an
        // event starting exactly at sleep time is included.
        let events = store.intervals_starting_between(
            owner_id,
            &[IntervalKind::Event],
            window.start,
            window.sleep + Duration::seconds(1),
        )?;

        let report = self.evaluate(&window, &events);
        tracing::debug!(
            owner_id,
            window_start = %window.start,
            sleep = %window.sleep,
            violations = report.violations.len(),
            "evaluated wind-down window"
        );
        Ok(report)
    }
}

fn clamped_minutes(minutes: i64) -> Duration {
    let clamped = minutes.clamp(0, MAX_SPAN_MINUTES);
    if clamped != minutes {
        tracing::warn!(minutes, clamped, "wind-down span out of range, clamping");
    }
    Duration::minutes(clamped)
}
