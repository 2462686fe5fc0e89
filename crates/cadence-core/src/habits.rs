//! Habit consistency and streak tracking.
//!
//! Consistency is measured against the nominal length of the period, so a
//! day with no log counts as a day the habit was not done. How missing days
//! affect streaks is set by [`MissingDayPolicy`].

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ValidationError};
use crate::interval::local_date;
use crate::storage::{EngineConfig, IntervalStore};

/// A single day's completion record for a habit. Unique per (habit, date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitEntry {
    pub habit_id: String,
    pub date: NaiveDate,
    pub completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl HabitEntry {
    pub fn new(habit_id: impl Into<String>, date: NaiveDate, completed: bool) -> Self {
        Self {
            habit_id: habit_id.into(),
            date,
            completed,
            notes: None,
        }
    }
}

/// Trailing window a consistency report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitPeriod {
    Week,
    Month,
    Year,
}

impl HabitPeriod {
    pub fn days(&self) -> u32 {
        match self {
            HabitPeriod::Week => 7,
            HabitPeriod::Month => 30,
            HabitPeriod::Year => 365,
        }
    }
}

impl FromStr for HabitPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "week" => Ok(HabitPeriod::Week),
            "month" => Ok(HabitPeriod::Month),
            "year" => Ok(HabitPeriod::Year),
            other => Err(ValidationError::invalid(
                "period",
                format!("expected week, month or year, got '{other}'"),
            )),
        }
    }
}

impl fmt::Display for HabitPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HabitPeriod::Week => "week",
            HabitPeriod::Month => "month",
            HabitPeriod::Year => "year",
        };
        f.write_str(s)
    }
}

/// How a calendar day without any entry affects streaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDayPolicy {
    /// A day with no entry ends a streak, same as `completed = false`.
    #[default]
    BreakStreak,
    /// Only logged entries are considered; gaps between them are skipped.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub habit_id: String,
    pub period: HabitPeriod,
    /// Percentage in `[0, 100]`
    pub consistency_rate: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub completed_days: u32,
    pub total_days: u32,
}

pub struct HabitTracker {
    policy: MissingDayPolicy,
    offset: FixedOffset,
}

impl HabitTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            policy: config.habits.missing_day_policy,
            offset: config.offset(),
        }
    }

    pub fn with_policy(mut self, policy: MissingDayPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Consecutive completions counted back from the most recent entry.
    ///
    /// `entries` must be ordered most recent first. Under
    /// [`MissingDayPolicy::BreakStreak`] the streak is still alive while the
    /// latest entry is from `today` or the day before; anything older means
    /// at least one unlogged day has already broken it.
    pub fn current_streak(&self, entries: &[HabitEntry], today: NaiveDate) -> u32 {
        if self.policy == MissingDayPolicy::BreakStreak {
            if let Some(latest) = entries.first() {
                if today - latest.date > Duration::days(1) {
                    return 0;
                }
            }
        }

        let mut streak = 0;
        let mut expected: Option<NaiveDate> = None;

        for entry in entries {
            if !entry.completed {
                break;
            }
            if let (MissingDayPolicy::BreakStreak, Some(day)) = (self.policy, expected) {
                if entry.date != day {
                    break;
                }
            }
            streak += 1;
            expected = entry.date.pred_opt();
        }

        streak
    }

    /// Longest run of completions anywhere in `entries` (most recent first).
    pub fn longest_streak(&self, entries: &[HabitEntry]) -> u32 {
        let mut longest = 0;
        let mut running = 0;
        let mut previous: Option<NaiveDate> = None;

        for entry in entries.iter().rev() {
            if let (MissingDayPolicy::BreakStreak, Some(prev)) = (self.policy, previous) {
                if entry.date - prev > Duration::days(1) {
                    running = 0;
                }
            }
            if entry.completed {
                running += 1;
                longest = longest.max(running);
            } else {
                running = 0;
            }
            previous = Some(entry.date);
        }

        longest
    }

    /// Build a report from entries already limited to the window ending `today`.
    pub fn report(
        &self,
        habit_id: &str,
        period: HabitPeriod,
        entries: &[HabitEntry],
        today: NaiveDate,
    ) -> ConsistencyReport {
        let total_days = period.days();
        let completed_days = entries.iter().filter(|e| e.completed).count() as u32;

        ConsistencyReport {
            habit_id: habit_id.to_string(),
            period,
            consistency_rate: f64::from(completed_days) / f64::from(total_days) * 100.0,
            current_streak: self.current_streak(entries, today),
            longest_streak: self.longest_streak(entries),
            completed_days,
            total_days,
        }
    }

    /// Consistency over the trailing `period`, ending on today's local date.
    ///
    /// Unknown habits produce an all-zero report.
    pub fn calculate_consistency<S: IntervalStore + ?Sized>(
        &self,
        store: &S,
        habit_id: &str,
        period: HabitPeriod,
        now: DateTime<Utc>,
    ) -> Result<ConsistencyReport> {
        let today = local_date(now, self.offset);
        let from = today - Duration::days(i64::from(period.days()) - 1);
        let entries = store.habit_entries_between(habit_id, from, today)?;

        let report = self.report(habit_id, period, &entries, today);
        tracing::debug!(
            habit_id,
            %period,
            entries = entries.len(),
            rate = report.consistency_rate,
            current_streak = report.current_streak,
            "calculated habit consistency"
        );
        Ok(report)
    }
}
