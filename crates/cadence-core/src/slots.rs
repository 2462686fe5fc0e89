//! Free-slot discovery and ranking.
//!
//! Finds gaps between an owner's upcoming intervals that can hold a task
//! of the requested length and ranks them with an hour-of-day rule table.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::interval::Interval;
use crate::storage::{EngineConfig, IntervalStore, SlotScoringConfig};

/// A free window between two intervals, with its time-of-day score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub score: f64,
}

impl CandidateSlot {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

pub struct SlotFinder {
    scoring: SlotScoringConfig,
    offset: FixedOffset,
}

impl SlotFinder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            scoring: config.slots.clone(),
            offset: config.offset(),
        }
    }

    /// Score for a slot starting at local `hour`. Unlisted hours score zero.
    pub fn score_hour(&self, hour: u32) -> f64 {
        let s = &self.scoring;
        let mut score = 0.0;
        if (s.morning_start_hour..=s.morning_end_hour).contains(&hour) {
            score += s.morning_bonus;
        }
        if (s.afternoon_start_hour..=s.afternoon_end_hour).contains(&hour) {
            score += s.afternoon_bonus;
        }
        if (s.lunch_start_hour..=s.lunch_end_hour).contains(&hour) {
            score -= s.lunch_penalty;
        }
        score
    }

    /// Gaps of at least `duration_minutes` between intervals, best score
    /// first, earliest start breaking ties.
    ///
    /// A gap opens at the latest end seen so far, so an interval nested in
    /// a longer one never opens a gap inside it. Only the space between
    /// intervals is considered; time before the first and after the last
    /// interval is not a candidate.
    pub fn rank_gaps(&self, intervals: &[Interval], duration_minutes: i64) -> Vec<CandidateSlot> {
        let mut sorted: Vec<&Interval> = intervals.iter().collect();
        sorted.sort_by_key(|i| i.start_time);

        let Some((first, rest)) = sorted.split_first() else {
            return Vec::new();
        };

        let mut busy_until = first.end_time;
        let mut candidates = Vec::new();
        for next in rest {
            if (next.start_time - busy_until).num_minutes() >= duration_minutes {
                candidates.push(CandidateSlot {
                    start_time: busy_until,
                    end_time: next.start_time,
                    score: self.score_hour(busy_until.with_timezone(&self.offset).hour()),
                });
            }
            busy_until = busy_until.max(next.end_time);
        }

        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.start_time.cmp(&b.start_time))
        });
        candidates
    }

    /// Ranked free slots among the owner's intervals starting from `now`.
    ///
    /// `task_type` is recorded for tracing only; it does not change scoring.
    ///
    /// # Errors
    /// Returns a validation error for a non-positive duration.
    pub fn suggest_optimal_time<S: IntervalStore + ?Sized>(
        &self,
        store: &S,
        owner_id: &str,
        task_type: Option<&str>,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<CandidateSlot>> {
        if duration_minutes <= 0 {
            return Err(ValidationError::invalid("duration_minutes", "must be positive").into());
        }

        let intervals = store.intervals_starting_from(owner_id, now)?;
        let candidates = self.rank_gaps(&intervals, duration_minutes);

        tracing::debug!(
            owner_id,
            task_type = task_type.unwrap_or("general"),
            duration_minutes,
            intervals = intervals.len(),
            candidates = candidates.len(),
            "ranked free slots"
        );
        Ok(candidates)
    }

    /// Common slot for all participants.
    ///
    /// Availability intersection across participants is not implemented, so
    /// this always returns `None` after validating its input.
    ///
    /// # Errors
    /// Returns a validation error for a non-positive duration.
    pub fn find_optimal_meeting_time(
        &self,
        participant_ids: &[String],
        duration_minutes: i64,
    ) -> Result<Option<CandidateSlot>> {
        if duration_minutes <= 0 {
            return Err(ValidationError::invalid("duration_minutes", "must be positive").into());
        }

        tracing::debug!(
            participants = participant_ids.len(),
            duration_minutes,
            "availability intersection not supported, no meeting slot proposed"
        );
        Ok(None)
    }
}
