//! Burnout risk assessment.
//!
//! Five signals, each normalized to `[0, 1]`, are blended with fixed
//! weights into a risk score. Only work volume and meeting density have
//! data sources today; free time, variety and sleep use a configured
//! placeholder value.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ValidationError};
use crate::interval::{local_date, Interval, IntervalKind};
use crate::storage::{BurnoutConfig, EngineConfig, IntervalStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Parse from the stored representation. Unknown values read as low.
    pub fn parse(value: &str) -> Self {
        match value {
            "high" => RiskLevel::High,
            "medium" => RiskLevel::Medium,
            "low" => RiskLevel::Low,
            other => {
                tracing::warn!(risk_level = other, "unknown risk level, reading as low");
                RiskLevel::Low
            }
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized burnout signals, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurnoutSignals {
    pub work_hours: f64,
    pub meeting_density: f64,
    pub free_time: f64,
    pub variety: f64,
    pub sleep: f64,
}

/// Stored analysis, one per (owner, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnoutAnalysisRecord {
    pub owner_id: String,
    pub date: NaiveDate,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Factor label and matching recommendation for each signal.
const WORK_HOURS_ADVICE: (&str, &str) = (
    "High volume of work events this week",
    "Delegate or defer lower-priority work and protect evenings",
);
const MEETING_ADVICE: (&str, &str) = (
    "High meeting density",
    "Decline optional meetings and block focus time between calls",
);
const FREE_TIME_ADVICE: (&str, &str) = (
    "Little unscheduled free time",
    "Reserve unscheduled blocks for rest each day",
);
const VARIETY_ADVICE: (&str, &str) = (
    "Low variety of activities",
    "Mix in non-work activities such as exercise or hobbies",
);
const SLEEP_ADVICE: (&str, &str) = (
    "Irregular sleep pattern",
    "Keep a consistent bedtime and enable wind-down reminders",
);

pub struct BurnoutAssessor {
    config: BurnoutConfig,
    offset: FixedOffset,
}

impl BurnoutAssessor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.burnout.clone(),
            offset: config.offset(),
        }
    }

    /// Derive signals from the lookback window's events.
    pub fn signals(&self, events: &[Interval]) -> BurnoutSignals {
        let keyword = self.config.meeting_keyword.to_lowercase();
        let work_events = events
            .iter()
            .filter(|e| e.has_tag(&self.config.work_tag))
            .count();
        let meetings = events
            .iter()
            .filter(|e| e.title.to_lowercase().contains(&keyword))
            .count();

        BurnoutSignals {
            work_hours: normalize(work_events as f64, self.config.work_event_cap),
            meeting_density: normalize(meetings as f64, self.config.meeting_cap),
            free_time: self.config.placeholder_signal,
            variety: self.config.placeholder_signal,
            sleep: self.config.placeholder_signal,
        }
    }

    /// Weighted blend of `signals`, clamped to `[0, 1]`.
    pub fn risk_score(&self, signals: &BurnoutSignals) -> f64 {
        let c = &self.config;
        let score = c.work_weight * signals.work_hours
            + c.meeting_weight * signals.meeting_density
            + c.free_time_weight * signals.free_time
            + c.variety_weight * signals.variety
            + c.sleep_weight * signals.sleep;
        score.clamp(0.0, 1.0)
    }

    pub fn risk_level(&self, score: f64) -> RiskLevel {
        if score < self.config.low_threshold {
            RiskLevel::Low
        } else if score < self.config.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    /// Build the analysis record for `signals` without touching the store.
    pub fn assess(&self, owner_id: &str, date: NaiveDate, signals: &BurnoutSignals) -> BurnoutAnalysisRecord {
        let risk_score = self.risk_score(signals);
        let mut factors = Vec::new();
        let mut recommendations = Vec::new();

        for (value, (factor, recommendation)) in [
            (signals.work_hours, WORK_HOURS_ADVICE),
            (signals.meeting_density, MEETING_ADVICE),
            (signals.free_time, FREE_TIME_ADVICE),
            (signals.variety, VARIETY_ADVICE),
            (signals.sleep, SLEEP_ADVICE),
        ] {
            if value > self.config.factor_threshold {
                factors.push(factor.to_string());
                recommendations.push(recommendation.to_string());
            }
        }

        BurnoutAnalysisRecord {
            owner_id: owner_id.to_string(),
            date,
            risk_score,
            risk_level: self.risk_level(risk_score),
            factors,
            recommendations,
        }
    }

    /// Analyze the trailing lookback window and upsert today's record.
    ///
    /// # Errors
    /// Returns a validation error if the lookback reaches outside the
    /// representable time range.
    pub fn analyze_burnout_risk<S: IntervalStore + ?Sized>(
        &self,
        store: &S,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<BurnoutAnalysisRecord> {
        let from = Duration::try_days(self.config.lookback_days)
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .ok_or_else(|| ValidationError::invalid("lookback_days", "lookback window out of range"))?;
        // Include events starting exactly at `now`.
        let events = store.intervals_starting_between(
            owner_id,
            &[IntervalKind::Event],
            from,
            now + Duration::seconds(1),
        )?;

        let signals = self.signals(&events);
        let record = self.assess(owner_id, local_date(now, self.offset), &signals);
        store.upsert_burnout_analysis(&record)?;

        tracing::info!(
            owner_id,
            date = %record.date,
            risk_score = record.risk_score,
            risk_level = %record.risk_level,
            "stored burnout analysis"
        );
        Ok(record)
    }

    /// Stored analyses from the last `days` local days, most recent first.
    ///
    /// # Errors
    /// Returns a validation error if the window starts before the earliest
    /// representable date.
    pub fn burnout_history<S: IntervalStore + ?Sized>(
        &self,
        store: &S,
        owner_id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<BurnoutAnalysisRecord>> {
        let today = local_date(now, self.offset);
        let from = Duration::try_days(i64::from(days.max(1)) - 1)
            .and_then(|span| today.checked_sub_signed(span))
            .ok_or_else(|| ValidationError::invalid("days", "history window out of range"))?;
        store.burnout_analyses(owner_id, from)
    }
}

fn normalize(count: f64, cap: f64) -> f64 {
    if cap <= 0.0 {
        return 1.0;
    }
    (count / cap).min(1.0)
}
