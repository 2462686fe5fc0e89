//! TOML-based engine configuration.
//!
//! Holds the documented defaults every calculator falls back to:
//! - Local-time offset used for day boundaries and hour-of-day rules
//! - Default break cadence for users without a stored preference
//! - Slot scoring table
//! - Burnout weights, caps and level thresholds
//! - Wind-down reschedule lead time
//! - Habit missing-day policy and summary conflict detection mode
//!
//! Configuration is stored at `<data dir>/config.toml`.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::breaks::MAX_CADENCE_MINUTES;
use crate::error::{ConfigError, CoreError, Result};
use crate::habits::MissingDayPolicy;
use crate::summary::ConflictDetection;

/// Default break cadence applied when a user has no stored preference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakConfig {
    #[serde(default = "default_break_interval")]
    pub interval_minutes: i64,
    #[serde(default = "default_break_duration")]
    pub duration_minutes: i64,
}

/// Hour-of-day scoring table for candidate slots. Hour ranges are inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotScoringConfig {
    #[serde(default = "default_morning_start")]
    pub morning_start_hour: u32,
    #[serde(default = "default_morning_end")]
    pub morning_end_hour: u32,
    #[serde(default = "default_morning_bonus")]
    pub morning_bonus: f64,
    #[serde(default = "default_afternoon_start")]
    pub afternoon_start_hour: u32,
    #[serde(default = "default_afternoon_end")]
    pub afternoon_end_hour: u32,
    #[serde(default = "default_afternoon_bonus")]
    pub afternoon_bonus: f64,
    #[serde(default = "default_lunch_start")]
    pub lunch_start_hour: u32,
    #[serde(default = "default_lunch_end")]
    pub lunch_end_hour: u32,
    /// Subtracted from the score, so a positive value is a penalty.
    #[serde(default = "default_lunch_penalty")]
    pub lunch_penalty: f64,
}

/// Burnout signal weights, normalization caps and level thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BurnoutConfig {
    #[serde(default = "default_work_weight")]
    pub work_weight: f64,
    #[serde(default = "default_meeting_weight")]
    pub meeting_weight: f64,
    #[serde(default = "default_free_time_weight")]
    pub free_time_weight: f64,
    #[serde(default = "default_variety_weight")]
    pub variety_weight: f64,
    #[serde(default = "default_sleep_weight")]
    pub sleep_weight: f64,
    /// Work-tagged events per lookback window that saturate the work signal.
    #[serde(default = "default_work_event_cap")]
    pub work_event_cap: f64,
    /// Meetings per lookback window that saturate the meeting signal.
    #[serde(default = "default_meeting_cap")]
    pub meeting_cap: f64,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_work_tag")]
    pub work_tag: String,
    #[serde(default = "default_meeting_keyword")]
    pub meeting_keyword: String,
    /// Value used for signals that have no data source yet.
    #[serde(default = "default_placeholder_signal")]
    pub placeholder_signal: f64,
    #[serde(default = "default_factor_threshold")]
    pub factor_threshold: f64,
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindDownConfig {
    /// How far before the wind-down start a violating event is moved.
    #[serde(default = "default_reschedule_lead")]
    pub reschedule_lead_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HabitConfig {
    #[serde(default)]
    pub missing_day_policy: MissingDayPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SummaryConfig {
    #[serde(default)]
    pub conflict_detection: ConflictDetection,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Offset from UTC, in minutes, that defines the user's local day.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub breaks: BreakConfig,
    #[serde(default)]
    pub slots: SlotScoringConfig,
    #[serde(default)]
    pub burnout: BurnoutConfig,
    #[serde(default)]
    pub wind_down: WindDownConfig,
    #[serde(default)]
    pub habits: HabitConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

// Default functions
fn default_break_interval() -> i64 {
    90
}
fn default_break_duration() -> i64 {
    15
}
fn default_morning_start() -> u32 {
    9
}
fn default_morning_end() -> u32 {
    11
}
fn default_morning_bonus() -> f64 {
    10.0
}
fn default_afternoon_start() -> u32 {
    14
}
fn default_afternoon_end() -> u32 {
    16
}
fn default_afternoon_bonus() -> f64 {
    5.0
}
fn default_lunch_start() -> u32 {
    12
}
fn default_lunch_end() -> u32 {
    13
}
fn default_lunch_penalty() -> f64 {
    5.0
}
fn default_work_weight() -> f64 {
    0.30
}
fn default_meeting_weight() -> f64 {
    0.25
}
fn default_free_time_weight() -> f64 {
    0.20
}
fn default_variety_weight() -> f64 {
    0.15
}
fn default_sleep_weight() -> f64 {
    0.10
}
fn default_work_event_cap() -> f64 {
    40.0
}
fn default_meeting_cap() -> f64 {
    20.0
}
fn default_lookback_days() -> i64 {
    7
}
fn default_work_tag() -> String {
    "work".into()
}
fn default_meeting_keyword() -> String {
    "meeting".into()
}
fn default_placeholder_signal() -> f64 {
    0.5
}
fn default_factor_threshold() -> f64 {
    0.7
}
fn default_low_threshold() -> f64 {
    0.3
}
fn default_medium_threshold() -> f64 {
    0.6
}
fn default_reschedule_lead() -> i64 {
    120
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_break_interval(),
            duration_minutes: default_break_duration(),
        }
    }
}

impl Default for SlotScoringConfig {
    fn default() -> Self {
        Self {
            morning_start_hour: default_morning_start(),
            morning_end_hour: default_morning_end(),
            morning_bonus: default_morning_bonus(),
            afternoon_start_hour: default_afternoon_start(),
            afternoon_end_hour: default_afternoon_end(),
            afternoon_bonus: default_afternoon_bonus(),
            lunch_start_hour: default_lunch_start(),
            lunch_end_hour: default_lunch_end(),
            lunch_penalty: default_lunch_penalty(),
        }
    }
}

impl Default for BurnoutConfig {
    fn default() -> Self {
        Self {
            work_weight: default_work_weight(),
            meeting_weight: default_meeting_weight(),
            free_time_weight: default_free_time_weight(),
            variety_weight: default_variety_weight(),
            sleep_weight: default_sleep_weight(),
            work_event_cap: default_work_event_cap(),
            meeting_cap: default_meeting_cap(),
            lookback_days: default_lookback_days(),
            work_tag: default_work_tag(),
            meeting_keyword: default_meeting_keyword(),
            placeholder_signal: default_placeholder_signal(),
            factor_threshold: default_factor_threshold(),
            low_threshold: default_low_threshold(),
            medium_threshold: default_medium_threshold(),
        }
    }
}

impl Default for WindDownConfig {
    fn default() -> Self {
        Self {
            reschedule_lead_minutes: default_reschedule_lead(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            breaks: BreakConfig::default(),
            slots: SlotScoringConfig::default(),
            burnout: BurnoutConfig::default(),
            wind_down: WindDownConfig::default(),
            habits: HabitConfig::default(),
            summary: SummaryConfig::default(),
        }
    }
}

impl EngineConfig {
    /// The fixed offset that defines "local time" for every calculator.
    ///
    /// Out-of-range offsets fall back to UTC.
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                tracing::warn!(
                    utc_offset_minutes = self.utc_offset_minutes,
                    "utc offset out of range, using UTC"
                );
                Utc.fix()
            })
    }

    /// Check that every bounded field is in range.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ranges: [(&str, i64, std::ops::RangeInclusive<i64>); 5] = [
            ("utc_offset_minutes", i64::from(self.utc_offset_minutes), -1439..=1439),
            ("breaks.interval_minutes", self.breaks.interval_minutes, 1..=MAX_CADENCE_MINUTES),
            ("breaks.duration_minutes", self.breaks.duration_minutes, 1..=MAX_CADENCE_MINUTES),
            ("burnout.lookback_days", self.burnout.lookback_days, 1..=366),
            ("wind_down.reschedule_lead_minutes", self.wind_down.reschedule_lead_minutes, 0..=24 * 60),
        ];
        for (key, value, range) in ranges {
            if !range.contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!(
                        "{value} is outside {}..={}",
                        range.start(),
                        range.end()
                    ),
                });
            }
        }
        Ok(())
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".to_string(),
        };
        let bad_value = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| bad_value(e.to_string()))?,
                    ),
                    serde_json::Value::Number(n) if n.is_f64() => value
                        .parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(serde_json::Value::Number)
                        .ok_or_else(|| bad_value(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Number(_) => value
                        .parse::<i64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| bad_value(format!("cannot parse '{value}' as integer")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| bad_value(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory or return (and persist) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Self = toml::from_str(&content)
            .map_err(|e| CoreError::from(ConfigError::ParseFailed(e.to_string())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value does not fit
    /// the existing field's type, or the result fails [`Self::validate`].
    /// `self` is left unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.breaks.interval_minutes, 90);
        assert_eq!(cfg.breaks.duration_minutes, 15);
        assert_eq!(cfg.burnout.lookback_days, 7);
        assert_eq!(cfg.wind_down.reschedule_lead_minutes, 120);
        assert_eq!(cfg.habits.missing_day_policy, MissingDayPolicy::BreakStreak);
        assert_eq!(cfg.summary.conflict_detection, ConflictDetection::Adjacent);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: EngineConfig = toml::from_str(
            "utc_offset_minutes = 120\n[breaks]\ninterval_minutes = 60\n",
        )
        .unwrap();
        assert_eq!(cfg.utc_offset_minutes, 120);
        assert_eq!(cfg.breaks.interval_minutes, 60);
        assert_eq!(cfg.breaks.duration_minutes, 15);
        assert_eq!(cfg.slots, SlotScoringConfig::default());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = EngineConfig::default();
        cfg.utc_offset_minutes = -300;
        cfg.summary.conflict_detection = ConflictDetection::Pairwise;
        cfg.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn get_and_set_by_path() {
        let mut cfg = EngineConfig::default();
        assert_eq!(cfg.get("breaks.interval_minutes").as_deref(), Some("90"));

        cfg.set("breaks.interval_minutes", "45").unwrap();
        cfg.set("burnout.work_weight", "0.4").unwrap();
        cfg.set("habits.missing_day_policy", "ignore").unwrap();

        assert_eq!(cfg.breaks.interval_minutes, 45);
        assert!((cfg.burnout.work_weight - 0.4).abs() < f64::EPSILON);
        assert_eq!(cfg.habits.missing_day_policy, MissingDayPolicy::Ignore);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_value() {
        let mut cfg = EngineConfig::default();
        assert!(cfg.set("breaks.nope", "1").is_err());
        assert!(cfg.set("breaks.interval_minutes", "soon").is_err());
        assert!(cfg.set("summary.conflict_detection", "quadratic").is_err());
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn set_rejects_out_of_range_values() {
        let mut cfg = EngineConfig::default();
        for (key, value) in [
            ("burnout.lookback_days", "200000000000000"),
            ("breaks.interval_minutes", "200000000000000"),
            ("breaks.duration_minutes", "0"),
            ("wind_down.reschedule_lead_minutes", "-1"),
            ("utc_offset_minutes", "1440"),
        ] {
            let err = cfg.set(key, value).unwrap_err();
            assert!(err.to_string().contains(key), "{err}");
        }
        assert_eq!(cfg, EngineConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_rejects_out_of_range_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[burnout]\nlookback_days = 200000000000000\n").unwrap();
        assert!(EngineConfig::load_from(&path).is_err());
    }

    #[test]
    fn offset_uses_minutes() {
        let cfg = EngineConfig {
            utc_offset_minutes: 90,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.offset().local_minus_utc(), 5400);

        let huge = EngineConfig {
            utc_offset_minutes: i32::MAX,
            ..EngineConfig::default()
        };
        assert_eq!(huge.offset().local_minus_utc(), 0);
    }
}
