//! # Cadence Core Library
//!
//! Personal scheduling intelligence: stateless calculators that read an
//! owner's calendar intervals, habit entries and preferences through an
//! [`IntervalStore`], and write back derived records (breaks, burnout
//! analyses, poll votes, daily summaries).
//!
//! ## Architecture
//!
//! - **Storage**: the [`IntervalStore`] trait, its SQLite implementation and
//!   TOML-based engine configuration
//! - **Calculators**: one module per feature, each constructed from an
//!   [`EngineConfig`] and given the store, owner and reference time per call
//!
//! ## Key Components
//!
//! - [`SlotFinder`]: free-slot discovery and time-of-day ranking
//! - [`BreakScheduler`]: automatic break insertion into long work stretches
//! - [`BurnoutAssessor`]: weighted burnout risk over the trailing week
//! - [`WindDownEnforcer`]: pre-sleep window violations and reschedule hints
//! - [`HabitTracker`]: consistency rate and streaks
//! - [`PollAggregator`]: group scheduling polls
//! - [`DailySummaryGenerator`]: plain-text day digest with conflict warnings

pub mod breaks;
pub mod burnout;
pub mod error;
pub mod habits;
pub mod interval;
pub mod polls;
pub mod slots;
pub mod storage;
pub mod summary;
pub mod wind_down;

pub use breaks::{BreakPreference, BreakScheduler};
pub use burnout::{BurnoutAnalysisRecord, BurnoutAssessor, BurnoutSignals, RiskLevel};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use habits::{ConsistencyReport, HabitEntry, HabitPeriod, HabitTracker, MissingDayPolicy};
pub use interval::{Interval, IntervalKind};
pub use polls::{PollAggregator, PollSlot, PollVote, SchedulingPoll, SlotId, SlotTally};
pub use slots::{CandidateSlot, SlotFinder};
pub use storage::{EngineConfig, IntervalStore, SqliteStore};
pub use summary::{ConflictDetection, DailySummaryGenerator, DailySummaryRecord, SummaryStats};
pub use wind_down::{RescheduleSuggestion, WindDownEnforcer, WindDownReport, WindDownSettings};
