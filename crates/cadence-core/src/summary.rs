//! Daily summary generation with conflict detection.
//!
//! Renders a plain-text digest of one local day's events and tasks and
//! stores it as the owner's summary snapshot for that date.

use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::error::Result;
use crate::interval::{local_day_bounds, Interval, IntervalKind};
use crate::storage::{EngineConfig, IntervalStore};

/// How overlapping events are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictDetection {
    /// Compare each event only with the next one in start order. A long
    /// event that overlaps a later, non-adjacent event goes unreported.
    #[default]
    Adjacent,
    /// Report every overlapping pair.
    Pairwise,
}

/// Two events whose time ranges overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub first_id: String,
    pub first_title: String,
    pub second_id: String,
    pub second_title: String,
}

impl Conflict {
    fn between(first: &Interval, second: &Interval) -> Self {
        Self {
            first_id: first.id.clone(),
            first_title: first.title.clone(),
            second_id: second.id.clone(),
            second_title: second.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub event_count: usize,
    pub task_count: usize,
    #[serde(default)]
    pub conflict_count: usize,
}

/// Stored summary, one per (owner, date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummaryRecord {
    pub owner_id: String,
    pub date: NaiveDate,
    pub content: String,
    pub stats: SummaryStats,
}

/// Find overlapping events. `events` must be sorted by start time.
pub fn detect_conflicts(events: &[Interval], mode: ConflictDetection) -> Vec<Conflict> {
    match mode {
        ConflictDetection::Adjacent => events
            .windows(2)
            .filter(|pair| pair[0].end_time > pair[1].start_time)
            .map(|pair| Conflict::between(&pair[0], &pair[1]))
            .collect(),
        ConflictDetection::Pairwise => {
            let mut conflicts = Vec::new();
            let mut active: Vec<&Interval> = Vec::new();
            for event in events {
                active.retain(|a| a.end_time > event.start_time);
                for earlier in &active {
                    conflicts.push(Conflict::between(earlier, event));
                }
                active.push(event);
            }
            conflicts
        }
    }
}

pub struct DailySummaryGenerator {
    mode: ConflictDetection,
    offset: FixedOffset,
}

impl DailySummaryGenerator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            mode: config.summary.conflict_detection,
            offset: config.offset(),
        }
    }

    pub fn with_mode(mut self, mode: ConflictDetection) -> Self {
        self.mode = mode;
        self
    }

    /// Render the digest. `events` sorted by start, `tasks` by priority.
    pub fn render(
        &self,
        date: NaiveDate,
        events: &[Interval],
        tasks: &[Interval],
        conflicts: &[Conflict],
    ) -> String {
        let mut out = indoc::formatdoc! {"
            Daily Summary for {date}

            You have {events} and {tasks} today.
            ",
            date = date.format("%A, %B %-d, %Y"),
            events = plural(events.len(), "event"),
            tasks = plural(tasks.len(), "task"),
        };

        if !events.is_empty() {
            out.push_str("\nEvents:\n");
            for event in events {
                let start = event.start_time.with_timezone(&self.offset);
                let end = event.end_time.with_timezone(&self.offset);
                out.push_str(&format!(
                    "- {}-{} {}",
                    start.format("%H:%M"),
                    end.format("%H:%M"),
                    event.title
                ));
                if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
                    out.push_str(&format!(" @ {location}"));
                }
                out.push('\n');
            }
        }

        if !tasks.is_empty() {
            out.push_str("\nTasks:\n");
            for task in tasks {
                let line = match task.priority {
                    Some(p) => format!("- [P{p}] {}\n", task.title),
                    None => format!("- {}\n", task.title),
                };
                out.push_str(&line);
            }
        }

        if !conflicts.is_empty() {
            out.push_str(&format!(
                "\nWarning: {} detected.\n",
                plural(conflicts.len(), "scheduling conflict")
            ));
        }

        out
    }

    /// Build the summary for the local `date` and upsert it.
    pub fn generate_daily_summary<S: IntervalStore + ?Sized>(
        &self,
        store: &S,
        owner_id: &str,
        date: NaiveDate,
    ) -> Result<DailySummaryRecord> {
        let (day_start, day_end) = local_day_bounds(date, self.offset);
        let events = store.intervals_starting_between(owner_id, &[IntervalKind::Event], day_start, day_end)?;
        let mut tasks = store.intervals_starting_between(owner_id, &[IntervalKind::Task], day_start, day_end)?;
        // Stable sort keeps start order among equal priorities; unprioritized last.
        tasks.sort_by_key(|t| Reverse(t.priority.unwrap_or(i32::MIN)));

        let conflicts = detect_conflicts(&events, self.mode);
        let record = DailySummaryRecord {
            owner_id: owner_id.to_string(),
            date,
            content: self.render(date, &events, &tasks, &conflicts),
            stats: SummaryStats {
                event_count: events.len(),
                task_count: tasks.len(),
                conflict_count: conflicts.len(),
            },
        };
        store.upsert_daily_summary(&record)?;

        tracing::info!(
            owner_id,
            %date,
            events = record.stats.event_count,
            tasks = record.stats.task_count,
            conflicts = record.stats.conflict_count,
            "stored daily summary"
        );
        Ok(record)
    }

    /// The stored snapshot for `date`, if one was generated.
    pub fn daily_summary<S: IntervalStore + ?Sized>(
        &self,
        store: &S,
        owner_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailySummaryRecord>> {
        store.daily_summary(owner_id, date)
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
