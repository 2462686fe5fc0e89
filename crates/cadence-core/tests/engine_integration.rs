//! End-to-end tests for the scheduling calculators.
//!
//! Each test seeds an in-memory store, runs one operation the way the CLI
//! does and checks both the returned value and what was persisted.

use cadence_core::{
    BreakPreference, BreakScheduler, BurnoutAssessor, BurnoutSignals, DailySummaryGenerator,
    EngineConfig, HabitEntry, HabitPeriod, HabitTracker, Interval, IntervalKind, IntervalStore,
    PollAggregator, RiskLevel, SlotFinder, SlotTally, SqliteStore, WindDownEnforcer,
    WindDownSettings,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

const OWNER: &str = "owner-1";

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

fn event(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Interval {
    Interval::new(OWNER, IntervalKind::Event, title, start, end).unwrap()
}

fn count_rows(store: &SqliteStore, table: &str) -> i64 {
    store
        .conn()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn slot_finder_returns_gap_between_events() {
    let store = SqliteStore::open_memory().unwrap();
    let events = [
        event("Standup", at(9, 0), at(10, 0)),
        event("Lunch with team", at(12, 0), at(13, 0)),
    ];
    for e in &events {
        store.insert_interval(e).unwrap();
    }

    let finder = SlotFinder::new(&EngineConfig::default());
    let slots = finder
        .suggest_optimal_time(&store, OWNER, Some("focus"), 60, at(6, 0))
        .unwrap();

    assert!(slots
        .iter()
        .any(|s| s.start_time == at(10, 0) && s.end_time == at(12, 0)));
    for slot in &slots {
        assert!(events.iter().all(|e| !e.overlaps(slot.start_time, slot.end_time)));
    }
    // 10:00 falls in the morning window
    assert_eq!(slots[0].score, 10.0);
}

#[test]
fn break_inserted_ninety_minutes_into_long_event() {
    let store = SqliteStore::open_memory().unwrap();
    store
        .set_break_preference(&BreakPreference::new(OWNER, 90, 15).unwrap())
        .unwrap();
    store
        .insert_interval(&event("Workshop", at(10, 0), at(13, 0)))
        .unwrap();

    let scheduler = BreakScheduler::new(&EngineConfig::default());
    let breaks = scheduler.schedule_smart_breaks(&store, OWNER, date()).unwrap();

    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0].start_time, at(11, 30));
    assert_eq!(breaks[0].duration_minutes(), 15);
    assert_eq!(breaks[0].kind, IntervalKind::Break);

    let stored = store
        .intervals_starting_between(OWNER, &[IntervalKind::Break], at(0, 0), at(23, 59))
        .unwrap();
    assert_eq!(stored, breaks);
}

#[test]
fn break_defaults_apply_without_stored_preference() {
    let store = SqliteStore::open_memory().unwrap();
    store
        .insert_interval(&event("Workshop", at(10, 0), at(13, 0)))
        .unwrap();

    let cfg = EngineConfig::default();
    let breaks = BreakScheduler::new(&cfg)
        .schedule_smart_breaks(&store, OWNER, date())
        .unwrap();

    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0].start_time, at(10, 0) + Duration::minutes(cfg.breaks.interval_minutes));
}

#[test]
fn burnout_weighting_and_idempotent_persistence() {
    let cfg = EngineConfig::default();
    let assessor = BurnoutAssessor::new(&cfg);
    let signals = BurnoutSignals {
        work_hours: 1.0,
        meeting_density: 1.0,
        free_time: 0.5,
        variety: 0.5,
        sleep: 0.5,
    };
    let record = assessor.assess(OWNER, date(), &signals);
    assert!((record.risk_score - 0.775).abs() < 1e-9);
    assert_eq!(record.risk_level, RiskLevel::High);

    let store = SqliteStore::open_memory().unwrap();
    for i in 0..5 {
        let start = at(9, 0) - Duration::days(i);
        store
            .insert_interval(
                &event("Planning meeting", start, start + Duration::hours(1)).with_tags(["work"]),
            )
            .unwrap();
    }

    let now = at(18, 0);
    let first = assessor.analyze_burnout_risk(&store, OWNER, now).unwrap();
    let second = assessor.analyze_burnout_risk(&store, OWNER, now).unwrap();
    assert_eq!(first, second);
    assert_eq!(count_rows(&store, "burnout_analyses"), 1);
    assert_eq!(store.burnout_analyses(OWNER, date()).unwrap(), vec![first]);
}

#[test]
fn wind_down_flags_late_event_and_leaves_it_in_place() {
    let store = SqliteStore::open_memory().unwrap();
    store
        .set_wind_down_settings(
            &WindDownSettings::new(OWNER, NaiveTime::from_hms_opt(23, 0, 0).unwrap(), 60).unwrap(),
        )
        .unwrap();
    let late = event("Late call", at(22, 30), at(23, 0));
    let protected = event("Medication", at(22, 15), at(22, 20)).protected();
    let early = event("Dinner", at(19, 0), at(20, 0));
    for e in [&late, &protected, &early] {
        store.insert_interval(e).unwrap();
    }

    let enforcer = WindDownEnforcer::new(&EngineConfig::default());
    let report = enforcer.enforce_wind_down_rules(&store, OWNER, at(12, 0)).unwrap();

    assert_eq!(report.violations, vec![late.clone()]);
    assert_eq!(report.suggestions.len(), 1);
    assert_eq!(report.suggestions[0].event_id, late.id);
    assert_eq!(report.suggestions[0].suggested_start, at(20, 0));
    assert_eq!(store.interval(&late.id).unwrap(), Some(late));
}

#[test]
fn wind_down_without_settings_is_empty() {
    let store = SqliteStore::open_memory().unwrap();
    store
        .insert_interval(&event("Late call", at(22, 30), at(23, 0)))
        .unwrap();

    let report = WindDownEnforcer::new(&EngineConfig::default())
        .enforce_wind_down_rules(&store, OWNER, at(12, 0))
        .unwrap();
    assert!(report.violations.is_empty());
    assert!(report.suggestions.is_empty());
}

#[test]
fn habit_week_streaks() {
    let store = SqliteStore::open_memory().unwrap();
    let today = date();
    for (days_ago, completed) in [(0, true), (1, true), (2, false)] {
        store
            .log_habit_entry(&HabitEntry::new("read", today - Duration::days(days_ago), completed))
            .unwrap();
    }

    let tracker = HabitTracker::new(&EngineConfig::default());
    let report = tracker
        .calculate_consistency(&store, "read", HabitPeriod::Week, at(20, 0))
        .unwrap();

    assert_eq!(report.current_streak, 2);
    assert_eq!(report.completed_days, 2);
    assert_eq!(report.total_days, 7);
    assert!((report.consistency_rate - 2.0 / 7.0 * 100.0).abs() < 1e-9);
}

#[test]
fn habit_longest_streak_over_chronological_log() {
    let tracker = HabitTracker::new(&EngineConfig::default());
    let start = date();
    // Chronological [true, false, true, true], passed most recent first.
    let mut entries: Vec<HabitEntry> = [true, false, true, true]
        .iter()
        .enumerate()
        .map(|(i, &done)| HabitEntry::new("read", start + Duration::days(i as i64), done))
        .collect();
    entries.reverse();
    assert_eq!(tracker.longest_streak(&entries), 2);
}

#[test]
fn unknown_habit_reports_zero() {
    let store = SqliteStore::open_memory().unwrap();
    let report = HabitTracker::new(&EngineConfig::default())
        .calculate_consistency(&store, "nope", HabitPeriod::Month, at(20, 0))
        .unwrap();
    assert_eq!(report.completed_days, 0);
    assert_eq!(report.total_days, 30);
    assert_eq!(report.consistency_rate, 0.0);
}

#[test]
fn poll_round_trip_ranks_slots() {
    let store = SqliteStore::open_memory().unwrap();
    let agg = PollAggregator::new();
    let poll = agg
        .create_poll(
            &store,
            OWNER,
            "Quarterly planning",
            &[(at(9, 0), at(10, 0)), (at(13, 0), at(14, 0)), (at(15, 0), at(16, 0)), (at(17, 0), at(18, 0))],
            60,
            at(8, 0),
        )
        .unwrap();

    agg.vote(&store, &poll.id, "alice", &[1, 2], at(8, 5)).unwrap();
    agg.vote(&store, &poll.id, "bob", &[1, 3], at(8, 6)).unwrap();
    // Identical re-vote keeps one row per voter.
    agg.vote(&store, &poll.id, "bob", &[1, 3], at(8, 7)).unwrap();
    assert_eq!(count_rows(&store, "poll_votes"), 2);

    let results = agg.get_results(&store, &poll.id).unwrap();
    assert_eq!(
        results,
        vec![
            SlotTally { slot_id: 1, votes: 2 },
            SlotTally { slot_id: 2, votes: 1 },
            SlotTally { slot_id: 3, votes: 1 },
        ]
    );
    assert!(results.iter().all(|t| t.slot_id != 4));
}

#[test]
fn daily_summary_counts_adjacent_conflicts_and_upserts() {
    let store = SqliteStore::open_memory().unwrap();
    store.insert_interval(&event("A", at(10, 0), at(11, 0))).unwrap();
    store.insert_interval(&event("B", at(10, 30), at(11, 30))).unwrap();

    let generator = DailySummaryGenerator::new(&EngineConfig::default());
    let first = generator.generate_daily_summary(&store, OWNER, date()).unwrap();
    assert_eq!(first.stats.conflict_count, 1);

    store.insert_interval(&event("C", at(12, 0), at(13, 0))).unwrap();
    let second = generator.generate_daily_summary(&store, OWNER, date()).unwrap();
    assert_eq!(second.stats.event_count, 3);
    assert_eq!(second.stats.conflict_count, 1);

    generator.generate_daily_summary(&store, OWNER, date()).unwrap();
    assert_eq!(count_rows(&store, "daily_summaries"), 1);
    assert_eq!(generator.daily_summary(&store, OWNER, date()).unwrap(), Some(second));
}

#[test]
fn store_reopens_with_persisted_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadence.db");
    let original = event("Review", at(14, 0), at(15, 0)).with_location("Room 2");
    {
        let store = SqliteStore::open_at(&path).unwrap();
        store.insert_interval(&original).unwrap();
    }

    let store = SqliteStore::open_at(&path).unwrap();
    let found = store.intervals_starting_from(OWNER, at(0, 0)).unwrap();
    assert_eq!(found, vec![original]);
}
