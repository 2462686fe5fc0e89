use chrono::NaiveDate;
use clap::Subcommand;
use cadence_core::{HabitEntry, HabitPeriod, HabitTracker};

use super::{open, parse_date, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Record a day's outcome for a habit
    Log {
        habit_id: String,
        /// Local date (defaults to today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Record the day as not completed
        #[arg(long)]
        missed: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Consistency rate and streaks over a trailing period
    Consistency {
        habit_id: String,
        /// week, month or year
        #[arg(long, default_value = "week")]
        period: HabitPeriod,
    },
}

pub fn run(ctx: &Context, action: HabitAction) -> CmdResult {
    let (store, config) = open()?;

    match action {
        HabitAction::Log { habit_id, date, missed, notes } => {
            let date = date.unwrap_or_else(|| ctx.today(&config));
            let mut entry = HabitEntry::new(habit_id, date, !missed);
            entry.notes = notes;
            store.log_habit_entry(&entry)?;
            print_json(&entry)?;
        }
        HabitAction::Consistency { habit_id, period } => {
            let report = HabitTracker::new(&config).calculate_consistency(&store, &habit_id, period, ctx.now)?;
            print_json(&report)?;
        }
    }
    Ok(())
}
